use crate::handlers::{file, health};
use crate::middleware::{auth, logging};
use crate::state::AppState;
use axum::{
    extract::{FromRequest, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/files", get(file::list_files))
        .route("/files/info/{*path}", get(file::file_info))
        .route("/files/download/{*path}", get(file::download_file))
        .route("/files/rename/{*path}", put(file::rename_file))
        .route("/files/delete/{*path}", delete(file::delete_file))
        .route(
            "/upload",
            post(handle_upload).layer(axum::extract::DefaultBodyLimit::disable()),
        )
        .route("/folders", post(file::create_folder));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(middleware::from_fn(logging::logging_middleware))
        .with_state(state)
}

/// Multipart forms go to the multipart handler; anything else is treated as
/// the raw file body with its name in `?path=`.
async fn handle_upload(
    state: axum::extract::State<Arc<AppState>>,
    req: Request,
) -> Result<Response, crate::error::AppError> {
    let content_type = req
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let multipart = axum::extract::Multipart::from_request(req, &state)
            .await
            .map_err(|e| crate::error::AppError::BadRequest(e.to_string()))?;

        file::upload_multipart(state, multipart)
            .await
            .map(|r| r.into_response())
    } else {
        let (parts, body) = req.into_parts();
        let req_for_query = Request::from_parts(parts, axum::body::Body::empty());

        let query = axum::extract::Query::<file::upload::UploadParams>::from_request(
            req_for_query,
            &state,
        )
        .await
        .map_err(|e| crate::error::AppError::BadRequest(e.to_string()))?;

        file::upload_binary(state, query, body)
            .await
            .map(|r| r.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::UploadRoot;
    use axum::body::Body;
    use axum::http::{header, Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        _dir: TempDir,
        root: PathBuf,
        router: Router,
    }

    fn test_config(pin: Option<&str>, max_file_size: u64) -> Config {
        Config {
            addr: "127.0.0.1:0".to_string(),
            upload_dir: PathBuf::new(),
            max_file_size,
            pin: pin.map(str::to_string),
            log_level: "info".to_string(),
        }
    }

    fn app_with(pin: Option<&str>, max_file_size: u64) -> TestApp {
        let dir = TempDir::new().unwrap();
        let root = UploadRoot::init(&dir.path().join("uploads")).unwrap();
        let root_path = root.path().to_path_buf();
        let router = create_router(AppState::new(test_config(pin, max_file_size), root));
        TestApp {
            _dir: dir,
            root: root_path,
            router,
        }
    }

    fn app() -> TestApp {
        app_with(None, 1024 * 1024)
    }

    async fn send(app: &TestApp, req: axum::http::Request<Body>) -> (StatusCode, Value) {
        let response = app.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_reports_tree_and_totals() {
        let app = app();
        std::fs::create_dir(app.root.join("A")).unwrap();
        std::fs::write(app.root.join("A/ten.bin"), vec![1u8; 10]).unwrap();
        std::fs::write(app.root.join("B"), vec![2u8; 20]).unwrap();

        let (status, body) = send(&app, get("/api/files")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalFiles"], 2);
        assert_eq!(body["totalSize"], 30);
        assert_eq!(body["totalSizeFormatted"], "30 B");
        assert_eq!(body["files"][0]["name"], "A");
        assert_eq!(body["files"][0]["type"], "directory");
        assert_eq!(body["files"][0]["size"], 10);
        assert_eq!(body["files"][1]["name"], "B");
        assert_eq!(body["files"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_info_traversal_is_access_denied() {
        let app = app();

        let (status, body) = send(&app, get("/api/files/info/..%2F..%2Fetc%2Fpasswd")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], 1403);

        let (status, _) = send(&app, get("/api/files/info/..%2Fmissing-sibling")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_info_file_directory_and_missing() {
        let app = app();
        std::fs::create_dir(app.root.join("docs")).unwrap();
        std::fs::write(app.root.join("docs/readme.md"), b"hello").unwrap();

        let (status, body) = send(&app, get("/api/files/info/docs/readme.md")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "readme.md");
        assert_eq!(body["path"], "docs/readme.md");
        assert_eq!(body["size"], 5);
        assert_eq!(body["formattedSize"], "5 B");
        assert_eq!(body["type"], "file");

        let (status, body) = send(&app, get("/api/files/info/docs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "directory");
        assert_eq!(body["size"], 5);

        let (status, _) = send(&app, get("/api/files/info/docs/nope.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/api/files/info/.metadata")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_sets_disposition() {
        let app = app();
        std::fs::write(app.root.join("résumé.pdf"), b"%PDF").unwrap();

        let response = app
            .router
            .clone()
            .oneshot(get("/api/files/download/r%C3%A9sum%C3%A9.pdf"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"%PDF");
    }

    #[tokio::test]
    async fn test_download_directory_as_archive() {
        let app = app();
        std::fs::create_dir(app.root.join("album")).unwrap();
        std::fs::write(app.root.join("album/a.txt"), b"a").unwrap();

        let response = app
            .router
            .clone()
            .oneshot(get("/api/files/download/album"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"album.tar.gz\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[tokio::test]
    async fn test_rename_success_sanitizes_name() {
        let app = app();
        std::fs::write(app.root.join("old.txt"), b"data").unwrap();

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/files/rename/old.txt",
                serde_json::json!({ "newName": "  New Name?.TXT " }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["oldName"], "old.txt");
        assert_eq!(body["newName"], "New_Name.txt");
        assert_eq!(body["newPath"], "New_Name.txt");
        assert_eq!(body["message"], "File renamed successfully");
        assert!(!app.root.join("old.txt").exists());
        assert_eq!(std::fs::read(app.root.join("New_Name.txt")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_rename_rejects_unusable_names() {
        let app = app();
        std::fs::write(app.root.join("keep.txt"), b"data").unwrap();

        for new_name in ["   ", "<>:|?*"] {
            let (status, _) = send(
                &app,
                json_request(
                    Method::PUT,
                    "/api/files/rename/keep.txt",
                    serde_json::json!({ "newName": new_name }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "newName {:?}", new_name);
        }

        assert_eq!(std::fs::read(app.root.join("keep.txt")).unwrap(), b"data");
        assert_eq!(std::fs::read_dir(&app.root).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_rename_conflict_leaves_source_untouched() {
        let app = app();
        std::fs::create_dir(app.root.join("dir")).unwrap();
        std::fs::write(app.root.join("dir/a.txt"), b"alpha").unwrap();
        std::fs::write(app.root.join("dir/b.txt"), b"beta").unwrap();

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/files/rename/dir/a.txt",
                serde_json::json!({ "newName": "b.txt" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 1409);
        assert_eq!(std::fs::read(app.root.join("dir/a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(app.root.join("dir/b.txt")).unwrap(), b"beta");
    }

    #[tokio::test]
    async fn test_rename_missing_source_and_traversal() {
        let app = app();

        let (status, _) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/files/rename/ghost.txt",
                serde_json::json!({ "newName": "real.txt" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/files/rename/..%2F..%2Fetc%2Fhosts",
                serde_json::json!({ "newName": "hosts" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_file_and_directory() {
        let app = app();
        std::fs::write(app.root.join("one.txt"), b"1").unwrap();
        std::fs::create_dir_all(app.root.join("folder/inner")).unwrap();
        std::fs::write(app.root.join("folder/inner/two.txt"), b"2").unwrap();

        let request = |uri: &str| {
            axum::http::Request::delete(uri)
                .body(Body::empty())
                .unwrap()
        };

        let (status, body) = send(&app, request("/api/files/delete/one.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File deleted successfully");
        assert!(!app.root.join("one.txt").exists());

        let (status, body) = send(&app, request("/api/files/delete/folder")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Directory deleted successfully");
        assert!(!app.root.join("folder").exists());

        let (status, _) = send(&app, request("/api/files/delete/folder")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request("/api/files/delete/..%2Fuploads")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(app.root.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_and_rename_act_on_symlink_not_target() {
        let app = app();
        std::fs::write(app.root.join("real.txt"), b"data").unwrap();
        std::os::unix::fs::symlink(app.root.join("real.txt"), app.root.join("link")).unwrap();
        std::os::unix::fs::symlink(app.root.join("real.txt"), app.root.join("other")).unwrap();

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/files/rename/link",
                serde_json::json!({ "newName": "moved" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["oldName"], "link");
        assert!(std::fs::symlink_metadata(app.root.join("moved"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert!(std::fs::symlink_metadata(app.root.join("link")).is_err());
        assert_eq!(std::fs::read(app.root.join("real.txt")).unwrap(), b"data");

        let request = axum::http::Request::delete("/api/files/delete/other")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File deleted successfully");
        assert!(std::fs::symlink_metadata(app.root.join("other")).is_err());
        assert_eq!(std::fs::read(app.root.join("real.txt")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_binary_upload_allocates_unique_names() {
        let app = app();

        let upload = || {
            axum::http::Request::post("/api/upload?path=reports%2FQ1%20summary.PDF")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(Body::from("quarterly"))
                .unwrap()
        };

        let (status, body) = send(&app, upload()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"][0]["path"], "reports/Q1_summary.pdf");
        assert_eq!(body["files"][0]["originalName"], "Q1 summary.PDF");
        assert_eq!(body["files"][0]["size"], 9);

        let (status, body) = send(&app, upload()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"][0]["path"], "reports/Q1_summary (1).pdf");

        assert_eq!(
            std::fs::read(app.root.join("reports/Q1_summary (1).pdf")).unwrap(),
            b"quarterly"
        );
    }

    #[tokio::test]
    async fn test_binary_upload_over_limit_is_removed() {
        let app = app_with(None, 4);

        let request = axum::http::Request::post("/api/upload?path=big.bin")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from("0123456789"))
            .unwrap();

        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!app.root.join("big.bin").exists());
    }

    #[tokio::test]
    async fn test_multipart_upload_into_folder() {
        let app = app();
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"path\"\r\n\r\n\
             shared docs\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             first\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             second\r\n\
             --{b}--\r\n",
            b = boundary
        );

        let request = axum::http::Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"][0]["path"], "shared_docs/notes.txt");
        assert_eq!(body["files"][1]["path"], "shared_docs/notes (1).txt");
        assert_eq!(
            std::fs::read_to_string(app.root.join("shared_docs/notes.txt")).unwrap(),
            "first"
        );
        assert_eq!(
            std::fs::read_to_string(app.root.join("shared_docs/notes (1).txt")).unwrap(),
            "second"
        );
    }

    #[tokio::test]
    async fn test_create_folder_is_unique() {
        let app = app();

        let create = || {
            json_request(
                Method::POST,
                "/api/folders",
                serde_json::json!({ "path": "New Folder" }),
            )
        };

        let (status, body) = send(&app, create()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "New_Folder");

        let (_, body) = send(&app, create()).await;
        assert_eq!(body["path"], "New_Folder (1)");
        assert!(app.root.join("New_Folder (1)").is_dir());
    }

    #[tokio::test]
    async fn test_pin_required_when_configured() {
        let app = app_with(Some("2468"), 1024);

        let (status, _) = send(&app, get("/api/files")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = axum::http::Request::get("/api/files")
            .header("X-Pin", "2468")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthStatus"], "ok");
    }
}
