use crate::config::Config;
use crate::storage::UploadRoot;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub root: UploadRoot,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: Config, root: UploadRoot) -> Self {
        Self {
            config: Arc::new(config),
            root,
            start_time: std::time::Instant::now(),
        }
    }
}
