use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server listening address
    pub addr: String,

    /// Directory all uploaded files live under
    pub upload_dir: PathBuf,

    /// Max upload size in bytes
    pub max_file_size: u64,

    /// Optional PIN protecting the API
    pub pin: Option<String>,

    /// Default log level, overridden by RUST_LOG
    pub log_level: String,
}

impl Config {
    pub fn load() -> Self {
        Self::from_sources(|key| std::env::var(key).ok(), std::env::args())
    }

    /// Environment values first, then `--flag=value` arguments on top.
    fn from_sources<E, A>(env: E, args: A) -> Self
    where
        E: Fn(&str) -> Option<String>,
        A: IntoIterator<Item = String>,
    {
        let mut addr = env("ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let mut upload_dir =
            PathBuf::from(env("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()));
        let mut max_file_size = env("MAX_FILE_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024 * 1024 * 1024);
        let mut pin = env("PIN");
        let mut log_level = env("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        for arg in args {
            if let Some(value) = arg.strip_prefix("--addr=") {
                addr = value.to_string();
            } else if let Some(value) = arg.strip_prefix("--upload-dir=") {
                upload_dir = PathBuf::from(value);
            } else if let Some(value) = arg.strip_prefix("--max-file-size=") {
                if let Ok(size) = value.parse::<u64>() {
                    max_file_size = size;
                }
            } else if let Some(value) = arg.strip_prefix("--pin=") {
                pin = Some(value.to_string());
            } else if let Some(value) = arg.strip_prefix("--log-level=") {
                log_level = value.to_string();
            }
        }

        // An empty PIN disables protection instead of requiring an empty header.
        let pin = pin.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

        Config {
            addr,
            upload_dir,
            max_file_size,
            pin,
            log_level,
        }
    }

    /// PIN with all but its first and last characters masked, for logging.
    pub fn masked_pin(&self) -> Option<String> {
        self.pin.as_ref().map(|p| {
            if p.len() > 4 {
                let chars: Vec<char> = p.chars().collect();
                format!("{}******{}", chars[0], chars[chars.len() - 1])
            } else {
                "******".to_string()
            }
        })
    }
}
