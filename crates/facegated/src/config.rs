use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (default: 0.0.0.0:5000).
    pub bind_addr: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the encoding store JSON file.
    pub store_path: PathBuf,
    /// Maximum Euclidean distance for a positive match.
    pub match_threshold: f32,
    /// Actuator `host:port`. Dispatch is disabled when unset.
    pub device_addr: Option<String>,
    /// Upper bound on one dispatch attempt.
    pub dispatch_timeout: Duration,
    /// Number of extraction worker threads, each with its own model sessions.
    pub engine_workers: usize,
    /// Largest accepted request body in bytes.
    pub max_image_bytes: usize,
    /// When set, annotated frames are written here.
    pub debug_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = facegate_core::default_data_dir();
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            model_dir: facegate_core::default_model_dir(),
            store_path: data_dir.join("encodings.json"),
            match_threshold: facegate_core::DEFAULT_MATCH_THRESHOLD,
            device_addr: None,
            dispatch_timeout: Duration::from_millis(2000),
            engine_workers: 1,
            max_image_bytes: 10 * 1024 * 1024,
            debug_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("FACEGATE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            model_dir: env_path("FACEGATE_MODEL_DIR").unwrap_or(defaults.model_dir),
            store_path: env_path("FACEGATE_STORE_PATH").unwrap_or(defaults.store_path),
            match_threshold: env_parse("FACEGATE_MATCH_THRESHOLD", defaults.match_threshold),
            device_addr: env_nonempty("FACEGATE_DEVICE_ADDR"),
            dispatch_timeout: Duration::from_millis(env_parse(
                "FACEGATE_DISPATCH_TIMEOUT_MS",
                defaults.dispatch_timeout.as_millis() as u64,
            )),
            engine_workers: env_parse("FACEGATE_ENGINE_WORKERS", defaults.engine_workers).max(1),
            max_image_bytes: env_parse("FACEGATE_MAX_IMAGE_BYTES", defaults.max_image_bytes),
            debug_dir: env_path("FACEGATE_DEBUG_DIR"),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join("det_10g.onnx")
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> PathBuf {
        self.model_dir.join("w600k_r50.onnx")
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_nonempty(key).map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_paths() {
        let config = Config {
            model_dir: PathBuf::from("/opt/models"),
            ..Config::default()
        };
        assert_eq!(config.scrfd_model_path(), PathBuf::from("/opt/models/det_10g.onnx"));
        assert_eq!(config.arcface_model_path(), PathBuf::from("/opt/models/w600k_r50.onnx"));
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("FACEGATE_TEST_PARSE_GARBAGE", "zero point six");
        assert_eq!(env_parse("FACEGATE_TEST_PARSE_GARBAGE", 0.6f32), 0.6);
        std::env::set_var("FACEGATE_TEST_PARSE_OK", " 0.45 ");
        assert_eq!(env_parse("FACEGATE_TEST_PARSE_OK", 0.6f32), 0.45);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.match_threshold, 0.6);
        assert!(config.device_addr.is_none());
        assert_eq!(config.dispatch_timeout, Duration::from_secs(2));
        assert_eq!(config.engine_workers, 1);
    }
}
