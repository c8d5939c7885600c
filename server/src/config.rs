use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL_SOURCE: &str = "nguyenkhoa/dinov2_Liveness_detection_v2.2.3";
const DEFAULT_CACHE_DIR: &str = "./saved_model";

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Hub identifier or a path to an already-populated local directory.
    pub source: String,
    pub cache_dir: PathBuf,
    /// Which class index means "live". Validated against the label set at
    /// load time.
    pub live_class_index: usize,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub workers: usize,
    pub keepalive_interval: Duration,
    pub keepalive_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelSettings,
    pub server: ServerSettings,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT").unwrap_or_else(|_| "50051".to_string());
        Self {
            model: ModelSettings {
                source: env::var("MODEL_SOURCE")
                    .unwrap_or_else(|_| DEFAULT_MODEL_SOURCE.to_string()),
                cache_dir: PathBuf::from(
                    env::var("MODEL_CACHE_DIR").unwrap_or_else(|_| DEFAULT_CACHE_DIR.to_string()),
                ),
                live_class_index: env_usize("LIVE_CLASS_INDEX", 1),
            },
            server: ServerSettings {
                bind_address: format!("0.0.0.0:{}", port),
                workers: env_usize("SERVER_WORKERS", 10),
                keepalive_interval: Duration::from_secs(
                    env_usize("KEEPALIVE_INTERVAL_SECS", 30) as u64
                ),
                keepalive_timeout: Duration::from_secs(
                    env_usize("KEEPALIVE_TIMEOUT_SECS", 5) as u64
                ),
            },
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_usize_reads_a_set_key() {
        unsafe { env::set_var("CONFIG_TEST_SET_KEY", "32") };
        assert_eq!(env_usize("CONFIG_TEST_SET_KEY", 10), 32);
        unsafe { env::remove_var("CONFIG_TEST_SET_KEY") };
    }

    #[test]
    fn env_usize_falls_back_on_missing_or_garbage() {
        unsafe { env::remove_var("CONFIG_TEST_MISSING_KEY") };
        assert_eq!(env_usize("CONFIG_TEST_MISSING_KEY", 10), 10);

        unsafe { env::set_var("CONFIG_TEST_GARBAGE_KEY", "not a number") };
        assert_eq!(env_usize("CONFIG_TEST_GARBAGE_KEY", 10), 10);
        unsafe { env::remove_var("CONFIG_TEST_GARBAGE_KEY") };
    }
}
