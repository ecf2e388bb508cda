use std::time::Duration;

pub const DEFAULT_TTL_SECS: u64 = 3600;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub ttl: Duration,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// Accepts `env_logger` filter syntax, e.g. `info` or `datalens::engine=debug`.
    pub fn init_logging(&self) {
        let result = env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp_millis()
            .try_init();

        if result.is_err() {
            log::debug!("logger already initialized; keeping existing filters");
        }
    }
}
