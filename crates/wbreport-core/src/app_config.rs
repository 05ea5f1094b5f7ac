use std::path::PathBuf;

/// How the report store decides that an existing row belongs to a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMatch {
    /// The date column contains the date's display string anywhere in the
    /// cell. Tolerates formatting drift but can collide on overlapping text.
    DayToken,
    /// The date cell is parsed into a calendar date and compared exactly.
    ExactDate,
}

impl std::fmt::Display for RowMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowMatch::DayToken => write!(f, "day-token"),
            RowMatch::ExactDate => write!(f, "exact-date"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub default_retry_after_secs: u64,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub row_match: RowMatch,
    pub log_level: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"[redacted]")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("default_retry_after_secs", &self.default_retry_after_secs)
            .field("template_path", &self.template_path)
            .field("output_dir", &self.output_dir)
            .field("row_match", &self.row_match)
            .field("log_level", &self.log_level)
            .finish()
    }
}
