pub mod client;
pub mod endpoint;
pub mod error;
pub mod rate_limit;

pub use client::StatsClient;
pub use endpoint::Endpoint;
pub use error::{FailureKind, StatsError};
pub use rate_limit::{retry_delay, RetryKind, RetryPolicy, Sleeper, TokioSleeper};
