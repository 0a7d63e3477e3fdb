pub mod health;
pub mod results;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use results::{create_result, list_recent_results, RECENT_LIMIT};
