pub mod committer;
pub mod dedupe;
pub mod matcher;
pub mod metrics;
pub mod receivables;

pub use metrics::{get_metrics, init_metrics};
