pub mod generator;
pub mod metrics;
pub mod promoter;
pub mod transition;

pub use metrics::{get_metrics, init_metrics};
