pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{MetricEvent, MetricsLog};
