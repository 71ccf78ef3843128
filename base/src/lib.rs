pub mod tracing_util;

mod channels;
pub use channels::*;

pub mod metrics_util;
