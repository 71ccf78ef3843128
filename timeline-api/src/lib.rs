//! Data types shared between the timeline engine and its hosts.

mod grid;
pub use grid::*;

mod time;
pub use time::*;

pub type TimelineApiResult<T> = Result<T, &'static str>;
