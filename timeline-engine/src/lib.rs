mod time;
pub use time::*;

mod tempo;
pub use tempo::*;

mod rounding;

pub mod grid;

mod ruler;
pub use ruler::*;

pub mod conversion_util;

mod session;
pub use session::*;

mod display;
pub use display::*;

mod region_boundary;
pub use region_boundary::*;

mod snap;
pub use snap::*;

mod visual_change;
pub use visual_change::*;

mod scroll;
pub use scroll::*;

mod config;
pub use config::*;

mod editor;
pub use editor::*;

pub type TimelineEngineResult<T> = Result<T, &'static str>;
