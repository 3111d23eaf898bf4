pub mod icons;
pub mod timeline;

pub use timeline::{WatchUI, render_summary, render_timeline};
