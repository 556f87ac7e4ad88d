mod evictor;
mod store;
mod timers;
mod watermark;

pub use evictor::{EvictReport, eviction_threshold};
pub use store::{KeyedWindow, WindowStore};
pub use timers::TimerService;
pub use watermark::WatermarkGenerator;
