pub mod bounds;
pub mod duration;
pub mod window;

#[cfg(test)]
mod window_tests;

pub use bounds::Bounds;
pub use duration::{add_duration, Duration, Time, EPOCH, MAX_TIME, MIN_TIME};
pub use window::{Window, WindowBounds};
