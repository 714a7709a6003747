pub mod api;
pub mod common;
pub mod interval;
pub mod runtime;
