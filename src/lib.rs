// Re-export all public modules so they can be used from main.rs
pub mod frame_clock;
pub mod logging;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;
