// Ripple Field - interactive GPU ripple simulation rendered as a point cloud
// Licensed under MIT License

pub mod camera;
pub mod config;
pub mod coords;
pub mod field;
pub mod gpu;
pub mod points;
pub mod sim;
