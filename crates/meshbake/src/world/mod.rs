mod world;
pub use world::*;

mod config;
pub use config::{CameraConfig, Config};
mod config_loader;
pub use config_loader::load_config;
