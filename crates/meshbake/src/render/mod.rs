pub mod batching;
pub use batching::*;

pub mod culling;
pub use culling::*;

pub mod instance_buffer;
pub use instance_buffer::*;

pub mod scene_manager;
pub use scene_manager::*;

pub mod volumes;
pub use volumes::*;
