pub mod errors;
pub use errors::*;

pub mod matrix;
pub use matrix::*;

pub mod logging;
pub use logging::*;
