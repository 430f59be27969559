pub mod accessor;
pub use accessor::*;

pub mod document;
pub use document::*;

pub mod nodes;
pub use nodes::*;

pub mod reader;
pub use reader::*;
