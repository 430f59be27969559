use thiserror::Error;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported scene format: {0}")]
    UnsupportedFormat(String),

    #[error("mesh {mesh} primitive {primitive} has no POSITION attribute")]
    MissingPosition { mesh: usize, primitive: usize },

    #[error("mesh {mesh} primitive {primitive}: unsupported index component type {component_type}")]
    UnsupportedIndexType {
        mesh: usize,
        primitive: usize,
        component_type: u32,
    },

    #[error("accessor {accessor}: unsupported component type {component_type}")]
    UnsupportedComponentType { accessor: usize, component_type: u32 },

    #[error("accessor {accessor} reads past the end of its data ({needed} > {available} bytes)")]
    AccessorOutOfBounds {
        accessor: usize,
        needed: usize,
        available: usize,
    },

    #[error("Buffer error: {0}")]
    Buffer(String),

    #[error("Not a baked asset: {0}")]
    InvalidBakedLayout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unexpected internal error: {0}")]
    Internal(String),
}

pub trait BakeContext<T> {
    fn bake_context(self, msg: &str) -> Result<T, BakeError>;
}

impl<T, E> BakeContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn bake_context(self, msg: &str) -> Result<T, BakeError> {
        self.map_err(|e| BakeError::InvalidInput(format!("{}: {}", msg, e)))
    }
}
