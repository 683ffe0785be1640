//! Renderer error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// WGSL failed to parse or validate.
    #[error("shader '{label}' failed to compile: {message}")]
    Shader { label: String, message: String },

    /// A vertex input every program must declare is missing.
    #[error("shader '{label}' has no '{attribute}' vertex input")]
    MissingAttribute {
        label: String,
        attribute: &'static str,
    },

    /// The platform refused to allocate a GPU object. Not retried.
    #[error("GPU refused to create {what}: {message}")]
    GpuResource { what: String, message: String },

    /// Decoded pixels that do not cover the stated size.
    #[error("texture '{label}' has {bytes} bytes for {width}x{height} pixels")]
    InvalidTexture {
        label: String,
        width: u32,
        height: u32,
        bytes: usize,
    },

    #[error("mesh has {vertices} vertices, more than a 16-bit index buffer can address")]
    Capacity { vertices: usize },

    #[error(transparent)]
    Asset(#[from] asset::AssetError),

    #[error("renderer initialisation failed: {0}")]
    Init(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
