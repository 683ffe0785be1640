//! Error and diagnostic types shared by the parsers and the mesh assembler.

use std::fmt;

use thiserror::Error;

/// Fatal conditions: the mesh cannot be produced at all.
#[derive(Debug, Error, PartialEq)]
pub enum AssetError {
    /// More distinct vertices than a 16-bit index buffer can address.
    #[error("mesh needs {vertices} vertices, but at most {limit} fit a 16-bit index buffer")]
    CapacityExceeded { vertices: usize, limit: usize },

    #[error("geometry contained no triangles")]
    Empty,

    /// A producer handed over data that breaks a mesh invariant.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

/// Vertex attribute pools a face corner can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    TexCoord,
    Normal,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attribute::Position => "position",
            Attribute::TexCoord => "texture coordinate",
            Attribute::Normal => "normal",
        })
    }
}

/// Recoverable problems found while ingesting text assets.
///
/// The offending record is skipped (or patched with a neutral value) and
/// parsing carries on; callers decide whether to surface these.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Diagnostic {
    #[error("line {line}: face has {corners} corner(s), at least 3 required")]
    FaceTooSmall { line: usize, corners: usize },

    #[error("line {line}: {attribute} index {index} out of range (pool holds {len})")]
    IndexOutOfRange {
        line: usize,
        attribute: Attribute,
        index: i64,
        len: usize,
    },

    #[error("line {line}: invalid value '{token}' for '{directive}'")]
    InvalidNumber {
        line: usize,
        directive: String,
        token: String,
    },

    #[error("line {line}: '{directive}' requires a name")]
    MissingName { line: usize, directive: String },

    #[error("line {line}: '{directive}' appears before any 'newmtl' and was ignored")]
    OrphanProperty { line: usize, directive: String },

    #[error("material '{name}' is not defined in the material library; using a neutral default")]
    UnresolvedMaterial { name: String },

    #[error("{vertices} vertex(es) lack a {attribute}; filled with zeros")]
    MissingAttribute { attribute: Attribute, vertices: usize },
}

/// A successfully produced value together with the diagnostics raised on the way.
#[derive(Clone, Debug)]
pub struct Parsed<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// Log every diagnostic at `warn` under the given source label.
    pub fn log_diagnostics(&self, source: &str) {
        for diagnostic in &self.diagnostics {
            log::warn!("{source}: {diagnostic}");
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
