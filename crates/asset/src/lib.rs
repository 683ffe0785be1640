//! Asset ingestion: OBJ/MTL text parsing, vertex deduplication, procedural
//! primitives and texture decoding. Everything here is CPU-only and
//! reentrant; GPU upload lives in the `renderer` crate.

pub mod assemble;
pub mod error;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod primitives;
pub mod texture;

pub use assemble::assemble;
pub use error::{AssetError, Attribute, Diagnostic, Parsed};
pub use loader::{LoadedMesh, load_mtl_from_path, load_obj_from_path};
pub use material::Material;
pub use mesh::{DEFAULT_MATERIAL, MAX_VERTICES, MaterialGroup, Mesh, MeshParts, MeshSource};
pub use mtl::{MaterialLibrary, parse_mtl};
pub use obj::{ObjDocument, ObjSource, load_obj_from_str, parse_obj};
pub use primitives::{Cube, Plane, Sphere};
pub use texture::TextureData;
