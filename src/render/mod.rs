//! Rendering-facing modules
//! Contains mesh building, render proxies, texture generation and the settings preview.

pub mod mesh;
pub mod preview;
pub mod proxy;
pub mod texture;

// Re-export commonly used types
pub use mesh::{MeshBuilder, MeshData, TerrainMeshBuilder, Vertex, flat_shade, lod_stride};
pub use preview::{DrawMode, MapPreview, PreviewOutput};
pub use proxy::{HeadlessProxy, ProxyFactory, RenderProxy};
pub use texture::{
    TerrainBand, colour_map_from_height_map, default_bands, save_texture, texture_from_height_map,
    texture_from_noise_map,
};
