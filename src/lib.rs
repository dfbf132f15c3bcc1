// Core module with coordinates, bounds and height grids
pub mod core;

// Render module with meshes, proxies and previews
pub mod render;

// Settings and persistence
pub mod utils;

// World module with noise, chunks and streaming
pub mod world;

// Other modules
pub mod constants;

// Re-exports
pub use constants::*;
pub use crate::core::{Bounds, ChunkCoord, HeightMap, NoiseMap};
pub use render::{DrawMode, HeadlessProxy, MapPreview, MeshBuilder, MeshData, RenderProxy};
pub use utils::settings::{
    Dispatch, HeightMapSettings, LodInfo, MeshSettings, NoiseSettings, NormalizeMode,
    TerrainSettings, UpdateNotifier, load_settings, save_settings,
};
pub use world::{DataRequester, HeightCurve, TerrainGenerator, generate_height_map, generate_noise_map};
