//! Core data structures for terrain generation
//! Contains chunk coordinates, chunk bounds and height grids.

pub mod bounds;
pub mod coord;
pub mod height_map;

// Re-export commonly used types
pub use bounds::Bounds;
pub use coord::ChunkCoord;
pub use height_map::{HeightMap, NoiseMap, inverse_lerp};
