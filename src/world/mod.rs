//! World generation and streaming modules
//! Contains noise sampling, height maps, chunk lifecycle, job dispatch and the streamer.

pub mod chunk;
pub mod curve;
pub mod generator;
pub mod loader;
pub mod noise;
pub mod terrain;

// Re-export commonly used types
pub use chunk::{HeightState, LodMesh, MeshState, TerrainChunk};
pub use curve::{CurveEvaluator, CurveInterpolation, CurveKey, HeightCurve};
pub use generator::generate_height_map;
pub use loader::{DataRequester, Job};
pub use noise::{generate_noise_map, max_possible_height};
pub use terrain::{TerrainGenerator, TerrainRequester, TerrainState};
