// Chunk streaming constants
pub const VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE: f32 = 25.0;
pub const SQR_VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE: f32 =
    VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE * VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE;
pub const COLLIDER_GENERATION_DISTANCE_THRESHOLD: f32 = 100.0;

// Mesh constants
pub const NUM_SUPPORTED_LODS: usize = 5;
pub const NUM_SUPPORTED_CHUNK_SIZES: usize = 9;
pub const NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES: usize = 3;
pub const SUPPORTED_CHUNK_SIZES: [usize; NUM_SUPPORTED_CHUNK_SIZES] =
    [48, 72, 96, 120, 144, 168, 192, 216, 240];

// Noise constants
/// Perlin noise loses precision far from the origin, so octave offsets stay inside this range.
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;
/// Global normalization assumes the sum of amplitudes rarely exceeds this fraction of the maximum.
pub const GLOBAL_NORMALIZE_ESTIMATE: f32 = 0.9;
pub const MIN_NOISE_SCALE: f32 = 0.01;

// Worker constants
pub const DEFAULT_WORKER_COUNT: usize = 4;

pub const SETTINGS_FILE_EXTENSION: &str = "tgs";
pub const DEFAULT_SETTINGS_FILE: &str = "terrain.tgs";
