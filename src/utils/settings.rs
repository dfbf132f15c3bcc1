//! Terrain settings: noise parameters, mesh sizing, the LOD ladder and
//! change notification, plus binary persistence of the whole bundle.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::constants::*;
use crate::world::curve::HeightCurve;

/// How raw fBm sums are mapped into the output range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Rescale by the observed min/max of a single generation (previews)
    Local,
    /// Rescale by the theoretical amplitude sum so chunks tile seamlessly
    #[default]
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseSettings {
    pub normalize_mode: NormalizeMode,
    /// Greater scale creates larger, more zoomed-in features
    pub scale: f32,
    pub octaves: u32,
    pub persistance: f32,
    pub lacunarity: f32,
    pub seed: i32,
    /// Terrain offset from the origin, in noise sample units
    pub offset: Vec2,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: NormalizeMode::Global,
            scale: 200.0,
            octaves: 6,
            persistance: 0.6,
            lacunarity: 2.0,
            seed: 0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Clamp every field into the range generation expects.
    /// Returns true if anything had to change.
    pub fn validate_values(&mut self) -> bool {
        let before = self.clone();

        self.scale = if self.scale.is_finite() {
            self.scale.max(MIN_NOISE_SCALE)
        } else {
            MIN_NOISE_SCALE
        };
        self.octaves = self.octaves.max(1);
        self.lacunarity = if self.lacunarity.is_finite() {
            self.lacunarity.max(1.0)
        } else {
            1.0
        };
        self.persistance = if self.persistance.is_nan() {
            0.0
        } else {
            self.persistance.clamp(0.0, 1.0)
        };

        let changed = before != *self;
        if changed {
            tracing::warn!(
                "Noise settings clamped: scale {} -> {}, octaves {} -> {}, persistance {} -> {}, lacunarity {} -> {}",
                before.scale,
                self.scale,
                before.octaves,
                self.octaves,
                before.persistance,
                self.persistance,
                before.lacunarity,
                self.lacunarity
            );
        }
        changed
    }

    /// Copy of these settings that passed `validate_values`
    pub fn validated(&self) -> Self {
        let mut settings = self.clone();
        settings.validate_values();
        settings
    }

    pub fn is_valid(&self) -> bool {
        self.scale >= MIN_NOISE_SCALE
            && self.octaves >= 1
            && self.lacunarity >= 1.0
            && (0.0..=1.0).contains(&self.persistance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightMapSettings {
    pub noise_settings: NoiseSettings,
    pub height_multiplier: f32,
    pub height_curve: HeightCurve,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise_settings: NoiseSettings::default(),
            height_multiplier: 40.0,
            height_curve: HeightCurve::terrain(),
        }
    }
}

impl HeightMapSettings {
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSettings {
    pub mesh_scale: f32,
    pub use_flat_shading: bool,
    pub chunk_size_index: usize,
    pub flatshaded_chunk_size_index: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: 2.5,
            use_flat_shading: false,
            chunk_size_index: 0,
            flatshaded_chunk_size_index: 0,
        }
    }
}

impl MeshSettings {
    /// Vertices per line at LOD 0, including the two border vertices used only for normals
    pub fn num_verts_per_line(&self) -> usize {
        let index = if self.use_flat_shading {
            self.flatshaded_chunk_size_index
                .min(NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES - 1)
        } else {
            self.chunk_size_index.min(NUM_SUPPORTED_CHUNK_SIZES - 1)
        };
        SUPPORTED_CHUNK_SIZES[index] + 1
    }

    pub fn mesh_world_size(&self) -> f32 {
        (self.num_verts_per_line() - 3) as f32 * self.mesh_scale
    }

    pub fn validate_values(&mut self) -> bool {
        let before = self.clone();
        if !(self.mesh_scale.is_finite() && self.mesh_scale > 0.0) {
            self.mesh_scale = 1.0;
        }
        self.chunk_size_index = self.chunk_size_index.min(NUM_SUPPORTED_CHUNK_SIZES - 1);
        self.flatshaded_chunk_size_index = self
            .flatshaded_chunk_size_index
            .min(NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES - 1);
        before != *self
    }
}

/// One rung of the LOD ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodInfo {
    /// Mesh detail level, 0 is the most detailed
    pub lod: usize,
    /// Chunks nearer than this (to their nearest edge) use this level
    pub visible_dst_threshold: f32,
}

impl LodInfo {
    pub const fn new(lod: usize, visible_dst_threshold: f32) -> Self {
        LodInfo {
            lod,
            visible_dst_threshold,
        }
    }

    pub fn sqr_visible_dst_threshold(&self) -> f32 {
        self.visible_dst_threshold * self.visible_dst_threshold
    }
}

/// How compute jobs are scheduled off the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dispatch {
    /// One short-lived thread per job
    ThreadPerJob,
    /// A persistent pool with the given number of workers
    Pool(usize),
}

impl Default for Dispatch {
    fn default() -> Self {
        Dispatch::Pool(num_cpus::get().max(1).min(DEFAULT_WORKER_COUNT * 2))
    }
}

/// Everything the terrain streamer needs, in one serializable bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSettings {
    pub height_map: HeightMapSettings,
    pub mesh: MeshSettings,
    pub detail_levels: Vec<LodInfo>,
    pub collider_lod_index: usize,
    #[serde(default)]
    pub dispatch: Dispatch,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            height_map: HeightMapSettings::default(),
            mesh: MeshSettings::default(),
            detail_levels: vec![
                LodInfo::new(0, 200.0),
                LodInfo::new(1, 400.0),
                LodInfo::new(3, 600.0),
            ],
            collider_lod_index: 0,
            dispatch: Dispatch::default(),
        }
    }
}

impl TerrainSettings {
    /// Clamp noise and mesh values, sort the LOD ladder by threshold and drop
    /// duplicate thresholds, and keep the collider LOD inside the ladder.
    pub fn validate(&mut self) -> bool {
        let mut changed = self.height_map.noise_settings.validate_values();
        changed |= self.mesh.validate_values();

        let before = self.detail_levels.clone();
        self.detail_levels
            .retain(|info| info.visible_dst_threshold.is_finite() && info.visible_dst_threshold > 0.0);
        for info in &mut self.detail_levels {
            info.lod = info.lod.min(NUM_SUPPORTED_LODS - 1);
        }
        self.detail_levels
            .sort_by(|a, b| a.visible_dst_threshold.total_cmp(&b.visible_dst_threshold));
        self.detail_levels
            .dedup_by(|a, b| a.visible_dst_threshold == b.visible_dst_threshold);
        if self.detail_levels.is_empty() {
            tracing::warn!("Empty LOD ladder, falling back to a single LOD 0 tier");
            self.detail_levels.push(LodInfo::new(0, self.mesh.mesh_world_size()));
        }
        changed |= before != self.detail_levels;

        let max_index = self.detail_levels.len() - 1;
        if self.collider_lod_index > max_index {
            self.collider_lod_index = max_index;
            changed = true;
        }

        if let Dispatch::Pool(0) = self.dispatch {
            self.dispatch = Dispatch::Pool(1);
            changed = true;
        }

        changed
    }

    pub fn max_view_dst(&self) -> f32 {
        self.detail_levels
            .last()
            .map(|info| info.visible_dst_threshold)
            .unwrap_or(0.0)
    }
}

/// Explicit "values updated" fan-out for settings owners.
/// Subscribers run synchronously, in subscription order, on `notify`.
#[derive(Default)]
pub struct UpdateNotifier {
    subscribers: Vec<Box<dyn FnMut()>>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F: FnMut() + 'static>(&mut self, callback: F) {
        self.subscribers.push(Box::new(callback));
    }

    pub fn notify(&mut self) {
        for callback in &mut self.subscribers {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

const MAGIC_HEADER: &[u8; 4] = b"TGSB";
const VERSION: u32 = 1;

pub fn save_settings<P: AsRef<Path>>(path: P, settings: &TerrainSettings) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC_HEADER)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    bincode::serialize_into(&mut writer, settings)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    writer.flush()
}

pub fn load_settings<P: AsRef<Path>>(path: P) -> io::Result<TerrainSettings> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            "not a terrain settings file",
        ));
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("unsupported settings version: {}", version),
        ));
    }

    let mut settings: TerrainSettings = bincode::deserialize_from(&mut reader)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    settings.validate();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn validate_clamps_invalid_noise_values() {
        let mut settings = NoiseSettings {
            scale: -3.0,
            octaves: 0,
            persistance: 1.7,
            lacunarity: 0.2,
            ..NoiseSettings::default()
        };
        assert!(!settings.is_valid());
        assert!(settings.validate_values());
        assert_eq!(settings.scale, MIN_NOISE_SCALE);
        assert_eq!(settings.octaves, 1);
        assert_eq!(settings.persistance, 1.0);
        assert_eq!(settings.lacunarity, 1.0);
        assert!(settings.is_valid());
        assert!(!settings.validate_values());
    }

    #[test]
    fn mesh_world_size_excludes_border_vertices() {
        let mesh = MeshSettings::default();
        assert_eq!(mesh.num_verts_per_line(), 49);
        assert_eq!(mesh.mesh_world_size(), 46.0 * 2.5);

        let flat = MeshSettings {
            use_flat_shading: true,
            flatshaded_chunk_size_index: 8,
            ..MeshSettings::default()
        };
        assert_eq!(flat.num_verts_per_line(), 97);
    }

    #[test]
    fn validate_orders_lod_ladder_and_clamps_collider() {
        let mut settings = TerrainSettings {
            detail_levels: vec![
                LodInfo::new(2, 300.0),
                LodInfo::new(0, 100.0),
                LodInfo::new(1, 300.0),
                LodInfo::new(9, 500.0),
            ],
            collider_lod_index: 7,
            ..TerrainSettings::default()
        };
        assert!(settings.validate());
        let thresholds: Vec<f32> = settings
            .detail_levels
            .iter()
            .map(|l| l.visible_dst_threshold)
            .collect();
        assert_eq!(thresholds, vec![100.0, 300.0, 500.0]);
        assert_eq!(settings.detail_levels[2].lod, NUM_SUPPORTED_LODS - 1);
        assert_eq!(settings.collider_lod_index, 2);
        assert_eq!(settings.max_view_dst(), 500.0);
    }

    #[test]
    fn min_and_max_height_follow_curve_ends() {
        let settings = HeightMapSettings {
            height_multiplier: 10.0,
            height_curve: HeightCurve::linear(),
            ..HeightMapSettings::default()
        };
        assert_eq!(settings.min_height(), 0.0);
        assert_eq!(settings.max_height(), 10.0);
    }

    #[test]
    fn notifier_runs_every_subscriber() {
        let hits = Rc::new(Cell::new(0));
        let mut notifier = UpdateNotifier::new();
        for _ in 0..3 {
            let hits = Rc::clone(&hits);
            notifier.subscribe(move || hits.set(hits.get() + 1));
        }
        notifier.notify();
        assert_eq!(notifier.len(), 3);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn settings_survive_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "terrain-gen-settings-{}.{}",
            std::process::id(),
            SETTINGS_FILE_EXTENSION
        ));
        let mut settings = TerrainSettings::default();
        settings.height_map.noise_settings.seed = 1234;
        settings.dispatch = Dispatch::ThreadPerJob;

        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_rejects_foreign_files() {
        let path = std::env::temp_dir().join(format!(
            "terrain-gen-foreign-{}.{}",
            std::process::id(),
            SETTINGS_FILE_EXTENSION
        ));
        std::fs::write(&path, b"NOPE0000").unwrap();
        let err = load_settings(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
