//! Single-chunk preview of the current settings
//!
//! Generates one height map at the world origin with Local normalization,
//! so the full 0..1 range is used, and turns it into a texture or a mesh.
//! Hooks into an [`UpdateNotifier`] so settings edits mark it for redraw.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;
use image::GrayImage;

use crate::constants::NUM_SUPPORTED_LODS;
use crate::core::height_map::HeightMap;
use crate::render::mesh::{MeshBuilder, MeshData, TerrainMeshBuilder};
use crate::render::texture::texture_from_height_map;
use crate::utils::settings::{NormalizeMode, TerrainSettings, UpdateNotifier};
use crate::world::generator::generate_height_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    NoiseMap,
    Mesh,
}

#[derive(Debug, Clone)]
pub enum PreviewOutput {
    Texture(GrayImage),
    Mesh(MeshData),
}

pub struct MapPreview {
    pub draw_mode: DrawMode,
    editor_preview_lod: usize,
    settings: TerrainSettings,
    dirty: Rc<Cell<bool>>,
    last_height_map: Option<HeightMap>,
}

impl MapPreview {
    pub fn new(settings: TerrainSettings, draw_mode: DrawMode) -> Self {
        MapPreview {
            draw_mode,
            editor_preview_lod: 0,
            settings,
            dirty: Rc::new(Cell::new(true)),
            last_height_map: None,
        }
    }

    pub fn editor_preview_lod(&self) -> usize {
        self.editor_preview_lod
    }

    pub fn set_editor_preview_lod(&mut self, lod: usize) {
        self.editor_preview_lod = lod.min(NUM_SUPPORTED_LODS - 1);
        self.dirty.set(true);
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TerrainSettings) {
        self.settings = settings;
        self.dirty.set(true);
    }

    /// Mark this preview stale whenever `notifier` fires
    pub fn watch(&self, notifier: &mut UpdateNotifier) {
        let dirty = Rc::clone(&self.dirty);
        notifier.subscribe(move || dirty.set(true));
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty.get()
    }

    /// Height map from the last draw
    pub fn height_map(&self) -> Option<&HeightMap> {
        self.last_height_map.as_ref()
    }

    pub fn draw_map_in_editor(&mut self) -> PreviewOutput {
        let mut height_settings = self.settings.height_map.clone();
        height_settings.noise_settings.normalize_mode = NormalizeMode::Local;
        height_settings.noise_settings.validate_values();

        let num_verts_per_line = self.settings.mesh.num_verts_per_line();
        let height_map = generate_height_map(
            num_verts_per_line,
            num_verts_per_line,
            &height_settings,
            Vec2::ZERO,
        );

        let output = match self.draw_mode {
            DrawMode::NoiseMap => PreviewOutput::Texture(texture_from_height_map(&height_map)),
            DrawMode::Mesh => PreviewOutput::Mesh(TerrainMeshBuilder.build_mesh(
                &height_map,
                &self.settings.mesh,
                self.editor_preview_lod,
            )),
        };
        tracing::debug!(
            "Preview redrawn: {:?}, range {:.3}..{:.3}",
            self.draw_mode,
            height_map.min_value,
            height_map.max_value
        );

        self.last_height_map = Some(height_map);
        self.dirty.set(false);
        output
    }

    /// Redraw only if something changed since the last draw
    pub fn refresh(&mut self) -> Option<PreviewOutput> {
        if self.dirty.get() {
            Some(self.draw_map_in_editor())
        } else {
            None
        }
    }
}
