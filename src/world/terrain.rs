//! Endless terrain streaming around a single viewer
//!
//! [`TerrainGenerator`] owns the chunk map and the data requester. Each tick
//! it applies finished jobs, refreshes colliders of visible chunks when the
//! viewer moved, and after larger moves rescans the square neighbourhood of
//! chunks around the viewer. Chunks are created on first sight and kept for
//! the lifetime of the generator.

use std::sync::Arc;

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constants::SQR_VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE;
use crate::core::coord::ChunkCoord;
use crate::core::height_map::HeightMap;
use crate::render::mesh::{MeshBuilder, MeshData, TerrainMeshBuilder};
use crate::render::proxy::{HeadlessProxy, ProxyFactory};
use crate::utils::settings::TerrainSettings;
use crate::world::chunk::TerrainChunk;
use crate::world::loader::DataRequester;

pub type TerrainRequester = DataRequester<TerrainState>;

/// Chunk state touched by job completions, always on the consumer thread
pub struct TerrainState {
    chunks: FxHashMap<ChunkCoord, TerrainChunk>,
    visible_chunks: Vec<ChunkCoord>,
    visibility_changes: Vec<(ChunkCoord, bool)>,
    viewer_position: Vec2,
}

impl TerrainState {
    fn new() -> Self {
        TerrainState {
            chunks: FxHashMap::default(),
            visible_chunks: Vec::new(),
            visibility_changes: Vec::new(),
            viewer_position: Vec2::ZERO,
        }
    }

    pub fn viewer_position(&self) -> Vec2 {
        self.viewer_position
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub(crate) fn on_height_map_received(
        &mut self,
        coord: ChunkCoord,
        height_map: HeightMap,
        requester: &TerrainRequester,
    ) {
        let viewer = self.viewer_position;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            tracing::trace!("Height map for unknown chunk {} dropped", coord);
            return;
        };
        let change = chunk.on_height_map_received(height_map, viewer, requester);
        self.apply_visibility_change(coord, change);
    }

    pub(crate) fn on_mesh_received(
        &mut self,
        coord: ChunkCoord,
        lod_index: usize,
        mesh: MeshData,
        requester: &TerrainRequester,
    ) {
        let viewer = self.viewer_position;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            tracing::trace!("Mesh for unknown chunk {} dropped", coord);
            return;
        };
        let change = chunk.on_mesh_received(lod_index, mesh, viewer, requester);
        self.apply_visibility_change(coord, change);
    }

    fn update_terrain_chunk(&mut self, coord: ChunkCoord, requester: &TerrainRequester) {
        let viewer = self.viewer_position;
        if let Some(chunk) = self.chunks.get_mut(&coord) {
            let change = chunk.update_terrain_chunk(viewer, requester);
            self.apply_visibility_change(coord, change);
        }
    }

    fn update_collision_mesh(&mut self, coord: ChunkCoord, requester: &TerrainRequester) {
        let viewer = self.viewer_position;
        if let Some(chunk) = self.chunks.get_mut(&coord) {
            chunk.update_collision_mesh(viewer, requester);
        }
    }

    /// Visible-set bookkeeping driven only by chunk visibility flips
    fn apply_visibility_change(&mut self, coord: ChunkCoord, change: Option<bool>) {
        let Some(visible) = change else {
            return;
        };
        if visible {
            self.visible_chunks.push(coord);
        } else {
            self.visible_chunks.retain(|c| *c != coord);
        }
        self.visibility_changes.push((coord, visible));
        tracing::trace!("Chunk {} visibility -> {}", coord, visible);
    }
}

/// Manages generation and visibility of terrain chunks around the viewer
pub struct TerrainGenerator {
    settings: Arc<TerrainSettings>,
    mesh_builder: Arc<dyn MeshBuilder>,
    proxy_factory: ProxyFactory,
    requester: TerrainRequester,
    state: TerrainState,
    /// Viewer position at the last full neighbourhood scan
    viewer_position_old: Vec2,
    /// Viewer position on the previous tick
    last_tick_position: Option<Vec2>,
    mesh_world_size: f32,
    chunks_visible_in_view_dst: i32,
    started: bool,
}

impl TerrainGenerator {
    /// Generator with the stock mesh builder and headless proxies
    pub fn new(settings: TerrainSettings) -> Self {
        Self::with_collaborators(settings, Arc::new(TerrainMeshBuilder), HeadlessProxy::factory())
    }

    pub fn with_collaborators(
        mut settings: TerrainSettings,
        mesh_builder: Arc<dyn MeshBuilder>,
        proxy_factory: ProxyFactory,
    ) -> Self {
        settings.validate();

        let max_view_dst = settings.max_view_dst();
        let mesh_world_size = settings.mesh.mesh_world_size();
        let chunks_visible_in_view_dst = (max_view_dst / mesh_world_size).ceil() as i32;
        let requester = DataRequester::new(settings.dispatch);

        tracing::info!(
            "Terrain generator: chunk size {}, view distance {}, {} chunks each way, {} LOD levels",
            mesh_world_size,
            max_view_dst,
            chunks_visible_in_view_dst,
            settings.detail_levels.len()
        );

        TerrainGenerator {
            settings: Arc::new(settings),
            mesh_builder,
            proxy_factory,
            requester,
            state: TerrainState::new(),
            viewer_position_old: Vec2::ZERO,
            last_tick_position: None,
            mesh_world_size,
            chunks_visible_in_view_dst,
            started: false,
        }
    }

    /// Initial neighbourhood scan around the viewer's starting position
    pub fn start(&mut self, viewer_position: Vec2) {
        self.state.viewer_position = viewer_position;
        self.viewer_position_old = viewer_position;
        self.last_tick_position = Some(viewer_position);
        self.started = true;
        self.update_visible_chunks();
    }

    /// Per-tick update with the viewer's current ground-plane position
    pub fn update(&mut self, viewer_position: Vec2) {
        if !self.started {
            self.start(viewer_position);
        }
        self.state.viewer_position = viewer_position;

        self.requester.drain(&mut self.state);

        if self.last_tick_position != Some(viewer_position) {
            let visible = self.state.visible_chunks.clone();
            for coord in visible {
                self.state.update_collision_mesh(coord, &self.requester);
            }
        }

        if (self.viewer_position_old - viewer_position).length_squared()
            > SQR_VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE
        {
            self.viewer_position_old = viewer_position;
            self.update_visible_chunks();
        }

        self.last_tick_position = Some(viewer_position);
    }

    fn update_visible_chunks(&mut self) {
        let mut already_updated_chunk_coords = FxHashSet::default();

        // Chunks sliding out of range still need their hide transition
        let visible = self.state.visible_chunks.clone();
        for coord in visible.into_iter().rev() {
            already_updated_chunk_coords.insert(coord);
            self.state.update_terrain_chunk(coord, &self.requester);
        }

        let current = ChunkCoord::containing(self.state.viewer_position, self.mesh_world_size);
        let range = self.chunks_visible_in_view_dst;
        let mut created = 0;

        for y_offset in -range..=range {
            for x_offset in -range..=range {
                let viewed_chunk_coord = current.offset(x_offset, y_offset);
                if already_updated_chunk_coords.contains(&viewed_chunk_coord) {
                    continue;
                }

                if self.state.chunks.contains_key(&viewed_chunk_coord) {
                    self.state
                        .update_terrain_chunk(viewed_chunk_coord, &self.requester);
                } else {
                    let proxy = (self.proxy_factory)(viewed_chunk_coord);
                    let mut chunk = TerrainChunk::new(
                        viewed_chunk_coord,
                        Arc::clone(&self.settings),
                        Arc::clone(&self.mesh_builder),
                        proxy,
                    );
                    chunk.load(&self.requester);
                    self.state.chunks.insert(viewed_chunk_coord, chunk);
                    created += 1;
                }
            }
        }

        tracing::debug!(
            "Chunk scan around {}: {} created, {} tracked, {} visible",
            current,
            created,
            self.state.chunks.len(),
            self.state.visible_chunks.len()
        );
    }

    /// Apply finished jobs without moving the viewer
    pub fn poll(&mut self) -> usize {
        self.requester.drain(&mut self.state)
    }

    /// Block until every outstanding job, including follow-ups, has been
    /// computed and applied. For tools and tests; a frame loop should use `update`.
    pub fn settle(&mut self) -> usize {
        self.requester.settle(&mut self.state)
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn viewer_position(&self) -> Vec2 {
        self.state.viewer_position
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.state.chunk(coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.state.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.state.chunks.len()
    }

    /// Chunks currently shown, in the order they became visible
    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.state.visible_chunks
    }

    /// Visibility flips since the last call, oldest first
    pub fn drain_visibility_changes(&mut self) -> Vec<(ChunkCoord, bool)> {
        std::mem::take(&mut self.state.visibility_changes)
    }

    pub fn chunks_visible_in_view_dst(&self) -> i32 {
        self.chunks_visible_in_view_dst
    }

    pub fn mesh_world_size(&self) -> f32 {
        self.mesh_world_size
    }

    pub fn jobs_in_flight(&self) -> usize {
        self.requester.in_flight()
    }

    pub fn jobs_submitted(&self) -> u64 {
        self.requester.submitted()
    }
}
