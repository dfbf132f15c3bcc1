//! Terrain chunk lifecycle
//!
//! A chunk moves through three independent tracks:
//! - height: `Created -> Pending -> Ready`, set once and never replaced
//! - per LOD mesh: `NotRequested -> Pending -> Ready`, cached for the chunk's lifetime
//! - collider: unset until the viewer comes close enough, then set exactly once
//!
//! Visibility is re-derived on every update from the viewer distance. All
//! methods run on the consumer thread; heavy work goes through the
//! [`TerrainRequester`].

use std::sync::Arc;

use glam::Vec2;

use crate::constants::COLLIDER_GENERATION_DISTANCE_THRESHOLD;
use crate::core::bounds::Bounds;
use crate::core::coord::ChunkCoord;
use crate::core::height_map::HeightMap;
use crate::render::mesh::{MeshBuilder, MeshData};
use crate::render::proxy::RenderProxy;
use crate::utils::settings::TerrainSettings;
use crate::world::generator::generate_height_map;
use crate::world::terrain::{TerrainRequester, TerrainState};

#[derive(Debug, Clone)]
pub enum HeightState {
    Created,
    Pending,
    Ready(Arc<HeightMap>),
}

#[derive(Debug, Clone)]
pub enum MeshState {
    NotRequested,
    Pending,
    Ready(Arc<MeshData>),
}

/// Mesh cache slot for one rung of the LOD ladder
#[derive(Debug)]
pub struct LodMesh {
    lod: usize,
    state: MeshState,
    requests: usize,
}

impl LodMesh {
    fn new(lod: usize) -> Self {
        LodMesh {
            lod,
            state: MeshState::NotRequested,
            requests: 0,
        }
    }

    pub fn lod(&self) -> usize {
        self.lod
    }

    pub fn state(&self) -> &MeshState {
        &self.state
    }

    pub fn has_requested_mesh(&self) -> bool {
        !matches!(self.state, MeshState::NotRequested)
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        match &self.state {
            MeshState::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// How many jobs were ever submitted for this slot
    pub fn requests(&self) -> usize {
        self.requests
    }
}

pub struct TerrainChunk {
    coord: ChunkCoord,
    sample_centre: Vec2,
    bounds: Bounds,
    settings: Arc<TerrainSettings>,
    mesh_builder: Arc<dyn MeshBuilder>,
    proxy: Box<dyn RenderProxy>,
    height: HeightState,
    lod_meshes: Vec<LodMesh>,
    previous_lod_index: Option<usize>,
    has_set_collider: bool,
    visible: bool,
    max_view_dst: f32,
}

impl TerrainChunk {
    pub fn new(
        coord: ChunkCoord,
        settings: Arc<TerrainSettings>,
        mesh_builder: Arc<dyn MeshBuilder>,
        mut proxy: Box<dyn RenderProxy>,
    ) -> Self {
        let mesh_world_size = settings.mesh.mesh_world_size();
        let sample_centre = coord.as_vec2() * mesh_world_size / settings.mesh.mesh_scale;
        let position = coord.as_vec2() * mesh_world_size;
        let bounds = Bounds::from_center_size(position, Vec2::splat(mesh_world_size));

        let lod_meshes = settings
            .detail_levels
            .iter()
            .map(|info| LodMesh::new(info.lod))
            .collect();
        let max_view_dst = settings.max_view_dst();

        proxy.set_visible(false);

        TerrainChunk {
            coord,
            sample_centre,
            bounds,
            settings,
            mesh_builder,
            proxy,
            height: HeightState::Created,
            lod_meshes,
            previous_lod_index: None,
            has_set_collider: false,
            visible: false,
            max_view_dst,
        }
    }

    /// Start generating this chunk's height map. Only the first call does anything.
    pub fn load(&mut self, requester: &TerrainRequester) {
        if !matches!(self.height, HeightState::Created) {
            return;
        }
        self.height = HeightState::Pending;

        let coord = self.coord;
        let settings = Arc::clone(&self.settings);
        let sample_centre = self.sample_centre;
        let num_verts_per_line = settings.mesh.num_verts_per_line();
        tracing::debug!("Chunk {} requesting height map", coord);

        requester.request_data(
            move || {
                generate_height_map(
                    num_verts_per_line,
                    num_verts_per_line,
                    &settings.height_map,
                    sample_centre,
                )
            },
            move |height_map, state: &mut TerrainState, requester| {
                state.on_height_map_received(coord, height_map, requester);
            },
        );
    }

    /// Store a finished height map and re-evaluate the chunk.
    /// Returns the new visibility if it changed.
    pub fn on_height_map_received(
        &mut self,
        height_map: HeightMap,
        viewer_position: Vec2,
        requester: &TerrainRequester,
    ) -> Option<bool> {
        if let HeightState::Ready(_) = self.height {
            tracing::trace!("Chunk {} ignoring duplicate height map", self.coord);
            return None;
        }
        self.height = HeightState::Ready(Arc::new(height_map));
        tracing::debug!("Chunk {} height map ready", self.coord);

        let change = self.update_terrain_chunk(viewer_position, requester);
        self.update_collision_mesh(viewer_position, requester);
        change
    }

    /// Store a finished mesh for a ladder slot and re-evaluate the chunk.
    /// Returns the new visibility if it changed.
    pub fn on_mesh_received(
        &mut self,
        lod_index: usize,
        mesh: MeshData,
        viewer_position: Vec2,
        requester: &TerrainRequester,
    ) -> Option<bool> {
        let Some(slot) = self.lod_meshes.get_mut(lod_index) else {
            tracing::warn!("Chunk {} got mesh for unknown LOD slot {}", self.coord, lod_index);
            return None;
        };
        if let MeshState::Ready(_) = slot.state {
            tracing::trace!("Chunk {} ignoring duplicate mesh for slot {}", self.coord, lod_index);
            return None;
        }
        slot.state = MeshState::Ready(Arc::new(mesh));
        tracing::debug!("Chunk {} mesh ready for LOD {}", self.coord, slot.lod);

        let change = self.update_terrain_chunk(viewer_position, requester);
        self.update_collision_mesh(viewer_position, requester);
        change
    }

    /// Ladder slot to display at `distance` from the chunk's nearest edge
    pub fn lod_index_for_distance(&self, distance: f32) -> usize {
        let levels = &self.settings.detail_levels;
        let mut lod_index = 0;
        for (i, info) in levels.iter().enumerate().take(levels.len().saturating_sub(1)) {
            if distance > info.visible_dst_threshold {
                lod_index = i + 1;
            } else {
                break;
            }
        }
        lod_index
    }

    /// Recompute visibility and make sure the right LOD mesh is shown or requested.
    /// Returns the new visibility if it changed.
    pub fn update_terrain_chunk(
        &mut self,
        viewer_position: Vec2,
        requester: &TerrainRequester,
    ) -> Option<bool> {
        let HeightState::Ready(height_map) = &self.height else {
            return None;
        };
        let height_map = Arc::clone(height_map);

        let viewer_dst_from_nearest_edge = self.bounds.distance(viewer_position);
        let was_visible = self.visible;
        let visible = viewer_dst_from_nearest_edge <= self.max_view_dst;

        if visible {
            let lod_index = self.lod_index_for_distance(viewer_dst_from_nearest_edge);

            if self.previous_lod_index != Some(lod_index) {
                let Some(slot) = self.lod_meshes.get(lod_index) else {
                    tracing::debug!("Chunk {} has no LOD slot {}", self.coord, lod_index);
                    return self.apply_visibility(was_visible, visible);
                };
                if let Some(mesh) = slot.mesh().cloned() {
                    self.previous_lod_index = Some(lod_index);
                    self.proxy.set_mesh(mesh);
                } else if !slot.has_requested_mesh() {
                    self.request_mesh(lod_index, height_map, requester);
                }
            }
        }

        self.apply_visibility(was_visible, visible)
    }

    fn apply_visibility(&mut self, was_visible: bool, visible: bool) -> Option<bool> {
        if was_visible == visible {
            return None;
        }
        self.set_visible(visible);
        Some(visible)
    }

    /// Request the collider mesh when in view range and attach it once the
    /// viewer is close enough. The collider is attached at most once.
    pub fn update_collision_mesh(&mut self, viewer_position: Vec2, requester: &TerrainRequester) {
        if self.has_set_collider {
            return;
        }
        let HeightState::Ready(height_map) = &self.height else {
            return;
        };
        let height_map = Arc::clone(height_map);

        let collider_index = self
            .settings
            .collider_lod_index
            .min(self.lod_meshes.len().saturating_sub(1));
        if collider_index >= self.lod_meshes.len() {
            return;
        }

        let sqr_dst_from_viewer_to_edge = self.bounds.sqr_distance(viewer_position);

        if sqr_dst_from_viewer_to_edge < self.max_view_dst * self.max_view_dst
            && !self.lod_meshes[collider_index].has_requested_mesh()
        {
            self.request_mesh(collider_index, height_map, requester);
        }

        if sqr_dst_from_viewer_to_edge
            < COLLIDER_GENERATION_DISTANCE_THRESHOLD * COLLIDER_GENERATION_DISTANCE_THRESHOLD
        {
            if let Some(mesh) = self.lod_meshes[collider_index].mesh().cloned() {
                self.proxy.set_collider(mesh);
                self.has_set_collider = true;
                tracing::debug!("Chunk {} collider set", self.coord);
            }
        }
    }

    fn request_mesh(
        &mut self,
        lod_index: usize,
        height_map: Arc<HeightMap>,
        requester: &TerrainRequester,
    ) {
        let slot = &mut self.lod_meshes[lod_index];
        if slot.has_requested_mesh() {
            return;
        }
        slot.state = MeshState::Pending;
        slot.requests += 1;

        let coord = self.coord;
        let lod = slot.lod;
        let settings = Arc::clone(&self.settings);
        let builder = Arc::clone(&self.mesh_builder);
        tracing::debug!("Chunk {} requesting mesh for LOD {}", coord, lod);

        requester.request_data(
            move || builder.build_mesh(&height_map, &settings.mesh, lod),
            move |mesh, state: &mut TerrainState, requester| {
                state.on_mesh_received(coord, lod_index, mesh, requester);
            },
        );
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.proxy.set_visible(visible);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn sample_centre(&self) -> Vec2 {
        self.sample_centre
    }

    pub fn height_state(&self) -> &HeightState {
        &self.height
    }

    pub fn height_map(&self) -> Option<&Arc<HeightMap>> {
        match &self.height {
            HeightState::Ready(map) => Some(map),
            _ => None,
        }
    }

    pub fn lod_meshes(&self) -> &[LodMesh] {
        &self.lod_meshes
    }

    /// Ladder slot whose mesh is currently shown
    pub fn previous_lod_index(&self) -> Option<usize> {
        self.previous_lod_index
    }

    pub fn has_set_collider(&self) -> bool {
        self.has_set_collider
    }

    pub fn proxy(&self) -> &dyn RenderProxy {
        self.proxy.as_ref()
    }
}
