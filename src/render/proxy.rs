use std::sync::Arc;

use crate::core::coord::ChunkCoord;
use crate::render::mesh::MeshData;

/// Engine-side handle a terrain chunk drives: show/hide, swap the displayed
/// mesh, attach the collision mesh. Lives on the consumer thread only.
pub trait RenderProxy {
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    fn set_mesh(&mut self, mesh: Arc<MeshData>);
    fn set_collider(&mut self, mesh: Arc<MeshData>);
}

/// Creates one proxy per chunk when the streamer first sees its coordinate
pub type ProxyFactory = Box<dyn FnMut(ChunkCoord) -> Box<dyn RenderProxy>>;

/// Proxy that only records what it was told; used when nothing renders
#[derive(Debug, Default)]
pub struct HeadlessProxy {
    visible: bool,
    mesh: Option<Arc<MeshData>>,
    collider: Option<Arc<MeshData>>,
    mesh_assignments: usize,
}

impl HeadlessProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> ProxyFactory {
        Box::new(|_| Box::new(HeadlessProxy::new()))
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        self.mesh.as_ref()
    }

    pub fn collider(&self) -> Option<&Arc<MeshData>> {
        self.collider.as_ref()
    }

    pub fn mesh_assignments(&self) -> usize {
        self.mesh_assignments
    }
}

impl RenderProxy for HeadlessProxy {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_mesh(&mut self, mesh: Arc<MeshData>) {
        self.mesh = Some(mesh);
        self.mesh_assignments += 1;
    }

    fn set_collider(&mut self, mesh: Arc<MeshData>) {
        self.collider = Some(mesh);
    }
}
