//! The narrow interface through which loaders talk to a render engine.
//!
//! Loaders never touch GPU state directly. Everything they produce reaches
//! the engine through [`Engine`]: entity allocation via the shared
//! [`EntityRegistry`] and resource uploads via the `upload_*` methods.
//! Uploads are only ever issued from the thread that called
//! [`ResourceLoader::load_resources`](crate::ResourceLoader::load_resources)
//! or [`AsyncLoad::update`](crate::AsyncLoad::update).

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::entity::EntityRegistry;
use crate::mesh::VertexLayout;

/// Engine-side handle of an uploaded vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Engine-side handle of an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Render engine collaborator.
pub trait Engine: Send + Sync {
    /// Registry that owns every entity created for this engine.
    fn entities(&self) -> &EntityRegistry;

    /// Uploads an interleaved vertex stream described by `layout`.
    fn upload_vertex_buffer(&self, label: &str, layout: &VertexLayout, data: &[u8]) -> BufferId;

    /// Uploads a `u32` index list.
    fn upload_index_buffer(&self, label: &str, indices: &[u32]) -> BufferId;

    /// Uploads an RGBA8 texture.
    fn upload_texture(&self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId;

    /// Releases a buffer previously returned by an upload.
    fn release_buffer(&self, id: BufferId);

    /// Releases a texture previously returned by [`upload_texture`](Self::upload_texture).
    fn release_texture(&self, id: TextureId);
}

/// Kind of upload recorded by [`HeadlessEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    /// Vertex buffer.
    Vertex,
    /// Index buffer.
    Index,
    /// RGBA8 texture.
    Texture,
}

/// One upload seen by [`HeadlessEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    /// What was uploaded.
    pub kind: UploadKind,
    /// Label passed by the loader.
    pub label: String,
    /// Payload size in bytes.
    pub bytes: usize,
    /// Raw id of the created buffer or texture.
    pub id: u64,
}

#[derive(Default)]
struct HeadlessState {
    uploads: Vec<UploadRecord>,
    released_buffers: Vec<BufferId>,
    released_textures: Vec<TextureId>,
}

/// An [`Engine`] with no GPU behind it.
///
/// Records every upload and release in memory. Used by tests and by the
/// inspector tool to observe what a load would have submitted.
pub struct HeadlessEngine {
    entities: EntityRegistry,
    next_id: AtomicU64,
    state: Mutex<HeadlessState>,
}

impl HeadlessEngine {
    /// Creates an engine with an empty entity registry.
    pub fn new() -> Self {
        Self {
            entities: EntityRegistry::new(),
            next_id: AtomicU64::new(1),
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// Every upload so far, in submission order.
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.state.lock().uploads.clone()
    }

    /// Total number of uploads so far.
    pub fn upload_count(&self) -> usize {
        self.state.lock().uploads.len()
    }

    /// Number of uploads of one kind.
    pub fn upload_count_of(&self, kind: UploadKind) -> usize {
        self.state
            .lock()
            .uploads
            .iter()
            .filter(|u| u.kind == kind)
            .count()
    }

    /// Buffers released so far.
    pub fn released_buffers(&self) -> Vec<BufferId> {
        self.state.lock().released_buffers.clone()
    }

    /// Textures released so far.
    pub fn released_textures(&self) -> Vec<TextureId> {
        self.state.lock().released_textures.clone()
    }

    fn record(&self, kind: UploadKind, label: &str, bytes: usize) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log::trace!("headless upload {kind:?} '{label}' ({bytes} bytes) -> {id}");
        self.state.lock().uploads.push(UploadRecord {
            kind,
            label: label.to_owned(),
            bytes,
            id,
        });
        id
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for HeadlessEngine {
    fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    fn upload_vertex_buffer(&self, label: &str, _layout: &VertexLayout, data: &[u8]) -> BufferId {
        BufferId(self.record(UploadKind::Vertex, label, data.len()))
    }

    fn upload_index_buffer(&self, label: &str, indices: &[u32]) -> BufferId {
        BufferId(self.record(UploadKind::Index, label, std::mem::size_of_val(indices)))
    }

    fn upload_texture(&self, label: &str, _width: u32, _height: u32, rgba: &[u8]) -> TextureId {
        TextureId(self.record(UploadKind::Texture, label, rgba.len()))
    }

    fn release_buffer(&self, id: BufferId) {
        self.state.lock().released_buffers.push(id);
    }

    fn release_texture(&self, id: TextureId) {
        self.state.lock().released_textures.push(id);
    }
}
