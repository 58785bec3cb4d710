use std::collections::{BTreeSet, HashMap, HashSet};

use glam::Vec3;
use tracing::{debug, warn};

use super::camera::CameraController;
use super::connectors::ConnectorBatch;
use super::scheduler::FeatureLevel;
use crate::dataset::palette::{Rgb, SkinPalette, category_color, skin_palette};
use crate::dataset::{Edge, Node};
use crate::error::AssetError;

/// Opaque id for a GPU-side resource owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceHandle(pub u64);

/// Resolved look of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeSkin {
    Textured {
        texture: ResourceHandle,
        palette: SkinPalette,
    },
    Flat(Rgb),
}

impl NodeSkin {
    pub fn base_color(&self) -> Rgb {
        match self {
            Self::Textured { palette, .. } => palette.color,
            Self::Flat(color) => *color,
        }
    }

    pub fn emissive_color(&self) -> Rgb {
        match self {
            Self::Textured { palette, .. } => palette.emissive,
            Self::Flat(color) => *color,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeDraw {
    pub mesh: ResourceHandle,
    pub world_position: Vec3,
    pub radius: f32,
    pub color: Rgb,
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub label_opacity: f32,
    pub label_size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeDraw {
    pub buffer: ResourceHandle,
    pub source_world: Vec3,
    pub target_world: Vec3,
    pub opacity: f32,
    pub width: f32,
    pub label_opacity: f32,
}

/// Everything a backend needs to draw one frame. Slices are index-aligned:
/// `node_draws[i]` and `skins[i]` belong to `nodes[i]`, `edge_draws[i]` and
/// `batches[i]` to `edges[i]`.
pub struct SceneFrame<'a> {
    pub nodes: &'a [Node],
    pub node_draws: &'a [NodeDraw],
    pub skins: &'a [NodeSkin],
    pub edges: &'a [Edge],
    pub edge_draws: &'a [EdgeDraw],
    pub batches: &'a [ConnectorBatch],
    pub camera: &'a CameraController,
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
    pub elapsed_secs: f32,
}

impl SceneFrame<'_> {
    pub fn instance_total(&self) -> usize {
        self.batches.iter().map(ConnectorBatch::rendered_count).sum()
    }
}

/// Drawing surface the engine renders into. Every handle a backend returns is
/// later passed back to `release` exactly once.
pub trait RenderBackend {
    fn feature_level(&self) -> Option<FeatureLevel>;

    fn create_node_mesh(&mut self, node: &Node) -> ResourceHandle;

    fn load_texture(&mut self, key: &str) -> Result<ResourceHandle, AssetError>;

    fn create_instance_buffer(&mut self, capacity: usize) -> ResourceHandle;

    fn release(&mut self, handle: ResourceHandle);

    fn draw(&mut self, frame: &SceneFrame<'_>);
}

/// Handles the engine currently owns, so teardown can release all of them.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    meshes: Vec<ResourceHandle>,
    buffers: Vec<ResourceHandle>,
    textures: HashMap<String, ResourceHandle>,
    failed_textures: HashSet<String>,
}

impl ResourceRegistry {
    pub fn track_mesh(&mut self, handle: ResourceHandle) {
        self.meshes.push(handle);
    }

    pub fn track_buffer(&mut self, handle: ResourceHandle) {
        self.buffers.push(handle);
    }

    /// Resolves a node's skin, loading each texture key at most once. A failed
    /// load falls back to a flat category color.
    pub fn resolve_skin<B: RenderBackend>(&mut self, backend: &mut B, node: &Node) -> NodeSkin {
        let palette = skin_palette(node.skin.as_deref(), node.index);
        let fallback = || NodeSkin::Flat(category_color(node.category.as_deref(), node.state.color()));

        if self.failed_textures.contains(palette.key) {
            return fallback();
        }
        if let Some(&texture) = self.textures.get(palette.key) {
            return NodeSkin::Textured { texture, palette };
        }

        match backend.load_texture(palette.key) {
            Ok(texture) => {
                self.textures.insert(palette.key.to_owned(), texture);
                NodeSkin::Textured { texture, palette }
            }
            Err(err) => {
                warn!(node = %node.id, skin = palette.key, %err, "skin unavailable, using flat color");
                self.failed_textures.insert(palette.key.to_owned());
                fallback()
            }
        }
    }

    /// Releases only the connector instance buffers, for an edge-set swap.
    pub fn release_buffers<B: RenderBackend>(&mut self, backend: &mut B) {
        for handle in self.buffers.drain(..) {
            backend.release(handle);
        }
    }

    pub fn live_count(&self) -> usize {
        self.meshes.len() + self.buffers.len() + self.textures.len()
    }

    pub fn release_all<B: RenderBackend>(&mut self, backend: &mut B) {
        let released = self.live_count();
        for handle in self
            .meshes
            .drain(..)
            .chain(self.buffers.drain(..))
            .chain(self.textures.drain().map(|(_, handle)| handle))
        {
            backend.release(handle);
        }
        self.failed_textures.clear();
        if released > 0 {
            debug!(released, "released render resources");
        }
    }
}

/// Backend with no window. Tracks handles and frame statistics.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    live: BTreeSet<ResourceHandle>,
    available_textures: Option<HashSet<String>>,
    feature_level: Option<FeatureLevel>,
    double_releases: usize,
    frames_drawn: usize,
    last_instance_total: usize,
    last_node_count: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            feature_level: Some(FeatureLevel::Basic),
            ..Self::default()
        }
    }

    /// Only these texture keys load; every other key fails.
    pub fn with_textures<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_textures = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_feature_level(mut self, feature_level: Option<FeatureLevel>) -> Self {
        self.feature_level = feature_level;
        self
    }

    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn double_releases(&self) -> usize {
        self.double_releases
    }

    pub fn frames_drawn(&self) -> usize {
        self.frames_drawn
    }

    pub fn last_instance_total(&self) -> usize {
        self.last_instance_total
    }

    pub fn last_node_count(&self) -> usize {
        self.last_node_count
    }

    fn allocate(&mut self) -> ResourceHandle {
        self.next_handle += 1;
        let handle = ResourceHandle(self.next_handle);
        self.live.insert(handle);
        handle
    }
}

impl RenderBackend for HeadlessBackend {
    fn feature_level(&self) -> Option<FeatureLevel> {
        self.feature_level
    }

    fn create_node_mesh(&mut self, _node: &Node) -> ResourceHandle {
        self.allocate()
    }

    fn load_texture(&mut self, key: &str) -> Result<ResourceHandle, AssetError> {
        match &self.available_textures {
            None => Err(AssetError::Unavailable(key.to_owned())),
            Some(keys) if keys.contains(key) => Ok(self.allocate()),
            Some(_) => Err(AssetError::NotFound(key.to_owned())),
        }
    }

    fn create_instance_buffer(&mut self, _capacity: usize) -> ResourceHandle {
        self.allocate()
    }

    fn release(&mut self, handle: ResourceHandle) {
        if !self.live.remove(&handle) {
            self.double_releases += 1;
        }
    }

    fn draw(&mut self, frame: &SceneFrame<'_>) {
        self.frames_drawn += 1;
        self.last_instance_total = frame.instance_total();
        self.last_node_count = frame.node_draws.len();
    }
}
