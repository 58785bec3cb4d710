//! Frame-driven scene engine: layout, connectors, highlight and camera.

mod adjacency;
mod backend;
mod camera;
mod config;
mod connectors;
mod highlight;
mod physics;
mod picking;
mod scheduler;
mod search;

use std::collections::VecDeque;

use glam::{Quat, Vec2, Vec3};
use tracing::{debug, info, warn};

pub use adjacency::{AdjacencyEntry, AdjacencyIndex};
pub use backend::{
    EdgeDraw, HeadlessBackend, NodeDraw, NodeSkin, RenderBackend, ResourceHandle,
    ResourceRegistry, SceneFrame,
};
pub use camera::{
    CameraController, CameraPose, FlightAnimation, FlightArrival, OrbitInput, ease_in_out_cubic,
};
pub use config::{
    CameraConfig, ConnectorConfig, Dimensions, EngineConfig, HighlightConfig, PhysicsConfig,
    SceneConfig, SchedulerConfig,
};
pub use connectors::{ConnectorBatch, ConnectorParticle, base_count_for_length, path_frame};
pub use highlight::{EdgeVisual, HighlightState, Interaction, NodeVisual};
pub use physics::{ForceSolver, SimulationParticle, TickReport};
pub use picking::{Ray, pick_nearest, ray_sphere};
pub use scheduler::{
    AdaptiveScheduler, DeviceHints, DeviceTier, FeatureLevel, FrameRateMonitor, FrameWindow,
    frame_ease,
};
pub use search::{SEARCH_LIMIT, SearchHit, search_nodes};

use crate::dataset::palette::DIMMED_NODE_COLOR;
use crate::dataset::{DatasetInput, DisplayMode, Edge, KnowledgeGraph, Node};
use crate::error::EngineError;
use crate::util::stable_pair_seed;

const MAX_FRAME_SECS: f32 = 0.1;

/// Notifications for the host UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    NodeSelected(String),
    SelectionCleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// No dataset loaded, or the last load was empty.
    Idle,
    Running,
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    pub dt_secs: f32,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

impl FrameInput {
    pub fn new(dt_secs: f32, viewport: Vec2) -> Self {
        Self { dt_secs, viewport }
    }
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            dt_secs: 1.0 / 60.0,
            viewport: Vec2::new(1280.0, 720.0),
        }
    }
}

/// Everything built from one dataset load. Dropped wholesale on reload.
struct EngineState {
    input: DatasetInput,
    graph: KnowledgeGraph,
    adjacency: AdjacencyIndex,
    solver: ForceSolver,
    display_positions: Vec<Vec3>,
    world_positions: Vec<Vec3>,
    galaxy_angle: f32,
    batches: Vec<ConnectorBatch>,
    buffers: Vec<ResourceHandle>,
    meshes: Vec<ResourceHandle>,
    skins: Vec<NodeSkin>,
    interaction: Interaction,
    highlight: HighlightState,
    node_visuals: Vec<NodeVisual>,
    edge_visuals: Vec<EdgeVisual>,
    node_draws: Vec<NodeDraw>,
    edge_draws: Vec<EdgeDraw>,
}

impl EngineState {
    fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.galaxy_angle)
    }

    fn refresh_world_positions(&mut self) {
        let rotation = self.rotation();
        self.world_positions.clear();
        self.world_positions.extend(
            self.display_positions
                .iter()
                .map(|position| rotation * *position),
        );
    }

    fn pick(&self, camera: &CameraController, pointer: Vec2) -> Option<usize> {
        let ray = camera.screen_ray(pointer)?;
        let spheres = self
            .graph
            .nodes
            .iter()
            .zip(&self.world_positions)
            .zip(&self.node_visuals)
            .map(|((node, position), visual)| (node.index, *position, node.radius * visual.scale));
        pick_nearest(&ray, spheres).map(|(index, _)| index)
    }
}

/// Interactive knowledge-graph scene. Drive it with one `frame` call per
/// display refresh.
pub struct KnowledgeEngine<B: RenderBackend> {
    config: EngineConfig,
    backend: B,
    lifecycle: Lifecycle,
    state: Option<EngineState>,
    scheduler: AdaptiveScheduler,
    camera: CameraController,
    resources: ResourceRegistry,
    pointer: Option<Vec2>,
    events: VecDeque<EngineEvent>,
    elapsed_secs: f32,
}

impl<B: RenderBackend> KnowledgeEngine<B> {
    pub fn new(config: EngineConfig, backend: B) -> Result<Self, EngineError> {
        let hints = DeviceHints::detect(backend.feature_level());
        Self::with_device_hints(config, backend, hints)
    }

    /// Validates the config, then builds the scheduler and camera from it.
    pub fn with_device_hints(
        config: EngineConfig,
        backend: B,
        hints: DeviceHints,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let scheduler = AdaptiveScheduler::new(config.scheduler, hints);
        let camera = CameraController::new(config.camera);

        Ok(Self {
            config,
            backend,
            lifecycle: Lifecycle::Idle,
            state: None,
            scheduler,
            camera,
            resources: ResourceRegistry::default(),
            pointer: None,
            events: VecDeque::new(),
            elapsed_secs: 0.0,
        })
    }

    /// Builds the scene for a dataset, replacing any previous one. An empty
    /// dataset leaves the engine idle.
    pub fn load(&mut self, input: &DatasetInput) -> Result<(), EngineError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(EngineError::Disposed);
        }

        self.teardown_scene();
        let graph = match KnowledgeGraph::build(input, self.config.display_mode) {
            Ok(graph) => graph,
            Err(err) => {
                self.lifecycle = Lifecycle::Idle;
                warn!(%err, "dataset load produced no scene");
                return Err(err);
            }
        };

        let mut solver = ForceSolver::new(
            &graph.nodes,
            &graph.edges,
            self.config.physics,
            self.config.seed,
        );
        solver.warm_up();
        let display_positions = solver
            .particles()
            .iter()
            .map(|particle| particle.position)
            .collect::<Vec<_>>();

        let mut meshes = Vec::with_capacity(graph.node_count());
        let mut skins = Vec::with_capacity(graph.node_count());
        for node in &graph.nodes {
            let mesh = self.backend.create_node_mesh(node);
            self.resources.track_mesh(mesh);
            meshes.push(mesh);
            skins.push(self.resources.resolve_skin(&mut self.backend, node));
        }

        let idle_node = NodeVisual::idle(&self.config.highlight);
        let mut state = EngineState {
            input: input.clone(),
            adjacency: AdjacencyIndex::build(graph.node_count(), &graph.edges),
            node_visuals: vec![idle_node; graph.node_count()],
            world_positions: Vec::with_capacity(graph.node_count()),
            node_draws: Vec::with_capacity(graph.node_count()),
            graph,
            solver,
            display_positions,
            galaxy_angle: 0.0,
            batches: Vec::new(),
            buffers: Vec::new(),
            meshes,
            skins,
            interaction: Interaction::default(),
            highlight: HighlightState::default(),
            edge_visuals: Vec::new(),
            edge_draws: Vec::new(),
        };
        state.refresh_world_positions();
        self.rebuild_connectors(&mut state);

        self.camera = CameraController::new(self.config.camera);
        self.pointer = None;
        self.events.clear();
        self.elapsed_secs = 0.0;

        info!(
            nodes = state.graph.node_count(),
            edges = state.graph.edge_count(),
            mode = %self.config.display_mode,
            tier = %self.scheduler.tier(),
            "knowledge universe loaded"
        );
        self.state = Some(state);
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    fn rebuild_connectors(&mut self, state: &mut EngineState) {
        self.resources.release_buffers(&mut self.backend);
        state.batches.clear();
        state.buffers.clear();

        for (edge_index, edge) in state.graph.edges.iter().enumerate() {
            let source = &state.graph.nodes[edge.source_index];
            let target = &state.graph.nodes[edge.target_index];
            let length = state.display_positions[edge.source_index]
                .distance(state.display_positions[edge.target_index]);
            let batch = ConnectorBatch::generate(
                edge_index,
                edge.source_index,
                edge.target_index,
                edge.color,
                length,
                &self.config.connectors,
                stable_pair_seed(self.config.seed, &source.id, &target.id),
            );

            let buffer = self.backend.create_instance_buffer(batch.base_count());
            self.resources.track_buffer(buffer);
            state.buffers.push(buffer);
            state.batches.push(batch);
        }

        let base_counts = state
            .batches
            .iter()
            .map(ConnectorBatch::base_count)
            .collect::<Vec<_>>();
        self.scheduler.plan(&base_counts);

        let idle_edge = EdgeVisual::idle(&self.config.highlight);
        state.edge_visuals = vec![idle_edge; state.graph.edge_count()];
        state.edge_draws = Vec::with_capacity(state.graph.edge_count());
    }

    /// Advances one frame: simulation, highlight, connectors, camera, render.
    pub fn frame(&mut self, input: &FrameInput) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }
        let Some(mut state) = self.state.take() else {
            return;
        };

        let dt = if input.dt_secs.is_finite() {
            input.dt_secs.clamp(0.0, MAX_FRAME_SECS)
        } else {
            0.0
        };
        self.elapsed_secs += dt;
        self.scheduler.record_frame(dt);
        if input.viewport.y > 0.0 {
            self.camera.set_aspect(input.viewport.x / input.viewport.y);
        }

        self.step_simulation(&mut state, dt);
        self.update_highlight(&mut state);
        self.ease_visuals(&mut state, dt);
        self.update_connectors(&mut state);
        if let Some(arrival) = self.camera.update(dt)
            && let Some(index) = arrival.select
        {
            self.select(&mut state, Some(index));
        }
        self.render(&mut state);

        self.state = Some(state);
    }

    fn step_simulation(&mut self, state: &mut EngineState, dt: f32) {
        if self
            .scheduler
            .should_tick_simulation(state.graph.node_count())
        {
            let report = state.solver.tick();
            if report.reseeded > 0 {
                debug!(reseeded = report.reseeded, "layout recovered non-finite particles");
            }
        }

        let ease = self.scheduler.position_ease(dt);
        for (display, particle) in state
            .display_positions
            .iter_mut()
            .zip(state.solver.particles())
        {
            *display += (particle.position - *display) * ease;
        }

        state.galaxy_angle =
            (state.galaxy_angle + self.config.scene.galaxy_spin * dt).rem_euclid(std::f32::consts::TAU);
        state.refresh_world_positions();
    }

    fn update_highlight(&mut self, state: &mut EngineState) {
        let picked = self
            .pointer
            .and_then(|pointer| state.pick(&self.camera, pointer));
        if picked == state.interaction.hovered {
            return;
        }

        state.interaction.hovered = picked;
        state.highlight = HighlightState::for_target(&state.adjacency, picked);
    }

    fn ease_visuals(&mut self, state: &mut EngineState, dt: f32) {
        let config = &self.config.highlight;
        let factor = frame_ease(config.ease, dt);

        for (index, visual) in state.node_visuals.iter_mut().enumerate() {
            let target = highlight::node_target(index, state.interaction, &state.highlight, config);
            visual.approach(&target, factor);
        }
        for (index, visual) in state.edge_visuals.iter_mut().enumerate() {
            let target = highlight::edge_target(
                index,
                &state.highlight,
                config,
                self.config.connectors.hover_speed_multiplier,
            );
            visual.approach(&target, factor);
        }
    }

    fn update_connectors(&mut self, state: &mut EngineState) {
        for (batch, visual) in state.batches.iter_mut().zip(&state.edge_visuals) {
            let source = state.world_positions[batch.source_index];
            let target = state.world_positions[batch.target_index];
            let cull = self
                .scheduler
                .cull_factor(self.camera.distance_to(source), self.camera.distance_to(target));
            let rendered = self.scheduler.rendered_count(batch.base_count(), cull);

            batch.update(
                source,
                target,
                self.elapsed_secs,
                visual.speed_multiplier,
                rendered,
                self.config.connectors.particle_size,
            );
        }
    }

    fn render(&mut self, state: &mut EngineState) {
        state.node_draws.clear();
        for (index, node) in state.graph.nodes.iter().enumerate() {
            let visual = state.node_visuals[index];
            let skin = state.skins[index];
            state.node_draws.push(NodeDraw {
                mesh: state.meshes[index],
                world_position: state.world_positions[index],
                radius: node.radius * visual.scale,
                color: skin.base_color().lerp(DIMMED_NODE_COLOR, visual.dim),
                emissive_intensity: visual.emissive,
                opacity: visual.opacity,
                label_opacity: visual.label_opacity,
                label_size: visual.label_size,
            });
        }

        state.edge_draws.clear();
        for (index, edge) in state.graph.edges.iter().enumerate() {
            let visual = state.edge_visuals[index];
            state.edge_draws.push(EdgeDraw {
                buffer: state.buffers[index],
                source_world: state.world_positions[edge.source_index],
                target_world: state.world_positions[edge.target_index],
                opacity: visual.opacity,
                width: visual.width,
                label_opacity: visual.label_opacity,
            });
        }

        let frame = SceneFrame {
            nodes: &state.graph.nodes,
            node_draws: &state.node_draws,
            skins: &state.skins,
            edges: &state.graph.edges,
            edge_draws: &state.edge_draws,
            batches: &state.batches,
            camera: &self.camera,
            hovered: state.interaction.hovered,
            selected: state.interaction.selected,
            elapsed_secs: self.elapsed_secs,
        };
        self.backend.draw(&frame);
    }

    fn select(&mut self, state: &mut EngineState, index: Option<usize>) {
        match index {
            Some(index) => {
                state.interaction.selected = Some(index);
                if let Some(node) = state.graph.node(index) {
                    debug!(id = %node.id, "node selected");
                    self.events
                        .push_back(EngineEvent::NodeSelected(node.id.clone()));
                }
            }
            None => {
                if state.interaction.selected.take().is_some() {
                    self.events.push_back(EngineEvent::SelectionCleared);
                }
            }
        }
    }

    /// Pointer position in normalized device coordinates (`-1..1`, y up), or
    /// `None` when the pointer left the viewport.
    pub fn pointer_moved(&mut self, pointer: Option<Vec2>) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.pointer = pointer.filter(|pointer| pointer.is_finite());
    }

    /// Selects the node under the pointer, or clears the selection when the
    /// click hits empty space.
    pub fn click(&mut self) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }
        let Some(mut state) = self.state.take() else {
            return;
        };

        let picked = self
            .pointer
            .and_then(|pointer| state.pick(&self.camera, pointer));
        self.select(&mut state, picked);
        self.state = Some(state);
    }

    /// Returns `false` when the input was dropped.
    pub fn orbit(&mut self, input: OrbitInput) -> bool {
        if self.lifecycle == Lifecycle::Disposed {
            return false;
        }
        self.camera.orbit(input)
    }

    /// Flies the camera to a node's current world position and selects it on
    /// arrival.
    pub fn fly_to(&mut self, id: &str) -> Result<(), EngineError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(EngineError::Disposed);
        }
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| EngineError::UnknownNode(id.to_owned()))?;
        let index = state
            .graph
            .index_of(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_owned()))?;

        let pose = CameraPose::framing(state.world_positions[index], self.config.camera.standoff);
        self.camera.begin_flight(pose, Some(index));
        debug!(id, "flight started");
        Ok(())
    }

    pub fn reset_view(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.camera.reset();
    }

    /// Swaps the edge set while keeping node positions, then reheats the
    /// layout.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<(), EngineError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(EngineError::Disposed);
        }
        if mode == self.config.display_mode {
            return Ok(());
        }
        self.config.display_mode = mode;

        let Some(mut state) = self.state.take() else {
            return Ok(());
        };
        let graph = match KnowledgeGraph::build(&state.input, mode) {
            Ok(graph) => graph,
            Err(err) => {
                self.state = Some(state);
                return Err(err);
            }
        };

        state.solver.set_edges(&graph.edges);
        state.solver.reheat(self.config.physics.reheat_alpha);
        state.adjacency = AdjacencyIndex::build(graph.node_count(), &graph.edges);
        state.graph = graph;
        state.highlight = HighlightState::for_target(&state.adjacency, state.interaction.hovered);
        self.rebuild_connectors(&mut state);

        info!(
            %mode,
            edges = state.graph.edge_count(),
            "display mode switched"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Stops the frame loop, ignores further input and releases every backend
    /// resource. Safe to call repeatedly and before any load.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }

        self.teardown_scene();
        self.pointer = None;
        self.lifecycle = Lifecycle::Disposed;
        info!("knowledge universe disposed");
    }

    fn teardown_scene(&mut self) {
        self.state = None;
        self.resources.release_all(&mut self.backend);
    }

    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.state
            .as_ref()
            .map(|state| search_nodes(&state.graph.nodes, query))
            .unwrap_or_default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.config.display_mode
    }

    pub fn graph(&self) -> Option<&KnowledgeGraph> {
        self.state.as_ref().map(|state| &state.graph)
    }

    pub fn nodes(&self) -> &[Node] {
        self.state
            .as_ref()
            .map(|state| state.graph.nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn edges(&self) -> &[Edge] {
        self.state
            .as_ref()
            .map(|state| state.graph.edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn adjacency(&self) -> Option<&AdjacencyIndex> {
        self.state.as_ref().map(|state| &state.adjacency)
    }

    pub fn highlight(&self) -> Option<&HighlightState> {
        self.state.as_ref().map(|state| &state.highlight)
    }

    pub fn interaction(&self) -> Interaction {
        self.state
            .as_ref()
            .map(|state| state.interaction)
            .unwrap_or_default()
    }

    pub fn selected_id(&self) -> Option<&str> {
        let state = self.state.as_ref()?;
        let index = state.interaction.selected?;
        state.graph.node(index).map(|node| node.id.as_str())
    }

    pub fn node_visual(&self, index: usize) -> Option<NodeVisual> {
        self.state.as_ref()?.node_visuals.get(index).copied()
    }

    pub fn edge_visual(&self, index: usize) -> Option<EdgeVisual> {
        self.state.as_ref()?.edge_visuals.get(index).copied()
    }

    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.state.as_ref()?.world_positions.get(index).copied()
    }

    pub fn solver(&self) -> Option<&ForceSolver> {
        self.state.as_ref().map(|state| &state.solver)
    }

    pub fn batches(&self) -> &[ConnectorBatch] {
        self.state
            .as_ref()
            .map(|state| state.batches.as_slice())
            .unwrap_or(&[])
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn scheduler(&self) -> &AdaptiveScheduler {
        &self.scheduler
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn live_resource_count(&self) -> usize {
        self.resources.live_count()
    }
}

impl<B: RenderBackend> Drop for KnowledgeEngine<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::dataset::{NodeRecord, RelationRecord};

    fn hints() -> DeviceHints {
        DeviceHints {
            logical_cores: Some(8),
            memory_gib: Some(8.0),
            feature_level: Some(FeatureLevel::Modern),
        }
    }

    fn still_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.scene.galaxy_spin = 0.0;
        config
    }

    fn engine(config: EngineConfig) -> KnowledgeEngine<HeadlessBackend> {
        KnowledgeEngine::with_device_hints(config, HeadlessBackend::new(), hints())
            .expect("valid config")
    }

    fn triangle() -> DatasetInput {
        DatasetInput {
            nodes: vec![
                NodeRecord::new("A", "Alpha"),
                NodeRecord::new("B", "Beta"),
                NodeRecord::new("C", "Gamma"),
            ],
            relations: vec![
                RelationRecord::new("A", "B", 0.8),
                RelationRecord::new("B", "C", 0.3),
            ],
            enable_tag_inference: false,
        }
    }

    fn pointer_at(engine: &KnowledgeEngine<HeadlessBackend>, index: usize) -> Vec2 {
        let world = engine.world_position(index).expect("node exists");
        engine.camera().project(world).expect("node in view").truncate()
    }

    #[test]
    fn hovering_a_node_highlights_its_neighborhood() {
        let mut engine = engine(still_config());
        engine.load(&triangle()).expect("loads");
        engine.frame(&FrameInput::default());

        let b = engine.graph().and_then(|graph| graph.index_of("B")).expect("B");
        engine.pointer_moved(Some(pointer_at(&engine, b)));
        engine.frame(&FrameInput::default());

        let highlight = engine.highlight().expect("running");
        assert_eq!(highlight.target, Some(b));
        assert_eq!(highlight.neighbor_set, HashSet::from([0, 2]));
        assert_eq!(highlight.incident_edge_set, HashSet::from([0, 1]));

        engine.pointer_moved(None);
        engine.frame(&FrameInput::default());
        let highlight = engine.highlight().expect("running");
        assert!(highlight.neighbor_set.is_empty());
        assert!(highlight.incident_edge_set.is_empty());
    }

    #[test]
    fn click_selects_and_empty_click_clears() {
        let mut engine = engine(still_config());
        engine.load(&triangle()).expect("loads");
        engine.frame(&FrameInput::default());

        engine.pointer_moved(Some(pointer_at(&engine, 0)));
        engine.click();
        assert_eq!(engine.poll_event(), Some(EngineEvent::NodeSelected("A".into())));
        assert_eq!(engine.selected_id(), Some("A"));

        engine.pointer_moved(Some(Vec2::new(0.99, 0.99)));
        engine.click();
        assert_eq!(engine.poll_event(), Some(EngineEvent::SelectionCleared));
        assert_eq!(engine.selected_id(), None);

        engine.click();
        assert_eq!(engine.poll_event(), None);
    }

    #[test]
    fn fly_to_lands_on_standoff_and_selects() {
        let mut engine = engine(still_config());
        engine.load(&triangle()).expect("loads");
        engine.fly_to("A").expect("known node");

        let start = engine.world_position(0).expect("A");
        let expected = CameraPose::framing(start, 80.0);
        for _ in 0..100 {
            engine.frame(&FrameInput::default());
        }

        assert!(engine.camera().pose().eye.distance(expected.eye) < 1e-3);
        assert_eq!(engine.selected_id(), Some("A"));
        assert_eq!(engine.poll_event(), Some(EngineEvent::NodeSelected("A".into())));
    }

    #[test]
    fn unknown_fly_target_is_an_error() {
        let mut engine = engine(still_config());
        engine.load(&triangle()).expect("loads");
        assert_eq!(
            engine.fly_to("nope"),
            Err(EngineError::UnknownNode("nope".into()))
        );
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.camera.min_distance = 900.0;
        config.camera.max_distance = 300.0;
        let result = KnowledgeEngine::with_device_hints(config, HeadlessBackend::new(), hints());
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn backend_without_feature_level_gets_low_tier() {
        let backend = HeadlessBackend::new().with_feature_level(None);
        let engine = KnowledgeEngine::new(EngineConfig::default(), backend).expect("valid config");
        assert_eq!(engine.scheduler().tier(), DeviceTier::Low);
        assert_eq!(engine.scheduler().budget(), 1_500);
    }

    #[test]
    fn empty_dataset_keeps_engine_idle() {
        let mut engine = engine(EngineConfig::default());
        assert_eq!(
            engine.load(&DatasetInput::default()),
            Err(EngineError::EmptyDataset)
        );
        assert_eq!(engine.lifecycle(), Lifecycle::Idle);

        engine.frame(&FrameInput::default());
        assert_eq!(engine.backend().frames_drawn(), 0);
    }

    #[test]
    fn dispose_releases_everything_and_is_idempotent() {
        let mut engine = engine(still_config());
        engine.load(&triangle()).expect("loads");
        assert!(engine.backend().live_handles() > 0);

        engine.dispose();
        engine.dispose();
        assert_eq!(engine.backend().live_handles(), 0);
        assert_eq!(engine.backend().double_releases(), 0);
        assert_eq!(engine.lifecycle(), Lifecycle::Disposed);
        assert_eq!(engine.load(&triangle()), Err(EngineError::Disposed));

        engine.pointer_moved(Some(Vec2::ZERO));
        engine.frame(&FrameInput::default());
        assert_eq!(engine.backend().frames_drawn(), 0);
    }

    #[test]
    fn dispose_before_load_is_safe() {
        let mut engine = engine(EngineConfig::default());
        engine.dispose();
        assert_eq!(engine.backend().live_handles(), 0);
    }

    #[test]
    fn reload_releases_previous_resources() {
        let mut engine = engine(still_config());
        engine.load(&triangle()).expect("loads");
        let first = engine.backend().live_handles();
        engine.load(&triangle()).expect("reloads");
        assert_eq!(engine.backend().live_handles(), first);
        assert_eq!(engine.interaction(), Interaction::default());
    }

    #[test]
    fn display_mode_switch_keeps_positions() {
        let mut input = triangle();
        input.enable_tag_inference = true;
        input.nodes[0].tags = vec!["optics".into()];
        input.nodes[2].tags = vec!["optics".into()];

        let mut engine = engine(still_config());
        engine.load(&input).expect("loads");
        assert_eq!(engine.edges().len(), 3);

        let before = engine.world_position(1).expect("B");
        engine
            .set_display_mode(DisplayMode::Explicit)
            .expect("switches");
        assert_eq!(engine.edges().len(), 2);
        assert_eq!(engine.world_position(1), Some(before));
        assert_eq!(engine.batches().len(), 2);
        assert!(engine.solver().expect("solver").alpha() >= 0.3);
    }
}
