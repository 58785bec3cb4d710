use std::collections::{BTreeSet, HashMap, HashSet};

use glam::{Vec2, Vec3};

use knowledge_universe::dataset::{KnowledgeGraph, Node, parse_dataset};
use knowledge_universe::engine::{
    AdaptiveScheduler, CameraPose, DeviceHints, FeatureLevel, ForceSolver, HighlightState,
    Lifecycle, RenderBackend, ResourceHandle, SceneFrame, SchedulerConfig,
};
use knowledge_universe::{
    AssetError, DatasetInput, DisplayMode, EngineConfig, EngineError, EngineEvent, FrameInput,
    KnowledgeEngine, NodeRecord, RelationRecord,
};

#[derive(Debug, Default)]
struct FrameRecord {
    instance_total: usize,
    node_positions: Vec<Vec3>,
    hovered: Option<usize>,
    selected: Option<usize>,
}

/// Keeps every handle and a summary of each drawn frame.
#[derive(Debug, Default)]
struct RecordingBackend {
    next_handle: u64,
    live: HashSet<ResourceHandle>,
    stale_releases: usize,
    texture_requests: Vec<String>,
    frames: Vec<FrameRecord>,
}

impl RecordingBackend {
    fn allocate(&mut self) -> ResourceHandle {
        self.next_handle += 1;
        let handle = ResourceHandle(self.next_handle);
        self.live.insert(handle);
        handle
    }
}

impl RenderBackend for RecordingBackend {
    fn feature_level(&self) -> Option<FeatureLevel> {
        Some(FeatureLevel::Modern)
    }

    fn create_node_mesh(&mut self, _node: &Node) -> ResourceHandle {
        self.allocate()
    }

    fn load_texture(&mut self, key: &str) -> Result<ResourceHandle, AssetError> {
        self.texture_requests.push(key.to_owned());
        Err(AssetError::NotFound(key.to_owned()))
    }

    fn create_instance_buffer(&mut self, _capacity: usize) -> ResourceHandle {
        self.allocate()
    }

    fn release(&mut self, handle: ResourceHandle) {
        if !self.live.remove(&handle) {
            self.stale_releases += 1;
        }
    }

    fn draw(&mut self, frame: &SceneFrame<'_>) {
        self.frames.push(FrameRecord {
            instance_total: frame.instance_total(),
            node_positions: frame
                .node_draws
                .iter()
                .map(|draw| draw.world_position)
                .collect(),
            hovered: frame.hovered,
            selected: frame.selected,
        });
    }
}

fn hints(cores: usize, memory: f32) -> DeviceHints {
    DeviceHints {
        logical_cores: Some(cores),
        memory_gib: Some(memory),
        feature_level: Some(FeatureLevel::Modern),
    }
}

fn still_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.scene.galaxy_spin = 0.0;
    config
}

fn engine_with(config: EngineConfig, hints: DeviceHints) -> KnowledgeEngine<RecordingBackend> {
    KnowledgeEngine::with_device_hints(config, RecordingBackend::default(), hints)
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

/// Ring with chords and a few shared tags, so both edge sources contribute.
fn constellation(count: usize) -> DatasetInput {
    let topics = ["optics", "calculus", "genetics", "algebra", "thermo"];
    let nodes = (0..count)
        .map(|index| {
            let record = NodeRecord::new(format!("kp-{index}"), format!("Topic {index}"));
            if index % 4 == 0 {
                record.with_tags([topics[(index / 4) % topics.len()]])
            } else {
                record
            }
        })
        .collect::<Vec<_>>();

    let mut relations = Vec::new();
    for index in 0..count {
        relations.push(RelationRecord::new(
            format!("kp-{index}"),
            format!("kp-{}", (index + 1) % count),
            0.6,
        ));
        if index % 3 == 0 {
            relations.push(
                RelationRecord::new(
                    format!("kp-{index}"),
                    format!("kp-{}", (index + count / 2) % count),
                    0.9,
                )
                .with_type("prerequisite"),
            );
        }
    }

    DatasetInput {
        nodes,
        relations,
        enable_tag_inference: true,
    }
}

fn neighbor_ids(engine: &KnowledgeEngine<RecordingBackend>) -> HashMap<String, BTreeSet<String>> {
    let nodes = engine.nodes();
    let adjacency = engine.adjacency().expect("engine running");
    nodes
        .iter()
        .map(|node| {
            let neighbors = adjacency
                .entries(node.index)
                .iter()
                .map(|entry| nodes[entry.neighbor].id.clone())
                .collect();
            (node.id.clone(), neighbors)
        })
        .collect()
}

#[test]
fn adjacency_has_two_entries_per_edge() {
    let mut engine = engine_with(still_config(), hints(8, 8.0));
    engine.load(&constellation(60)).expect("loads");

    let edges = engine.edges();
    let adjacency = engine.adjacency().expect("engine running");
    assert!(!edges.is_empty());
    assert_eq!(adjacency.directed_entry_count(), edges.len() * 2);

    let mut appearances = vec![0usize; edges.len()];
    for node in engine.nodes() {
        for entry in adjacency.entries(node.index) {
            appearances[entry.edge] += 1;
        }
    }
    assert!(appearances.iter().all(|&count| count == 2));
}

#[test]
fn layout_stays_finite_and_inside_the_clamp() {
    let input = constellation(150);
    let graph = KnowledgeGraph::build(&input, DisplayMode::Both).expect("graph builds");
    let mut solver = ForceSolver::new(
        &graph.nodes,
        &graph.edges,
        EngineConfig::default().physics,
        11,
    );

    for _ in 0..300 {
        solver.tick();
    }

    let limit = solver.hard_radius() * (1.0 + 1e-4);
    for particle in solver.particles() {
        assert!(particle.position.is_finite());
        assert!(
            particle.position.length() <= limit,
            "{} > {limit}",
            particle.position.length()
        );
    }
}

#[test]
fn highlight_sets_match_incident_edges() {
    let mut engine = engine_with(still_config(), hints(8, 8.0));
    engine.load(&constellation(40)).expect("loads");

    let edges = engine.edges();
    let adjacency = engine.adjacency().expect("engine running");
    for target in [0, 7, 19, 33] {
        let state = HighlightState::for_target(adjacency, Some(target));

        let expected_neighbors = edges
            .iter()
            .filter(|edge| edge.touches(target) && !edge.touches_self())
            .map(|edge| edge.other(target))
            .collect::<HashSet<_>>();
        let expected_edges = edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.touches(target))
            .map(|(index, _)| index)
            .collect::<HashSet<_>>();

        assert_eq!(state.neighbor_set, expected_neighbors);
        assert_eq!(state.incident_edge_set, expected_edges);
    }

    let cleared = HighlightState::for_target(adjacency, None);
    assert!(cleared.neighbor_set.is_empty());
    assert!(cleared.incident_edge_set.is_empty());
}

#[test]
fn rendered_instances_fit_the_tier_budget() {
    for (cores, memory) in [(2, 1.0), (6, 3.0), (8, 8.0)] {
        let mut engine = engine_with(still_config(), hints(cores, memory));
        engine.load(&constellation(400)).expect("loads");
        let budget = engine.scheduler().budget();

        for _ in 0..30 {
            engine.frame(&FrameInput::default());
        }

        assert!((engine.scheduler().global_scale() - 1.0).abs() < 1e-6);
        let frames = &engine.backend().frames;
        assert_eq!(frames.len(), 30);
        for frame in frames {
            assert!(
                frame.instance_total <= budget,
                "{} > {budget}",
                frame.instance_total
            );
        }
    }
}

fn run_for_one_second(scheduler: &mut AdaptiveScheduler, fps: f32) {
    let dt = 1.0 / fps;
    for _ in 0..fps.round() as usize {
        scheduler.record_frame(dt);
    }
}

#[test]
fn global_scale_tracks_sustained_frame_rate() {
    let mut scheduler = AdaptiveScheduler::new(SchedulerConfig::default(), hints(8, 8.0));

    let mut previous = scheduler.global_scale();
    run_for_one_second(&mut scheduler, 40.0);
    assert!(scheduler.global_scale() < previous);

    for _ in 0..15 {
        previous = scheduler.global_scale();
        run_for_one_second(&mut scheduler, 40.0);
        assert!(scheduler.global_scale() <= previous);
        assert!(scheduler.global_scale() >= 0.3);
    }

    previous = scheduler.global_scale();
    run_for_one_second(&mut scheduler, 75.0);
    assert!(scheduler.global_scale() > previous);

    for _ in 0..30 {
        previous = scheduler.global_scale();
        run_for_one_second(&mut scheduler, 75.0);
        assert!(scheduler.global_scale() >= previous);
        assert!(scheduler.global_scale() <= 1.0);
    }
}

#[test]
fn slowdown_straddling_a_window_lowers_scale() {
    let mut scheduler = AdaptiveScheduler::new(SchedulerConfig::default(), hints(8, 8.0));
    for _ in 0..3 {
        run_for_one_second(&mut scheduler, 40.0);
    }
    let start = scheduler.global_scale();

    for _ in 0..81 {
        scheduler.record_frame(1.0 / 90.0);
    }
    for _ in 0..30 {
        scheduler.record_frame(1.0 / 30.0);
    }
    assert!(scheduler.global_scale() < start);
}

#[test]
fn triangle_hover_and_fly_to() {
    let mut engine = engine_with(still_config(), hints(8, 8.0));
    engine.load(&triangle()).expect("loads");
    engine.frame(&FrameInput::default());

    let graph = engine.graph().expect("engine running");
    let (a, b, c) = (
        graph.index_of("A").expect("A"),
        graph.index_of("B").expect("B"),
        graph.index_of("C").expect("C"),
    );
    let adjacency_b = engine
        .adjacency()
        .expect("engine running")
        .neighbor_set(b);
    assert_eq!(adjacency_b, HashSet::from([a, c]));

    let pointer = engine
        .camera()
        .project(engine.world_position(b).expect("B"))
        .expect("B in view")
        .truncate();
    engine.pointer_moved(Some(pointer));
    engine.frame(&FrameInput::default());

    let highlight = engine.highlight().expect("engine running");
    assert_eq!(highlight.target, Some(b));
    assert_eq!(highlight.neighbor_set, HashSet::from([a, c]));
    assert_eq!(highlight.incident_edge_set, HashSet::from([0, 1]));
    assert_eq!(engine.backend().frames.last().and_then(|frame| frame.hovered), Some(b));

    engine.pointer_moved(None);
    engine.fly_to("A").expect("A exists");
    let expected = CameraPose::framing(
        engine.world_position(a).expect("A"),
        engine.config().camera.standoff,
    );

    let dt = 1.0 / 60.0;
    let frames = (engine.config().camera.flight_secs / dt).ceil() as usize + 1;
    for _ in 0..frames {
        engine.frame(&FrameInput::new(dt, Vec2::new(1280.0, 720.0)));
    }

    let pose = engine.camera().pose();
    assert!(pose.eye.distance(expected.eye) < 1e-3, "{pose:?} vs {expected:?}");
    assert_eq!(engine.selected_id(), Some("A"));
    assert_eq!(engine.backend().frames.last().and_then(|frame| frame.selected), Some(a));

    let events = std::iter::from_fn(|| engine.poll_event()).collect::<Vec<_>>();
    assert_eq!(events, vec![EngineEvent::NodeSelected("A".to_owned())]);
}

#[test]
fn empty_dataset_never_starts_the_loop() {
    let mut engine = engine_with(EngineConfig::default(), hints(8, 8.0));
    assert_eq!(
        engine.load(&DatasetInput::default()),
        Err(EngineError::EmptyDataset)
    );
    assert_eq!(engine.lifecycle(), Lifecycle::Idle);

    for _ in 0..5 {
        engine.frame(&FrameInput::default());
    }
    assert!(engine.backend().frames.is_empty());
    assert!(engine.backend().live.is_empty());
}

#[test]
fn reload_after_serialization_keeps_neighbor_sets() {
    let input = constellation(50);
    let mut first = engine_with(still_config(), hints(8, 8.0));
    first.load(&input).expect("loads");

    let json = input.to_json().expect("serializes");
    let reparsed = parse_dataset(&json).expect("parses");
    let mut second = engine_with(still_config(), hints(8, 8.0));
    second.load(&reparsed).expect("loads");

    assert_eq!(first.edges().len(), second.edges().len());
    assert_eq!(neighbor_ids(&first), neighbor_ids(&second));
}

#[test]
fn missing_skins_are_requested_once_and_fall_back() {
    let mut input = triangle();
    for node in &mut input.nodes {
        node.skin = Some("venus".to_owned());
    }

    let mut engine = engine_with(still_config(), hints(8, 8.0));
    engine.load(&input).expect("loads");
    engine.frame(&FrameInput::default());

    assert_eq!(engine.backend().texture_requests, vec!["venus".to_owned()]);
    assert_eq!(engine.backend().frames.len(), 1);
}

#[test]
fn dispose_releases_every_handle_once() {
    let mut engine = engine_with(still_config(), hints(8, 8.0));
    engine.load(&constellation(30)).expect("loads");
    engine
        .set_display_mode(DisplayMode::Explicit)
        .expect("mode switches");
    engine.frame(&FrameInput::default());
    assert!(!engine.backend().live.is_empty());

    engine.dispose();
    engine.dispose();
    assert!(engine.backend().live.is_empty());
    assert_eq!(engine.backend().stale_releases, 0);
    assert_eq!(engine.live_resource_count(), 0);
    assert_eq!(engine.fly_to("kp-1"), Err(EngineError::Disposed));
}

#[test]
fn positions_drawn_are_bounded_after_settling() {
    let mut engine = engine_with(still_config(), hints(8, 8.0));
    engine.load(&constellation(80)).expect("loads");
    for _ in 0..120 {
        engine.frame(&FrameInput::default());
    }

    let limit = engine.solver().expect("solver").hard_radius() * 1.001;
    let frame = engine.backend().frames.last().expect("drawn");
    assert_eq!(frame.node_positions.len(), 80);
    for position in &frame.node_positions {
        assert!(position.is_finite());
        assert!(position.length() <= limit);
    }
}
