use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use eframe::egui::{Color32, Pos2, Rect, Shape, Stroke};
use tracing::debug;

use knowledge_universe::AssetError;
use knowledge_universe::dataset::Node;
use knowledge_universe::engine::{
    FeatureLevel, RenderBackend, ResourceHandle, SceneFrame,
};
use knowledge_universe::util::short_label;

use super::render_utils::{blend_color, circle_visible, ndc_to_screen, rgb_color};

const SKIN_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const LABEL_MAX_CHARS: usize = 32;
const PARTICLE_RADIUS_MIN: f32 = 0.6;
const PARTICLE_RADIUS_MAX: f32 = 4.0;

pub(super) struct LabelDraw {
    pub position: Pos2,
    pub offset_radius: f32,
    pub text: String,
    pub size: f32,
    pub color: Color32,
}

/// Paints the engine's scene frames with the egui painter. Handles are plain
/// counters since egui owns no GPU objects for circles.
pub(super) struct EguiBackend {
    viewport: Rect,
    show_labels: bool,
    skins_dir: Option<PathBuf>,
    next_handle: u64,
    live: HashSet<ResourceHandle>,
    shapes: Vec<(f32, Shape)>,
    labels: Vec<LabelDraw>,
    particles_drawn: usize,
}

impl EguiBackend {
    pub(super) fn new(skins_dir: Option<PathBuf>) -> Self {
        Self {
            viewport: Rect::NOTHING,
            show_labels: true,
            skins_dir,
            next_handle: 0,
            live: HashSet::new(),
            shapes: Vec::new(),
            labels: Vec::new(),
            particles_drawn: 0,
        }
    }

    pub(super) fn begin_frame(&mut self, viewport: Rect, show_labels: bool) {
        self.viewport = viewport;
        self.show_labels = show_labels;
        self.shapes.clear();
        self.labels.clear();
    }

    /// Shapes back to front, plus labels to draw over them.
    pub(super) fn take_output(&mut self) -> (Vec<Shape>, Vec<LabelDraw>) {
        self.shapes.sort_by(|a, b| b.0.total_cmp(&a.0));
        let shapes = self.shapes.drain(..).map(|(_, shape)| shape).collect();
        (shapes, std::mem::take(&mut self.labels))
    }

    pub(super) fn particles_drawn(&self) -> usize {
        self.particles_drawn
    }

    fn allocate(&mut self) -> ResourceHandle {
        self.next_handle += 1;
        let handle = ResourceHandle(self.next_handle);
        self.live.insert(handle);
        handle
    }

    fn draw_edges(&mut self, frame: &SceneFrame<'_>) {
        let rect = self.viewport;
        for (edge, draw) in frame.edges.iter().zip(frame.edge_draws) {
            let (Some(source), Some(target)) = (
                frame.camera.project(draw.source_world),
                frame.camera.project(draw.target_world),
            ) else {
                continue;
            };

            let color = rgb_color(edge.color, draw.opacity * 0.18);
            let from = ndc_to_screen(rect, source);
            let to = ndc_to_screen(rect, target);
            let depth = source.z.max(target.z);
            self.shapes
                .push((depth, Shape::line_segment([from, to], Stroke::new(draw.width, color))));

            let hovered_edge = frame.hovered.is_some_and(|hovered| edge.touches(hovered));
            if self.show_labels && hovered_edge && draw.label_opacity > 0.05 {
                self.labels.push(LabelDraw {
                    position: from + (to - from) * 0.5,
                    offset_radius: 0.0,
                    text: edge.relation_type.label().to_owned(),
                    size: 11.0,
                    color: rgb_color(edge.color, draw.label_opacity),
                });
            }
        }
    }

    fn draw_connectors(&mut self, frame: &SceneFrame<'_>) {
        let rect = self.viewport;
        let mut drawn = 0;

        for batch in frame.batches {
            let Some(edge) = frame.edge_draws.get(batch.edge_index) else {
                continue;
            };
            if edge.opacity <= 0.01 {
                continue;
            }

            for (particle, transform) in batch.particles().iter().zip(batch.transforms()) {
                let world = transform.w_axis.truncate();
                let Some(ndc) = frame.camera.project(world) else {
                    continue;
                };
                if ndc.z > 1.0 {
                    continue;
                }

                let position = ndc_to_screen(rect, ndc);
                let scale = transform.x_axis.truncate().length();
                let radius = (scale * frame.camera.pixels_per_unit(world, rect.height()))
                    .clamp(PARTICLE_RADIUS_MIN, PARTICLE_RADIUS_MAX);
                if !circle_visible(rect, position, radius) {
                    continue;
                }

                let color = rgb_color(batch.color.scaled(particle.brightness), edge.opacity);
                self.shapes
                    .push((ndc.z, Shape::circle_filled(position, radius, color)));
                drawn += 1;
            }
        }

        self.particles_drawn = drawn;
    }

    fn draw_nodes(&mut self, frame: &SceneFrame<'_>) {
        let rect = self.viewport;

        for ((node, draw), skin) in frame.nodes.iter().zip(frame.node_draws).zip(frame.skins) {
            let Some(ndc) = frame.camera.project(draw.world_position) else {
                continue;
            };
            if ndc.z > 1.0 {
                continue;
            }

            let position = ndc_to_screen(rect, ndc);
            let radius = draw.radius * frame.camera.pixels_per_unit(draw.world_position, rect.height());
            if !circle_visible(rect, position, radius) {
                continue;
            }

            let fill = rgb_color(draw.color, draw.opacity);
            let glow = rgb_color(skin.emissive_color(), draw.opacity);
            self.shapes.push((
                ndc.z,
                Shape::circle_filled(position, radius, blend_color(fill, glow, draw.emissive_intensity * 0.35)),
            ));

            if draw.emissive_intensity > 0.05 {
                let rim = Stroke::new(
                    1.0 + draw.emissive_intensity * 2.0,
                    rgb_color(skin.emissive_color(), draw.opacity * draw.emissive_intensity.min(1.0)),
                );
                self.shapes
                    .push((ndc.z, Shape::circle_stroke(position, radius + 1.5, rim)));
            }
            if frame.selected == Some(node.index) {
                self.shapes.push((
                    ndc.z,
                    Shape::circle_stroke(position, radius + 4.0, Stroke::new(1.5, Color32::WHITE)),
                ));
            }

            if self.show_labels && draw.label_opacity > 0.02 {
                self.labels.push(LabelDraw {
                    position,
                    offset_radius: radius,
                    text: short_label(&node.label, LABEL_MAX_CHARS),
                    size: draw.label_size,
                    color: Color32::from_white_alpha((draw.label_opacity * 255.0) as u8),
                });
            }
        }
    }
}

/// Reads a skin image and checks it is a PNG or JPEG.
fn read_skin(key: &str, path: &Path) -> Result<(), AssetError> {
    let bytes = fs::read(path).map_err(|err| AssetError::Load {
        key: key.to_owned(),
        reason: err.to_string(),
    })?;

    if bytes.starts_with(PNG_SIGNATURE) || bytes.starts_with(JPEG_SIGNATURE) {
        Ok(())
    } else {
        Err(AssetError::Load {
            key: key.to_owned(),
            reason: format!("{} is not a PNG or JPEG image", path.display()),
        })
    }
}

impl RenderBackend for EguiBackend {
    fn feature_level(&self) -> Option<FeatureLevel> {
        Some(FeatureLevel::Modern)
    }

    fn create_node_mesh(&mut self, _node: &Node) -> ResourceHandle {
        self.allocate()
    }

    fn load_texture(&mut self, key: &str) -> Result<ResourceHandle, AssetError> {
        let dir = self
            .skins_dir
            .as_ref()
            .ok_or_else(|| AssetError::Unavailable(key.to_owned()))?;

        let path = SKIN_EXTENSIONS
            .iter()
            .map(|extension| dir.join(format!("{key}.{extension}")))
            .find(|path| path.is_file())
            .ok_or_else(|| AssetError::NotFound(key.to_owned()))?;

        read_skin(key, &path)?;
        debug!(skin = key, path = %path.display(), "skin loaded");
        Ok(self.allocate())
    }

    fn create_instance_buffer(&mut self, _capacity: usize) -> ResourceHandle {
        self.allocate()
    }

    fn release(&mut self, handle: ResourceHandle) {
        self.live.remove(&handle);
    }

    fn draw(&mut self, frame: &SceneFrame<'_>) {
        if self.viewport.width() <= 0.0 || self.viewport.height() <= 0.0 {
            return;
        }

        self.draw_edges(frame);
        self.draw_connectors(frame);
        self.draw_nodes(frame);
    }
}
