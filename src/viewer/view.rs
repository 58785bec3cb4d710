use eframe::egui::{self, Align2, FontId, PointerButton, Sense, Ui};
use glam::Vec2;

use knowledge_universe::EngineEvent;
use knowledge_universe::FrameInput;
use knowledge_universe::engine::OrbitInput;

use super::ViewModel;
use super::render_utils::{SPACE_BACKGROUND, draw_stars, label_offset, screen_to_ndc};

const ROTATE_PER_PIXEL: f32 = 0.005;
const ZOOM_PER_SCROLL: f32 = 0.0015;

impl ViewModel {
    pub(in crate::viewer) fn draw_universe(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|position| rect.contains(*position))
            .map(|position| screen_to_ndc(rect, position));
        self.engine.pointer_moved(pointer);

        self.handle_orbit(ui, rect, &response);
        if response.clicked() {
            self.engine.click();
        }

        let dt = ui.ctx().input(|input| input.stable_dt);
        let show_labels = self.show_labels;
        self.engine.backend_mut().begin_frame(rect, show_labels);
        self.engine
            .frame(&FrameInput::new(dt, Vec2::new(rect.width(), rect.height())));

        if self.show_stars {
            draw_stars(&painter, rect, self.engine.camera(), &self.stars);
        } else {
            painter.rect_filled(rect, 0.0, SPACE_BACKGROUND);
        }

        let (shapes, labels) = self.engine.backend_mut().take_output();
        painter.extend(shapes);
        for label in labels {
            painter.text(
                label.position + label_offset(label.offset_radius),
                Align2::LEFT_CENTER,
                label.text,
                FontId::proportional(label.size),
                label.color,
            );
        }

        while let Some(event) = self.engine.poll_event() {
            match event {
                EngineEvent::NodeSelected(id) => self.selected = Some(id),
                EngineEvent::SelectionCleared => self.selected = None,
            }
        }

        ui.ctx().request_repaint();
    }

    fn handle_orbit(&mut self, ui: &Ui, rect: egui::Rect, response: &egui::Response) {
        let mut input = OrbitInput::default();

        if response.dragged_by(PointerButton::Primary) {
            let delta = response.drag_delta();
            input.rotate = Vec2::new(-delta.x, -delta.y) * ROTATE_PER_PIXEL;
        }

        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            let delta = response.drag_delta();
            let camera = self.engine.camera();
            let pixels_per_unit = camera
                .pixels_per_unit(camera.pose().target, rect.height())
                .max(f32::EPSILON);
            input.pan = Vec2::new(-delta.x, delta.y) / pixels_per_unit;
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                input.zoom = -scroll * ZOOM_PER_SCROLL;
            }
        }

        if input != OrbitInput::default() {
            self.engine.orbit(input);
        }
    }
}
