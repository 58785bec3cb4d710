use std::path::Path;

use eframe::egui::{self, Align, Context, Layout, RichText, Ui};

use knowledge_universe::DisplayMode;
use knowledge_universe::engine::search_nodes;
use knowledge_universe::util::short_label;

use super::ViewModel;

const NEIGHBOR_ROWS: usize = 40;

impl ViewModel {
    pub(in crate::viewer) fn show(
        &mut self,
        ctx: &Context,
        dataset_path: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.fps.update(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Knowledge Universe");
                    ui.separator();
                    ui.label(format!("dataset: {}", dataset_path.display()));
                    ui.label(format!("nodes: {}", self.engine.nodes().len()));
                    ui.label(format!("edges: {}", self.engine.edges().len()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dataset"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(fps_text) = self.fps.display_text() {
                            ui.label(fps_text);
                        }
                        ui.label(format!("tier: {}", self.engine.scheduler().tier()));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if is_loading {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Reloading knowledge universe...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                } else {
                    self.draw_universe(ui);
                }
            });
    }

    fn refresh_search(&mut self) {
        if self.search == self.searched_query {
            return;
        }
        self.search_hits = search_nodes(self.engine.nodes(), &self.search);
        self.searched_query = self.search.clone();
    }

    fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Explore");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search (label, tag or category)")
            .on_hover_text("Fuzzy-match knowledge points, then click one to fly to it.");
        ui.text_edit_singleline(&mut self.search);
        self.refresh_search();

        let mut fly_target = None;
        for hit in &self.search_hits {
            let selected = self.selected.as_deref() == Some(hit.id.as_str());
            if ui
                .selectable_label(selected, short_label(&hit.label, 36))
                .on_hover_text(hit.id.as_str())
                .clicked()
            {
                fly_target = Some(hit.id.clone());
            }
        }
        if !self.search.trim().is_empty() && self.search_hits.is_empty() {
            ui.small("No matches.");
        }

        ui.separator();
        ui.label(RichText::new("Edges").strong());
        let mut mode = self.engine.display_mode();
        ui.horizontal_wrapped(|ui| {
            for option in DisplayMode::ALL {
                ui.radio_value(&mut mode, option, option.label());
            }
        });
        if mode != self.engine.display_mode()
            && let Err(error) = self.engine.set_display_mode(mode)
        {
            self.status = Some(error.to_string());
        }

        ui.separator();
        ui.checkbox(&mut self.show_labels, "Labels");
        ui.checkbox(&mut self.show_stars, "Starfield");
        if ui.button("Reset view").clicked() {
            self.engine.reset_view();
        }

        ui.separator();
        ui.label(RichText::new("Renderer").strong());
        let scheduler = self.engine.scheduler();
        ui.label(format!("device tier: {}", scheduler.tier()));
        ui.label(format!("particle budget: {}", scheduler.budget()));
        ui.label(format!("density scale: {:.2}", scheduler.global_scale()));
        if let Some(fps) = scheduler.smoothed_fps() {
            ui.label(format!("smoothed fps: {fps:.1}"));
        }
        let particles = self.engine.batches().iter().map(|batch| batch.rendered_count()).sum::<usize>();
        ui.label(format!("particles: {particles}"));
        ui.label(format!("particles on screen: {}", self.engine.backend().particles_drawn()));
        if let Some(solver) = self.engine.solver() {
            ui.label(format!("layout alpha: {:.3}", solver.alpha()));
        }

        if let Some(status) = &self.status {
            ui.separator();
            ui.colored_label(egui::Color32::LIGHT_RED, status.as_str());
        }

        if let Some(id) = fly_target {
            self.fly_to(&id);
        }
    }

    fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Click a node or pick a search result.");
            return;
        };
        let Some(graph) = self.engine.graph() else {
            return;
        };
        let Some(index) = graph.index_of(&selected_id) else {
            ui.label("Selected node no longer exists in the dataset.");
            return;
        };
        let node = &graph.nodes[index];

        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);
        ui.label(format!("State: {}", node.state.label()));
        if let Some(category) = &node.category {
            ui.label(format!("Category: {category}"));
        }
        if !node.tags.is_empty() {
            let tags = node.tags.iter().map(String::as_str).collect::<Vec<_>>();
            ui.label(format!("Tags: {}", tags.join(", ")));
        }

        ui.separator();
        ui.label(RichText::new("Connected").strong());

        let Some(adjacency) = self.engine.adjacency() else {
            return;
        };
        let entries = adjacency.entries(index);
        if entries.is_empty() {
            ui.label("No relations for this node.");
            return;
        }

        let mut fly_target = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in entries.iter().take(NEIGHBOR_ROWS) {
                let neighbor = &graph.nodes[entry.neighbor];
                let edge = &graph.edges[entry.edge];
                let kind = if edge.is_inferred {
                    format!("shared tags: {}", edge.shared_tags.join(", "))
                } else {
                    edge.relation_type.label().to_owned()
                };
                ui.horizontal(|ui| {
                    if ui.link(short_label(&neighbor.label, 32)).clicked() {
                        fly_target = Some(neighbor.id.clone());
                    }
                    ui.small(kind);
                });
            }
            if entries.len() > NEIGHBOR_ROWS {
                ui.small(format!("... {} more", entries.len() - NEIGHBOR_ROWS));
            }
        });

        if let Some(id) = fly_target {
            self.fly_to(&id);
        }
    }
}
