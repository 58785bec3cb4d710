use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{info, warn};

use knowledge_universe::dataset::load_dataset;
use knowledge_universe::engine::{KnowledgeEngine, SearchHit};
use knowledge_universe::{DatasetInput, EngineConfig, EngineError};

mod backend;
mod fps;
mod panels;
mod render_utils;
mod view;

use backend::EguiBackend;
use fps::FpsCounter;
use render_utils::Star;

type LoadResult = Result<DatasetInput, String>;

pub struct UniverseApp {
    dataset_path: PathBuf,
    config: EngineConfig,
    skins_dir: Option<PathBuf>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Empty,
    Error(String),
}

struct ViewModel {
    engine: KnowledgeEngine<EguiBackend>,
    stars: Vec<Star>,
    search: String,
    search_hits: Vec<SearchHit>,
    searched_query: String,
    selected: Option<String>,
    show_labels: bool,
    show_stars: bool,
    status: Option<String>,
    fps: FpsCounter,
}

impl UniverseApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        dataset_path: PathBuf,
        config: EngineConfig,
        skins_dir: Option<PathBuf>,
    ) -> Self {
        let state = Self::start_load(&dataset_path);
        Self {
            dataset_path,
            config,
            skins_dir,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(dataset_path: &Path) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();
        let path = dataset_path.to_path_buf();

        thread::spawn(move || {
            let result = load_dataset(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(dataset_path: &Path) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(dataset_path),
        }
    }

    fn ready_state(&self, input: DatasetInput) -> AppState {
        match ViewModel::new(&input, self.config.clone(), self.skins_dir.clone()) {
            Ok(model) => AppState::Ready(Box::new(model)),
            Err(EngineError::EmptyDataset) => AppState::Empty,
            Err(error) => AppState::Error(error.to_string()),
        }
    }

    fn loaded_state(&self, result: LoadResult) -> AppState {
        match result {
            Ok(input) => self.ready_state(input),
            Err(error) => {
                warn!(%error, "dataset load failed");
                AppState::Error(error)
            }
        }
    }
}

impl eframe::App for UniverseApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(result),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading knowledge universe...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Empty => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("This dataset has no knowledge points yet");
                        ui.add_space(6.0);
                        ui.label(self.dataset_path.display().to_string());
                        ui.add_space(10.0);
                        retry = ui.button("Reload").clicked();
                    });
                });
                if retry {
                    self.state = Self::start_load(&self.dataset_path);
                }
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load knowledge dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(&self.dataset_path);
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.dataset_path, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    info!(path = %self.dataset_path.display(), "reloading dataset");
                    self.reload_rx = Some(Self::spawn_load(&self.dataset_path));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => self.reload_rx = Some(rx),
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = self.loaded_state(result);
        }
    }
}

impl ViewModel {
    fn new(
        input: &DatasetInput,
        config: EngineConfig,
        skins_dir: Option<PathBuf>,
    ) -> Result<Self, EngineError> {
        let seed = config.seed;
        let mut engine = KnowledgeEngine::new(config, EguiBackend::new(skins_dir))?;
        engine.load(input)?;

        Ok(Self {
            engine,
            stars: render_utils::starfield(seed),
            search: String::new(),
            search_hits: Vec::new(),
            searched_query: String::new(),
            selected: None,
            show_labels: true,
            show_stars: true,
            status: None,
            fps: FpsCounter::default(),
        })
    }

    fn fly_to(&mut self, id: &str) {
        self.status = match self.engine.fly_to(id) {
            Ok(()) => None,
            Err(error) => Some(error.to_string()),
        };
    }
}
