//! Interactive 3D knowledge-graph engine.
//!
//! Nodes and their relations are laid out by a force simulation, joined by
//! drifting particle belts, and emphasized around the hovered node. The
//! engine draws through a [`RenderBackend`](engine::RenderBackend), so it runs
//! headless as well as inside the desktop viewer.

pub mod dataset;
pub mod engine;
pub mod error;
pub mod util;

pub use dataset::{DatasetInput, DisplayMode, NodeRecord, RelationRecord};
pub use engine::{EngineConfig, EngineEvent, FrameInput, KnowledgeEngine};
pub use error::{AssetError, ConfigError, EngineError};
