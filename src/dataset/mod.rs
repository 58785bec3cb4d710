mod graph;
mod load;
pub mod palette;
mod records;
mod relation;

pub use graph::{DisplayMode, Edge, INFERRED_EDGE_STRENGTH, KnowledgeGraph, Node};
pub use load::{load_dataset, parse_dataset};
pub use records::{DatasetInput, NodeRecord, RelationRecord};
pub use relation::{NodeState, RelationType};
