pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod integrity;
pub mod resolve;
pub mod merge;
pub mod graph;
pub mod render;
pub mod pipeline;

pub use config::Config;
pub use error::{FamtreeError, Result};
pub use graph::{build_family_graph, FamilyGraph, GraphOptions};
pub use merge::{merge, CanonicalMap};
pub use model::{Gender, Person, PersonId, PersonRecord, RelationKind};
pub use resolve::{resolve, resolve_all, Resolution};
pub use source::{MemorySource, RecordSource};
