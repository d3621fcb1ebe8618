// ============================================================================
// propmodel Library
// ============================================================================
//
// Declaration-driven property models and ordered collections: a model type is
// described by a table of property declarations (required, guarded, relation,
// validation wiring), instances carry a separate value bag, and relations
// resolve lazily through a registry of model factories. Collections wrap
// ordered sets of such models (or plain records and values) with filtering,
// sorting, and relational lookups.

pub mod collection;
pub mod core;
pub mod model;
pub mod store;

// Re-export main types for convenience
pub use collection::{Collection, ItemAccess, Key, Record, SortDirection};
pub use core::{DataType, ModelError, Result, Value};
pub use model::{
    Model, ModelDescriptor, ModelRegistry, PropertyDeclaration, PropertyKind, RelationReturn,
    RelationSpec, Resolved,
};
pub use store::{BoundModel, MemoryStore, RecordStore, SharedStore};
