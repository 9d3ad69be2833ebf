//! extern-sync: sincronización hacia el registro externo
//!
//! Copia las perforaciones publicadas (y los usuarios y grupos que
//! referencian) desde el store interno de autoría a un store externo de
//! sólo lectura, sin crear duplicados. Las tareas (`SyncTask`) corren en un
//! pipeline secuencial y fail-fast orquestado por `SyncTaskManager`.

pub mod config;
pub mod context;
pub mod errors;
pub mod manager;
pub mod matcher;
pub mod task;
pub mod tasks;

pub use config::SyncConfig;
pub use context::{ensure_not_cancelled, SyncContext};
pub use errors::SyncError;
pub use manager::{PipelineState, SyncTaskManager};
pub use matcher::{DuplicateMatcher, SpatialSignature, DEFAULT_COORDINATE_TOLERANCE};
pub use task::{SyncTask, TaskReport};
pub use tasks::{default_pipeline, SyncBoreholesTask, SyncUsersTask, SyncWorkgroupsTask};
