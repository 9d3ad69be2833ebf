//! registry-domain: modelo del registro de perforaciones
//!
//! Define los tipos de dominio (`Borehole`, `WorkflowEntry`, `User`,
//! `Workgroup`, estratigrafías), el enum de etapas `Role`, la regla pura de
//! publicación sobre un historial de workflow, el contrato asíncrono
//! `RegistryStore` y una implementación en memoria para pruebas.
mod borehole;
mod clock;
mod errors;
pub mod history;
mod in_memory;
mod registry_store;
mod role;
mod user;

pub use borehole::{Borehole, Layer, NewBorehole, NewLayer, NewStratigraphy, NewWorkflowEntry, Stratigraphy, WorkflowEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::DomainError;
pub use in_memory::InMemoryRegistryStore;
pub use registry_store::{BoreholeQuery, CommitReceipt, RegistryStore, UnitOfWork, WorkflowTransition};
pub use role::Role;
pub use user::{NewUser, NewWorkgroup, User, Workgroup};
