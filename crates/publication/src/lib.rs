//! Crate `publication`: workflow de aprobación y publicación de perforaciones
//!
//! Este crate expone `PublicationWorkflow`, que avanza una perforación por
//! la cadena Editor → Controller → Validator → Publisher, y las reglas
//! puras que derivan el estado de publicación del historial de
//! `WorkflowEntry`.
//!
//! Diseño resumido:
//! - Estado derivado: "publicado" se calcula siempre a partir de la entrada
//!   más reciente; no existe un flag almacenado.
//! - Historial sólo-append: las entradas completadas no se modifican; una
//!   entrada pendiente se completa cuando su actor avanza.
//! - Serialización por perforación: avances concurrentes de la misma
//!   perforación no se intercalan.
//!
//! Ejemplo rápido:
//! ```rust
//! use publication::PublicationWorkflow;
//! use registry_domain::InMemoryRegistryStore;
//! use std::sync::Arc;
//! let workflow = PublicationWorkflow::new(Arc::new(InMemoryRegistryStore::new()));
//! ```
pub mod engine;
pub mod errors;
pub mod rules;

pub use engine::*;
pub use errors::*;
pub use rules::*;
