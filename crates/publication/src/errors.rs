// Archivo: errors.rs
// Propósito: errores del workflow de publicación y alias Result<T>.
use registry_domain::{DomainError, Role};
use thiserror::Error;

/// Errores del workflow de publicación.
///
/// - `UnsupportedTransition`: rol que no es una etapa (por ejemplo `View`).
/// - `BoreholeNotFound`: el id no existe en el store.
/// - `MissingBorehole`: se evaluó una perforación ausente (`None`).
/// - `Cancelled`: cancelación cooperativa observada antes de escribir.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Transición no soportada: {0}")]
    UnsupportedTransition(Role),
    #[error("Perforación no encontrada: {0}")]
    BoreholeNotFound(i32),
    #[error("Perforación ausente")]
    MissingBorehole,
    #[error("Operación cancelada")]
    Cancelled,
    #[error("Error de store: {0}")]
    Store(#[from] DomainError),
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;
