use publication::WorkflowError;
use registry_domain::DomainError;
use thiserror::Error;

// Errores del pipeline de sincronización.
//
// El manager devuelve tal cual el error que produjo la tarea fallida; no
// existe una variante envolvente de "fallo de tarea".
#[derive(Error, Debug)]
pub enum SyncError {
  /// Errores de lectura/escritura en el store de origen o destino.
  #[error("Error de store: {0}")]
  Store(#[from] DomainError),

  /// Errores del workflow de publicación al seleccionar perforaciones.
  #[error("Error de workflow: {0}")]
  Workflow(#[from] WorkflowError),

  /// Autoverificación de una tarea fallida o datos de origen
  /// inconsistentes (por ejemplo una referencia sin mapeo en destino).
  #[error("Error de validacion: {0}")]
  Validation(String),

  #[error("Sincronizacion cancelada")]
  Cancelled,

  #[error("Error de configuracion: {0}")]
  Config(String),
}
