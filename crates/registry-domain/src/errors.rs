// errors.rs
use thiserror::Error;

/// Errores del dominio del registro y de los stores que lo persisten.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  Validation(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Violación de integridad referencial o de unicidad al confirmar una
  /// unidad de trabajo. El store queda sin cambios.
  #[error("Error de integridad: {0}")]
  Integrity(String),
  #[error("Error externo: {0}")]
  External(String),
}

