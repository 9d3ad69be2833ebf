// Errores internos de la capa Diesel; se traducen a `DomainError` en el
// borde del store.
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use registry_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
  #[error("db: {0}")]
  Db(#[from] DieselError),
  #[error("pool: {0}")]
  Pool(#[from] r2d2::Error),
  #[error(transparent)]
  Domain(#[from] DomainError),
}

impl From<StoreError> for DomainError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::Domain(d) => d,
      StoreError::Db(DieselError::DatabaseError(kind, info)) => match kind {
        DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation => {
          DomainError::Integrity(info.message().to_string())
        }
        _ => DomainError::External(format!("db: {}", info.message())),
      },
      other => DomainError::External(other.to_string()),
    }
  }
}
