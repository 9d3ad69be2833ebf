//! Persistencia Diesel/SQLite para el trait `RegistryStore`.
//! Este archivo expone el módulo `schema` y reexporta el store Diesel. La
//! implementación detallada está en `registry_persistence.rs`.

mod error;
mod registry_persistence;
pub mod schema;

pub use registry_persistence::{DieselRegistryStore, DEFAULT_POOL_SIZE, MIGRATIONS};
use registry_domain::DomainError;

/// Abre el store apuntado por la variable de entorno `var` (cargando
/// `.env` si existe) y aplica las migraciones.
pub fn new_from_env(var: &str) -> Result<DieselRegistryStore, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var(var).map_err(|_| DomainError::External(format!("{} not set", var)))?;
  DieselRegistryStore::open(&url)
}
