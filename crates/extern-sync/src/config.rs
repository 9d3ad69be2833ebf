use crate::errors::SyncError;
use crate::matcher::DEFAULT_COORDINATE_TOLERANCE;
use serde::{Deserialize, Serialize};

pub const SOURCE_URL_VAR: &str = "SYNC_SOURCE_DATABASE_URL";
pub const TARGET_URL_VAR: &str = "SYNC_TARGET_DATABASE_URL";
pub const TOLERANCE_VAR: &str = "SYNC_COORDINATE_TOLERANCE";
pub const POOL_SIZE_VAR: &str = "SYNC_POOL_SIZE";

/// Tamaño de pool por defecto para cada store.
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Configuracion de una corrida de sincronización.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
  pub source_database_url: String,
  pub target_database_url: String,
  pub coordinate_tolerance: f64,
  pub pool_size: u32,
}

impl SyncConfig {
  /// Configuracion con tolerancia y pool por defecto.
  pub fn new(source_database_url: impl Into<String>, target_database_url: impl Into<String>) -> Self {
    SyncConfig { source_database_url: source_database_url.into(),
                 target_database_url: target_database_url.into(),
                 coordinate_tolerance: DEFAULT_COORDINATE_TOLERANCE,
                 pool_size: DEFAULT_POOL_SIZE }
  }

  /// Lee la configuracion del entorno, cargando `.env` si existe.
  pub fn from_env() -> Result<Self, SyncError> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Construye la configuracion a partir de una función de búsqueda de
  /// variables; `from_env` la usa con el entorno del proceso.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where F: Fn(&str) -> Option<String>
  {
    let required = |key: &str| -> Result<String, SyncError> {
      lookup(key).filter(|v| !v.trim().is_empty())
                 .ok_or_else(|| SyncError::Config(format!("{} no definida", key)))
    };
    let mut config = SyncConfig::new(required(SOURCE_URL_VAR)?, required(TARGET_URL_VAR)?);
    if let Some(raw) = lookup(TOLERANCE_VAR) {
      config.coordinate_tolerance =
        raw.trim().parse().map_err(|_| SyncError::Config(format!("{} inválida: {}", TOLERANCE_VAR, raw)))?;
    }
    if let Some(raw) = lookup(POOL_SIZE_VAR) {
      config.pool_size = raw.trim().parse().map_err(|_| SyncError::Config(format!("{} inválida: {}", POOL_SIZE_VAR, raw)))?;
    }
    config.validate()?;
    Ok(config)
  }

  /// El origen nunca se escribe: origen y destino no pueden coincidir.
  pub fn validate(&self) -> Result<(), SyncError> {
    if self.source_database_url == self.target_database_url {
      return Err(SyncError::Config("origen y destino apuntan a la misma base".into()));
    }
    if !self.coordinate_tolerance.is_finite() || self.coordinate_tolerance < 0.0 {
      return Err(SyncError::Config(format!("tolerancia inválida: {}", self.coordinate_tolerance)));
    }
    if self.pool_size == 0 {
      return Err(SyncError::Config("pool_size debe ser mayor que cero".into()));
    }
    Ok(())
  }
}
