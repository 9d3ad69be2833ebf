// clock.rs
//
// Fuente de tiempo inyectable: el workflow sella `started_at`/`finished_at`
// con el reloj recibido para que las pruebas controlen el tiempo.
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Reloj del sistema.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Reloj fijo y ajustable manualmente, útil para pruebas.
#[derive(Debug)]
pub struct FixedClock {
  at: Mutex<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(at: DateTime<Utc>) -> Self {
    Self { at: Mutex::new(at) }
  }

  pub fn advance(&self, by: Duration) {
    let mut at = self.at.lock().unwrap_or_else(|e| e.into_inner());
    *at += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.at.lock().unwrap_or_else(|e| e.into_inner())
  }
}
