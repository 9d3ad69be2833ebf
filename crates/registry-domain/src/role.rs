// role.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Etapas de la cadena de aprobación. El orden de las variantes es el
/// único orden de progresión válido; `View` no es una etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  View,
  Editor,
  Controller,
  Validator,
  Publisher,
}

impl Role {
  /// Etapas del workflow en orden de progresión.
  pub const STAGES: [Role; 4] = [Role::Editor, Role::Controller, Role::Validator, Role::Publisher];

  /// Código entero persistido (0 = View ... 4 = Publisher).
  pub fn ordinal(self) -> i32 {
    match self {
      Role::View => 0,
      Role::Editor => 1,
      Role::Controller => 2,
      Role::Validator => 3,
      Role::Publisher => 4,
    }
  }

  pub fn is_stage(self) -> bool {
    self != Role::View
  }

  /// Siguiente etapa en la secuencia. `Publisher` es la última y `View`
  /// no participa de la secuencia.
  pub fn next(self) -> Option<Role> {
    match self {
      Role::Editor => Some(Role::Controller),
      Role::Controller => Some(Role::Validator),
      Role::Validator => Some(Role::Publisher),
      Role::Publisher | Role::View => None,
    }
  }
}

impl TryFrom<i32> for Role {
  type Error = DomainError;

  fn try_from(code: i32) -> Result<Self, Self::Error> {
    match code {
      0 => Ok(Role::View),
      1 => Ok(Role::Editor),
      2 => Ok(Role::Controller),
      3 => Ok(Role::Validator),
      4 => Ok(Role::Publisher),
      other => Err(DomainError::Validation(format!("código de rol desconocido: {}", other))),
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Role::View => "view",
      Role::Editor => "editor",
      Role::Controller => "controller",
      Role::Validator => "validator",
      Role::Publisher => "publisher",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for Role {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "view" => Ok(Role::View),
      "editor" => Ok(Role::Editor),
      "controller" => Ok(Role::Controller),
      "validator" => Ok(Role::Validator),
      "publisher" => Ok(Role::Publisher),
      other => Err(DomainError::Validation(format!("rol desconocido: {}", other))),
    }
  }
}
