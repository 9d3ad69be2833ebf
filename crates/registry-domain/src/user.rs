// user.rs
use serde::{Deserialize, Serialize};

/// Usuario propio de cada store. El mismo actor puede tener `id` distintos
/// en origen y destino; `subject_id` es la clave natural que los correlaciona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: i32,
  pub first_name: String,
  pub last_name: String,
  pub name: String,
  pub subject_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
  pub first_name: String,
  pub last_name: String,
  pub name: String,
  pub subject_id: String,
}

impl From<&User> for NewUser {
  fn from(u: &User) -> Self {
    NewUser { first_name: u.first_name.clone(),
              last_name: u.last_name.clone(),
              name: u.name.clone(),
              subject_id: u.subject_id.clone() }
  }
}

/// Grupo de trabajo dueño de perforaciones; se correlaciona por `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workgroup {
  pub id: i32,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkgroup {
  pub name: String,
}
