// borehole.rs
use crate::history;
use crate::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registro inmutable de una transición del workflow de publicación.
///
/// Con ambos timestamps presentes la etapa está completada; con ambos en
/// `None` la etapa está pendiente de la acción del siguiente actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEntry {
  pub id: i32,
  pub role: Role,
  pub started_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
  pub user_id: Option<i32>,
  pub borehole_id: i32,
}

impl WorkflowEntry {
  pub fn is_completed(&self) -> bool {
    self.started_at.is_some() && self.finished_at.is_some()
  }

  pub fn is_pending(&self) -> bool {
    self.started_at.is_none() && self.finished_at.is_none()
  }
}

/// Entrada de workflow aún no persistida (el store asigna `id` y
/// `borehole_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflowEntry {
  pub role: Role,
  pub started_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
  pub user_id: Option<i32>,
}

impl NewWorkflowEntry {
  /// Etapa revisada por `user_id` en el instante `at`.
  pub fn completed(role: Role, user_id: i32, at: DateTime<Utc>) -> Self {
    NewWorkflowEntry { role, started_at: Some(at), finished_at: Some(at), user_id: Some(user_id) }
  }

  /// Etapa a la espera del próximo actor.
  pub fn pending(role: Role) -> Self {
    NewWorkflowEntry { role, started_at: None, finished_at: None, user_id: None }
  }
}

impl From<&WorkflowEntry> for NewWorkflowEntry {
  fn from(e: &WorkflowEntry) -> Self {
    NewWorkflowEntry { role: e.role, started_at: e.started_at, finished_at: e.finished_at, user_id: e.user_id }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layer {
  pub id: i32,
  pub stratigraphy_id: i32,
  pub from_depth: Option<f64>,
  pub to_depth: Option<f64>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stratigraphy {
  pub id: i32,
  pub borehole_id: i32,
  pub name: Option<String>,
  pub is_primary: bool,
  pub layers: Vec<Layer>,
}

/// Perforación con su historial completo de workflow y sus datos hijos.
///
/// El estado de publicación nunca se almacena: se deriva del historial.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Borehole {
  pub id: i32,
  pub name: Option<String>,
  pub workgroup_id: Option<i32>,
  pub created_by_id: Option<i32>,
  pub updated_by_id: Option<i32>,
  pub total_depth: Option<f64>,
  /// Sistema de referencia principal (LV95).
  pub location_x: Option<f64>,
  pub location_y: Option<f64>,
  /// Sistema de referencia secundario (LV03).
  pub location_x_lv03: Option<f64>,
  pub location_y_lv03: Option<f64>,
  pub workflows: Vec<WorkflowEntry>,
  pub stratigraphies: Vec<Stratigraphy>,
}

impl Borehole {
  /// Entrada más reciente por `id`.
  pub fn latest_workflow(&self) -> Option<&WorkflowEntry> {
    history::latest_entry(&self.workflows)
  }

  pub fn is_published(&self) -> bool {
    history::is_published(&self.workflows)
  }

  /// Ids de usuario referenciados por la perforación: autor, último editor
  /// y actores del workflow.
  pub fn referenced_user_ids(&self) -> Vec<i32> {
    let mut ids: Vec<i32> = self.created_by_id
                                .into_iter()
                                .chain(self.updated_by_id)
                                .chain(self.workflows.iter().filter_map(|w| w.user_id))
                                .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewLayer {
  pub from_depth: Option<f64>,
  pub to_depth: Option<f64>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewStratigraphy {
  pub name: Option<String>,
  pub is_primary: bool,
  pub layers: Vec<NewLayer>,
}

impl From<&Stratigraphy> for NewStratigraphy {
  fn from(s: &Stratigraphy) -> Self {
    NewStratigraphy { name: s.name.clone(),
                      is_primary: s.is_primary,
                      layers: s.layers
                               .iter()
                               .map(|l| NewLayer { from_depth: l.from_depth,
                                                   to_depth: l.to_depth,
                                                   description: l.description.clone() })
                               .collect() }
  }
}

/// Perforación a insertar junto con sus hijos. Las referencias a usuarios
/// y grupos deben apuntar a ids del store que recibe la inserción.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewBorehole {
  pub name: Option<String>,
  pub workgroup_id: Option<i32>,
  pub created_by_id: Option<i32>,
  pub updated_by_id: Option<i32>,
  pub total_depth: Option<f64>,
  pub location_x: Option<f64>,
  pub location_y: Option<f64>,
  pub location_x_lv03: Option<f64>,
  pub location_y_lv03: Option<f64>,
  pub workflows: Vec<NewWorkflowEntry>,
  pub stratigraphies: Vec<NewStratigraphy>,
}

impl NewBorehole {
  /// Ids de usuario que la inserción exige presentes en el store.
  pub fn referenced_user_ids(&self) -> Vec<i32> {
    let mut ids: Vec<i32> = self.created_by_id
                                .into_iter()
                                .chain(self.updated_by_id)
                                .chain(self.workflows.iter().filter_map(|w| w.user_id))
                                .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
  }
}
