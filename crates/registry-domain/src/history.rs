// history.rs
//
// Reglas puras sobre un historial de workflow ya cargado. Es la única
// definición de "publicado": el store en memoria y `publication` la usan.
use crate::{Role, WorkflowEntry};

/// Entrada más reciente por `id` (ids crecientes en orden de inserción).
pub fn latest_entry(entries: &[WorkflowEntry]) -> Option<&WorkflowEntry> {
  entries.iter().max_by_key(|e| e.id)
}

/// `true` sii la entrada más reciente es un `Publisher` con `finished_at`.
pub fn is_published(entries: &[WorkflowEntry]) -> bool {
  latest_entry(entries).is_some_and(|e| e.role == Role::Publisher && e.finished_at.is_some())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn entry(id: i32, role: Role, finished: bool) -> WorkflowEntry {
    let at = if finished { Some(Utc::now()) } else { None };
    WorkflowEntry { id, role, started_at: at, finished_at: at, user_id: Some(1), borehole_id: 1 }
  }

  #[test]
  fn empty_history_is_not_published() {
    assert!(!is_published(&[]));
    assert!(latest_entry(&[]).is_none());
  }

  #[test]
  fn latest_is_chosen_by_id_not_position() {
    let entries = vec![entry(9, Role::Publisher, true), entry(3, Role::Editor, false)];
    assert_eq!(latest_entry(&entries).map(|e| e.id), Some(9));
    assert!(is_published(&entries));
  }

  #[test]
  fn reopened_entry_revokes_publication() {
    let entries = vec![entry(1, Role::Publisher, true), entry(2, Role::Editor, false)];
    assert!(!is_published(&entries));
  }

  #[test]
  fn unfinished_publisher_is_not_published() {
    let entries = vec![entry(1, Role::Validator, true), entry(2, Role::Publisher, false)];
    assert!(!is_published(&entries));
  }
}
