// in_memory.rs
//
// Implementación en memoria de `RegistryStore` para pruebas y demos. No es
// durable. Cada escritura trabaja sobre una copia de las tablas que sólo
// reemplaza al original si todas las verificaciones pasan.
use crate::registry_store::{BoreholeQuery, CommitReceipt, RegistryStore, UnitOfWork, WorkflowTransition};
use crate::{
  history, Borehole, DomainError, Layer, NewBorehole, NewUser, NewWorkflowEntry, NewWorkgroup, Stratigraphy, User,
  WorkflowEntry, Workgroup,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
  users: IndexMap<i32, User>,
  workgroups: IndexMap<i32, Workgroup>,
  boreholes: IndexMap<i32, Borehole>,
  next_user_id: i32,
  next_workgroup_id: i32,
  next_borehole_id: i32,
  next_workflow_id: i32,
  next_stratigraphy_id: i32,
  next_layer_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
  *counter += 1;
  *counter
}

impl Tables {
  fn insert_user(&mut self, user: NewUser) -> Result<i32, DomainError> {
    if self.users.values().any(|u| u.subject_id == user.subject_id) {
      return Err(DomainError::Integrity(format!("subject_id duplicado: {}", user.subject_id)));
    }
    let id = next_id(&mut self.next_user_id);
    self.users.insert(id,
                      User { id,
                             first_name: user.first_name,
                             last_name: user.last_name,
                             name: user.name,
                             subject_id: user.subject_id });
    Ok(id)
  }

  fn insert_workgroup(&mut self, workgroup: NewWorkgroup) -> Result<i32, DomainError> {
    if self.workgroups.values().any(|w| w.name == workgroup.name) {
      return Err(DomainError::Integrity(format!("workgroup duplicado: {}", workgroup.name)));
    }
    let id = next_id(&mut self.next_workgroup_id);
    self.workgroups.insert(id, Workgroup { id, name: workgroup.name });
    Ok(id)
  }

  fn check_user(&self, user_id: i32) -> Result<(), DomainError> {
    if self.users.contains_key(&user_id) {
      Ok(())
    } else {
      Err(DomainError::Integrity(format!("usuario {} inexistente", user_id)))
    }
  }

  fn workflow_entries(&mut self, borehole_id: i32, entries: Vec<NewWorkflowEntry>) -> Result<Vec<WorkflowEntry>, DomainError> {
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
      if let Some(uid) = e.user_id {
        self.check_user(uid)?;
      }
      out.push(WorkflowEntry { id: next_id(&mut self.next_workflow_id),
                               role: e.role,
                               started_at: e.started_at,
                               finished_at: e.finished_at,
                               user_id: e.user_id,
                               borehole_id });
    }
    Ok(out)
  }

  fn apply_transition(&mut self, borehole_id: i32, t: WorkflowTransition) -> Result<Vec<WorkflowEntry>, DomainError> {
    if !self.boreholes.contains_key(&borehole_id) {
      return Err(DomainError::NotFound(format!("borehole {}", borehole_id)));
    }
    let mut touched = Vec::new();
    let mut created = Vec::new();
    match t.pending_entry_id {
      Some(entry_id) => {
        if let Some(uid) = t.completed.user_id {
          self.check_user(uid)?;
        }
        let entry = self.boreholes
                        .get_mut(&borehole_id)
                        .and_then(|b| b.workflows.iter_mut().find(|e| e.id == entry_id))
                        .ok_or_else(|| DomainError::NotFound(format!("workflow {} de borehole {}", entry_id, borehole_id)))?;
        if !entry.is_pending() || entry.role != t.completed.role {
          return Err(DomainError::Integrity(format!("workflow {} no es una etapa {} pendiente", entry_id, t.completed.role)));
        }
        entry.started_at = t.completed.started_at;
        entry.finished_at = t.completed.finished_at;
        entry.user_id = t.completed.user_id;
        touched.push(entry.clone());
      }
      None => created.extend(self.workflow_entries(borehole_id, vec![t.completed])?),
    }
    if let Some(next) = t.next {
      created.extend(self.workflow_entries(borehole_id, vec![next])?);
    }
    if let Some(b) = self.boreholes.get_mut(&borehole_id) {
      b.workflows.extend(created.iter().cloned());
    }
    touched.extend(created);
    Ok(touched)
  }

  fn insert_borehole(&mut self, b: NewBorehole) -> Result<i32, DomainError> {
    if let Some(wg) = b.workgroup_id {
      if !self.workgroups.contains_key(&wg) {
        return Err(DomainError::Integrity(format!("workgroup {} inexistente", wg)));
      }
    }
    for uid in b.referenced_user_ids() {
      self.check_user(uid)?;
    }
    let id = next_id(&mut self.next_borehole_id);
    let workflows = self.workflow_entries(id, b.workflows)?;
    let mut stratigraphies = Vec::with_capacity(b.stratigraphies.len());
    for s in b.stratigraphies {
      let sid = next_id(&mut self.next_stratigraphy_id);
      let layers = s.layers
                    .into_iter()
                    .map(|l| Layer { id: next_id(&mut self.next_layer_id),
                                     stratigraphy_id: sid,
                                     from_depth: l.from_depth,
                                     to_depth: l.to_depth,
                                     description: l.description })
                    .collect();
      stratigraphies.push(Stratigraphy { id: sid, borehole_id: id, name: s.name, is_primary: s.is_primary, layers });
    }
    self.boreholes.insert(id,
                          Borehole { id,
                                     name: b.name,
                                     workgroup_id: b.workgroup_id,
                                     created_by_id: b.created_by_id,
                                     updated_by_id: b.updated_by_id,
                                     total_depth: b.total_depth,
                                     location_x: b.location_x,
                                     location_y: b.location_y,
                                     location_x_lv03: b.location_x_lv03,
                                     location_y_lv03: b.location_y_lv03,
                                     workflows,
                                     stratigraphies });
    Ok(id)
  }
}

/// Store del registro en memoria.
#[derive(Debug, Default)]
pub struct InMemoryRegistryStore {
  tables: Mutex<Tables>,
}

impl InMemoryRegistryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, Tables>, DomainError> {
    self.tables.lock().map_err(|e| DomainError::External(format!("mutex poisoned: {:?}", e)))
  }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
  async fn users(&self) -> Result<Vec<User>, DomainError> {
    Ok(self.lock()?.users.values().cloned().collect())
  }

  async fn workgroups(&self) -> Result<Vec<Workgroup>, DomainError> {
    Ok(self.lock()?.workgroups.values().cloned().collect())
  }

  async fn boreholes(&self, query: BoreholeQuery) -> Result<Vec<Borehole>, DomainError> {
    let tables = self.lock()?;
    let selected = tables.boreholes
                         .values()
                         .filter(|b| match &query {
                           BoreholeQuery::All => true,
                           BoreholeQuery::Published => history::is_published(&b.workflows),
                           BoreholeQuery::Ids(ids) => ids.contains(&b.id),
                         })
                         .cloned()
                         .collect();
    Ok(selected)
  }

  async fn apply_workflow_transition(&self,
                                     borehole_id: i32,
                                     transition: WorkflowTransition)
                                     -> Result<Vec<WorkflowEntry>, DomainError> {
    let mut tables = self.lock()?;
    let mut staged = tables.clone();
    let touched = staged.apply_transition(borehole_id, transition)?;
    *tables = staged;
    Ok(touched)
  }

  async fn commit(&self, unit: UnitOfWork) -> Result<CommitReceipt, DomainError> {
    let mut tables = self.lock()?;
    let mut staged = tables.clone();
    let (users, workgroups, boreholes) = unit.into_parts();
    let mut receipt = CommitReceipt::default();
    for u in users {
      receipt.user_ids.push(staged.insert_user(u)?);
    }
    for w in workgroups {
      receipt.workgroup_ids.push(staged.insert_workgroup(w)?);
    }
    for b in boreholes {
      receipt.borehole_ids.push(staged.insert_borehole(b)?);
    }
    *tables = staged;
    Ok(receipt)
  }
}
