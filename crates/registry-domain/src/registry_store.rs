// registry_store.rs
//
// Contrato mínimo de acceso a un store del registro (origen o destino).
// Las implementaciones concretas viven en `InMemoryRegistryStore` y en
// `registry-persistence` (Diesel/SQLite).
use crate::{Borehole, DomainError, NewBorehole, NewUser, NewWorkflowEntry, NewWorkgroup, User, WorkflowEntry, Workgroup};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Predicados de selección de perforaciones que el store evalúa en bloque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoreholeQuery {
  All,
  /// Perforaciones cuya entrada de workflow más reciente es un `Publisher`
  /// completado.
  Published,
  Ids(Vec<i32>),
}

/// Transición de workflow: completar una etapa y, opcionalmente, abrir la
/// siguiente como pendiente.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowTransition {
  /// Entrada pendiente que se completa; `None` inserta `completed` como
  /// entrada nueva.
  pub pending_entry_id: Option<i32>,
  pub completed: NewWorkflowEntry,
  pub next: Option<NewWorkflowEntry>,
}

/// Lote de inserciones que el store aplica en una sola transacción.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
  users: Vec<NewUser>,
  workgroups: Vec<NewWorkgroup>,
  boreholes: Vec<NewBorehole>,
}

impl UnitOfWork {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_user(&mut self, user: NewUser) -> &mut Self {
    self.users.push(user);
    self
  }

  pub fn add_workgroup(&mut self, workgroup: NewWorkgroup) -> &mut Self {
    self.workgroups.push(workgroup);
    self
  }

  pub fn add_borehole(&mut self, borehole: NewBorehole) -> &mut Self {
    self.boreholes.push(borehole);
    self
  }

  pub fn users(&self) -> &[NewUser] {
    &self.users
  }

  pub fn workgroups(&self) -> &[NewWorkgroup] {
    &self.workgroups
  }

  pub fn boreholes(&self) -> &[NewBorehole] {
    &self.boreholes
  }

  pub fn len(&self) -> usize {
    self.users.len() + self.workgroups.len() + self.boreholes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn into_parts(self) -> (Vec<NewUser>, Vec<NewWorkgroup>, Vec<NewBorehole>) {
    (self.users, self.workgroups, self.boreholes)
  }
}

/// Ids generados por `commit`, en el mismo orden en que se agregaron.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
  pub user_ids: Vec<i32>,
  pub workgroup_ids: Vec<i32>,
  pub borehole_ids: Vec<i32>,
}

/// Handle a un store del registro.
///
/// Los ids son generados por el store y crecen monótonamente; los ids de
/// entradas de workflow crecen en orden de inserción. Las perforaciones
/// devueltas incluyen su historial (ordenado por id) y estratigrafías.
#[async_trait]
pub trait RegistryStore: Send + Sync {
  async fn users(&self) -> Result<Vec<User>, DomainError>;

  async fn workgroups(&self) -> Result<Vec<Workgroup>, DomainError>;

  async fn boreholes(&self, query: BoreholeQuery) -> Result<Vec<Borehole>, DomainError>;

  async fn borehole(&self, id: i32) -> Result<Option<Borehole>, DomainError> {
    Ok(self.boreholes(BoreholeQuery::Ids(vec![id])).await?.into_iter().next())
  }

  /// Aplica una transición al historial de una perforación de forma
  /// atómica y devuelve las entradas completadas o creadas. Es la única vía
  /// de escritura de entradas de workflow fuera de `commit`.
  ///
  /// Devuelve `NotFound` si la perforación o la entrada pendiente no
  /// existen, e `Integrity` si la entrada indicada no está pendiente o su
  /// rol no coincide.
  async fn apply_workflow_transition(&self,
                                     borehole_id: i32,
                                     transition: WorkflowTransition)
                                     -> Result<Vec<WorkflowEntry>, DomainError>;

  /// Aplica la unidad de trabajo completa o nada. Referencias rotas o
  /// claves naturales repetidas devuelven `DomainError::Integrity`.
  async fn commit(&self, unit: UnitOfWork) -> Result<CommitReceipt, DomainError>;

  async fn insert_borehole(&self, borehole: NewBorehole) -> Result<i32, DomainError> {
    let mut unit = UnitOfWork::new();
    unit.add_borehole(borehole);
    let receipt = self.commit(unit).await?;
    receipt.borehole_ids
           .into_iter()
           .next()
           .ok_or_else(|| DomainError::External("commit sin id de perforación".into()))
  }
}
