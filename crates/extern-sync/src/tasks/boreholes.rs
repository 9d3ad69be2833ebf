// boreholes.rs
//
// Copia perforaciones publicadas y sus hijos al destino. Las referencias a
// usuarios y grupos se traducen por clave natural (`subject_id`, `name`)
// porque los ids de ambos stores son independientes.
use crate::context::{ensure_not_cancelled, SyncContext};
use crate::errors::SyncError;
use crate::task::{SyncTask, TaskReport};
use async_trait::async_trait;
use log::debug;
use registry_domain::{Borehole, BoreholeQuery, NewBorehole, NewStratigraphy, NewWorkflowEntry, UnitOfWork};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Mapa id de origen -> id de destino para una categoría.
struct IdRemap {
  label: &'static str,
  ids: HashMap<i32, i32>,
}

impl IdRemap {
  /// Cruza `source` (id, clave) con `target` (clave, id).
  fn build(label: &'static str, source: impl IntoIterator<Item = (i32, String)>, target: HashMap<String, i32>) -> Self {
    let ids = source.into_iter().filter_map(|(id, key)| target.get(&key).map(|t| (id, *t))).collect();
    IdRemap { label, ids }
  }

  fn map(&self, borehole_id: i32, id: Option<i32>) -> Result<Option<i32>, SyncError> {
    match id {
      None => Ok(None),
      Some(src) => self.ids.get(&src).copied().map(Some).ok_or_else(|| {
                     SyncError::Validation(format!("{} {} de la perforación {} no tiene correspondencia en destino; \
                                                    la tarea de {} debe ejecutarse antes",
                                                   self.label, src, borehole_id, self.label))
                   }),
    }
  }
}

/// Copia perforaciones publicadas que no tienen duplicado en destino, con
/// su historial de workflow y estratigrafías, en una sola unidad de trabajo.
pub struct SyncBoreholesTask {
  ctx: Arc<SyncContext>,
}

impl SyncBoreholesTask {
  pub fn new(ctx: Arc<SyncContext>) -> Self {
    Self { ctx }
  }

  fn remap(b: &Borehole, users: &IdRemap, groups: &IdRemap) -> Result<NewBorehole, SyncError> {
    let workflows = b.workflows
                     .iter()
                     .map(|w| -> Result<NewWorkflowEntry, SyncError> {
                       Ok(NewWorkflowEntry { user_id: users.map(b.id, w.user_id)?, ..NewWorkflowEntry::from(w) })
                     })
                     .collect::<Result<Vec<_>, _>>()?;
    Ok(NewBorehole { name: b.name.clone(),
                     workgroup_id: groups.map(b.id, b.workgroup_id)?,
                     created_by_id: users.map(b.id, b.created_by_id)?,
                     updated_by_id: users.map(b.id, b.updated_by_id)?,
                     total_depth: b.total_depth,
                     location_x: b.location_x,
                     location_y: b.location_y,
                     location_x_lv03: b.location_x_lv03,
                     location_y_lv03: b.location_y_lv03,
                     workflows,
                     stratigraphies: b.stratigraphies.iter().map(NewStratigraphy::from).collect() })
  }

  async fn build_remaps(&self) -> Result<(IdRemap, IdRemap), SyncError> {
    let source_users = self.ctx.source.users().await?;
    let target_users = self.ctx.target.users().await?;
    let users = IdRemap::build("usuario",
                               source_users.into_iter().map(|u| (u.id, u.subject_id)),
                               target_users.into_iter().map(|u| (u.subject_id, u.id)).collect());
    let source_groups = self.ctx.source.workgroups().await?;
    let target_groups = self.ctx.target.workgroups().await?;
    let groups = IdRemap::build("grupo",
                                source_groups.into_iter().map(|w| (w.id, w.name)),
                                target_groups.into_iter().map(|w| (w.name, w.id)).collect());
    Ok((users, groups))
  }
}

#[async_trait]
impl SyncTask for SyncBoreholesTask {
  fn name(&self) -> &str {
    "boreholes"
  }

  async fn execute(&self, cancel: &CancellationToken) -> Result<TaskReport, SyncError> {
    ensure_not_cancelled(cancel)?;
    let published = self.ctx.published_source_boreholes().await?;
    let existing = self.ctx.target.boreholes(BoreholeQuery::All).await?;
    let candidates = self.ctx.matcher.remove_duplicates(published, &existing);
    debug!("boreholes: {} publicadas, {} duplicadas en destino", published.len(), published.len() - candidates.len());

    let mut report = TaskReport::new(self.name());
    report.baseline = existing.len();
    report.skipped = published.len() - candidates.len();
    if candidates.is_empty() {
      return Ok(report);
    }

    let (users, groups) = self.build_remaps().await?;
    let mut unit = UnitOfWork::new();
    for b in &candidates {
      unit.add_borehole(Self::remap(b, &users, &groups)?);
    }

    ensure_not_cancelled(cancel)?;
    let receipt = self.ctx.target.commit(unit).await?;
    report.inserted = receipt.borehole_ids.len();
    report.inserted_ids = receipt.borehole_ids;
    Ok(report)
  }

  async fn validate(&self, report: &TaskReport) -> Result<(), SyncError> {
    let all = self.ctx.target.boreholes(BoreholeQuery::All).await?;
    if all.len() != report.baseline + report.inserted {
      return Err(SyncError::Validation(format!("boreholes: se esperaban {} filas en destino, hay {}",
                                               report.baseline + report.inserted,
                                               all.len())));
    }
    let inserted: Vec<&Borehole> = all.iter().filter(|b| report.inserted_ids.contains(&b.id)).collect();
    if inserted.len() != report.inserted_ids.len() {
      return Err(SyncError::Validation(format!("boreholes: {} de {} insertadas no se encuentran en destino",
                                               report.inserted_ids.len() - inserted.len(),
                                               report.inserted_ids.len())));
    }
    if let Some(b) = inserted.iter().find(|b| !publication::is_published(b)) {
      return Err(SyncError::Validation(format!("boreholes: {} quedó sin publicar en destino", b.id)));
    }
    Ok(())
  }
}
