use crate::context::{ensure_not_cancelled, SyncContext};
use crate::errors::SyncError;
use crate::task::{SyncTask, TaskReport};
use async_trait::async_trait;
use log::debug;
use registry_domain::{NewWorkgroup, UnitOfWork};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Copia los grupos de trabajo dueños de perforaciones publicadas; la clave
/// natural es `name`.
pub struct SyncWorkgroupsTask {
  ctx: Arc<SyncContext>,
}

impl SyncWorkgroupsTask {
  pub fn new(ctx: Arc<SyncContext>) -> Self {
    Self { ctx }
  }
}

#[async_trait]
impl SyncTask for SyncWorkgroupsTask {
  fn name(&self) -> &str {
    "workgroups"
  }

  async fn execute(&self, cancel: &CancellationToken) -> Result<TaskReport, SyncError> {
    ensure_not_cancelled(cancel)?;
    let published = self.ctx.published_source_boreholes().await?;
    let referenced: BTreeSet<i32> = published.iter().filter_map(|b| b.workgroup_id).collect();
    let source_groups: HashMap<i32, String> =
      self.ctx.source.workgroups().await?.into_iter().map(|w| (w.id, w.name)).collect();
    let target_groups = self.ctx.target.workgroups().await?;
    let known: HashSet<&str> = target_groups.iter().map(|w| w.name.as_str()).collect();

    let mut report = TaskReport::new(self.name());
    report.baseline = target_groups.len();
    let mut unit = UnitOfWork::new();
    for id in &referenced {
      let name = source_groups.get(id)
                              .ok_or_else(|| SyncError::Validation(format!("grupo {} referenciado en origen no existe", id)))?;
      report.natural_keys.push(name.clone());
      if known.contains(name.as_str()) {
        report.skipped += 1;
      } else {
        unit.add_workgroup(NewWorkgroup { name: name.clone() });
      }
    }
    debug!("workgroups: {} referenciados, {} ya presentes en destino", referenced.len(), report.skipped);

    ensure_not_cancelled(cancel)?;
    if !unit.is_empty() {
      let receipt = self.ctx.target.commit(unit).await?;
      report.inserted = receipt.workgroup_ids.len();
      report.inserted_ids = receipt.workgroup_ids;
    }
    Ok(report)
  }

  async fn validate(&self, report: &TaskReport) -> Result<(), SyncError> {
    let groups = self.ctx.target.workgroups().await?;
    if groups.len() != report.baseline + report.inserted {
      return Err(SyncError::Validation(format!("workgroups: se esperaban {} filas en destino, hay {}",
                                               report.baseline + report.inserted,
                                               groups.len())));
    }
    for key in &report.natural_keys {
      let count = groups.iter().filter(|w| &w.name == key).count();
      if count != 1 {
        return Err(SyncError::Validation(format!("workgroups: {} aparece {} veces en destino", key, count)));
      }
    }
    Ok(())
  }
}
