use crate::context::{ensure_not_cancelled, SyncContext};
use crate::errors::SyncError;
use crate::task::{SyncTask, TaskReport};
use async_trait::async_trait;
use log::debug;
use registry_domain::{NewUser, UnitOfWork};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Copia los usuarios referenciados por perforaciones publicadas cuyo
/// `subject_id` aún no existe en destino.
pub struct SyncUsersTask {
  ctx: Arc<SyncContext>,
}

impl SyncUsersTask {
  pub fn new(ctx: Arc<SyncContext>) -> Self {
    Self { ctx }
  }
}

#[async_trait]
impl SyncTask for SyncUsersTask {
  fn name(&self) -> &str {
    "users"
  }

  async fn execute(&self, cancel: &CancellationToken) -> Result<TaskReport, SyncError> {
    ensure_not_cancelled(cancel)?;
    let published = self.ctx.published_source_boreholes().await?;
    let referenced: BTreeSet<i32> = published.iter().flat_map(|b| b.referenced_user_ids()).collect();
    let source_users: HashMap<i32, _> = self.ctx.source.users().await?.into_iter().map(|u| (u.id, u)).collect();
    let target_users = self.ctx.target.users().await?;
    let known: HashSet<&str> = target_users.iter().map(|u| u.subject_id.as_str()).collect();

    let mut report = TaskReport::new(self.name());
    report.baseline = target_users.len();
    let mut unit = UnitOfWork::new();
    for id in &referenced {
      let user = source_users.get(id)
                             .ok_or_else(|| SyncError::Validation(format!("usuario {} referenciado en origen no existe", id)))?;
      report.natural_keys.push(user.subject_id.clone());
      if known.contains(user.subject_id.as_str()) {
        report.skipped += 1;
      } else {
        unit.add_user(NewUser::from(user));
      }
    }
    debug!("users: {} referenciados, {} ya presentes en destino", referenced.len(), report.skipped);

    ensure_not_cancelled(cancel)?;
    if !unit.is_empty() {
      let receipt = self.ctx.target.commit(unit).await?;
      report.inserted = receipt.user_ids.len();
      report.inserted_ids = receipt.user_ids;
    }
    Ok(report)
  }

  async fn validate(&self, report: &TaskReport) -> Result<(), SyncError> {
    let users = self.ctx.target.users().await?;
    if users.len() != report.baseline + report.inserted {
      return Err(SyncError::Validation(format!("users: se esperaban {} filas en destino, hay {}",
                                               report.baseline + report.inserted,
                                               users.len())));
    }
    for key in &report.natural_keys {
      let count = users.iter().filter(|u| &u.subject_id == key).count();
      if count != 1 {
        return Err(SyncError::Validation(format!("users: subject_id {} aparece {} veces en destino", key, count)));
      }
    }
    Ok(())
  }
}
