pub mod boreholes;
pub mod users;
pub mod workgroups;

pub use boreholes::SyncBoreholesTask;
pub use users::SyncUsersTask;
pub use workgroups::SyncWorkgroupsTask;

use crate::context::SyncContext;
use crate::task::SyncTask;
use std::sync::Arc;

/// Pipeline por defecto en orden de dependencias de claves foráneas:
/// usuarios, grupos de trabajo y perforaciones con sus hijos.
pub fn default_pipeline(ctx: Arc<SyncContext>) -> Vec<Box<dyn SyncTask>> {
  vec![Box::new(SyncUsersTask::new(ctx.clone())),
       Box::new(SyncWorkgroupsTask::new(ctx.clone())),
       Box::new(SyncBoreholesTask::new(ctx))]
}
