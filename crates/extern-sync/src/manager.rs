// manager.rs
//
// Orquestador del pipeline: ejecuta las tareas en el orden dado, valida cada
// una y aborta en el primer fallo devolviendo el error original.
use crate::errors::SyncError;
use crate::task::{SyncTask, TaskReport};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Estado del pipeline sobre la lista fija de tareas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
  Pending,
  Running(usize),
  Succeeded,
  Failed(usize),
}

#[derive(Debug)]
struct RunState {
  run_id: Option<Uuid>,
  state: PipelineState,
  reports: Vec<TaskReport>,
}

/// Ejecutor secuencial y fail-fast de tareas de sincronización.
///
/// No reintenta ni recupera: un fallo detiene el pipeline y se devuelve tal
/// cual al llamador. Las tareas ya completadas no se deshacen.
pub struct SyncTaskManager {
  run: Mutex<RunState>,
}

impl Default for SyncTaskManager {
  fn default() -> Self {
    Self::new()
  }
}

impl SyncTaskManager {
  pub fn new() -> Self {
    SyncTaskManager { run: Mutex::new(RunState { run_id: None, state: PipelineState::Pending, reports: Vec::new() }) }
  }

  fn with_run<T>(&self, f: impl FnOnce(&mut RunState) -> T) -> T {
    let mut guard = self.run.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
  }

  pub fn state(&self) -> PipelineState {
    self.with_run(|r| r.state)
  }

  /// Id de la última corrida, para correlacionar logs.
  pub fn run_id(&self) -> Option<Uuid> {
    self.with_run(|r| r.run_id)
  }

  /// Reportes de las tareas completadas en la última corrida.
  pub fn reports(&self) -> Vec<TaskReport> {
    self.with_run(|r| r.reports.clone())
  }

  fn set_state(&self, state: PipelineState) {
    self.with_run(|r| r.state = state);
  }

  /// Ejecuta `tasks` en orden estricto. La cancelación se observa en cada
  /// frontera entre tareas y además se pasa a cada tarea.
  pub async fn execute_tasks(&self, tasks: &[Box<dyn SyncTask>], cancel: &CancellationToken) -> Result<(), SyncError> {
    let run_id = Uuid::new_v4();
    self.with_run(|r| {
          r.run_id = Some(run_id);
          r.state = PipelineState::Pending;
          r.reports.clear();
        });
    info!("sync run {}: iniciando {} tareas", run_id, tasks.len());

    for (index, task) in tasks.iter().enumerate() {
      if cancel.is_cancelled() {
        self.set_state(PipelineState::Failed(index));
        warn!("sync run {}: cancelado antes de la tarea {} ({})", run_id, index, task.name());
        return Err(SyncError::Cancelled);
      }
      self.set_state(PipelineState::Running(index));
      match task.execute_and_validate(cancel).await {
        Ok(report) => {
          info!("sync run {}: tarea {} ({}) completada: {} insertados, {} omitidos",
                run_id,
                index,
                task.name(),
                report.inserted,
                report.skipped);
          self.with_run(|r| r.reports.push(report));
        }
        Err(err) => {
          self.set_state(PipelineState::Failed(index));
          if matches!(err, SyncError::Cancelled) {
            warn!("sync run {}: tarea {} ({}) cancelada", run_id, index, task.name());
          } else {
            error!("sync run {}: tarea {} ({}) falló: {}", run_id, index, task.name(), err);
          }
          return Err(err);
        }
      }
    }

    self.set_state(PipelineState::Succeeded);
    info!("sync run {}: completado", run_id);
    Ok(())
  }
}
