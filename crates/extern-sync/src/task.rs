use crate::errors::SyncError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Resultado de ejecutar una tarea de sincronización.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task: String,
    pub inserted: usize,
    /// Registros elegibles que ya existían en destino.
    pub skipped: usize,
    /// Filas de la categoría en destino antes de escribir.
    pub baseline: usize,
    pub inserted_ids: Vec<i32>,
    /// Claves naturales que el destino debe contener tras la tarea.
    pub natural_keys: Vec<String>,
}

impl TaskReport {
    pub fn new(task: &str) -> Self {
        TaskReport { task: task.to_string(), ..Default::default() }
    }
}

/// Trait que representa una tarea del pipeline de sincronización.
///
/// Cada tarea migra una categoría de entidades del store de origen al de
/// destino y escribe su unidad de trabajo de forma atómica.
#[async_trait]
pub trait SyncTask: Send + Sync {
    /// Nombre o identificador de la tarea
    fn name(&self) -> &str;

    /// Ejecuta la migración y devuelve lo insertado.
    async fn execute(&self, cancel: &CancellationToken) -> Result<TaskReport, SyncError>;

    /// Verificación posterior a la escritura. Debe devolver
    /// `SyncError::Validation` si el destino no quedó como se esperaba.
    async fn validate(&self, _report: &TaskReport) -> Result<(), SyncError> {
        Ok(())
    }

    async fn execute_and_validate(&self, cancel: &CancellationToken) -> Result<TaskReport, SyncError> {
        let report = self.execute(cancel).await?;
        self.validate(&report).await?;
        Ok(report)
    }
}
