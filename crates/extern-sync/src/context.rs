use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::matcher::DuplicateMatcher;
use registry_domain::{Borehole, RegistryStore};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Contexto compartido por las tareas de una corrida: handles a ambos
/// stores y el comparador de duplicados.
///
/// El store de origen sólo se lee. El conjunto de perforaciones publicadas
/// se lee una vez y todas las tareas trabajan sobre esa misma foto, aunque
/// el origen cambie durante la corrida; cada corrida usa un contexto nuevo.
pub struct SyncContext {
  pub source: Arc<dyn RegistryStore>,
  pub target: Arc<dyn RegistryStore>,
  pub matcher: DuplicateMatcher,
  published: OnceCell<Vec<Borehole>>,
}

impl SyncContext {
  pub fn new(source: Arc<dyn RegistryStore>, target: Arc<dyn RegistryStore>) -> Self {
    Self { source, target, matcher: DuplicateMatcher::default(), published: OnceCell::new() }
  }

  pub fn from_config(source: Arc<dyn RegistryStore>, target: Arc<dyn RegistryStore>, config: &SyncConfig) -> Self {
    Self { source,
           target,
           matcher: DuplicateMatcher::with_tolerance(config.coordinate_tolerance),
           published: OnceCell::new() }
  }

  /// Perforaciones publicadas del origen (predicado evaluado por el store).
  /// La primera llamada fija la foto para el resto de la corrida.
  pub async fn published_source_boreholes(&self) -> Result<&[Borehole], SyncError> {
    let published = self.published
                        .get_or_try_init(|| async {
                          publication::select_published(self.source.as_ref()).await.map_err(SyncError::from)
                        })
                        .await?;
    Ok(published.as_slice())
  }
}

/// Corta la tarea con `SyncError::Cancelled` si se pidió cancelación.
pub fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), SyncError> {
  if cancel.is_cancelled() {
    Err(SyncError::Cancelled)
  } else {
    Ok(())
  }
}
