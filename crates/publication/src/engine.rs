// Archivo: engine.rs
// Propósito: implementar `PublicationWorkflow`, la máquina de estados por
// perforación que registra la cadena de aprobación
// Editor -> Controller -> Validator -> Publisher.
//
// El estado nunca se almacena como flag: se deriva del historial de
// `WorkflowEntry`. `advance` es la única vía de escritura de ese historial.
use crate::errors::{Result, WorkflowError};
use crate::rules::{self, PublicationStatus};
use dashmap::DashMap;
use log::debug;
use registry_domain::{Borehole, Clock, RegistryStore, Role, SystemClock};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

/// Workflow de publicación sobre un `RegistryStore` inyectado.
///
/// Responsabilidades principales:
/// - Avanzar una perforación a una etapa (`advance`)
/// - Evaluar el estado de publicación a partir del historial
/// - Seleccionar en bloque las perforaciones publicadas
///
/// Nota sobre concurrencia: los avances de una misma perforación se
/// serializan con un guard asíncrono por id; perforaciones distintas
/// avanzan en paralelo.
pub struct PublicationWorkflow {
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    guards: DashMap<i32, Arc<AsyncMutex<()>>>,
}

impl PublicationWorkflow {
    /// Crea el workflow con el reloj del sistema.
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Crea el workflow con un reloj explícito (pruebas).
    pub fn with_clock(store: Arc<dyn RegistryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, guards: DashMap::new() }
    }

    fn guard_for(&self, borehole_id: i32) -> Arc<AsyncMutex<()>> {
        self.guards.entry(borehole_id).or_default().value().clone()
    }

    /// Avanza `borehole_id` a la etapa `target` en nombre de `user_id`.
    ///
    /// Input:
    /// - `target`: `Editor`, `Controller`, `Validator` o `Publisher`. Otro
    ///   valor falla con `UnsupportedTransition`.
    /// - `cancel`: se observa antes de tomar el guard y antes de escribir.
    ///
    /// Output:
    /// - La perforación con su historial refrescado. Tras la etapa queda
    ///   una entrada completada (sellada con el reloj para `started_at` y
    ///   `finished_at`) y, salvo para `Publisher`, una entrada pendiente de la
    ///   etapa siguiente sin usuario.
    pub async fn advance(&self,
                         borehole_id: i32,
                         user_id: i32,
                         target: Role,
                         cancel: &CancellationToken)
                         -> Result<Borehole> {
        if !target.is_stage() {
            return Err(WorkflowError::UnsupportedTransition(target));
        }
        if cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }

        let guard = self.guard_for(borehole_id);
        let result = self.advance_guarded(&guard, borehole_id, user_id, target, cancel).await;
        drop(guard);
        // Sin otros avances esperando, el guard sale del mapa.
        self.guards.remove_if(&borehole_id, |_, g| Arc::strong_count(g) == 1);
        result
    }

    async fn advance_guarded(&self,
                             guard: &AsyncMutex<()>,
                             borehole_id: i32,
                             user_id: i32,
                             target: Role,
                             cancel: &CancellationToken)
                             -> Result<Borehole> {
        let _held = tokio::select! {
            held = guard.lock() => held,
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
        };

        let current = self.store
                          .borehole(borehole_id)
                          .await?
                          .ok_or(WorkflowError::BoreholeNotFound(borehole_id))?;
        let transition = rules::plan_transition(&current, target, user_id, self.clock.now())?;
        if cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }

        debug!("advance borehole={} user={} role={} completes_pending={:?}",
               borehole_id,
               user_id,
               target,
               transition.pending_entry_id);
        self.store.apply_workflow_transition(borehole_id, transition).await?;

        self.store
            .borehole(borehole_id)
            .await?
            .ok_or(WorkflowError::BoreholeNotFound(borehole_id))
    }

    /// Evaluación pura sobre un historial ya cargado.
    pub fn is_published(&self, borehole: &Borehole) -> bool {
        rules::is_published(borehole)
    }

    /// Carga la perforación y evalúa su estado de publicación.
    pub async fn is_published_by_id(&self, borehole_id: i32) -> Result<bool> {
        let borehole = self.store.borehole(borehole_id).await?;
        match borehole {
            Some(b) => Ok(rules::is_published(&b)),
            None => Err(WorkflowError::BoreholeNotFound(borehole_id)),
        }
    }

    pub fn status(&self, borehole: &Borehole) -> PublicationStatus {
        rules::status(borehole)
    }

    /// Perforaciones publicadas del store de este workflow.
    pub async fn select_published(&self) -> Result<Vec<Borehole>> {
        rules::select_published(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_domain::{InMemoryRegistryStore, NewBorehole, NewUser, UnitOfWork};

    #[tokio::test]
    async fn guards_are_released_after_advancing() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let mut unit = UnitOfWork::new();
        unit.add_user(NewUser { first_name: "a".into(), last_name: "b".into(), name: "ab".into(), subject_id: "s".into() });
        store.commit(unit).await.unwrap();
        let id = store.insert_borehole(NewBorehole::default()).await.unwrap();
        let workflow = PublicationWorkflow::new(store.clone());
        let cancel = CancellationToken::new();

        workflow.advance(id, 1, Role::Editor, &cancel).await.unwrap();
        assert!(workflow.guards.is_empty());

        // un avance fallido tampoco deja el guard en el mapa
        assert!(workflow.advance(id + 1, 1, Role::Editor, &cancel).await.is_err());
        assert!(workflow.guards.is_empty());

        let (a, b) = tokio::join!(workflow.advance(id, 1, Role::Controller, &cancel),
                                  workflow.advance(id, 1, Role::Validator, &cancel));
        assert!(a.is_ok() && b.is_ok());
        assert!(workflow.guards.is_empty());
    }
}
