// Archivo: rules.rs
// Propósito: funciones puras sobre historiales ya cargados y la consulta
// en bloque de perforaciones publicadas.
use crate::errors::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use registry_domain::{history, Borehole, BoreholeQuery, NewWorkflowEntry, RegistryStore, Role, WorkflowTransition};
use serde::{Deserialize, Serialize};

/// Estado derivado de una perforación. Nunca se almacena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationStatus {
    /// Rol de la entrada más reciente; `None` sin historial.
    pub current_stage: Option<Role>,
    /// La entrada más reciente espera la acción de un actor.
    pub pending: bool,
    pub published: bool,
}

/// `true` sii la entrada más reciente (por id) es un `Publisher` con
/// `finished_at`.
pub fn is_published(borehole: &Borehole) -> bool {
    history::is_published(&borehole.workflows)
}

/// Variante de `is_published` para búsquedas opcionales: `None` falla con
/// `MissingBorehole` antes de evaluar.
pub fn check_published(borehole: Option<&Borehole>) -> Result<bool> {
    let borehole = borehole.ok_or(WorkflowError::MissingBorehole)?;
    Ok(is_published(borehole))
}

/// Filtro en memoria equivalente a `BoreholeQuery::Published`.
pub fn filter_published<'a, I>(boreholes: I) -> Vec<&'a Borehole>
    where I: IntoIterator<Item = &'a Borehole>
{
    boreholes.into_iter().filter(|b| is_published(b)).collect()
}

pub fn status(borehole: &Borehole) -> PublicationStatus {
    let latest = borehole.latest_workflow();
    PublicationStatus { current_stage: latest.map(|e| e.role),
                        pending: latest.is_some_and(|e| e.is_pending()),
                        published: is_published(borehole) }
}

/// Selecciona las perforaciones publicadas delegando el predicado al store
/// (en SQL para stores relacionales).
pub async fn select_published(store: &dyn RegistryStore) -> Result<Vec<Borehole>> {
    Ok(store.boreholes(BoreholeQuery::Published).await?)
}

/// Construye la transición que lleva `borehole` a `target`.
///
/// Si la entrada más reciente es la etapa `target` pendiente, se completa
/// en su lugar; en otro caso se crea una entrada completada nueva. Salvo
/// para `Publisher`, se abre además la siguiente etapa como pendiente.
pub fn plan_transition(borehole: &Borehole, target: Role, user_id: i32, at: DateTime<Utc>) -> Result<WorkflowTransition> {
    if !target.is_stage() {
        return Err(WorkflowError::UnsupportedTransition(target));
    }
    let pending_entry_id = borehole.latest_workflow()
                                   .filter(|e| e.is_pending() && e.role == target)
                                   .map(|e| e.id);
    Ok(WorkflowTransition { pending_entry_id,
                            completed: NewWorkflowEntry::completed(target, user_id, at),
                            next: target.next().map(NewWorkflowEntry::pending) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_domain::WorkflowEntry;

    fn borehole(entries: &[(i32, Role, bool)]) -> Borehole {
        let at = Utc::now();
        let workflows = entries.iter()
                               .map(|(id, role, done)| WorkflowEntry { id: *id,
                                                                      role: *role,
                                                                      started_at: done.then_some(at),
                                                                      finished_at: done.then_some(at),
                                                                      user_id: done.then_some(1),
                                                                      borehole_id: 1 })
                               .collect();
        Borehole { id: 1, workflows, ..Default::default() }
    }

    #[test]
    fn plan_for_view_is_rejected() {
        let b = borehole(&[]);
        assert!(matches!(plan_transition(&b, Role::View, 1, Utc::now()),
                         Err(WorkflowError::UnsupportedTransition(Role::View))));
    }

    #[test]
    fn plan_completes_matching_pending_entry() {
        let b = borehole(&[(1, Role::Editor, true), (2, Role::Controller, false)]);
        let t = plan_transition(&b, Role::Controller, 5, Utc::now()).unwrap();
        assert_eq!(t.pending_entry_id, Some(2));
        assert_eq!(t.next.map(|n| n.role), Some(Role::Validator));
    }

    #[test]
    fn plan_creates_entry_when_pending_role_differs() {
        let b = borehole(&[(1, Role::Editor, true), (2, Role::Controller, false)]);
        let t = plan_transition(&b, Role::Publisher, 5, Utc::now()).unwrap();
        assert_eq!(t.pending_entry_id, None);
        assert!(t.next.is_none());
        assert_eq!(t.completed.user_id, Some(5));
    }

    #[test]
    fn status_is_derived_from_latest_entry() {
        let b = borehole(&[(1, Role::Validator, true), (2, Role::Publisher, false)]);
        let s = status(&b);
        assert_eq!(s.current_stage, Some(Role::Publisher));
        assert!(s.pending);
        assert!(!s.published);

        let empty = status(&borehole(&[]));
        assert_eq!(empty, PublicationStatus { current_stage: None, pending: false, published: false });
    }

    #[test]
    fn check_published_rejects_missing_borehole() {
        assert!(matches!(check_published(None), Err(WorkflowError::MissingBorehole)));
        let published = borehole(&[(4, Role::Publisher, true)]);
        assert!(check_published(Some(&published)).unwrap());
    }

    #[test]
    fn filter_keeps_only_published() {
        let a = borehole(&[(1, Role::Publisher, true)]);
        let b = borehole(&[(1, Role::Publisher, true), (2, Role::Editor, false)]);
        let all = [a.clone(), b];
        let kept = filter_published(all.iter());
        assert_eq!(kept, vec![&a]);
    }
}
