use chrono::Utc;
use registry_domain::{
  BoreholeQuery, DomainError, InMemoryRegistryStore, NewBorehole, NewLayer, NewStratigraphy, NewUser, NewWorkflowEntry,
  NewWorkgroup, RegistryStore, Role, UnitOfWork, WorkflowTransition,
};

fn user(subject: &str) -> NewUser {
  NewUser { first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            name: format!("user-{}", subject),
            subject_id: subject.into() }
}

#[tokio::test]
async fn commit_assigns_ids_in_staging_order() {
  let store = InMemoryRegistryStore::new();
  let mut unit = UnitOfWork::new();
  unit.add_user(user("sub-a")).add_user(user("sub-b")).add_workgroup(NewWorkgroup { name: "geo".into() });
  assert_eq!(unit.len(), 3);

  let receipt = store.commit(unit).await.expect("commit");
  assert_eq!(receipt.user_ids, vec![1, 2]);
  assert_eq!(receipt.workgroup_ids, vec![1]);
  let users = store.users().await.unwrap();
  assert_eq!(users.iter().map(|u| u.subject_id.as_str()).collect::<Vec<_>>(), vec!["sub-a", "sub-b"]);
}

#[tokio::test]
async fn failed_commit_leaves_store_unchanged() {
  let store = InMemoryRegistryStore::new();
  let mut seed = UnitOfWork::new();
  seed.add_user(user("sub-a"));
  store.commit(seed).await.unwrap();

  // the second borehole references a user id that does not exist
  let mut unit = UnitOfWork::new();
  unit.add_user(user("sub-b"))
      .add_borehole(NewBorehole { created_by_id: Some(1), ..Default::default() })
      .add_borehole(NewBorehole { created_by_id: Some(42), ..Default::default() });
  match store.commit(unit).await {
    Err(DomainError::Integrity(_)) => {}
    other => panic!("expected integrity error, got {:?}", other),
  }
  assert_eq!(store.users().await.unwrap().len(), 1);
  assert!(store.boreholes(BoreholeQuery::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_subject_id_is_rejected() {
  let store = InMemoryRegistryStore::new();
  let mut unit = UnitOfWork::new();
  unit.add_user(user("same")).add_user(user("same"));
  assert!(matches!(store.commit(unit).await, Err(DomainError::Integrity(_))));
  assert!(store.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn nested_children_receive_parent_ids() {
  let store = InMemoryRegistryStore::new();
  let id = store.insert_borehole(NewBorehole { name: Some("BH-1".into()),
                                               stratigraphies: vec![NewStratigraphy { name: Some("main".into()),
                                                                                      is_primary: true,
                                                                                      layers: vec![NewLayer::default(),
                                                                                                   NewLayer::default()] }],
                                               workflows: vec![NewWorkflowEntry::pending(Role::Editor)],
                                               ..Default::default() })
                .await
                .expect("insert");
  let b = store.borehole(id).await.unwrap().expect("borehole exists");
  assert_eq!(b.workflows.len(), 1);
  assert_eq!(b.workflows[0].borehole_id, id);
  let strat = &b.stratigraphies[0];
  assert_eq!(strat.borehole_id, id);
  assert!(strat.layers.iter().all(|l| l.stratigraphy_id == strat.id));
  assert_eq!(strat.layers.len(), 2);
}

#[tokio::test]
async fn transition_requires_existing_borehole() {
  let store = InMemoryRegistryStore::new();
  let t = WorkflowTransition { pending_entry_id: None, completed: NewWorkflowEntry::pending(Role::Editor), next: None };
  let missing = store.apply_workflow_transition(7, t).await;
  assert!(matches!(missing, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn transition_completes_pending_entry_in_place() {
  let store = InMemoryRegistryStore::new();
  let mut seed = UnitOfWork::new();
  seed.add_user(user("actor"));
  store.commit(seed).await.unwrap();
  let id = store.insert_borehole(NewBorehole { workflows: vec![NewWorkflowEntry::pending(Role::Editor)],
                                               ..Default::default() })
                .await
                .unwrap();
  let pending_id = store.borehole(id).await.unwrap().unwrap().workflows[0].id;

  let now = Utc::now();
  let touched = store.apply_workflow_transition(id,
                                                WorkflowTransition { pending_entry_id: Some(pending_id),
                                                                     completed: NewWorkflowEntry::completed(Role::Editor, 1, now),
                                                                     next: Some(NewWorkflowEntry::pending(Role::Controller)) })
                     .await
                     .expect("transition");
  assert_eq!(touched.len(), 2);
  assert_eq!(touched[0].id, pending_id);
  assert!(touched[0].is_completed());
  assert!(touched[1].id > pending_id);

  let b = store.borehole(id).await.unwrap().unwrap();
  assert_eq!(b.workflows.len(), 2);
  assert_eq!(b.latest_workflow().map(|e| e.role), Some(Role::Controller));

  // a completed entry can no longer be completed again
  let again = store.apply_workflow_transition(id,
                                              WorkflowTransition { pending_entry_id: Some(pending_id),
                                                                   completed: NewWorkflowEntry::completed(Role::Editor, 1, now),
                                                                   next: None })
                   .await;
  assert!(matches!(again, Err(DomainError::Integrity(_))));
  assert_eq!(store.borehole(id).await.unwrap().unwrap().workflows.len(), 2);
}

#[tokio::test]
async fn published_query_uses_latest_entry() {
  let store = InMemoryRegistryStore::new();
  let mut seed = UnitOfWork::new();
  seed.add_user(user("pub"));
  store.commit(seed).await.unwrap();

  let now = Utc::now();
  let published = store.insert_borehole(NewBorehole { workflows: vec![NewWorkflowEntry::completed(Role::Publisher, 1, now)],
                                                      ..Default::default() })
                       .await
                       .unwrap();
  let reopened = store.insert_borehole(NewBorehole { workflows: vec![NewWorkflowEntry::completed(Role::Publisher, 1, now),
                                                                     NewWorkflowEntry::pending(Role::Editor)],
                                                     ..Default::default() })
                      .await
                      .unwrap();

  let selected = store.boreholes(BoreholeQuery::Published).await.unwrap();
  let ids: Vec<i32> = selected.iter().map(|b| b.id).collect();
  assert_eq!(ids, vec![published]);
  assert!(!ids.contains(&reopened));
}
