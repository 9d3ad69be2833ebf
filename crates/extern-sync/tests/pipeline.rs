use extern_sync::{default_pipeline, SyncBoreholesTask, SyncContext, SyncError, SyncTask, SyncTaskManager};
use publication::PublicationWorkflow;
use registry_domain::{
  BoreholeQuery, InMemoryRegistryStore, NewBorehole, NewLayer, NewStratigraphy, NewUser, NewWorkgroup, RegistryStore,
  Role, UnitOfWork,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn user(subject: &str) -> NewUser {
  NewUser { first_name: subject.to_uppercase(),
            last_name: "Test".into(),
            name: subject.into(),
            subject_id: format!("sub-{}", subject) }
}

struct Fixture {
  source: Arc<InMemoryRegistryStore>,
  target: Arc<InMemoryRegistryStore>,
  published: i32,
  draft: i32,
}

// Origen: alice(1), bob(2), carol(3); grupos north(1), south(2).
// - bh "published": publicada, owner north, creada por alice.
// - bh "draft": sólo revisión de Editor por carol.
// - bh "twin": publicada, con un duplicado ya presente en destino.
// Destino: zed(1), yuri(2), bob(3); grupo "other"; una perforación gemela.
async fn fixture() -> Fixture {
  let source = Arc::new(InMemoryRegistryStore::new());
  let mut unit = UnitOfWork::new();
  unit.add_user(user("alice"))
      .add_user(user("bob"))
      .add_user(user("carol"))
      .add_workgroup(NewWorkgroup { name: "north".into() })
      .add_workgroup(NewWorkgroup { name: "south".into() });
  source.commit(unit).await.unwrap();

  let published = source.insert_borehole(NewBorehole { name: Some("BH-published".into()),
                                                       workgroup_id: Some(1),
                                                       created_by_id: Some(1),
                                                       updated_by_id: Some(2),
                                                       total_depth: Some(42.0),
                                                       location_x: Some(2600000.0),
                                                       location_y: Some(1200000.0),
                                                       location_x_lv03: Some(600000.0),
                                                       location_y_lv03: Some(200000.0),
                                                       stratigraphies: vec![NewStratigraphy { name: Some("main".into()),
                                                                                              is_primary: true,
                                                                                              layers: vec![NewLayer { from_depth: Some(0.0),
                                                                                                                      to_depth: Some(12.0),
                                                                                                                      description: Some("moraine".into()) },
                                                                                                           NewLayer { from_depth: Some(12.0),
                                                                                                                      to_depth: Some(42.0),
                                                                                                                      description: Some("molasse".into()) }] }],
                                                       ..Default::default() })
                        .await
                        .unwrap();
  let draft = source.insert_borehole(NewBorehole { name: Some("BH-draft".into()),
                                                   created_by_id: Some(3),
                                                   total_depth: Some(8.0),
                                                   location_x: Some(2610000.0),
                                                   location_y: Some(1210000.0),
                                                   ..Default::default() })
                    .await
                    .unwrap();
  let twin = source.insert_borehole(NewBorehole { name: Some("BH-twin".into()),
                                                  workgroup_id: Some(2),
                                                  created_by_id: Some(2),
                                                  total_depth: Some(15.0),
                                                  location_x: Some(2620000.0),
                                                  location_y: Some(1220000.0),
                                                  ..Default::default() })
                   .await
                   .unwrap();

  let workflow = PublicationWorkflow::new(source.clone());
  let cancel = CancellationToken::new();
  for (role, actor) in [(Role::Editor, 1), (Role::Controller, 2), (Role::Validator, 2), (Role::Publisher, 1)] {
    workflow.advance(published, actor, role, &cancel).await.unwrap();
    workflow.advance(twin, 2, role, &cancel).await.unwrap();
  }
  workflow.advance(draft, 3, Role::Editor, &cancel).await.unwrap();

  let target = Arc::new(InMemoryRegistryStore::new());
  let mut unit = UnitOfWork::new();
  unit.add_user(user("zed"))
      .add_user(user("yuri"))
      .add_user(user("bob"))
      .add_workgroup(NewWorkgroup { name: "other".into() })
      .add_borehole(NewBorehole { name: Some("already there".into()),
                                  total_depth: Some(15.0),
                                  location_x: Some(2620001.0),
                                  location_y: Some(1219999.0),
                                  ..Default::default() });
  target.commit(unit).await.unwrap();

  Fixture { source, target, published, draft }
}

fn context(f: &Fixture) -> Arc<SyncContext> {
  Arc::new(SyncContext::new(f.source.clone(), f.target.clone()))
}

#[tokio::test]
async fn copies_published_boreholes_with_remapped_references() {
  let f = fixture().await;
  let source_before = f.source.boreholes(BoreholeQuery::All).await.unwrap();
  let manager = SyncTaskManager::new();
  manager.execute_tasks(&default_pipeline(context(&f)), &CancellationToken::new()).await.expect("sync");

  let reports = manager.reports();
  assert_eq!(reports.iter().map(|r| r.task.as_str()).collect::<Vec<_>>(), vec!["users", "workgroups", "boreholes"]);
  assert_eq!((reports[0].inserted, reports[0].skipped), (1, 1));
  assert_eq!(reports[1].inserted, 2);
  assert_eq!((reports[2].inserted, reports[2].skipped), (1, 1));

  // carol sólo aparece en una perforación no publicada
  let users = f.target.users().await.unwrap();
  assert_eq!(users.len(), 4);
  assert!(!users.iter().any(|u| u.subject_id == "sub-carol"));
  let alice = users.iter().find(|u| u.subject_id == "sub-alice").unwrap().id;
  let bob = users.iter().find(|u| u.subject_id == "sub-bob").unwrap().id;
  assert_eq!((alice, bob), (4, 3));
  let north = f.target.workgroups().await.unwrap().into_iter().find(|w| w.name == "north").unwrap().id;

  let copied = f.target.borehole(reports[2].inserted_ids[0]).await.unwrap().unwrap();
  assert_eq!(copied.name.as_deref(), Some("BH-published"));
  assert_eq!(copied.workgroup_id, Some(north));
  assert_eq!(copied.created_by_id, Some(alice));
  assert_eq!(copied.updated_by_id, Some(bob));
  assert!(copied.is_published());
  let actors: Vec<(Role, Option<i32>)> = copied.workflows.iter().map(|w| (w.role, w.user_id)).collect();
  assert_eq!(actors,
             vec![(Role::Editor, Some(alice)),
                  (Role::Controller, Some(bob)),
                  (Role::Validator, Some(bob)),
                  (Role::Publisher, Some(alice))]);
  let source_published = f.source.borehole(f.published).await.unwrap().unwrap();
  assert_eq!(copied.workflows.iter().map(|w| w.finished_at).collect::<Vec<_>>(),
             source_published.workflows.iter().map(|w| w.finished_at).collect::<Vec<_>>());
  assert_eq!(copied.stratigraphies[0].layers.len(), 2);
  assert_eq!(copied.stratigraphies[0].layers[1].description.as_deref(), Some("molasse"));

  let names: Vec<Option<String>> =
    f.target.boreholes(BoreholeQuery::All).await.unwrap().into_iter().map(|b| b.name).collect();
  assert!(!names.contains(&Some("BH-draft".into())));
  assert!(!names.contains(&Some("BH-twin".into())));
  assert_eq!(f.source.boreholes(BoreholeQuery::All).await.unwrap(), source_before);
}

#[tokio::test]
async fn rerunning_after_success_inserts_nothing() {
  let f = fixture().await;
  SyncTaskManager::new().execute_tasks(&default_pipeline(context(&f)), &CancellationToken::new()).await.unwrap();
  let count = f.target.boreholes(BoreholeQuery::All).await.unwrap().len();

  let manager = SyncTaskManager::new();
  manager.execute_tasks(&default_pipeline(context(&f)), &CancellationToken::new()).await.unwrap();
  assert!(manager.reports().iter().all(|r| r.inserted == 0));
  assert_eq!(f.target.boreholes(BoreholeQuery::All).await.unwrap().len(), count);
  assert_eq!(f.target.users().await.unwrap().len(), 4);
}

#[tokio::test]
async fn boreholes_without_prior_user_sync_fail_validation() {
  let f = fixture().await;
  let task = SyncBoreholesTask::new(context(&f));
  let before = f.target.boreholes(BoreholeQuery::All).await.unwrap().len();

  let err = task.execute_and_validate(&CancellationToken::new()).await.unwrap_err();
  assert!(matches!(err, SyncError::Validation(_)), "{:?}", err);
  assert_eq!(f.target.boreholes(BoreholeQuery::All).await.unwrap().len(), before);
}

#[tokio::test]
async fn cancelled_run_writes_nothing() {
  let f = fixture().await;
  let cancel = CancellationToken::new();
  cancel.cancel();
  let res = SyncTaskManager::new().execute_tasks(&default_pipeline(context(&f)), &cancel).await;
  assert!(matches!(res, Err(SyncError::Cancelled)));
  assert_eq!(f.target.users().await.unwrap().len(), 3);
  assert_eq!(f.target.boreholes(BoreholeQuery::All).await.unwrap().len(), 1);
}

#[tokio::test]
async fn publication_during_a_run_waits_for_the_next_run() {
  let f = fixture().await;
  let ctx = context(&f);
  let cancel = CancellationToken::new();
  let tasks = default_pipeline(ctx);
  tasks[0].execute_and_validate(&cancel).await.expect("users");

  // carol publica su perforación entre la tarea de usuarios y la de perforaciones
  let workflow = PublicationWorkflow::new(f.source.clone());
  for role in [Role::Controller, Role::Validator, Role::Publisher] {
    workflow.advance(f.draft, 3, role, &cancel).await.unwrap();
  }

  tasks[1].execute_and_validate(&cancel).await.expect("workgroups");
  let report = tasks[2].execute_and_validate(&cancel).await.expect("boreholes");
  assert_eq!(report.inserted, 1);
  assert!(!f.target.users().await.unwrap().iter().any(|u| u.subject_id == "sub-carol"));

  let manager = SyncTaskManager::new();
  manager.execute_tasks(&default_pipeline(context(&f)), &cancel).await.expect("next run");
  let reports = manager.reports();
  assert_eq!((reports[0].inserted, reports[2].inserted), (1, 1));
  let names: Vec<Option<String>> =
    f.target.boreholes(BoreholeQuery::All).await.unwrap().into_iter().map(|b| b.name).collect();
  assert!(names.contains(&Some("BH-draft".into())));
}
