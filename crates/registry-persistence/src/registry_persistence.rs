use crate::error::StoreError;
use crate::schema::{boreholes, layers, stratigraphies, users, workflows, workgroups};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::Error as DieselError;
use diesel::sql_types::{BigInt, Integer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info, warn};
use registry_domain::{
  Borehole, BoreholeQuery, CommitReceipt, DomainError, Layer, NewBorehole, NewUser, NewWorkflowEntry, NewWorkgroup,
  RegistryStore, Role, Stratigraphy, UnitOfWork, User, WorkflowEntry, WorkflowTransition, Workgroup,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Tamaño de pool por defecto.
pub const DEFAULT_POOL_SIZE: u32 = 4;

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Activa claves foráneas y espera de bloqueo en cada conexión del pool.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        .map_err(diesel::r2d2::Error::QueryError)
  }
}

/// Repo Diesel/SQLite que implementa `RegistryStore`.
///
/// Diesel es síncrono: cada operación corre en `spawn_blocking` con una
/// conexión del pool, y cada escritura en una transacción propia.
#[derive(Clone)]
pub struct DieselRegistryStore {
  pool: Arc<DbPool>,
}

impl DieselRegistryStore {
  /// Abre (o crea) la base y aplica las migraciones embebidas.
  pub fn open(database_url: &str) -> Result<Self, DomainError> {
    Self::with_options(database_url, DEFAULT_POOL_SIZE, true)
  }

  /// Abre una base existente en modo sólo lectura (URI `mode=ro`), sin
  /// migrar. Es el modo del store de origen: cualquier escritura falla en
  /// SQLite.
  pub fn open_read_only(database_url: &str, pool_size: u32) -> Result<Self, DomainError> {
    if !database_url.starts_with("file:") && !Path::new(database_url).exists() {
      return Err(DomainError::NotFound(format!("base de origen {}", database_url)));
    }
    Self::with_options(&read_only_uri(database_url), pool_size, false)
  }

  pub fn with_options(database_url: &str, pool_size: u32, run_migrations: bool) -> Result<Self, DomainError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(pool_size.max(1))
                              .connection_customizer(Box::new(SqlitePragmas))
                              .build(manager)
                              .map_err(|e| DomainError::External(format!("no se pudo crear el pool de conexiones: {}", e)))?;
    if run_migrations {
      let mut conn = pool.get().map_err(|e| DomainError::External(format!("pool: {}", e)))?;
      if let Err(e) = conn.batch_execute("PRAGMA journal_mode = WAL;") {
        warn!("no se pudo activar WAL en {}: {}", database_url, e);
      }
      let applied = conn.run_pending_migrations(MIGRATIONS)
                        .map_err(|e| DomainError::External(format!("migraciones: {}", e)))?;
      if !applied.is_empty() {
        info!("migraciones aplicadas en {}: {}", database_url, applied.len());
      }
    }
    Ok(DieselRegistryStore { pool: Arc::new(pool) })
  }

  async fn run<T, F>(&self, f: F) -> Result<T, DomainError>
    where T: Send + 'static,
          F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static
  {
    let pool = self.pool.clone();
    let joined = tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
                   let mut conn = pool.get()?;
                   f(&mut *conn)
                 }).await;
    match joined {
      Ok(res) => res.map_err(DomainError::from),
      Err(e) => Err(DomainError::External(format!("tarea bloqueante: {}", e))),
    }
  }
}

// Diesel row structs
#[derive(Debug, Queryable)]
struct UserRow {
  id: i32,
  subject_id: String,
  first_name: String,
  last_name: String,
  name: String,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUserRow<'a> {
  subject_id: &'a str,
  first_name: &'a str,
  last_name: &'a str,
  name: &'a str,
}

#[derive(Debug, Queryable)]
struct WorkgroupRow {
  id: i32,
  name: String,
}

#[derive(Insertable)]
#[diesel(table_name = workgroups)]
struct NewWorkgroupRow<'a> {
  name: &'a str,
}

#[derive(Debug, Queryable)]
struct BoreholeRow {
  id: i32,
  name: Option<String>,
  workgroup_id: Option<i32>,
  created_by_id: Option<i32>,
  updated_by_id: Option<i32>,
  total_depth: Option<f64>,
  location_x: Option<f64>,
  location_y: Option<f64>,
  location_x_lv03: Option<f64>,
  location_y_lv03: Option<f64>,
}

#[derive(Insertable)]
#[diesel(table_name = boreholes, treat_none_as_default_value = false)]
struct NewBoreholeRow<'a> {
  name: Option<&'a str>,
  workgroup_id: Option<i32>,
  created_by_id: Option<i32>,
  updated_by_id: Option<i32>,
  total_depth: Option<f64>,
  location_x: Option<f64>,
  location_y: Option<f64>,
  location_x_lv03: Option<f64>,
  location_y_lv03: Option<f64>,
}

#[derive(Debug, Queryable)]
struct WorkflowRow {
  id: i32,
  borehole_id: i32,
  user_id: Option<i32>,
  role: i32,
  started_at_ts: Option<i64>,
  finished_at_ts: Option<i64>,
}

#[derive(Insertable)]
#[diesel(table_name = workflows, treat_none_as_default_value = false)]
struct NewWorkflowRow {
  borehole_id: i32,
  user_id: Option<i32>,
  role: i32,
  started_at_ts: Option<i64>,
  finished_at_ts: Option<i64>,
}

#[derive(Debug, Queryable)]
struct StratigraphyRow {
  id: i32,
  borehole_id: i32,
  name: Option<String>,
  is_primary: bool,
}

#[derive(Insertable)]
#[diesel(table_name = stratigraphies, treat_none_as_default_value = false)]
struct NewStratigraphyRow<'a> {
  borehole_id: i32,
  name: Option<&'a str>,
  is_primary: bool,
}

#[derive(Debug, Queryable)]
struct LayerRow {
  id: i32,
  stratigraphy_id: i32,
  from_depth: Option<f64>,
  to_depth: Option<f64>,
  description: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = layers, treat_none_as_default_value = false)]
struct NewLayerRow<'a> {
  stratigraphy_id: i32,
  from_depth: Option<f64>,
  to_depth: Option<f64>,
  description: Option<&'a str>,
}

#[derive(QueryableByName)]
struct IdRow {
  #[diesel(sql_type = Integer)]
  id: i32,
}

// Entradas cuya id es la máxima de su perforación, con rol Publisher y
// terminadas.
const PUBLISHED_IDS_SQL: &str = "SELECT w.borehole_id AS id FROM workflows w \
                                 WHERE w.id = (SELECT MAX(w2.id) FROM workflows w2 WHERE w2.borehole_id = w.borehole_id) \
                                 AND w.role = ? AND w.finished_at_ts IS NOT NULL \
                                 ORDER BY w.borehole_id";

/// URI SQLite de sólo lectura para `database_url` (ruta o URI `file:`).
fn read_only_uri(database_url: &str) -> String {
  if database_url.starts_with("file:") {
    let sep = if database_url.contains('?') { '&' } else { '?' };
    format!("{}{}mode=ro", database_url, sep)
  } else {
    format!("file:{}?mode=ro", database_url)
  }
}

fn to_millis(at: Option<DateTime<Utc>>) -> Option<i64> {
  at.map(|t| t.timestamp_millis())
}

fn from_millis(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, DomainError> {
  match ms {
    None => Ok(None),
    Some(v) => Utc.timestamp_millis_opt(v)
                  .single()
                  .map(Some)
                  .ok_or_else(|| DomainError::Validation(format!("timestamp inválido: {}", v))),
  }
}

fn last_insert_id(conn: &mut SqliteConnection) -> Result<i32, StoreError> {
  let id = diesel::select(sql::<BigInt>("last_insert_rowid()")).get_result::<i64>(conn)?;
  i32::try_from(id).map_err(|e| StoreError::Db(DieselError::DeserializationError(Box::new(e))))
}

fn workflow_from_row(r: WorkflowRow) -> Result<WorkflowEntry, DomainError> {
  Ok(WorkflowEntry { id: r.id,
                     role: Role::try_from(r.role)?,
                     started_at: from_millis(r.started_at_ts)?,
                     finished_at: from_millis(r.finished_at_ts)?,
                     user_id: r.user_id,
                     borehole_id: r.borehole_id })
}

fn insert_user(conn: &mut SqliteConnection, u: &NewUser) -> Result<i32, StoreError> {
  diesel::insert_into(users::table).values(NewUserRow { subject_id: &u.subject_id,
                                                        first_name: &u.first_name,
                                                        last_name: &u.last_name,
                                                        name: &u.name })
                                   .execute(conn)?;
  last_insert_id(conn)
}

fn insert_workgroup(conn: &mut SqliteConnection, w: &NewWorkgroup) -> Result<i32, StoreError> {
  diesel::insert_into(workgroups::table).values(NewWorkgroupRow { name: &w.name }).execute(conn)?;
  last_insert_id(conn)
}

fn insert_workflow(conn: &mut SqliteConnection, borehole_id: i32, w: &NewWorkflowEntry) -> Result<i32, StoreError> {
  diesel::insert_into(workflows::table).values(NewWorkflowRow { borehole_id,
                                                                user_id: w.user_id,
                                                                role: w.role.ordinal(),
                                                                started_at_ts: to_millis(w.started_at),
                                                                finished_at_ts: to_millis(w.finished_at) })
                                       .execute(conn)?;
  last_insert_id(conn)
}

fn insert_borehole(conn: &mut SqliteConnection, b: &NewBorehole) -> Result<i32, StoreError> {
  diesel::insert_into(boreholes::table).values(NewBoreholeRow { name: b.name.as_deref(),
                                                                workgroup_id: b.workgroup_id,
                                                                created_by_id: b.created_by_id,
                                                                updated_by_id: b.updated_by_id,
                                                                total_depth: b.total_depth,
                                                                location_x: b.location_x,
                                                                location_y: b.location_y,
                                                                location_x_lv03: b.location_x_lv03,
                                                                location_y_lv03: b.location_y_lv03 })
                                       .execute(conn)?;
  let id = last_insert_id(conn)?;
  for w in &b.workflows {
    insert_workflow(conn, id, w)?;
  }
  for s in &b.stratigraphies {
    diesel::insert_into(stratigraphies::table).values(NewStratigraphyRow { borehole_id: id,
                                                                           name: s.name.as_deref(),
                                                                           is_primary: s.is_primary })
                                              .execute(conn)?;
    let sid = last_insert_id(conn)?;
    for l in &s.layers {
      diesel::insert_into(layers::table).values(NewLayerRow { stratigraphy_id: sid,
                                                              from_depth: l.from_depth,
                                                              to_depth: l.to_depth,
                                                              description: l.description.as_deref() })
                                        .execute(conn)?;
    }
  }
  Ok(id)
}

fn load_boreholes(conn: &mut SqliteConnection, query: &BoreholeQuery) -> Result<Vec<Borehole>, StoreError> {
  let rows: Vec<BoreholeRow> = match query {
    BoreholeQuery::All => boreholes::table.order(boreholes::id.asc()).load(conn)?,
    BoreholeQuery::Published => {
      let ids: Vec<i32> = diesel::sql_query(PUBLISHED_IDS_SQL).bind::<Integer, _>(Role::Publisher.ordinal())
                                                               .load::<IdRow>(conn)?
                                                               .into_iter()
                                                               .map(|r| r.id)
                                                               .collect();
      boreholes::table.filter(boreholes::id.eq_any(ids)).order(boreholes::id.asc()).load(conn)?
    }
    BoreholeQuery::Ids(ids) => {
      boreholes::table.filter(boreholes::id.eq_any(ids.clone())).order(boreholes::id.asc()).load(conn)?
    }
  };
  if rows.is_empty() {
    return Ok(Vec::new());
  }
  let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

  let mut history: HashMap<i32, Vec<WorkflowEntry>> = HashMap::new();
  let wf_rows: Vec<WorkflowRow> =
    workflows::table.filter(workflows::borehole_id.eq_any(ids.clone())).order(workflows::id.asc()).load(conn)?;
  for r in wf_rows {
    let entry = workflow_from_row(r)?;
    history.entry(entry.borehole_id).or_default().push(entry);
  }

  let strat_rows: Vec<StratigraphyRow> = stratigraphies::table.filter(stratigraphies::borehole_id.eq_any(ids))
                                                              .order(stratigraphies::id.asc())
                                                              .load(conn)?;
  let strat_ids: Vec<i32> = strat_rows.iter().map(|s| s.id).collect();
  let mut layers_by_strat: HashMap<i32, Vec<Layer>> = HashMap::new();
  let layer_rows: Vec<LayerRow> =
    layers::table.filter(layers::stratigraphy_id.eq_any(strat_ids)).order(layers::id.asc()).load(conn)?;
  for l in layer_rows {
    layers_by_strat.entry(l.stratigraphy_id).or_default().push(Layer { id: l.id,
                                                                      stratigraphy_id: l.stratigraphy_id,
                                                                      from_depth: l.from_depth,
                                                                      to_depth: l.to_depth,
                                                                      description: l.description });
  }
  let mut strats: HashMap<i32, Vec<Stratigraphy>> = HashMap::new();
  for s in strat_rows {
    let layers = layers_by_strat.remove(&s.id).unwrap_or_default();
    strats.entry(s.borehole_id).or_default().push(Stratigraphy { id: s.id,
                                                                 borehole_id: s.borehole_id,
                                                                 name: s.name,
                                                                 is_primary: s.is_primary,
                                                                 layers });
  }

  Ok(rows.into_iter()
         .map(|r| Borehole { id: r.id,
                             name: r.name,
                             workgroup_id: r.workgroup_id,
                             created_by_id: r.created_by_id,
                             updated_by_id: r.updated_by_id,
                             total_depth: r.total_depth,
                             location_x: r.location_x,
                             location_y: r.location_y,
                             location_x_lv03: r.location_x_lv03,
                             location_y_lv03: r.location_y_lv03,
                             workflows: history.remove(&r.id).unwrap_or_default(),
                             stratigraphies: strats.remove(&r.id).unwrap_or_default() })
         .collect())
}

fn apply_transition(conn: &mut SqliteConnection,
                    borehole_id: i32,
                    t: &WorkflowTransition)
                    -> Result<Vec<WorkflowEntry>, StoreError> {
  let exists = boreholes::table.find(borehole_id).select(boreholes::id).first::<i32>(conn).optional()?;
  if exists.is_none() {
    return Err(DomainError::NotFound(format!("borehole {}", borehole_id)).into());
  }
  let mut touched = Vec::new();
  match t.pending_entry_id {
    Some(entry_id) => {
      let row = workflows::table.find(entry_id)
                                .first::<WorkflowRow>(conn)
                                .optional()?
                                .filter(|r| r.borehole_id == borehole_id)
                                .ok_or_else(|| {
                                  DomainError::NotFound(format!("workflow {} de borehole {}", entry_id, borehole_id))
                                })?;
      let pending = row.started_at_ts.is_none() && row.finished_at_ts.is_none();
      if !pending || row.role != t.completed.role.ordinal() {
        return Err(DomainError::Integrity(format!("workflow {} no es una etapa {} pendiente",
                                                  entry_id, t.completed.role)).into());
      }
      diesel::update(workflows::table.find(entry_id)).set((workflows::user_id.eq(t.completed.user_id),
                                                            workflows::started_at_ts.eq(to_millis(t.completed.started_at)),
                                                            workflows::finished_at_ts.eq(to_millis(t.completed.finished_at))))
                                                      .execute(conn)?;
      touched.push(entry_id);
    }
    None => touched.push(insert_workflow(conn, borehole_id, &t.completed)?),
  }
  if let Some(next) = &t.next {
    touched.push(insert_workflow(conn, borehole_id, next)?);
  }
  let rows: Vec<WorkflowRow> = workflows::table.filter(workflows::id.eq_any(touched)).order(workflows::id.asc()).load(conn)?;
  let mut out = Vec::with_capacity(rows.len());
  for r in rows {
    out.push(workflow_from_row(r)?);
  }
  Ok(out)
}

#[async_trait]
impl RegistryStore for DieselRegistryStore {
  async fn users(&self) -> Result<Vec<User>, DomainError> {
    self.run(|conn| {
          let rows: Vec<UserRow> = users::table.order(users::id.asc()).load(conn)?;
          Ok(rows.into_iter()
                 .map(|r| User { id: r.id,
                                 first_name: r.first_name,
                                 last_name: r.last_name,
                                 name: r.name,
                                 subject_id: r.subject_id })
                 .collect())
        })
        .await
  }

  async fn workgroups(&self) -> Result<Vec<Workgroup>, DomainError> {
    self.run(|conn| {
          let rows: Vec<WorkgroupRow> = workgroups::table.order(workgroups::id.asc()).load(conn)?;
          Ok(rows.into_iter().map(|r| Workgroup { id: r.id, name: r.name }).collect())
        })
        .await
  }

  async fn boreholes(&self, query: BoreholeQuery) -> Result<Vec<Borehole>, DomainError> {
    self.run(move |conn| load_boreholes(conn, &query)).await
  }

  async fn apply_workflow_transition(&self,
                                     borehole_id: i32,
                                     transition: WorkflowTransition)
                                     -> Result<Vec<WorkflowEntry>, DomainError> {
    self.run(move |conn| conn.transaction::<_, StoreError, _>(|conn| apply_transition(conn, borehole_id, &transition))).await
  }

  async fn commit(&self, unit: UnitOfWork) -> Result<CommitReceipt, DomainError> {
    debug!("commit: {} filas de primer nivel", unit.len());
    self.run(move |conn| {
          conn.transaction::<_, StoreError, _>(|conn| {
                let mut receipt = CommitReceipt::default();
                for u in unit.users() {
                  receipt.user_ids.push(insert_user(conn, u)?);
                }
                for w in unit.workgroups() {
                  receipt.workgroup_ids.push(insert_workgroup(conn, w)?);
                }
                for b in unit.boreholes() {
                  receipt.borehole_ids.push(insert_borehole(conn, b)?);
                }
                Ok(receipt)
              })
        })
        .await
  }
}
