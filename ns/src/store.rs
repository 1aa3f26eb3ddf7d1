//! Core Store implementation

use eyre::{Context, Result, eyre};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::INDEX_TABLE;
use crate::record::{Filter, Order, Record};

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed record store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context(format!("Failed to create store directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path).context(format!("Failed to open database: {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        init_schema(&conn)?;
        info!(path = %path.display(), "Opened store");
        Ok(Self { conn })
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        init_schema(&conn)?;
        debug!("Opened in-memory store");
        Ok(Self { conn })
    }

    /// Insert a new record, failing if the id already exists
    pub fn create<T: Record>(&mut self, record: T) -> Result<String> {
        create(&self.conn, &record)
    }

    /// Insert many records atomically
    pub fn create_many<T: Record>(&mut self, records: Vec<T>) -> Result<Vec<String>> {
        self.transaction(|tx| records.into_iter().map(|r| tx.create(r)).collect())
    }

    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        get(&self.conn, id)
    }

    /// Replace an existing record, failing if it does not exist
    pub fn update<T: Record>(&mut self, record: T) -> Result<()> {
        update(&self.conn, &record)
    }

    /// List records matching all filters, most recently updated first
    pub fn list<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        list(&self.conn, filters, &[], None)
    }

    /// List records matching all filters in the given order
    pub fn list_ordered<T: Record>(&self, filters: &[Filter], order: &[Order]) -> Result<Vec<T>> {
        list(&self.conn, filters, order, None)
    }

    /// Like `list_ordered`, returning at most `limit` records
    pub fn list_limited<T: Record>(&self, filters: &[Filter], order: &[Order], limit: usize) -> Result<Vec<T>> {
        list(&self.conn, filters, order, Some(limit))
    }

    pub fn count<T: Record>(&self, filters: &[Filter]) -> Result<usize> {
        count::<T>(&self.conn, filters)
    }

    /// Sum an integer indexed field over the matching records
    pub fn sum<T: Record>(&self, field: &str, filters: &[Filter]) -> Result<i64> {
        sum::<T>(&self.conn, field, filters)
    }

    /// Run `f` inside a transaction, committing only if it returns Ok
    pub fn transaction<R>(&mut self, f: impl FnOnce(&StoreTx<'_>) -> Result<R>) -> Result<R> {
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        let result = f(&StoreTx { conn: &tx })?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(result)
    }
}

/// Handle for operations inside `Store::transaction`
pub struct StoreTx<'a> {
    conn: &'a Connection,
}

impl StoreTx<'_> {
    pub fn create<T: Record>(&self, record: T) -> Result<String> {
        create(self.conn, &record)
    }

    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        get(self.conn, id)
    }

    pub fn update<T: Record>(&self, record: T) -> Result<()> {
        update(self.conn, &record)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    debug!("init_schema: called");
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {INDEX_TABLE} (
                collection TEXT NOT NULL,
                record_id TEXT NOT NULL,
                field TEXT NOT NULL,
                value,
                PRIMARY KEY (collection, record_id, field)
            )"
        ),
        [],
    )?;
    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS idx_{INDEX_TABLE}_lookup ON {INDEX_TABLE} (collection, field, value)"),
        [],
    )?;
    Ok(())
}

/// Validate a collection name and make sure its table exists
fn ensure_collection(conn: &Connection, collection: &str) -> Result<()> {
    if collection.is_empty() || !collection.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return Err(eyre!("Invalid collection name: {:?}", collection));
    }
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )"
        ),
        [],
    )?;
    Ok(())
}

fn write_index<T: Record>(conn: &Connection, record: &T) -> Result<()> {
    let collection = T::collection_name();
    conn.execute(
        &format!("DELETE FROM {INDEX_TABLE} WHERE collection = ?1 AND record_id = ?2"),
        params![collection, record.id()],
    )?;
    for (field, value) in record.indexed_fields() {
        conn.execute(
            &format!("INSERT INTO {INDEX_TABLE} (collection, record_id, field, value) VALUES (?1, ?2, ?3, ?4)"),
            params![collection, record.id(), field, Value::from(&value)],
        )?;
    }
    Ok(())
}

fn create<T: Record>(conn: &Connection, record: &T) -> Result<String> {
    let collection = T::collection_name();
    debug!(collection, id = record.id(), "create: called");
    ensure_collection(conn, collection)?;
    let data = serde_json::to_string(record).context("Failed to serialize record")?;
    conn.execute(
        &format!("INSERT INTO {collection} (id, data, updated_at) VALUES (?1, ?2, ?3)"),
        params![record.id(), data, record.updated_at()],
    )
    .context(format!("Failed to insert {}/{}", collection, record.id()))?;
    write_index(conn, record)?;
    Ok(record.id().to_string())
}

fn get<T: Record>(conn: &Connection, id: &str) -> Result<Option<T>> {
    let collection = T::collection_name();
    debug!(collection, %id, "get: called");
    ensure_collection(conn, collection)?;
    let data: Option<String> = conn
        .query_row(&format!("SELECT data FROM {collection} WHERE id = ?1"), params![id], |row| {
            row.get(0)
        })
        .optional()?;
    match data {
        Some(data) => Ok(Some(
            serde_json::from_str(&data).context(format!("Corrupt record {}/{}", collection, id))?,
        )),
        None => Ok(None),
    }
}

fn update<T: Record>(conn: &Connection, record: &T) -> Result<()> {
    let collection = T::collection_name();
    debug!(collection, id = record.id(), "update: called");
    ensure_collection(conn, collection)?;
    let data = serde_json::to_string(record).context("Failed to serialize record")?;
    let changed = conn.execute(
        &format!("UPDATE {collection} SET data = ?2, updated_at = ?3 WHERE id = ?1"),
        params![record.id(), data, record.updated_at()],
    )?;
    if changed == 0 {
        return Err(eyre!("Record not found: {}/{}", collection, record.id()));
    }
    write_index(conn, record)
}

/// Build the WHERE clause and its parameters for a set of filters
///
/// Parameter `?1` is always the collection name.
fn where_clause(collection: &str, filters: &[Filter]) -> (String, Vec<Value>) {
    let mut params = vec![Value::Text(collection.to_string())];
    let mut clauses = Vec::new();
    for filter in filters {
        params.push(Value::Text(filter.field.clone()));
        let field_idx = params.len();
        params.push(Value::from(&filter.value));
        let value_idx = params.len();
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM {INDEX_TABLE} i WHERE i.collection = ?1 AND i.record_id = t.id \
             AND i.field = ?{field_idx} AND i.value {} ?{value_idx})",
            filter.op.as_sql()
        ));
    }
    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, params)
}

fn list<T: Record>(conn: &Connection, filters: &[Filter], order: &[Order], limit: Option<usize>) -> Result<Vec<T>> {
    let collection = T::collection_name();
    debug!(collection, num_filters = filters.len(), num_order = order.len(), ?limit, "list: called");
    ensure_collection(conn, collection)?;

    let (where_sql, mut params) = where_clause(collection, filters);
    let mut keys = Vec::new();
    for key in order {
        params.push(Value::Text(key.field.clone()));
        keys.push(format!(
            "(SELECT i.value FROM {INDEX_TABLE} i WHERE i.collection = ?1 AND i.record_id = t.id AND i.field = ?{}) {}",
            params.len(),
            if key.descending { "DESC" } else { "ASC" }
        ));
    }
    // Insertion order breaks ties so equal keys still list deterministically
    let tiebreak_desc = order.last().is_none_or(|o| o.descending);
    if order.is_empty() {
        keys.push("t.updated_at DESC".to_string());
    }
    keys.push(format!("t.rowid {}", if tiebreak_desc { "DESC" } else { "ASC" }));

    let mut sql = format!("SELECT t.data FROM {collection} t{where_sql} ORDER BY {}", keys.join(", "));
    if let Some(limit) = limit {
        // SQLite takes a signed 64-bit limit
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?;
    let mut records = Vec::new();
    for data in rows {
        let data = data?;
        records.push(serde_json::from_str(&data).context(format!("Corrupt record in {}", collection))?);
    }
    debug!(collection, count = records.len(), "list: done");
    Ok(records)
}

fn count<T: Record>(conn: &Connection, filters: &[Filter]) -> Result<usize> {
    let collection = T::collection_name();
    debug!(collection, num_filters = filters.len(), "count: called");
    ensure_collection(conn, collection)?;
    let (where_sql, params) = where_clause(collection, filters);
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {collection} t{where_sql}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn sum<T: Record>(conn: &Connection, field: &str, filters: &[Filter]) -> Result<i64> {
    let collection = T::collection_name();
    debug!(collection, field, num_filters = filters.len(), "sum: called");
    ensure_collection(conn, collection)?;
    let (where_sql, mut params) = where_clause(collection, filters);
    params.push(Value::Text(field.to_string()));
    let sql = format!(
        "SELECT COALESCE(SUM(s.value), 0) FROM {collection} t \
         JOIN {INDEX_TABLE} s ON s.collection = ?1 AND s.record_id = t.id AND s.field = ?{}{where_sql}",
        params.len()
    );
    let total: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(total)
}
