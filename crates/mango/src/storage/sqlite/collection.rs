use async_trait::async_trait;
use rusqlite::OptionalExtension;
use serde_json::{Map, Value};
use tokio_rusqlite::Connection;

use mango_core::document::{DocumentId, Filter, FindOptions, Projection, ID_FIELD};
use mango_core::storage::{
    apply_set, DocumentCollection, DocumentStream, Result, StoreError, UpdateResult,
};

use super::error::{map_tokio_rusqlite_error, wrap_err, wrap_json_err};
use super::schema::{self, Sql};

/// Rows fetched per round trip by [`DocumentCollection::stream`].
const STREAM_PAGE_SIZE: i64 = 200;

/// A SQLite database holding one table per collection.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Opens (or creates) a file-based database.
    pub async fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database. Data is lost when dropped.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Returns a handle to the named collection, creating its table if needed.
    pub async fn collection(&self, name: &str) -> Result<SqliteCollection> {
        let table = schema::table_name(name)?;
        let ddl = schema::create_table(&table);
        self.conn
            .call(move |conn| conn.execute_batch(&ddl).map_err(wrap_err))
            .await
            .map_err(map_tokio_rusqlite_error)?;
        Ok(SqliteCollection {
            conn: self.conn.clone(),
            table,
        })
    }
}

/// A JSON document collection backed by one SQLite table.
#[derive(Clone)]
pub struct SqliteCollection {
    conn: Connection,
    table: String,
}

fn parse_body(body: &str, projection: Option<&Projection>) -> Result<Value> {
    let doc: Value = serde_json::from_str(body)?;
    Ok(match projection {
        Some(projection) => projection.apply(&doc),
        None => doc,
    })
}

impl SqliteCollection {
    /// Runs a `SELECT seq, body` query and returns the rows.
    async fn query_rows(&self, query: Sql) -> Result<Vec<(i64, String)>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&query.sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(query.params.iter()), |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                    })
                    .map_err(wrap_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(wrap_err)
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    fn name(&self) -> &str {
        &self.table
    }

    async fn insert_one(&self, mut doc: Map<String, Value>) -> Result<DocumentId> {
        let id = DocumentId::new();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let body = serde_json::to_string(&doc)?;
        let sql = schema::insert(&self.table);
        let id_text = id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(&sql, rusqlite::params![id_text, body])
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;

        Ok(id)
    }

    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Value>> {
        let query = schema::select(&self.table, filter, &FindOptions::default().with_limit(1))?;
        let rows = self.query_rows(query).await?;
        rows.first()
            .map(|(_, body)| parse_body(body, projection))
            .transpose()
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>> {
        let query = schema::select(&self.table, filter, options)?;
        let rows = self.query_rows(query).await?;
        rows.iter()
            .map(|(_, body)| parse_body(body, options.projection.as_ref()))
            .collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let query = schema::count(&self.table, filter)?;
        let total: i64 = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    &query.sql,
                    rusqlite::params_from_iter(query.params.iter()),
                    |row| row.get(0),
                )
                .map_err(wrap_err)
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn update_one(&self, filter: &Filter, set: Map<String, Value>) -> Result<UpdateResult> {
        let query = schema::select(&self.table, filter, &FindOptions::default().with_limit(1))?;
        let update_sql = schema::update_body(&self.table);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let row = tx
                    .query_row(
                        &query.sql,
                        rusqlite::params_from_iter(query.params.iter()),
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                    )
                    .optional()
                    .map_err(wrap_err)?;
                let Some((seq, body)) = row else {
                    return Ok(UpdateResult::default());
                };

                let mut doc: Value = serde_json::from_str(&body).map_err(wrap_json_err)?;
                if !apply_set(&mut doc, &set) {
                    return Ok(UpdateResult {
                        matched: 1,
                        modified: 0,
                    });
                }
                let updated = serde_json::to_string(&doc).map_err(wrap_json_err)?;
                tx.execute(&update_sql, rusqlite::params![updated, seq])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;

                Ok(UpdateResult {
                    matched: 1,
                    modified: 1,
                })
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    fn stream(&self, filter: Filter) -> DocumentStream {
        let collection = self.clone();
        Box::pin(async_stream::stream! {
            let mut after_seq = 0;
            loop {
                let page = match schema::scan_page(&collection.table, &filter, after_seq, STREAM_PAGE_SIZE) {
                    Ok(query) => collection.query_rows(query).await,
                    Err(e) => Err(e),
                };
                let rows = match page {
                    Ok(rows) => rows,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                let exhausted = (rows.len() as i64) < STREAM_PAGE_SIZE;
                for (seq, body) in rows {
                    after_seq = seq;
                    yield parse_body(&body, None);
                }
                if exhausted {
                    break;
                }
            }
        })
    }
}
