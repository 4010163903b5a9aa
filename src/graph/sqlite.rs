//! SQLite-backed graph store with migrations
//!
//! Persists entity mentions and co-occurrence edges. Each undirected edge is
//! stored once with `source < target`.

use super::store::{canonical_pair, Adjacency, GraphError, GraphStore};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Rows per `IN (...)` clause, well under SQLite's bound-parameter limit.
const QUERY_CHUNK: usize = 500;

/// Persistent [`GraphStore`].
pub struct SqliteGraphStore {
    pool: DbPool,
}

impl SqliteGraphStore {
    /// Open (or create) the graph database at `db_path` and apply migrations.
    pub fn open(db_path: &Path) -> Result<Self, GraphError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::Io {
                source: e,
                context: format!("Failed to create graph database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| GraphError::Unavailable(format!("Failed to create pool: {}", e)))?;

        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, GraphError> {
        self.pool
            .get()
            .map_err(|e| GraphError::Unavailable(format!("Failed to get connection: {}", e)))
    }

    fn migrate(&self) -> Result<(), GraphError> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying graph migration {}", version);
                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Replace the entities a document mentions.
    ///
    /// Co-occurrence weights contributed by the previous mention set are
    /// retracted before the new pairs are counted.
    pub fn set_mentions(&self, document_id: &str, entities: &[String]) -> Result<(), GraphError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        retract_mentions(&tx, document_id)?;

        let entities: BTreeSet<&str> = entities
            .iter()
            .map(String::as_str)
            .filter(|e| !e.is_empty())
            .collect();
        for entity in &entities {
            tx.execute(
                "INSERT INTO mentions (document_id, entity_id) VALUES (?1, ?2)",
                params![document_id, entity],
            )?;
        }
        let list: Vec<&str> = entities.into_iter().collect();
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                bump_edge(&tx, a, b, 1.0)?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Forget a document's mentions. Returns `false` if it had none.
    pub fn remove_document(&self, document_id: &str) -> Result<bool, GraphError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let removed = retract_mentions(&tx, document_id)?;
        tx.commit()?;
        Ok(removed)
    }

    /// Add `weight` to the undirected edge `a <-> b`.
    pub fn add_edge(&self, a: &str, b: &str, weight: f32) -> Result<(), GraphError> {
        if a == b || a.is_empty() || b.is_empty() {
            return Err(GraphError::Query(format!(
                "invalid edge endpoints '{}' and '{}'",
                a, b
            )));
        }
        if !(weight > 0.0) || !weight.is_finite() {
            return Err(GraphError::Query(format!("invalid edge weight {}", weight)));
        }
        let conn = self.get_conn()?;
        bump_edge(&conn, a, b, weight)
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> Result<f32, GraphError> {
        let (source, target) = canonical_pair(a, b);
        let conn = self.get_conn()?;
        let weight: Option<f64> = conn
            .query_row(
                "SELECT weight FROM cooccurrence WHERE source = ?1 AND target = ?2",
                params![source, target],
                |row| row.get(0),
            )
            .optional()?;
        Ok(weight.unwrap_or(0.0) as f32)
    }

    /// Row counts for reporting.
    pub fn stats(&self) -> Result<GraphStats, GraphError> {
        let conn = self.get_conn()?;

        let document_count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT document_id) FROM mentions",
            [],
            |row| row.get(0),
        )?;
        let entity_count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT entity_id) FROM mentions",
            [],
            |row| row.get(0),
        )?;
        let edge_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM cooccurrence", [], |row| row.get(0))?;

        Ok(GraphStats {
            document_count: document_count as usize,
            entity_count: entity_count as usize,
            edge_count: edge_count as usize,
        })
    }
}

/// Graph store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub document_count: usize,
    pub entity_count: usize,
    pub edge_count: usize,
}

fn retract_mentions(tx: &Transaction<'_>, document_id: &str) -> Result<bool, GraphError> {
    let previous: Vec<String> = {
        let mut stmt =
            tx.prepare("SELECT entity_id FROM mentions WHERE document_id = ?1 ORDER BY entity_id")?;
        let rows = stmt.query_map(params![document_id], |row| row.get::<_, String>(0))?;
        let entities = rows.collect::<Result<Vec<_>, _>>()?;
        entities
    };
    if previous.is_empty() {
        return Ok(false);
    }

    for (i, a) in previous.iter().enumerate() {
        for b in &previous[i + 1..] {
            bump_edge(tx, a, b, -1.0)?;
        }
    }
    tx.execute(
        "DELETE FROM mentions WHERE document_id = ?1",
        params![document_id],
    )?;
    Ok(true)
}

fn bump_edge(conn: &Connection, a: &str, b: &str, delta: f32) -> Result<(), GraphError> {
    let (source, target) = canonical_pair(a, b);
    conn.execute(
        "INSERT INTO cooccurrence (source, target, weight) VALUES (?1, ?2, ?3)
         ON CONFLICT(source, target) DO UPDATE SET weight = weight + excluded.weight",
        params![source, target, delta as f64],
    )?;
    conn.execute(
        "DELETE FROM cooccurrence WHERE source = ?1 AND target = ?2 AND weight <= 0",
        params![source, target],
    )?;
    Ok(())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl GraphStore for SqliteGraphStore {
    fn entities_for_documents(
        &self,
        document_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError> {
        let conn = self.get_conn()?;
        let mut result: HashMap<String, Vec<String>> = HashMap::new();

        for chunk in document_ids.chunks(QUERY_CHUNK) {
            let sql = format!(
                "SELECT document_id, entity_id FROM mentions WHERE document_id IN ({}) ORDER BY entity_id",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (doc, entity) = row?;
                result.entry(doc).or_default().push(entity);
            }
        }

        Ok(result)
    }

    fn neighbors(
        &self,
        entity_ids: &[String],
        min_weight: f32,
    ) -> Result<Vec<Adjacency>, GraphError> {
        let conn = self.get_conn()?;
        let mut result = Vec::new();

        for chunk in entity_ids.chunks(QUERY_CHUNK) {
            let marks = placeholders(chunk.len());
            let sql = format!(
                "SELECT source, target, weight FROM cooccurrence
                 WHERE source IN ({marks}) AND weight >= ?
                 UNION ALL
                 SELECT target, source, weight FROM cooccurrence
                 WHERE target IN ({marks}) AND weight >= ?"
            );
            let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(chunk.len() * 2 + 2);
            for _ in 0..2 {
                values.extend(chunk.iter().cloned().map(rusqlite::types::Value::Text));
                values.push(rusqlite::types::Value::Real(min_weight as f64));
            }
            // source placeholders, weight, target placeholders, weight
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                Ok(Adjacency {
                    source: row.get(0)?,
                    target: row.get(1)?,
                    weight: row.get::<_, f64>(2)? as f32,
                })
            })?;
            for row in rows {
                result.push(row?);
            }
        }

        Ok(result)
    }

    fn documents_for_entities(
        &self,
        entity_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError> {
        let conn = self.get_conn()?;
        let mut result: HashMap<String, Vec<String>> = HashMap::new();

        for chunk in entity_ids.chunks(QUERY_CHUNK) {
            let sql = format!(
                "SELECT document_id, entity_id FROM mentions WHERE entity_id IN ({}) ORDER BY entity_id",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (doc, entity) = row?;
                result.entry(doc).or_default().push(entity);
            }
        }

        Ok(result)
    }
}

/// Graph database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: mentions and co-occurrence edges
    r#"
    CREATE TABLE mentions (
        document_id TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        PRIMARY KEY (document_id, entity_id)
    );

    CREATE INDEX idx_mentions_entity ON mentions(entity_id);

    CREATE TABLE cooccurrence (
        source TEXT NOT NULL,
        target TEXT NOT NULL,
        weight REAL NOT NULL,
        PRIMARY KEY (source, target),
        CHECK (source < target)
    );

    CREATE INDEX idx_cooccurrence_target ON cooccurrence(target);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> SqliteGraphStore {
        SqliteGraphStore::open(&temp_dir.path().join("graph.db")).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_migrations_applied_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("graph.db");
        drop(SqliteGraphStore::open(&path).unwrap());
        let store = SqliteGraphStore::open(&path).unwrap();

        let conn = store.get_conn().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_mentions_and_edges() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.set_mentions("d1", &strings(&["Jon", "Wall"])).unwrap();
        store
            .set_mentions("d2", &strings(&["Wall", "Jon", "Ghost"]))
            .unwrap();
        store.add_edge("Wall", "Jon", 5.0).unwrap();

        assert_eq!(store.edge_weight("Jon", "Wall").unwrap(), 7.0);
        assert_eq!(store.edge_weight("Ghost", "Wall").unwrap(), 1.0);
        assert_eq!(store.edge_weight("Ghost", "Arya").unwrap(), 0.0);

        let stats = store.stats().unwrap();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.entity_count, 3);
        assert_eq!(stats.edge_count, 3);
    }

    #[test]
    fn test_neighbors_both_directions() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        store.add_edge("Arya", "Needle", 2.0).unwrap();
        store.add_edge("Jon", "Arya", 4.0).unwrap();

        let mut rows = store.neighbors(&strings(&["Arya"]), 1.0).unwrap();
        rows.sort_by(|a, b| a.target.cmp(&b.target));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source, "Arya");
        assert_eq!(rows[0].target, "Jon");
        assert_eq!(rows[1].target, "Needle");

        let strong = store.neighbors(&strings(&["Arya"]), 3.0).unwrap();
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].target, "Jon");
    }

    #[test]
    fn test_remove_document_retracts() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        store.set_mentions("d1", &strings(&["Jon", "Wall"])).unwrap();

        assert!(store.remove_document("d1").unwrap());
        assert!(!store.remove_document("d1").unwrap());
        assert_eq!(store.edge_weight("Jon", "Wall").unwrap(), 0.0);
        assert!(store
            .documents_for_entities(&strings(&["Jon"]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_document_entity_lookups() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        store.set_mentions("d1", &strings(&["Jon"])).unwrap();
        store.set_mentions("d2", &strings(&["Wall", "Jon"])).unwrap();

        let docs = store.documents_for_entities(&strings(&["Wall"])).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs["d2"], strings(&["Wall"]));

        let entities = store.entities_for_documents(&strings(&["d2"])).unwrap();
        assert_eq!(entities["d2"], strings(&["Jon", "Wall"]));
    }

    #[test]
    fn test_invalid_edges_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        assert!(store.add_edge("Jon", "Jon", 1.0).is_err());
        assert!(store.add_edge("Jon", "Wall", -1.0).is_err());
        assert!(store.add_edge("Jon", "Wall", f32::NAN).is_err());
    }
}
