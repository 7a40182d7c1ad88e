//! Table snapshots turned into set/del events.
//!
//! The watcher reads a whole table (`KEYS` + `HGETALL`), compares it
//! with the previous read and reports what changed. Deletions come
//! first, then sets, each group in key order.

use std::collections::{BTreeMap, HashMap};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{BgpCfgError, BgpCfgResult};
use crate::manager::{DbId, KeyOpFieldsValues};

/// Row contents keyed by field name.
pub type Row = BTreeMap<String, String>;

/// Table contents keyed by row key (without the table prefix).
pub type Snapshot = BTreeMap<String, Row>;

/// Tracks one table and reports row changes between reads.
#[derive(Debug)]
pub struct TableWatcher {
    db: DbId,
    table: String,
    snapshot: Snapshot,
}

impl TableWatcher {
    /// Creates a watcher with an empty initial snapshot, so the first
    /// poll reports every existing row as a set.
    pub fn new(db: DbId, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            snapshot: Snapshot::new(),
        }
    }

    /// Returns the watched database.
    pub fn db(&self) -> DbId {
        self.db
    }

    /// Returns the watched table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Reads the table and returns the events since the previous poll.
    pub async fn poll(
        &mut self,
        connection: &mut ConnectionManager,
    ) -> BgpCfgResult<Vec<KeyOpFieldsValues>> {
        let snapshot = self.read(connection).await?;
        Ok(self.apply_snapshot(snapshot))
    }

    /// Replaces the stored snapshot and returns the events between the two.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Vec<KeyOpFieldsValues> {
        let mut events = Vec::new();

        for key in self.snapshot.keys() {
            if !snapshot.contains_key(key) {
                events.push(KeyOpFieldsValues::del(key.clone()));
            }
        }

        for (key, row) in &snapshot {
            if self.snapshot.get(key) != Some(row) {
                let fvs = row.iter().map(|(f, v)| (f.clone(), v.clone())).collect();
                events.push(KeyOpFieldsValues::set(key.clone(), fvs));
            }
        }

        if !events.is_empty() {
            debug!(
                "{} {}: {} change(s) since last poll",
                self.db,
                self.table,
                events.len()
            );
        }

        self.snapshot = snapshot;
        events
    }

    async fn read(&self, connection: &mut ConnectionManager) -> BgpCfgResult<Snapshot> {
        let prefix = format!("{}{}", self.table, self.db.table_separator());
        let keys: Vec<String> = connection
            .keys(format!("{}*", prefix))
            .await
            .map_err(|e| BgpCfgError::database("keys", e.to_string()))?;

        let mut snapshot = Snapshot::new();
        for redis_key in keys {
            let fvs: HashMap<String, String> = connection
                .hgetall(&redis_key)
                .await
                .map_err(|e| BgpCfgError::database("hgetall", e.to_string()))?;
            if let Some(key) = redis_key.strip_prefix(&prefix) {
                snapshot.insert(key.to_string(), fvs.into_iter().collect());
            }
        }

        Ok(snapshot)
    }
}
