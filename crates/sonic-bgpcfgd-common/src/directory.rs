//! Shared directory of facts learned from the databases.
//!
//! One manager publishes a value (e.g. `DEVICE_METADATA` publishes
//! `localhost/bgp_asn`) and others read it. Slots are addressed by
//! database, table and a `/`-separated path.

use dashmap::DashMap;

use crate::manager::DbId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    db: DbId,
    table: String,
    path: String,
}

impl SlotKey {
    fn new(db: DbId, table: &str, path: &str) -> Self {
        Self {
            db,
            table: table.to_string(),
            path: path.to_string(),
        }
    }
}

/// Facts shared between managers.
#[derive(Debug, Default)]
pub struct Directory {
    slots: DashMap<SlotKey, String>,
}

impl Directory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` at `path`, returning the previous value.
    pub fn put(
        &self,
        db: DbId,
        table: &str,
        path: &str,
        value: impl Into<String>,
    ) -> Option<String> {
        self.slots.insert(SlotKey::new(db, table, path), value.into())
    }

    /// Returns the value stored at `path`.
    pub fn get(&self, db: DbId, table: &str, path: &str) -> Option<String> {
        self.slots
            .get(&SlotKey::new(db, table, path))
            .map(|v| v.value().clone())
    }

    /// Returns true if a value is stored at `path`.
    pub fn path_exist(&self, db: DbId, table: &str, path: &str) -> bool {
        self.slots.contains_key(&SlotKey::new(db, table, path))
    }

    /// Removes the value stored at `path`.
    pub fn remove(&self, db: DbId, table: &str, path: &str) -> Option<String> {
        self.slots
            .remove(&SlotKey::new(db, table, path))
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let dir = Directory::new();
        assert!(!dir.path_exist(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn"));

        assert_eq!(
            dir.put(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn", "65100"),
            None
        );
        assert!(dir.path_exist(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn"));
        assert_eq!(
            dir.get(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn"),
            Some("65100".to_string())
        );

        // Same path in another database is a different slot
        assert!(!dir.path_exist(DbId::ApplDb, "DEVICE_METADATA", "localhost/bgp_asn"));
    }

    #[test]
    fn test_overwrite_and_remove() {
        let dir = Directory::new();
        dir.put(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn", "65100");
        assert_eq!(
            dir.put(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn", "65200"),
            Some("65100".to_string())
        );
        assert_eq!(
            dir.remove(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn"),
            Some("65200".to_string())
        );
        assert!(!dir.path_exist(DbId::ConfigDb, "DEVICE_METADATA", "localhost/bgp_asn"));
    }
}
