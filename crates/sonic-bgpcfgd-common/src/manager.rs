//! Manager trait and table event abstractions.
//!
//! Every bgpcfgd manager owns one table in one database and receives
//! set/del events for its rows. The surrounding dispatcher serializes
//! calls, so implementations never see two events concurrently.

use async_trait::async_trait;

use crate::error::BgpCfgResult;

/// Database identifiers used by bgpcfgd managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DbId {
    /// Configuration database (CONFIG_DB) - persistent configuration.
    ConfigDb,
    /// Application database (APPL_DB) - derived state written by other agents.
    ApplDb,
    /// State database (STATE_DB) - operational state tracking.
    StateDb,
}

impl DbId {
    /// Returns the database name as used in Redis/SONiC.
    pub fn name(&self) -> &'static str {
        match self {
            DbId::ConfigDb => "CONFIG_DB",
            DbId::ApplDb => "APPL_DB",
            DbId::StateDb => "STATE_DB",
        }
    }

    /// Returns the database ID number.
    pub fn id(&self) -> i64 {
        match self {
            DbId::ConfigDb => 4,
            DbId::ApplDb => 0,
            DbId::StateDb => 6,
        }
    }

    /// Returns the separator between table name and key in this database.
    pub fn table_separator(&self) -> char {
        match self {
            DbId::ApplDb => ':',
            DbId::ConfigDb | DbId::StateDb => '|',
        }
    }
}

impl std::fmt::Display for DbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Key-value tuple representing a field and its value.
pub type FieldValue = (String, String);

/// Collection of field-value pairs for a table entry.
pub type FieldValues = Vec<FieldValue>;

/// Helper trait for working with field-value collections.
pub trait FieldValuesExt {
    /// Gets the value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&str>;

    /// Gets the value for a field, returning the default if not present.
    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str;

    /// Checks if a field exists.
    fn has_field(&self, field: &str) -> bool;
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get_field(field).unwrap_or(default)
    }

    fn has_field(&self, field: &str) -> bool {
        self.iter().any(|(f, _)| f == field)
    }
}

/// Builds a FieldValues collection from key-value pairs.
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}

/// Operation type of a table event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Set operation (add or update)
    Set,
    /// Delete operation
    Del,
}

impl Operation {
    /// Returns true if this is a Set operation.
    pub fn is_set(&self) -> bool {
        matches!(self, Operation::Set)
    }

    /// Returns true if this is a Del operation.
    pub fn is_del(&self) -> bool {
        matches!(self, Operation::Del)
    }
}

/// Key, operation, and field-values of one table event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOpFieldsValues {
    /// The key without the table prefix (e.g., "Vrf1|10.0.0.0/24")
    pub key: String,
    /// The operation (Set or Del)
    pub op: Operation,
    /// Field-value pairs (empty for Del operations)
    pub fvs: FieldValues,
}

impl KeyOpFieldsValues {
    /// Creates a Set entry.
    pub fn set(key: impl Into<String>, fvs: FieldValues) -> Self {
        Self {
            key: key.into(),
            op: Operation::Set,
            fvs,
        }
    }

    /// Creates a Del entry.
    pub fn del(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: Operation::Del,
            fvs: vec![],
        }
    }
}

/// Base trait for bgpcfgd table managers.
///
/// Handlers report failure for the single event being processed; the
/// caller logs it and moves on to the next event.
#[async_trait]
pub trait Manager: Send {
    /// Returns the manager name (used for logging).
    fn name(&self) -> &str;

    /// Returns the database this manager subscribes to.
    fn db(&self) -> DbId;

    /// Returns the subscribed table name.
    fn table_name(&self) -> &str;

    /// Handles a SET for `key`.
    async fn set_handler(&mut self, key: &str, fvs: &FieldValues) -> BgpCfgResult<()>;

    /// Handles a DEL for `key`.
    async fn del_handler(&mut self, key: &str) -> BgpCfgResult<()>;

    /// Dispatches one event to the matching handler.
    async fn handle(&mut self, entry: &KeyOpFieldsValues) -> BgpCfgResult<()> {
        match entry.op {
            Operation::Set => self.set_handler(&entry.key, &entry.fvs).await,
            Operation::Del => self.del_handler(&entry.key).await,
        }
    }
}
