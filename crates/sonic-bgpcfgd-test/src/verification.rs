//! Verification helpers for testing bgpcfgd managers
//!
//! Provides stand-ins for vtysh and CONFIG_DB plus assertions over the
//! generated FRR command lines

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sonic_bgpcfgd_common::{
    BgpCfgError, BgpCfgResult, ConfigDbConnector, ConfigDbReader, ConfigMgr,
};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected line '{line}' not found in {actual:?}")]
    LineNotFound { line: String, actual: Vec<String> },

    #[error("Unexpected line '{line}' found")]
    UnexpectedLine { line: String },

    #[error("Expected {expected} lines, found {actual}")]
    LineCountMismatch { expected: usize, actual: usize },

    #[error("'{first}' expected before '{second}'")]
    OrderViolation { first: String, second: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// [`ConfigMgr`] that records batches instead of running vtysh
#[derive(Debug, Default)]
pub struct RecordingConfigMgr {
    pending: Vec<String>,
    pushes: Vec<Vec<String>>,
    commits: Vec<Vec<String>>,
    reject_commits: bool,
}

impl RecordingConfigMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose commits are all rejected, as if vtysh failed
    pub fn rejecting() -> Self {
        Self {
            reject_commits: true,
            ..Self::default()
        }
    }

    /// Each `push_list` call, in order
    pub fn pushes(&self) -> &[Vec<String>] {
        &self.pushes
    }

    /// Each non-empty committed batch, in order
    pub fn commits(&self) -> &[Vec<String>] {
        &self.commits
    }

    /// Drains the uncommitted lines without committing them
    pub fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}

#[async_trait]
impl ConfigMgr for RecordingConfigMgr {
    fn push_list(&mut self, lines: Vec<String>) {
        self.pushes.push(lines.clone());
        self.pending.extend(lines);
    }

    fn pending(&self) -> &[String] {
        &self.pending
    }

    async fn commit(&mut self) -> BgpCfgResult<bool> {
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return Ok(true);
        }
        self.commits.push(batch);
        Ok(!self.reject_commits)
    }
}

/// In-memory CONFIG_DB hashes
///
/// Readers created by the connector share the same storage, so rows
/// written after connecting are visible to them.
#[derive(Debug, Default)]
pub struct MemoryConfigDbConnector {
    fields: Arc<DashMap<(String, String), String>>,
    connects: AtomicUsize,
    unreachable: bool,
}

impl MemoryConfigDbConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose `connect` always fails
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Builder form of [`set_field`](Self::set_field)
    pub fn with_field(self, key: &str, field: &str, value: &str) -> Self {
        self.set_field(key, field, value);
        self
    }

    pub fn set_field(&self, key: &str, field: &str, value: &str) {
        self.fields
            .insert((key.to_string(), field.to_string()), value.to_string());
    }

    /// Removes every field of `key`
    pub fn remove_key(&self, key: &str) {
        self.fields.retain(|(k, _), _| k != key);
    }

    /// Number of connections opened so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

/// Reader handed out by [`MemoryConfigDbConnector`]
pub struct MemoryConfigDb {
    fields: Arc<DashMap<(String, String), String>>,
}

#[async_trait]
impl ConfigDbReader for MemoryConfigDb {
    async fn hget(&mut self, key: &str, field: &str) -> BgpCfgResult<Option<String>> {
        Ok(self
            .fields
            .get(&(key.to_string(), field.to_string()))
            .map(|v| v.value().clone()))
    }
}

#[async_trait]
impl ConfigDbConnector for MemoryConfigDbConnector {
    async fn connect(&self) -> BgpCfgResult<Box<dyn ConfigDbReader>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(BgpCfgError::database("connect", "CONFIG_DB unreachable"));
        }
        Ok(Box::new(MemoryConfigDb {
            fields: self.fields.clone(),
        }))
    }
}

/// Assertions over a sequence of generated FRR lines
pub struct CommandVerifier {
    lines: Vec<String>,
}

impl CommandVerifier {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Verify that a line was generated (exact match)
    pub fn assert_line(&self, expected: &str) -> VerifyResult<()> {
        self.position(expected).map(|_| ())
    }

    /// Verify that no generated line contains `fragment`
    pub fn assert_absent(&self, fragment: &str) -> VerifyResult<()> {
        match self.lines.iter().find(|l| l.contains(fragment)) {
            Some(line) => Err(VerificationError::UnexpectedLine { line: line.clone() }),
            None => Ok(()),
        }
    }

    /// Verify the number of generated lines
    pub fn assert_line_count(&self, expected: usize) -> VerifyResult<()> {
        if self.lines.len() != expected {
            return Err(VerificationError::LineCountMismatch {
                expected,
                actual: self.lines.len(),
            });
        }
        Ok(())
    }

    /// Verify that `first` appears before `second`
    pub fn assert_before(&self, first: &str, second: &str) -> VerifyResult<()> {
        if self.position(first)? < self.position(second)? {
            Ok(())
        } else {
            Err(VerificationError::OrderViolation {
                first: first.to_string(),
                second: second.to_string(),
            })
        }
    }

    /// Verify that every `no ... route` line precedes every `... route` line
    pub fn assert_uninstalls_precede_installs(&self) -> VerifyResult<()> {
        let routes: Vec<&String> = self
            .lines
            .iter()
            .filter(|l| l.contains(" route ") && !l.contains("route-map"))
            .collect();
        let last_uninstall = routes.iter().rposition(|l| l.starts_with("no "));
        let first_install = routes.iter().position(|l| !l.starts_with("no "));

        match (last_uninstall, first_install) {
            (Some(u), Some(i)) if u > i => Err(VerificationError::OrderViolation {
                first: routes[u].clone(),
                second: routes[i].clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn position(&self, expected: &str) -> VerifyResult<usize> {
        self.lines
            .iter()
            .position(|l| l == expected)
            .ok_or_else(|| VerificationError::LineNotFound {
                line: expected.to_string(),
                actual: self.lines.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_verifier() {
        let verifier = CommandVerifier::new(lines(&[
            "no ip route 10.0.0.0/24 10.0.0.1 tag 1",
            "ip route 10.0.0.0/24 10.0.0.2 tag 1",
        ]));

        assert!(verifier.assert_line("ip route 10.0.0.0/24 10.0.0.2 tag 1").is_ok());
        assert!(verifier.assert_absent("blackhole").is_ok());
        assert!(verifier.assert_line_count(2).is_ok());
        assert!(verifier.assert_uninstalls_precede_installs().is_ok());
        assert!(verifier
            .assert_before(
                "no ip route 10.0.0.0/24 10.0.0.1 tag 1",
                "ip route 10.0.0.0/24 10.0.0.2 tag 1"
            )
            .is_ok());

        assert!(verifier.assert_line_count(3).is_err());
        assert!(verifier.assert_line("ip route 10.0.0.0/24 10.0.0.1 tag 1").is_err());
    }

    #[test]
    fn test_order_violation() {
        let verifier = CommandVerifier::new(lines(&[
            "ip route 10.0.0.0/24 10.0.0.2 tag 1",
            "no ip route 10.0.0.0/24 10.0.0.1 tag 1",
        ]));
        assert!(verifier.assert_uninstalls_precede_installs().is_err());
    }

    #[tokio::test]
    async fn test_recording_config_mgr() {
        let mut mgr = RecordingConfigMgr::new();
        mgr.push_list(lines(&["a", "b"]));
        mgr.push_list(lines(&["c"]));
        assert_eq!(mgr.pending().len(), 3);

        assert!(mgr.commit().await.unwrap());
        assert!(mgr.commit().await.unwrap());
        assert_eq!(mgr.pushes().len(), 2);
        assert_eq!(mgr.commits(), &[lines(&["a", "b", "c"])]);

        let mut rejecting = RecordingConfigMgr::rejecting();
        rejecting.push_list(lines(&["a"]));
        assert!(!rejecting.commit().await.unwrap());
        assert!(rejecting.pending().is_empty());
    }

    #[tokio::test]
    async fn test_memory_config_db() {
        let connector = MemoryConfigDbConnector::new().with_field("STATIC_ROUTE|10.0.0.0/24", "bfd", "true");
        let mut reader = connector.connect().await.unwrap();
        assert_eq!(
            reader.hget("STATIC_ROUTE|10.0.0.0/24", "bfd").await.unwrap(),
            Some("true".to_string())
        );

        connector.remove_key("STATIC_ROUTE|10.0.0.0/24");
        assert_eq!(reader.hget("STATIC_ROUTE|10.0.0.0/24", "bfd").await.unwrap(), None);
        assert_eq!(connector.connect_count(), 1);

        assert!(MemoryConfigDbConnector::unreachable().connect().await.is_err());
    }
}
