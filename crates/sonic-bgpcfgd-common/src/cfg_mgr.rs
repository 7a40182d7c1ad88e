//! Command channel to FRR.
//!
//! Managers append configuration lines with [`ConfigMgr::push_list`];
//! the daemon flushes them on its commit cadence, and shutdown paths
//! force a synchronous [`ConfigMgr::commit`].

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{BgpCfgError, BgpCfgResult};
use crate::shell;

/// Command channel shared between managers and the daemon loop.
pub type SharedConfigMgr = Arc<Mutex<dyn ConfigMgr>>;

/// Queue of FRR configuration lines awaiting commit.
#[async_trait]
pub trait ConfigMgr: Send {
    /// Appends lines to the pending batch, preserving order.
    fn push_list(&mut self, lines: Vec<String>);

    /// Returns the lines not yet committed.
    fn pending(&self) -> &[String];

    /// Flushes the pending batch to FRR.
    ///
    /// Returns `Ok(false)` when FRR rejected the batch. The batch is
    /// dropped either way; retrying is up to the caller.
    async fn commit(&mut self) -> BgpCfgResult<bool>;
}

/// [`ConfigMgr`] that loads batches through `vtysh -f`.
pub struct VtyshConfigMgr {
    vtysh: String,
    pending: Vec<String>,

    #[cfg(test)]
    mock_mode: bool,
    #[cfg(test)]
    captured_batches: Vec<String>,
}

impl VtyshConfigMgr {
    /// Creates a channel using the vtysh binary at `vtysh`.
    pub fn new(vtysh: impl Into<String>) -> Self {
        Self {
            vtysh: vtysh.into(),
            pending: Vec::new(),
            #[cfg(test)]
            mock_mode: false,
            #[cfg(test)]
            captured_batches: Vec::new(),
        }
    }

    /// Wraps the channel for sharing between managers.
    pub fn shared(self) -> SharedConfigMgr {
        Arc::new(Mutex::new(self))
    }

    fn render(&self) -> String {
        let mut content = self.pending.join("\n");
        content.push('\n');
        content
    }

    async fn load(&self, content: &str) -> BgpCfgResult<bool> {
        let mut file = tempfile::Builder::new()
            .prefix("bgpcfgd-")
            .suffix(".conf")
            .tempfile()
            .map_err(|e| BgpCfgError::internal(format!("cannot create batch file: {}", e)))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BgpCfgError::internal(format!("cannot write batch file: {}", e)))?;

        let path = file.path().to_string_lossy().into_owned();
        let cmd = shell::build_vtysh_load_cmd(&self.vtysh, &path);
        match shell::exec_or_throw(&cmd).await {
            Ok(_) => Ok(true),
            Err(BgpCfgError::ShellCommandFailed { output, .. }) => {
                error!("vtysh rejected configuration batch: {}", output);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(test)]
    pub fn with_mock_mode(mut self) -> Self {
        self.mock_mode = true;
        self
    }

    #[cfg(test)]
    pub fn captured_batches(&self) -> &[String] {
        &self.captured_batches
    }
}

#[async_trait]
impl ConfigMgr for VtyshConfigMgr {
    fn push_list(&mut self, lines: Vec<String>) {
        self.pending.extend(lines);
    }

    fn pending(&self) -> &[String] {
        &self.pending
    }

    async fn commit(&mut self) -> BgpCfgResult<bool> {
        if self.pending.is_empty() {
            return Ok(true);
        }

        let content = self.render();
        let count = self.pending.len();
        self.pending.clear();

        #[cfg(test)]
        if self.mock_mode {
            self.captured_batches.push(content);
            return Ok(true);
        }

        debug!("Committing {} configuration lines", count);
        let ok = self.load(&content).await?;
        if ok {
            info!("Committed {} configuration lines to FRR", count);
        }
        Ok(ok)
    }
}
