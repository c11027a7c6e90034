//! CDP connection and session management
//!
//! `Connection` speaks to the browser endpoint (targets, version);
//! `Session` is the command channel for one attached target and the session
//! type the dispatcher validates and sends through.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::transport::Transport;
use super::types::*;
use crate::dispatch::RemoteCall;
use crate::error::Result;
use crate::page::Page;

/// A CDP connection to a running browser
pub struct Connection {
    transport: Arc<Transport>,
}

impl Connection {
    /// Attach to a browser's DevTools WebSocket endpoint.
    ///
    /// The browser must already be running with remote debugging enabled;
    /// this crate never launches or kills a browser process.
    pub fn connect(ws_url: &str) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(Transport::connect(ws_url)?),
        })
    }

    /// Browser version info. Doubles as a liveness probe after connecting.
    pub async fn version(&self) -> Result<BrowserGetVersionResult> {
        self.transport
            .send("Browser.getVersion", &BrowserGetVersion {})
            .await
    }

    /// List all targets (tabs)
    pub async fn targets(&self) -> Result<Vec<TargetInfo>> {
        let result: TargetGetTargetsResult = self
            .transport
            .send("Target.getTargets", &TargetGetTargets {})
            .await?;
        Ok(result.target_infos)
    }

    /// Create a new target (tab) at the given URL
    pub async fn create_target(&self, url: &str) -> Result<String> {
        let result: TargetCreateTargetResult = self
            .transport
            .send(
                "Target.createTarget",
                &TargetCreateTarget {
                    url: url.to_string(),
                },
            )
            .await?;
        Ok(result.target_id)
    }

    /// Attach to a target and get a session
    pub async fn attach_to_target(&self, target_id: &str) -> Result<Session> {
        let result: TargetAttachToTargetResult = self
            .transport
            .send(
                "Target.attachToTarget",
                &TargetAttachToTarget {
                    target_id: target_id.to_string(),
                    flatten: Some(true),
                },
            )
            .await?;

        Ok(Session {
            transport: Arc::clone(&self.transport),
            session_id: result.session_id,
            target_id: target_id.to_string(),
        })
    }

    /// Close a target
    pub async fn close_target(&self, target_id: &str) -> Result<bool> {
        let result: TargetCloseTargetResult = self
            .transport
            .send(
                "Target.closeTarget",
                &TargetCloseTarget {
                    target_id: target_id.to_string(),
                },
            )
            .await?;
        Ok(result.success)
    }

    /// Open a new tab at `url` and wrap it as a [`Page`]
    pub async fn open_page(&self, url: &str) -> Result<Page> {
        let target_id = self.create_target(url).await?;
        let session = self.attach_to_target(&target_id).await?;
        Ok(Page::new(session))
    }

    /// Detach from the browser. The browser itself keeps running.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }
}

/// A CDP session attached to a specific target
pub struct Session {
    transport: Arc<Transport>,
    session_id: String,
    target_id: String,
}

impl Session {
    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the target ID
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a command to this session.
    ///
    /// Crate-private: remote execution from outside flows through the
    /// dispatcher and its catalogs, never through raw commands.
    pub(crate) async fn send<C, R>(&self, method: &str, params: &C) -> Result<R>
    where
        C: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        self.transport
            .send_to_session(&self.session_id, method, params)
            .await
    }

    /// Get the document root node
    pub async fn get_document(&self, depth: Option<i32>) -> Result<DOMNode> {
        let result: DOMGetDocumentResult = self
            .send(
                "DOM.getDocument",
                &DOMGetDocument {
                    depth,
                    pierce: Some(true),
                },
            )
            .await?;
        Ok(result.root)
    }

    /// Query for a single element under `node_id`. Returns the CDP
    /// "no node" sentinel (0) when nothing matches.
    pub async fn query_selector(&self, node_id: i32, selector: &str) -> Result<i32> {
        let result: DOMQuerySelectorResult = self
            .send(
                "DOM.querySelector",
                &DOMQuerySelector {
                    node_id,
                    selector: selector.to_string(),
                },
            )
            .await?;
        Ok(result.node_id)
    }

    /// Query for all matching elements under `node_id`
    pub async fn query_selector_all(&self, node_id: i32, selector: &str) -> Result<Vec<i32>> {
        let result: DOMQuerySelectorAllResult = self
            .send(
                "DOM.querySelectorAll",
                &DOMQuerySelectorAll {
                    node_id,
                    selector: selector.to_string(),
                },
            )
            .await?;
        Ok(result.node_ids)
    }
}

#[async_trait]
impl RemoteCall for Session {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.send(method, &params).await
    }

    fn is_open(&self) -> bool {
        self.transport.is_open()
    }
}
