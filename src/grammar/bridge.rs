//! Request/response correlation with an asynchronous asset host.
//!
//! Each request gets a fresh id and a pending entry holding its responder.
//! The host answers through [`AssetBridge::resolve`]; answers for ids that
//! are no longer pending (timed out, or never issued) are dropped.
use super::{AssetDefinition, AssetKind};
use crate::error::{Result, RfscopeError};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub request_id: u64,
    pub kind: AssetKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    pub request_id: u64,
    pub result: std::result::Result<AssetDefinition, String>,
}

/// Delivers requests to whatever hosts the assets.
#[async_trait]
pub trait AssetTransport: Send + Sync {
    async fn send(&self, request: AssetRequest) -> Result<()>;
}

/// Transport over an in-process channel, served by
/// [`serve_catalog`](super::builtin::serve_catalog).
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<AssetRequest>,
}

impl ChannelTransport {
    pub fn new(sender: mpsc::UnboundedSender<AssetRequest>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl AssetTransport for ChannelTransport {
    async fn send(&self, request: AssetRequest) -> Result<()> {
        let id = request.id.clone();
        self.sender.send(request).map_err(|_| RfscopeError::AssetLoad {
            id,
            reason: "asset host has shut down".to_string(),
        })
    }
}

pub struct AssetBridge {
    transport: Arc<dyn AssetTransport>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<AssetResponse>>>,
    timeout: Duration,
}

impl AssetBridge {
    pub fn new(transport: Arc<dyn AssetTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub async fn request(&self, kind: AssetKind, id: &str) -> Result<AssetDefinition> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (responder, response) = oneshot::channel();
        self.pending.lock().insert(request_id, responder);

        let request = AssetRequest {
            request_id,
            kind,
            id: id.to_string(),
        };
        if let Err(e) = self.transport.send(request).await {
            self.pending.lock().remove(&request_id);
            return Err(e);
        }

        let failure = |reason: String| RfscopeError::AssetLoad {
            id: format!("{kind}:{id}"),
            reason,
        };
        match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(response)) => response.result.map_err(failure),
            Ok(Err(_)) => {
                self.pending.lock().remove(&request_id);
                Err(failure("asset host dropped the request".to_string()))
            }
            Err(_) => {
                self.pending.lock().remove(&request_id);
                Err(failure(format!("no response within {:?}", self.timeout)))
            }
        }
    }

    /// Hands a host answer to the waiting request. Returns `false` when no
    /// request with that id is pending.
    pub fn resolve(&self, response: AssetResponse) -> bool {
        let responder = self.pending.lock().remove(&response.request_id);
        match responder {
            Some(responder) => responder.send(response).is_ok(),
            None => {
                debug!("Dropping response for unknown request {}", response.request_id);
                false
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::LanguageDefinition;

    /// Records requests and never answers.
    #[derive(Default)]
    struct SilentTransport {
        seen: Mutex<Vec<AssetRequest>>,
    }

    #[async_trait]
    impl AssetTransport for SilentTransport {
        async fn send(&self, request: AssetRequest) -> Result<()> {
            self.seen.lock().push(request);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_timeout_clears_pending_entry() {
        let transport = Arc::new(SilentTransport::default());
        let bridge = AssetBridge::new(transport.clone(), Duration::from_millis(20));

        let err = bridge.request(AssetKind::Theme, "dark").await.unwrap_err();
        assert!(matches!(err, RfscopeError::AssetLoad { .. }));
        assert_eq!(bridge.pending_count(), 0);

        // The late answer has nowhere to go.
        let request_id = transport.seen.lock()[0].request_id;
        let late = AssetResponse {
            request_id,
            result: Err("too late".to_string()),
        };
        assert!(!bridge.resolve(late));
    }

    #[tokio::test]
    async fn test_response_is_routed_by_request_id() {
        let transport = Arc::new(SilentTransport::default());
        let bridge = Arc::new(AssetBridge::new(transport.clone(), Duration::from_secs(5)));

        let waiting = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.request(AssetKind::Language, "rust").await })
        };
        while transport.seen.lock().is_empty() {
            tokio::task::yield_now().await;
        }

        let request_id = transport.seen.lock()[0].request_id;
        let definition = AssetDefinition::Language(LanguageDefinition {
            id: "rust".to_string(),
            ..LanguageDefinition::plaintext()
        });
        assert!(!bridge.resolve(AssetResponse {
            request_id: request_id + 100,
            result: Ok(definition.clone()),
        }));
        assert!(bridge.resolve(AssetResponse {
            request_id,
            result: Ok(definition.clone()),
        }));

        assert_eq!(waiting.await.unwrap().unwrap(), definition);
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_channel_fails_fast() {
        let (sender, receiver) = mpsc::unbounded_channel();
        drop(receiver);
        let bridge = AssetBridge::new(Arc::new(ChannelTransport::new(sender)), Duration::from_secs(5));

        assert!(bridge.request(AssetKind::Language, "go").await.is_err());
        assert_eq!(bridge.pending_count(), 0);
    }
}
