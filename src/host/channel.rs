//! Host command channel and router.
//!
//! Tab and UI contexts hold a [`HostClient`]; the background context runs a
//! [`HostServer`] that routes command envelopes to a
//! [`MemoryHostHandler`](super::handler::MemoryHostHandler). Requests travel
//! over an mpsc channel with oneshot replies; fire-and-forget notifications
//! go out on a broadcast channel.

use super::contract::{CommandEnvelope, CommandName, EventEnvelope, PROTOCOL_VERSION, ResponseEnvelope};
use super::handler::MemoryHostHandler;
use crate::controller::MemoryLink;
use crate::error::{Result, VolumaError};
use crate::identity::VideoIdentity;
use crate::memory::{MemoryRecord, SaveOutcome};
use crate::tabs::TabId;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

struct HostRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

/// Client half of the host command channel.
#[derive(Clone)]
pub struct HostClient {
    request_tx: mpsc::Sender<HostRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostClient {
    /// Dispatch a command envelope and await the response.
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            VolumaError::Validation(format!(
                "invalid command envelope {}: {e}",
                envelope.request_id
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| VolumaError::Channel(format!("failed to send host command: {e}")))?;

        response_rx
            .await
            .map_err(|e| VolumaError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

/// Server half of the host command channel.
pub struct HostServer<H: MemoryHostHandler> {
    request_rx: mpsc::Receiver<HostRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    handler: H,
}

/// Create a connected client/server pair.
#[must_use]
pub fn command_channel<H: MemoryHostHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (HostClient, HostServer<H>) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostServer {
            request_rx,
            event_tx,
            handler,
        },
    )
}

impl<H: MemoryHostHandler> HostServer<H> {
    /// Route requests until every client is gone.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let response = self.route(&request.envelope).await;
            let _ = request.response_tx.send(response);
        }
    }

    /// Route a command envelope to the handler.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = envelope.request_id.clone();
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(id, json!({"pong": true}))),
            CommandName::HostVersion => Ok(ResponseEnvelope::ok(
                id,
                json!({
                    "protocol_version": PROTOCOL_VERSION,
                    "channel": "memory_host_v1",
                }),
            )),
            CommandName::MemorySave => {
                let url = str_field(&envelope.payload, "url")?;
                let volume = u32_field(&envelope.payload, "volume")?;
                let is_muted = bool_field(&envelope.payload, "isMuted").unwrap_or(false);
                let title = envelope
                    .payload
                    .get("videoTitle")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                let outcome = self.handler.save(url, volume, is_muted, title).await?;
                Ok(ResponseEnvelope::ok(
                    id,
                    json!({"success": true, "saved": outcome.saved}),
                ))
            }
            CommandName::MemoryCheck => {
                let url = str_field(&envelope.payload, "url")?;
                let has_memory = self.handler.check(url).await?;
                Ok(ResponseEnvelope::ok(id, json!({"hasMemory": has_memory})))
            }
            CommandName::MemoryFind => {
                let url = str_field(&envelope.payload, "url")?;
                let record = self.handler.find(url).await?;
                let payload = serde_json::to_value(record)
                    .map_err(|e| VolumaError::Storage(format!("cannot encode record: {e}")))?;
                Ok(ResponseEnvelope::ok(id, payload))
            }
            CommandName::MemoryList => {
                let settings = self.handler.list().await?;
                let payload = serde_json::to_value(&settings)
                    .map_err(|e| VolumaError::Storage(format!("cannot encode settings: {e}")))?;
                Ok(ResponseEnvelope::ok(id, json!({"settings": payload})))
            }
            CommandName::MemoryExport => {
                let bundle = self.handler.export().await?;
                let data = serde_json::to_value(&bundle)
                    .map_err(|e| VolumaError::Storage(format!("cannot encode bundle: {e}")))?;
                Ok(ResponseEnvelope::ok(id, json!({"success": true, "data": data})))
            }
            CommandName::MemoryImport => {
                let imported = self.handler.import(&envelope.payload).await?;
                Ok(ResponseEnvelope::ok(
                    id,
                    json!({"success": true, "importedCount": imported}),
                ))
            }
            CommandName::MemoryDelete => {
                let identities: Vec<VideoIdentity> = envelope
                    .payload
                    .get("identities")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        VolumaError::Validation("`identities` must be a list".into())
                    })?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(VideoIdentity::from_raw)
                    .collect();
                let deleted = self.handler.delete(&identities).await?;
                Ok(ResponseEnvelope::ok(
                    id,
                    json!({"success": true, "deletedCount": deleted}),
                ))
            }
            CommandName::MemoryToggleGet => {
                let enabled = self.handler.memory_enabled().await?;
                Ok(ResponseEnvelope::ok(id, json!({"enabled": enabled})))
            }
            CommandName::MemoryToggleSet => {
                let enabled = bool_field(&envelope.payload, "enabled")?;
                self.handler.set_memory_enabled(enabled).await?;
                Ok(ResponseEnvelope::ok(id, json!({"success": true})))
            }
            CommandName::BadgeUpdate => {
                let tab = TabId(u64::from(u32_field(&envelope.payload, "tabId")?));
                let volume = u32_field(&envelope.payload, "volume")?;
                let is_muted = bool_field(&envelope.payload, "isMuted").unwrap_or(false);
                self.handler.badge_update(tab, volume, is_muted);
                self.emit_event(
                    "badge.updated",
                    json!({"tabId": tab, "volume": volume, "isMuted": is_muted}),
                );
                Ok(ResponseEnvelope::ok(id, json!({"success": true})))
            }
        }
    }

    fn emit_event(&self, event: &str, payload: Value) {
        let envelope = EventEnvelope::new(Uuid::new_v4().to_string(), event, payload);
        let _ = self.event_tx.send(envelope);
    }
}

fn str_field<'a>(payload: &'a Value, field: &str) -> Result<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| VolumaError::Validation(format!("`{field}` must be a string")))
}

fn u32_field(payload: &Value, field: &str) -> Result<u32> {
    payload
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| VolumaError::Validation(format!("`{field}` must be a non-negative integer")))
}

fn bool_field(payload: &Value, field: &str) -> Result<bool> {
    payload
        .get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| VolumaError::Validation(format!("`{field}` must be a boolean")))
}

/// How long the controller waits for a persistence response before treating
/// the backend as failed. A transport that never answers must not be able to
/// park a save forever.
const MEMORY_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// The client is the controller's persistence collaborator: saves and
/// lookups travel over the same envelopes the rest of the surface uses.
#[async_trait]
impl MemoryLink for HostClient {
    async fn save(
        &self,
        url: &str,
        volume_percent: u32,
        is_muted: bool,
        title: Option<String>,
    ) -> Result<SaveOutcome> {
        let payload = json!({
            "url": url,
            "volume": volume_percent,
            "isMuted": is_muted,
            "videoTitle": title,
        });
        let envelope = CommandEnvelope::new(
            Uuid::new_v4().to_string(),
            CommandName::MemorySave,
            payload,
        );
        let response = tokio::time::timeout(MEMORY_RESPONSE_TIMEOUT, self.send(envelope))
            .await
            .map_err(|_| VolumaError::Storage("memory save timed out".into()))??;
        let saved = response
            .payload
            .get("saved")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(SaveOutcome { saved })
    }

    async fn find(&self, url: &str) -> Result<Option<MemoryRecord>> {
        let envelope = CommandEnvelope::new(
            Uuid::new_v4().to_string(),
            CommandName::MemoryFind,
            json!({"url": url}),
        );
        let response = tokio::time::timeout(MEMORY_RESPONSE_TIMEOUT, self.send(envelope))
            .await
            .map_err(|_| VolumaError::Storage("memory lookup timed out".into()))??;
        serde_json::from_value(response.payload)
            .map_err(|e| VolumaError::Validation(format!("malformed find response: {e}")))
    }
}
