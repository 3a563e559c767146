//! Versioned command/response/event envelopes for the host message channel.

use serde::{Deserialize, Serialize};

/// Contract version for command/response/event envelopes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Command set for the memory host channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "memory.save")]
    MemorySave,
    #[serde(rename = "memory.check")]
    MemoryCheck,
    #[serde(rename = "memory.find")]
    MemoryFind,
    #[serde(rename = "memory.list")]
    MemoryList,
    #[serde(rename = "memory.export")]
    MemoryExport,
    #[serde(rename = "memory.import")]
    MemoryImport,
    #[serde(rename = "memory.delete")]
    MemoryDelete,
    #[serde(rename = "memory.toggle_get")]
    MemoryToggleGet,
    #[serde(rename = "memory.toggle_set")]
    MemoryToggleSet,
    #[serde(rename = "badge.update")]
    BadgeUpdate,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::MemorySave => "memory.save",
            Self::MemoryCheck => "memory.check",
            Self::MemoryFind => "memory.find",
            Self::MemoryList => "memory.list",
            Self::MemoryExport => "memory.export",
            Self::MemoryImport => "memory.import",
            Self::MemoryDelete => "memory.delete",
            Self::MemoryToggleGet => "memory.toggle_get",
            Self::MemoryToggleSet => "memory.toggle_set",
            Self::BadgeUpdate => "badge.update",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "host.version" => Some(Self::HostVersion),
            "memory.save" => Some(Self::MemorySave),
            "memory.check" => Some(Self::MemoryCheck),
            "memory.find" => Some(Self::MemoryFind),
            "memory.list" => Some(Self::MemoryList),
            "memory.export" => Some(Self::MemoryExport),
            "memory.import" => Some(Self::MemoryImport),
            "memory.delete" => Some(Self::MemoryDelete),
            "memory.toggle_get" => Some(Self::MemoryToggleGet),
            "memory.toggle_set" => Some(Self::MemoryToggleSet),
            "badge.update" => Some(Self::BadgeUpdate),
            _ => None,
        }
    }
}

/// A versioned command envelope from a tab or UI context to the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != PROTOCOL_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, PROTOCOL_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned response envelope from the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned fire-and-forget event envelope from the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ContractError {}
