use serde::{Deserialize, Serialize};

/// One finalized outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Monotonic per-process call id.
    pub id: u64,
    pub provider: String,
    /// `"<tool>.<operation>"` when the call came through a tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub operation: String,
    pub method: String,
    pub endpoint: String,
    /// Epoch milliseconds.
    pub started_at_ms: u64,
    /// Epoch milliseconds.
    pub ended_at_ms: u64,
    /// HTTP status, or `0` when no response was received.
    pub status: u16,
    pub success: bool,
    pub rate_limited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallRecord {
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.ended_at_ms.saturating_sub(self.started_at_ms)
    }

    /// Label used for per-tool aggregates: the tool name, or the bare
    /// operation for calls made outside a tool.
    #[must_use]
    pub fn tool_label(&self) -> &str {
        self.tool.as_deref().unwrap_or(&self.operation)
    }
}

/// Current epoch time in milliseconds.
#[must_use]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
