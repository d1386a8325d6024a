// src/api/ws/message.rs
// Client/server WebSocket message protocol for the voice channel (§6).

use serde::{Deserialize, Serialize};

/// Messages the client sends over `/ws/voice` as JSON text frames.
/// Binary frames (raw audio chunks) are handled separately, outside
/// this enum.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    EndAudio {
        mimetype: String,
    },
    TextCommand {
        text: String,
        context: Option<serde_json::Value>,
        #[serde(default)]
        skip_tts: bool,
    },
    AgenticCommand {
        text: String,
        file_path: Option<String>,
        file_content: Option<String>,
        cursor_line: Option<u32>,
        selection: Option<String>,
        project_root: Option<String>,
        error_message: Option<String>,
        mode: Option<String>,
        #[serde(default)]
        skip_tts: bool,
    },
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Reading,
    Generating,
    Done,
}

/// Messages the server sends back over `/ws/voice`, in order per request:
/// `action`, zero or more `llm_chunk`, optional `tts_start`/binary/`tts_done`,
/// finally `response_complete`. `intent`/`agent_result`/`activity` frames
/// interleave for agentic commands (§6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    Connected {
        message: String,
    },
    Pong,
    Error {
        message: String,
    },
    Action {
        name: String,
    },
    LlmChunk {
        text: String,
    },
    TtsStart,
    TtsDone,
    Intent {
        intent: String,
    },
    AgentResult {
        result: serde_json::Value,
    },
    Activity {
        status: ActivityStatus,
        message: String,
        files: Vec<String>,
    },
    ResponseComplete {
        intent: String,
        response_text: String,
        error: Option<String>,
    },
}
