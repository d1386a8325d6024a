// src/api/ws/mod.rs
// WebSocket streaming plane: the voice channel at `/ws/voice` (§6).

pub mod message;
pub mod stt;
pub mod voice;

pub use message::{WsClientMessage, WsServerMessage};
