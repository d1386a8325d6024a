// src/api/ws/voice.rs
// `/ws/voice`: one task per connection, driving client frames through
// the orchestrator and streaming back action/llm_chunk/activity/
// response_complete frames in order (§6).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::Sink;
use futures_util::SinkExt;
use futures_util::stream::StreamExt;
use tracing::{debug, warn};

use super::message::{ActivityStatus, WsClientMessage, WsServerMessage};
use super::stt::{UnavailableSttProvider, wrap_pcm_as_wav};
use crate::orchestrator::OrchestratorRequest;
use crate::state::AppState;

pub async fn handle_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let stt = UnavailableSttProvider;

    if send(&mut sender, WsServerMessage::Connected { message: "crace voice channel ready".to_string() }).await.is_err() {
        return;
    }

    let mut audio_buffer: Vec<u8> = Vec::new();

    while let Some(frame) = receiver.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "websocket receive error, closing connection");
                break;
            }
        };

        match message {
            Message::Binary(chunk) => {
                audio_buffer.extend_from_slice(&chunk);
            }
            Message::Text(text) => {
                let parsed: Result<WsClientMessage, _> = serde_json::from_str(&text);
                let client_message = match parsed {
                    Ok(m) => m,
                    Err(_) => {
                        if send(&mut sender, WsServerMessage::Error { message: "Invalid JSON".to_string() }).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                match client_message {
                    WsClientMessage::Ping => {
                        if send(&mut sender, WsServerMessage::Pong).await.is_err() {
                            break;
                        }
                    }
                    WsClientMessage::EndAudio { mimetype } => {
                        let wav = wrap_pcm_as_wav(&audio_buffer);
                        audio_buffer.clear();
                        match stt.transcribe(&wav, &mimetype).await {
                            Ok(transcript) => {
                                let request = OrchestratorRequest { text: transcript, ..Default::default() };
                                if process_request(&state, &mut sender, request, false).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, "stt unavailable, surfacing as response error");
                                let response = WsServerMessage::ResponseComplete {
                                    intent: "chat".to_string(),
                                    response_text: "I couldn't transcribe that audio.".to_string(),
                                    error: Some(e.to_string()),
                                };
                                if send(&mut sender, response).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    WsClientMessage::TextCommand { text, skip_tts, .. } => {
                        let request = OrchestratorRequest { text, ..Default::default() };
                        if process_request(&state, &mut sender, request, skip_tts).await.is_err() {
                            break;
                        }
                    }
                    WsClientMessage::AgenticCommand {
                        text,
                        file_path,
                        file_content,
                        cursor_line,
                        selection,
                        project_root,
                        error_message,
                        mode,
                        skip_tts,
                    } => {
                        let request = OrchestratorRequest {
                            text,
                            mode,
                            file_path,
                            file_content,
                            cursor_line,
                            selection,
                            project_root,
                            error_message,
                            ..Default::default()
                        };
                        if process_request(&state, &mut sender, request, skip_tts).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Runs one request through the orchestrator and streams the
/// `action`/`intent`/`activity`/`response_complete` frames the
/// transport contract promises (§6).
async fn process_request(
    state: &Arc<AppState>,
    sender: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    request: OrchestratorRequest,
    skip_tts: bool,
) -> Result<(), axum::Error> {
    send(sender, WsServerMessage::Action { name: "processing".to_string() }).await?;

    let response = state.orchestrator.run(request).await;

    send(sender, WsServerMessage::Intent { intent: response.intent.to_string() }).await?;

    for entry in &response.activity {
        let status = match entry.status {
            "reading" => ActivityStatus::Reading,
            "generating" => ActivityStatus::Generating,
            _ => ActivityStatus::Done,
        };
        send(sender, WsServerMessage::Activity { status, message: entry.message.clone(), files: entry.files.clone() }).await?;
    }

    if !skip_tts {
        send(sender, WsServerMessage::TtsStart).await?;
        send(sender, WsServerMessage::TtsDone).await?;
    }

    send(
        sender,
        WsServerMessage::ResponseComplete {
            intent: response.intent.to_string(),
            response_text: response.response_text,
            error: response.error,
        },
    )
    .await
}

async fn send(
    sender: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    message: WsServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(&message).unwrap_or_else(|_| "{\"type\":\"error\"}".to_string());
    sender.send(Message::Text(text.into())).await
}
