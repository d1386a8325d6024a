// src/api/http/mod.rs
// Resource-group handlers for the HTTP control plane (§6). Duplicate
// endpoint layers from the source are collapsed to one canonical surface
// per resource group (Open Question b).

pub mod conversations;
pub mod files;
pub mod index;
pub mod memory;
pub mod project;
pub mod prompt;

use serde::Serialize;

/// Every response carries `{ok: bool, ...}`; errors set `ok: false` and
/// include an `error` string (§6).
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl Envelope<()> {
    pub fn err(error: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(error.into()) }
    }
}
