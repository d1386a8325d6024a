// src/context/mod.rs
// C8 (Context Gatherer) and C9 (Context Assembler) - the per-request
// evidence bundle and its token-budgeted packing into a prompt (§4.7-4.8).

pub mod assembler;
pub mod gatherer;

pub use assembler::{AssembledContext, ContextAssembler, ContextItem, DEFAULT_MAX_TOKENS, Intent, ItemCategory};
pub use gatherer::{ContextGatherer, FileContext, GatherRequest, RelevantSnippet};
