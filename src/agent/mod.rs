//! Agent module for Toolloop
//!
//! This module contains the per-invocation conversation, the bounded
//! tool-calling loop, and its metrics.

pub mod conversation;
pub mod core;
pub mod metrics;

pub use conversation::Conversation;
pub use core::{Agent, AgentOutcome, LoopResult, LoopState, EXHAUSTED_MESSAGE};
