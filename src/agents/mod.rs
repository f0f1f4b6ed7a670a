//! Agent implementations.
//!
//! The [`react`] module holds the ReAct loop: a model decides, tools act, and
//! the loop repeats until the model answers without requesting tools.

pub mod react;

pub use react::{AgentConfig, AgentResponse, AgentRun, LoopPhase, ReactAgent, Step};
