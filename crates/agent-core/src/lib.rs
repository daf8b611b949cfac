//! # agent-core
//!
//! Bounded agentic control loop with a pluggable reasoner, a validated tool
//! registry and checkpointed conversations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ConversationRunner                        │
//! │  ┌──────────────────────────────────────┐  ┌──────────────┐  │
//! │  │                Agent                 │  │  Checkpoint  │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────┐  │──│    Store     │  │
//! │  │  │ Reasoner │ │ Executor │ │ Tool │  │  └──────────────┘  │
//! │  │  │(Strategy)│ │          │─│ Reg. │  │                    │
//! │  │  └──────────┘ └──────────┘ └──────┘  │                    │
//! │  └──────────────────────────────────────┘                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `Reasoner` trait is the only boundary to a language-model service;
//! vendor adapters implement it outside this crate. [`mock::ScriptedReasoner`]
//! drives the loop deterministically in tests.

pub mod checkpoint;
pub mod conversation;
pub mod error;
pub mod executor;
pub mod message;
pub mod mock;
pub mod reasoner;
pub mod reasoning;
pub mod state;
pub mod tool;

pub use checkpoint::{Checkpoint, CheckpointStore, ConversationId, MemoryCheckpointStore};
pub use conversation::{ConversationRunner, TurnOutcome};
pub use error::{AgentError, Result};
pub use executor::ToolExecutor;
pub use message::{Message, Role};
pub use reasoner::{GenerationOptions, Reasoner, ReasonerOutput};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, ForceReason, Outcome, StepHook, Termination, ToolBound};
pub use state::{State, StateUpdate};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
