//! # relay
//!
//! The turn-execution engine of a local conversational assistant: given a
//! user message, runs a directed graph of typed nodes, streaming a strictly
//! ordered sequence of events (node spans, thinking/assistant deltas, tool
//! calls, world commits, errors) to a consumer.
//!
//! ## Design principles
//!
//! - **One state type, state-in/state-out**: [`state::TurnState`] flows
//!   through every node in the compiled graph; nodes each own a disjoint
//!   sub-tree of it.
//! - **Typed event stream**: every observable thing a turn does is an
//!   [`event::EventKind`] wrapped in an [`event::Event`] envelope with a
//!   strictly monotonic `seq`, carried by the single-producer/single-consumer
//!   [`event::EventBus`].
//! - **Capability firewall**: a node never sees a tool the [`skills`] policy
//!   doesn't grant it; the tool loop only ever calls what the firewall
//!   resolved for that node.
//! - **Streaming provider, buffering node**: [`llm::LlmProvider`] streams
//!   deltas as they arrive; only structured-output nodes (router, reflect
//!   topics) buffer the full text to parse it as JSON via [`json_extract`].
//!
//! ## Main modules
//!
//! - [`graph`]: [`graph::StateGraph`], [`graph::CompiledStateGraph`],
//!   [`graph::Node`], [`graph::Next`] — build and run the turn graph.
//! - [`graph_builder`]: [`graph_builder::build_graph`] — the seven-node
//!   graph wired per the routing contract (Router → Context/World/Answer →
//!   Reflect Topics → Memory Writer).
//! - [`state`]: [`state::TurnState`] and its `task`/`runtime`/`context`/
//!   `final_`/`world` sub-trees.
//! - [`event`]: [`event::Event`], [`event::EventKind`], [`event::EventBus`].
//! - [`emitter`]: [`emitter::Emitter`], [`emitter::Span`] — the node-facing
//!   façade over the bus.
//! - [`runner`]: [`runner::run_turn`] — orchestrates one turn end to end.
//! - [`nodes`]: the seven node kinds (router, context builder, memory
//!   retriever, world modifier, answer, reflect topics, memory writer).
//! - [`tool_loop`]: [`tool_loop::run_tool_loop`] — drives provider↔tools
//!   until a final assistant message or the step cap.
//! - [`llm`]: [`llm::LlmProvider`] trait, [`llm::OllamaProvider`],
//!   [`llm::ScriptedProvider`] (test double).
//! - [`mcp`]: [`mcp::McpSession`] — streamable-HTTP JSON-RPC client.
//! - [`tools`]: [`tools::Tool`] trait, [`tools::ToolRegistry`],
//!   [`tools::McpToolAdapter`], and the built-in [`tools::bindings`].
//! - [`skills`]: the skill catalog and node→skill policy firewall.
//! - [`world_state`]: [`world_state::WorldStateStore`] and allowlisted
//!   `apply_op`.
//! - [`chat_history`]: [`chat_history::ChatHistory`] — append-only JSONL log.
//! - [`prompt`]: [`prompt::render_prompt`], [`prompt::TemplateLoader`].
//! - [`json_extract`]: [`json_extract::extract_first_json_object`] — first
//!   balanced `{...}` object from noisy text.
//! - [`services`]: [`services::Deps`], [`services::Services`] — long-lived
//!   wiring shared across turns.
//! - [`message`]: [`message::Message`] (system/user/assistant/tool).
//! - [`error`]: [`error::EngineError`] — the engine-wide error taxonomy.

pub mod chat_history;
pub mod emitter;
pub mod error;
pub mod event;
pub mod graph;
pub mod graph_builder;
pub mod json_extract;
pub mod llm;
pub mod mcp;
pub mod message;
pub mod nodes;
pub mod prompt;
pub mod runner;
pub mod services;
pub mod skills;
pub mod state;
pub mod tool_loop;
pub mod tools;
pub mod world_state;

pub use chat_history::{ChatHistory, HistoryEntry, ROLE_HUMAN, ROLE_YOU};
pub use emitter::{Emitter, Span};
pub use error::EngineError;
pub use event::{Event, EventBus, EventKind};
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, END, START};
pub use graph_builder::build_graph;
pub use json_extract::extract_first_json_object;
pub use llm::{ChatParams, ChatRequest, LlmProvider, OllamaProvider, ProviderEvent, ResponseFormat, ScriptedProvider};
pub use mcp::McpSession;
pub use message::Message;
pub use prompt::{render_prompt, TemplateLoader};
pub use runner::{run_turn, TurnOutcome};
pub use services::{Deps, Role, RoleConfig, Services};
pub use state::{Context, Final, Identity, MemoryRequest, Runtime, Source, Task, TurnState, World};
pub use tool_loop::{run_tool_loop, ToolLoopOutcome};
pub use tools::{Tool, ToolCallContent, ToolCallContext, ToolRegistry, ToolRegistryLocked, ToolSourceError, ToolSpec};
pub use world_state::{apply_op, default_world, WorldOp, WorldOpKind, WorldStateStore};
