//! # Swarmgate
//!
//! A multi-tenant task delivery and governance engine for autonomous agent
//! swarms.
//!
//! This library provides:
//! - A reliable tenant-scoped task queue with consumer-group semantics
//!   (at-least-once delivery, idle-time reclaim for crash recovery)
//! - The task lifecycle state machine and its validation invariants
//! - A Judge safety gate with a strict log-before-commit ordering guarantee
//! - A human-in-the-loop review lifecycle with operator decisions feeding
//!   back into task status
//! - Budget-enforced commerce governance with a per-tenant spend ledger
//! - A sequential skill-workflow runner that short-circuits on failure
//!
//! ## Task Flow
//!
//! ```text
//! Planner ──enqueue──> TaskQueue ──dequeue──> Worker ──result──> Judge
//!                                                                  │
//!                      approve: SUCCEEDED  <──────────────────────┤
//!                      deny:    BLOCKED    <──────────────────────┤
//!                      hitl:    NEEDS_REVIEW ──> ReviewService ───┘
//!                                                (operator decision
//!                                                 resumes or blocks)
//! ```
//!
//! External collaborators (LLM backends, MCP servers, commerce execution,
//! durable storage) sit behind ports and are injected at construction time.
//!
//! ## Modules
//! - `model`: tasks, results, reviews, heartbeats, ledger entries
//! - `queue`: the delivery primitive and its in-memory implementation
//! - `judge`: gate decisions, policies, and outcome persistence
//! - `budget`: CFO policy and budget-enforcing commerce decoration
//! - `skills`: skill framework and the sequential workflow runner

pub mod audit;
pub mod budget;
pub mod config;
pub mod judge;
pub mod llm;
pub mod mcp;
pub mod model;
pub mod orchestrator;
pub mod planner;
pub mod queue;
pub mod registry;
pub mod review;
pub mod safety;
pub mod session;
pub mod skills;
pub mod telemetry;
pub mod worker;

pub use config::EngineConfig;
pub use orchestrator::{Orchestrator, TaskOutcome};
pub use planner::Planner;
pub use worker::Worker;
