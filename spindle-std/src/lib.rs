//! # spindle-std
//!
//! Standard implementations for the Spindle script/event bridge.
//!
//! This crate provides:
//! - **Type conversion**: [`types::TypeRegistry`], [`types::TypeInfo`]
//! - **Wrapper registry**: [`wrappers::WrapperRegistry`]
//! - **Pattern registry**: [`syntax::SyntaxRegistry`] and the pattern compiler
//! - **Event values**: [`event_values::EventValues`]
//! - **Secondary dispatcher**: [`dispatch::Dispatcher`]
//! - **Event bridge**: [`bridge::Bridge`], [`bus::SimpleEventBus`]
//! - **Scheduling**: [`scheduler::Scheduler`] and tickers
//! - **Context**: [`context::ContextBuilder`], [`context::BridgeContext`]
//!
//! # Lifecycle
//!
//! Everything is registered into a [`context::ContextBuilder`]. Sealing it
//! freezes the type, wrapper, syntax and event-value registries; handlers can
//! still be added until the sealed context is finished, which freezes the
//! dispatcher. From then on every structure is read-only.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use spindle_core;

// Modules
pub mod bridge;
pub mod bus;
pub mod context;
pub mod dispatch;
pub mod event_values;
pub mod scheduler;
pub mod syntax;
pub mod testing;
pub mod types;
pub mod wrappers;
