//! Client side of the offshell agent.
//!
//! This crate provides the HTTP fetch pipeline and the agent engine that
//! keeps the durable cache in line with the manifest and answers
//! intercepted requests from it.

pub mod agent;
pub mod fetch;

pub use agent::{
    Agent, CacheSynchronizer, DebugLog, Interception, Lifecycle, OutboundRequest, Phase, ReapReport,
    RequestInterceptor, Served, StaleEntryReaper, SyncReport,
};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
