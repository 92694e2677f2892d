//! Backend service handlers for host-driven requests.
//!
//! This module groups async request handlers that operate on the shared
//! `AppContext`, start or finish enrichments, and report back to the host.

pub mod config_service;
pub mod enrichment_service;

/// Represents a type that is used in all handlers as an application context.
pub(crate) type AppContextHandle = std::sync::Arc<crate::app::AppContext>;
