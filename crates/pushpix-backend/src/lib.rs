//! Backend runtime entry point and public API surface.
//!
//! This crate owns the backend lifecycle, routes bridge messages to services,
//! and hosts the [`enricher`] that attaches downloaded pictures to incoming
//! notifications under the host's deadline.

mod app;
pub mod config;
pub mod enricher;
mod runtime;
mod services;
mod state;

pub use crate::runtime::run;
