//! # Faraday - EV Charging Session Telemetry Engine
//!
//! Ingests per-row electrical telemetry for an EV charging session from a
//! remote client over an RPC boundary, validates each sample, persists it
//! durably and performs online anomaly analytics, notifying observers of
//! lifecycle and warning events.
//!
//! ## Architecture
//!
//! The crate follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `sample`: Telemetry row wire type
//! - `validator`: Pure per-sample rule checks
//! - `analytics`: Online analytics over the accepted-sample stream
//! - `session_log`: Append-only durable CSV logs
//! - `events`: Synchronous observer notification
//! - `controller`: Session lifecycle state machine
//! - `service`: RPC contract and server-side service
//! - `sender`: Client-side resilient row sender
//! - `web`: HTTP JSON transport

pub mod analytics;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod sample;
pub mod sender;
pub mod service;
pub mod session_log;
pub mod validator;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use controller::SessionController;
pub use error::{FaradayError, FaultInfo, Result};
pub use sample::ChargingSample;
pub use service::{ChargingService, SessionService};
