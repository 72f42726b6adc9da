#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # TrafficWise Core
//!
//! Workflow orchestration and aggregation engine for periodic city traffic and
//! air-quality evaluation.
//!
//! ## Overview
//!
//! Every run picks an evaluation timestamp (`predictFor`), gathers per-camera vehicle
//! counts and per-station air-quality forecasts, then computes and stores one result per
//! street and hands every section to the info-determination collaborator. Detection
//! and forecasting are external collaborators; this crate drives them, reads and writes
//! the keyed store, and applies the aggregation policies.
//!
//! ## Architecture
//!
//! - **Orchestrator**: a step graph of Task / Sequence / Parallel / Map nodes, validated
//!   before it runs, with per-unit timeouts, transient-failure retries and bounded fan-out
//! - **Store client**: composite-key `(PK, SK)` access with pagination, windowed queries
//!   and batched lookups
//! - **Aggregation engine**: top-N traffic load, emergency-vehicle thresholding and
//!   air-quality load
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Step graph, executor, retries and the evaluation workflow
//! - [`handlers`] - Units of work behind the workflow's Task steps
//! - [`store`] - Keyed store contract and the in-process engine
//! - [`catalog`] - Paginated entity listings
//! - [`retrieval`] - Time-windowed and batched reads
//! - [`aggregation`] - Limit policies and the per-street check
//! - [`collaborators`] - External service contracts and stubs
//! - [`models`] - Typed store records
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`seed`] - Dataset provisioning
//! - [`service`] - Evaluation entry point
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trafficwise_core::collaborators::Collaborators;
//! use trafficwise_core::config::EvaluationConfig;
//! use trafficwise_core::service::EvaluationService;
//! use trafficwise_core::store::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EvaluationConfig::default();
//! let store = Arc::new(InMemoryStore::new(config.store.page_size));
//! let service = EvaluationService::new(store, Collaborators::stubs(), &config)?;
//!
//! let report = service.evaluate(Some(1_700_000_000)).await;
//! println!("run succeeded: {}", report.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod aggregation;
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod retrieval;
pub mod seed;
pub mod service;
pub mod store;

pub use config::{ConfigManager, EvaluationConfig};
pub use error::{Result, TrafficError};
pub use orchestration::{OrchestrationError, OrchestrationResult, RunReport};
pub use service::EvaluationService;
