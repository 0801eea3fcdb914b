//! # Naiad - WaterSmart Utility Portal Bridge
//!
//! A Rust bridge between a VertexOne WaterSmart utility portal and local
//! time-series storage, periodically reconciling hourly and daily water-usage
//! readings into append-only points and aggregated statistics.
//!
//! ## Features
//!
//! - **Incremental Reconciliation**: Cursor-based merging keeps re-fetches
//!   of the portal's year-long exports idempotent
//! - **DST-Safe Rollups**: Bucket boundaries computed on the local wall
//!   clock, with cumulative sums that reset at period boundaries
//! - **Leak Smoothing**: Sliding-window minimum for the computed leak series
//! - **Coalesced Scheduling**: Fixed-interval cycles with debounced manual
//!   refreshes, one in-flight cycle per account
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `portal`: WaterSmart portal HTTP client
//! - `readings`: Timestamp normalization and time bucketing
//! - `reconcile`: Incremental point reconciliation
//! - `rollup`: Bucket rollup statistics
//! - `catalog`: Output series definitions
//! - `store`: Point and statistics stores
//! - `coordinator`: Per-cycle orchestration
//! - `scheduler`: Periodic scheduling with refresh coalescing

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod portal;
pub mod readings;
pub mod reconcile;
pub mod rollup;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::UsageCoordinator;
pub use error::{NaiadError, Result};
