//! AutoManage core.
//!
//! Business-rule engines for a vehicle dealership: vehicle registration
//! gated by a validation pipeline, sale registration with one-sale-per-
//! vehicle enforcement, commission payroll calculation, parts stock
//! adjustment with low-stock signaling, and natural-key uniqueness
//! guards. The transport layer and storage schema live in the embedding
//! application; services talk to the store through sea-orm connections.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;
pub mod validation;

pub use errors::ServiceError;
pub use services::AppServices;
