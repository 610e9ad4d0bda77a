//! Dealership inventory acquisition.
//!
//! This crate owns the async half of the pipeline: the [`adapters`] that pull
//! raw vehicle rows from dealership sites, the pure [`normalizer`] that turns
//! those rows into the canonical representation, and the [`orchestrator`] that
//! drives many adapters concurrently while streaming structured progress
//! events to observers. Durable storage and order resolution live in the
//! `order_engine` crate, which consumes the batches this crate produces.

pub mod adapters;
pub mod errors;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
