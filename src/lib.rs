//! gamepulse - live casino game data collection and monitoring.
//!
//! Core library: browser-driven scrapers, heuristic extraction, a
//! single-flight recurring scheduler, and upsert-by-name persistence.

// Model enums expose infallible `from_str` constructors rather than the
// Result-returning std::str::FromStr shape.
#![allow(clippy::should_implement_trait)]

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod scrapers;
