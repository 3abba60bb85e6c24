//! Test utilities for Skirm development.
//!
//! Provides deterministic [`fixtures`] for frames, units, and maps,
//! plus [`MockEngine`], a scripted in-process TCP engine that session
//! tests connect to.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod mock_engine;

pub use mock_engine::{MockEngine, MockEngineConfig};
