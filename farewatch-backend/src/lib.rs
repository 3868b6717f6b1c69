//! Farewatch backend - cheap-flight search core
//!
//! Airport resolution, fare search, report rendering, command handling and the
//! daily scheduler. Chat adapters live in the frontend crate.

pub mod config;
pub mod logging;
pub mod module;
