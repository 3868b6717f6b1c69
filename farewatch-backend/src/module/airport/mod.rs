//! Airport directory - Maps free-text city names to IATA airport codes
//!
//! ## Main Components
//! - `AirportDirectory`: city key -> codes table and its code -> display name inverse
//! - `Resolution`: outcome of a successful lookup
//! - `ResolveError`: returned when no city matches the input

// ============ Static Tables ============
mod tables;

// ============ Directory and Resolver ============
mod directory;
pub use directory::{AirportDirectory, Resolution, ResolveError, SUGGESTION_THRESHOLD};
