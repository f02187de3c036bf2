//! Cache policy resolution and entry-listener dispatch for an external
//! distributed cache runtime.
//!
//! [`policy`] maps cache names to behavioural policies, [`plan`] expands a
//! manifest of caches into runtime definitions, and [`listeners`] fans cache
//! entry events out to registered listeners.

pub mod config;
pub mod error;
pub mod listeners;
pub mod plan;
pub mod policy;
pub mod telemetry;
