//! Observability layer.
//!
//! Canonical structured event names and field helpers shared by the
//! broker, factory, connection, and supervisor modules. Library code emits
//! `tracing` events and never installs a global subscriber; binaries and
//! tests own one-time subscriber initialization.

pub(crate) mod events;
pub(crate) mod fields;
