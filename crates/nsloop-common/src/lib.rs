//! # nsloop-common
//!
//! Shared types, error definitions, and constants used across the entire
//! nsloop workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives the namespace switcher, the
//! loopback configurer, and the plugin boundary all build upon.

pub mod constants;
pub mod error;
pub mod types;
