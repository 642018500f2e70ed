//! # nsloop-cni
//!
//! The container-network plugin boundary of the loopback plugin.
//!
//! The caller supplies a [`command::Command`] and a namespace path through
//! [`env::PluginEnv`] and the raw network configuration from stdin;
//! [`dispatch::run`] drives the namespace switcher and the loopback
//! configurer and returns a [`types::Reply`] to print, or a
//! [`error::PluginError`] that maps onto a protocol error object.

pub mod command;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod types;
