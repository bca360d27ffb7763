//! Plugin system

pub mod api;
pub mod manager;

pub use api::{HostEvent, Plugin, PluginContext};
pub use manager::PluginManager;
