//! Core functionality: storage tree, documents, and configuration

pub mod config;
pub mod document;
pub mod file_system;
#[cfg(test)]
pub mod memory;
pub mod vault;
