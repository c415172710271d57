//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the FFI layer decoupled from storage details.

pub mod item_service;
