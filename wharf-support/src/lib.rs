//! # Wharf Support
//!
//! Shared utilities for the Wharf service container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - Name matching used for "did you mean?" hints

pub mod rendering;
