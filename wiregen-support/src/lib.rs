//! # Wiregen Support
//!
//! Shared text utilities for the wiregen crates.
//!
//! This crate provides:
//! - Rendering helpers for diagnostics and plan outlines
//! - Variable naming rules used by the plan emitter

pub mod naming;
pub mod rendering;
