//! Library crate for roles-manager.
//!
//! This crate exposes the building blocks of the TUI:
//! - Row model, cell editor and edit-mode controller (`model`)
//! - Backend interface and its HTTP implementation (`api`)
//! - Application state, save/delete/membership flows and the update loop (`app`)
//! - Error and result types (`error`)
//! - Client-side view filter (`search`)
//! - UI rendering and widgets (`ui`)
//!
//! It is used by the `roles-manager` binary and by tests.
#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod app;
pub mod error;
pub mod model;
pub mod search;
pub mod ui;

// Re-export commonly used items at the crate root for convenience
/// Convenient error and result types shared across the crate.
pub use error::{ApiError, ValidationError};
