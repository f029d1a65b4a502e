//! Domain model for note bodies.
//!
//! # Responsibility
//! - Define the canonical formatted-text value carried by a note document.
//!
//! # Invariants
//! - Rich text values are kept in normalized run form.

pub mod rich_text;
