//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own model calls and persistence so route handlers can
//! stay focused on request validation and status mapping.

pub mod actions;
pub mod diagram;
