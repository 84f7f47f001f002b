//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own party state transitions so route handlers can stay
//! focused on protocol translation and transport lifecycle.

pub mod party;
