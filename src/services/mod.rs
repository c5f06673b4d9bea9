//! Domain services used by the HTTP routes and the CLI.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the board workflows so route handlers and CLI
//! commands stay focused on protocol translation. Every service talks to the
//! board only through `host::BoardHost`.

pub mod export;
pub mod import;
pub mod placement;
