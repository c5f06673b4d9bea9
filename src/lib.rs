//! Frame-template catalog and placement service for a collaborative
//! whiteboard.
//!
//! Templates come from a `plantilles.json` manifest, are browsed through a
//! small panel API and are recreated on a board through the `BoardHost`
//! trait. The board's frames can be exported back into the same manifest
//! format.

pub mod catalog;
pub mod config;
pub mod error;
pub mod geometry;
pub mod host;
pub mod manifest;
pub mod model;
pub mod routes;
pub mod services;
pub mod state;
