//! Legal document analysis backend.
//!
//! Accepts pasted text, captured photos and uploaded files, runs them through
//! the analysis pipeline against the AI service, stores the result for
//! signed-in users and drafts reply documents on demand.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod services;
