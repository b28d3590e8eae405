//! Commission Engine library crate.
//!
//! This crate exposes the sales commission calculation engine and its
//! API components as reusable modules.  External applications may
//! depend on the `commission_engine` crate and call
//! `engine::CommissionEngine` directly with their own storage
//! collaborators, or embed the API via `api::build_router`.

pub mod models;
pub mod error;
pub mod rules;
pub mod bonus;
pub mod store;
pub mod engine;
pub mod report;
pub mod config;
pub mod api;
