//! Network layer: the authenticated client and the typed endpoint wrappers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` owns transport, bearer injection and 401 teardown. The sibling
//! modules are thin free functions taking `&ApiClient`, one per backend
//! route, so views never assemble URLs or decode bodies themselves.

pub mod alerts;
pub mod assistant;
pub mod auth;
pub mod client;
pub mod download;
pub mod error;
pub mod interventions;
pub mod reports;
pub mod resources;
pub mod types;
