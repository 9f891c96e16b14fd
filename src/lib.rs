//! Folio API: portfolio CRUD REST backend over MongoDB.
//!
//! Two resources, Bio and Experience, each served through a generic CRUD
//! repository bound to a MongoDB collection. Reads are open; writes require
//! a Bearer JWT.

pub mod config;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod service;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use extractors::{AuthenticatedUser, JwtKeys};
pub use filter::Filter;
pub use model::{EntityDef, FieldDef, Registry, BIO, ENTITIES, EXPERIENCE};
pub use routes::{common_routes, common_routes_with_ready, entity_routes};
pub use service::CrudRepository;
pub use state::AppState;
