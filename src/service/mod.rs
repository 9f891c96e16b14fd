//! CrudRepository: generic CRUD against MongoDB, plus request validation.

mod crud;
mod validation;
pub use crud::CrudRepository;
pub use validation::RequestValidator;
