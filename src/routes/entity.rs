//! Entity CRUD routes. Uses parameterized paths so Path extractors receive
//! the resource segment and id; handlers resolve the entity by segment.
//!
//! Reads (find, count, find-by-id) are served without a principal; every
//! write and the bulk PATCH require a verified Bearer token.

use crate::handlers::entity::{
    count, create, delete_by_id, find, find_by_id, replace_by_id, update_all, update_by_id,
};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(find).post(create).patch(update_all))
        .route("/:resource/count", get(count))
        .route(
            "/:resource/:id",
            get(find_by_id)
                .patch(update_by_id)
                .put(replace_by_id)
                .delete(delete_by_id),
        )
        .with_state(state)
}
