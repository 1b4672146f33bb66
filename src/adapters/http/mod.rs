//! HTTP adapter - the REST API, the Clerk webhook and the router that
//! ties them to the live feed.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod webhook;

pub use error::{ApiError, ErrorResponse};
pub use routes::{build_router, RouterOptions};
pub use state::AppState;
