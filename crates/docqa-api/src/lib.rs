//! docqa API crate - axum HTTP server, route handlers, embedded UI page.
//!
//! Exposes document upload (extract, fragment, embed, index) and question
//! answering (retrieve, prompt, generate) over a small JSON/form API.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
