//! Web transport: axum router, handlers, and HTML templates.

mod handlers;
pub mod templates;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::render::Render;
use crate::session::{GameService, Session};

pub use handlers::PlayForm;

/// Broadcast renderer: SSE payloads are the same board fragment a direct
/// response would return, so htmx swaps them in unchanged.
#[derive(Debug, Clone, Copy)]
struct BoardRender;

impl Render for BoardRender {
    fn render(&self, snapshot: &Session) -> Vec<u8> {
        templates::board_fragment(snapshot, None).into_bytes()
    }
}

/// Wires the routes and injects the board renderer into the service.
pub fn router(service: GameService) -> Router {
    service.set_renderer(Arc::new(BoardRender));
    Router::new()
        .route("/", get(handlers::index))
        .route("/game", post(handlers::create))
        .route("/game/{id}", get(handlers::view))
        .route("/game/{id}/join", post(handlers::join))
        .route("/game/{id}/play", post(handlers::play))
        .route("/game/{id}/state", get(handlers::state))
        .route("/game/{id}/events", get(handlers::events))
        .with_state(service)
}
