//! HTTP and SSE request handlers.
//!
//! Identity is an opaque `player_id` cookie minted on first contact. Rules
//! and seat errors are recoverable: the handler re-renders the current board
//! with an inline message instead of failing the request.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Form, Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::game::{Coord, PlayError};
use crate::ids;
use crate::session::{GameService, ServiceError};
use crate::web::templates;

const PLAYER_COOKIE: &str = "player_id";

/// Form body for a move: 0-indexed row and column.
#[derive(Debug, Deserialize)]
pub struct PlayForm {
    r: usize,
    c: usize,
}

/// Reads the player identity cookie, minting a fresh one when absent.
/// Returns the identity and a `Set-Cookie` value to attach when it is new.
fn identity(headers: &HeaderMap) -> (String, Option<HeaderValue>) {
    let existing = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == PLAYER_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
        });
    match existing {
        Some(id) => (id, None),
        None => {
            let id = ids::new_id();
            debug!(player = %id, "minting player identity");
            let cookie = format!("{PLAYER_COOKIE}={id}; Path=/");
            let value = HeaderValue::from_str(&cookie).ok();
            (id, value)
        }
    }
}

fn with_cookie(mut response: Response, set_cookie: Option<HeaderValue>) -> Response {
    if let Some(value) = set_cookie {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

/// `GET /` — landing page.
pub async fn index() -> Html<String> {
    Html(templates::index_page())
}

/// `POST /game` — creates a session and redirects to its page.
#[instrument(skip(service))]
pub async fn create(State(service): State<GameService>) -> Redirect {
    let session = service.create();
    info!(session_id = %session.id, "session created via web");
    Redirect::to(&format!("/game/{}", session.id))
}

/// `GET /game/{id}` — joins (or re-joins) and renders the game page.
#[instrument(skip(service, headers))]
pub async fn view(
    State(service): State<GameService>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (player, set_cookie) = identity(&headers);
    if service.join(&id, &player).is_err() {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(session) = service.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let board = templates::board_fragment(&session, None);
    let response = Html(templates::game_page(&session, &board)).into_response();
    with_cookie(response, set_cookie)
}

/// `POST /game/{id}/join` — explicit join, returns the board fragment.
#[instrument(skip(service, headers))]
pub async fn join(
    State(service): State<GameService>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (player, set_cookie) = identity(&headers);
    match service.join(&id, &player) {
        Ok((_, session)) => {
            let response = Html(templates::board_fragment(&session, None)).into_response();
            with_cookie(response, set_cookie)
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn move_error_message(err: ServiceError) -> &'static str {
    match err {
        ServiceError::NotYourTurn => "Not your turn",
        ServiceError::NotAPlayer => "You are a spectator",
        ServiceError::Rules(PlayError::Occupied) => "Cell is occupied",
        ServiceError::Rules(PlayError::OutOfBounds) => "Out of bounds",
        ServiceError::Rules(PlayError::GameOver) => "Game is over",
        ServiceError::NotFound => "Game not found",
    }
}

/// `POST /game/{id}/play` — applies a move; on rejection re-renders the
/// current board with an inline message.
#[instrument(skip(service, headers, form))]
pub async fn play(
    State(service): State<GameService>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<PlayForm>,
) -> Response {
    let (player, set_cookie) = identity(&headers);
    let coord = Coord::new(form.r, form.c);
    let (session, error) = match service.play(&id, &player, coord) {
        Ok(session) => (session, None),
        Err(ServiceError::NotFound) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            let Some(session) = service.get(&id) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            (session, Some(move_error_message(err)))
        }
    };
    let response = Html(templates::board_fragment(&session, error)).into_response();
    with_cookie(response, set_cookie)
}

/// `GET /game/{id}/state` — JSON snapshot of the session.
#[instrument(skip(service))]
pub async fn state(State(service): State<GameService>, Path(id): Path<String>) -> Response {
    match service.get(&id) {
        Some(session) => Json(session).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `GET /game/{id}/events` — SSE stream of board fragments.
///
/// The subscription is torn down when the client disconnects and the stream
/// is dropped. Keep-alive comments stand in for the heartbeat so proxies do
/// not reap idle connections.
#[instrument(skip(service))]
pub async fn events(
    State(service): State<GameService>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = service.subscribe(&id, std::future::pending());
    info!(session_id = %id, "sse subscriber connected");

    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        let payload = subscription.recv().await?;
        let data = String::from_utf8_lossy(&payload).into_owned();
        Some((
            Ok(Event::default().event("board").data(data)),
            subscription,
        ))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
