//! Tests for the web transport: routing, cookies, fragments, SSE headers.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use crosses::web;
use crosses::GameService;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn app(service: &GameService) -> axum::Router {
    web::router(service.clone())
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, player: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(COOKIE, format!("player_id={player}"))
        .body(Body::empty())
        .unwrap()
}

fn play_as(id: &str, player: &str, r: usize, c: usize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/game/{id}/play"))
        .header(COOKIE, format!("player_id={player}"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("r={r}&c={c}")))
        .unwrap()
}

#[tokio::test]
async fn index_shows_create_form() {
    let service = GameService::new();
    let response = app(&service).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Create game"));
}

#[tokio::test]
async fn create_redirects_to_game_page() {
    let service = GameService::new();
    let request = Request::builder()
        .method("POST")
        .uri("/game")
        .body(Body::empty())
        .unwrap();
    let response = app(&service).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[LOCATION].to_str().unwrap().to_string();
    let id = location.strip_prefix("/game/").unwrap();
    assert!(service.get(id).is_some());
}

#[tokio::test]
async fn view_unknown_session_is_404() {
    let service = GameService::new();
    let response = app(&service).oneshot(get("/game/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn view_mints_identity_cookie_and_claims_seat() {
    let service = GameService::new();
    let session = service.create();

    let response = app(&service)
        .oneshot(get(&format!("/game/{}", session.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("player_id="));

    // The first visitor was seated as X.
    let snapshot = service.get(&session.id).unwrap();
    assert!(snapshot.player_x.is_some());

    let body = body_string(response).await;
    assert!(body.contains(&format!("/game/{}/events", session.id)));
    assert!(body.contains("id=\"board\""));
}

#[tokio::test]
async fn returning_cookie_is_not_reissued() {
    let service = GameService::new();
    let session = service.create();

    let response = app(&service)
        .oneshot(get_as(&format!("/game/{}", session.id), "alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(
        service.get(&session.id).unwrap().player_x.as_deref(),
        Some("alice")
    );
}

#[tokio::test]
async fn play_renders_fragment_and_rejections_inline() {
    let service = GameService::new();
    let session = service.create();
    let app = app(&service);

    // Seat alice and bob.
    app.clone()
        .oneshot(get_as(&format!("/game/{}", session.id), "alice"))
        .await
        .unwrap();
    app.clone()
        .oneshot(get_as(&format!("/game/{}", session.id), "bob"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(play_as(&session.id, "alice", 0, 0))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(">X</button>"));
    assert!(!body.contains("alert"));

    // Same cell by the other seat: inline message, board unchanged.
    let response = app
        .clone()
        .oneshot(play_as(&session.id, "bob", 0, 0))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Cell is occupied"));
    assert_eq!(service.get(&session.id).unwrap().game.moves(), 1);

    // Out of turn.
    let response = app
        .clone()
        .oneshot(play_as(&session.id, "alice", 1, 1))
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(body.contains("Not your turn"));

    // Spectator.
    app.clone()
        .oneshot(get_as(&format!("/game/{}", session.id), "carol"))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(play_as(&session.id, "carol", 1, 1))
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(body.contains("You are a spectator"));
}

#[tokio::test]
async fn play_on_unknown_session_is_404() {
    let service = GameService::new();
    let response = app(&service)
        .oneshot(play_as("missing", "alice", 0, 0))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn state_returns_json_snapshot() {
    let service = GameService::new();
    let session = service.create();
    service.join(&session.id, "alice").unwrap();

    let response = app(&service)
        .oneshot(get(&format!("/game/{}/state", session.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body = body_string(response).await;
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["id"], session.id.as_str());
    assert_eq!(value["player_x"], "alice");
    assert_eq!(value["game"]["moves"], 0);
}

#[tokio::test]
async fn state_unknown_session_is_404() {
    let service = GameService::new();
    let response = app(&service)
        .oneshot(get("/game/missing/state"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn events_stream_has_sse_content_type() {
    let service = GameService::new();
    let session = service.create();

    let response = app(&service)
        .oneshot(get(&format!("/game/{}/events", session.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(service.subscriber_count(&session.id), 1);
}
