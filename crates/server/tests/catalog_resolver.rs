//! Spotify resolver tests against an in-process fake of the Web API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;

use spotitools_core::{
    CatalogConfig, CatalogError, ContentType, MetadataResolver, SpotifyResolver, TrackRequest,
};

const ACCESS_TOKEN: &str = "access-1";

struct FakeCatalog {
    base: String,
    expires_in: u64,
    reject_refresh: bool,
    token_calls: AtomicUsize,
    refresh_tokens_seen: Mutex<Vec<String>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ACCESS_TOKEN))
        .unwrap_or(false)
}

async fn token(
    State(fake): State<Arc<FakeCatalog>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let call = fake.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    fake.refresh_tokens_seen
        .lock()
        .unwrap()
        .push(form.get("refresh_token").cloned().unwrap_or_default());

    if fake.reject_refresh || form.get("grant_type").map(String::as_str) != Some("refresh_token")
    {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response();
    }
    Json(json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": fake.expires_in,
        "refresh_token": format!("rotated-{}", call),
    }))
    .into_response()
}

async fn track(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "id": id,
        "name": "Creep",
        "artists": [{"name": "Radiohead"}],
        "album": {"images": [{"url": "https://img/album-large"}, {"url": "https://img/album-small"}]}
    }))
    .into_response()
}

async fn playlist(
    State(fake): State<Arc<FakeCatalog>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "name": "Road Trip",
        "images": [{"url": "https://img/playlist"}],
        "tracks": {"href": format!("{}/v1/playlists/{}/tracks", fake.base, id)}
    }))
    .into_response()
}

async fn playlist_tracks(
    State(fake): State<Arc<FakeCatalog>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let page = match params.get("offset").map(String::as_str) {
        None => Json(json!({
            "items": [
                {"track": {"name": "Airbag", "artists": [{"name": "Radiohead"}]}},
                {"track": null},
                {"track": {"name": "Teardrop", "artists": [{"name": "Massive Attack"}, {"name": "Liz Fraser"}]}}
            ],
            "next": format!("{}/v1/playlists/{}/tracks?offset=3", fake.base, id)
        })),
        Some(_) => Json(json!({
            "items": [
                {"track": {"name": "Glory Box", "artists": [{"name": "Portishead"}]}}
            ],
            "next": null
        })),
    };
    page.into_response()
}

async fn album(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "non existing id").into_response();
    }
    Json(json!({
        "name": "Dummy",
        "images": [],
        "tracks": {"href": "http://127.0.0.1:1/unused"}
    }))
    .into_response()
}

/// Serves the fake API and returns it with a resolver pointed at it.
async fn start_fake(expires_in: u64, reject_refresh: bool) -> (Arc<FakeCatalog>, SpotifyResolver) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base = format!("http://{}", addr);

    let fake = Arc::new(FakeCatalog {
        base: base.clone(),
        expires_in,
        reject_refresh,
        token_calls: AtomicUsize::new(0),
        refresh_tokens_seen: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/tracks/{id}", get(track))
        .route("/v1/albums/{id}", get(album))
        .route("/v1/playlists/{id}", get(playlist))
        .route("/v1/playlists/{id}/tracks", get(playlist_tracks))
        .with_state(Arc::clone(&fake));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let resolver = SpotifyResolver::new(CatalogConfig {
        client_id: "client-1".to_string(),
        refresh_token: "initial-refresh".to_string(),
        api_base: format!("{}/v1", base),
        accounts_base: base,
        timeout_secs: 5,
    })
    .unwrap();

    (fake, resolver)
}

#[tokio::test]
async fn test_resolve_playlist_follows_pages() {
    let (_fake, resolver) = start_fake(3600, false).await;

    let collection = resolver
        .resolve("https://open.spotify.com/playlist/37i9dQZF1DX?si=share")
        .await
        .unwrap();

    assert_eq!(collection.title, "Road Trip");
    assert_eq!(collection.cover, "https://img/playlist");
    assert_eq!(collection.content_type, ContentType::Playlist);
    assert_eq!(
        collection.tracks,
        vec![
            TrackRequest::new("Airbag", "Radiohead"),
            TrackRequest::new("Teardrop", "Massive Attack, Liz Fraser"),
            TrackRequest::new("Glory Box", "Portishead"),
        ]
    );
}

#[tokio::test]
async fn test_resolve_track() {
    let (_fake, resolver) = start_fake(3600, false).await;

    let collection = resolver
        .resolve("https://open.spotify.com/intl-de/track/6b2oQwSGFkzsMtQruIWm2p")
        .await
        .unwrap();

    assert_eq!(collection.title, "Creep");
    assert_eq!(collection.cover, "https://img/album-large");
    assert_eq!(collection.content_type, ContentType::Track);
    assert_eq!(collection.tracks, vec![TrackRequest::new("Creep", "Radiohead")]);
}

#[tokio::test]
async fn test_access_token_is_cached() {
    let (fake, resolver) = start_fake(3600, false).await;

    resolver
        .resolve("https://open.spotify.com/track/a")
        .await
        .unwrap();
    resolver
        .resolve("https://open.spotify.com/track/b")
        .await
        .unwrap();

    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_adopted() {
    // Shorter than the refresh margin, so every call refreshes.
    let (fake, resolver) = start_fake(10, false).await;

    resolver
        .resolve("https://open.spotify.com/track/a")
        .await
        .unwrap();
    resolver
        .resolve("https://open.spotify.com/track/b")
        .await
        .unwrap();

    assert_eq!(
        *fake.refresh_tokens_seen.lock().unwrap(),
        vec!["initial-refresh".to_string(), "rotated-1".to_string()]
    );
}

#[tokio::test]
async fn test_refresh_failure_is_auth_error() {
    let (_fake, resolver) = start_fake(3600, true).await;

    let err = resolver
        .resolve("https://open.spotify.com/track/a")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::AuthFailed(_)));
}

#[tokio::test]
async fn test_unknown_entity_is_api_error() {
    let (_fake, resolver) = start_fake(3600, false).await;

    let err = resolver
        .resolve("https://open.spotify.com/album/missing")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ApiError { status: 404, .. }));
}

#[tokio::test]
async fn test_invalid_link_makes_no_calls() {
    let (fake, resolver) = start_fake(3600, false).await;

    let err = resolver
        .resolve("https://open.spotify.com/artist/xyz")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidLink(_)));
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 0);
}
