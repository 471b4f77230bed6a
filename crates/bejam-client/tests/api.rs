//! Web API client tests against a mock provider.

use std::sync::Arc;

use async_trait::async_trait;
use bejam_client::{Error, SpotifyClient};
use bejam_oauth::{AccessTokenProvider, OAuthError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SpotifyClient {
    SpotifyClient::builder()
        .base_url(server.uri())
        .access_token("test-token")
        .build()
        .expect("client")
}

fn track_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "preview_url": "https://p.scdn.co/mp3-preview/x",
        "artists": [{"id": "a1", "name": "Daft Punk"}],
        "album": {"name": "Discovery", "images": [{"url": "https://i.scdn.co/image/d"}]}
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_me_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "jam",
            "display_name": "Jam Fan",
            "email": "jam@example.com",
            "images": [{"url": "https://i.scdn.co/image/me"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let me = client(&server).users().me().await.unwrap();
    assert_eq!(me.id, "jam");
    assert_eq!(me.name(), "Jam Fan");
    assert_eq!(me.email.as_deref(), Some("jam@example.com"));
}

#[tokio::test]
async fn test_get_user_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/friend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "friend", "images": []})))
        .mount(&server)
        .await;

    let user = client(&server).users().get("friend").await.unwrap();
    assert_eq!(user.id, "friend");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"status": 404, "message": "No such user"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).users().get("ghost").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("No such user"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracks
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", "one more time"))
        .and(query_param("type", "track"))
        .and(query_param("limit", "20"))
        .and(query_param("market", "from_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks": {
                "items": [track_json("t1", "One More Time")],
                "total": 1
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tracks = client(&server)
        .tracks()
        .search("one more time", 20)
        .await
        .unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].name, "One More Time");
    assert_eq!(tracks[0].artist_names(), "Daft Punk");
}

#[tokio::test]
async fn test_search_rejects_blank_query_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server).tracks().search("   ", 10).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn test_top_tracks_clamps_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/top/tracks"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [track_json("t1", "Aerodynamic"), track_json("t2", "Digital Love")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tracks = client(&server).tracks().top(500).await.unwrap();
    assert_eq!(tracks.len(), 2);
}

#[tokio::test]
async fn test_save_tracks() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/tracks"))
        .and(query_param("ids", "t1,t2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).tracks().save(&["t1", "t2"]).await.unwrap();
}

#[tokio::test]
async fn test_save_nothing_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client(&server).tracks().save(&[]).await.unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Follow
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_follow_and_unfollow_users() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/following"))
        .and(query_param("type", "user"))
        .and(query_param("ids", "alice,bob"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/me/following"))
        .and(query_param("type", "user"))
        .and(query_param("ids", "alice"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.follow().follow_users(&["alice", "bob"]).await.unwrap();
    client.follow().unfollow_users(&["alice"]).await.unwrap();
}

#[tokio::test]
async fn test_follow_batches_large_lists() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/following"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let ids: Vec<String> = (0..75).map(|i| format!("user{}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    client(&server).follow().follow_users(&refs).await.unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"status": 401, "message": "The access token expired"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).users().me().await.unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m == "The access token expired"));
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/top/tracks"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let err = client(&server).tracks().top(10).await.unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after: Some(12)
        }
    ));
}

#[tokio::test]
async fn test_server_error_without_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client(&server).users().me().await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.to_string(), "API error (502): HTTP 502");
}

#[derive(Debug)]
struct LoggedOut;

#[async_trait]
impl AccessTokenProvider for LoggedOut {
    async fn access_token(&self) -> bejam_oauth::Result<String> {
        Err(OAuthError::NotLoggedIn)
    }
}

#[tokio::test]
async fn test_token_failure_stops_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = SpotifyClient::builder()
        .base_url(server.uri())
        .token_provider(Arc::new(LoggedOut))
        .build()
        .unwrap();

    let err = client.users().me().await.unwrap_err();
    assert!(matches!(err, Error::Token(OAuthError::NotLoggedIn)));
    assert!(err.is_auth_error());
}
