//! Router-level tests against mocked upstreams
//!
//! Run with: cargo test -p vodgate-api --test http_api

use axum::{
    body::{to_bytes, Body},
    Router,
};
use http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vodgate_api::{create_router, AppState};
use vodgate_core::access::password_hash;
use vodgate_core::encoding::encode_uri_component;
use vodgate_core::http_client::build_client;
use vodgate_core::Config;

fn app(config: Config) -> Router {
    let client = build_client(&config).expect("client");
    create_router(AppState::new(config, client))
}

/// Config whose inline site list points at the mock server
fn config_with_sites(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.sites.inline = Some(
        json!({
            "sites": [
                {"key": "mock", "name": "Mock", "api": format!("{}/vod", server.uri()), "active": true},
                {"key": "idle", "name": "Idle", "api": format!("{}/idle", server.uri()), "active": false}
            ]
        })
        .to_string(),
    );
    config
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "gw.test")
        .header(header::ORIGIN, "https://player.example")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, http::HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_search_streams_chunks_then_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod"))
        .and(query_param("ac", "detail"))
        .and(query_param("wd", "三体 2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"vod_id": 42, "vod_name": "三体"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/idle"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app(config_with_sites(&server));
    let uri = format!("/api/search?wd={}", encode_uri_component("三体 2"));
    let (status, headers, body) = send(&app, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let frames: Vec<&str> = body.split("\n\n").filter(|f| !f.is_empty()).collect();
    assert_eq!(frames.len(), 2, "frames: {frames:?}");

    let data = frames[0].strip_prefix("data: ").unwrap();
    let items = json_body(data);
    assert_eq!(items[0]["vod_id"], 42);
    assert_eq!(items[0]["site_key"], "mock");
    assert_eq!(items[0]["site_name"], "Mock");

    assert_eq!(frames[1], "event: done\ndata: {}");
}

#[tokio::test]
async fn test_search_without_keyword_is_rejected() {
    let app = app(Config::default());

    for uri in ["/api/search", "/api/search?wd=", "/api/search?wd=%20%20"] {
        let (status, headers, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(json_body(&body), json!({"error": "Missing wd"}));
    }
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let app = app(Config::default());
    let (status, headers, body) = send(&app, get("/api/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(json_body(&body), json!({"error": "API Not Found"}));
}

#[tokio::test]
async fn test_preflight_is_answered() {
    let app = app(Config::default());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/auth/verify")
        .header(header::ORIGIN, "https://player.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(&app, request).await;
    assert!(status.is_success());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_health() {
    let app = app(Config::default());
    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_sites_fall_back_to_builtin_list() {
    let app = app(Config::default());
    let (status, _, body) = send(&app, get("/api/sites")).await;

    assert_eq!(status, StatusCode::OK);
    let sites = json_body(&body);
    let keys: Vec<&str> = sites["sites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["ffzy", "lzzy", "snzy"]);
}

#[tokio::test]
async fn test_client_config() {
    let mut config = Config::default();
    config.tmdb.api_key = Some("secret-key".into());
    config.tmdb.proxy_url = Some("https://tmdb-relay.example".into());
    config.access.passwords = "a,b".into();
    let app = app(config);

    let (status, _, body) = send(&app, get("/api/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("secret-key"));
    assert_eq!(
        json_body(&body),
        json!({
            "tmdb_proxy_url": "https://tmdb-relay.example",
            "cors_proxy_url": "http://gw.test/api/cors",
            "enable_local_image_cache": false,
            "sync_enabled": false,
            "multi_user_mode": true
        })
    );
}

#[tokio::test]
async fn test_configured_public_origin_wins() {
    let mut config = Config::default();
    config.server.public_origin = Some("https://tv.example.com/".into());
    let app = app(config);

    let (_, _, body) = send(&app, get("/api/config")).await;
    assert_eq!(json_body(&body)["cors_proxy_url"], "https://tv.example.com/api/cors");
}

#[tokio::test]
async fn test_debug_reports_no_secrets() {
    let mut config = Config::default();
    config.tmdb.api_key = Some("secret-key".into());
    config.access.passwords = "hunter2".into();
    let app = app(config);

    let (status, _, body) = send(&app, get("/api/debug")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("secret-key"));
    assert!(!body.contains("hunter2"));

    let info = json_body(&body);
    assert_eq!(info["tmdb"], true);
    assert_eq!(info["sites_inline"], false);
    assert_eq!(info["password_count"], 1);
}

#[tokio::test]
async fn test_auth_with_passwords() {
    let mut config = Config::default();
    config.access.passwords = " alpha , beta,, ".into();
    let app = app(config);

    let (_, _, body) = send(&app, get("/api/auth/check")).await;
    assert_eq!(json_body(&body), json!({"requirePassword": true, "multiUserMode": true}));

    let (status, _, body) = send(&app, post_json("/api/auth/verify", r#"{"password":"beta"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"success": true, "passwordHash": password_hash("beta"), "syncEnabled": false})
    );

    let (status, _, body) = send(&app, post_json("/api/auth/verify", r#"{"password":"gamma"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"success": false}));

    let (status, _, body) = send(&app, post_json("/api/auth/verify", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].is_string());
}

#[tokio::test]
async fn test_auth_without_passwords_accepts_everyone() {
    let app = app(Config::default());

    let (_, _, body) = send(&app, get("/api/auth/check")).await;
    assert_eq!(json_body(&body), json!({"requirePassword": false, "multiUserMode": false}));

    let (status, _, body) = send(&app, post_json("/api/auth/verify", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    let verified = json_body(&body);
    assert_eq!(verified["success"], true);
    assert_eq!(verified["passwordHash"], password_hash(""));
}

#[tokio::test]
async fn test_detail_is_relayed_from_matching_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod"))
        .and(query_param("ac", "detail"))
        .and(query_param("ids", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"list":[{"vod_id":42}]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(config_with_sites(&server));

    let (status, headers, body) = send(&app, get("/api/detail?site_key=mock&id=42")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("application/json"));
    assert_eq!(body, r#"{"list":[{"vod_id":42}]}"#);

    let (status, _, body) = send(&app, get("/api/detail?site_key=missing&id=42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({"error": "Site not found"}));

    let (status, _, body) = send(&app, get("/api/detail?site_key=mock")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body), json!({"error": "Missing id"}));
}

#[tokio::test]
async fn test_tmdb_requires_key_and_path() {
    let app = app(Config::default());
    let (status, _, body) = send(&app, get("/api/tmdb-proxy?path=/movie/1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body), json!({"error": "Missing TMDB Config"}));

    let mut config = Config::default();
    config.tmdb.api_key = Some("k".into());
    let app = self::app(config);
    let (status, _, body) = send(&app, get("/api/tmdb-proxy?query=x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body), json!({"error": "Missing TMDB Config"}));
}

#[tokio::test]
async fn test_tmdb_proxy_attaches_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/3/search/tv"))
        .and(query_param("query", "dark"))
        .and(query_param("api_key", "k3y"))
        .and(query_param("language", "zh-CN"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.tmdb.api_key = Some("k3y".into());
    config.tmdb.api_base = format!("{}/3", server.uri());
    let app = app(config);

    let (status, headers, body) = send(&app, get("/api/tmdb-proxy?path=%2Fsearch%2Ftv&query=dark")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(body, r#"{"results":[]}"#);
}

#[tokio::test]
async fn test_tmdb_image_is_streamed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/p/w500/poster.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xff, 0xd8, 0xff, 0xe0]),
        )
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.tmdb.image_base = format!("{}/t/p", server.uri());
    let app = app(config);

    let response = app
        .clone()
        .oneshot(get("/api/tmdb-image/w500/poster.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=86400");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.to_vec(), vec![0xff, 0xd8, 0xff, 0xe0]);
}

#[tokio::test]
async fn test_cors_proxy_rewrites_playlist_against_request_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n#EXTINF:6,\nseg1.ts\n",
        ))
        .mount(&server)
        .await;

    let app = app(Config::default());
    let target = format!("{}/live/index.m3u8", server.uri());
    let uri = format!("/api/cors?url={}", encode_uri_component(&target));

    let (status, headers, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/vnd.apple.mpegurl");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let key = encode_uri_component(&format!("{}/live/key.bin", server.uri()));
    let segment = encode_uri_component(&format!("{}/live/seg1.ts", server.uri()));
    assert_eq!(
        body,
        format!(
            "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"http://gw.test/api/cors?url={key}\"\n#EXTINF:6,\nhttp://gw.test/api/cors?url={segment}\n"
        )
    );
}

#[tokio::test]
async fn test_cors_proxy_rejects_bad_targets() {
    let app = app(Config::default());

    let (status, _, body) = send(&app, get("/api/cors")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body), json!({"error": "Missing url"}));

    let uri = format!("/api/cors?url={}", encode_uri_component("file:///etc/passwd"));
    let (status, _, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].as_str().unwrap().starts_with("Invalid url"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_500_envelope() {
    let app = app(Config::default());
    let uri = format!("/api/cors?url={}", encode_uri_component("http://127.0.0.1:9/x.m3u8"));

    let (status, headers, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(json_body(&body)["error"].is_string());
}
