// crates.io
use axum::{
	Router,
	body::{Body, to_bytes},
	http::{Request, StatusCode},
};
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use igdb_relay::{_preludet::*, config::RelayConfig, relay::ApiErrorResponse};

const TOKEN_PATH: &str = "/oauth2/token";
const ACCESS_TOKEN: &str = "relay-token";

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"access_token\":\"{ACCESS_TOKEN}\",\"expires_in\":3600,\"token_type\":\"bearer\"}}"
			));
		})
		.await
}

async fn post_query(router: &Router, path: &str, query: &str) -> (StatusCode, Vec<u8>) {
	let response = router
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri(path)
				.header("content-type", "text/plain")
				.body(Body::from(query.to_owned()))
				.expect("Relay request should build."),
		)
		.await
		.expect("Router should answer every request.");
	let status = response.status();
	let body = to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Relay response body should be readable.");

	(status, body.to_vec())
}

fn error_body(bytes: &[u8]) -> ApiErrorResponse {
	serde_json::from_slice(bytes).expect("Error responses should be `{error, details}` JSON.")
}

#[tokio::test]
async fn games_query_is_relayed_verbatim() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let upstream = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v4/games")
				.header("client-id", TEST_CLIENT_ID)
				.header("authorization", format!("Bearer {ACCESS_TOKEN}"))
				.header("content-type", "text/plain")
				.body("fields name; limit 5;");
			then.status(200).header("content-type", "application/json").body("[{\"id\":1,\"name\":\"Foo\"}]");
		})
		.await;
	let (router, _) = build_test_router(&test_config(&server.base_url()));
	let (status, body) = post_query(&router, "/api/games", "fields name; limit 5;").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(String::from_utf8_lossy(&body), "[{\"id\":1,\"name\":\"Foo\"}]");

	token.assert_calls_async(1).await;
	upstream.assert_calls_async(1).await;
}

#[tokio::test]
async fn provider_key_order_is_preserved() {
	let server = MockServer::start_async().await;
	let payload = "[{\"name\":\"Zelda\",\"id\":7,\"cover\":{\"url\":\"//x/t_thumb/a.jpg\",\"id\":3},\"aggregated_rating\":97.5}]";

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/games");
			then.status(200).header("content-type", "application/json").body(payload);
		})
		.await;

	let (router, _) = build_test_router(&test_config(&server.base_url()));
	let (status, body) = post_query(&router, "/api/games", "fields *;").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(String::from_utf8_lossy(&body), payload);
}

#[tokio::test]
async fn credential_is_shared_across_requests_and_legacy_paths() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let genres = server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/genres");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let (router, tokens) = build_test_router(&test_config(&server.base_url()));

	for path in ["/api/genres", "/api/igdb/genres"] {
		let (status, body) = post_query(&router, path, "fields name;").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, b"[]");
	}

	token.assert_calls_async(1).await;
	genres.assert_calls_async(2).await;

	assert_eq!(tokens.metrics().exchanges(), 1);
}

#[tokio::test]
async fn provider_errors_are_mirrored_with_details() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;

	let upstream = server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/games");
			then.status(404)
				.header("content-type", "application/json")
				.body("[{\"title\":\"Not Found\",\"status\":404}]");
		})
		.await;
	let (router, _) = build_test_router(&test_config(&server.base_url()));
	let (status, body) = post_query(&router, "/api/games", "fields name;").await;
	let error = error_body(&body);

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(error.error, "IGDB API error: 404");
	assert_eq!(error.details[0]["title"], "Not Found");

	upstream.assert_calls_async(1).await;
}

#[tokio::test]
async fn provider_server_errors_are_not_retried() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;

	let upstream = server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/platforms");
			then.status(503).body("upstream unavailable");
		})
		.await;
	let (router, _) = build_test_router(&test_config(&server.base_url()));
	let (status, body) = post_query(&router, "/api/platforms", "fields name;").await;
	let error = error_body(&body);

	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(error.details, "upstream unavailable");

	upstream.assert_calls_async(1).await;
}

#[tokio::test]
async fn identity_rejection_stops_before_the_provider() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"status\":401,\"message\":\"invalid client\"}");
		})
		.await;
	let upstream = server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/games");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let (router, tokens) = build_test_router(&test_config(&server.base_url()));
	let (status, body) = post_query(&router, "/api/games", "fields name;").await;
	let error = error_body(&body);

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert!(error.error.contains("Authentication"));
	assert_eq!(error.details["message"], "invalid client");
	assert!(!String::from_utf8_lossy(&body).contains(TEST_CLIENT_SECRET));

	token.assert_calls_async(1).await;
	upstream.assert_calls_async(0).await;

	assert!(tokens.current().is_none());
}

#[tokio::test]
async fn provider_unauthorized_drops_the_cached_credential() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/games");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Authorization Failure. Have you tried:\"}");
		})
		.await;

	let (router, tokens) = build_test_router(&test_config(&server.base_url()));

	for _ in 0..2 {
		let (status, _) = post_query(&router, "/api/games", "fields name;").await;

		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert!(tokens.current().is_none());
	}

	token.assert_calls_async(2).await;
}

#[tokio::test]
async fn transport_failures_are_retried_a_bounded_number_of_times() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	// Nothing accepts connections on port 1, so every provider attempt fails to connect.
	let config = test_config(&server.base_url()).with_api_base_url(
		Url::parse("http://127.0.0.1:1/v4/").expect("Unreachable provider URL should parse."),
	);
	let attempts = config.retry.max_attempts;
	let (router, tokens) = build_test_router(&config);
	let (status, body) = post_query(&router, "/api/games", "fields name;").await;
	let error = error_body(&body);

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(error.details, Value::Null);

	token.assert_calls_async(1).await;

	// One credential check per attempt: the first exchanges, the rest reuse it.
	assert_eq!(tokens.metrics().exchanges(), 1);
	assert_eq!(tokens.metrics().reuses(), u64::from(attempts - 1));
}

#[tokio::test]
async fn boundary_checks_run_before_any_network_call() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let config: RelayConfig = test_config(&server.base_url()).with_body_limit(64);
	let (router, _) = build_test_router(&config);

	let (status, body) = post_query(&router, "/api/users", "fields name;").await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(error_body(&body).details, "users");

	let (status, _) = post_query(&router, "/api/games", " \n ").await;

	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = post_query(&router, "/api/games", &"x".repeat(65)).await;

	assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

	let (status, _) = post_query(&router, "/api/games", "fields name;\u{7}").await;

	assert_eq!(status, StatusCode::BAD_REQUEST);

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn allow_list_can_be_widened() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/covers");
			then.status(200).header("content-type", "application/json").body("[{\"id\":9}]");
		})
		.await;

	let config = test_config(&server.base_url()).with_resources(permissive_allow_list());
	let (router, _) = build_test_router(&config);
	let (status, body) = post_query(&router, "/api/covers", "fields url;").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, b"[{\"id\":9}]");
}

#[tokio::test]
async fn provider_bytes_pass_through_without_reencoding() {
	let server = MockServer::start_async().await;
	let payload = "[ {\"name\":\"Pok\\u00e9mon\", \"rating\":1e2, \"url\":\"https:\\/\\/x\"} ]";

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/games");
			then.status(200).header("content-type", "application/json").body(payload);
		})
		.await;

	let (router, _) = build_test_router(&test_config(&server.base_url()));
	let response = router
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/games")
				.body(Body::from("fields name, rating, url;"))
				.expect("Relay request should build."),
		)
		.await
		.expect("Router should answer every request.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers().get("content-type").and_then(|value| value.to_str().ok()),
		Some("application/json")
	);

	let body = to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Relay response body should be readable.");

	assert_eq!(&body[..], payload.as_bytes());
}

#[tokio::test]
async fn provider_timeouts_become_internal_errors_after_retries() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let provider = server
		.mock_async(|when, then| {
			when.method(POST).path("/v4/games");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_secs(2))
				.body("[]");
		})
		.await;
	let config =
		test_config(&server.base_url()).with_request_timeout(StdDuration::from_millis(200));
	let attempts = config.retry.max_attempts;
	let (router, _) = build_test_router(&config);
	let (status, body) = post_query(&router, "/api/games", "fields name;").await;
	let error = error_body(&body);

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(error.error.contains("timed out"));
	assert_eq!(error.details, Value::Null);

	token.assert_calls_async(1).await;
	provider.assert_calls_async(attempts as usize).await;
}
