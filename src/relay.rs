//! HTTP boundary that forwards caller queries to the metadata provider.
//!
//! `POST /api/{resource}` (and the legacy `POST /api/igdb/{resource}`) accept a raw query
//! body, check it, and answer with the provider's JSON array bytes as received.
//! `GET /health` reports liveness without touching the identity endpoint or the provider.

pub mod error;
pub mod payload;

pub use error::{ApiError, ApiErrorResponse, ApiResult};

// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::{DefaultBodyLimit, Path, State, rejection::BytesRejection},
	http::header::CONTENT_TYPE,
	response::{IntoResponse, Response},
	routing::{get, post},
};
// self
use crate::{
	_prelude::*,
	obs::{self, OpKind, OpOutcome, OpSpan},
	resource::ResourceAllowList,
	upstream::UpstreamClient,
};

/// Shared state handed to every relay handler.
#[derive(Clone, Debug)]
pub struct RelayState {
	/// Authenticated provider client.
	pub upstream: Arc<UpstreamClient>,
	/// Resources the boundary forwards.
	pub resources: Arc<ResourceAllowList>,
	/// Maximum accepted query body size in bytes.
	pub body_limit: usize,
}
impl RelayState {
	/// Creates handler state around a shared upstream client.
	pub fn new(upstream: Arc<UpstreamClient>, resources: ResourceAllowList, body_limit: usize) -> Self {
		Self { upstream, resources: Arc::new(resources), body_limit }
	}
}

/// Liveness payload returned by `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	/// Always `"OK"` while the process serves requests.
	pub status: String,
	/// Human-readable detail.
	pub message: String,
}

/// Builds the relay router.
pub fn router(state: RelayState) -> Router {
	let body_limit = state.body_limit;

	Router::new()
		.route("/health", get(health))
		.route("/api/{resource}", post(relay_query))
		.route("/api/igdb/{resource}", post(relay_query))
		.layer(DefaultBodyLimit::max(body_limit))
		.with_state(state)
}

async fn health() -> Json<HealthResponse> {
	Json(HealthResponse { status: "OK".into(), message: "IGDB relay is running".into() })
}

async fn relay_query(
	State(state): State<RelayState>,
	Path(raw_resource): Path<String>,
	body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
	const KIND: OpKind = OpKind::Relay;

	let Some(resource) = state.resources.resolve(&raw_resource) else {
		tracing::debug!(resource = %raw_resource, "Refused unknown or disallowed resource.");

		return Err(ApiError::not_found("Unknown or disallowed resource")
			.with_details(Value::String(raw_resource)));
	};
	let body = body?;
	let query = payload::validate_query(&body, state.body_limit)?;
	let span = OpSpan::new(KIND, resource.as_str());

	obs::record_op_outcome(KIND, OpOutcome::Attempt);

	let result = span.instrument(state.upstream.relay_resource(resource, query)).await;

	match result {
		Ok(records) => {
			obs::record_op_outcome(KIND, OpOutcome::Success);

			Ok(([(CONTENT_TYPE, "application/json")], records).into_response())
		},
		Err(err) => {
			obs::record_op_outcome(KIND, OpOutcome::Failure);

			Err(err.into())
		},
	}
}
