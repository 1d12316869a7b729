//! Relay error responses.
//!
//! Every failure leaves the relay as `{error, details}` JSON. Identity and provider
//! rejections keep the status the remote side reported; other failures become `500`.

// crates.io
use axum::{
	Json,
	extract::rejection::BytesRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	error::{AuthError, UpstreamError},
};

/// Body of every relay error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
	/// Human-readable error message.
	pub error: String,
	/// Upstream body or other structured context; `null` when absent.
	pub details: Value,
}

/// Relay error convertible into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
	/// Response status.
	pub status: StatusCode,
	/// Human-readable error message.
	pub error: String,
	/// Structured context.
	pub details: Value,
}
impl ApiError {
	/// Creates a new API error without details.
	pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
		Self { status, error: error.into(), details: Value::Null }
	}

	/// Adds details to the error.
	pub fn with_details(mut self, details: Value) -> Self {
		self.details = details;

		self
	}

	/// Creates a 400 Bad Request error.
	pub fn bad_request(error: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, error)
	}

	/// Creates a 404 Not Found error.
	pub fn not_found(error: impl Into<String>) -> Self {
		Self::new(StatusCode::NOT_FOUND, error)
	}

	/// Creates a 413 Payload Too Large error.
	pub fn payload_too_large(error: impl Into<String>) -> Self {
		Self::new(StatusCode::PAYLOAD_TOO_LARGE, error)
	}

	/// Creates a 500 Internal Server Error.
	pub fn internal(error: impl Into<String>) -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ApiErrorResponse { error: self.error, details: self.details };

		(self.status, Json(body)).into_response()
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		// Refresh failures shared between waiters are mapped like the original failure.
		match err.root() {
			Error::Auth(AuthError::Rejected { status, body }) => {
				let status = *status;

				tracing::warn!(status, "Identity endpoint rejected the client credentials.");

				Self::new(
					mirrored_status(status),
					format!("Authentication with the identity provider failed: {status}"),
				)
				.with_details(details_from_body(body))
			},
			Error::Upstream(UpstreamError::Status { resource, status, body }) => {
				let status = *status;

				tracing::warn!(%resource, status, "Mirroring provider rejection.");

				Self::new(mirrored_status(status), format!("IGDB API error: {status}"))
					.with_details(details_from_body(body))
			},
			other => {
				tracing::error!(error = %other, source = ?other.source(), "Relay request failed.");

				Self::internal(other.to_string())
			},
		}
	}
}
impl From<BytesRejection> for ApiError {
	fn from(rejection: BytesRejection) -> Self {
		let status = rejection.status();
		let message = rejection.body_text();

		if status == StatusCode::PAYLOAD_TOO_LARGE {
			Self::payload_too_large("Query body exceeds the relay limit")
		} else {
			Self::new(status, "Query body could not be read").with_details(Value::String(message))
		}
	}
}

/// Result type for relay handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Keeps remote error statuses; anything that is not a 4xx/5xx code becomes `502`.
fn mirrored_status(status: u16) -> StatusCode {
	StatusCode::from_u16(status)
		.ok()
		.filter(|code| code.is_client_error() || code.is_server_error())
		.unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Parses an upstream body as JSON, falling back to the raw string.
fn details_from_body(body: &str) -> Value {
	if body.trim().is_empty() {
		return Value::Null;
	}

	serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		error::{ConfigError, TransportError},
		resource::ResourceName,
	};

	#[test]
	fn upstream_status_is_mirrored_with_json_details() {
		let err: Error = UpstreamError::Status {
			resource: ResourceName::Games,
			status: 404,
			body: r#"[{"title":"Not Found","status":404}]"#.into(),
		}
		.into();
		let api = ApiError::from(err);

		assert_eq!(api.status, StatusCode::NOT_FOUND);
		assert_eq!(api.error, "IGDB API error: 404");
		assert_eq!(api.details[0]["title"], "Not Found");
	}

	#[test]
	fn auth_rejection_mentions_authentication() {
		let err: Error = AuthError::Rejected { status: 401, body: "invalid client".into() }.into();
		let api = ApiError::from(err);

		assert_eq!(api.status, StatusCode::UNAUTHORIZED);
		assert!(api.error.contains("Authentication"));
		assert_eq!(api.details, Value::String("invalid client".into()));
	}

	#[test]
	fn shared_refresh_failures_map_like_the_original() {
		let original: Error =
			AuthError::Rejected { status: 403, body: r#"{"message":"no"}"#.into() }.into();
		let api = ApiError::from(Error::Shared(Arc::new(original)));

		assert_eq!(api.status, StatusCode::FORBIDDEN);
		assert!(api.error.contains("Authentication"));
		assert_eq!(api.details["message"], "no");
	}

	#[test]
	fn other_failures_become_internal_errors() {
		let transport: Error = TransportError::Timeout { operation: "metadata provider" }.into();
		let config: Error = ConfigError::MissingVar { name: "IGDB_CLIENT_ID" }.into();

		for err in [transport, config] {
			let api = ApiError::from(err);

			assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
			assert_eq!(api.details, Value::Null);
		}
	}

	#[test]
	fn non_error_statuses_fall_back_to_bad_gateway() {
		assert_eq!(mirrored_status(302), StatusCode::BAD_GATEWAY);
		assert_eq!(mirrored_status(42), StatusCode::BAD_GATEWAY);
		assert_eq!(mirrored_status(429), StatusCode::TOO_MANY_REQUESTS);
	}
}
