//! Authenticated calls to the metadata provider.
//!
//! [`UpstreamClient::relay_resource`] attaches the cached credential to a verbatim query
//! and returns the provider's body byte for byte once it is known to be a JSON array;
//! [`UpstreamClient::fetch_resource`] decodes that array. Transport failures are retried under
//! the configured [`RetryPolicy`]; provider status errors and authentication failures
//! are returned on first sight.

mod retry;

pub use retry::RetryPolicy;

// crates.io
use axum::body::Bytes;
use reqwest::{
	StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use serde::de::IgnoredAny;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::RelayConfig,
	error::{AuthError, ConfigError, TransportError, UpstreamError},
	http::ReqwestHttpClient,
	obs::{self, OpKind, OpOutcome, OpSpan},
	resource::ResourceName,
	token::TokenCache,
};

const OPERATION: &str = "metadata provider";
const CLIENT_ID_HEADER: &str = "Client-ID";

/// Issues authenticated provider requests using the shared [`TokenCache`].
#[derive(Debug)]
pub struct UpstreamClient {
	http_client: ReqwestHttpClient,
	tokens: Arc<TokenCache>,
	base_url: Url,
	client_id: String,
	retry: RetryPolicy,
}
impl UpstreamClient {
	/// Creates a client that forwards to resources beneath `base_url`.
	pub fn new(
		http_client: ReqwestHttpClient,
		tokens: Arc<TokenCache>,
		base_url: Url,
		client_id: impl Into<String>,
		retry: RetryPolicy,
	) -> Self {
		Self { http_client, tokens, base_url, client_id: client_id.into(), retry }
	}

	/// Builds the client described by `config`, sharing `tokens`.
	pub fn from_config(config: &RelayConfig, tokens: Arc<TokenCache>) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::new(
			http_client,
			tokens,
			config.api_base_url.clone(),
			config.credentials.client_id.clone(),
			config.retry,
		))
	}

	/// Token cache backing this client.
	pub fn tokens(&self) -> &Arc<TokenCache> {
		&self.tokens
	}

	/// Absolute provider URL for `resource`.
	pub fn endpoint(&self, resource: ResourceName) -> Result<Url, ConfigError> {
		self.base_url
			.join(resource.as_str())
			.map_err(|source| ConfigError::InvalidUrl { name: "IGDB_API_BASE_URL", source })
	}

	/// Forwards `query_body` verbatim to `resource` and returns the provider's records.
	pub async fn fetch_resource(
		&self,
		resource: ResourceName,
		query_body: &str,
	) -> Result<Vec<Value>> {
		let body = self.relay_resource(resource, query_body).await?;

		decode_records(resource, &body)
	}

	/// Forwards `query_body` verbatim to `resource` and returns the provider's body as
	/// received.
	///
	/// The body is checked to be a JSON array but never re-encoded. A credential is
	/// ensured before every attempt, so a retry never reuses a token that expired while
	/// backing off.
	pub async fn relay_resource(&self, resource: ResourceName, query_body: &str) -> Result<Bytes> {
		const KIND: OpKind = OpKind::UpstreamFetch;

		let span = OpSpan::new(KIND, resource.as_str());

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let endpoint = self.endpoint(resource)?;
				let mut attempt = 1;

				tracing::debug!(%resource, query_bytes = query_body.len(), "Forwarding query.");
				tracing::trace!(%resource, query = query_body, "Forwarded query body.");

				loop {
					let credential = self.tokens.ensure_token().await?;

					match self.send(resource, &endpoint, &credential, query_body).await {
						Ok(body) => return Ok(body),
						Err(err) if err.is_retryable() && self.retry.allows_retry_after(attempt) => {
							let delay = self.retry.delay_for(attempt);

							tracing::warn!(
								%resource,
								attempt,
								delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
								error = %err,
								"Retrying provider call after transport failure."
							);
							tokio::time::sleep(delay).await;

							attempt += 1;
						},
						Err(err) => return Err(err),
					}
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn send(
		&self,
		resource: ResourceName,
		endpoint: &Url,
		credential: &Credential,
		query_body: &str,
	) -> Result<Bytes> {
		let mut authorization = HeaderValue::from_str(&credential.bearer()).map_err(|_| {
			AuthError::InvalidResponse { reason: "access token is not a valid header value".into() }
		})?;

		authorization.set_sensitive(true);

		let response = self
			.http_client
			.post(endpoint.clone())
			.header(CLIENT_ID_HEADER, &self.client_id)
			.header(AUTHORIZATION, authorization)
			.header(CONTENT_TYPE, "text/plain")
			.header(ACCEPT, "application/json")
			.body(query_body.to_owned())
			.send()
			.await
			.map_err(|err| TransportError::from_reqwest(OPERATION, err))?;
		let status = response.status();
		let body =
			response.bytes().await.map_err(|err| TransportError::from_reqwest(OPERATION, err))?;

		tracing::debug!(
			%resource,
			status = status.as_u16(),
			token = %credential.fingerprint(),
			body_bytes = body.len(),
			"Provider responded."
		);

		if !status.is_success() {
			if status == StatusCode::UNAUTHORIZED {
				self.tokens.invalidate(credential);
			}

			let body = String::from_utf8_lossy(&body).into_owned();

			tracing::warn!(%resource, status = status.as_u16(), "Provider rejected the query.");

			return Err(UpstreamError::Status { resource, status: status.as_u16(), body }.into());
		}

		let items = decode_records::<IgnoredAny>(resource, &body)?.len();

		tracing::debug!(%resource, items, "Provider returned records.");

		Ok(body)
	}
}

fn decode_records<T>(resource: ResourceName, body: &[u8]) -> Result<Vec<T>>
where
	T: for<'de> Deserialize<'de>,
{
	let records = serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(body))
		.map_err(|source| UpstreamError::Decode { resource, source })?;

	Ok(records)
}
