//! Client-credentials exchange against the identity endpoint.
//!
//! The exchange posts `client_id`, `client_secret`, and `grant_type=client_credentials`
//! as a form body. The identity provider in front of IGDB answers failures with its own
//! `{status, message}` JSON rather than an RFC 6749 error object, so failures are mapped
//! from the HTTP status captured by the transport instead of the OAuth error code.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, Credential},
	config::RelayConfig,
	error::{AuthError, ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadataSlot},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const OPERATION: &str = "identity endpoint";

/// Performs client-credentials exchanges for a single client registration.
#[derive(Clone)]
pub struct IdentityClient {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	token_url: Url,
}
impl IdentityClient {
	/// Creates an identity client that posts credentials to `token_url`.
	pub fn new(
		credentials: &ClientCredentials,
		token_url: &Url,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let oauth_token_url = TokenUrl::new(token_url.to_string()).map_err(|source| {
			ConfigError::InvalidUrl { name: "IGDB_TOKEN_URL", source }
		})?;
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(
				credentials.client_secret.expose().to_owned(),
			))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(oauth_token_url);

		Ok(Self { oauth_client, http_client, token_url: token_url.clone() })
	}

	/// Builds an identity client from the relay configuration.
	pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Self::new(&config.credentials, &config.token_url, http_client)
	}

	/// Exchanges the client credentials for a fresh bearer [`Credential`].
	pub async fn exchange(&self) -> Result<Credential> {
		const KIND: OpKind = OpKind::IdentityExchange;

		let span = OpSpan::new(KIND, "exchange");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let meta = ResponseMetadataSlot::default();
				let handle = self.http_client.instrumented(meta.clone());
				let response = self
					.oauth_client
					.exchange_client_credentials()
					.request_async(&handle)
					.await
					.map_err(|err| {
						map_request_error(meta.take().and_then(|value| value.status), err)
					})?;
				let expires_in = response.expires_in().ok_or(AuthError::MissingExpiresIn)?;
				let expires_in = i64::try_from(expires_in.as_secs())
					.map_err(|_| AuthError::NonPositiveExpiresIn)?;

				if expires_in <= 0 {
					return Err(AuthError::NonPositiveExpiresIn.into());
				}

				let issued_at = OffsetDateTime::now_utc();
				let lifetime = Duration::seconds(expires_in);

				if issued_at.checked_add(lifetime).is_none() {
					return Err(AuthError::InvalidResponse {
						reason: format!("expires_in of {expires_in} seconds is out of range"),
					}
					.into());
				}

				let credential = Credential::new(
					response.access_token().secret().to_owned(),
					response.token_type().as_ref().to_ascii_lowercase(),
					issued_at,
					lifetime,
				);

				tracing::debug!(
					token = %credential.fingerprint(),
					expires_in,
					"Identity endpoint issued a credential."
				);

				Ok(credential)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(err) => {
				tracing::warn!(error = %err, "Identity exchange failed.");
				obs::record_op_outcome(KIND, OpOutcome::Failure);
			},
		}

		result
	}
}
impl Debug for IdentityClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityClient")
			.field("token_url", &self.token_url.as_str())
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

fn map_request_error(
	status: Option<u16>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let rejected_status = status.filter(|code| !(200..300).contains(code));

	match err {
		RequestTokenError::ServerResponse(response) => AuthError::Rejected {
			status: rejected_status.unwrap_or(400),
			body: serde_json::to_string(&response).unwrap_or_default(),
		}
		.into(),
		RequestTokenError::Parse(source, body) => match rejected_status {
			Some(status) =>
				AuthError::Rejected { status, body: String::from_utf8_lossy(&body).into_owned() }
					.into(),
			None => AuthError::MalformedResponse { source }.into(),
		},
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Other(message) => match rejected_status {
			Some(status) => AuthError::Rejected { status, body: message }.into(),
			None => AuthError::InvalidResponse { reason: message }.into(),
		},
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => TransportError::from_reqwest(OPERATION, *inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Http(inner) => TransportError::network(OPERATION, inner).into(),
		HttpClientError::Other(message) =>
			AuthError::InvalidResponse { reason: format!("HTTP client error: {message}") }.into(),
		_ => AuthError::InvalidResponse { reason: "unknown HTTP client error".into() }.into(),
	}
}
