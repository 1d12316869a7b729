//! Bearer credential held by the token cache and the client credentials that mint it.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Lifecycle status of a [`Credential`] relative to an instant and a safety margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialStatus {
	/// Usable for upstream calls.
	Fresh,
	/// Inside the safety margin; still technically valid but due for replacement.
	Expiring,
	/// At or past its expiry instant.
	Expired,
}

/// Short-lived bearer token obtained through the client-credentials exchange.
///
/// Credentials are immutable; the token cache replaces them whole.
#[derive(Clone)]
pub struct Credential {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Token type reported by the identity endpoint (normally `bearer`).
	pub token_type: String,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Instant after which the provider stops accepting the token.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Creates a credential that expires `expires_in` after `issued_at`.
	///
	/// Lifetimes past the representable range saturate at the latest instant.
	pub fn new(
		access_token: impl Into<String>,
		token_type: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			token_type: token_type.into(),
			issued_at,
			expires_at: issued_at.saturating_add(expires_in),
		}
	}

	/// Computes the status at `instant`, treating the final `margin` before expiry as stale.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> CredentialStatus {
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}
		if instant >= self.expires_at - margin {
			return CredentialStatus::Expiring;
		}

		CredentialStatus::Fresh
	}

	/// Returns `true` when the credential may be attached to a request at `instant`.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), CredentialStatus::Fresh)
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// `Authorization` header value for this credential.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}

	/// Fingerprint of the access token, safe to log.
	pub fn fingerprint(&self) -> String {
		self.access_token.fingerprint()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Client identifier and secret registered with the identity provider.
#[derive(Clone)]
pub struct ClientCredentials {
	/// Public client identifier, also sent to the provider as `Client-ID`.
	pub client_id: String,
	/// Client secret; never logged.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Validates and wraps a client identifier + secret pair.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.into().trim().to_owned();
		let client_secret = TokenSecret::new(client_secret.into().trim());

		if client_id.is_empty() {
			return Err(ConfigError::MissingVar { name: "IGDB_CLIENT_ID" });
		}
		if client_secret.is_blank() {
			return Err(ConfigError::MissingVar { name: "IGDB_CLIENT_SECRET" });
		}

		Ok(Self { client_id, client_secret })
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
