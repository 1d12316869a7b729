//! Relay-level error types shared by the token cache, upstream client, and HTTP boundary.

// self
use crate::{_prelude::*, resource::ResourceName};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity endpoint refused or garbled the credential exchange.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Metadata provider rejected the forwarded query.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Failure of a credential refresh, handed to every caller that waited on it.
	#[error(transparent)]
	Shared(Arc<Error>),
}
impl Error {
	/// Returns `true` when the failure is transport-level and may be retried.
	///
	/// Authentication and upstream rejections are never retryable; retrying them would
	/// hide a credential or query problem.
	pub fn is_retryable(&self) -> bool {
		matches!(self.root(), Self::Transport(_))
	}

	/// HTTP status reported by the remote side, when the failure carries one.
	pub fn upstream_status(&self) -> Option<u16> {
		match self.root() {
			Self::Auth(AuthError::Rejected { status, .. }) => Some(*status),
			Self::Upstream(UpstreamError::Status { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// The underlying failure, looking through [`Error::Shared`].
	pub fn root(&self) -> &Error {
		match self {
			Self::Shared(inner) => inner.root(),
			other => other,
		}
	}
}

/// Configuration and validation failures raised before the relay serves traffic.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or blank.
	#[error("Required configuration `{name}` is missing.")]
	MissingVar {
		/// Variable name that was looked up.
		name: &'static str,
	},
	/// An environment variable holds an unusable value.
	#[error("Configuration `{name}` is invalid: {reason}.")]
	InvalidVar {
		/// Variable name that was looked up.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// An endpoint URL cannot be parsed.
	#[error("Configuration `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Variable name that was looked up.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Failures of the client-credentials exchange.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Identity endpoint answered with a non-success status.
	#[error("Authentication with the identity provider failed with status {status}.")]
	Rejected {
		/// HTTP status returned by the identity endpoint.
		status: u16,
		/// Raw response body returned by the identity endpoint.
		body: String,
	},
	/// Identity endpoint answered successfully but without `expires_in`.
	#[error("Authentication response is missing expires_in.")]
	MissingExpiresIn,
	/// Identity endpoint returned a zero, negative, or unrepresentable lifetime.
	#[error("Authentication response carries an unusable expires_in value.")]
	NonPositiveExpiresIn,
	/// Identity endpoint returned JSON that does not describe a token.
	#[error("Authentication response is malformed.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Identity endpoint returned something the exchange could not interpret.
	#[error("Authentication response is invalid: {reason}.")]
	InvalidResponse {
		/// Description of the unexpected response.
		reason: String,
	},
}

/// Failures reported by the metadata provider for a forwarded query.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Provider answered with a non-2xx status.
	#[error("IGDB API error: {status}")]
	Status {
		/// Resource the query targeted.
		resource: ResourceName,
		/// HTTP status returned by the provider.
		status: u16,
		/// Raw response body returned by the provider.
		body: String,
	},
	/// Provider answered 2xx with a body that is not a JSON array.
	#[error("IGDB API returned an unreadable `{resource}` response.")]
	Decode {
		/// Resource the query targeted.
		resource: ResourceName,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {operation}.")]
	Network {
		/// Remote operation that failed.
		operation: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call did not complete within the configured timeout.
	#[error("Request to the {operation} timed out.")]
	Timeout {
		/// Remote operation that timed out.
		operation: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		operation: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { operation, source: Box::new(src) }
	}

	/// Classifies a reqwest failure as a timeout or generic network error.
	pub fn from_reqwest(operation: &'static str, err: ReqwestError) -> Self {
		if err.is_timeout() { Self::Timeout { operation } } else { Self::network(operation, err) }
	}
}
