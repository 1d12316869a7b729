//! Relay configuration loaded from the process environment.
//!
//! Credentials are mandatory and checked before the server binds; every other knob has a
//! default. `.env.local` and `.env` files are honoured through `dotenvy`, with variables
//! already present in the environment taking precedence.

// self
use crate::{
	_prelude::*,
	auth::ClientCredentials,
	error::ConfigError,
	resource::ResourceAllowList,
	upstream::RetryPolicy,
};

/// Default identity endpoint for the client-credentials exchange.
pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
/// Default metadata provider base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.igdb.com/v4/";

const CLIENT_ID_VARS: [&str; 2] = ["IGDB_CLIENT_ID", "VITE_IGDB_CLIENT_ID"];
const CLIENT_SECRET_VARS: [&str; 2] = ["IGDB_CLIENT_SECRET", "VITE_IGDB_CLIENT_SECRET"];

/// Runtime configuration for the relay.
#[derive(Clone, Debug)]
pub struct RelayConfig {
	/// Client identifier + secret used for the identity exchange.
	pub credentials: ClientCredentials,
	/// Identity endpoint.
	pub token_url: Url,
	/// Provider base URL; always ends with `/` so resources join beneath it.
	pub api_base_url: Url,
	/// Listen address.
	pub bind_address: String,
	/// Listen port.
	pub port: u16,
	/// Timeout applied to both the identity exchange and provider calls.
	pub request_timeout: StdDuration,
	/// Safety margin subtracted from a credential's expiry.
	pub token_margin: Duration,
	/// Retry policy for transport failures.
	pub retry: RetryPolicy,
	/// Maximum accepted query body size in bytes.
	pub body_limit: usize,
	/// Resources the relay forwards.
	pub resources: ResourceAllowList,
	/// Enables permissive CORS for browser callers.
	pub enable_cors: bool,
}
impl RelayConfig {
	/// Default listen address.
	pub const DEFAULT_BIND_ADDRESS: &'static str = "127.0.0.1";
	/// Default listen port.
	pub const DEFAULT_PORT: u16 = 3001;
	/// Default network timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);
	/// Default credential safety margin.
	pub const DEFAULT_TOKEN_MARGIN: Duration = Duration::seconds(60);
	/// Default query body limit.
	pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024;

	/// Creates a configuration with default endpoints and limits for `credentials`.
	pub fn new(credentials: ClientCredentials) -> Self {
		Self {
			credentials,
			token_url: Url::parse(DEFAULT_TOKEN_URL).expect("Default token URL is valid."),
			api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("Default API URL is valid."),
			bind_address: Self::DEFAULT_BIND_ADDRESS.into(),
			port: Self::DEFAULT_PORT,
			request_timeout: Self::DEFAULT_TIMEOUT,
			token_margin: Self::DEFAULT_TOKEN_MARGIN,
			retry: RetryPolicy::default(),
			body_limit: Self::DEFAULT_BODY_LIMIT,
			resources: ResourceAllowList::default(),
			enable_cors: true,
		}
	}

	/// Loads `.env.local`/`.env` (when present) and reads the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		for file in [".env.local", ".env"] {
			if dotenvy::from_filename(file).is_ok() {
				tracing::debug!(file, "Loaded environment file.");
			}
		}

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Builds the configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let client_id = CLIENT_ID_VARS
			.iter()
			.find_map(|&name| read(name))
			.ok_or(ConfigError::MissingVar { name: CLIENT_ID_VARS[0] })?;
		let client_secret = CLIENT_SECRET_VARS
			.iter()
			.find_map(|&name| read(name))
			.ok_or(ConfigError::MissingVar { name: CLIENT_SECRET_VARS[0] })?;
		let mut config = Self::new(ClientCredentials::new(client_id, client_secret)?);

		if let Some(raw) = read("IGDB_TOKEN_URL") {
			config.token_url = parse_url("IGDB_TOKEN_URL", &raw)?;
		}
		if let Some(raw) = read("IGDB_API_BASE_URL") {
			config = config.with_api_base_url(parse_url("IGDB_API_BASE_URL", &raw)?);
		}
		if let Some(raw) = read("RELAY_BIND_ADDRESS") {
			config.bind_address = raw.trim().to_owned();
		}
		if let Some(raw) = read("RELAY_PORT") {
			config.port = parse_number("RELAY_PORT", &raw)?;
		}
		if let Some(raw) = read("RELAY_TIMEOUT_SECS") {
			let secs: u64 = parse_number("RELAY_TIMEOUT_SECS", &raw)?;

			if secs == 0 {
				return Err(invalid("RELAY_TIMEOUT_SECS", "must be greater than zero"));
			}

			config.request_timeout = StdDuration::from_secs(secs);
		}
		if let Some(raw) = read("RELAY_TOKEN_MARGIN_SECS") {
			let secs: u32 = parse_number("RELAY_TOKEN_MARGIN_SECS", &raw)?;

			config = config.with_token_margin(Duration::seconds(secs.into()));
		}
		if let Some(raw) = read("RELAY_RETRY_ATTEMPTS") {
			let attempts: u32 = parse_number("RELAY_RETRY_ATTEMPTS", &raw)?;

			if attempts == 0 {
				return Err(invalid("RELAY_RETRY_ATTEMPTS", "must be at least 1"));
			}

			config.retry = config.retry.with_max_attempts(attempts);
		}
		if let Some(raw) = read("RELAY_BODY_LIMIT") {
			let limit: usize = parse_number("RELAY_BODY_LIMIT", &raw)?;

			if limit == 0 {
				return Err(invalid("RELAY_BODY_LIMIT", "must be greater than zero"));
			}

			config.body_limit = limit;
		}
		if let Some(raw) = read("RELAY_RESOURCES") {
			config.resources = ResourceAllowList::parse_list(&raw)
				.map_err(|err| invalid("RELAY_RESOURCES", err.to_string()))?;
		}
		if let Some(raw) = read("RELAY_CORS") {
			config.enable_cors = parse_bool("RELAY_CORS", &raw)?;
		}

		config.warn_insecure_endpoints();

		Ok(config)
	}

	/// Overrides the identity endpoint.
	pub fn with_token_url(mut self, url: Url) -> Self {
		self.token_url = url;

		self
	}

	/// Overrides the provider base URL, appending a trailing `/` when missing.
	pub fn with_api_base_url(mut self, mut url: Url) -> Self {
		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());

			url.set_path(&path);
		}

		self.api_base_url = url;

		self
	}

	/// Overrides the network timeout.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the credential safety margin; negative values clamp to zero.
	pub fn with_token_margin(mut self, margin: Duration) -> Self {
		self.token_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the transport retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the query body limit.
	pub fn with_body_limit(mut self, limit: usize) -> Self {
		self.body_limit = limit;

		self
	}

	/// Overrides the resource allow-list.
	pub fn with_resources(mut self, resources: ResourceAllowList) -> Self {
		self.resources = resources;

		self
	}

	/// Listen address in `host:port` form.
	pub fn listen_addr(&self) -> String {
		format!("{}:{}", self.bind_address, self.port)
	}

	fn warn_insecure_endpoints(&self) {
		for (name, url) in [("token", &self.token_url), ("api", &self.api_base_url)] {
			if url.scheme() != "https" {
				tracing::warn!(endpoint = name, %url, "Endpoint does not use HTTPS.");
			}
		}
	}
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: Display,
{
	raw.trim().parse::<T>().map_err(|err| invalid(name, err.to_string()))
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(invalid(name, format!("`{other}` is not a boolean"))),
	}
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
	ConfigError::InvalidVar { name, reason: reason.into() }
}
