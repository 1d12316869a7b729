//! Credential-caching relay for the IGDB game metadata API: one cached client-credentials
//! token, verbatim query forwarding, and an axum boundary that mirrors upstream failures.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod library;
pub mod obs;
pub mod relay;
pub mod resource;
pub mod server;
pub mod token;
pub mod upstream;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ClientCredentials,
		config::RelayConfig,
		relay::{self, RelayState},
		resource::ResourceAllowList,
		token::TokenCache,
		upstream::{RetryPolicy, UpstreamClient},
	};

	/// Client identifier used by relay fixtures.
	pub const TEST_CLIENT_ID: &str = "relay-client";
	/// Client secret used by relay fixtures.
	pub const TEST_CLIENT_SECRET: &str = "relay-secret";

	/// Builds a relay configuration whose identity and provider endpoints live under
	/// `base` (typically an `httpmock` server URL).
	///
	/// The token endpoint is `{base}/oauth2/token` and the provider base is `{base}/v4/`.
	pub fn test_config(base: &str) -> RelayConfig {
		let base = base.trim_end_matches('/');
		let credentials = ClientCredentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET)
			.expect("Test client credentials should be valid.");

		RelayConfig::new(credentials)
			.with_token_url(
				Url::parse(&format!("{base}/oauth2/token"))
					.expect("Mock token endpoint should parse successfully."),
			)
			.with_api_base_url(
				Url::parse(&format!("{base}/v4/"))
					.expect("Mock provider base URL should parse successfully."),
			)
			.with_retry(RetryPolicy::new(3, StdDuration::from_millis(5), StdDuration::from_millis(20)))
	}

	/// Constructs the token cache and upstream client for `config`.
	pub fn build_test_upstream(config: &RelayConfig) -> (Arc<UpstreamClient>, Arc<TokenCache>) {
		let tokens =
			Arc::new(TokenCache::from_config(config).expect("Token cache should build for tests."));
		let upstream = Arc::new(
			UpstreamClient::from_config(config, tokens.clone())
				.expect("Upstream client should build for tests."),
		);

		(upstream, tokens)
	}

	/// Builds the relay router for `config` together with the shared token cache.
	pub fn build_test_router(config: &RelayConfig) -> (axum::Router, Arc<TokenCache>) {
		let (upstream, tokens) = build_test_upstream(config);
		let state = RelayState::new(upstream, config.resources.clone(), config.body_limit);

		(relay::router(state), tokens)
	}

	/// Allow-list containing every known resource.
	pub fn permissive_allow_list() -> ResourceAllowList {
		ResourceAllowList::all()
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use error::{Error, Result};
pub use reqwest;
pub use url;
// Only the binary target reports through color-eyre.
use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
