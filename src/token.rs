//! Process-wide bearer credential cache with single-flight refresh.
//!
//! [`TokenCache::ensure_token`] returns the held credential while it is outside the
//! safety margin and otherwise performs one client-credentials exchange. Callers that
//! observe a stale credential at the same time queue on a single guard. Every refresh
//! bumps a generation counter and leaves its outcome under the guard; a caller that finds
//! the generation moved while it waited takes that outcome, success or failure, instead
//! of starting an exchange of its own.

mod metrics;

pub use metrics::{CacheEvent, ExchangeCounts, ExchangeMetrics};

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::RelayConfig,
	error::ConfigError,
	identity::IdentityClient,
};

type RefreshOutcome = std::result::Result<Credential, Arc<Error>>;

/// Holds at most one live [`Credential`] and refreshes it on demand.
pub struct TokenCache {
	identity: IdentityClient,
	margin: Duration,
	held: RwLock<Option<Credential>>,
	generation: AtomicU64,
	refresh_guard: AsyncMutex<Option<RefreshOutcome>>,
	metrics: Arc<ExchangeMetrics>,
}
impl TokenCache {
	/// Creates an empty cache that refreshes through `identity`.
	///
	/// Negative margins clamp to zero.
	pub fn new(identity: IdentityClient, margin: Duration) -> Self {
		Self {
			identity,
			margin: if margin.is_negative() { Duration::ZERO } else { margin },
			held: RwLock::new(None),
			generation: AtomicU64::new(0),
			refresh_guard: AsyncMutex::new(None),
			metrics: Default::default(),
		}
	}

	/// Builds the identity client and cache described by `config`.
	pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
		Ok(Self::new(IdentityClient::from_config(config)?, config.token_margin))
	}

	/// Safety margin subtracted from each credential's expiry.
	pub fn margin(&self) -> Duration {
		self.margin
	}

	/// Shared counters describing cache activity.
	pub fn metrics(&self) -> Arc<ExchangeMetrics> {
		self.metrics.clone()
	}

	/// Returns the held credential without refreshing it, even if stale.
	pub fn current(&self) -> Option<Credential> {
		self.held.read().clone()
	}

	/// Returns a credential that is valid for at least the safety margin.
	///
	/// Only performs the identity exchange when no fresh credential is held, and at most
	/// one exchange runs for any group of concurrent callers. On failure the held
	/// credential is dropped and every caller that waited on the attempt receives the
	/// same [`Error::Shared`] failure; callers must not contact the provider.
	pub async fn ensure_token(&self) -> Result<Credential> {
		if let Some(credential) = self.fresh(OffsetDateTime::now_utc()) {
			self.metrics.record(CacheEvent::Reused);

			return Ok(credential);
		}

		let observed = self.generation.load(Ordering::Acquire);
		let mut last = self.refresh_guard.lock().await;

		// An attempt finished while this caller waited for the guard.
		if self.generation.load(Ordering::Acquire) != observed
			&& let Some(outcome) = last.as_ref()
		{
			return match outcome {
				Ok(credential) => {
					self.metrics.record(CacheEvent::Reused);

					Ok(credential.clone())
				},
				Err(err) => {
					self.metrics.record(CacheEvent::SharedFailure);

					Err(Error::Shared(err.clone()))
				},
			};
		}

		let outcome = match self.identity.exchange().await {
			Ok(credential) => {
				*self.held.write() = Some(credential.clone());

				self.metrics.record(CacheEvent::Exchanged);
				tracing::info!(
					token = %credential.fingerprint(),
					expires_at = %credential.expires_at,
					"Cached a new credential."
				);

				Ok(credential)
			},
			Err(err) => {
				*self.held.write() = None;

				self.metrics.record(CacheEvent::Failed);

				Err(Arc::new(err))
			},
		};

		*last = Some(outcome.clone());
		self.generation.fetch_add(1, Ordering::Release);

		outcome.map_err(Error::Shared)
	}

	/// Drops the held credential if it is still `rejected`.
	///
	/// Used when the provider refuses a token the cache considered valid. A credential
	/// that was already replaced by a concurrent refresh is left untouched. Returns `true`
	/// when the held credential was dropped.
	pub fn invalidate(&self, rejected: &Credential) -> bool {
		let mut held = self.held.write();
		let matches = held
			.as_ref()
			.is_some_and(|current| current.access_token == rejected.access_token);

		if matches {
			*held = None;

			tracing::info!(token = %rejected.fingerprint(), "Invalidated rejected credential.");
		}

		matches
	}

	fn fresh(&self, now: OffsetDateTime) -> Option<Credential> {
		self.held
			.read()
			.as_ref()
			.filter(|credential| credential.is_fresh_at(now, self.margin))
			.cloned()
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("identity", &self.identity)
			.field("margin", &self.margin)
			.field("held", &self.held.read().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::ClientCredentials, http::ReqwestHttpClient};

	fn cache(margin: Duration) -> TokenCache {
		let credentials = ClientCredentials::new("client-id", "secret")
			.expect("Client credentials fixture should be valid.");
		let url = Url::parse("https://id.example.com/oauth2/token")
			.expect("Token endpoint fixture should parse.");
		let identity = IdentityClient::new(
			&credentials,
			&url,
			ReqwestHttpClient::with_client(ReqwestClient::new()),
		)
		.expect("Identity client should build.");

		TokenCache::new(identity, margin)
	}

	fn seed(cache: &TokenCache, token: &str, expires_in: Duration) -> Credential {
		let credential = Credential::new(token, "bearer", OffsetDateTime::now_utc(), expires_in);

		*cache.held.write() = Some(credential.clone());

		credential
	}

	#[tokio::test]
	async fn fresh_credential_is_reused_without_exchange() {
		let cache = cache(Duration::seconds(60));

		seed(&cache, "held", Duration::hours(1));

		let credential = cache.ensure_token().await.expect("Held credential should be reused.");

		assert_eq!(credential.access_token.expose(), "held");
		assert_eq!(cache.metrics().reuses(), 1);
		assert_eq!(cache.metrics().exchanges(), 0);
	}

	#[test]
	fn credentials_inside_margin_are_not_fresh() {
		let cache = cache(Duration::seconds(60));

		seed(&cache, "expiring", Duration::seconds(30));

		assert!(cache.fresh(OffsetDateTime::now_utc()).is_none());
		assert!(cache.current().is_some(), "Stale credentials stay visible until replaced.");
	}

	#[test]
	fn invalidate_only_drops_matching_credential() {
		let cache = cache(Duration::ZERO);
		let old = Credential::new("old", "bearer", OffsetDateTime::now_utc(), Duration::hours(1));

		seed(&cache, "new", Duration::hours(1));

		assert!(!cache.invalidate(&old));
		assert!(cache.current().is_some());

		let current = cache.current().expect("Seeded credential should be held.");

		assert!(cache.invalidate(&current));
		assert!(cache.current().is_none());
	}

	#[test]
	fn negative_margin_clamps_to_zero() {
		assert_eq!(cache(Duration::seconds(-5)).margin(), Duration::ZERO);
	}
}
