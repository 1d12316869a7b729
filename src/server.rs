//! Process-level server wiring: shared state, middleware, listener, and shutdown.

// crates.io
use axum::{Router, extract::Request, http::Response};
use tokio::net::TcpListener;
use tower_http::{
	classify::ServerErrorsFailureClass,
	cors::{Any, CorsLayer},
	trace::{
		DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan,
		OnFailure, OnRequest, OnResponse, TraceLayer,
	},
};
use tracing::{Level, Span};
// self
use crate::{
	_prelude::*,
	config::RelayConfig,
	error::{ConfigError, TransportError},
	relay::{self, RelayState},
	token::TokenCache,
	upstream::UpstreamClient,
};

const HEALTH_PATH: &str = "/health";

/// The relay process: one token cache, one upstream client, one router.
#[derive(Debug)]
pub struct RelayServer {
	config: RelayConfig,
	tokens: Arc<TokenCache>,
	upstream: Arc<UpstreamClient>,
}
impl RelayServer {
	/// Builds the shared clients described by `config`.
	///
	/// No network traffic happens here; the first credential is fetched on first demand.
	pub fn new(config: RelayConfig) -> Result<Self, ConfigError> {
		let tokens = Arc::new(TokenCache::from_config(&config)?);
		let upstream = Arc::new(UpstreamClient::from_config(&config, tokens.clone())?);

		Ok(Self { config, tokens, upstream })
	}

	/// Configuration the server was built from.
	pub fn config(&self) -> &RelayConfig {
		&self.config
	}

	/// Token cache shared by every request.
	pub fn tokens(&self) -> &Arc<TokenCache> {
		&self.tokens
	}

	/// Relay router wrapped in CORS (when enabled) and request tracing.
	pub fn router(&self) -> Router {
		let state =
			RelayState::new(self.upstream.clone(), self.config.resources.clone(), self.config.body_limit);
		let mut router = relay::router(state);

		if self.config.enable_cors {
			router = router
				.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
		}

		router.layer(
			TraceLayer::new_for_http()
				.make_span_with(|req: &Request| {
					if req.uri().path() == HEALTH_PATH {
						Span::none()
					} else {
						DefaultMakeSpan::new().level(Level::INFO).make_span(req)
					}
				})
				.on_request(|req: &Request, span: &Span| {
					if !span.is_disabled() {
						DefaultOnRequest::new().level(Level::INFO).on_request(req, span);
					}
				})
				.on_response(|res: &Response<_>, latency: StdDuration, span: &Span| {
					if !span.is_disabled() {
						DefaultOnResponse::new().level(Level::INFO).on_response(res, latency, span);
					}
				})
				.on_failure(
					|class: ServerErrorsFailureClass, latency: StdDuration, span: &Span| {
						if !span.is_disabled() {
							DefaultOnFailure::new().level(Level::ERROR).on_failure(class, latency, span);
						}
					},
				),
		)
	}

	/// Binds the configured listen address.
	pub async fn bind(&self) -> Result<TcpListener> {
		let addr = self.config.listen_addr();

		Ok(TcpListener::bind(&addr).await.map_err(TransportError::Io)?)
	}

	/// Serves `listener` until `shutdown` resolves, then drains in-flight requests.
	pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
	where
		F: 'static + Send + Future<Output = ()>,
	{
		let local = listener.local_addr().map_err(TransportError::Io)?;

		tracing::info!(
			address = %local,
			client_id = %self.config.credentials.client_id,
			token_url = %self.config.token_url,
			api_base_url = %self.config.api_base_url,
			resources = %self.config.resources,
			"IGDB relay listening."
		);

		axum::serve(listener, self.router())
			.with_graceful_shutdown(async move {
				shutdown.await;

				tracing::info!("IGDB relay shutting down.");
			})
			.await
			.map_err(TransportError::Io)?;

		Ok(())
	}

	/// Binds and serves until Ctrl-C.
	pub async fn run(&self) -> Result<()> {
		let listener = self.bind().await?;

		self.serve(listener, ctrl_c()).await
	}
}

async fn ctrl_c() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to listen for Ctrl-C; shutting down.");
	}
}
