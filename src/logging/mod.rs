use axum::{body::Body, http::Request, middleware::Next, response::Response};
use slog::{o, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};
use std::sync::Arc;
use std::time::Instant;

/// Configuration for the HTTP access logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub async_buffer_size: usize,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
        }
    }
}

pub fn setup_logger(config: LoggerConfig) -> Logger {
    let decorator = {
        let builder = TermDecorator::new();
        let builder = if config.use_color {
            builder.force_color()
        } else {
            builder
        };
        builder.build()
    };

    let drain = FullFormat::new(decorator).build().fuse();

    let drain = Async::new(drain)
        .chan_size(config.async_buffer_size)
        .build()
        .fuse();

    Logger::root(
        drain,
        o!("service" => env!("CARGO_PKG_NAME"), "version" => env!("CARGO_PKG_VERSION")),
    )
}

/// Shared state for [`access_log_middleware`]
#[derive(Clone)]
pub struct LoggingState {
    logger: Logger,
}

impl LoggingState {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Logger that swallows every record, for tests and embedded use.
    pub fn discard() -> Self {
        Self {
            logger: Logger::root(slog::Discard, o!()),
        }
    }
}

/// One access-log line per request: method, path, status, latency and request id.
pub async fn access_log_middleware(
    axum::extract::State(state): axum::extract::State<Arc<LoggingState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<crate::tracing::RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let response = next.run(req).await;
    let status = response.status().as_u16();
    let duration_ms: u128 = start_time.elapsed().as_millis();

    if status >= 500 {
        slog::error!(
            &state.logger,
            "HTTP request failed";
            "method" => method,
            "path" => path,
            "status" => status,
            "duration_ms" => duration_ms,
            "request_id" => request_id,
        );
    } else {
        slog::info!(
            &state.logger,
            "HTTP request handled";
            "method" => method,
            "path" => path,
            "status" => status,
            "duration_ms" => duration_ms,
            "request_id" => request_id,
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn access_log_passes_response_through() {
        let state = Arc::new(LoggingState::discard());
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(
                state,
                access_log_middleware,
            ));

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
