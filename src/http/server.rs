//! HTTP server runtime.
//!
//! # Responsibilities
//! - Hold the route table attached by the application
//! - Wire up middleware (request ID, access log, timeout, panic recovery)
//! - Apply application middleware to every route, the fallback included
//! - Bind the listener and serve until shutdown
//! - Size the worker pool from the handoff settings
//!
//! # Design Decisions
//! - Serving runs on a dedicated multi-threaded runtime with `workers`
//!   threads; the startup sequence runs on the caller's runtime
//! - The built-in trace layer is only attached when the handoff asks for
//!   an access log
//! - Stops on Ctrl+C or when the `Shutdown` handle is triggered
//! - Application layers sit inside the built-in stack, so a panic or error
//!   they produce still reaches the access log
//!
//! # Layer Order (outermost first)
//! ```text
//! Trace? → SetRequestId → access_log → PropagateRequestId → Timeout
//!        → CatchPanic → application layers → routes / fallback
//! ```

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::Route,
    Router,
};
use std::any::Any;
use std::convert::Infallible;
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::{Layer, Service};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::middleware::access_log;
use crate::http::request::MakeRequestUuid;
use crate::http::response::AppError;
use crate::lifecycle::{ServeOptions, ServerRuntime, Shutdown};
use crate::observability::Logger;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type RouterLayer = Box<dyn FnOnce(Router) -> Router + Send>;

/// Axum-backed server runtime.
pub struct AxumRuntime {
    routes: Router,
    layers: Vec<RouterLayer>,
    prefix: String,
    logger: Logger,
    shutdown: Shutdown,
    request_timeout: Duration,
}

impl AxumRuntime {
    pub fn new(logger: Logger) -> Self {
        Self {
            routes: Router::new(),
            layers: Vec::new(),
            prefix: String::new(),
            logger,
            shutdown: Shutdown::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Global prefix applied to routes added after this call.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Attach a set of routes under the global prefix.
    pub fn route(mut self, routes: Router) -> Self {
        self.routes = if self.prefix.is_empty() {
            self.routes.merge(routes)
        } else {
            self.routes.nest(&self.prefix, routes)
        };
        self
    }

    /// Add application middleware around every route and the fallback.
    ///
    /// Layers wrap in call order (the last one added runs first) regardless
    /// of when routes are attached.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Box::new(move |router: Router| router.layer(layer)));
        self
    }

    /// Handle that stops the server once it is running.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Build the final router with all middleware layers.
    #[allow(deprecated)]
    pub fn into_router(self, access_log_enabled: bool) -> Router {
        let routes = self.routes.fallback(|| async { StatusCode::NOT_FOUND });
        let router = self
            .layers
            .into_iter()
            .fold(routes, |router, apply| apply(router))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(from_fn_with_state(self.logger, access_log))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if access_log_enabled {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        }
    }
}

/// Render a handler panic as a 500 envelope carrying the panic message.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    AppError::internal(message).into_response()
}

impl ServerRuntime for AxumRuntime {
    async fn serve(self, options: ServeOptions) -> io::Result<()> {
        if options.reload {
            tracing::warn!("Hot reload requested; the axum runtime does not reload in-process");
        }

        let shutdown = self.shutdown.clone();
        let router = self.into_router(options.access_log);
        let address = options.bind_address();
        let workers = options.workers.max(1);

        tokio::task::spawn_blocking(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(workers)
                .thread_name("svckit-worker")
                .enable_all()
                .build()?;
            runtime.block_on(serve_router(router, address, workers, shutdown))
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

async fn serve_router(router: Router, address: String, workers: usize, shutdown: Shutdown) -> io::Result<()> {
    let listener = TcpListener::bind(&address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(address = %local_addr, workers, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Wait for Ctrl+C or an explicit shutdown trigger.
async fn shutdown_signal(shutdown: Shutdown) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                shutdown.wait().await;
            }
        }
        _ = shutdown.wait() => {}
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogOptions;
    use crate::http::request::X_REQUEST_ID;
    use crate::http::response::JsonResp;
    use crate::observability::MemorySink;
    use axum::{body::Body, extract::Request, routing::get};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn runtime() -> (AxumRuntime, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(LogOptions::default(), sink.clone());
        let routes = Router::new().route("/", get(|| async { JsonResp::ok(json!({"name": "svckit"})) }));
        (AxumRuntime::new(logger).with_prefix("/api/v1/").route(routes), sink)
    }

    #[tokio::test]
    async fn test_prefixed_route_and_request_id() {
        let (runtime, sink) = runtime();
        let router = runtime.into_router(false);

        let response = router
            .oneshot(Request::builder().uri("/api/v1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(!records[0]["request_id"].as_str().unwrap().is_empty());
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_error_envelope() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(LogOptions::default(), sink.clone());
        let routes = Router::new().route(
            "/boom",
            get(|| async {
                if true {
                    panic!("cache exploded");
                }
                "unreachable"
            }),
        );
        let router = AxumRuntime::new(logger).route(routes).into_router(false);

        let response = router
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"code": 500, "msg": "cache exploded", "data": null})
        );

        let records = sink.records();
        assert_eq!(records[1]["status"], 500);
        let last = records.last().unwrap();
        assert_eq!(last["type"], "ERROR");
        assert_eq!(last["msg"], "cache exploded");
    }

    #[tokio::test]
    async fn test_application_layer_covers_routes_and_fallback() {
        use axum::middleware::{from_fn, Next};
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let tag = from_fn(move |request: Request, next: Next| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut response = next.run(request).await;
                response
                    .headers_mut()
                    .insert("x-served-by", axum::http::HeaderValue::from_static("svckit"));
                response
            }
        });

        let logger = Logger::with_sink(LogOptions::default(), Arc::new(MemorySink::new()));
        // Routes attached after the layer are covered too.
        let routes = Router::new().route("/ping", get(|| async { "pong" }));
        let router = AxumRuntime::new(logger).layer(tag).route(routes).into_router(false);

        let ok = router
            .clone()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.headers()["x-served-by"], "svckit");

        let missing = router
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unprefixed_path_is_not_found() {
        let (runtime, _sink) = runtime();
        let response = runtime
            .into_router(false)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
