use crate::auth::USER_ID_HEADER;
use http::{Method, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{error, info, info_span, warn, Instrument};

/// Which requests the access log skips
#[derive(Clone, Debug)]
pub struct HttpLoggingConfig {
    /// Path prefixes, e.g. "/health"
    pub ignored_paths: Vec<String>,
}

impl Default for HttpLoggingConfig {
    fn default() -> Self {
        Self {
            ignored_paths: vec!["/health".to_string()],
        }
    }
}

impl HttpLoggingConfig {
    pub fn new(ignored_paths: Vec<String>) -> Self {
        Self { ignored_paths }
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignored_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[derive(Clone)]
pub struct HttpLoggingLayer {
    config: HttpLoggingConfig,
}

impl HttpLoggingLayer {
    pub fn new(config: HttpLoggingConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpLoggingService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// One access-log line per request, inside a span tagged with the caller
#[derive(Clone)]
pub struct HttpLoggingService<S> {
    inner: S,
    config: HttpLoggingConfig,
}

/// How a finished request is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Served,
    ServerError,
    Failed,
}

fn classify(status: Option<StatusCode>) -> Outcome {
    match status {
        Some(status) if status.is_server_error() => Outcome::ServerError,
        Some(_) => Outcome::Served,
        None => Outcome::Failed,
    }
}

fn log_request(
    method: &Method,
    path: &str,
    elapsed: Duration,
    status: Option<StatusCode>,
    failure: Option<&dyn std::fmt::Display>,
) {
    let duration_ms = elapsed.as_millis() as u64;
    let http_status = status.map(|s| s.as_u16()).unwrap_or_default();
    match classify(status) {
        Outcome::Served => {
            info!(%method, path, http_status, duration_ms, "request served")
        }
        Outcome::ServerError => {
            warn!(%method, path, http_status, duration_ms, "request failed on the server")
        }
        Outcome::Failed => {
            let failure = failure.map(ToString::to_string).unwrap_or_default();
            error!(%method, path, duration_ms, error = %failure, "request aborted")
        }
    }
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for HttpLoggingService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Error: std::fmt::Display,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        if self.config.is_ignored(req.uri().path()) {
            return Box::pin(self.inner.call(req));
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let span = info_span!("http_request", %method, path = %path, user_id = %user_id);

        let started = Instant::now();
        let response = self.inner.call(req);

        Box::pin(
            async move {
                let result = response.await;
                match &result {
                    Ok(res) => {
                        log_request(&method, &path, started.elapsed(), Some(res.status()), None)
                    }
                    Err(e) => {
                        let failure: &dyn std::fmt::Display = e;
                        log_request(&method, &path, started.elapsed(), None, Some(failure))
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[test]
    fn test_ignored_paths_match_by_prefix() {
        let config = HttpLoggingConfig::new(vec!["/health".to_string()]);
        assert!(config.is_ignored("/health"));
        assert!(config.is_ignored("/healthz"));
        assert!(!config.is_ignored("/devices"));
    }

    #[test]
    fn test_server_errors_are_reported_apart() {
        assert_eq!(classify(Some(StatusCode::OK)), Outcome::Served);
        assert_eq!(classify(Some(StatusCode::NOT_FOUND)), Outcome::Served);
        assert_eq!(
            classify(Some(StatusCode::INTERNAL_SERVER_ERROR)),
            Outcome::ServerError
        );
        assert_eq!(classify(None), Outcome::Failed);
    }

    #[tokio::test]
    async fn test_layer_passes_response_through() {
        let inner = service_fn(|_req: http::Request<()>| async {
            Ok::<_, Infallible>(
                http::Response::builder()
                    .status(StatusCode::CREATED)
                    .body(())
                    .unwrap(),
            )
        });
        let service = HttpLoggingLayer::new(HttpLoggingConfig::default()).layer(inner);

        let request = http::Request::builder()
            .uri("/devices")
            .header(USER_ID_HEADER, "alice")
            .body(())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_ignored_path_is_still_served() {
        let inner = service_fn(|_req: http::Request<()>| async {
            Ok::<_, Infallible>(http::Response::new(()))
        });
        let service = HttpLoggingLayer::new(HttpLoggingConfig::default()).layer(inner);

        let response = service
            .oneshot(http::Request::builder().uri("/health").body(()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
