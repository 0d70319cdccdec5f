use std::{
    future::IntoFuture as _,
    io,
    sync::OnceLock,
    time,
};

use application::{router, Args, Config};
use axum::{body::Body, extract::MatchedPath};
use axum_client_ip::InsecureClientIp;
use futures::{future, TryFutureExt as _};
use itertools::Itertools as _;
use service::{
    infra::{gateway::Mpesa, postgres, storage, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::MakeWriter,
    layer::{Layer as _, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(log_layer(io::stdout, false))
        .with(log_layer(io::stderr, true))
        .init();

    _ = start().await;
}

/// Creates a compact log layer writing into the provided `writer` either the
/// [`STDERR_LEVELS`] events or all the others.
fn log_layer<S, W>(
    writer: W,
    stderr: bool,
) -> impl tracing_subscriber::Layer<S>
where
    S: log::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            meta.is_span()
                || (STDERR_LEVELS.contains(meta.level()) == stderr)
                    && LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO)
                        >= *meta.level()
        }))
}

async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let config = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;
    let service_config = config.service_config().map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;
    let Config {
        postgres,
        service: _,
        server,
        storage: storage_config,
        mpesa: mpesa_config,
        log,
    } = config;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let postgres_config = postgres.into();
    let mut postgres = Postgres::new(&postgres_config).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;

    migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;

    let storage =
        storage::Fs::new(storage_config.root, storage_config.public_url);
    let storage_root = storage.root().clone();
    let gateway = Mpesa::new(mpesa_config.into());
    let (service, background) =
        Service::new(service_config, postgres, storage, gateway);

    let mut cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ]);
    for origin in server.cors.origins {
        cors = cors.allow_origin(
            origin.parse::<http::header::HeaderValue>().map_err(|e| {
                log::error!("`{origin}` is not current CORS origin: {e}");
            })?,
        );
    }

    let app = router(service, &server.storage_path, storage_root)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(http_span)
                .on_response(log_response),
        );

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);
    log::info!(
        "running background tasks: {}",
        background.names().format(", "),
    );

    future::try_join(
        axum::serve(listener, app)
            .into_future()
            .map_err(|e| log::error!("webserver failed: {e}")),
        background.into_future().map_err(|e| {
            log::error!("background {e}");
        }),
    )
    .await
    .map(drop)
}

/// Creates a [`tracing::Span`] of the provided HTTP request.
fn http_span(r: &http::Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "HTTP request",
        http.client_ip = InsecureClientIp::from(r.headers(), r.extensions())
            .map(|ip| ip.0.to_string())
            .ok(),
        http.flavor = ?r.version(),
        http.host = r.uri().host(),
        http.method = r.method().as_str(),
        http.route = r
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
        http.scheme = r.uri().scheme().map(http::uri::Scheme::as_str),
        http.target = r
            .uri()
            .path_and_query()
            .map(http::uri::PathAndQuery::as_str),
        http.user_agent = r
            .headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok()),
        http.status_code = tracing::field::Empty,
    )
}

/// Logs the provided HTTP response along with its `duration`.
fn log_response(
    r: &http::Response<Body>,
    duration: time::Duration,
    span: &tracing::Span,
) {
    _ = span.record(
        "http.status_code",
        tracing::field::display(r.status().as_u16()),
    );

    let duration = format!("{}ms", duration.as_millis());
    if r.status().is_server_error() {
        tracing::error!(duration = %duration);
    } else if r.status().is_client_error() {
        tracing::warn!(duration = %duration);
    } else {
        tracing::info!(duration = %duration);
    }
}
