use anyhow::{Context, bail};
use chrono::Duration;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unzip_ufop::config::UnzipConfig;
use unzip_ufop::infrastructure::storage;
use unzip_ufop::services::charset::LegacyCharsetDecoder;
use unzip_ufop::services::fetcher::HttpSourceFetcher;
use unzip_ufop::services::token::{JwtTokenSigner, TokenSigner};
use unzip_ufop::services::unzip_service::UnzipService;
use unzip_ufop::{AppState, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unzip_ufop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting unzip service...");

    let config = UnzipConfig::from_env();
    if config.signing_secret.is_empty() {
        bail!("UPLOAD_SIGNING_SECRET must be set");
    }
    info!(
        "⚙️  Upload Config: Put Threshold={}MB, Chunk Size={}MB, Chunk Workers={}",
        config.put_threshold / 1024 / 1024,
        config.chunk_size / 1024 / 1024,
        config.chunk_workers
    );

    let names = LegacyCharsetDecoder::for_label(&config.fallback_charset)
        .with_context(|| format!("unknown charset '{}'", config.fallback_charset))?;
    info!("🈶 Fallback charset for entry names: {}", names.fallback().name());

    let signer: Arc<dyn TokenSigner> = Arc::new(JwtTokenSigner::new(
        config.signing_secret.clone(),
        Duration::seconds(config.token_ttl_secs),
    ));

    // Setup Infrastructure
    let (store, dispatcher) = storage::setup_storage(&config, signer).await?;

    let unzip_service = Arc::new(UnzipService::new(
        Arc::new(HttpSourceFetcher::default()),
        Arc::new(names),
        dispatcher,
    ));

    let state = AppState {
        unzip: unzip_service,
        store,
    };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid UNZIP_LISTEN_ADDR '{}'", config.listen_addr))?;
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
