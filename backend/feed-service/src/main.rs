use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use crypto_core::JwtKeys;
use feed_service::config::{Config, LogFormat};
use feed_service::db::{self, Store};
use feed_service::images::ImageStore;
use feed_service::middleware::AuthMiddleware;
use feed_service::{realtime, schema, AppState};
use std::io;
use tracing_subscriber::prelude::*;

const DEFAULT_LOG_FILTER: &str = "info,feed_service=debug,actix_web=info";

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

fn to_io<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> io::Error + '_ {
    move |e| io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

/// Feed Service
///
/// Serves the REST and GraphQL APIs, the `/socket` realtime feed and stored
/// post images.
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Container health checks run `feed-service healthcheck`
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        let port = std::env::var("SERVER_PORT").unwrap_or_else(|_| "8080".to_string());
        let url = format!("http://127.0.0.1:{}/health", port);
        return match reqwest::Client::new().get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                eprintln!("healthcheck HTTP status: {}", resp.status());
                Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
            }
            Err(e) => {
                eprintln!("healthcheck HTTP error: {}", e);
                Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
            }
        };
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.logging.format);
    tracing::info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);
    tracing::debug!(?config, "configuration loaded");

    let keys = JwtKeys::from_secret(&config.auth.jwt_secret, config.auth.jwt_expiry_secs)
        .map_err(to_io("Failed to initialize JWT keys"))?;

    let store = match &config.database_url {
        Some(url) => {
            let db_cfg = db_pool::DbConfig::from_env("feed-service", url)
                .map_err(to_io("Invalid database pool configuration"))?;
            db_cfg.log_config();

            let pool = db_pool::create_pool(db_cfg)
                .await
                .map_err(to_io("Failed to create database pool"))?;
            db::run_migrations(&pool)
                .await
                .map_err(to_io("Failed to run migrations"))?;

            tracing::info!("Connected to PostgreSQL");
            Store::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            Store::memory()
        }
    };

    let images = ImageStore::new(&config.feed.images_dir, config.feed.max_upload_bytes);
    images
        .ensure_dir()
        .await
        .map_err(to_io("Failed to create images directory"))?;

    let broadcaster = realtime::init(config.feed.realtime_capacity)
        .map_err(to_io("Failed to initialize realtime broadcaster"))?;

    let state = AppState::new(
        store,
        keys.clone(),
        images,
        broadcaster,
        config.feed.posts_per_page,
    );
    let gql_schema = schema::build_schema(state.clone());

    let bind_address = config.bind_address();
    let allowed_origins = config.cors.allowed_origins.clone();
    tracing::info!("Starting HTTP server at {}", bind_address);

    let state_data = web::Data::new(state);
    let schema_data = web::Data::new(gql_schema);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state_data.clone())
            .app_data(schema_data.clone())
            .wrap(AuthMiddleware::new(keys.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(feed_service::configure)
    })
    .bind(&bind_address)?
    .workers(config.app.workers)
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let mut server_task = tokio::spawn(server);

    tokio::select! {
        joined = &mut server_task => {
            tracing::error!("HTTP server exited unexpectedly");
            return flatten_join(joined);
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping HTTP server");
        }
    }

    server_handle.stop(true).await;
    flatten_join(server_task.await)
}

fn flatten_join(joined: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
    }
}
