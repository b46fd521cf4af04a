use std::{process, sync::Arc, time::Duration};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use vetrina::{
    application::campaigns::{CampaignService, MergeMode},
    application::error::AppError,
    application::repos::{CampaignsRepo, ImageIndex, ProductCatalog, VariantIndex},
    cache::{CacheStore, ListingKey},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        memory::MemoryCacheStore,
        telemetry,
        uploads::PictureStorage,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::unexpected(
            InfraError::configuration("database.url is required to serve").to_string(),
        )
    })?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::unexpected(InfraError::database(err.to_string()).to_string()))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::unexpected(InfraError::database(err.to_string()).to_string()))?;

    let repositories = Arc::new(PostgresRepositories::new(pool));
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let listing_key = ListingKey::new(&settings.cache.namespace);
    let merge_mode = if settings.listing.strict_merge {
        MergeMode::Strict
    } else {
        MergeMode::Lax
    };

    let campaigns = Arc::new(CampaignService::new(
        repositories.clone() as Arc<dyn CampaignsRepo>,
        repositories.clone() as Arc<dyn ProductCatalog>,
        repositories.clone() as Arc<dyn ImageIndex>,
        repositories.clone() as Arc<dyn VariantIndex>,
        cache,
        listing_key,
        merge_mode,
    ));

    let pictures = Arc::new(
        PictureStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::unexpected(InfraError::from(err).to_string()))?,
    );

    let state = ApiState {
        campaigns,
        db: repositories,
        pictures,
    };
    let upload_body_limit = settings.uploads.max_request_bytes.get() as usize;
    let router = http::build_router(state, upload_body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::unexpected(InfraError::from(err).to_string()))?;

    info!(
        addr = %settings.server.addr,
        merge_mode = ?merge_mode,
        "vetrina listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(
        grace_seconds = grace.as_secs(),
        "shutdown signal received, draining connections"
    );
}
