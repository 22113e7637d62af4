use std::{process, sync::Arc, time::Duration};

use funguy::{
    application::{
        chrome::ChromeService,
        content::{
            ContentClient, ContentStore, ContentStoreConfig, configure_content_store,
            content_store_config,
        },
        error::AppError,
        image::ImageUrlBuilder,
        site::SiteService,
    },
    cache::{CacheConfig, QueryCache},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        sanity::SanityStore,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    configure_content_store(settings.content.store_config())
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Query(args) => run_query(args).await,
    }
}

fn installed_store_config() -> Result<&'static ContentStoreConfig, AppError> {
    content_store_config().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "content store configuration was not installed",
        ))
    })
}

fn build_site_service(settings: &config::Settings) -> Result<SiteService, AppError> {
    let store_config = installed_store_config()?;
    let store: Arc<dyn ContentStore> = Arc::new(SanityStore::new(store_config)?);
    let cache = Arc::new(QueryCache::new(&CacheConfig::from(&settings.cache)));
    let content = ContentClient::new(store, cache);

    Ok(SiteService::new(
        content,
        ImageUrlBuilder::from_config(store_config),
        settings.cache.revalidate,
    ))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let site = Arc::new(build_site_service(&settings)?);
    let chrome = Arc::new(ChromeService::new(
        settings.site.brand_title.clone(),
        settings.site.public_site_url.as_str(),
    ));

    if settings.site.warm_on_startup {
        let site = Arc::clone(&site);
        tokio::spawn(async move {
            if let Err(err) = site.warm().await {
                warn!(target = "funguy::startup", error = %err, "Cache warm-up failed");
            }
        });
    }

    serve_http(&settings, HttpState { site, chrome }).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "funguy::startup",
        addr = %settings.server.public_addr,
        revalidate = %settings.cache.revalidate.cache_control(),
        "Listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let deadline = drain_deadline(shutdown_rx, settings.server.graceful_shutdown);

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(
                target = "funguy::shutdown",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "funguy::shutdown", "Server stopped");
    Ok(())
}

async fn run_query(args: config::QueryArgs) -> Result<(), AppError> {
    let store = SanityStore::new(installed_store_config()?)?;
    let value = store.query(&args.query, &args.query_params()).await?;

    let rendered = if args.compact {
        serde_json::to_string(&value)
    } else {
        serde_json::to_string_pretty(&value)
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode result: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // A closed channel also means shutdown.
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn drain_deadline(rx: watch::Receiver<bool>, grace: Duration) {
    wait_for_shutdown(rx).await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "funguy::shutdown", error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "funguy::shutdown", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!(target = "funguy::shutdown", "Shutdown signal received, draining connections");
}
