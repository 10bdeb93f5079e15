use anyhow::Result;
use axum::Router;
use catalog_import::{
    config::AppConfig,
    db,
    pipeline::{
        consumer::CatalogBatchProcessor,
        gateway::UploadGateway,
        parser::ImportFileParser,
        products::ProductCreator,
        runner::{QueuePoller, TriggerRunner, join_workers},
    },
    routes,
    services::{
        catalog_store::{SqliteCatalogStore, UuidGenerator},
        notifier::SqliteNotifier,
        storage_service::StorageService,
        url_signer::HmacUrlSigner,
        work_queue::SqliteWorkQueue,
    },
    state::AppState,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;
    let pipeline = &cfg.pipeline;

    tracing::info!("Starting catalog-import with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection + schema ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);
    db::run_migrations(&db).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Storage with change events feeding the import trigger ---
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let storage = StorageService::new(db.clone(), cfg.storage_dir.clone()).with_events(events_tx);
    storage.ensure_bucket(&pipeline.bucket).await?;

    // --- Pipeline stages ---
    let queue = SqliteWorkQueue::new(
        db.clone(),
        pipeline.queue_name.clone(),
        pipeline.visibility_timeout(),
    );
    let notifier = Arc::new(SqliteNotifier::new(db.clone()));
    let catalog = SqliteCatalogStore::new(
        db.clone(),
        pipeline.product_table.clone(),
        pipeline.stock_table.clone(),
    )?;
    catalog.ensure_tables().await?;

    let signer = Arc::new(HmacUrlSigner::new(
        &pipeline.signing_secret,
        &pipeline.public_base_url,
    )?);
    let gateway = Arc::new(UploadGateway::new(signer.clone(), pipeline));
    let parser = Arc::new(ImportFileParser::new(
        Arc::new(storage.clone()),
        Arc::new(queue.clone()),
        pipeline,
    ));
    let catalog = Arc::new(catalog);
    let ids = Arc::new(UuidGenerator);
    let products = Arc::new(ProductCreator::new(catalog.clone(), ids.clone()));
    let processor = Arc::new(CatalogBatchProcessor::new(
        catalog,
        notifier.clone(),
        ids,
        pipeline,
    ));

    // --- Background workers ---
    let shutdown = CancellationToken::new();
    let trigger = tokio::spawn(
        TriggerRunner::new(parser, pipeline).run(events_rx, shutdown.clone()),
    );
    let poller = tokio::spawn(QueuePoller::new(queue, processor, pipeline).run(shutdown.clone()));

    let mut notifications = notifier.subscribe();
    let subscriber_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = subscriber_shutdown.cancelled() => break,
                received = notifications.recv() => match received {
                    Ok(n) => tracing::info!("[{}] {}: {}", n.topic, n.subject, n.message),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("notification log skipped {} messages", skipped)
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    // --- Build router ---
    let state = AppState {
        storage,
        gateway,
        products,
        signer,
    };
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", err);
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if join_workers(vec![("trigger runner", trigger), ("queue poller", poller)]).await == 0 {
        tracing::info!("Shut down cleanly.");
    }
    Ok(())
}
