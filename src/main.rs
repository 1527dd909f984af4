use std::{process, sync::Arc, time::Duration};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use ladle::{
    application::{
        RecipeService,
        error::AppError,
        tasks::{TaskQueue, TaskStatusTracker, WorkerContext, process_external_api_task},
    },
    cache::{Cache, CacheConfig, MemoryBackend},
    config,
    infra::{
        error::InfraError,
        external::{OpenFoodFactsClient, TheMealDbClient},
        http::{self, AppState},
        repo::MemoryRecipesRepo,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = if cache_config.enabled {
        Cache::new(Arc::new(MemoryBackend::new(&cache_config)))
    } else {
        info!("response caching disabled by configuration");
        Cache::disabled()
    };

    let repo = Arc::new(MemoryRecipesRepo::new());
    let recipes = Arc::new(RecipeService::new(repo, cache.clone(), &cache_config));

    let tracker = Arc::new(TaskStatusTracker::new(settings.tasks.result_ttl));
    let tasks = TaskQueue::new(tracker.clone());

    let mealdb = Arc::new(
        TheMealDbClient::new(
            &settings.external.themealdb_base_url,
            &settings.external.themealdb_api_key,
            settings.external.request_timeout,
            cache.clone(),
        )
        .map_err(AppError::from)?,
    );
    let foodfacts = Arc::new(
        OpenFoodFactsClient::new(
            &settings.external.openfoodfacts_base_url,
            settings.external.request_timeout,
            cache.clone(),
        )
        .map_err(AppError::from)?,
    );

    let worker_context = WorkerContext {
        tracker: tracker.clone(),
        mealdb,
        foodfacts,
        results_dir: settings.results.directory.clone(),
    };

    let monitor_handle = spawn_task_monitor(
        &tasks,
        worker_context,
        settings.tasks.worker_concurrency.get() as usize,
    );
    let prune_handle = spawn_tracker_pruner(tracker.clone(), settings.tasks.prune_interval);

    let state = AppState {
        recipes,
        tasks,
        tracker,
        health_wait: settings.tasks.health_wait,
    };
    let result = serve_http(settings.server.listen_addr, state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;
    prune_handle.abort();
    let _ = prune_handle.await;

    result
}

fn spawn_task_monitor(
    tasks: &TaskQueue,
    context: WorkerContext,
    concurrency: usize,
) -> tokio::task::JoinHandle<()> {
    let worker = WorkerBuilder::new("external-api-worker")
        .concurrency(concurrency)
        .data(context)
        .backend(tasks.storage())
        .build_fn(process_external_api_task);

    let monitor = Monitor::new().register(worker);

    tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "task monitor stopped");
        }
    })
}

fn spawn_tracker_pruner(
    tracker: Arc<TaskStatusTracker>,
    cadence: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let pruned = tracker.prune_expired();
            if pruned > 0 {
                info!(pruned, "pruned expired task records");
            }
        }
    })
}

async fn serve_http(addr: std::net::SocketAddr, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(%addr, "listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
