use std::{fs, path::Path, process};

use cachewire::{
    config::{self, Command, OutputFormat, PlanArgs, Settings},
    error::AppError,
    listeners::{CacheEvent, ListenerDispatcher, ListenerRegistry, LoggingListener, batch_events},
    plan::CachePlan,
    policy::{Policy, PolicyTable, Resolution},
    telemetry,
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(Command::Plan(PlanArgs::default()));

    telemetry::init(&settings.logging)?;

    let table = settings.policy_table()?;
    info!(
        policies = table.len(),
        default_max_entries = table.default_policy().max_entries,
        "Cache policy table loaded"
    );

    match command {
        Command::Plan(args) => run_plan(&settings, &table, args.format),
        Command::Resolve(args) => run_resolve(&table, &args.name),
        Command::Caches => run_caches(&settings, &table),
        Command::Dispatch(args) => run_dispatch(&settings, &args.file),
    }
}

fn run_plan(settings: &Settings, table: &PolicyTable, format: OutputFormat) -> Result<(), AppError> {
    let plan = CachePlan::build(settings, table)?;
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&plan)?,
        OutputFormat::Toml => toml::to_string_pretty(&plan)?,
    };
    println!("{rendered}");
    Ok(())
}

#[derive(Serialize)]
struct ResolvedPolicy<'a> {
    name: &'a str,
    resolution: Resolution,
    policy: Policy,
}

fn run_resolve(table: &PolicyTable, name: &str) -> Result<(), AppError> {
    let (policy, resolution) = table.resolve_with_origin(name);
    let output = ResolvedPolicy {
        name,
        resolution,
        policy,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_caches(settings: &Settings, table: &PolicyTable) -> Result<(), AppError> {
    let plan = CachePlan::build(settings, table)?;
    for name in plan.cache_names() {
        println!("{name}");
    }
    Ok(())
}

fn run_dispatch(settings: &Settings, path: &Path) -> Result<(), AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let events: Vec<CacheEvent> =
        serde_json::from_str(&raw).map_err(|source| AppError::Events {
            path: path.to_path_buf(),
            source,
        })?;

    let dispatcher = ListenerDispatcher::new(build_registry(settings).into_shared());

    let batches = batch_events(events);
    info!(batches = batches.len(), file = %path.display(), "Dispatching cache entry events");

    for (kind, batch) in batches {
        let cache = batch.first().map(|event| event.cache.clone()).unwrap_or_default();
        let listeners = dispatcher.registry().len(kind);
        let failures = dispatcher.dispatch_report(kind, &batch);
        println!(
            "{kind} cache={cache} events={} listeners={listeners} failures={}",
            batch.len(),
            failures.len()
        );
    }
    Ok(())
}

fn build_registry(settings: &Settings) -> ListenerRegistry {
    let mut registry = ListenerRegistry::new();
    let logging = &settings.listeners.logging;
    if logging.enabled {
        registry.register_capabilities(
            LoggingListener::new(logging.key_only_prefixes.iter().cloned()).capabilities(),
        );
    }
    registry
}
