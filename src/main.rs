use std::{process, sync::Arc};

use archivist::{
    application::{collection::ContentCollection, error::AppError},
    archive::{Archive, Month},
    config,
    domain::date::SimpleDate,
    infra::{clock::SystemClock, store::TomlStore, telemetry},
};
use serde_json::{Value, json};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Stats(config::StatsArgs::default()));

    telemetry::init(&settings.logging)?;

    let collection = build_collection(&settings)?;
    match command {
        config::Command::Reindex(_) => run_reindex(&collection).await,
        config::Command::Archive(args) => run_archive(&collection, args).await,
        config::Command::Stats(_) => run_stats(&collection).await,
    }
}

fn build_collection(settings: &config::Settings) -> Result<ContentCollection, AppError> {
    let store = Arc::new(TomlStore::new(&settings.collection.store_path));
    let clock = Arc::new(SystemClock::new(settings.collection.timezone));

    let mut builder = ContentCollection::builder(settings.collection.id.clone(), store)
        .clock(clock)
        .entry_plugins(settings.listeners.entry.iter().cloned())
        .response_plugins(settings.listeners.response.iter().cloned())
        .recent_entries(settings.collection.recent_entries);
    if let Some(path) = settings.request_log.path.as_ref() {
        builder = builder.request_log(path.clone());
    }
    builder.build()
}

/// Load the collection from its store; static page failures are not fatal here.
async fn load(collection: &ContentCollection) -> Result<(), AppError> {
    let report = collection.reindex().await;
    if let Err(err) = &report.static_pages {
        warn!(
            collection = collection.id(),
            error = %err,
            "Static pages unavailable"
        );
    }
    report.entries?;
    Ok(())
}

async fn run_reindex(collection: &ContentCollection) -> Result<(), AppError> {
    info!(
        target = "archivist::reindex",
        collection = collection.id(),
        "Starting reindex"
    );

    let report = collection.reindex().await;
    let summary = report.entries?;
    let pages = report.static_pages?;

    print_json(&json!({
        "collection": collection.id(),
        "entries": summary.entries,
        "published": summary.published,
        "responses": summary.responses,
        "static_pages": pages,
        "elapsed_ms": summary.elapsed_ms,
    }))
}

async fn run_archive(
    collection: &ContentCollection,
    args: config::ArchiveArgs,
) -> Result<(), AppError> {
    load(collection).await?;
    let archive = collection.archive();
    let date = args.date.unwrap_or_else(|| collection.clock().today());

    print_json(&archive_navigation(&archive, date))
}

fn archive_navigation(archive: &Archive, date: SimpleDate) -> Value {
    let day = archive.day(date);
    let month = archive.month(date.year(), date.month());
    let year = archive.year(date.year());

    json!({
        "day": {
            "date": day.date().to_string(),
            "entries": day.blog_entries(),
            "published": day.published_blog_entries(),
            "previous": archive.previous_day(&day).date().to_string(),
            "next": archive.next_day(&day).date().to_string(),
        },
        "month": {
            "month": month_label(&month),
            "entries": month.number_of_blog_entries(),
            "active_days": month
                .active_days()
                .iter()
                .map(|day| day.day())
                .collect::<Vec<_>>(),
            "previous": month_label(&archive.previous_month(&month)),
            "next": month_label(&archive.next_month(&month)),
        },
        "year": {
            "year": year.year(),
            "entries": year.number_of_blog_entries(),
            "active_months": year
                .active_months()
                .iter()
                .map(|month| month.month())
                .collect::<Vec<_>>(),
        },
        "first_month": month_label(&archive.first_month()),
    })
}

fn month_label(month: &Month) -> String {
    format!("{:04}-{:02}", month.year(), month.month())
}

async fn run_stats(collection: &ContentCollection) -> Result<(), AppError> {
    load(collection).await?;
    let indexes = collection.indexes();
    let archive = collection.archive();

    print_json(&json!({
        "collection": collection.id(),
        "entries": {
            "all": indexes.entries.number_of_entries(),
            "published": indexes.entries.number_of_published_entries(),
            "unpublished": indexes.entries.number_of_unpublished_entries(),
            "recent_published": collection.recent_published_entries(),
        },
        "responses": {
            "approved": indexes.responses.number_of_approved(),
            "pending": indexes.responses.number_of_pending(),
            "rejected": indexes.responses.number_of_rejected(),
        },
        "tags": collection.tag_cloud().as_slice(),
        "categories": indexes.categories.categories(),
        "authors": indexes.authors.authors(),
        "static_pages": indexes.pages.names(),
        "years": archive
            .years()
            .iter()
            .map(|year| json!({ "year": year.year(), "entries": year.number_of_blog_entries() }))
            .collect::<Vec<_>>(),
        "last_modified": collection.last_modified().map(|at| at.to_string()),
    }))
}

fn print_json(value: &Value) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
