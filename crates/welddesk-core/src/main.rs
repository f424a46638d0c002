use anyhow::Context;
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;
use welddesk_core::schema::{collections, keys};
use welddesk_core::{telemetry, AppConfig, LifecycleService, RootKind, Session};
use welddesk_order::{OrderAllocator, SortDirection};
use welddesk_store::{fields, ActorId, Document, EntityId, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("welddesk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Welddesk record lifecycle tools")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML config file"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("demo")
                .about("Seed an in-memory project, preview and cascade-delete it")
                .arg(
                    Arg::new("logs")
                        .long("logs")
                        .default_value("3")
                        .value_parser(value_parser!(usize))
                        .help("Weld logs in the project"),
                )
                .arg(
                    Arg::new("welds")
                        .long("welds")
                        .default_value("40")
                        .value_parser(value_parser!(usize))
                        .help("Welds per weld log"),
                )
                .arg(
                    Arg::new("sections")
                        .long("sections")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Sections in the project's document library"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("orders")
                .about("Print order keys for a fresh batch of siblings")
                .arg(
                    Arg::new("count")
                        .long("count")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Number of siblings"),
                )
                .arg(
                    Arg::new("descending")
                        .long("descending")
                        .action(ArgAction::SetTrue)
                        .help("Newest-first list"),
                ),
        );

    let matches = cli.get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };
    telemetry::init(&config.logging);

    match matches.subcommand() {
        Some(("demo", args)) => {
            let logs = args.get_one::<usize>("logs").copied().unwrap_or(3);
            let welds = args.get_one::<usize>("welds").copied().unwrap_or(40);
            let sections = args.get_one::<usize>("sections").copied().unwrap_or(2);
            run_demo(&config, logs, welds, sections, args.get_flag("json")).await?;
        }
        Some(("orders", args)) => {
            let count = args.get_one::<usize>("count").copied().unwrap_or(5);
            let direction = if args.get_flag("descending") {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            let allocator = OrderAllocator::new(config.ordering);
            for (position, key) in allocator
                .order_values_for_batch(count, direction)
                .into_iter()
                .enumerate()
            {
                println!("{position}\t{key}");
            }
        }
        _ => anyhow::bail!("no subcommand given"),
    }

    Ok(())
}

async fn run_demo(
    config: &AppConfig,
    logs: usize,
    welds: usize,
    sections: usize,
    json: bool,
) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::with_limits(config.store));
    let actor = ActorId::new("demo-inspector")?;
    let project = seed_demo(&store, &actor, logs, welds, sections)?;

    let service = LifecycleService::new(Arc::clone(&store), config)?;
    let session = Session::authenticated(actor);

    let preview = service
        .preview_delete(&session, RootKind::Project, &project)
        .await?;
    if !json {
        println!(
            "Preview: {} records in {} write groups",
            preview.planned_writes, preview.planned_groups
        );
    }

    let report = service.delete(&session, RootKind::Project, &project).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cascade Report:");
    println!("  Root: {}", report.root);
    println!("  Queries: {}", report.queries());
    for edge in &report.edges {
        println!(
            "  {}.{}: {} parents, {} queries, {} deleted",
            edge.collection, edge.foreign_key, edge.parent_ids, edge.queries, edge.enqueued
        );
    }
    println!("  Records deleted: {}", report.planned_writes);
    println!("  Write groups: {}", report.committed_groups);
    println!("  Phase: {}", report.phase);
    Ok(())
}

fn seed_demo(
    store: &MemoryStore,
    actor: &ActorId,
    logs: usize,
    welds: usize,
    sections: usize,
) -> anyhow::Result<EntityId> {
    let now = Utc::now();
    let project = EntityId::generate();
    store.insert(collections::PROJECTS, Document::created(project.clone(), actor, now));

    for _ in 0..logs {
        let log = EntityId::generate();
        store.insert(
            collections::WELD_LOGS,
            Document::created(log.clone(), actor, now).with(keys::PROJECT_ID, &project),
        );
        for _ in 0..welds {
            store.insert(
                collections::WELDS,
                Document::created(EntityId::generate(), actor, now)
                    .with(keys::WELD_LOG_ID, &log)
                    .with(keys::PROJECT_ID, &project),
            );
        }
    }

    store.insert(
        collections::MATERIALS,
        Document::created(EntityId::generate(), actor, now).with(keys::PROJECT_ID, &project),
    );

    let library = EntityId::generate();
    store.insert(
        collections::DOCUMENT_LIBRARIES,
        Document::created(library.clone(), actor, now).with(keys::PROJECT_ID, &project),
    );
    let allocator = OrderAllocator::default();
    for key in allocator.order_values_for_batch(sections, SortDirection::Ascending) {
        let section = EntityId::generate();
        store.insert(
            collections::DOCUMENT_SECTIONS,
            Document::created(section.clone(), actor, now)
                .with(keys::LIBRARY_ID, &library)
                .with(fields::ORDER, key),
        );
        store.insert(
            collections::DOCUMENTS,
            Document::created(EntityId::generate(), actor, now)
                .with(keys::SECTION_ID, &section)
                .with(keys::LIBRARY_ID, &library)
                .with(fields::ORDER, allocator.next_order(None)),
        );
    }

    tracing::info!(
        "Seeded project {} with {} weld logs of {} welds and {} sections",
        project,
        logs,
        welds,
        sections
    );
    Ok(project)
}
