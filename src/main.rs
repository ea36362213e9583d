//! litrank CLI: registry reconciliation and literature-frequency ranking.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use litrank::annotation::{build_exclusion_set, propose_annotations, write_proposals};
use litrank::config::{self, PipelineConfig};
use litrank::deps;
use litrank::enrich::enrich;
use litrank::kb::KnowledgeBase;
use litrank::merge::merge;
use litrank::paths::DataPaths;
use litrank::pipeline::{format_skip_report, select_candidates};
use litrank::rank::{rank, write_report};
use litrank::registry::Registry;
use litrank::table::TableStore;

#[derive(Parser)]
#[command(
    name = "litrank",
    version,
    about = "Rank knowledge-base entities by literature mentions"
)]
struct Cli {
    /// Data directory for inputs, caches, and reports.
    #[arg(long, global = true, default_value = ".litrank")]
    data_dir: PathBuf,

    /// Pipeline config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry dump (JSON). Defaults to `<data-dir>/registry.json`.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose annotation edges for locally tracked, not-yet-annotated resources.
    Annotate {
        /// Local usage file (TOML): which prefixes are tracked, at which version.
        #[arg(long)]
        usage_file: PathBuf,
    },

    /// Fetch and cache the transitive dependents table from the knowledge base.
    Deps {
        /// Also print the table to stdout.
        #[arg(long)]
        print: bool,
    },

    /// Count literature mentions per registry resource (resumable).
    Count {
        /// Discard the prior table and re-count everything.
        #[arg(long)]
        refresh: bool,

        /// Checkpoint stride, in processed candidates.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Query the knowledge base first and skip already-annotated entities.
        #[arg(long)]
        skip_annotated: bool,
    },

    /// Merge the dependents table with counted frequencies and write the ranked report.
    Combine,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let paths = DataPaths::new(cli.data_dir.clone());
    paths.ensure_dirs()?;
    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    let registry_dump = cli.registry.unwrap_or_else(|| paths.registry_dump.clone());

    match cli.command {
        Commands::Annotate { usage_file } => {
            let registry = Registry::load(&registry_dump)?;
            let usage = config::load_usage(&usage_file)?;

            let kb = config.knowledge_base();
            let records = kb.records(&config.annotation_query())?;
            let exclusion = build_exclusion_set(&records);

            let predicate = config
                .kb
                .predicates
                .first()
                .ok_or_else(|| miette::miette!("config has no annotation predicates"))?;
            let outcome = propose_annotations(
                &registry,
                &exclusion,
                &usage,
                predicate,
                &config.kb.annotation_target,
            );

            for edge in &outcome.edges {
                println!("{}\t{}\t{}", edge.subject, edge.predicate, edge.target);
            }
            write_proposals(&paths.proposals_table, &outcome.rows)?;
            println!(
                "{} proposal(s) written to {}",
                outcome.rows.len(),
                paths.proposals_table.display()
            );
            print!("{}", format_skip_report(&outcome.skipped));
        }

        Commands::Deps { print } => {
            let kb = config.knowledge_base();
            let edges = deps::fetch_dependents(&kb, &config.dependents_query())?;
            deps::write_edges(&paths.dependents_table, &edges)?;
            println!(
                "{} dependent(s) written to {}",
                edges.len(),
                paths.dependents_table.display()
            );
            if print {
                print!("{}", deps::format_edges(&edges));
            }
        }

        Commands::Count {
            refresh,
            batch_size,
            skip_annotated,
        } => {
            let registry = Registry::load(&registry_dump)?;

            let exclusion = if skip_annotated {
                let kb = config.knowledge_base();
                let records = kb.records(&config.annotation_query())?;
                Some(build_exclusion_set(&records))
            } else {
                None
            };

            let (candidates, mut skipped) = select_candidates(&registry, exclusion.as_ref());

            let store = TableStore::new(&paths.frequency_table);
            let prior = store.load()?;
            let counter = config.search_counter();
            let report = enrich(
                &candidates,
                prior,
                &config.query_policy(),
                &config.enrich_options(refresh, batch_size),
                &counter,
                &store,
            )?;

            println!(
                "{} counted, {} carried forward, table at {}",
                report.counted,
                report.carried,
                store.path().display()
            );
            skipped.extend(report.skipped);
            print!("{}", format_skip_report(&skipped));
        }

        Commands::Combine => {
            let registry = Registry::load(&registry_dump)?;
            let store = TableStore::new(&paths.frequency_table);
            let table = store.load()?;

            if !paths.dependents_table.is_file() {
                return Err(miette::miette!(
                    "no dependents table at {}; run `litrank deps` first",
                    paths.dependents_table.display()
                ));
            }
            let edges = deps::load_edges(&paths.dependents_table)?;

            let counter = config.search_counter();
            let outcome = merge(
                &table,
                &registry.entity_map(),
                &edges,
                &counter,
                &config.merge_config(),
            );

            let ranked = rank(outcome.rows);
            write_report(&paths.report, &ranked)?;
            println!(
                "{} row(s) ranked, report at {}",
                ranked.len(),
                paths.report.display()
            );
            print!("{}", format_skip_report(&outcome.skipped));
        }
    }

    Ok(())
}
