use anyhow::{Context, Result};
use clap::Parser;
use linker_lib::config::MatchingConfig;
use linker_lib::linking::{ExtractedProject, PersistOutcome, PgProjectWriter, ProjectLinker, ProjectWriter};
use linker_lib::matching::MatchingSession;
use linker_lib::store::{MemoryStore, PgReferenceStore, ReferenceStore};
use linker_lib::utils::db_connect::{connect, get_pool_status, PgPool};
use linker_lib::utils::env::load_env;
use linker_lib::utils::progress::ProgressConfig;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with the extracted projects to link
    #[arg(long)]
    projects: PathBuf,

    /// Match against a JSON snapshot instead of the database
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Link and report, but write nothing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let run_id = Uuid::new_v4().to_string();
    info!("Starting project linking run {}", run_id);

    let config = MatchingConfig::from_env();
    config.log_config();
    let progress = ProgressConfig::from_env();

    let raw = std::fs::read_to_string(&args.projects)
        .with_context(|| format!("Failed to read {}", args.projects.display()))?;
    let projects: Vec<ExtractedProject> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", args.projects.display()))?;
    info!("Read {} extracted projects", projects.len());

    let start = Instant::now();
    match &args.snapshot {
        Some(path) => {
            let store = MemoryStore::from_json_file(path)?;
            run(store.clone(), &store, &projects, &config, &progress, args.dry_run, None).await?;
            if !args.dry_run {
                store.to_json_file(path)?;
            }
        }
        None => {
            let pool = connect().await.context("Failed to connect to database")?;
            info!("Successfully connected to the database");
            let store = PgReferenceStore::new(pool.clone());
            let writer = PgProjectWriter::from_env(pool.clone());
            run(store, &writer, &projects, &config, &progress, args.dry_run, Some(&pool)).await?;
        }
    }

    info!(
        "Run {} finished in {:.2?}",
        run_id,
        start.elapsed()
    );
    Ok(())
}

async fn run<S, W>(
    store: S,
    writer: &W,
    projects: &[ExtractedProject],
    config: &MatchingConfig,
    progress: &ProgressConfig,
    dry_run: bool,
    pool: Option<&PgPool>,
) -> Result<()>
where
    S: ReferenceStore + Clone,
    W: ProjectWriter,
{
    let session = MatchingSession::load(store, config)
        .await
        .context("Failed to load reference indices")?;
    let mut linker = ProjectLinker::new(session);

    let pb = progress.project_bar(projects.len() as u64);
    let mut inserted = 0usize;
    for extracted in projects {
        let project = linker
            .link(extracted)
            .await
            .with_context(|| format!("Failed to link project {}", extracted.project_number))?;

        if dry_run {
            info!(
                "[dry run] {} '{}': {} institutions, {} investigators ({} new)",
                project.project_number,
                project.title,
                project.institutions().len(),
                project.investigators().len(),
                project.new_investigators().count()
            );
        } else if let PersistOutcome::Inserted { project_id, .. } = linker.persist(writer, &project).await? {
            info!("Inserted project {} as id {}", project.project_number, project_id);
            inserted += 1;
        }

        if let Some(pb) = &pb {
            match pool.filter(|_| progress.show_db_connection_stats) {
                Some(pool) => {
                    let (size, idle) = get_pool_status(pool);
                    pb.set_message(format!("{} (DB: {}/{} used/total)", project.project_number, size - idle, size));
                }
                None => pb.set_message(project.project_number.clone()),
            }
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("Linking complete");
    }

    if dry_run {
        warn!("Dry run: nothing was written");
    } else {
        info!("Inserted {} of {} projects", inserted, projects.len());
    }
    linker.log_summary();
    Ok(())
}
