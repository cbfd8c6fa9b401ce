//! `colabforge` command line

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colabforge_notebook::{CellInput, DocumentCompiler};
use colabforge_workflow::{Principal, PrincipalId, Role, WorkflowConfig, WorkflowService};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("colabforge")
        .version(colabforge_workflow::VERSION)
        .about("Transcript annotation workflow and notebook compiler")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Workflow configuration (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("compile")
                .about("Compile a cell list into a notebook document")
                .arg(
                    Arg::new("cells")
                        .long("cells")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of {cell_type, content} objects"),
                )
                .arg(
                    Arg::new("title")
                        .long("title")
                        .required(true)
                        .help("Task title used for the placeholder heading"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file (stdout if omitted)"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Race trainers for one task, then run it through review and export")
                .arg(
                    Arg::new("trainers")
                        .long("trainers")
                        .default_value("8")
                        .value_parser(value_parser!(u64))
                        .help("Number of trainers claiming concurrently"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<WorkflowConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => WorkflowConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(WorkflowConfig::default()),
    }
}

fn compile(args: &ArgMatches) -> Result<Option<String>> {
    let cells_path = args.get_one::<PathBuf>("cells").context("--cells is required")?;
    let title = args.get_one::<String>("title").context("--title is required")?;

    let raw = std::fs::read_to_string(cells_path)
        .with_context(|| format!("failed to read {}", cells_path.display()))?;
    let cells: Vec<CellInput> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a cell list", cells_path.display()))?;

    let document = DocumentCompiler::new().compile_to_string(title, &cells)?;

    match args.get_one::<PathBuf>("out") {
        Some(out) => {
            std::fs::write(out, &document)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), cells = cells.len(), "Notebook written");
            Ok(None)
        }
        None => Ok(Some(document)),
    }
}

#[derive(Debug, Default)]
struct RaceOutcome {
    winners: Vec<PrincipalId>,
    rejected: usize,
}

async fn claim_race(service: &Arc<WorkflowService>, owner: &Principal, trainers: u64) -> Result<RaceOutcome> {
    let id = service
        .create_task(owner, Some("Simulated claim race".to_string()))
        .await?;

    let attempts = (1..=trainers).map(|n| {
        let service = Arc::clone(service);
        let id = id.clone();
        tokio::spawn(async move {
            let trainer = Principal::new(100 + n, Role::Trainer);
            service.claim_task(&trainer, &id).await.map(|()| trainer.id)
        })
    });

    let mut outcome = RaceOutcome::default();
    for joined in join_all(attempts).await {
        match joined? {
            Ok(winner) => outcome.winners.push(winner),
            Err(e) if e.is_invalid_transition() => outcome.rejected += 1,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(outcome)
}

async fn simulate(config: WorkflowConfig, trainers: u64) -> Result<()> {
    if trainers == 0 {
        bail!("--trainers must be at least 1");
    }

    let service = Arc::new(WorkflowService::in_memory(config));
    let owner = Principal::new(1, Role::Owner);

    let outcome = claim_race(&service, &owner, trainers).await?;
    println!("Claim race: {} trainers, {} rejected", trainers, outcome.rejected);

    let [winner] = outcome.winners.as_slice() else {
        bail!("expected exactly one winning claim, got {}", outcome.winners.len());
    };
    println!("  Winner: principal {winner}");

    let trainer = Principal {
        id: *winner,
        role: Role::Trainer,
    };
    let queue = service
        .queue(&trainer, colabforge_workflow::QueueName::MyTasks)
        .await?;
    let task = queue.first().context("winner has no claimed task")?;

    service
        .save_content(
            &trainer,
            &task.id,
            vec![
                CellInput::new("user", "Is the claim race deterministic?"),
                CellInput::new("assistant", r#"{"text":"Exactly one trainer wins.","tool_calls":[]}"#),
            ],
        )
        .await?;
    service.submit_task(&trainer, &task.id).await?;
    service.approve_task(&owner, &task.id).await?;

    let archive = service.export_approved(&owner).await?;
    println!(
        "  Exported {} task(s) to {} ({} bytes)",
        archive.exported.len(),
        archive.file_name,
        archive.bytes.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("compile", args)) => {
            if let Some(document) = compile(args)? {
                println!("{document}");
            }
            Ok(())
        }
        Some(("simulate", args)) => {
            let trainers = args.get_one::<u64>("trainers").copied().unwrap_or(8);
            simulate(config, trainers).await
        }
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}
