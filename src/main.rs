use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pagecraft::dispatcher::Dispatcher;
use pagecraft::key_manager::RealEnvironment;
use pagecraft::outputs::{Deliverable, HtmlPreview, MarkdownBrief};
use pagecraft::wizard::{ProjectBrief, Wizard};
use pagecraft::workflow::session_file::{load_state, persist_state, session_path};
use pagecraft::workflow::state::WorkflowState;
use pagecraft::workflow::step::{StepKind, StepPayload, STEP_COUNT};

#[derive(Parser)]
#[command(name = "pagecraft", about = "Multi-step PPC landing page generator", version)]
struct Cli {
    /// Named session; each session keeps its own workflow state.
    #[arg(long, global = true, default_value = "default")]
    session: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show workflow progress and provider availability
    Status,
    /// List the models offered by the configured providers
    Models,
    /// Run the next pending step (or a specific one with --step)
    Run {
        #[arg(long)]
        step: Option<usize>,
        /// Model routed by name prefix; defaults to the session's model
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        audience: Option<String>,
        #[arg(long)]
        budget: Option<String>,
    },
    /// Render the completed steps as a Markdown brief and HTML preview
    Render {
        /// Directory to write artifacts into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Write the session state as a portable JSON export
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the session state with a previously exported document
    Import { file: PathBuf },
    /// Discard the session state and start over
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let session_file = session_path(&cli.session)?;
    let mut state = load_state(&session_file)?;

    match cli.command {
        Command::Status => {
            let summary = state.summary();
            println!("Project: {}", summary.project_name);
            println!(
                "Progress: {}/{STEP_COUNT} steps ({:.0}%)",
                summary.steps_completed, summary.progress_percentage
            );
            println!("Model: {}", summary.selected_model);
            for step in 1..=STEP_COUNT {
                let kind = StepKind::from_index(step).unwrap_or(StepKind::Research);
                println!("  {step}. {:?} - {}", state.step_status(step), kind.title());
            }

            let status = Dispatcher::from_environment(&RealEnvironment).provider_status();
            println!(
                "Providers: openai={} google={} anthropic={}",
                status.openai, status.google, status.anthropic
            );
        }
        Command::Models => {
            let dispatcher = Dispatcher::from_environment(&RealEnvironment);
            for model in dispatcher.available_models() {
                println!("{model}");
            }
        }
        Command::Run {
            step,
            model,
            product,
            url,
            industry,
            audience,
            budget,
        } => {
            let step = step.unwrap_or(state.current_step);
            let kind = StepKind::from_index(step)
                .with_context(|| format!("step must be between 1 and {STEP_COUNT}, got {step}"))?;
            if let Some(model) = model {
                state.selected_model = model;
            }

            let brief = build_brief(&state, product, url, industry, audience, budget)?;
            if state.project_name.is_empty() {
                state.project_name = brief.product_name.clone();
            }

            let wizard = Wizard::new(Dispatcher::from_environment(&RealEnvironment));
            wizard.run_step(&mut state, kind, &brief).await?;
            persist_state(&session_file, &state)?;
            println!("Completed step {step}: {}", kind.title());
        }
        Command::Render { out_dir } => {
            for deliverable in [&MarkdownBrief as &dyn Deliverable, &HtmlPreview] {
                let artifact = deliverable.render(&state)?;
                let path = out_dir.join(&artifact.filename);
                fs::write(&path, &artifact.bytes)?;
                println!("Wrote {}", path.display());
            }
        }
        Command::Export { output } => {
            let exported = state.export();
            match output {
                Some(path) => {
                    fs::write(&path, exported)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{exported}"),
            }
        }
        Command::Import { file } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            if !state.import(&contents) {
                anyhow::bail!(
                    "{} is not a valid export (project_name and current_step are required)",
                    file.display()
                );
            }
            persist_state(&session_file, &state)?;
            println!("Imported {}", file.display());
        }
        Command::Reset => {
            state.reset();
            persist_state(&session_file, &state)?;
            println!("Session '{}' reset", cli.session);
        }
    }

    Ok(())
}

/// Assemble the project brief from CLI flags, falling back to the facts
/// captured by the research step for anything not re-supplied.
fn build_brief(
    state: &WorkflowState,
    product: Option<String>,
    url: Option<String>,
    industry: Option<String>,
    audience: Option<String>,
    budget: Option<String>,
) -> Result<ProjectBrief> {
    let research = match state.step_payload(1) {
        Some(StepPayload::Research(research)) => Some(research),
        _ => None,
    };

    let product_name = product
        .or_else(|| research.map(|r| r.product_name.clone()))
        .context("--product is required for the first step")?;

    Ok(ProjectBrief {
        product_name,
        target_url: url.or_else(|| research.and_then(|r| r.target_url.clone())),
        industry: industry
            .or_else(|| research.map(|r| r.industry.clone()))
            .unwrap_or_default(),
        target_audience: audience
            .or_else(|| research.map(|r| r.target_audience.clone()))
            .unwrap_or_default(),
        budget_range: budget
            .or_else(|| research.map(|r| r.budget_range.clone()))
            .unwrap_or_default(),
    })
}
