//! Maestro CLI - task-to-workflow orchestration
//!
//! Usage:
//!   maestro init                 Initialize Maestro in current repo
//!   maestro classify <task>      Show complexity and domain analysis
//!   maestro plan <task>          Show the workflow plan for a task
//!   maestro run <task>           Orchestrate a task end to end
//!   maestro workers list         List registered workers
//!   maestro workers create <n>   Register a new worker
//!   maestro workers seed         Register the built-in workers

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use maestro_core::{
    ComplexityLevel, MaestroConfig, MaestroError, ResourceTier, Strategy, Task, WorkerDescriptor,
};
use maestro_orchestrator::{OrchestrationRequest, Orchestrator, TemplateInvoker};
use maestro_registry::{builtin_workers, FileRegistry, WorkerRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "maestro")]
#[command(author, version, about = "Task-to-workflow orchestration")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root holding `.maestro/`
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Maestro in a repository
    Init {
        /// Repository path (defaults to --repo)
        path: Option<PathBuf>,
    },

    /// Classify a task by complexity and domain
    Classify {
        task: String,

        #[command(flatten)]
        hints: HintArgs,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Select workers and show the resulting plan without running it
    Plan {
        task: String,

        #[arg(short, long)]
        strategy: Option<CliStrategy>,

        /// Explicit worker names (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        workers: Vec<String>,

        #[command(flatten)]
        hints: HintArgs,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Orchestrate a task end to end
    Run {
        task: String,

        #[arg(short, long)]
        strategy: Option<CliStrategy>,

        /// Explicit worker names (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        workers: Vec<String>,

        /// Maximum phase attempts (0 = unlimited)
        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// Do not pass phase outputs to later phases
        #[arg(long)]
        no_context_sharing: bool,

        /// Run phases without a dependency path between them concurrently
        #[arg(long)]
        parallel_phases: bool,

        #[command(flatten)]
        hints: HintArgs,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Worker registry management
    Workers {
        #[command(subcommand)]
        action: WorkerCommands,
    },
}

#[derive(clap::Args)]
struct HintArgs {
    /// Expected complexity
    #[arg(long)]
    complexity: Option<CliComplexity>,

    /// Expected domain (e.g. web-development)
    #[arg(long)]
    domain: Option<String>,
}

#[derive(Subcommand)]
enum WorkerCommands {
    /// List registered workers
    List,

    /// Register a new worker
    Create {
        /// Unique worker name
        name: String,

        /// Display title (defaults to the name)
        #[arg(long)]
        title: Option<String>,

        /// Capability tag (repeatable)
        #[arg(short, long = "capability", required = true)]
        capabilities: Vec<String>,

        /// Prefer premium resources for this worker
        #[arg(long)]
        premium: bool,

        /// Instructions body
        #[arg(long, default_value = "")]
        instructions: String,
    },

    /// Register the built-in workers that are missing
    Seed,
}

/// CLI-friendly strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStrategy {
    Sequential,
    Parallel,
    Smart,
}

impl From<CliStrategy> for Strategy {
    fn from(s: CliStrategy) -> Self {
        match s {
            CliStrategy::Sequential => Strategy::Sequential,
            CliStrategy::Parallel => Strategy::Parallel,
            CliStrategy::Smart => Strategy::Smart,
        }
    }
}

/// CLI-friendly complexity enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliComplexity {
    Simple,
    Medium,
    Complex,
}

impl From<CliComplexity> for ComplexityLevel {
    fn from(c: CliComplexity) -> Self {
        match c {
            CliComplexity::Simple => ComplexityLevel::Simple,
            CliComplexity::Medium => ComplexityLevel::Medium,
            CliComplexity::Complex => ComplexityLevel::Complex,
        }
    }
}

impl HintArgs {
    fn task(&self, content: &str) -> Task {
        Task {
            content: content.to_string(),
            complexity_hint: self.complexity.map(Into::into),
            domain_hint: self.domain.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(path.unwrap_or(cli.repo)).await,
        Commands::Classify { task, hints, json } => {
            cmd_classify(&cli.repo, hints.task(&task), json)
        }
        Commands::Plan {
            task,
            strategy,
            workers,
            hints,
            json,
        } => cmd_plan(&cli.repo, hints.task(&task), strategy, workers, json).await,
        Commands::Run {
            task,
            strategy,
            workers,
            max_iterations,
            no_context_sharing,
            parallel_phases,
            hints,
            json,
        } => {
            let mut request = OrchestrationRequest::new(task);
            request.strategy = strategy.map(Into::into);
            request.selected_workers = (!workers.is_empty()).then_some(workers);
            request.max_iterations = max_iterations;
            request.context_sharing = no_context_sharing.then_some(false);
            request.complexity_hint = hints.complexity.map(Into::into);
            request.domain_hint = hints.domain;
            cmd_run(&cli.repo, request, parallel_phases, json).await
        }
        Commands::Workers { action } => cmd_workers(&cli.repo, action).await,
    }
}

fn load_config(repo: &Path) -> Result<MaestroConfig> {
    MaestroConfig::load_or_default(repo).context("Failed to load .maestro/config.toml")
}

fn build_orchestrator(repo: &Path, config: MaestroConfig) -> Orchestrator {
    let registry = Arc::new(FileRegistry::new(config.workflow.worker_directory.clone()));
    Orchestrator::new(config, registry, Arc::new(TemplateInvoker::new()))
        .with_state_dir(MaestroConfig::state_dir(repo))
}

async fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing Maestro in {:?}", path);

    let config_path = MaestroConfig::write_default(&path)?;
    let config = load_config(&path)?;
    tokio::fs::create_dir_all(&config.workflow.worker_directory).await?;

    println!("Initialized Maestro in {:?}", path);
    println!("Created:");
    println!("  {}", config_path.display());
    println!("  {}", config.workflow.worker_directory.display());
    println!("\nNext steps:");
    println!("  1. Run 'maestro workers seed' to register the built-in workers");
    println!("  2. Run 'maestro run \"<task>\"' to orchestrate a task");

    Ok(())
}

fn cmd_classify(repo: &Path, task: Task, json: bool) -> Result<()> {
    let orchestrator = build_orchestrator(repo, load_config(repo)?);
    let (complexity, domain) = orchestrator.classify(&task);

    if json {
        let value = serde_json::json!({ "complexity": complexity, "domain": domain });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "Complexity: {} (score {:.1}, confidence {:.1})",
        complexity.level, complexity.score, complexity.confidence
    );
    for (factor, value) in &complexity.factors {
        if *value > 0.0 {
            println!("  {:<24} {:.1}", factor.to_string(), value);
        }
    }
    println!("Duration tier: {:?}", complexity.duration_tier);
    println!("Domain: {} (confidence {:.1})", domain.primary, domain.confidence);
    if let Some(secondary) = &domain.secondary {
        println!("  secondary: {}", secondary);
    }

    Ok(())
}

async fn cmd_plan(
    repo: &Path,
    task: Task,
    strategy: Option<CliStrategy>,
    workers: Vec<String>,
    json: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(repo, load_config(repo)?);
    let (complexity, _) = orchestrator.classify(&task);

    let explicit = (!workers.is_empty()).then_some(workers);
    let recommendations = orchestrator
        .select_workers(&task, explicit.as_deref())
        .await
        .context("Failed to select workers")?;
    let descriptors: Vec<WorkerDescriptor> =
        recommendations.iter().map(|r| r.worker.clone()).collect();
    let plan = orchestrator.build_plan(&complexity, &descriptors, strategy.map(Into::into));

    if json {
        let value = serde_json::json!({ "workers": recommendations, "plan": plan });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Workers");
    println!("=======");
    for rec in &recommendations {
        println!(
            "  [{}] {} ({:?}) - {}",
            rec.priority, rec.worker.name, rec.source, rec.reason
        );
    }

    println!("\nPlan ({} strategy, ~{:.0} units)", plan.strategy, plan.estimated_duration);
    println!("====");
    for (idx, phase) in plan.phases.iter().enumerate() {
        println!(
            "  {}. {} [{}] workers: {}",
            idx + 1,
            phase.name,
            phase.priority,
            phase.worker_names().join(", ")
        );
        println!("     steps: {}", phase.steps.join(" → "));
        let deps = plan.prerequisites_of(&phase.name);
        if !deps.is_empty() {
            println!("     after: {}", deps.join(", "));
        }
    }

    Ok(())
}

async fn cmd_run(
    repo: &Path,
    request: OrchestrationRequest,
    parallel_phases: bool,
    json: bool,
) -> Result<()> {
    let mut config = load_config(repo)?;
    if parallel_phases {
        config.workflow.parallel_phases = true;
    }
    let orchestrator = build_orchestrator(repo, config);

    let response = match orchestrator.orchestrate(request).await {
        Ok(response) => response,
        Err(MaestroError::InvalidInput(msg)) => bail!("Invalid request: {}", msg),
        Err(e) => return Err(e).context("Orchestration failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let results = &response.results;
    let metrics = &results.quality_metrics;

    println!("Workflow {}", response.workflow_id);
    println!("=========");
    println!("Status: {} ({})", response.status, results.completion_status);
    println!(
        "Task: {} complexity, {} domain",
        response.task_analysis.complexity.level, response.task_analysis.domain.primary
    );
    println!("Workers: {}", response.agents_used.join(", "));
    println!(
        "Steps: {}/{} succeeded, {} failed, {} skipped ({:.0}% success)",
        metrics.successful_steps,
        metrics.total_steps,
        metrics.failed_steps,
        metrics.skipped_steps,
        metrics.overall_success_rate * 100.0
    );

    println!("\nPhases:");
    for summary in &results.phase_summaries {
        let marker = match (summary.attempted, summary.success) {
            (false, _) => "-",
            (true, true) => "✓",
            (true, false) => "✗",
        };
        println!(
            "  {} {} ({}/{} steps){}",
            marker,
            summary.phase,
            summary.completed_steps,
            summary.total_steps,
            if summary.degraded { " [degraded]" } else { "" }
        );
        if let Some(error) = &summary.error {
            println!("      {}", error);
        }
    }

    if !response.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &response.warnings {
            println!("  - {}", warning);
        }
    }

    println!("\nRecommendations:");
    for rec in &results.recommendations {
        println!("  - {}", rec);
    }

    println!("\nNext steps:");
    for step in &response.next_steps {
        println!("  - {}", step);
    }

    Ok(())
}

async fn cmd_workers(repo: &Path, action: WorkerCommands) -> Result<()> {
    let config = load_config(repo)?;
    let registry = FileRegistry::new(config.workflow.worker_directory.clone());

    match action {
        WorkerCommands::List => {
            let workers = registry.list().await?;
            if workers.is_empty() {
                println!("No workers in {}", registry.directory().display());
                println!("Run 'maestro workers seed' to add the built-in workers");
                return Ok(());
            }
            println!("Workers in {}", registry.directory().display());
            for worker in workers {
                let caps: Vec<&str> = worker.capabilities.iter().map(String::as_str).collect();
                println!(
                    "  {:<24} {:<28} [{}] {}",
                    worker.name,
                    worker.title,
                    worker.resource_tier,
                    caps.join(", ")
                );
            }
        }

        WorkerCommands::Create {
            name,
            title,
            capabilities,
            premium,
            instructions,
        } => {
            let mut descriptor = WorkerDescriptor::new(&name, title.unwrap_or_else(|| name.clone()))
                .with_instructions(instructions);
            for capability in capabilities {
                descriptor = descriptor.with_capability(capability.trim().to_lowercase());
            }
            if premium {
                descriptor = descriptor.with_tier(ResourceTier::Premium);
            }

            match registry.create(descriptor).await {
                Ok(worker) => println!("Created worker '{}'", worker.name),
                Err(MaestroError::RegistryConflict(name)) => {
                    bail!("Worker '{}' already exists", name)
                }
                Err(e) => return Err(e).context("Failed to create worker"),
            }
        }

        WorkerCommands::Seed => {
            let mut created = 0;
            for worker in builtin_workers() {
                match registry.create(worker).await {
                    Ok(worker) => {
                        println!("  + {}", worker.name);
                        created += 1;
                    }
                    Err(MaestroError::RegistryConflict(name)) => {
                        println!("  = {} (already present)", name);
                    }
                    Err(e) => return Err(e).context("Failed to seed workers"),
                }
            }
            println!("Seeded {} worker(s) into {}", created, registry.directory().display());
        }
    }

    Ok(())
}
