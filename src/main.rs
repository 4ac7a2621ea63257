use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use runctl::context::{AutoYes, Ctx, Interactive};
use runctl::lookup::Field;
use runctl::provision::{NewMethod, NewSpec};
use runctl::registry::Registry;
use runctl::runtime::DockerCli;
use runctl::teardown::TeardownMode;
use runctl::vcs::GitCli;

#[derive(Parser)]
#[command(
    name = "runctl",
    about = "Provision, inspect, and tear down containerized experiment runs",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the run registry database
    #[arg(long, global = true, default_value = "data/runctl.db")]
    db: String,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a batch of runs: build the image, launch containers,
    /// commit the batch to the registry
    New {
        /// Base run name; suffixed with an index for sampled batches
        #[arg(long)]
        name: String,

        /// Free-text description (defaults to the latest commit message)
        #[arg(long)]
        description: Option<String>,

        /// Image tag to build and launch
        #[arg(long)]
        image: String,

        /// Image build context directory
        #[arg(long, default_value = ".")]
        context: PathBuf,

        /// Dockerfile path
        #[arg(long, default_value = "Dockerfile")]
        dockerfile: PathBuf,

        /// Extra docker-run argument (repeatable)
        #[arg(long = "run-arg", allow_hyphen_values = true)]
        run_args: Vec<String>,

        /// Explicit host volume name (defaults to the run name)
        #[arg(long)]
        volume: Option<String>,

        /// Mount point for the volume inside the container
        #[arg(long, default_value = "/data")]
        mount: String,

        /// Label attached to containers, scoping "active" lookups
        #[arg(long)]
        label: Option<String>,

        /// Follow the first container's logs after launch
        #[arg(long)]
        follow: bool,

        /// Literal config passed to the container
        #[arg(long, conflicts_with = "script")]
        config: Option<String>,

        /// Config generator script; sampled once per run
        #[arg(long, requires = "count")]
        script: Option<PathBuf>,

        /// Interpreter for the generator script
        #[arg(long, default_value = "python3")]
        interpreter: String,

        /// Extra interpreter argument (repeatable)
        #[arg(long = "interpreter-arg", allow_hyphen_values = true)]
        interpreter_args: Vec<String>,

        /// Number of configs to sample from the script
        #[arg(long)]
        count: Option<u32>,
    },

    /// Kill matched runs' containers, remove their volumes, and delete
    /// their registry rows
    Rm {
        /// Name pattern with SQL wildcards (%/_); all runs when omitted
        #[arg(long)]
        pattern: Option<String>,

        /// Only runs whose container is currently running
        #[arg(long)]
        active: bool,
    },

    /// Kill matched runs' containers; registry rows are untouched
    Kill {
        /// Name pattern with SQL wildcards (%/_); all runs when omitted
        #[arg(long)]
        pattern: Option<String>,

        /// Only runs whose container is currently running
        #[arg(long)]
        active: bool,
    },

    /// Inspect the run registry
    Lookup {
        /// Name pattern with SQL wildcards (%/_)
        #[arg(long)]
        pattern: Option<String>,

        /// Print a single column instead of the full table
        #[arg(long, value_enum)]
        field: Option<Field>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let pool = runctl::storage::open_pool(&cli.db)?;
    let ctx = if cli.yes {
        Ctx::new(pool, Box::new(AutoYes))
    } else {
        Ctx::new(pool, Box::new(Interactive))
    };
    let registry = Registry::new(ctx.pool.clone());
    let runtime = DockerCli::default();

    match cli.command {
        Commands::New {
            name,
            description,
            image,
            context,
            dockerfile,
            run_args,
            volume,
            mount,
            label,
            follow,
            config,
            script,
            interpreter,
            interpreter_args,
            count,
        } => {
            let method = match script {
                Some(script) => NewMethod::Multi {
                    script,
                    interpreter,
                    interpreter_args,
                    count: count.unwrap_or(1),
                },
                None => NewMethod::Single(config),
            };
            let spec = NewSpec {
                name,
                description,
                image,
                build_context: context,
                dockerfile,
                run_args,
                volume,
                mount_path: mount,
                kill_label: label,
                follow,
                method,
            };
            runctl::provision::provision(&ctx, &registry, &runtime, &GitCli, &spec)?;
        }
        Commands::Rm { pattern, active } => {
            runctl::teardown::teardown(
                &ctx,
                &registry,
                &runtime,
                pattern.as_deref(),
                active,
                TeardownMode::Remove,
            )?;
        }
        Commands::Kill { pattern, active } => {
            runctl::teardown::teardown(
                &ctx,
                &registry,
                &runtime,
                pattern.as_deref(),
                active,
                TeardownMode::Kill,
            )?;
        }
        Commands::Lookup {
            pattern,
            field,
            json,
        } => {
            runctl::lookup::lookup(&registry, pattern.as_deref(), field, json)?;
        }
    }

    Ok(())
}
