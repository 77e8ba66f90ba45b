use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use classlens::commands::{has_class_command, inspect_command, RuntimeArgs};

/// JVM type-resolution inspector.
///
/// This CLI is a thin wrapper around `classlens-core`. All substantive logic
/// lives in the library so it can be tested thoroughly and reused from other
/// frontends.
#[derive(Parser, Debug)]
#[command(
    name = "classlens",
    version,
    about = "Resolve JVM types into structural models",
    long_about = None
)]
struct Cli {
    /// Log resolution steps to stderr.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a type and print its structure.
    Inspect {
        /// Type name, dotted (`com.example.Widget`) or internal (`com/example/Widget`).
        #[arg(long)]
        name: String,

        /// Parse this class file instead of searching the runtime.
        #[arg(long)]
        file: Option<String>,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Report whether a type's class file is on the resource path.
    HasClass {
        #[arg(long)]
        name: String,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Inspect { name, file, runtime, json } => {
            inspect_command(&runtime, &name, file.as_deref(), json)?
        }
        Command::HasClass { name, runtime } => {
            has_class_command(&runtime, &name)?;
        }
    }

    Ok(())
}
