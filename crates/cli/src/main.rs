use anyhow::Result;
use app_thinner::commands::{host_command, inspect_command, thin_command, ThinArgs};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Strip unused architectures from universal binaries.
///
/// This CLI is a thin wrapper around `thinner-core` (exposed in code as
/// `thinner_core`). The scanning, stripping, and pruning logic lives in the
/// library so it can be tested without spawning the binary.
#[derive(Parser, Debug)]
#[command(
    name = "app-thinner",
    version,
    about = "Strip unused architectures from universal binaries",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Strip fat binaries under a directory down to the host architecture.
    ///
    /// Every writable, executable universal binary that carries a slice for
    /// the host is rewritten to contain only that slice. With
    /// `--remove-unused-framework-versions`, framework versions no symlink
    /// points at are deleted first.
    Thin(ThinArgs),

    /// Show the fat header of a single file.
    Inspect {
        /// File to inspect.
        path: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the architecture binaries would be thinned to.
    Host {
        /// Resolve this architecture name instead of detecting the host.
        #[arg(long)]
        arch: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Default to thinning /Applications if no subcommand is given.
    match cli.command.unwrap_or(Command::Thin(ThinArgs::default())) {
        Command::Thin(args) => {
            thin_command(&args)?;
        }
        Command::Inspect { path, json } => inspect_command(&path, json)?,
        Command::Host { arch } => host_command(arch.as_deref())?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
