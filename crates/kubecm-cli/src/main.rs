//! kubecm CLI - layered Kubernetes configuration rendered into Helm deployments

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod error;
mod exit_codes;

use args::ReleaseArgs;

#[derive(Parser)]
#[command(name = "kubecm")]
#[command(version)]
#[command(about = "Layered Kubernetes configuration rendered into Helm deployments", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a release and deploy it with Helm
    Deploy {
        #[command(flatten)]
        release: ReleaseArgs,

        /// Print the Helm commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the release build directory without running Helm
    Render {
        #[command(flatten)]
        release: ReleaseArgs,
    },

    /// Print the rendered data of a release
    Lookup {
        #[command(flatten)]
        release: ReleaseArgs,

        /// Dotted key to print, e.g. values.image.tag
        key: Option<String>,

        /// List the data files that contributed instead
        #[arg(long)]
        sources: bool,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(debug))
        .with(env_filter)
        .init();
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match &cli.command {
        Commands::Deploy { release, dry_run } => commands::deploy::run(release, *dry_run),
        Commands::Render { release } => commands::render::run(release),
        Commands::Lookup {
            release,
            key,
            sources,
        } => commands::lookup::run(release, key.as_deref(), *sources),
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
