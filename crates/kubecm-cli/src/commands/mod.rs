//! CLI commands

pub mod deploy;
pub mod lookup;
pub mod render;

use console::style;
use kubecm_deploy::{Deployer, HelmCommand};

use crate::args::ReleaseArgs;
use crate::error::Result;

/// Deployer for the project the release options point at
fn deployer(args: &ReleaseArgs) -> Result<Deployer> {
    let deployer = Deployer::load(&args.project_dir)?;
    tracing::debug!(project = %deployer.project_dir().display(), "loaded project");
    Ok(deployer)
}

fn print_commands(commands: &[HelmCommand]) {
    for command in commands {
        println!("  {} {}", style("$").dim(), command);
    }
}
