//! Deploy command - render the release and run Helm

use console::style;
use kubecm_deploy::{ProcessRunner, RecordingRunner};

use crate::args::ReleaseArgs;
use crate::error::Result;

pub fn run(args: &ReleaseArgs, dry_run: bool) -> Result<()> {
    let deployer = super::deployer(args)?;
    let params = args.params();
    let extra_values = args.extra_values()?;

    if dry_run {
        let mut runner = RecordingRunner::new();
        deployer.deploy(&params, &extra_values, &mut runner)?;

        println!(
            "{} {} (dry run)",
            style("Would deploy").yellow().bold(),
            params.release
        );
        super::print_commands(&runner.commands);
        return Ok(());
    }

    println!("{} {}", style("Deploying").cyan().bold(), params.release);

    let mut runner = ProcessRunner::new(deployer.project_dir());
    deployer.deploy(&params, &extra_values, &mut runner)?;

    match &params.render_to {
        Some(path) => println!(
            "{} {}",
            style("Rendered").green().bold(),
            deployer.project_dir().join(path).display()
        ),
        None => println!("{} {}", style("Deployed").green().bold(), params.release),
    }

    Ok(())
}
