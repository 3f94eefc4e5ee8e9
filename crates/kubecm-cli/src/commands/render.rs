//! Render command - write the build directory without running Helm

use console::style;

use crate::args::ReleaseArgs;
use crate::error::Result;

pub fn run(args: &ReleaseArgs) -> Result<()> {
    let deployer = super::deployer(args)?;
    let params = args.params();
    let extra_values = args.extra_values()?;

    let prepared = deployer.render(&params, &extra_values)?;

    for path in &prepared.written {
        println!("{} {}", style("wrote").green(), path.display());
    }
    println!("{} {}", style("chart").cyan(), prepared.chart_ref);
    println!();
    println!("{}", style("Planned commands:").bold());
    super::print_commands(&prepared.commands);

    Ok(())
}
