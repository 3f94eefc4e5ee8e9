//! Lookup command - print the rendered data of a release

use serde_json::Value as JsonValue;

use crate::args::ReleaseArgs;
use crate::error::{CliError, Result};

pub fn run(args: &ReleaseArgs, key: Option<&str>, sources: bool) -> Result<()> {
    let deployer = super::deployer(args)?;
    let params = args.params();

    let mut rendered = deployer.lookup(&params)?;
    rendered.values.merge(&args.extra_values()?);

    if sources {
        for path in &rendered.sources {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let Some(key) = key else {
        print!("{}", serde_yaml::to_string(&rendered)?);
        return Ok(());
    };

    let value = rendered.get(key).ok_or_else(|| {
        CliError::validation_with_help(
            format!("key '{}' not found", key),
            "keys start with one of `vars`, `resources`, `values` or `patches`",
        )
    })?;

    match value {
        JsonValue::String(s) => println!("{}", s),
        other => print!("{}", serde_yaml::to_string(&other)?),
    }
    Ok(())
}
