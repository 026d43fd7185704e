use std::io::Write;

use mrb_embed::{Context, Options};
use tracing::debug;

use crate::args::CliArgs;
use crate::commands::{Failure, describe, read_source, script_path};

pub(crate) fn run(args: &CliArgs) -> Result<(), Failure> {
    let (path, script_args) = script_path(&args.positional)?;
    let code = read_source(path)?;
    let ctx = Context::with_options(Options::default().filename(path));
    debug!(path, argc = script_args.len(), "running script");

    let result = ctx
        .load_string(&code, script_args)
        .map_err(|e| Failure::Script(describe(path, &e)))?;
    if result.is_nil() {
        return Ok(());
    }
    let mut out = std::io::stdout().lock();
    if let Err(e) = writeln!(out, "{}", result.inspect()) {
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            return Err(Failure::Script(format!("stdout error: {e}")));
        }
    }
    Ok(())
}
