use mrb_embed::{Context, Options};

use crate::args::CliArgs;
use crate::commands::{Failure, describe, read_source, script_path};

pub(crate) fn run(args: &CliArgs) -> Result<(), Failure> {
    let (path, rest) = script_path(&args.positional)?;
    if !rest.is_empty() {
        return Err(Failure::Usage("check takes a single <file>".to_string()));
    }
    let code = read_source(path)?;
    let ctx = Context::with_options(Options::default().filename(path));
    ctx.parse(&code)
        .map(|_| ())
        .map_err(|e| Failure::Script(describe(path, &e)))
}
