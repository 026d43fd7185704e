use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

mod args;
mod commands;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// `MRB_LOG` takes an `EnvFilter` directive, e.g. `MRB_LOG=mrb_embed=trace`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("MRB_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let args = match args::parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };
    init_logging(args.verbose);

    let outcome = match args.cmd.as_str() {
        "run" => commands::run::run(&args),
        "check" => commands::check::run(&args),
        _ => Err(commands::Failure::Usage(format!(
            "Unknown command: {}\n{}",
            args.cmd,
            args::usage()
        ))),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(f) => {
            eprintln!("{}", f.message());
            ExitCode::from(f.exit_code())
        }
    }
}
