pub(crate) struct CliArgs {
    pub cmd: String,
    pub verbose: bool,
    /// The script path followed by its arguments.
    pub positional: Vec<String>,
}

pub(crate) fn usage() -> &'static str {
    "Usage: mrb <run|check> [--verbose] <file> [args...]"
}

/// Options are only recognized before the script path; everything after it
/// belongs to the script.
pub(crate) fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut argv = argv.into_iter();
    let cmd = argv.next().ok_or_else(|| usage().to_string())?;

    let mut verbose = false;
    let mut positional: Vec<String> = Vec::new();
    for a in argv {
        if !positional.is_empty() {
            positional.push(a);
        } else if a == "--verbose" || a == "-v" {
            verbose = true;
        } else if a.starts_with('-') && a != "-" {
            return Err(format!("Unknown option: {a}"));
        } else {
            positional.push(a);
        }
    }

    Ok(CliArgs {
        cmd,
        verbose,
        positional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn script_arguments_are_not_options() {
        let args = parse(&["run", "-v", "demo.rb", "--verbose", "x"]).unwrap();
        assert_eq!(args.cmd, "run");
        assert!(args.verbose);
        assert_eq!(args.positional, ["demo.rb", "--verbose", "x"]);
    }

    #[test]
    fn rejects_unknown_options_and_missing_command() {
        assert_eq!(parse(&["run", "--fast"]).err().unwrap(), "Unknown option: --fast");
        assert_eq!(parse(&[]).err().unwrap(), usage());
    }
}
