use mrb_embed::Error;

pub(crate) mod check;
pub(crate) mod run;

/// Why a command failed; decides the exit status.
pub(crate) enum Failure {
    /// Bad invocation; exit status 2.
    Usage(String),
    /// The script could not be read, parsed or run; exit status 1.
    Script(String),
}

impl Failure {
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            Failure::Usage(_) => 2,
            Failure::Script(_) => 1,
        }
    }

    pub(crate) fn message(&self) -> &str {
        match self {
            Failure::Usage(m) | Failure::Script(m) => m,
        }
    }
}

pub(crate) fn read_source(path: &str) -> Result<String, Failure> {
    std::fs::read_to_string(path).map_err(|e| Failure::Script(format!("{path}: {e}")))
}

pub(crate) fn script_path(positional: &[String]) -> Result<(&str, &[String]), Failure> {
    match positional.split_first() {
        Some((path, rest)) => Ok((path.as_str(), rest)),
        None => Err(Failure::Usage("Missing <file>".to_string())),
    }
}

/// `RuntimeError: kaboom` or `demo.rb:1: syntax error, ...`.
pub(crate) fn describe(path: &str, e: &Error) -> String {
    match e {
        Error::Run(run) => format!("{}: {}", run.class, run.message),
        Error::Parse(p) => format!("{path}:{}: {}", p.line, p.message),
        other => other.to_string(),
    }
}
