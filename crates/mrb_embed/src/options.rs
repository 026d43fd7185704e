//! Context configuration.

/// Settings fixed when a `Context` is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Turn an escaped exception into `Error::Run` and clear it. When off,
    /// the exception stays pending on the context.
    pub capture_errors: bool,
    /// `load_string` compiles only and returns the script as a Proc.
    pub no_exec: bool,
    /// Name reported in syntax errors and `__FILE__`.
    pub filename: String,
    /// Collect `puts`/`print`/`p` output for `Context::take_output`.
    pub capture_output: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capture_errors: true,
            no_exec: false,
            filename: "(mrb)".to_string(),
            capture_output: false,
        }
    }
}

impl Options {
    pub fn capture_errors(mut self, on: bool) -> Self {
        self.capture_errors = on;
        self
    }

    pub fn no_exec(mut self, on: bool) -> Self {
        self.no_exec = on;
        self
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = name.into();
        self
    }

    pub fn capture_output(mut self, on: bool) -> Self {
        self.capture_output = on;
        self
    }

    pub(crate) fn compile_context(&self) -> mrb_runtime::CompileContext {
        mrb_runtime::CompileContext {
            filename: self.filename.clone(),
            capture_errors: self.capture_errors,
            no_exec: self.no_exec,
        }
    }
}
