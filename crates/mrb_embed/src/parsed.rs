//! Compiled scripts that can be run repeatedly.

use mrb_runtime::Value as RValue;

use crate::context::Context;
use crate::convert::IntoArgs;
use crate::error::Result;
use crate::value::Value;

/// A script compiled by `Context::parse`.
pub struct ParsedScript<'ctx> {
    ctx: &'ctx Context,
    script: RValue,
}

impl<'ctx> ParsedScript<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context, script: RValue) -> Self {
        Self { ctx, script }
    }

    /// Runs the script with `args` as `ARGV`.
    pub fn run(&self, args: impl IntoArgs) -> Result<Value<'ctx>> {
        self.ctx.set_argv(args);
        self.ctx.run_raw(&self.script)
    }

    /// The script as a Proc value.
    pub fn to_value(&self) -> Value<'ctx> {
        Value::new(self.ctx, self.script.clone())
    }
}
