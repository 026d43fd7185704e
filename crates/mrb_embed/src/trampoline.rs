//! The single engine entry point for host methods.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use mrb_runtime::{State, Value as RValue};
use tracing::{debug, trace};

use crate::context::Context;
use crate::registry;
use crate::value::Value;

/// Engine-side body of every host method.
///
/// Finds the host function for the call in progress and runs it. A host
/// error or panic is raised in the script as a `RuntimeError`; anything
/// that cannot be resolved yields nil.
pub(crate) fn trampoline(state: &State, recv: RValue) -> RValue {
    let Some(ctx) = Context::recover(state) else {
        return RValue::Nil;
    };
    let Some(call) = state.current_call() else {
        return RValue::Nil;
    };
    let Some(f) = registry::global().resolve(ctx.id(), call.target_class, call.mid) else {
        debug!(
            context = %ctx.id(),
            class = %state.class_name(call.target_class),
            method = %state.sym_name(call.mid),
            "no host function registered"
        );
        return RValue::Nil;
    };
    trace!(context = %ctx.id(), method = %state.sym_name(call.mid), argc = call.args.len(), "dispatch");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        f.call(&ctx, Value::new(&ctx, recv)).map(Value::into_raw)
    }));
    let message = match outcome {
        Ok(Ok(v)) => return v,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("host function panicked: {}", panic_message(&*payload)),
    };
    state.raise(state.core().runtime_error, &message);
    RValue::Nil
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
