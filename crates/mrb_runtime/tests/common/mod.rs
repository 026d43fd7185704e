#![allow(dead_code)]

use mrb_runtime::{CompileContext, State, Value};

/// Runs `src` and returns the inspected result; panics on an uncaught exception.
pub fn eval(src: &str) -> String {
    let state = State::open();
    let v = state.load_string(src, &CompileContext::default());
    if let Some(e) = state.exc() {
        panic!("unexpected {}: {}", state.obj_classname(&e), state.exc_message(&e));
    }
    state.inspect(&v)
}

/// Runs `src` and returns the class name and message of the uncaught exception.
pub fn eval_err(src: &str) -> (String, String) {
    let state = State::open();
    let v = state.load_string(src, &CompileContext::default());
    match state.exc() {
        Some(e) => (state.obj_classname(&e), state.exc_message(&e)),
        None => panic!("expected an exception, got {}", state.inspect(&v)),
    }
}

/// Runs `src` with output capture and returns what it printed.
pub fn output(src: &str) -> String {
    let state = State::open();
    state.set_capture_output(true);
    let _: Value = state.load_string(src, &CompileContext::default());
    if let Some(e) = state.exc() {
        panic!("unexpected {}: {}", state.obj_classname(&e), state.exc_message(&e));
    }
    String::from_utf8(state.take_output()).expect("utf-8 output")
}
