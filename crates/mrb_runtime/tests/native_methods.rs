use mrb_runtime::{Aspec, CompileContext, State, Value};

fn double(s: &State, _recv: Value) -> Value {
    match s.get_args().first() {
        Some(Value::Int(n)) => Value::Int(n * 2),
        _ => {
            s.raise(s.core().type_error, "expected an Integer");
            Value::Nil
        }
    }
}

fn describe(s: &State, recv: Value) -> Value {
    let call = s.current_call().expect("inside a native call");
    let text = format!(
        "{}#{} on {}",
        s.class_name(call.target_class),
        s.sym_name(call.mid),
        s.obj_classname(&recv)
    );
    s.str_new(text.as_bytes())
}

fn with_block(s: &State, _recv: Value) -> Value {
    match s.get_block() {
        Some(b) => s.funcall(&b, "call", &[Value::Int(20)]),
        None => Value::Nil,
    }
}

fn setup() -> State {
    let state = State::open();
    let object = state.object_class();
    let tools = state.define_class_under(object, "Tools", None).unwrap();
    state.define_method(tools, state.intern("double"), double, Aspec::Req(1));
    state.define_method(tools, state.intern("describe"), describe, Aspec::None);
    state.define_method(tools, state.intern("with_block"), with_block, Aspec::Any);
    let meta = state.singleton_class(&Value::Class(tools)).unwrap();
    state.define_method(meta, state.intern("version"), describe, Aspec::Opt(1));
    state
}

fn run(state: &State, src: &str) -> String {
    let v = state.load_string(src, &CompileContext::default());
    if let Some(e) = state.exc() {
        panic!("unexpected {}", state.exc_message(&e));
    }
    state.inspect(&v)
}

#[test]
fn native_method_receives_arguments() {
    let state = setup();
    assert_eq!(run(&state, "Tools.new.double(21)"), "42");
}

#[test]
fn native_method_sees_target_class_and_name() {
    let state = setup();
    assert_eq!(run(&state, "Tools.new.describe"), r#""Tools#describe on Tools""#);
    assert_eq!(run(&state, "class Sub < Tools; end\nSub.new.describe"), r#""Tools#describe on Sub""#);
}

#[test]
fn class_method_through_singleton_class() {
    let state = setup();
    assert_eq!(run(&state, "Tools.version.start_with?(\"#<Class:Tools>#version\")"), "true");
}

#[test]
fn native_method_can_call_the_block() {
    let state = setup();
    assert_eq!(run(&state, "Tools.new.with_block { |x| x + 1 }"), "21");
    assert_eq!(run(&state, "Tools.new.with_block"), "nil");
}

#[test]
fn arity_is_checked_before_the_call() {
    let state = setup();
    state.load_string("Tools.new.double(1, 2)", &CompileContext::default());
    let e = state.exc().expect("arity error");
    assert_eq!(state.obj_classname(&e), "ArgumentError");
    assert_eq!(state.exc_message(&e), "wrong number of arguments (given 2, expected 1)");
}

#[test]
fn slot_set_by_native_code_is_rescuable() {
    let state = setup();
    let src = "begin\n  Tools.new.double('x')\nrescue TypeError => e\n  e.message\nend";
    assert_eq!(run(&state, src), r#""expected an Integer""#);
}

#[test]
fn current_call_is_empty_outside_native_code() {
    let state = setup();
    assert!(state.current_call().is_none());
    assert!(state.get_args().is_empty());
    assert!(state.get_block().is_none());
}

#[test]
fn state_ids_are_unique() {
    let a = State::open();
    let b = State::open();
    assert_ne!(a.id(), b.id());
}
