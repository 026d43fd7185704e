mod common;

use common::{eval, eval_err};
use mrb_runtime::{CompileContext, State};

#[test]
fn raise_string_is_runtime_error() {
    let (class, msg) = eval_err("raise 'kaboom'");
    assert_eq!(class, "RuntimeError");
    assert_eq!(msg, "kaboom");
}

#[test]
fn raise_class_with_message() {
    let (class, msg) = eval_err("raise ArgumentError, 'bad input'");
    assert_eq!(class, "ArgumentError");
    assert_eq!(msg, "bad input");
    let (class, msg) = eval_err("raise TypeError");
    assert_eq!(class, "TypeError");
    assert_eq!(msg, "TypeError");
}

#[test]
fn rescue_matches_by_class_and_binds_variable() {
    let src = r#"
begin
  raise KeyError, "missing"
rescue ArgumentError
  :wrong
rescue IndexError => e
  [e.class, e.message]
end
"#;
    assert_eq!(eval(src), r#"[KeyError, "missing"]"#);
}

#[test]
fn bare_rescue_catches_standard_errors_only() {
    assert_eq!(eval("begin\n  1 / 0\nrescue => e\n  e.class\nend"), "ZeroDivisionError");
    let (class, _) = eval_err("begin\n  raise Exception, 'top'\nrescue => e\n  :caught\nend");
    assert_eq!(class, "Exception");
}

#[test]
fn else_and_ensure_clauses() {
    let src = r#"
log = []
r = begin
  log << :body
  1
rescue
  log << :rescue
else
  log << :else
  2
ensure
  log << :ensure
end
[r, log]
"#;
    assert_eq!(eval(src), "[2, [:body, :else, :ensure]]");
}

#[test]
fn ensure_runs_when_exception_propagates() {
    let src = r#"
$log = []
def risky
  raise "x"
ensure
  $log << :cleanup
end
begin
  risky
rescue
  $log << :rescued
end
$log
"#;
    assert_eq!(eval(src), "[:cleanup, :rescued]");
}

#[test]
fn rescue_inside_def_body() {
    let src = "def safe\n  raise 'no'\nrescue => e\n  \"got #{e.message}\"\nend\nsafe";
    assert_eq!(eval(src), r#""got no""#);
}

#[test]
fn custom_exception_classes() {
    let src = r#"
class AppError < StandardError
  def initialize(msg = "app failed")
    super
  end
end
begin
  raise AppError
rescue StandardError => e
  [e.class.superclass, e.message, e.is_a?(StandardError)]
end
"#;
    assert_eq!(eval(src), r#"[StandardError, "app failed", true]"#);
}

#[test]
fn exception_inspect_and_equality() {
    assert_eq!(eval("RuntimeError.new('boom').inspect"), r##""#<RuntimeError: boom>""##);
    assert_eq!(eval("ArgumentError.new.message"), r#""ArgumentError""#);
    assert_eq!(eval("RuntimeError.new('a') == RuntimeError.new('a')"), "true");
    assert_eq!(eval("RuntimeError.new('a') == TypeError.new('a')"), "false");
}

#[test]
fn exception_hierarchy() {
    assert_eq!(eval("KeyError.ancestors.include?(IndexError)"), "true");
    assert_eq!(eval("NoMethodError.superclass"), "NameError");
    assert_eq!(eval("ZeroDivisionError.superclass"), "StandardError");
    assert_eq!(eval("FloatDomainError.superclass"), "RangeError");
    assert_eq!(eval("SyntaxError.superclass"), "ScriptError");
}

#[test]
fn retained_slot_is_cleared_by_host() {
    let state = State::open();
    let cc = CompileContext::default();
    state.load_string("raise 'first'", &cc);
    let e = state.exc().expect("slot set");
    assert_eq!(state.exc_message(&e), "first");
    state.clear_exc();
    assert!(state.exc().is_none());
    let v = state.load_string("40 + 2", &cc);
    assert_eq!(state.inspect(&v), "42");
    assert!(state.exc().is_none());
}

#[test]
fn syntax_errors_land_in_the_slot() {
    let state = State::open();
    let cc = CompileContext {
        filename: "demo.rb".to_string(),
        ..CompileContext::default()
    };
    let v = state.load_string(".fail here!", &cc);
    assert!(v.is_nil());
    let e = state.exc().expect("syntax error");
    assert_eq!(state.obj_classname(&e), "SyntaxError");
    assert_eq!(state.exc_message(&e), "demo.rb:1: syntax error, unexpected '.'");
}

#[test]
fn parse_reports_line_and_message() {
    let state = State::open();
    let err = state
        .parse("x = 1\ny = (2 +\n", &CompileContext::default())
        .expect_err("incomplete expression");
    assert_eq!(err.line, 3);
    assert!(err.message.starts_with("syntax error"), "{err}");
}

#[test]
fn loop_stops_on_stop_iteration() {
    assert_eq!(eval("i = 0\nloop do\n  i += 1\n  raise StopIteration if i == 3\nend\ni"), "3");
}
