mod common;

use common::{eval, eval_err};

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval("1 + 2"), "3");
    assert_eq!(eval("2 + 3 * 4"), "14");
    assert_eq!(eval("(2 + 3) * 4"), "20");
    assert_eq!(eval("2 ** 10"), "1024");
    assert_eq!(eval("-7 / 2"), "-4");
    assert_eq!(eval("-7 % 3"), "2");
    assert_eq!(eval("7.0 / 2"), "3.5");
}

#[test]
fn integer_overflow_promotes_to_float() {
    assert_eq!(eval("(9223372036854775807 + 1).class"), "Float");
    assert_eq!(eval("(4611686018427387904 * 4).class"), "Float");
}

#[test]
fn integer_division_by_zero_raises() {
    let (class, msg) = eval_err("1 / 0");
    assert_eq!(class, "ZeroDivisionError");
    assert_eq!(msg, "divided by 0");
}

#[test]
fn locals_and_op_assign() {
    assert_eq!(eval("a = 1\na += 2\na *= 5\na"), "15");
    assert_eq!(eval("x = nil\nx ||= 4\nx ||= 9\nx"), "4");
    assert_eq!(eval("a, b = 1, 2\na, b = b, a\n[a, b]"), "[2, 1]");
}

#[test]
fn string_interpolation() {
    assert_eq!(eval(r#"n = 3; "n=#{n + 1}!""#), r#""n=4!""#);
    assert_eq!(eval(r#"'no #{interp}'"#), r#""no \#{interp}""#);
}

#[test]
fn conditionals_and_loops() {
    assert_eq!(eval("x = 5\nif x > 3 then :big else :small end"), ":big");
    assert_eq!(eval("x = 1\nunless x == 1\n  :a\nelse\n  :b\nend"), ":b");
    assert_eq!(eval("i = 0\nsum = 0\nwhile i < 5\n  sum += i\n  i += 1\nend\nsum"), "10");
    assert_eq!(eval("i = 10\ni -= 1 until i < 3\ni"), "2");
    assert_eq!(eval("true ? 1 : 2"), "1");
}

#[test]
fn case_when_uses_case_equality() {
    let src = r#"
def kind(v)
  case v
  when Integer then "int"
  when 1..10 then "never"
  when "a", "b" then "letter"
  else "other"
  end
end
[kind(3), kind("b"), kind(:x)]
"#;
    assert_eq!(eval(src), r#"["int", "letter", "other"]"#);
}

#[test]
fn methods_with_optional_splat_and_block_params() {
    let src = r#"
def f(a, b = 2, *rest, &blk)
  [a, b, rest, blk ? blk.call(a) : nil]
end
[f(1), f(1, 3, 4, 5) { |x| x * 10 }]
"#;
    assert_eq!(eval(src), "[[1, 2, [], nil], [1, 3, [4, 5], 10]]");
}

#[test]
fn wrong_arity_raises_argument_error() {
    let (class, msg) = eval_err("def f(a, b); end\nf(1)");
    assert_eq!(class, "ArgumentError");
    assert_eq!(msg, "wrong number of arguments (given 1, expected 2)");
}

#[test]
fn blocks_yield_break_and_next() {
    assert_eq!(eval("def twice; yield 1; yield 2; end\nout = []\ntwice { |x| out << x * 2 }\nout"), "[2, 4]");
    assert_eq!(eval("[1, 2, 3, 4].each { |x| break x * 10 if x == 3 }"), "30");
    assert_eq!(eval("[1, 2, 3].map { |x| next 0 if x == 2; x }"), "[1, 0, 3]");
}

#[test]
fn lambdas_return_to_caller_and_check_arity() {
    assert_eq!(eval("l = ->(x) { return x + 1; 99 }\nl.call(1)"), "2");
    assert_eq!(eval("sq = ->(x) { x * x }\nsq.call(4) + sq[3]"), "25");
    let (class, _) = eval_err("l = ->(x) { x }\nl.call(1, 2)");
    assert_eq!(class, "ArgumentError");
}

#[test]
fn return_from_proc_returns_from_method() {
    let src = r#"
def find_first(items)
  items.each { |i| return i if i > 1 }
  nil
end
find_first([1, 5, 7])
"#;
    assert_eq!(eval(src), "5");
}

#[test]
fn symbol_to_proc_block_pass() {
    assert_eq!(eval("%w[a b].map(&:upcase)"), r#"["A", "B"]"#);
    assert_eq!(eval("[1, 2, 3].inject(:+)"), "6");
}

#[test]
fn globals_and_constants() {
    assert_eq!(eval("$counter = 1\ndef bump; $counter += 1; end\nbump\nbump\n$counter"), "3");
    assert_eq!(eval("LIMIT = 10\ndef lim; LIMIT; end\nlim"), "10");
}

#[test]
fn undefined_names_raise_name_errors() {
    let (class, msg) = eval_err("nope");
    assert_eq!(class, "NameError");
    assert!(msg.contains("nope"), "{msg}");
    let (class, msg) = eval_err("1.nope");
    assert_eq!(class, "NoMethodError");
    assert!(msg.contains("nope"), "{msg}");
    let (class, _) = eval_err("Missing");
    assert_eq!(class, "NameError");
}

#[test]
fn deep_recursion_raises_system_stack_error() {
    // The interpreter recurses on the native stack; give it room.
    let (class, msg) = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| eval_err("def down(n); down(n + 1); end\ndown(0)"))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(class, "SystemStackError");
    assert_eq!(msg, "stack level too deep");
}
