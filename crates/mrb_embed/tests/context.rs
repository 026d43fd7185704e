use mrb_embed::{Context, Error, HostValue, Options, ParseError, RunError, ValueType};

#[test]
fn adds_numbers() {
    let ctx = Context::new();
    let v = ctx.load_string("1 + 2", ()).unwrap();
    assert!(v.is_int());
    assert_eq!(v.to_int().unwrap(), 3);
    assert_eq!(ctx.load_string_result("1 + 2", ()).unwrap(), HostValue::Int(3));
}

#[test]
fn raise_becomes_run_error_and_context_stays_usable() {
    let ctx = Context::new();
    let err = ctx.load_string("raise 'kaboom'", ()).unwrap_err();
    assert_eq!(err.to_string(), "kaboom");
    match err {
        Error::Run(RunError { class, message }) => {
            assert_eq!(class, "RuntimeError");
            assert_eq!(message, "kaboom");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(ctx.pending_exception().is_none());
    assert_eq!(ctx.load_string("2 * 21", ()).unwrap().to_int().unwrap(), 42);
}

#[test]
fn raised_class_is_reported() {
    let ctx = Context::new();
    let err = ctx.load_string("[].fetch(3)", ()).unwrap_err();
    assert!(matches!(&err, Error::Run(e) if e.class == "IndexError"), "{err:?}");
    let err = ctx.load_string("1 / 0", ()).unwrap_err();
    assert!(matches!(&err, Error::Run(e) if e.class == "ZeroDivisionError"), "{err:?}");
}

#[test]
fn syntax_error_is_a_parse_error() {
    let ctx = Context::new();
    match ctx.load_string(".fail here!", ()) {
        Err(Error::Parse(ParseError { line, message })) => {
            assert_eq!(line, 1);
            assert_eq!(message, "syntax error, unexpected '.'");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(ctx.pending_exception().is_none());
    let err = ctx.parse("x = 1\ny = 2\n)").err().unwrap();
    assert!(matches!(err, Error::Parse(ParseError { line: 3, .. })), "{err:?}");
}

#[test]
fn deeply_nested_source_fails_to_parse() {
    let ctx = Context::new();
    let src = format!("{}1{}", "[".repeat(20_000), "]".repeat(20_000));
    match ctx.parse(&src) {
        Err(Error::Parse(e)) => assert_eq!(e.message, "syntax error, too deeply nested"),
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("nesting limit not enforced"),
    }
}

#[test]
fn argv_carries_host_arguments() {
    let ctx = Context::new();
    let v = ctx.load_string("ARGV[1]", ["Oliver", "Sandra"]).unwrap();
    assert_eq!(v.to_string().unwrap(), "Sandra");
    let v = ctx.load_string("ARGV.size", ()).unwrap();
    assert_eq!(v.to_int().unwrap(), 0);
    let v = ctx.load_string("ARGV.map { |n| n * 2 }", vec![1i64, 2, 3]).unwrap();
    assert_eq!(v.get::<Vec<i64>>().unwrap(), vec![2, 4, 6]);
}

#[test]
fn failed_load_keeps_previous_argv() {
    let ctx = Context::new();
    let argv = ctx.load_string("proc { ARGV }", ["kept"]).unwrap();
    assert!(ctx.load_string("def broken(", ["lost"]).is_err());
    let v = argv.call("call", ()).unwrap();
    assert_eq!(v.get::<Vec<String>>().unwrap(), ["kept"]);
}

#[test]
fn deep_recursion_raises_system_stack_error() {
    let src = "def depth(n)\n  if n == 0\n    0\n  else\n    1 + depth(n - 1)\n  end\nend\n";
    let outcome = std::thread::spawn(move || {
        let ctx = Context::new();
        ctx.load_string(src, ()).unwrap();
        assert_eq!(ctx.load_string("depth(100)", ()).unwrap().to_int().unwrap(), 100);
        match ctx.load_string("depth(1000)", ()) {
            Err(Error::Run(e)) => e,
            other => panic!("unexpected {other:?}"),
        }
    })
    .join()
    .unwrap();
    assert_eq!(outcome.class, "SystemStackError");
    assert_eq!(outcome.message, "stack level too deep");
}

#[test]
fn parsed_script_runs_repeatedly() {
    let ctx = Context::new();
    let script = ctx.parse("ARGV.first * 10").unwrap();
    assert_eq!(script.run([1i64]).unwrap().to_int().unwrap(), 10);
    assert_eq!(script.run([4i64]).unwrap().to_int().unwrap(), 40);
    assert!(script.to_value().is_proc());

    let failing = ctx.parse("raise ArgumentError, ARGV.first").unwrap();
    let err = failing.run(["bad input"]).unwrap_err();
    assert_eq!(err.to_string(), "bad input");
    assert!(ctx.pending_exception().is_none());
}

#[test]
fn no_exec_returns_a_proc() {
    let ctx = Context::with_options(Options::default().no_exec(true));
    let v = ctx.load_string("40 + 2", ()).unwrap();
    assert!(v.is_proc());
    assert_eq!(v.value_type(), ValueType::Proc);
    assert_eq!(v.run().unwrap().to_int().unwrap(), 42);
    let err = ctx.to_value(&1i64).run().unwrap_err();
    assert!(matches!(err, Error::Argument(_)), "{err:?}");
}

#[test]
fn run_applies_exception_capture() {
    let ctx = Context::with_options(Options::default().no_exec(true));
    let v = ctx.load_string("raise 'later'", ()).unwrap();
    let err = v.run().unwrap_err();
    assert_eq!(err.to_string(), "later");
}

#[test]
fn uncaptured_exceptions_stay_pending() {
    let ctx = Context::with_options(Options::default().capture_errors(false));
    let v = ctx.load_string("raise TypeError, 'left here'", ()).unwrap();
    assert!(v.is_nil());
    let exc = ctx.pending_exception().unwrap();
    assert!(exc.is_exception());
    assert_eq!(exc.class_name(), "TypeError");
    assert_eq!(exc.call("message", ()).unwrap().to_string().unwrap(), "left here");
    ctx.clear_exception();
    assert!(ctx.pending_exception().is_none());
}

#[test]
fn output_is_captured() {
    let ctx = Context::with_options(Options::default().capture_output(true));
    ctx.load_string("puts 'one'\nprint 2\np :three", ()).unwrap();
    assert_eq!(String::from_utf8(ctx.take_output()).unwrap(), "one\n2:three\n");
    assert!(ctx.take_output().is_empty());
}

#[test]
fn filename_is_visible_to_scripts() {
    let ctx = Context::with_options(Options::default().filename("demo.rb"));
    assert_eq!(ctx.options().filename, "demo.rb");
    let v = ctx.load_string("__FILE__", ()).unwrap();
    assert_eq!(v.to_string().unwrap(), "demo.rb");
}

#[test]
fn descriptors_follow_the_literal() {
    let ctx = Context::new();
    let cases = [
        ("nil", ValueType::Nil, "NilClass"),
        ("true", ValueType::True, "TrueClass"),
        ("false", ValueType::False, "FalseClass"),
        ("7", ValueType::Integer, "Integer"),
        ("7.5", ValueType::Float, "Float"),
        (":sym", ValueType::Symbol, "Symbol"),
        ("'str'", ValueType::String, "String"),
        ("[1]", ValueType::Array, "Array"),
        ("{a: 1}", ValueType::Hash, "Hash"),
        ("1..2", ValueType::Range, "Range"),
        ("->(x) { x }", ValueType::Proc, "Proc"),
        ("Object.new", ValueType::Object, "Object"),
        ("String", ValueType::Class, "Class"),
        ("Kernel", ValueType::Module, "Module"),
        ("RuntimeError.new('x')", ValueType::Exception, "RuntimeError"),
    ];
    for (src, ty, class) in cases {
        let v = ctx.load_string(src, ()).unwrap();
        assert_eq!(v.value_type(), ty, "{src}");
        assert_eq!(v.class_name(), class, "{src}");
    }
    assert_eq!(ValueType::Nil.to_string(), "nil");
    assert!(ValueType::Hash.is_convertible());
    assert!(!ValueType::Exception.is_convertible());
}

#[test]
fn values_render_like_the_script() {
    let ctx = Context::new();
    let v = ctx.load_string("[1, 'two', :three]", ()).unwrap();
    assert_eq!(v.inspect(), r#"[1, "two", :three]"#);
    assert_eq!(format!("{v:?}"), r#"Value([1, "two", :three])"#);
    let s = ctx.load_string("'plain'", ()).unwrap();
    assert_eq!(format!("{s}"), "plain");
}

#[test]
fn host_calls_methods_on_values() {
    let ctx = Context::new();
    let s = ctx.to_value("hello");
    assert_eq!(s.call("upcase", ()).unwrap().to_string().unwrap(), "HELLO");
    let arr = ctx.to_value(&[1i64, 2]);
    arr.call("push", [3i64]).unwrap();
    assert_eq!(arr.get::<Vec<i64>>().unwrap(), vec![1, 2, 3]);
    let err = s.call("no_such_thing", ()).unwrap_err();
    assert!(matches!(&err, Error::Run(e) if e.class == "NoMethodError"), "{err:?}");
}

#[test]
fn close_consumes_the_context() {
    let ctx = Context::new();
    let id = ctx.id();
    assert!(mrb_embed::registry::global().is_attached(id));
    ctx.close();
    assert!(!mrb_embed::registry::global().is_attached(id));
}
