use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use mrb_embed::{Args, Context, Error, Options, registry};

#[test]
fn class_method_takes_and_returns_a_string() {
    let ctx = Context::new();
    let tools = ctx.define_class("Tools", None).unwrap();
    tools
        .define_class_method(
            "greet",
            |ctx, _this| {
                let name = ctx.args()[0].to_string()?;
                Ok(ctx.to_value(&format!("hello, {name}")))
            },
            Args::required(1),
        )
        .unwrap();
    let v = ctx.load_string("Tools.greet('Sandra')", ()).unwrap();
    assert_eq!(v.to_string().unwrap(), "hello, Sandra");
}

#[test]
fn instance_method_sees_its_receiver() {
    let ctx = Context::new();
    let counter = ctx.define_class("Counter", None).unwrap();
    counter
        .define_method(
            "bump",
            |ctx, this| {
                let n = this.call("instance_variable_get", [ctx.to_value("@n")])?;
                let next = n.get::<Option<i64>>()?.unwrap_or(0) + 1;
                this.call("instance_variable_set", [ctx.to_value("@n"), ctx.to_value(&next)])
            },
            Args::none(),
        )
        .unwrap();
    let v = ctx.load_string("c = Counter.new\nc.bump\nc.bump\nc.bump", ()).unwrap();
    assert_eq!(v.to_int().unwrap(), 3);
}

#[test]
fn arity_is_checked_before_the_call() {
    let ctx = Context::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let tools = ctx.define_class("Tools", None).unwrap();
    tools
        .define_class_method(
            "pair",
            move |ctx, _this| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(ctx.to_value(&ctx.args().len()))
            },
            Args::arg(1, 1),
        )
        .unwrap();
    assert_eq!(ctx.load_string("Tools.pair(1, 2)", ()).unwrap().to_int().unwrap(), 2);
    let err = ctx.load_string("Tools.pair", ()).unwrap_err();
    assert!(matches!(&err, Error::Run(e) if e.class == "ArgumentError"), "{err:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn native_error_is_rescuable() {
    let ctx = Context::new();
    let tools = ctx.define_class("Tools", None).unwrap();
    tools
        .define_class_method("fail_now", |_, _| Err(Error::native("nope")), Args::none())
        .unwrap();
    let v = ctx
        .load_string(
            "begin\n  Tools.fail_now\nrescue RuntimeError => e\n  \"rescued: #{e.message}\"\nend",
            (),
        )
        .unwrap();
    assert_eq!(v.to_string().unwrap(), "rescued: nope");

    match ctx.load_string("Tools.fail_now", ()) {
        Err(Error::Run(e)) => {
            assert_eq!(e.class, "RuntimeError");
            assert_eq!(e.message, "nope");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn native_panic_becomes_runtime_error() {
    let ctx = Context::new();
    let tools = ctx.define_class("Tools", None).unwrap();
    tools
        .define_class_method("explode", |_, _| panic!("wires crossed"), Args::none())
        .unwrap();
    let err = ctx.load_string("Tools.explode", ()).unwrap_err();
    assert_eq!(err.to_string(), "host function panicked: wires crossed");
}

#[test]
fn reregistration_overwrites() {
    let ctx = Context::new();
    let widget = ctx.define_class("Widget", None).unwrap();
    widget
        .define_method("version", |ctx, _| Ok(ctx.to_value(&1i64)), Args::none())
        .unwrap();
    widget
        .define_method("version", |ctx, _| Ok(ctx.to_value(&2i64)), Args::none())
        .unwrap();
    let v = ctx.load_string("Widget.new.version", ()).unwrap();
    assert_eq!(v.to_int().unwrap(), 2);
    assert_eq!(registry::global().count(ctx.id()), 1);
}

#[test]
fn subclasses_inherit_host_methods() {
    let ctx = Context::new();
    let base = ctx.define_class("Animal", None).unwrap();
    base.define_method(
        "kind",
        |ctx, this| Ok(ctx.to_value(&this.class_name())),
        Args::none(),
    )
    .unwrap();
    ctx.load_string("class Dog < Animal\nend", ()).unwrap();
    let v = ctx.load_string("Dog.new.kind", ()).unwrap();
    assert_eq!(v.to_string().unwrap(), "Dog");
}

#[test]
fn aliases_reach_the_original_host_function() {
    let ctx = Context::new();
    let greeter = ctx.define_class("Greeter", None).unwrap();
    greeter
        .define_method("hi", |ctx, _this| Ok(ctx.to_value("hi")), Args::none())
        .unwrap();
    let src = "class Greeter
  alias_method :hello, :hi
end
               class Loud < Greeter
  alias_method :shout, :hi
end
               [Greeter.new.hi, Greeter.new.hello, Loud.new.shout]";
    let v = ctx.load_string(src, ()).unwrap();
    assert_eq!(v.get::<Vec<String>>().unwrap(), ["hi", "hi", "hi"]);
}

#[test]
fn module_functions_and_mixins() {
    let ctx = Context::new();
    let object = ctx.object_class();
    let text = ctx.define_module("Text", &object).unwrap();
    text.define_class_method(
        "shout",
        |ctx, _| {
            let s = ctx.args()[0].to_string()?;
            Ok(ctx.to_value(&s.to_uppercase()))
        },
        Args::required(1),
    )
    .unwrap();
    text.define_method("twice", |_, this| this.call("times", [2i64]), Args::none())
        .unwrap();
    let v = ctx.load_string("Text.shout('hey')", ()).unwrap();
    assert_eq!(v.to_string().unwrap(), "HEY");
    let v = ctx
        .load_string("class Num\n  include Text\n  def times(n)\n    21 * n\n  end\nend\nNum.new.twice", ())
        .unwrap();
    assert_eq!(v.to_int().unwrap(), 42);
}

#[test]
fn block_reaches_the_host() {
    let ctx = Context::new();
    let tools = ctx.define_class("Tools", None).unwrap();
    tools
        .define_class_method(
            "apply",
            |ctx, _| match ctx.block() {
                Some(blk) => blk.call("call", ctx.args()),
                None => Ok(ctx.to_value("no block")),
            },
            Args::any(),
        )
        .unwrap();
    let v = ctx.load_string("Tools.apply(3, 4) { |a, b| a * b }", ()).unwrap();
    assert_eq!(v.to_int().unwrap(), 12);
    let v = ctx.load_string("Tools.apply(1)", ()).unwrap();
    assert_eq!(v.to_string().unwrap(), "no block");
    assert!(ctx.args().is_empty());
    assert!(ctx.block().is_none());
}

#[test]
fn uncaptured_native_error_stays_pending() {
    let ctx = Context::with_options(Options::default().capture_errors(false));
    let tools = ctx.define_class("Tools", None).unwrap();
    tools
        .define_class_method("fail_now", |_, _| Err(Error::native("still here")), Args::none())
        .unwrap();
    assert!(ctx.load_string("Tools.fail_now", ()).unwrap().is_nil());
    let exc = ctx.pending_exception().unwrap();
    assert_eq!(exc.class_name(), "RuntimeError");
}

#[test]
fn dropping_a_context_prunes_its_entries() {
    let ctx = Context::new();
    let id = ctx.id();
    let a = ctx.define_class("A", None).unwrap();
    a.define_method("x", |ctx, _| Ok(ctx.nil()), Args::none()).unwrap();
    a.define_class_method("y", |ctx, _| Ok(ctx.nil()), Args::none()).unwrap();
    assert_eq!(registry::global().count(id), 2);
    drop(ctx);
    assert_eq!(registry::global().count(id), 0);
    assert!(!registry::global().is_attached(id));
}

#[test]
fn contexts_on_threads_do_not_collide() {
    let handles: Vec<_> = (0..4i64)
        .map(|n| {
            thread::spawn(move || {
                let ctx = Context::new();
                let worker = ctx.define_class("Worker", None).unwrap();
                worker
                    .define_method("value", move |ctx, _| Ok(ctx.to_value(&n)), Args::none())
                    .unwrap();
                let mut total = 0;
                for _ in 0..50 {
                    total += ctx.load_string("Worker.new.value", ()).unwrap().to_int().unwrap();
                }
                (ctx.id(), total)
            })
        })
        .collect();
    let mut ids = Vec::new();
    for (n, handle) in handles.into_iter().enumerate() {
        let (id, total) = handle.join().unwrap();
        assert_eq!(total, n as i64 * 50);
        ids.push(id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[test]
fn same_class_in_two_contexts_keeps_separate_functions() {
    let first = Context::new();
    let second = Context::new();
    for (ctx, word) in [(&first, "first"), (&second, "second")] {
        let c = ctx.define_class("Named", None).unwrap();
        c.define_method("word", move |ctx, _| Ok(ctx.to_value(word)), Args::none())
            .unwrap();
    }
    let a = first.load_string("Named.new.word", ()).unwrap();
    let b = second.load_string("Named.new.word", ()).unwrap();
    assert_eq!(a.to_string().unwrap(), "first");
    assert_eq!(b.to_string().unwrap(), "second");
}
