use mrb_embed::{Context, Error};

#[test]
fn lookups_miss_without_raising() {
    let ctx = Context::new();
    let object = ctx.object_class();
    assert!(ctx.get_class("Nope", &object).is_none());
    assert!(!ctx.has_class("Nope", &object));
    assert!(ctx.get_module("Nope", &object).is_none());
    assert!(!ctx.has_module("Nope", &object));

    let outer = ctx.define_module("Outer", &object).unwrap();
    assert!(!ctx.has_class("Nope", &outer));
    assert!(!ctx.has_module("Nope", &outer));
    assert!(ctx.pending_exception().is_none());
}

#[test]
fn lookups_respect_the_kind() {
    let ctx = Context::new();
    let object = ctx.object_class();
    assert!(ctx.has_class("String", &object));
    assert!(!ctx.has_module("String", &object));
    assert!(ctx.has_module("Kernel", &object));
    assert!(!ctx.has_class("Kernel", &object));
}

#[test]
fn nested_class_is_not_flattened() {
    let ctx = Context::new();
    let object = ctx.object_class();
    let outer = ctx.define_module("Outer", &object).unwrap();
    let inner = ctx.define_class_under("Inner", None, &outer).unwrap();
    assert_eq!(inner.name(), "Outer::Inner");

    let found = ctx.get_class("Inner", &outer).unwrap();
    assert_eq!(found.id(), inner.id());
    assert!(!ctx.has_class("Inner", &object));

    let v = ctx.load_string("Outer::Inner.name", ()).unwrap();
    assert_eq!(v.to_string().unwrap(), "Outer::Inner");
    let err = ctx.load_string("Inner", ()).unwrap_err();
    assert!(matches!(&err, Error::Run(e) if e.class == "NameError"), "{err:?}");
}

#[test]
fn defining_twice_returns_the_existing_class() {
    let ctx = Context::new();
    let first = ctx.define_class("Shape", None).unwrap();
    let second = ctx.define_class("Shape", None).unwrap();
    assert_eq!(first.id(), second.id());

    let object = ctx.object_class();
    let m1 = ctx.define_module("Tools", &object).unwrap();
    let m2 = ctx.define_module("Tools", &object).unwrap();
    assert_eq!(m1.id(), m2.id());
}

#[test]
fn subclass_keeps_its_superclass() {
    let ctx = Context::new();
    let base = ctx.define_class("Base", None).unwrap();
    let child = ctx.define_class("Child", Some(&base)).unwrap();
    let v = ctx.load_string("Child.superclass == Base", ()).unwrap();
    assert!(v.is_true());
    assert_eq!(ctx.define_class("Child", Some(&base)).unwrap().id(), child.id());

    let other = ctx.define_class("Other", None).unwrap();
    let err = ctx.define_class("Child", Some(&other)).unwrap_err();
    assert!(matches!(&err, Error::Argument(m) if m.contains("superclass mismatch")), "{err:?}");
}

#[test]
fn name_kind_conflicts_are_errors() {
    let ctx = Context::new();
    let object = ctx.object_class();
    ctx.define_module("Shared", &object).unwrap();
    assert!(ctx.define_class("Shared", None).is_err());
    ctx.define_class("Thing", None).unwrap();
    assert!(ctx.define_module("Thing", &object).is_err());
}

#[test]
fn script_defined_classes_are_visible() {
    let ctx = Context::new();
    ctx.load_string("module Zoo\n  class Cat\n    def speak\n      'meow'\n    end\n  end\nend", ())
        .unwrap();
    let object = ctx.object_class();
    let zoo = ctx.get_module("Zoo", &object).unwrap();
    let cat = ctx.get_class("Cat", &zoo).unwrap();
    let felix = cat.new_instance(()).unwrap();
    assert_eq!(felix.class_name(), "Zoo::Cat");
    assert_eq!(felix.call("speak", ()).unwrap().to_string().unwrap(), "meow");
}

#[test]
fn new_instance_passes_arguments() {
    let ctx = Context::new();
    ctx.load_string(
        "class Point\n  attr_reader :x, :y\n  def initialize(x, y)\n    @x = x\n    @y = y\n  end\nend",
        (),
    )
    .unwrap();
    let point = ctx.get_class("Point", &ctx.object_class()).unwrap();
    let p = point.new_instance([3i64, 4]).unwrap();
    assert_eq!(p.call("y", ()).unwrap().to_int().unwrap(), 4);
    let err = point.new_instance([1i64]).unwrap_err();
    assert!(matches!(&err, Error::Run(e) if e.class == "ArgumentError"), "{err:?}");
}
