mod common;

use common::{eval, eval_err};
use mrb_runtime::State;

#[test]
fn instances_ivars_and_accessors() {
    let src = r##"
class Point
  attr_accessor :x, :y
  def initialize(x, y)
    @x = x
    @y = y
  end
  def +(o)
    Point.new(x + o.x, y + o.y)
  end
  def to_s
    "(#{x}, #{y})"
  end
end
p = Point.new(1, 2) + Point.new(3, 4)
p.y = 10
"#{p}"
"##;
    assert_eq!(eval(src), r#""(4, 10)""#);
}

#[test]
fn inheritance_and_super() {
    let src = r##"
class Animal
  def initialize(name)
    @name = name
  end
  def speak
    "#{@name} makes a sound"
  end
end
class Dog < Animal
  def speak
    super + " (woof)"
  end
end
[Dog.new("Rex").speak, Dog.superclass, Dog.new("a").is_a?(Animal)]
"##;
    assert_eq!(eval(src), r#"["Rex makes a sound (woof)", Animal, true]"#);
}

#[test]
fn bare_super_passes_current_parameter_values() {
    let src = r##"
class Base
  def greet(name, greeting = "hi")
    "#{greeting} #{name}"
  end
end
class Loud < Base
  def greet(name, greeting = "hey")
    name = name.upcase
    super
  end
end
Loud.new.greet("bo")
"##;
    assert_eq!(eval(src), r#""hey BO""#);
}

#[test]
fn class_methods_and_singleton_blocks() {
    let src = r#"
class Counter
  @count = 0
  def self.bump
    @count += 1
  end
  class << self
    def count
      @count
    end
  end
end
Counter.bump
Counter.bump
Counter.count
"#;
    assert_eq!(eval(src), "2");
}

#[test]
fn reopening_a_class_keeps_existing_methods() {
    let src = "class A\n  def a; 1; end\nend\nclass A\n  def b; 2; end\nend\nx = A.new\nx.a + x.b";
    assert_eq!(eval(src), "3");
}

#[test]
fn superclass_mismatch_raises() {
    let (class, msg) = eval_err("class A; end\nclass B; end\nclass C < A; end\nclass C < B; end");
    assert_eq!(class, "TypeError");
    assert_eq!(msg, "superclass mismatch for class C");
}

#[test]
fn modules_mix_in_and_namespace() {
    let src = r#"
module Greeting
  def hello
    "hello from #{self.class}"
  end
end
module Outer
  class Inner
    include Greeting
  end
end
[Outer::Inner.new.hello, Outer::Inner.include?(Greeting), Outer::Inner.name]
"#;
    assert_eq!(eval(src), r#"["hello from Outer::Inner", true, "Outer::Inner"]"#);
}

#[test]
fn comparable_via_spaceship() {
    let src = r#"
class Version
  include Comparable
  attr_reader :n
  def initialize(n)
    @n = n
  end
  def <=>(o)
    n <=> o.n
  end
end
a = Version.new(1)
b = Version.new(2)
[a < b, a == Version.new(1), b.between?(a, b), Version.new(5).clamp(a, b).n]
"#;
    assert_eq!(eval(src), "[true, true, true, 2]");
}

#[test]
fn enumerable_via_each() {
    let src = r#"
class Bag
  include Enumerable
  def initialize(*items)
    @items = items
  end
  def each
    @items.each { |i| yield i }
    self
  end
end
b = Bag.new(3, 1, 2)
[b.sort, b.map { |x| x * 2 }, b.include?(2), b.min, b.sum, b.first]
"#;
    assert_eq!(eval(src), "[[1, 2, 3], [6, 2, 4], true, 1, 6, 3]");
}

#[test]
fn method_missing_and_respond_to() {
    let src = r#"
class Ghost
  def method_missing(name, *args)
    "ghost #{name} #{args.size}"
  end
end
[Ghost.new.boo(1, 2), Ghost.new.respond_to?(:boo), 1.respond_to?(:+)]
"#;
    assert_eq!(eval(src), r#"["ghost boo 2", false, true]"#);
}

#[test]
fn define_method_and_send() {
    let src = r##"
class Dyn
  [:a, :b].each do |n|
    define_method(n) { |x| "#{n}#{x}" }
  end
end
[Dyn.new.a(1), Dyn.new.send(:b, 2)]
"##;
    assert_eq!(eval(src), r#"["a1", "b2"]"#);
}

#[test]
fn host_side_class_lookups_never_raise() {
    let state = State::open();
    let object = state.object_class();
    assert!(state.class_get_under(object, "NoSuchClass").is_none());
    assert!(state.module_get_under(object, "NoSuchModule").is_none());

    let outer = state.define_module_under(object, "Outer").unwrap();
    let inner = state.define_class_under(outer, "Inner", None).unwrap();
    assert_eq!(state.class_get_under(outer, "Inner"), Some(inner));
    assert!(state.class_get_under(object, "Inner").is_none());
    assert_eq!(state.class_name(inner), "Outer::Inner");
    // A second definition returns the existing class.
    assert_eq!(state.define_class_under(outer, "Inner", None).unwrap(), inner);
    // Lookups walk the superclass chain.
    let sub = state.define_class_under(object, "Sub", Some(inner)).unwrap();
    assert!(state.class_get_under(sub, "String").is_some());
}
