mod common;

use common::{eval, eval_err, output};

#[test]
fn string_methods() {
    assert_eq!(eval(r#""hello world".split.map(&:capitalize).join(" ")"#), r#""Hello World""#);
    assert_eq!(eval(r#""a,b,,c".split(",")"#), r#"["a", "b", "", "c"]"#);
    assert_eq!(eval(r#""  pad  ".strip + "|""#), r#""pad|""#);
    assert_eq!(eval(r#""abc".reverse.upcase"#), r#""CBA""#);
    assert_eq!(eval(r#""hello"[1, 3]"#), r#""ell""#);
    assert_eq!(eval(r#""hello"[-3..-1]"#), r#""llo""#);
    assert_eq!(eval(r#""banana".gsub("a", "o")"#), r#""bonono""#);
    assert_eq!(eval(r#""banana".sub("an") { |m| m.upcase }"#), r#""bANana""#);
    assert_eq!(eval(r#""hello".tr("el", "ip")"#), r#""hippo""#);
    assert_eq!(eval(r#""az".succ"#), r#""ba""#);
    assert_eq!(eval(r#""ab" * 3"#), r#""ababab""#);
    assert_eq!(eval(r#""x".center(5, "*")"#), r#""**x**""#);
    assert_eq!(eval(r#""héllo".length"#), "5");
    assert_eq!(eval(r#""héllo".bytesize"#), "6");
    assert_eq!(eval(r#""42abc".to_i + "3.5".to_f"#), "45.5");
    assert_eq!(eval(r#""ff".to_i(16)"#), "255");
    assert_eq!(eval(r#"s = "ab"; s << "cd"; s"#), r#""abcd""#);
    assert_eq!(eval(r#""a" <=> "b""#), "-1");
    assert_eq!(eval(r#""line1\nline2".lines"#), r#"["line1\n", "line2"]"#);
}

#[test]
fn format_directives() {
    assert_eq!(eval(r#"format("%05.2f|%-4s|%x|%+d", 3.14159, "ab", 255, 7)"#), r#""03.14|ab  |ff|+7""#);
    assert_eq!(eval(r#""%s and %p" % ["a", "a"]"#), r#""a and \"a\"""#);
    assert_eq!(eval(r#"format("%<n>03d", n: 7)"#), r#""007""#);
    let (class, msg) = eval_err(r#"format("%d %d", 1)"#);
    assert_eq!(class, "ArgumentError");
    assert_eq!(msg, "too few arguments");
}

#[test]
fn symbol_methods() {
    assert_eq!(eval(":abc.to_s"), r#""abc""#);
    assert_eq!(eval(":abc.length"), "3");
    assert_eq!(eval(r#""x y".to_sym.inspect"#), r#"":\"x y\"""#);
    assert_eq!(eval(":a <=> :b"), "-1");
}

#[test]
fn array_methods() {
    assert_eq!(eval("[3, 1, 2].sort.reverse"), "[3, 2, 1]");
    assert_eq!(eval("[1, 2, 3, 4].select(&:even?)"), "[2, 4]");
    assert_eq!(eval("[1, [2, [3, [4]]]].flatten"), "[1, 2, 3, 4]");
    assert_eq!(eval("[1, nil, 2, nil].compact"), "[1, 2]");
    assert_eq!(eval("[1, 2, 2, 3, 1].uniq"), "[1, 2, 3]");
    assert_eq!(eval("[1, 2, 3] & [2, 3, 4]"), "[2, 3]");
    assert_eq!(eval("[1, 2] + [3] - [1]"), "[2, 3]");
    assert_eq!(eval("a = [1, 2, 3]\na[5] = 6\na"), "[1, 2, 3, nil, nil, 6]");
    assert_eq!(eval("a = [1, 2, 3, 4]\n[a.first(2), a.last, a[1..-2], a[-1]]"), "[[1, 2], 4, [2, 3], 4]");
    assert_eq!(eval("a = [1, 2, 3]\n[a.pop, a.shift, a]"), "[3, 1, [2]]");
    assert_eq!(eval("[1, 2, 3].each_with_index.map { |x, i| x * i }"), "[0, 2, 6]");
    assert_eq!(eval("%w[b c a].sort_by { |s| s }"), r#"["a", "b", "c"]"#);
    assert_eq!(eval("[[1, 2], [3, 4]].transpose"), "[[1, 3], [2, 4]]");
    assert_eq!(eval("[1, 2, 3].each_slice(2).to_a"), "[[1, 2], [3]]");
    assert_eq!(eval("[1, 2, 3].zip([4, 5, 6])"), "[[1, 4], [2, 5], [3, 6]]");
    assert_eq!(eval("[1, 2, 3, 4].partition(&:odd?)"), "[[1, 3], [2, 4]]");
    assert_eq!(eval("%w[a b a].tally"), r#"{"a"=>2, "b"=>1}"#);
    assert_eq!(eval("[1, 2, 3].inject(10) { |s, x| s + x }"), "16");
    assert_eq!(eval("[5, 3, 9].minmax"), "[3, 9]");
    assert_eq!(eval("[1, 2, 3].sum { |x| x * x }"), "14");
    assert_eq!(eval("[1, 2].product([3, 4])"), "[[1, 3], [1, 4], [2, 3], [2, 4]]");
    assert_eq!(eval("a = [1]\na << a\na.inspect"), r#""[1, [...]]""#);
    assert_eq!(eval("[1, 2, 3].join('-')"), r#""1-2-3""#);
    assert_eq!(eval("[1, 'a'] * 3"), r#"[1, "a", 1, "a", 1, "a"]"#);
    assert_eq!(eval("[1, 2] * 0"), "[]");
    assert_eq!(eval("[1, 2] * ', '"), r#""1, 2""#);
    assert_eq!(eval_err("[1] * -1").0, "ArgumentError");
}

#[test]
fn array_fetch_raises_index_error() {
    let (class, msg) = eval_err("[1, 2].fetch(5)");
    assert_eq!(class, "IndexError");
    assert!(msg.contains("5"), "{msg}");
}

#[test]
fn hash_methods() {
    assert_eq!(eval("h = {a: 1, b: 2}\nh[:c] = 3\nh"), "{:a=>1, :b=>2, :c=>3}");
    assert_eq!(eval(r#"{"x" => 1}.merge({"y" => 2})"#), r#"{"x"=>1, "y"=>2}"#);
    assert_eq!(eval("{a: 1, b: 2}.map { |k, v| [k, v * 2] }.to_h"), "{:a=>2, :b=>4}");
    assert_eq!(eval("{a: 1, b: 2}.select { |k, v| v > 1 }"), "{:b=>2}");
    assert_eq!(eval("{a: 1}.fetch(:b, 0)"), "0");
    assert_eq!(eval("h = Hash.new { |hash, k| hash[k] = k * 2 }\nh[3]\nh"), "{3=>6}");
    assert_eq!(eval("h = Hash.new(0)\n%w[a b a].each { |w| h[w] += 1 }\nh"), r#"{"a"=>2, "b"=>1}"#);
    assert_eq!(eval("{b: 2, a: 1}.sort_by { |k, v| v }"), "[[:a, 1], [:b, 2]]");
    assert_eq!(eval("{a: 1, b: 2}.transform_values { |v| v + 1 }"), "{:a=>2, :b=>3}");
    assert_eq!(eval("h = {a: 1}\n[h.key?(:a), h.key?(:b), h.value?(1)]"), "[true, false, true]");
    assert_eq!(eval("h = {a: 1, b: 2}\nh.delete(:a)\n[h, h.size]"), "[{:b=>2}, 1]");
    assert_eq!(eval("{a: {b: {c: 1}}}.dig(:a, :b, :c)"), "1");
    assert_eq!(eval("%w[apple avocado banana].group_by { |w| w[0] }"), r#"{"a"=>["apple", "avocado"], "b"=>["banana"]}"#);
}

#[test]
fn hash_fetch_missing_key() {
    let (class, msg) = eval_err("{a: 1}.fetch(:zz)");
    assert_eq!(class, "KeyError");
    assert_eq!(msg, "key not found: :zz");
}

#[test]
fn ranges() {
    assert_eq!(eval("(1..5).to_a"), "[1, 2, 3, 4, 5]");
    assert_eq!(eval("(1...5).sum"), "10");
    assert_eq!(eval("(1..10).step(3).to_a"), "[1, 4, 7, 10]");
    assert_eq!(eval("('a'..'e').to_a.join"), r#""abcde""#);
    assert_eq!(eval("(1..10).include?(5.5)"), "true");
    assert_eq!(eval("(1..10).select(&:even?)"), "[2, 4, 6, 8, 10]");
    assert_eq!(eval("(1..3).map { |x| x * x }"), "[1, 4, 9]");
    assert_eq!(eval("(1..4).reduce(:*)"), "24");
    assert_eq!(eval("(1..0).to_a"), "[]");
    assert_eq!(eval("(1..5).inspect"), r#""1..5""#);
    let (class, _) = eval_err("Range.new(1, nil).to_a");
    assert_eq!(class, "RangeError");
}

#[test]
fn numerics() {
    assert_eq!(eval("10.divmod(3)"), "[3, 1]");
    assert_eq!(eval("(-7).abs + 2.5.floor + 2.5.ceil"), "12");
    assert_eq!(eval("3.14159.round(2)"), "3.14");
    assert_eq!(eval("1234.round(-2)"), "1200");
    assert_eq!(eval("255.to_s(2)"), r#""11111111""#);
    assert_eq!(eval("10.gcd(4) + 10.lcm(4)"), "22");
    assert_eq!(eval("x = 0\n5.times { |i| x += i }\nx"), "10");
    assert_eq!(eval("1.upto(3).to_a + 3.downto(1).to_a"), "[1, 2, 3, 3, 2, 1]");
    assert_eq!(eval("7.fdiv(2)"), "3.5");
    assert_eq!(eval("2 ** -1"), "0.5");
    assert_eq!(eval("Integer('0x1f') + Integer('12')"), "43");
    assert_eq!(eval("Math.sqrt(16)"), "4.0");
    assert_eq!(eval("(0.1 + 0.2).round(2) == 0.3"), "true");
    assert_eq!(eval("1.0 / 0"), "Infinity");
    assert_eq!(eval("[1, 2.5].max"), "2.5");
    assert_eq!(eval("5.clamp(1, 3)"), "3");
    let (class, _) = eval_err("Integer('12abc')");
    assert_eq!(class, "ArgumentError");
    let (class, _) = eval_err("(0.0 / 0).to_i");
    assert_eq!(class, "FloatDomainError");
    let (class, msg) = eval_err("1 + 'a'");
    assert_eq!(class, "TypeError");
    assert_eq!(msg, "String can't be coerced into Integer");
}

#[test]
fn object_introspection() {
    assert_eq!(eval("[1.class, 1.5.class, nil.class, :a.class, 'a'.class, [].class, {}.class]"),
        "[Integer, Float, NilClass, Symbol, String, Array, Hash]");
    assert_eq!(eval("(1..2).class"), "Range");
    assert_eq!(eval("->{}.class"), "Proc");
    assert_eq!(eval("1.is_a?(Comparable)"), "true");
    assert_eq!(eval("nil.to_a + [nil.to_s]"), r#"[""]"#);
    assert_eq!(eval("x = 'a'\ny = x.dup\ny << 'b'\n[x, y]"), r#"["a", "ab"]"#);
    assert_eq!(eval("5.then { |x| x + 1 }"), "6");
    assert_eq!(eval("[1, 2].frozen?"), "false");
    assert_eq!(eval("['ab'.hash == 'ab'.hash, [1, :a].hash == [1, :a].hash]"), "[true, true]");
    assert_eq!(eval("a = [1]\na << a\n{a => :self}[a]"), ":self");
}

#[test]
fn procs() {
    assert_eq!(eval("->(a, b) {}.arity"), "2");
    assert_eq!(eval("->(a, *b) {}.arity"), "-2");
    assert_eq!(eval("proc { |x| x }.lambda?"), "false");
    assert_eq!(eval("lambda { |x| x }.lambda?"), "true");
    assert_eq!(eval("add = proc { |a, b| (a || 0) + (b || 0) }\nadd.call(1)"), "1");
    assert_eq!(eval("->(a, b = 1, *c) {}.parameters"), "[[:req, :a], [:opt, :b], [:rest, :c]]");
    assert_eq!(eval("counter = 0\ninc = -> { counter += 1 }\ninc.call\ninc.call\ncounter"), "2");
}

#[test]
fn puts_print_and_p() {
    assert_eq!(output("puts 1, [2, [3]], nil\nprint 'a', 'b'\np :c, 'd'"), "1\n2\n3\n\nab:c\n\"d\"\n");
    assert_eq!(output("puts\nputs([])\nputs \"x\\n\""), "\n\nx\n");
    assert_eq!(output("printf(\"%d-%s\\n\", 1, :two)"), "1-two\n");
    assert_eq!(eval("p(1, 2)"), "[1, 2]");
    assert_eq!(eval("p"), "nil");
}

#[test]
fn to_s_and_inspect_dispatch_to_user_methods() {
    let src = r##"
class Money
  def initialize(c); @c = c; end
  def to_s; "$#{@c}"; end
  def inspect; "#<Money #{@c}>"; end
end
m = Money.new(5)
["#{m}", [m].inspect]
"##;
    assert_eq!(eval(src), r##"["$5", "[#<Money 5>]"]"##);
}
