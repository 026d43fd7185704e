use mrb_parser::{BlockArg, Expr, JumpTarget, StrPart, Target, parse_program};

fn parse_ok(src: &str) -> Box<[Expr]> {
    let parse = parse_program(src);
    assert!(parse.first_error().is_none(), "{:?}", parse.diagnostics);
    parse.program.body
}

fn call_name(e: &Expr) -> &str {
    match e {
        Expr::Call(c) => &c.name,
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn command_call_without_parens_takes_all_arguments() {
    let body = parse_ok(r#"concat "Hello", "World""#);
    let Expr::Call(c) = &body[0] else {
        panic!("{:?}", body[0]);
    };
    assert_eq!(c.name, "concat");
    assert!(c.recv.is_none());
    assert_eq!(c.args.len(), 2);
}

#[test]
fn assigned_names_become_locals() {
    let body = parse_ok("x = 1\nx\ny");
    assert!(matches!(&body[0], Expr::Assign(a) if a.target == Target::LVar("x".into())));
    assert_eq!(body[1], Expr::LVar("x".into()));
    assert_eq!(call_name(&body[2]), "y");
}

#[test]
fn method_bodies_do_not_see_outer_locals() {
    let body = parse_ok("x = 1\ndef f\n  x\nend");
    let Expr::Def(def) = &body[1] else {
        panic!("{:?}", body[1]);
    };
    assert_eq!(call_name(&def.body.body[0]), "x");
}

#[test]
fn blocks_see_outer_locals_and_declare_params() {
    let body = parse_ok("total = 0\n[1, 2].each { |n| total += n }");
    let Expr::Call(each) = &body[1] else {
        panic!("{:?}", body[1]);
    };
    let Some(BlockArg::Literal(block)) = &each.block else {
        panic!("{:?}", each.block);
    };
    assert_eq!(block.params.required, vec!["n".to_string()]);
    assert!(matches!(&block.body[0], Expr::OpAssign(o) if o.target == Target::LVar("total".into())));
}

#[test]
fn do_block_binds_to_command_call() {
    let body = parse_ok("foo bar do |x|\n  x\nend");
    let Expr::Call(foo) = &body[0] else {
        panic!("{:?}", body[0]);
    };
    assert_eq!(foo.name, "foo");
    assert!(foo.block.is_some());
    assert!(matches!(&foo.args[0], Expr::Call(bar) if bar.block.is_none()));
}

#[test]
fn binary_precedence_and_unary_minus() {
    let body = parse_ok("1 + 2 * 3");
    let Expr::Call(plus) = &body[0] else {
        panic!("{:?}", body[0]);
    };
    assert_eq!(plus.name, "+");
    assert_eq!(call_name(&plus.args[0]), "*");

    assert_eq!(parse_ok("-5")[0], Expr::Int(-5));
    let body = parse_ok("-2 ** 2");
    assert_eq!(call_name(&body[0]), "-@");
}

#[test]
fn interpolation_shares_locals() {
    let body = parse_ok("name = 'x'\n\"hi #{name}!\"");
    let Expr::DStr(parts) = &body[1] else {
        panic!("{:?}", body[1]);
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[1], StrPart::Code(code) if code[0] == Expr::LVar("name".into())));
}

#[test]
fn break_inside_block_targets_block() {
    let body = parse_ok("while true\n  [1].each { break }\n  break\nend");
    let Expr::While(w) = &body[0] else {
        panic!("{:?}", body[0]);
    };
    let Expr::Call(each) = &w.body[0] else {
        panic!("{:?}", w.body[0]);
    };
    let Some(BlockArg::Literal(block)) = &each.block else {
        panic!();
    };
    assert_eq!(block.body[0], Expr::Break(None, JumpTarget::Block));
    assert_eq!(w.body[1], Expr::Break(None, JumpTarget::Loop));
}

#[test]
fn class_with_methods_and_rescue() {
    let src = r#"
class Greeter < Object
  attr_reader :name

  def initialize(name, greeting = "hi", *rest, &blk)
    @name = name
  end

  def self.build(n)
    new(n)
  rescue ArgumentError => e
    nil
  ensure
    1
  end

  def name=(v)
    @name = v
  end

  def <=>(other)
    name <=> other.name
  end
end
"#;
    let body = parse_ok(src);
    let Expr::ClassDef(class) = &body[0] else {
        panic!("{:?}", body[0]);
    };
    assert_eq!(class.path.name, "Greeter");
    let defs: Vec<_> = class
        .body
        .iter()
        .filter_map(|e| match e {
            Expr::Def(d) => Some(d.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(defs.len(), 4);
    assert_eq!(defs[0].params.optional.len(), 1);
    assert_eq!(defs[0].params.rest.as_deref(), Some("rest"));
    assert!(defs[1].singleton);
    assert_eq!(defs[1].body.rescues[0].var.as_deref(), Some("e"));
    assert!(defs[1].body.ensure.is_some());
    assert_eq!(defs[2].name, "name=");
    assert_eq!(defs[3].name, "<=>");
}

#[test]
fn hashes_labels_and_multi_assign() {
    let body = parse_ok("h = {a: 1, 'b' => 2}\na, b = b, a\nfoo(k: 1, &blk)");
    assert!(matches!(&body[0], Expr::Assign(a) if matches!(&a.value, Expr::Hash(p) if p.len() == 2)));
    assert!(matches!(&body[1], Expr::MultiAssign(m) if m.targets.len() == 2));
    let Expr::Call(foo) = &body[2] else {
        panic!("{:?}", body[2]);
    };
    assert!(matches!(&foo.args[0], Expr::Hash(_)));
    assert!(matches!(&foo.block, Some(BlockArg::Pass(_))));
}

#[test]
fn case_ternary_ranges_and_modifiers() {
    let src = "case x\nwhen 1..3, 7 then :low\nelse :high\nend\ny = x > 1 ? 'a' : 'b'\nputs y if y\nputs y unless y";
    let body = parse_ok(src);
    assert!(matches!(&body[0], Expr::Case(c) if c.whens[0].patterns.len() == 2));
    assert!(matches!(&body[1], Expr::Assign(a) if matches!(a.value, Expr::If(_))));
    assert!(matches!(&body[2], Expr::If(_)));
    assert!(matches!(&body[3], Expr::If(i) if matches!(i.cond, Expr::Not(_))));
}

#[test]
fn lambdas_and_singleton_class() {
    let body = parse_ok("sq = ->(x) { x * x }\nclass << self\n  def hi; end\nend");
    assert!(matches!(&body[0], Expr::Assign(a) if matches!(&a.value, Expr::Lambda(l) if l.lambda)));
    assert!(matches!(&body[1], Expr::SClass(_)));
}
