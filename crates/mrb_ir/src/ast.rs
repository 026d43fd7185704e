//! Syntax tree of the Ruby subset.
//!
//! Everything is an expression. Method and block bodies are `Rc`-shared so the
//! runtime can hold them in method tables and procs without copying the tree.
use std::rc::Rc;

use mrb_syntax::Span;

/// A statement sequence; its value is the value of the last expression.
pub type Body = Box<[Expr]>;

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Nil,
    True,
    False,
    SelfRef,
    CurrentFile,
    Int(i64),
    Float(f64),
    Str(Box<[u8]>),
    /// Double-quoted string with interpolation.
    DStr(Box<[StrPart]>),
    Sym(String),
    DSym(Box<[StrPart]>),
    Array(Box<[Expr]>),
    Hash(Box<[(Expr, Expr)]>),
    Range(Box<RangeExpr>),

    LVar(String),
    IVar(String),
    GVar(String),
    Const(Box<ConstRef>),

    Assign(Box<AssignExpr>),
    OpAssign(Box<OpAssignExpr>),
    MultiAssign(Box<MultiAssignExpr>),

    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),

    Call(Box<CallExpr>),
    Super(Box<SuperExpr>),
    Yield(Box<[Expr]>),
    /// `*expr` in argument lists and array literals.
    Splat(Box<Expr>),
    Lambda(Rc<BlockDef>),

    If(Box<IfExpr>),
    While(Box<WhileExpr>),
    Case(Box<CaseExpr>),
    Begin(Box<BeginExpr>),
    Seq(Body),

    Def(Rc<MethodDef>),
    ClassDef(Box<ClassDef>),
    ModuleDef(Box<ModuleDef>),
    /// `class << target ... end`
    SClass(Box<SClassDef>),

    Return(Option<Box<Expr>>),
    Break(Option<Box<Expr>>, JumpTarget),
    Next(Option<Box<Expr>>, JumpTarget),
}

/// What a `break`/`next` leaves: the innermost loop or the innermost block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpTarget {
    Loop,
    Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StrPart {
    Lit(Box<[u8]>),
    Code(Body),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RangeExpr {
    pub lo: Expr,
    pub hi: Expr,
    pub exclusive: bool,
}

/// `Name`, `Outer::Name` or `::Name`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstRef {
    pub scope: Option<Expr>,
    pub top_level: bool,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    LVar(String),
    IVar(String),
    GVar(String),
    Const(ConstRef),
    Index { recv: Expr, args: Box<[Expr]> },
    Attr { recv: Expr, name: String },
    Splat(Box<Target>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignExpr {
    pub target: Target,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    /// `||=`
    Or,
    /// `&&=`
    And,
    /// `+=` and friends; holds the operator method name.
    Binary(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OpAssignExpr {
    pub target: Target,
    pub op: AssignOp,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultiAssignExpr {
    pub targets: Box<[Target]>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub recv: Option<Expr>,
    pub name: String,
    pub args: Box<[Expr]>,
    pub block: Option<BlockArg>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockArg {
    /// `{ |x| ... }` or `do |x| ... end`
    Literal(Rc<BlockDef>),
    /// `&expr`
    Pass(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SuperExpr {
    /// `None` for bare `super`, which forwards the current arguments.
    pub args: Option<Box<[Expr]>>,
    pub block: Option<BlockArg>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    pub required: Vec<String>,
    pub optional: Vec<(String, Expr)>,
    pub rest: Option<String>,
    pub post: Vec<String>,
    pub block: Option<String>,
}

impl Params {
    pub fn required_count(&self) -> usize {
        self.required.len() + self.post.len()
    }

    /// Whether more than one positional value is declared (enables auto-splat of one array).
    pub fn is_multi(&self) -> bool {
        self.required_count() + self.optional.len() > 1
            || (self.rest.is_some() && self.required_count() > 0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockDef {
    pub params: Params,
    pub body: Body,
    /// `->(x) { }` blocks get lambda argument and return semantics.
    pub lambda: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub name: String,
    /// `def self.name`
    pub singleton: bool,
    pub params: Params,
    pub body: BeginExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub path: ConstRef,
    pub superclass: Option<Expr>,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModuleDef {
    pub path: ConstRef,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SClassDef {
    pub target: Expr,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfExpr {
    pub cond: Expr,
    pub then_body: Body,
    pub else_body: Option<Body>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileExpr {
    pub cond: Expr,
    pub body: Body,
    /// `until` loops run while the condition is false.
    pub until: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseExpr {
    pub subject: Option<Expr>,
    pub whens: Box<[WhenClause]>,
    pub else_body: Option<Body>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhenClause {
    pub patterns: Box<[Expr]>,
    pub body: Body,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BeginExpr {
    pub body: Body,
    pub rescues: Box<[RescueClause]>,
    pub else_body: Option<Body>,
    pub ensure: Option<Body>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RescueClause {
    /// Empty means `StandardError`.
    pub classes: Box<[Expr]>,
    pub var: Option<String>,
    pub body: Body,
}
