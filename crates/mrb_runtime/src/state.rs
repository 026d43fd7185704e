//! Interpreter state.
//!
//! All methods take `&self`: native callbacks receive the state while a call
//! is in progress and may re-enter it, so mutable parts live in cells.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use mrb_syntax::SourceText;

use crate::core::class::RClass;
use crate::core::env::{Cref, Env, Frame};
use crate::core::symbol::SymbolTable;
use crate::core::{
    Aspec, BuiltinFn, ClassId, ClassKind, FastHashMap, Method, NativeFn, ProcBody, RHash,
    RObject, RProc, Sym, TopLevel, Value, fast_map_new,
};
use crate::errors::{SyntaxError, Unwind, messages};

/// Nested calls deeper than this raise `SystemStackError`.
const MAX_CALL_DEPTH: u32 = 256;

static NEXT_STATE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u64);

impl StateId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for compiling one script.
#[derive(Clone, Debug)]
pub struct CompileContext {
    pub filename: String,
    /// When false, syntax errors are also written to stderr.
    pub capture_errors: bool,
    /// Compile only; `load_string` returns the script proc.
    pub no_exec: bool,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self {
            filename: "(mrb)".to_string(),
            capture_errors: true,
            no_exec: false,
        }
    }
}

/// The native call in progress.
#[derive(Clone, Debug)]
pub struct CallInfo {
    /// Class the host method was defined in.
    pub target_class: ClassId,
    pub mid: Sym,
    pub args: Vec<Value>,
    pub block: Option<Value>,
}

/// Ids of the builtin classes and modules.
#[derive(Clone, Debug)]
pub struct CoreClasses {
    pub object: ClassId,
    pub module: ClassId,
    pub class: ClassId,
    pub kernel: ClassId,
    pub comparable: ClassId,
    pub enumerable: ClassId,
    pub math: ClassId,
    pub nil: ClassId,
    pub true_class: ClassId,
    pub false_class: ClassId,
    pub numeric: ClassId,
    pub integer: ClassId,
    pub float: ClassId,
    pub string: ClassId,
    pub symbol: ClassId,
    pub array: ClassId,
    pub hash: ClassId,
    pub range: ClassId,
    pub proc_class: ClassId,
    pub exception: ClassId,
    pub script_error: ClassId,
    pub syntax_error: ClassId,
    pub not_implemented_error: ClassId,
    pub standard_error: ClassId,
    pub runtime_error: ClassId,
    pub frozen_error: ClassId,
    pub argument_error: ClassId,
    pub type_error: ClassId,
    pub name_error: ClassId,
    pub no_method_error: ClassId,
    pub zero_division_error: ClassId,
    pub index_error: ClassId,
    pub key_error: ClassId,
    pub stop_iteration: ClassId,
    pub range_error: ClassId,
    pub float_domain_error: ClassId,
    pub local_jump_error: ClassId,
    pub system_stack_error: ClassId,
}

pub struct State {
    id: StateId,
    syms: SymbolTable,
    classes: RefCell<Vec<RClass>>,
    globals: RefCell<FastHashMap<Sym, Value>>,
    exc: RefCell<Option<Value>>,
    calls: RefCell<Vec<CallInfo>>,
    ud: RefCell<Option<Weak<dyn Any>>>,
    out: RefCell<Vec<u8>>,
    capture_output: Cell<bool>,
    next_tag: Cell<u64>,
    depth: Cell<u32>,
    file: RefCell<String>,
    main: Value,
    core: CoreClasses,
    /// Ivar slot holding an exception's message.
    pub(crate) mesg: Sym,
}

fn add_class(
    arena: &mut Vec<RClass>,
    name: &str,
    kind: ClassKind,
    superclass: Option<ClassId>,
) -> ClassId {
    let id = ClassId(arena.len() as u32);
    arena.push(RClass::new(Some(name.to_string()), kind, superclass));
    id
}

impl State {
    pub fn open() -> State {
        let syms = SymbolTable::new();
        let mut arena = Vec::new();
        let object = add_class(&mut arena, "Object", ClassKind::Class, None);
        fn class(arena: &mut Vec<RClass>, name: &str, sup: ClassId) -> ClassId {
            add_class(arena, name, ClassKind::Class, Some(sup))
        }
        let module = class(&mut arena, "Module", object);
        let class_class = class(&mut arena, "Class", module);
        let kernel = add_class(&mut arena, "Kernel", ClassKind::Module, None);
        let comparable = add_class(&mut arena, "Comparable", ClassKind::Module, None);
        let enumerable = add_class(&mut arena, "Enumerable", ClassKind::Module, None);
        let math = add_class(&mut arena, "Math", ClassKind::Module, None);
        let nil = class(&mut arena, "NilClass", object);
        let true_class = class(&mut arena, "TrueClass", object);
        let false_class = class(&mut arena, "FalseClass", object);
        let numeric = class(&mut arena, "Numeric", object);
        let integer = class(&mut arena, "Integer", numeric);
        let float = class(&mut arena, "Float", numeric);
        let string = class(&mut arena, "String", object);
        let symbol = class(&mut arena, "Symbol", object);
        let array = class(&mut arena, "Array", object);
        let hash = class(&mut arena, "Hash", object);
        let range = class(&mut arena, "Range", object);
        let proc_class = class(&mut arena, "Proc", object);
        let exception = class(&mut arena, "Exception", object);
        let script_error = class(&mut arena, "ScriptError", exception);
        let syntax_error = class(&mut arena, "SyntaxError", script_error);
        let not_implemented_error = class(&mut arena, "NotImplementedError", script_error);
        let standard_error = class(&mut arena, "StandardError", exception);
        let runtime_error = class(&mut arena, "RuntimeError", standard_error);
        let frozen_error = class(&mut arena, "FrozenError", runtime_error);
        let argument_error = class(&mut arena, "ArgumentError", standard_error);
        let type_error = class(&mut arena, "TypeError", standard_error);
        let name_error = class(&mut arena, "NameError", standard_error);
        let no_method_error = class(&mut arena, "NoMethodError", name_error);
        let zero_division_error = class(&mut arena, "ZeroDivisionError", standard_error);
        let index_error = class(&mut arena, "IndexError", standard_error);
        let key_error = class(&mut arena, "KeyError", index_error);
        let stop_iteration = class(&mut arena, "StopIteration", index_error);
        let range_error = class(&mut arena, "RangeError", standard_error);
        let float_domain_error = class(&mut arena, "FloatDomainError", range_error);
        let local_jump_error = class(&mut arena, "LocalJumpError", standard_error);
        let system_stack_error = class(&mut arena, "SystemStackError", exception);

        arena[object.0 as usize].includes.push(kernel);
        arena[numeric.0 as usize].includes.push(comparable);
        arena[string.0 as usize].includes.push(comparable);
        for id in [array, hash, range] {
            arena[id.0 as usize].includes.push(enumerable);
        }
        for i in 0..arena.len() {
            let Some(name) = arena[i].name.clone() else {
                continue;
            };
            let id = ClassId(i as u32);
            let value = match arena[i].kind {
                ClassKind::Module => Value::Module(id),
                _ => Value::Class(id),
            };
            arena[object.0 as usize]
                .consts
                .insert(syms.intern(&name), value);
        }

        let mesg = syms.intern("mesg");
        let state = State {
            id: StateId(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed)),
            syms,
            classes: RefCell::new(arena),
            globals: RefCell::new(fast_map_new()),
            exc: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
            ud: RefCell::new(None),
            out: RefCell::new(Vec::new()),
            capture_output: Cell::new(false),
            next_tag: Cell::new(1),
            depth: Cell::new(0),
            file: RefCell::new(String::new()),
            main: Value::Object(Rc::new(RObject::new(object))),
            core: CoreClasses {
                object,
                module,
                class: class_class,
                kernel,
                comparable,
                enumerable,
                math,
                nil,
                true_class,
                false_class,
                numeric,
                integer,
                float,
                string,
                symbol,
                array,
                hash,
                range,
                proc_class,
                exception,
                script_error,
                syntax_error,
                not_implemented_error,
                standard_error,
                runtime_error,
                frozen_error,
                argument_error,
                type_error,
                name_error,
                no_method_error,
                zero_division_error,
                index_error,
                key_error,
                stop_iteration,
                range_error,
                float_domain_error,
                local_jump_error,
                system_stack_error,
            },
            mesg,
        };
        crate::builtins::install(&state);
        state
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn core(&self) -> &CoreClasses {
        &self.core
    }

    pub fn main(&self) -> &Value {
        &self.main
    }

    /// Attaches host data; the state keeps only a weak reference.
    pub fn set_ud(&self, ud: Weak<dyn Any>) {
        *self.ud.borrow_mut() = Some(ud);
    }

    pub fn ud(&self) -> Option<Rc<dyn Any>> {
        self.ud.borrow().as_ref().and_then(Weak::upgrade)
    }

    // ---------------------------------------------------------------------
    // Compiling and running
    // ---------------------------------------------------------------------

    pub fn parse(&self, code: &str, cc: &CompileContext) -> Result<Rc<RProc>, SyntaxError> {
        let result = mrb_parser::parse_program(code);
        if let Some(d) = result.first_error() {
            let source = SourceText::new(code);
            let line = d.span.map_or(1, |s| source.line_of(s.start.0));
            return Err(SyntaxError {
                line,
                message: d.message.clone(),
            });
        }
        Ok(Rc::new(RProc::internal(ProcBody::Top(Rc::new(TopLevel {
            program: result.program,
            filename: cc.filename.clone(),
        })))))
    }

    /// Compiles and runs `code`. Exceptions, including syntax errors, end up
    /// in the exception slot and the result is nil.
    pub fn load_string(&self, code: &str, cc: &CompileContext) -> Value {
        match self.parse(code, cc) {
            Ok(p) if cc.no_exec => Value::Proc(p),
            Ok(p) => self.run_proc(&Value::Proc(p)),
            Err(e) => {
                let msg = format!("{}:{}: {}", cc.filename, e.line, e.message);
                if !cc.capture_errors {
                    let _ = writeln!(std::io::stderr(), "{msg}");
                }
                self.raise(self.core.syntax_error, &msg);
                Value::Nil
            }
        }
    }

    /// Runs a script or block proc with no arguments.
    pub fn run_proc(&self, p: &Value) -> Value {
        let Value::Proc(rp) = p else {
            self.raise(self.core.type_error, messages::NOT_A_PROC);
            return Value::Nil;
        };
        let r = match &rp.body {
            ProcBody::Top(top) => self.run_top(top),
            _ => self.call_proc(rp, &[], None, None),
        };
        self.settle(r)
    }

    fn run_top(&self, top: &TopLevel) -> Result<Value, Unwind> {
        let saved_file = self.file.replace(top.filename.clone());
        let tag = self.fresh_tag();
        let frame = Frame {
            self_val: self.main.clone(),
            env: Env::new(None),
            def_target: self.core.object,
            cref: Rc::new(Cref {
                class: self.core.object,
                parent: None,
            }),
            method: None,
            block: None,
            return_tag: tag,
            break_tag: 0,
        };
        let r = self.eval_body(&top.program.body, &frame);
        *self.file.borrow_mut() = saved_file;
        match r {
            Err(Unwind::Return(v, t)) if t == tag => Ok(v),
            other => other,
        }
    }

    /// Converts an escaped unwind into the exception slot.
    pub(crate) fn settle(&self, r: Result<Value, Unwind>) -> Value {
        match r {
            Ok(v) => v,
            Err(Unwind::Raise(e)) => {
                *self.exc.borrow_mut() = Some(e);
                Value::Nil
            }
            Err(Unwind::Return(v, _)) => v,
            Err(Unwind::Next(_)) | Err(Unwind::LoopNext) => {
                self.raise(self.core.local_jump_error, messages::UNEXPECTED_NEXT);
                Value::Nil
            }
            Err(Unwind::Break(..)) | Err(Unwind::LoopBreak(_)) => {
                self.raise(self.core.local_jump_error, messages::BREAK_FROM_PROC);
                Value::Nil
            }
        }
    }

    /// Calls a method by name. A raised exception is left in the slot and
    /// the result is nil.
    pub fn funcall(&self, recv: &Value, name: &str, args: &[Value]) -> Value {
        let mid = self.intern(name);
        let r = self.call_method(recv, mid, args, None);
        self.settle(r)
    }

    pub(crate) fn current_file(&self) -> String {
        self.file.borrow().clone()
    }

    // ---------------------------------------------------------------------
    // Exception slot
    // ---------------------------------------------------------------------

    pub fn exc(&self) -> Option<Value> {
        self.exc.borrow().clone()
    }

    pub fn clear_exc(&self) {
        *self.exc.borrow_mut() = None;
    }

    pub(crate) fn replace_exc(&self, e: Option<Value>) -> Option<Value> {
        self.exc.replace(e)
    }

    /// Sets the exception slot to a new `class` exception.
    pub fn raise(&self, class: ClassId, msg: &str) {
        let e = self.make_exception(class, msg);
        *self.exc.borrow_mut() = Some(e);
    }

    /// Message of an exception, via its `message` method.
    pub fn exc_message(&self, e: &Value) -> String {
        let saved = self.exc.borrow().clone();
        let r = self.call_method(e, self.intern("message"), &[], None);
        *self.exc.borrow_mut() = saved;
        match r {
            Ok(Value::Str(s)) => s.to_string_lossy(),
            _ => match e {
                Value::Exception(o) => match o.ivars.borrow().get(&self.mesg) {
                    Some(Value::Str(s)) => s.to_string_lossy(),
                    _ => self.obj_classname(e),
                },
                other => String::from_utf8_lossy(&self.to_s(other)).into_owned(),
            },
        }
    }

    pub(crate) fn make_exception(&self, class: ClassId, msg: &str) -> Value {
        let obj = RObject::new(class);
        obj.ivars.borrow_mut().insert(self.mesg, Value::str(msg));
        Value::Exception(Rc::new(obj))
    }

    pub(crate) fn error(&self, class: ClassId, msg: impl AsRef<str>) -> Unwind {
        Unwind::Raise(self.make_exception(class, msg.as_ref()))
    }

    pub(crate) fn arg_error(&self, msg: impl AsRef<str>) -> Unwind {
        self.error(self.core.argument_error, msg)
    }

    pub(crate) fn type_error(&self, msg: impl AsRef<str>) -> Unwind {
        self.error(self.core.type_error, msg)
    }

    // ---------------------------------------------------------------------
    // Symbols
    // ---------------------------------------------------------------------

    pub fn intern(&self, name: &str) -> Sym {
        self.syms.intern(name)
    }

    pub fn sym_name(&self, sym: Sym) -> String {
        self.syms.name(sym)
    }

    // ---------------------------------------------------------------------
    // Class arena
    // ---------------------------------------------------------------------

    pub(crate) fn with_class<T>(&self, id: ClassId, f: impl FnOnce(&RClass) -> T) -> T {
        f(&self.classes.borrow()[id.0 as usize])
    }

    pub(crate) fn with_class_mut<T>(&self, id: ClassId, f: impl FnOnce(&mut RClass) -> T) -> T {
        f(&mut self.classes.borrow_mut()[id.0 as usize])
    }

    pub(crate) fn new_class(
        &self,
        name: Option<String>,
        kind: ClassKind,
        superclass: Option<ClassId>,
    ) -> ClassId {
        let mut arena = self.classes.borrow_mut();
        let id = ClassId(arena.len() as u32);
        arena.push(RClass::new(name, kind, superclass));
        id
    }

    pub fn object_class(&self) -> ClassId {
        self.core.object
    }

    pub fn class_kind(&self, id: ClassId) -> ClassKind {
        self.with_class(id, |c| c.kind)
    }

    pub fn superclass(&self, id: ClassId) -> Option<ClassId> {
        self.with_class(id, |c| c.superclass)
    }

    pub fn class_name(&self, id: ClassId) -> String {
        let (name, attached) = self.with_class(id, |c| (c.name.clone(), c.attached.clone()));
        match (name, attached) {
            (Some(n), _) => n,
            (None, Some(v)) => format!("#<Class:{}>", self.inspect(&v)),
            (None, None) => format!("#<Class:{}>", id.0),
        }
    }

    pub fn obj_classname(&self, v: &Value) -> String {
        self.class_name(self.real_class_of(v))
    }

    pub fn class_of(&self, v: &Value) -> ClassId {
        let c = &self.core;
        match v {
            Value::Nil => c.nil,
            Value::Bool(true) => c.true_class,
            Value::Bool(false) => c.false_class,
            Value::Int(_) => c.integer,
            Value::Float(_) => c.float,
            Value::Sym(_) => c.symbol,
            Value::Str(_) => c.string,
            Value::Array(_) => c.array,
            Value::Hash(_) => c.hash,
            Value::Range(_) => c.range,
            Value::Proc(_) => c.proc_class,
            Value::Object(o) | Value::Exception(o) => o.class(),
            Value::Class(id) | Value::Module(id) => self.ensure_meta(*id),
        }
    }

    /// Class of `v` skipping singleton classes.
    pub fn real_class_of(&self, v: &Value) -> ClassId {
        match v {
            Value::Class(_) => self.core.class,
            Value::Module(_) => self.core.module,
            _ => {
                let mut id = self.class_of(v);
                while self.class_kind(id) == ClassKind::Singleton {
                    match self.superclass(id) {
                        Some(s) => id = s,
                        None => break,
                    }
                }
                id
            }
        }
    }

    /// Singleton class of a class or module, created on first use.
    pub(crate) fn ensure_meta(&self, id: ClassId) -> ClassId {
        let (meta, kind, superclass) = self.with_class(id, |c| (c.meta, c.kind, c.superclass));
        if let Some(m) = meta {
            return m;
        }
        let meta_super = match (kind, superclass) {
            (ClassKind::Module, _) => self.core.module,
            (_, Some(s)) => self.ensure_meta(s),
            (_, None) => self.core.class,
        };
        let meta = self.new_class(None, ClassKind::Singleton, Some(meta_super));
        let attached = match kind {
            ClassKind::Module => Value::Module(id),
            _ => Value::Class(id),
        };
        self.with_class_mut(meta, |c| c.attached = Some(attached));
        self.with_class_mut(id, |c| c.meta = Some(meta));
        meta
    }

    /// Singleton class of a class, module or object; `None` for immediates
    /// and builtin value types.
    pub fn singleton_class(&self, v: &Value) -> Option<ClassId> {
        match v {
            Value::Class(id) | Value::Module(id) => Some(self.ensure_meta(*id)),
            Value::Object(o) | Value::Exception(o) => {
                let cur = o.class();
                if self.class_kind(cur) == ClassKind::Singleton {
                    return Some(cur);
                }
                let meta = self.new_class(None, ClassKind::Singleton, Some(cur));
                self.with_class_mut(meta, |c| c.attached = Some(v.clone()));
                o.class.set(meta);
                Some(meta)
            }
            _ => None,
        }
    }

    /// Method resolution order of `id`.
    pub fn ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            out.push(c);
            self.push_includes(c, &mut out);
            cur = self.superclass(c);
        }
        out
    }

    fn push_includes(&self, id: ClassId, out: &mut Vec<ClassId>) {
        let includes = self.with_class(id, |c| c.includes.clone());
        for m in includes.into_iter().rev() {
            if !out.contains(&m) {
                out.push(m);
                self.push_includes(m, out);
            }
        }
    }

    pub(crate) fn find_method(&self, id: ClassId, mid: Sym) -> Option<(ClassId, Method)> {
        self.ancestors(id).into_iter().find_map(|c| {
            self.with_class(c, |k| k.methods.get(&mid).cloned())
                .map(|m| (c, m))
        })
    }

    pub(crate) fn add_method(&self, class: ClassId, mid: Sym, m: Method) {
        self.with_class_mut(class, |c| {
            c.methods.insert(mid, m);
        });
    }

    pub(crate) fn define_builtin(&self, class: ClassId, name: &str, f: BuiltinFn) {
        let mid = self.intern(name);
        self.add_method(class, mid, Method::Builtin(f));
    }

    pub(crate) fn define_class_builtin(&self, class: ClassId, name: &str, f: BuiltinFn) {
        let meta = self.ensure_meta(class);
        self.define_builtin(meta, name, f);
    }

    /// Registers a host method on `class`.
    pub fn define_method(&self, class: ClassId, mid: Sym, f: NativeFn, aspec: Aspec) {
        self.add_method(
            class,
            mid,
            Method::Native {
                fun: f,
                aspec,
                class,
                mid,
            },
        );
    }

    pub fn is_subclass(&self, id: ClassId, of: ClassId) -> bool {
        self.ancestors(id).contains(&of)
    }

    pub fn is_a(&self, v: &Value, class: ClassId) -> bool {
        self.is_subclass(self.class_of(v), class)
    }

    pub(crate) fn include_module(&self, class: ClassId, module: ClassId) {
        self.with_class_mut(class, |c| {
            if !c.includes.contains(&module) {
                c.includes.push(module);
            }
        });
    }

    // ---------------------------------------------------------------------
    // Constants and class definition
    // ---------------------------------------------------------------------

    pub(crate) fn const_get_own(&self, class: ClassId, name: Sym) -> Option<Value> {
        self.with_class(class, |c| c.consts.get(&name).cloned())
    }

    pub(crate) fn const_set(&self, class: ClassId, name: Sym, v: Value) {
        self.with_class_mut(class, |c| {
            c.consts.insert(name, v);
        });
    }

    /// Constant in `class` or its superclasses.
    pub(crate) fn const_get_inherited(&self, class: ClassId, name: Sym) -> Option<Value> {
        let mut cur = Some(class);
        while let Some(c) = cur {
            if let Some(v) = self.const_get_own(c, name) {
                return Some(v);
            }
            cur = self.superclass(c);
        }
        None
    }

    pub fn define_global_const(&self, name: &str, v: Value) {
        let sym = self.intern(name);
        self.const_set(self.core.object, sym, v);
    }

    fn child_name(&self, outer: ClassId, name: &str) -> String {
        if outer == self.core.object {
            name.to_string()
        } else {
            format!("{}::{}", self.class_name(outer), name)
        }
    }

    /// Defines or reopens class `name` in `outer`. `superclass` of `None`
    /// reopens as is or creates a subclass of Object.
    pub fn define_class_under(
        &self,
        outer: ClassId,
        name: &str,
        superclass: Option<ClassId>,
    ) -> Result<ClassId, String> {
        let sym = self.intern(name);
        match self.const_get_own(outer, sym) {
            Some(Value::Class(id)) => {
                if let Some(sup) = superclass {
                    if self.superclass(id) != Some(sup) {
                        return Err(format!("superclass mismatch for class {name}"));
                    }
                }
                Ok(id)
            }
            Some(_) => Err(format!("{name} is not a class")),
            None => {
                let sup = superclass.unwrap_or(self.core.object);
                let id = self.new_class(Some(self.child_name(outer, name)), ClassKind::Class, Some(sup));
                self.const_set(outer, sym, Value::Class(id));
                Ok(id)
            }
        }
    }

    pub fn define_module_under(&self, outer: ClassId, name: &str) -> Result<ClassId, String> {
        let sym = self.intern(name);
        match self.const_get_own(outer, sym) {
            Some(Value::Module(id)) => Ok(id),
            Some(_) => Err(format!("{name} is not a module")),
            None => {
                let id = self.new_class(Some(self.child_name(outer, name)), ClassKind::Module, None);
                self.const_set(outer, sym, Value::Module(id));
                Ok(id)
            }
        }
    }

    /// Class constant visible from `outer`; never raises.
    pub fn class_get_under(&self, outer: ClassId, name: &str) -> Option<ClassId> {
        let sym = self.syms.lookup(name)?;
        match self.const_get_inherited(outer, sym) {
            Some(Value::Class(id)) => Some(id),
            _ => None,
        }
    }

    /// Module constant visible from `outer`; never raises.
    pub fn module_get_under(&self, outer: ClassId, name: &str) -> Option<ClassId> {
        let sym = self.syms.lookup(name)?;
        match self.const_get_inherited(outer, sym) {
            Some(Value::Module(id)) => Some(id),
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    pub fn str_new(&self, bytes: &[u8]) -> Value {
        Value::str(bytes.to_vec())
    }

    pub fn ary_new(&self, items: Vec<Value>) -> Value {
        Value::array(items)
    }

    pub fn ary_push(&self, ary: &Value, v: Value) {
        if let Value::Array(a) = ary {
            a.push(v);
        }
    }

    pub fn hash_new(&self) -> Value {
        Value::Hash(Rc::new(RHash::default()))
    }

    pub fn hash_set(&self, hash: &Value, key: Value, v: Value) {
        if let Value::Hash(h) = hash {
            h.insert(key, v);
        }
    }

    pub fn str_bytes(&self, v: &Value) -> Option<Vec<u8>> {
        v.as_bytes()
    }

    pub fn ary_entries(&self, v: &Value) -> Option<Vec<Value>> {
        match v {
            Value::Array(a) => Some(a.to_vec()),
            _ => None,
        }
    }

    pub fn hash_entries(&self, v: &Value) -> Option<Vec<(Value, Value)>> {
        match v {
            Value::Hash(h) => Some(h.entries()),
            _ => None,
        }
    }

    pub fn hash_keys(&self, v: &Value) -> Option<Vec<Value>> {
        match v {
            Value::Hash(h) => Some(h.keys()),
            _ => None,
        }
    }

    /// `inspect` rendering; exceptions raised by user `inspect` methods are
    /// swallowed.
    pub fn inspect(&self, v: &Value) -> String {
        let saved = self.exc.borrow().clone();
        let out = self
            .inspect_value(v)
            .unwrap_or_else(|_| format!("#<{}>", self.obj_classname(v)));
        *self.exc.borrow_mut() = saved;
        out
    }

    /// `to_s` rendering; exceptions raised by user `to_s` methods are
    /// swallowed.
    pub fn to_s(&self, v: &Value) -> Vec<u8> {
        self.to_s_value(v)
            .unwrap_or_else(|_| format!("#<{}>", self.obj_classname(v)).into_bytes())
    }

    pub(crate) fn gvar_get(&self, name: Sym) -> Value {
        self.globals.borrow().get(&name).cloned().unwrap_or(Value::Nil)
    }

    pub(crate) fn gvar_set(&self, name: Sym, v: Value) {
        self.globals.borrow_mut().insert(name, v);
    }

    // ---------------------------------------------------------------------
    // Native calls
    // ---------------------------------------------------------------------

    pub fn current_call(&self) -> Option<CallInfo> {
        self.calls.borrow().last().cloned()
    }

    pub fn get_args(&self) -> Vec<Value> {
        self.calls
            .borrow()
            .last()
            .map(|c| c.args.clone())
            .unwrap_or_default()
    }

    pub fn get_block(&self) -> Option<Value> {
        self.calls.borrow().last().and_then(|c| c.block.clone())
    }

    pub(crate) fn push_call(&self, info: CallInfo) {
        self.calls.borrow_mut().push(info);
    }

    pub(crate) fn pop_call(&self) {
        self.calls.borrow_mut().pop();
    }

    // ---------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------

    pub fn set_capture_output(&self, on: bool) {
        self.capture_output.set(on);
    }

    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.out.borrow_mut())
    }

    pub(crate) fn write_out(&self, bytes: &[u8]) {
        if self.capture_output.get() {
            self.out.borrow_mut().extend_from_slice(bytes);
        } else {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(bytes);
            let _ = stdout.flush();
        }
    }

    // ---------------------------------------------------------------------
    // Evaluation bookkeeping
    // ---------------------------------------------------------------------

    pub(crate) fn fresh_tag(&self) -> u64 {
        let t = self.next_tag.get();
        self.next_tag.set(t + 1);
        t
    }

    pub(crate) fn enter(&self) -> Result<(), Unwind> {
        let d = self.depth.get();
        if d >= MAX_CALL_DEPTH {
            return Err(self.error(self.core.system_stack_error, messages::STACK_TOO_DEEP));
        }
        self.depth.set(d + 1);
        Ok(())
    }

    pub(crate) fn leave(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl Drop for State {
    fn drop(&mut self) {
        // Constants and globals hold most reference cycles.
        let classes = std::mem::take(&mut *self.classes.borrow_mut());
        drop(classes);
        self.globals.borrow_mut().clear();
        *self.exc.borrow_mut() = None;
    }
}
