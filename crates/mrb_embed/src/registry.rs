//! Process-wide table of host methods.
//!
//! Entries are keyed by context, receiver class and method symbol. The
//! engine only knows that a method is host-defined; `trampoline` looks the
//! function up here on every call.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use mrb_runtime::{ClassId, StateId, Sym};

use crate::context::Context;
use crate::error::Result;
use crate::value::Value;

/// A host function callable from scripts.
pub trait NativeFunction: Send + Sync + 'static {
    fn call<'c>(&self, ctx: &'c Context, this: Value<'c>) -> Result<Value<'c>>;
}

impl<F> NativeFunction for F
where
    F: for<'c> Fn(&'c Context, Value<'c>) -> Result<Value<'c>> + Send + Sync + 'static,
{
    fn call<'c>(&self, ctx: &'c Context, this: Value<'c>) -> Result<Value<'c>> {
        self(ctx, this)
    }
}

type MethodTable = HashMap<ClassId, HashMap<Sym, Arc<dyn NativeFunction>>>;

#[derive(Default)]
pub struct MethodRegistry {
    contexts: Mutex<HashMap<StateId, MethodTable>>,
}

static REGISTRY: LazyLock<MethodRegistry> = LazyLock::new(MethodRegistry::default);

pub fn global() -> &'static MethodRegistry {
    &REGISTRY
}

impl MethodRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<StateId, MethodTable>> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach(&self, ctx: StateId) {
        self.lock().entry(ctx).or_default();
    }

    /// Drops every entry of `ctx`.
    pub fn detach(&self, ctx: StateId) {
        self.lock().remove(&ctx);
    }

    pub fn is_attached(&self, ctx: StateId) -> bool {
        self.lock().contains_key(&ctx)
    }

    /// Adds or replaces the function for `(ctx, class, sym)`.
    pub fn register(&self, ctx: StateId, class: ClassId, sym: Sym, f: Arc<dyn NativeFunction>) {
        self.lock()
            .entry(ctx)
            .or_default()
            .entry(class)
            .or_default()
            .insert(sym, f);
    }

    pub fn resolve(&self, ctx: StateId, class: ClassId, sym: Sym) -> Option<Arc<dyn NativeFunction>> {
        self.lock().get(&ctx)?.get(&class)?.get(&sym).cloned()
    }

    /// Number of functions registered for `ctx`.
    pub fn count(&self, ctx: StateId) -> usize {
        self.lock()
            .get(&ctx)
            .map_or(0, |classes| classes.values().map(HashMap::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrb_runtime::State;

    fn noop<'c>(ctx: &'c Context, _this: Value<'c>) -> Result<Value<'c>> {
        Ok(ctx.nil())
    }

    #[test]
    fn resolve_misses_on_every_level() {
        let registry = MethodRegistry::default();
        let state = State::open();
        let id = state.id();
        let class = state.object_class();
        let sym = state.intern("x");
        assert!(registry.resolve(id, class, sym).is_none());
        registry.attach(id);
        assert!(registry.resolve(id, class, sym).is_none());
        registry.register(id, class, state.intern("y"), Arc::new(noop));
        assert!(registry.resolve(id, class, sym).is_none());
        registry.register(id, class, sym, Arc::new(noop));
        assert!(registry.resolve(id, class, sym).is_some());
        assert_eq!(registry.count(id), 2);
        registry.detach(id);
        assert!(!registry.is_attached(id));
        assert_eq!(registry.count(id), 0);
    }
}
