//! Symbol interning.

use std::cell::RefCell;

use indexmap::IndexSet;

use super::value::{Sym, fast_hasher};

pub struct SymbolTable {
    names: RefCell<IndexSet<String, ahash::RandomState>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            names: RefCell::new(IndexSet::with_hasher(fast_hasher())),
        }
    }

    pub fn intern(&self, name: &str) -> Sym {
        let mut names = self.names.borrow_mut();
        if let Some(i) = names.get_index_of(name) {
            return Sym(i as u32);
        }
        let (i, _) = names.insert_full(name.to_string());
        Sym(i as u32)
    }

    pub fn lookup(&self, name: &str) -> Option<Sym> {
        self.names.borrow().get_index_of(name).map(|i| Sym(i as u32))
    }

    pub fn name(&self, sym: Sym) -> String {
        self.names
            .borrow()
            .get_index(sym.0 as usize)
            .cloned()
            .unwrap_or_default()
    }
}
