//! Symbol interning.
//!
//! Symbols are identity-bearing name tokens: interning the same name twice
//! yields the same identity, and [`SymbolTable::fresh`] yields an identity
//! equal to nothing else, not even another fresh symbol. The table is owned
//! by the interpreter's [`Environment`](crate::evaluator::Environment) and
//! passed by reference to the reader and evaluator; it only grows.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Debug)]
struct SymbolData {
    name: String,
    id: u64,
}

/// An interned, identity-comparable name token.
///
/// Cloning is cheap (shared payload). Equality and hashing use the numeric
/// identity assigned by the table, never the textual name.
#[derive(Clone, Debug)]
pub struct Symbol(Rc<SymbolData>);

impl Symbol {
    /// The display form of the symbol: the original name it was interned
    /// under, or `<SYMBOL:n>` for fresh symbols.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The interner: maps textual names to unique symbol identities.
#[derive(Debug, Default)]
pub struct SymbolTable {
    interned: HashMap<String, Symbol>,
    count: u64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the same identity for the same name.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.interned.get(name) {
            return symbol.clone();
        }
        self.count += 1;
        let symbol = Symbol(Rc::new(SymbolData {
            name: name.to_owned(),
            id: self.count,
        }));
        self.interned.insert(name.to_owned(), symbol.clone());
        symbol
    }

    /// A new anonymous symbol, distinct from every interned and every
    /// previously fresh symbol. Used by `fresh-symbol` for macro-hygiene
    /// workarounds and generated names.
    pub fn fresh(&mut self) -> Symbol {
        self.count += 1;
        Symbol(Rc::new(SymbolData {
            name: format!("<SYMBOL:{}>", self.count),
            id: self.count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let a1 = table.intern("a");
        let a2 = table.intern("a");
        let b = table.intern("b");

        assert_eq!(a1, a2);
        assert_eq!(a1.id(), a2.id());
        assert_ne!(a1, b);
        assert_eq!(a1.name(), "a");
        assert_eq!(format!("{b}"), "b");
    }

    #[test]
    fn test_fresh_symbols_are_unique() {
        let mut table = SymbolTable::new();
        let interned = table.intern("x");
        let f1 = table.fresh();
        let f2 = table.fresh();

        assert_ne!(f1, f2);
        assert_ne!(f1, interned);
        assert_ne!(f2, interned);

        // Fresh symbols are never reachable through intern, even when a
        // name collides with their display form.
        let lookalike = table.intern(f1.name());
        assert_ne!(lookalike, f1);
    }

    #[test]
    fn test_symbols_hash_by_identity() {
        use std::collections::HashMap;

        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let mut map = HashMap::new();
        map.insert(a.clone(), 1);
        map.insert(table.intern("a"), 2);

        assert_eq!(map.len(), 1);
        assert_eq!(map[&a], 2);
    }
}
