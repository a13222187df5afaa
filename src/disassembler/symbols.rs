use std::collections::BTreeMap;

use crate::{Error, Result};

/// Names for the symbol indexes referenced by `sym` operands, e.g. a constant pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<u64, String>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Names `index`, replacing an earlier name. Returns the replaced name.
    pub fn insert(&mut self, index: u64, name: impl Into<String>) -> Option<String> {
        self.symbols.insert(index, name.into())
    }

    /// Returns the name of `index`.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<&str> {
        self.symbols.get(&index).map(String::as_str)
    }

    /// Returns the name of `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownSymbol`] if `index` has no name.
    pub fn resolve(&self, index: u64) -> Result<&str> {
        self.get(index).ok_or(Error::UnknownSymbol(index))
    }

    /// Number of named symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if no symbol is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u64, S)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (u64, S)>>(iter: I) -> Self {
        SymbolTable {
            symbols: iter
                .into_iter()
                .map(|(index, name)| (index, name.into()))
                .collect(),
        }
    }
}
