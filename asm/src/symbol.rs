use indexmap::IndexMap;

use crate::ast::Pos;
use crate::error::{Diagnostics, Error, Warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Label,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: u32,
    pub defined: bool,
    pub kind: SymbolKind,
    /// Definition site, or the first reference while still undefined.
    pub pos: Pos,
    pub referenced: bool,
}

/// Labels and `.EQU` constants share one namespace.
/// Entries keep insertion order so reports come out in source order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable(IndexMap<String, Symbol>);

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable(IndexMap::new())
    }

    /// Define `name`. A second definition keeps the first value, warns about
    /// the shadowing and returns `DuplicateSymbol` for the caller to record.
    pub fn define(
        &mut self,
        name: &str,
        value: u32,
        kind: SymbolKind,
        pos: &Pos,
        diags: &mut Diagnostics,
    ) -> Result<(), Error> {
        if let Some(sym) = self.0.get_mut(name) {
            if sym.defined {
                diags.warn(
                    Warning::Redefined {
                        name: name.to_string(),
                        original: sym.pos.clone(),
                    },
                    pos,
                );
                return Err(Error::DuplicateSymbol {
                    name: name.to_string(),
                    original: sym.pos.clone(),
                });
            }
            sym.value = value;
            sym.defined = true;
            sym.kind = kind;
            sym.pos = pos.clone();
            return Ok(());
        }

        self.0.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                value,
                defined: true,
                kind,
                pos: pos.clone(),
                referenced: false,
            },
        );
        Ok(())
    }

    /// Record a use of `name`, creating an undefined placeholder for forward
    /// references.
    pub fn reference(&mut self, name: &str, pos: &Pos) -> &Symbol {
        let sym = self.0.entry(name.to_string()).or_insert_with(|| Symbol {
            name: name.to_string(),
            value: 0,
            defined: false,
            kind: SymbolKind::Label,
            pos: pos.clone(),
            referenced: false,
        });
        sym.referenced = true;
        sym
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.0.get(name)
    }

    /// Value of a defined symbol.
    pub fn value(&self, name: &str) -> Option<u32> {
        self.0
            .get(name)
            .filter(|sym| sym.defined)
            .map(|sym| sym.value)
    }

    pub fn all_undefined(&self) -> Vec<&Symbol> {
        self.0.values().filter(|sym| !sym.defined).collect()
    }

    pub fn unused_labels(&self) -> Vec<&Symbol> {
        self.0
            .values()
            .filter(|sym| sym.defined && sym.kind == SymbolKind::Label && !sym.referenced)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
