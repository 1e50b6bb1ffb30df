//! Symbol ↔ id mapping.
//!
//! Ids are dense, assigned to the distinct corpus tokens in lexicographic
//! order of their text, so the same corpus always yields the same mapping.
//! The inverse table is built alongside the forward one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::symbol::Symbol;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    ids: BTreeMap<Symbol, usize>,
    symbols: Vec<Symbol>,
}

impl Vocabulary {
    /// Build a mapping over the distinct symbols of `corpus`.
    pub fn build(corpus: &[Symbol]) -> Self {
        let by_text: BTreeMap<String, Symbol> =
            corpus.iter().map(|s| (s.to_string(), *s)).collect();

        let symbols: Vec<Symbol> = by_text.into_values().collect();
        let ids = symbols.iter().enumerate().map(|(id, s)| (*s, id)).collect();
        Vocabulary { ids, symbols }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn id(&self, symbol: Symbol) -> Result<usize> {
        self.ids
            .get(&symbol)
            .copied()
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))
    }

    pub fn symbol(&self, id: usize) -> Result<Symbol> {
        self.symbols.get(id).copied().ok_or(Error::UnknownId(id))
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.ids.contains_key(&symbol)
    }

    pub fn encode_symbols(&self, symbols: &[Symbol]) -> Result<Vec<usize>> {
        symbols.iter().map(|s| self.id(*s)).collect()
    }

    pub fn decode_ids(&self, ids: &[usize]) -> Result<Vec<Symbol>> {
        ids.iter().map(|id| self.symbol(*id)).collect()
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Token text to id, the persisted form.
    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(id, s)| (s.to_string(), id))
            .collect()
    }

    /// Rebuild from a token → id map, checking it is a bijection onto `0..n`.
    pub fn from_map(map: BTreeMap<String, usize>) -> Result<Self> {
        let mut slots: Vec<Option<Symbol>> = vec![None; map.len()];
        for (token, id) in &map {
            let symbol: Symbol = token
                .parse()
                .map_err(|_| Error::InvalidMapping(format!("unparseable token '{}'", token)))?;
            let slot = slots.get_mut(*id).ok_or_else(|| {
                Error::InvalidMapping(format!("id {} out of range for {} tokens", id, map.len()))
            })?;
            if slot.is_some() {
                return Err(Error::InvalidMapping(format!("id {} assigned twice", id)));
            }
            *slot = Some(symbol);
        }

        // Every slot is filled: n distinct in-range ids over n entries
        let symbols: Vec<Symbol> = slots.into_iter().flatten().collect();
        let ids = symbols.iter().enumerate().map(|(id, s)| (*s, id)).collect();
        Ok(Vocabulary { ids, symbols })
    }

    /// Write the mapping as indented JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.to_map()).map_err(|e| Error::json(path, e))?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let map: BTreeMap<String, usize> =
            serde_json::from_str(&text).map_err(|e| Error::json(path, e))?;
        Self::from_map(map)
    }
}
