//! # Symbol Tables
//!
//! A [`Symbols`] table maps strings to attributes and matches the longest
//! visible key at the current position. Ties between keys of equal length go
//! to the earliest inserted one.
//!
//! ## Permanent and per-parse changes
//!
//! `insert`, `remove` and `clear` on the table itself are permanent and meant
//! for use between parses. Semantic actions change a table through
//! [`ActionContext`](super::context::ActionContext); those changes are
//! recorded in the parse context's journal as an overlay and vanish when the
//! parse returns, whether it succeeded or not.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::attribute::{Attribute, Shape, Value};
use super::context::Context;
use super::core::{Node, NodeKind, ParseError, ParseResult, Parser};
use super::journal::TableId;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Per-parse view changes for one table.
#[derive(Debug, Clone)]
struct Overlay<T> {
    added: Vec<(String, T)>,
    removed: BTreeSet<String>,
    cleared: bool,
}

impl<T> Default for Overlay<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: BTreeSet::new(),
            cleared: false,
        }
    }
}

impl<T> Overlay<T> {
    fn hides(&self, key: &str) -> bool {
        self.cleared || self.removed.contains(key) || self.added.iter().any(|(k, _)| k == key)
    }
}

struct SymbolsInner<T> {
    id: TableId,
    entries: DashMap<String, (u64, T)>,
    next_seq: AtomicU64,
    shape: Shape,
}

pub struct Symbols<T: Attribute + Clone> {
    inner: Arc<SymbolsInner<T>>,
}

impl<T: Attribute + Clone> Clone for Symbols<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Attribute + Clone> Default for Symbols<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Attribute + Clone> Symbols<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SymbolsInner {
                id: TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)),
                entries: DashMap::new(),
                next_seq: AtomicU64::new(0),
                shape: T::shape(),
            }),
        }
    }

    pub fn with_entries<K: AsRef<str>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        let table = Self::new();
        for (key, value) in entries {
            table.insert(key.as_ref(), value);
        }
        table
    }

    pub fn id(&self) -> TableId {
        self.inner.id
    }

    /// Parser matching the longest visible key.
    pub fn node(&self) -> Node {
        Node::new(SymbolParser {
            table: self.clone(),
        })
    }

    /// Adds or replaces `key` permanently. A replaced key keeps its position
    /// in the tie-break order.
    pub fn insert(&self, key: &str, value: T) {
        let mut entry = self
            .inner
            .entries
            .entry(key.to_string())
            .or_insert_with(|| (self.inner.next_seq.fetch_add(1, Ordering::Relaxed), value.clone()));
        entry.1 = value;
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.inner.entries.remove(key).map(|(_, (_, value))| value)
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.inner.entries.get(key).map(|entry| entry.1.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub(crate) fn insert_for_parse(
        &self,
        ctx: &mut Context<'_>,
        key: &str,
        value: T,
    ) -> Result<(), ParseError> {
        let overlay = ctx
            .journal_mut()
            .get_or_insert_with(self.id(), Overlay::<T>::default)?;
        overlay.removed.remove(key);
        match overlay.added.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => overlay.added.push((key.to_string(), value)),
        }
        tracing::debug!(target: "attrparse::symbols", table = ?self.id(), key, "Symbol added for this parse");
        Ok(())
    }

    pub(crate) fn remove_for_parse(&self, ctx: &mut Context<'_>, key: &str) -> Result<(), ParseError> {
        let overlay = ctx
            .journal_mut()
            .get_or_insert_with(self.id(), Overlay::<T>::default)?;
        overlay.added.retain(|(k, _)| k != key);
        overlay.removed.insert(key.to_string());
        tracing::debug!(target: "attrparse::symbols", table = ?self.id(), key, "Symbol removed for this parse");
        Ok(())
    }

    pub(crate) fn clear_for_parse(&self, ctx: &mut Context<'_>) -> Result<(), ParseError> {
        let overlay = ctx
            .journal_mut()
            .get_or_insert_with(self.id(), Overlay::<T>::default)?;
        overlay.added.clear();
        overlay.removed.clear();
        overlay.cleared = true;
        tracing::debug!(target: "attrparse::symbols", table = ?self.id(), "Symbols cleared for this parse");
        Ok(())
    }

    pub(crate) fn find_for_parse(&self, ctx: &Context<'_>, key: &str) -> Result<Option<T>, ParseError> {
        let Some(overlay) = ctx.journal().get::<Overlay<T>>(self.id())? else {
            return Ok(self.get(key));
        };
        if let Some((_, value)) = overlay.added.iter().find(|(k, _)| k == key) {
            return Ok(Some(value.clone()));
        }
        if overlay.hides(key) {
            return Ok(None);
        }
        Ok(self.get(key))
    }

    /// Longest visible key at `pos`; per-parse additions rank after permanent
    /// entries of the same length.
    fn longest_match(&self, ctx: &Context<'_>, pos: usize) -> Result<Option<(usize, T)>, ParseError> {
        let overlay = ctx.journal().get::<Overlay<T>>(self.id())?;
        let mut best: Option<(usize, (u8, u64), T)> = None;
        let mut consider = |end: usize, rank: (u8, u64), value: &T| {
            let better = match &best {
                None => true,
                Some((best_end, best_rank, _)) => end > *best_end || (end == *best_end && rank < *best_rank),
            };
            if better {
                best = Some((end, rank, value.clone()));
            }
        };

        for entry in self.inner.entries.iter() {
            let key = entry.key();
            if key.is_empty() || overlay.is_some_and(|o| o.hides(key)) {
                continue;
            }
            if let Some(end) = ctx.match_text(key, pos) {
                let (seq, value) = entry.value();
                consider(end, (0, *seq), value);
            }
        }
        if let Some(overlay) = overlay {
            for (index, (key, value)) in overlay.added.iter().enumerate() {
                if key.is_empty() {
                    continue;
                }
                if let Some(end) = ctx.match_text(key, pos) {
                    consider(end, (1, index as u64), value);
                }
            }
        }

        Ok(best.map(|(end, _, value)| (end, value)))
    }
}

pub struct SymbolParser<T: Attribute + Clone> {
    table: Symbols<T>,
}

impl<T: Attribute + Clone> Parser for SymbolParser<T> {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        match self.table.longest_match(ctx, pos)? {
            Some((next, value)) => Ok((next, value.into_value())),
            None => Err(ctx.fail(self.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Symbols
    }

    fn shape(&self) -> &Shape {
        &self.table.inner.shape
    }

    fn describe(&self) -> String {
        format!("symbols#{}", self.table.id().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::prelude::*;
    use crate::analyzer::rule::Grammar;
    use crate::parse::{parse, prefix_parse};

    #[test]
    fn test_permanent_operations() {
        let table = Symbols::with_entries([("a", 1u64), ("b", 2)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("b"), Some(2));
        table.insert("b", 20);
        assert_eq!(table.get("b"), Some(20));
        assert_eq!(table.remove("a"), Some(1));
        assert_eq!(table.len(), 1);
        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn test_longest_match_wins() {
        let table = Symbols::with_entries([("ab", 1u64), ("abc", 2), ("a", 3)]);
        let grammar = Grammar::new(table.node()).unwrap();
        let mut pos = 0;
        assert_eq!(
            prefix_parse("abcd", &mut pos, &grammar).unwrap(),
            Some(Value::UInt(2))
        );
        assert_eq!(pos, 3);
    }

    #[test]
    fn test_no_case_lookup() {
        let table = Symbols::with_entries([("Begin", 'b')]);
        let grammar = Grammar::new(table.node().no_case()).unwrap();
        assert_eq!(parse("BEGIN", &grammar).unwrap(), Some(Value::Char('b')));
    }

    #[test]
    fn test_removal_inside_parse_is_reverted() {
        let table = Symbols::with_entries([("x", 1i64)]);
        let remover = table.clone();
        let grammar = Grammar::new(
            lit("-").action(move |ctx| ctx.remove_symbol(&remover, "x")) >> table.node(),
        )
        .unwrap();
        assert_eq!(parse("-x", &grammar).unwrap(), None);
        assert_eq!(table.get("x"), Some(1));

        let plain = Grammar::new(table.node()).unwrap();
        assert_eq!(parse("x", &plain).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_clear_then_insert_inside_parse() {
        let table = Symbols::with_entries([("old", 1u64)]);
        let handle = table.clone();
        let grammar = Grammar::new(
            lit("!").action(move |ctx| {
                ctx.clear_symbols(&handle);
                ctx.insert_symbol(&handle, "new", 9);
                assert_eq!(ctx.find_symbol(&handle, "old"), None);
                assert_eq!(ctx.find_symbol(&handle, "new"), Some(9));
            }) >> table.node(),
        )
        .unwrap();
        assert_eq!(parse("!new", &grammar).unwrap(), Some(Value::Tuple(vec![Value::UInt(9)])));
        assert_eq!(parse("!old", &grammar).unwrap(), None);
        assert_eq!(table.get("new"), None);
        assert_eq!(table.get("old"), Some(1));
    }
}
