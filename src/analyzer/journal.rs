//! Per-parse storage for symbol-table changes made by semantic actions.
//!
//! The journal maps a table identity to a type-erased overlay. It lives inside
//! the parse context, so everything recorded here is discarded when the parse
//! returns.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

use super::core::ParseError;

/// Identity of a symbol table, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) u64);

trait CopyableAny: Any + Send {
    fn clone_box(&self) -> Box<dyn CopyableAny>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Clone + Send> CopyableAny for T {
    fn clone_box(&self) -> Box<dyn CopyableAny> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// A clonable, type-erased value that can be read back only as the type it
/// was stored with.
pub struct AnyCopyable {
    inner: Box<dyn CopyableAny>,
}

impl AnyCopyable {
    pub fn new<T: Any + Clone + Send>(value: T) -> Self {
        Self {
            inner: Box::new(value),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Result<&T, ParseError> {
        let found = self.inner.type_name();
        self.inner
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch::<T>(found))
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Result<&mut T, ParseError> {
        let found = self.inner.type_name();
        self.inner
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| mismatch::<T>(found))
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }
}

fn mismatch<T>(found: &'static str) -> ParseError {
    ParseError::SymbolTypeMismatch {
        expected: type_name::<T>(),
        found,
    }
}

impl Clone for AnyCopyable {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl fmt::Debug for AnyCopyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyCopyable<{}>", self.inner.type_name())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolJournal {
    overlays: HashMap<TableId, AnyCopyable>,
}

impl SymbolJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// The overlay recorded for `table`, if any action touched it.
    pub fn get<T: Any>(&self, table: TableId) -> Result<Option<&T>, ParseError> {
        self.overlays
            .get(&table)
            .map(AnyCopyable::downcast_ref::<T>)
            .transpose()
    }

    pub fn get_or_insert_with<T: Any + Clone + Send>(
        &mut self,
        table: TableId,
        init: impl FnOnce() -> T,
    ) -> Result<&mut T, ParseError> {
        self.overlays
            .entry(table)
            .or_insert_with(|| AnyCopyable::new(init()))
            .downcast_mut::<T>()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_deep() {
        let original = AnyCopyable::new(vec![1, 2]);
        let mut copy = original.clone();
        copy.downcast_mut::<Vec<i32>>().unwrap().push(3);

        assert_eq!(original.downcast_ref::<Vec<i32>>().unwrap(), &vec![1, 2]);
        assert_eq!(copy.downcast_ref::<Vec<i32>>().unwrap(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let value = AnyCopyable::new(String::from("x"));
        let err = value.downcast_ref::<u64>().unwrap_err();
        assert!(matches!(err, ParseError::SymbolTypeMismatch { expected: "u64", .. }));
    }

    #[test]
    fn test_journal_creates_on_first_touch() {
        let mut journal = SymbolJournal::new();
        let table = TableId(7);
        assert!(journal.get::<Vec<u8>>(table).unwrap().is_none());

        journal
            .get_or_insert_with(table, Vec::<u8>::new)
            .unwrap()
            .push(1);
        assert_eq!(journal.get::<Vec<u8>>(table).unwrap(), Some(&vec![1]));
        assert!(journal.get_or_insert_with(table, String::new).is_err());
        assert_eq!(journal.len(), 1);
    }
}
