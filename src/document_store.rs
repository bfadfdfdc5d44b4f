use crate::error::{RagError, Result};
use crate::vector_index::SlotId;

/// Raw document texts, position-aligned with the vectors of a `FlatIndex`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStore {
    documents: Vec<String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<String>) -> Self {
        Self { documents }
    }

    pub fn append(&mut self, text: impl Into<String>) -> SlotId {
        self.documents.push(text.into());
        self.documents.len() - 1
    }

    pub fn get(&self, slot: SlotId) -> Result<&str> {
        self.documents
            .get(slot)
            .map(String::as_str)
            .ok_or(RagError::SlotNotFound {
                slot,
                len: self.documents.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(slot, text)| (slot, text.as_str()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_position() {
        let mut store = DocumentStore::new();
        assert_eq!(store.append("first"), 0);
        assert_eq!(store.append(String::from("second")), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap(), "second");
    }

    #[test]
    fn get_past_end_is_slot_not_found() {
        let store = DocumentStore::from_documents(vec!["only".into()]);
        assert!(matches!(
            store.get(1),
            Err(RagError::SlotNotFound { slot: 1, len: 1 })
        ));
    }

    #[test]
    fn iter_yields_slots_in_order() {
        let store = DocumentStore::from_documents(vec!["a".into(), "b".into()]);
        let items: Vec<_> = store.iter().collect();
        assert_eq!(items, vec![(0, "a"), (1, "b")]);
    }
}
