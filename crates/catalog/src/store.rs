//! Storage collaborator seam.
//!
//! The catalog keeps its state in memory. Every committed mutation is first
//! offered to a [`BookStore`]; a durable backend plugs in here without the
//! repository's rules changing.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Book, BookId};

/// A committed change to the collection, as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(Book),
    Updated(Book),
    Borrowed(Book),
    Returned(Book),
    Deleted(BookId),
}

impl Change {
    pub fn book_id(&self) -> &BookId {
        match self {
            Self::Added(book)
            | Self::Updated(book)
            | Self::Borrowed(book)
            | Self::Returned(book) => &book.id,
            Self::Deleted(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Updated(_) => "updated",
            Self::Borrowed(_) => "borrowed",
            Self::Returned(_) => "returned",
            Self::Deleted(_) => "deleted",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected change: {0}")]
    Rejected(String),
}

/// Durability collaborator. May be slow or fail; callers surface failures
/// without retrying.
#[async_trait]
pub trait BookStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn persist(&self, change: &Change) -> Result<(), StoreError>;
}

/// Store that keeps nothing beyond the in-memory collection.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryStore;

#[async_trait]
impl BookStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn persist(&self, change: &Change) -> Result<(), StoreError> {
        tracing::debug!(
            store = self.name(),
            change = change.kind(),
            book_id = %change.book_id(),
            "change accepted"
        );
        Ok(())
    }
}
