//! `Library`: the call surface consumers use.
//!
//! Writers are serialised through one async mutex that is held across the
//! store call. Each mutation runs on a staged copy of the repository and is
//! published as a new snapshot only once the store has accepted it. Readers
//! never wait on a writer; they clone the last published snapshot.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::error::{CatalogError, Result};
use crate::model::{Book, BookEdit, BookId, NewBook};
use crate::query::{self, BookQuery};
use crate::repository::{BookRepository, Snapshot};
use crate::stats::{self, LibraryStats, Tally};
use crate::store::{BookStore, Change};

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub name: String,
    pub stats: LibraryStats,
    pub top_genres: Vec<Tally>,
    pub top_authors: Vec<Tally>,
    pub recently_added: Vec<Book>,
}

pub struct Library {
    name: String,
    writer: Mutex<BookRepository>,
    published: RwLock<Snapshot>,
    store: Arc<dyn BookStore>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

impl Library {
    pub fn new(name: impl Into<String>, store: Arc<dyn BookStore>) -> Self {
        Self::with_repository(name, BookRepository::new(), store)
    }

    pub fn with_repository(
        name: impl Into<String>,
        repository: BookRepository,
        store: Arc<dyn BookStore>,
    ) -> Self {
        let published = repository.list();
        Self {
            name: name.into(),
            writer: Mutex::new(repository),
            published: RwLock::new(published),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last committed state of the collection.
    pub async fn snapshot(&self) -> Snapshot {
        self.published.read().await.clone()
    }

    /// Load existing records without offering them to the store.
    pub async fn seed(&self, books: Vec<Book>) -> Result<usize> {
        let mut repository = self.writer.lock().await;
        let mut staged = repository.clone();
        let count = staged.seed(books)?;
        *repository = staged;
        *self.published.write().await = repository.list();

        tracing::info!(library = %self.name, seeded = count, "catalog seeded");
        Ok(count)
    }

    pub async fn list_books(&self, query: &BookQuery) -> Vec<Book> {
        query::filter(&self.snapshot().await, query)
    }

    pub async fn get_book(&self, id: &BookId) -> Result<Book> {
        self.snapshot()
            .await
            .iter()
            .find(|book| &book.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(id))
    }

    pub async fn create_book(&self, input: NewBook) -> Result<Book> {
        self.commit(|repo| {
            let book = repo.add(input)?;
            Ok((book.clone(), Change::Added(book)))
        })
        .await
    }

    pub async fn update_book(&self, id: &BookId, patch: BookEdit) -> Result<Book> {
        self.commit(|repo| {
            let book = repo.edit(id, patch)?;
            Ok((book.clone(), Change::Updated(book)))
        })
        .await
    }

    pub async fn delete_book(&self, id: &BookId) -> Result<()> {
        self.commit(|repo| {
            let removed = repo.delete(id)?;
            Ok(((), Change::Deleted(removed.id)))
        })
        .await
    }

    pub async fn borrow_book(&self, id: &BookId, borrower: &str) -> Result<Book> {
        self.commit(|repo| {
            let book = repo.borrow(id, borrower)?;
            Ok((book.clone(), Change::Borrowed(book)))
        })
        .await
    }

    pub async fn return_book(&self, id: &BookId) -> Result<Book> {
        self.commit(|repo| {
            let book = repo.return_book(id)?;
            Ok((book.clone(), Change::Returned(book)))
        })
        .await
    }

    pub async fn get_stats(&self) -> LibraryStats {
        stats::summarize(&self.snapshot().await)
    }

    pub async fn recently_added(&self, n: usize) -> Vec<Book> {
        query::recently_added(&self.snapshot().await, n)
    }

    pub async fn borrowed_books(&self) -> Vec<Book> {
        query::borrowed_only(&self.snapshot().await)
    }

    pub async fn genres(&self) -> Vec<String> {
        query::genres(&self.snapshot().await)
    }

    /// Stats, top-k genres/authors and the `recent` newest books, all from
    /// one snapshot.
    pub async fn dashboard(&self, top: usize, recent: usize) -> Dashboard {
        let snapshot = self.snapshot().await;
        Dashboard {
            name: self.name.clone(),
            stats: stats::summarize(&snapshot),
            top_genres: stats::top_genres(&snapshot, top),
            top_authors: stats::top_authors(&snapshot, top),
            recently_added: query::recently_added(&snapshot, recent),
        }
    }

    async fn commit<T, F>(&self, apply: F) -> Result<T>
    where
        F: FnOnce(&mut BookRepository) -> Result<(T, Change)>,
    {
        let mut repository = self.writer.lock().await;
        let mut staged = repository.clone();
        let (output, change) = apply(&mut staged)?;

        if let Err(err) = self.store.persist(&change).await {
            tracing::warn!(
                store = self.store.name(),
                change = change.kind(),
                book_id = %change.book_id(),
                error = %err,
                "store rejected change; collection left unchanged"
            );
            return Err(err.into());
        }

        *repository = staged;
        *self.published.write().await = repository.list();

        tracing::info!(
            change = change.kind(),
            book_id = %change.book_id(),
            books = repository.len(),
            "catalog updated"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FlakyStore {
        failing: AtomicBool,
        accepted: AtomicUsize,
    }

    #[async_trait]
    impl BookStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn persist(&self, _change: &Change) -> std::result::Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                self.accepted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn library() -> Library {
        Library::new("Test Library", Arc::new(MemoryStore))
    }

    #[tokio::test]
    async fn create_then_get() {
        let library = library();
        let book = library
            .create_book(NewBook::new("Dune", "Frank Herbert", "Science Fiction"))
            .await
            .unwrap();

        assert_eq!(library.get_book(&book.id).await.unwrap(), book);
        assert_eq!(library.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn dune_and_hobbit_scenario() {
        let library = library();
        let dune = library
            .create_book(NewBook::new("Dune", "Frank Herbert", "Science Fiction"))
            .await
            .unwrap();
        library
            .create_book(NewBook::new("The Hobbit", "J.R.R. Tolkien", "Fantasy"))
            .await
            .unwrap();
        library.borrow_book(&dune.id, "Alice").await.unwrap();

        let found = library.list_books(&BookQuery::search("hobbit")).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "The Hobbit");

        let scifi = library.list_books(&BookQuery::genre("Science Fiction")).await;
        assert_eq!(scifi.len(), 1);
        assert_eq!(scifi[0].title, "Dune");

        let borrowed = library.borrowed_books().await;
        assert_eq!(borrowed.len(), 1);
        assert_eq!(borrowed[0].title, "Dune");

        assert_eq!(
            library.get_stats().await,
            LibraryStats {
                total: 2,
                available: 1,
                borrowed: 1,
                unique_genres: 2,
                unique_authors: 2,
            }
        );
    }

    #[tokio::test]
    async fn store_failure_leaves_collection_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let library = Library::new("Test Library", store.clone());
        let book = library
            .create_book(NewBook::new("Emma", "Jane Austen", "Romance"))
            .await
            .unwrap();

        store.failing.store(true, Ordering::SeqCst);

        let err = library.borrow_book(&book.id, "Alice").await.unwrap_err();
        assert!(matches!(err, CatalogError::Store(StoreError::Unavailable(_))));
        assert!(!library.get_book(&book.id).await.unwrap().is_borrowed());

        let err = library
            .create_book(NewBook::new("Persuasion", "Jane Austen", "Romance"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(_)));
        assert_eq!(library.snapshot().await.len(), 1);

        assert!(library.delete_book(&book.id).await.is_err());
        assert!(library.get_book(&book.id).await.is_ok());
        assert_eq!(store.accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_the_store() {
        let store = Arc::new(FlakyStore::default());
        let library = Library::new("Test Library", store.clone());

        let err = library
            .create_book(NewBook::new("", "X", "Y"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(store.accepted.load(Ordering::SeqCst), 0);
        assert!(library.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_book() {
        let library = library();
        let book = library
            .create_book(NewBook::new("It", "Stephen King", "Horror"))
            .await
            .unwrap();

        library.delete_book(&book.id).await.unwrap();
        assert!(matches!(
            library.get_book(&book.id).await,
            Err(CatalogError::NotFound { .. })
        ));
        assert!(library.genres().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_borrows_admit_exactly_one() {
        let library = Arc::new(library());
        let book = library
            .create_book(NewBook::new("Dune", "Frank Herbert", "Science Fiction"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for reader in ["Alice", "Bob", "Carol", "Dan"] {
            let library = Arc::clone(&library);
            let id = book.id.clone();
            handles.push(tokio::spawn(async move {
                library.borrow_book(&id, reader).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert!(matches!(err, CatalogError::Conflict { .. })),
            }
        }
        assert_eq!(succeeded, 1);
        assert_eq!(library.get_stats().await.borrowed, 1);
    }

    #[tokio::test]
    async fn dashboard_reads_one_snapshot() {
        let library = library();
        for (title, author, genre) in [
            ("The Hobbit", "J.R.R. Tolkien", "Fantasy"),
            ("The Silmarillion", "J.R.R. Tolkien", "Fantasy"),
            ("Dune", "Frank Herbert", "Science Fiction"),
        ] {
            library
                .create_book(NewBook::new(title, author, genre))
                .await
                .unwrap();
        }

        let dashboard = library.dashboard(1, 2).await;
        assert_eq!(dashboard.name, "Test Library");
        assert_eq!(dashboard.stats.total, 3);
        assert_eq!(dashboard.top_genres[0].value, "Fantasy");
        assert_eq!(dashboard.top_authors[0].count, 2);
        assert_eq!(dashboard.recently_added.len(), 2);
        assert_eq!(dashboard.recently_added[0].title, "Dune");
    }
}
