//! The book repository: sole owner and mutator of the collection.

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{CatalogError, FieldError, Result};
use crate::model::{Book, BookEdit, BookId, Loan, NewBook, YearInput};

/// Immutable view of the collection in insertion order.
///
/// Cloning is cheap; a snapshot never observes later mutations.
#[derive(Debug, Clone, Default)]
pub struct Snapshot(Arc<Vec<Book>>);

impl Deref for Snapshot {
    type Target = [Book];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Book;
    type IntoIter = std::slice::Iter<'a, Book>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Book collection with validated CRUD and borrow/return transitions.
///
/// Every operation checks everything it needs before touching the
/// collection, so a failed call leaves it exactly as it was.
#[derive(Clone)]
pub struct BookRepository {
    books: Arc<Vec<Book>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for BookRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookRepository")
            .field("books", &self.books.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for BookRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl BookRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            books: Arc::new(Vec::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.books.iter().any(|book| &book.id == id)
    }

    /// Current collection, oldest insertion first.
    pub fn list(&self) -> Snapshot {
        Snapshot(Arc::clone(&self.books))
    }

    pub fn get(&self, id: &BookId) -> Result<Book> {
        self.books
            .iter()
            .find(|book| &book.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(id))
    }

    pub fn add(&mut self, input: NewBook) -> Result<Book> {
        let mut errors = Vec::new();
        require_text(&mut errors, "title", &input.title);
        require_text(&mut errors, "author", &input.author);
        require_text(&mut errors, "genre", &input.genre);
        let publication_year = check_year(&mut errors, input.publication_year.as_ref());
        finish(errors)?;

        let mut id = BookId::generate();
        while self.contains(&id) {
            id = BookId::generate();
        }

        let book = Book {
            id,
            title: input.title,
            author: input.author,
            genre: input.genre,
            publication_year,
            isbn: optional_text(input.isbn),
            description: optional_text(input.description),
            loan: None,
            date_added: self.clock.now(),
        };

        Arc::make_mut(&mut self.books).push(book.clone());
        Ok(book)
    }

    /// Apply the provided fields. Borrow state is never touched.
    pub fn edit(&mut self, id: &BookId, patch: BookEdit) -> Result<Book> {
        let index = self.position(id)?;
        let mut book = self.books[index].clone();
        let mut errors = Vec::new();

        if let Some(title) = patch.title {
            require_text(&mut errors, "title", &title);
            book.title = title;
        }
        if let Some(author) = patch.author {
            require_text(&mut errors, "author", &author);
            book.author = author;
        }
        if let Some(genre) = patch.genre {
            require_text(&mut errors, "genre", &genre);
            book.genre = genre;
        }
        if let Some(year) = patch.publication_year {
            book.publication_year = check_year(&mut errors, year.as_ref());
        }
        if let Some(isbn) = patch.isbn {
            book.isbn = optional_text(isbn);
        }
        if let Some(description) = patch.description {
            book.description = optional_text(description);
        }
        finish(errors)?;

        Arc::make_mut(&mut self.books)[index] = book.clone();
        Ok(book)
    }

    /// Remove the book permanently, handing back what was removed.
    pub fn delete(&mut self, id: &BookId) -> Result<Book> {
        let index = self.position(id)?;
        Ok(Arc::make_mut(&mut self.books).remove(index))
    }

    pub fn borrow(&mut self, id: &BookId, borrower: &str) -> Result<Book> {
        let index = self.position(id)?;
        let mut book = self.books[index].clone();

        if let Some(loan) = &book.loan {
            return Err(CatalogError::conflict(
                id,
                format!("already borrowed by {}", loan.borrower),
            ));
        }
        if borrower.trim().is_empty() {
            return Err(CatalogError::invalid("borrower", "must not be empty"));
        }

        book.loan = Some(Loan {
            borrower: borrower.to_string(),
            borrowed_date: self.clock.now().date(),
        });

        Arc::make_mut(&mut self.books)[index] = book.clone();
        Ok(book)
    }

    pub fn return_book(&mut self, id: &BookId) -> Result<Book> {
        let index = self.position(id)?;
        let mut book = self.books[index].clone();

        if book.loan.take().is_none() {
            return Err(CatalogError::conflict(id, "is not currently borrowed"));
        }

        Arc::make_mut(&mut self.books)[index] = book.clone();
        Ok(book)
    }

    /// Load existing records (sample data, seed files), keeping their ids and
    /// timestamps. The whole batch is rejected if any record breaks the
    /// collection's rules.
    pub fn seed(&mut self, books: impl IntoIterator<Item = Book>) -> Result<usize> {
        let books: Vec<Book> = books.into_iter().collect();
        let mut seen: HashSet<&BookId> = self.books.iter().map(|book| &book.id).collect();
        let mut errors = Vec::new();

        for book in &books {
            if !seen.insert(&book.id) {
                errors.push(FieldError::new(
                    "id",
                    format!("book '{}' appears more than once", book.id),
                ));
            }
            for (field, value) in [
                ("title", &book.title),
                ("author", &book.author),
                ("genre", &book.genre),
            ] {
                if value.trim().is_empty() {
                    errors.push(FieldError::new(
                        field,
                        format!("book '{}': must not be empty", book.id),
                    ));
                }
            }
            if let Some(year) = book.publication_year {
                if !(1000..=9999).contains(&year) {
                    errors.push(FieldError::new(
                        "publication_year",
                        format!("book '{}': must be a 4-digit year", book.id),
                    ));
                }
            }
            if book.borrower().is_some_and(|name| name.trim().is_empty()) {
                errors.push(FieldError::new(
                    "borrower",
                    format!("book '{}': must not be empty", book.id),
                ));
            }
        }
        finish(errors)?;

        let count = books.len();
        Arc::make_mut(&mut self.books).extend(books);
        Ok(count)
    }

    fn position(&self, id: &BookId) -> Result<usize> {
        self.books
            .iter()
            .position(|book| &book.id == id)
            .ok_or_else(|| CatalogError::not_found(id))
    }
}

fn require_text(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

fn check_year(errors: &mut Vec<FieldError>, input: Option<&YearInput>) -> Option<u16> {
    match input.map(YearInput::resolve) {
        Some(Ok(year)) => year,
        Some(Err(message)) => {
            errors.push(FieldError::new("publication_year", message));
            None
        }
        None => None,
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(errors))
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
