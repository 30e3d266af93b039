//! Book catalog core: the repository that owns the collection, pure query
//! and stats functions over its snapshots, and the [`Library`] facade that
//! serialises writers and talks to the storage collaborator.

pub mod clock;
pub mod error;
pub mod library;
pub mod model;
pub mod query;
pub mod repository;
pub mod sample;
pub mod stats;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CatalogError, FieldError, Result};
pub use library::{Dashboard, Library};
pub use model::{Book, BookEdit, BookId, Loan, NewBook, YearInput};
pub use query::{BookQuery, SearchScope};
pub use repository::{BookRepository, Snapshot};
pub use stats::{LibraryStats, Tally};
pub use store::{BookStore, Change, MemoryStore, StoreError};
