use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Opaque, immutable identifier of a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Generate a fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An active loan. Present on a book exactly while it is borrowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    /// Who has the book
    pub borrower: String,
    /// Day the book went out
    pub borrowed_date: Date,
}

/// A book in the catalog.
///
/// Borrow state lives in [`Loan`], so a book can never claim to be borrowed
/// without a borrower and a date. On the wire the loan is flattened into
/// `is_borrowed`, `borrowed_date` and `borrower`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BookRecord", try_from = "BookRecord")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_year: Option<u16>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub loan: Option<Loan>,
    pub date_added: OffsetDateTime,
}

impl Book {
    pub fn is_borrowed(&self) -> bool {
        self.loan.is_some()
    }

    pub fn borrower(&self) -> Option<&str> {
        self.loan.as_ref().map(|loan| loan.borrower.as_str())
    }

    pub fn borrowed_date(&self) -> Option<Date> {
        self.loan.as_ref().map(|loan| loan.borrowed_date)
    }
}

/// Flat wire representation of [`Book`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookRecord {
    id: BookId,
    title: String,
    author: String,
    genre: String,
    #[serde(default)]
    publication_year: Option<u16>,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_borrowed: bool,
    #[serde(default, with = "iso_date::option")]
    borrowed_date: Option<Date>,
    #[serde(default)]
    borrower: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    date_added: OffsetDateTime,
}

impl From<Book> for BookRecord {
    fn from(book: Book) -> Self {
        let (is_borrowed, borrowed_date, borrower) = match book.loan {
            Some(loan) => (true, Some(loan.borrowed_date), Some(loan.borrower)),
            None => (false, None, None),
        };

        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            publication_year: book.publication_year,
            isbn: book.isbn,
            description: book.description,
            is_borrowed,
            borrowed_date,
            borrower,
            date_added: book.date_added,
        }
    }
}

impl TryFrom<BookRecord> for Book {
    type Error = String;

    fn try_from(record: BookRecord) -> Result<Self, Self::Error> {
        let loan = match (record.is_borrowed, record.borrowed_date, record.borrower) {
            (true, Some(borrowed_date), Some(borrower)) => Some(Loan {
                borrower,
                borrowed_date,
            }),
            (false, None, None) => None,
            _ => {
                return Err(format!(
                    "book {}: is_borrowed must agree with borrowed_date and borrower",
                    record.id
                ))
            }
        };

        Ok(Self {
            id: record.id,
            title: record.title,
            author: record.author,
            genre: record.genre,
            publication_year: record.publication_year,
            isbn: record.isbn,
            description: record.description,
            loan,
            date_added: record.date_added,
        })
    }
}

/// Publication year as submitted by a caller: forms send text, API clients
/// send numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum YearInput {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for YearInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct YearVisitor;

        impl Visitor<'_> for YearVisitor {
            type Value = YearInput;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 4-digit year")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<YearInput, E> {
                Ok(YearInput::Number(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<YearInput, E> {
                i64::try_from(value)
                    .map(YearInput::Number)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<YearInput, E> {
                Ok(YearInput::Text(value.to_string()))
            }
        }

        deserializer.deserialize_any(YearVisitor)
    }
}

impl YearInput {
    /// Resolve to a four digit year. Blank text means "no year".
    pub(crate) fn resolve(&self) -> Result<Option<u16>, String> {
        match self {
            Self::Number(value) => four_digit(*value).map(Some),
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => {
                if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err("must be a 4-digit year".to_string());
                }
                let value = text
                    .parse::<i64>()
                    .map_err(|_| "must be a 4-digit year".to_string())?;
                four_digit(value).map(Some)
            }
        }
    }
}

fn four_digit(value: i64) -> Result<u16, String> {
    if (1000..=9999).contains(&value) {
        u16::try_from(value).map_err(|_| "must be a 4-digit year".to_string())
    } else {
        Err("must be a 4-digit year".to_string())
    }
}

impl From<u16> for YearInput {
    fn from(value: u16) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for YearInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Input for adding a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<YearInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewBook {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: impl Into<YearInput>) -> Self {
        self.publication_year = Some(year.into());
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a book's descriptive fields.
///
/// Absent fields are left alone. For the optional fields an explicit `null`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "patch_value")]
    pub publication_year: Option<Option<YearInput>>,
    #[serde(default, deserialize_with = "patch_value")]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_value")]
    pub description: Option<Option<String>>,
}

impl BookEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.publication_year.is_none()
            && self.isbn.is_none()
            && self.description.is_none()
    }
}

/// Distinguishes a present `null` from an absent key.
fn patch_value<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn borrowed_book() -> Book {
        Book {
            id: BookId::from("2"),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: "Science Fiction".to_string(),
            publication_year: Some(1965),
            isbn: None,
            description: None,
            loan: Some(Loan {
                borrower: "Alice".to_string(),
                borrowed_date: date!(2023 - 03 - 15),
            }),
            date_added: datetime!(2023-01-02 09:00 UTC),
        }
    }

    #[test]
    fn book_serializes_flat_borrow_fields() {
        let value = serde_json::to_value(borrowed_book()).unwrap();

        assert_eq!(value["is_borrowed"], true);
        assert_eq!(value["borrower"], "Alice");
        assert_eq!(value["borrowed_date"], "2023-03-15");
        assert_eq!(value["date_added"], "2023-01-02T09:00:00Z");
        assert!(value.get("loan").is_none());
    }

    #[test]
    fn book_deserializes_from_wire_format() {
        let json = serde_json::json!({
            "id": "2",
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "publication_year": 1965,
            "is_borrowed": true,
            "borrowed_date": "2023-03-15",
            "borrower": "Alice",
            "date_added": "2023-01-02T09:00:00Z"
        });

        let book: Book = serde_json::from_value(json).unwrap();
        assert_eq!(book, borrowed_book());
    }

    #[test]
    fn inconsistent_borrow_fields_are_rejected() {
        let json = serde_json::json!({
            "id": "9",
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "is_borrowed": true,
            "date_added": "2023-01-02T09:00:00Z"
        });

        assert!(serde_json::from_value::<Book>(json).is_err());
    }

    #[test]
    fn year_input_accepts_numbers_and_numerals() {
        assert_eq!(YearInput::from(1937).resolve(), Ok(Some(1937)));
        assert_eq!(YearInput::from("1813").resolve(), Ok(Some(1813)));
        assert_eq!(YearInput::from("").resolve(), Ok(None));
    }

    #[test]
    fn year_input_rejects_anything_but_four_digits() {
        for bad in ["23", "19377", "19a7", " 1937", "0999", "-937"] {
            assert!(YearInput::from(bad).resolve().is_err(), "{bad} accepted");
        }
        assert!(YearInput::Number(23).resolve().is_err());
        assert!(YearInput::Number(10_000).resolve().is_err());
    }

    #[test]
    fn year_input_deserializes_numbers_and_text_only() {
        let number: YearInput = serde_json::from_value(serde_json::json!(1937)).unwrap();
        let text: YearInput = serde_json::from_value(serde_json::json!("1937")).unwrap();
        assert_eq!(number, YearInput::Number(1937));
        assert_eq!(text, YearInput::Text("1937".to_string()));

        for bad in [serde_json::json!(1937.5), serde_json::json!(true)] {
            let err = serde_json::from_value::<YearInput>(bad).unwrap_err();
            assert!(err.to_string().contains("4-digit year"), "{err}");
        }
    }

    #[test]
    fn book_edit_tells_null_from_absent() {
        let edit: BookEdit =
            serde_json::from_value(serde_json::json!({ "isbn": null, "title": "Emma" })).unwrap();

        assert_eq!(edit.title.as_deref(), Some("Emma"));
        assert_eq!(edit.isbn, Some(None));
        assert_eq!(edit.description, None);
        assert!(!edit.is_empty());
        assert!(BookEdit::default().is_empty());
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(BookId::generate(), BookId::generate());
    }
}
