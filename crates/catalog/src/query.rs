//! Pure, filtered views over a snapshot. Nothing here mutates.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::model::Book;

/// Which fields free-text search looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    TitleOrAuthor,
    Title,
    Author,
    Genre,
    /// Title, author, genre, or ISBN.
    Any,
}

/// Filters for listing books. All present filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookQuery {
    /// Case-insensitive substring.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact genre.
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, alias = "borrowed")]
    pub borrowed_only: bool,
    #[serde(default)]
    pub scope: SearchScope,
}

impl BookQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn genre(genre: impl Into<String>) -> Self {
        Self {
            genre: Some(genre.into()),
            ..Self::default()
        }
    }

    pub fn borrowed() -> Self {
        Self {
            borrowed_only: true,
            ..Self::default()
        }
    }

    pub fn in_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    fn matches(&self, book: &Book, needle: Option<&str>) -> bool {
        if self.borrowed_only && !book.is_borrowed() {
            return false;
        }
        if let Some(genre) = self.genre.as_deref().filter(|g| !g.is_empty()) {
            if book.genre != genre {
                return false;
            }
        }
        match needle {
            Some(needle) => self.scope_matches(book, needle),
            None => true,
        }
    }

    fn scope_matches(&self, book: &Book, needle: &str) -> bool {
        let hit = |value: &str| value.to_lowercase().contains(needle);
        match self.scope {
            SearchScope::TitleOrAuthor => hit(&book.title) || hit(&book.author),
            SearchScope::Title => hit(&book.title),
            SearchScope::Author => hit(&book.author),
            SearchScope::Genre => hit(&book.genre),
            SearchScope::Any => {
                hit(&book.title)
                    || hit(&book.author)
                    || hit(&book.genre)
                    || book.isbn.as_deref().is_some_and(hit)
            }
        }
    }
}

/// Books matching `query`, in snapshot order.
pub fn filter(books: &[Book], query: &BookQuery) -> Vec<Book> {
    let needle = query
        .search
        .as_deref()
        .filter(|text| !text.is_empty())
        .map(str::to_lowercase);

    books
        .iter()
        .filter(|book| query.matches(book, needle.as_deref()))
        .cloned()
        .collect()
}

/// The `n` newest books by `date_added`. Equal timestamps put the later
/// insertion first.
pub fn recently_added(books: &[Book], n: usize) -> Vec<Book> {
    let mut ranked: Vec<(usize, &Book)> = books.iter().enumerate().collect();
    ranked.sort_by_key(|(position, book)| (Reverse(book.date_added), Reverse(*position)));
    ranked
        .into_iter()
        .take(n)
        .map(|(_, book)| book.clone())
        .collect()
}

pub fn borrowed_only(books: &[Book]) -> Vec<Book> {
    filter(books, &BookQuery::borrowed())
}

/// Distinct genres in first-seen order.
pub fn genres(books: &[Book]) -> Vec<String> {
    let mut seen = Vec::new();
    for book in books {
        if !seen.contains(&book.genre) {
            seen.push(book.genre.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookId, Loan};
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    fn book(id: &str, title: &str, author: &str, genre: &str, added: OffsetDateTime) -> Book {
        Book {
            id: BookId::from(id),
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            publication_year: None,
            isbn: None,
            description: None,
            loan: None,
            date_added: added,
        }
    }

    fn dune_and_hobbit() -> Vec<Book> {
        let mut dune = book(
            "1",
            "Dune",
            "Frank Herbert",
            "Science Fiction",
            datetime!(2024-01-01 00:00 UTC),
        );
        dune.loan = Some(Loan {
            borrower: "Alice".to_string(),
            borrowed_date: date!(2024 - 02 - 01),
        });
        let mut hobbit = book(
            "2",
            "The Hobbit",
            "J.R.R. Tolkien",
            "Fantasy",
            datetime!(2024-01-02 00:00 UTC),
        );
        hobbit.isbn = Some("9780547928227".to_string());
        vec![dune, hobbit]
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_author() {
        let books = dune_and_hobbit();
        assert_eq!(titles(&filter(&books, &BookQuery::search("hobbit"))), ["The Hobbit"]);
        assert_eq!(titles(&filter(&books, &BookQuery::search("HERBERT"))), ["Dune"]);
        assert!(filter(&books, &BookQuery::search("fantasy")).is_empty());
    }

    #[test]
    fn empty_query_matches_everything_in_order() {
        let books = dune_and_hobbit();
        assert_eq!(titles(&filter(&books, &BookQuery::default())), ["Dune", "The Hobbit"]);
        assert_eq!(titles(&filter(&books, &BookQuery::search(""))), ["Dune", "The Hobbit"]);
    }

    #[test]
    fn genre_is_an_exact_match() {
        let books = dune_and_hobbit();
        assert_eq!(titles(&filter(&books, &BookQuery::genre("Science Fiction"))), ["Dune"]);
        assert!(filter(&books, &BookQuery::genre("science fiction")).is_empty());
        assert!(filter(&books, &BookQuery::genre("Science")).is_empty());
    }

    #[test]
    fn borrowed_only_keeps_borrowed_books() {
        let books = dune_and_hobbit();
        assert_eq!(titles(&borrowed_only(&books)), ["Dune"]);
    }

    #[test]
    fn filters_combine_with_and() {
        let books = dune_and_hobbit();
        let query = BookQuery {
            search: Some("the".to_string()),
            borrowed_only: true,
            ..BookQuery::default()
        };
        assert!(filter(&books, &query).is_empty());

        let query = BookQuery {
            search: Some("dune".to_string()),
            genre: Some("Science Fiction".to_string()),
            borrowed_only: true,
            ..BookQuery::default()
        };
        assert_eq!(titles(&filter(&books, &query)), ["Dune"]);
    }

    #[test]
    fn scopes_narrow_or_widen_the_search() {
        let books = dune_and_hobbit();
        let by_genre = BookQuery::search("fantasy").in_scope(SearchScope::Genre);
        assert_eq!(titles(&filter(&books, &by_genre)), ["The Hobbit"]);

        let by_isbn = BookQuery::search("92822").in_scope(SearchScope::Any);
        assert_eq!(titles(&filter(&books, &by_isbn)), ["The Hobbit"]);

        let title_only = BookQuery::search("tolkien").in_scope(SearchScope::Title);
        assert!(filter(&books, &title_only).is_empty());
    }

    #[test]
    fn recently_added_orders_newest_first() {
        let books = vec![
            book("a", "Old", "X", "G", datetime!(2024-01-01 00:00 UTC)),
            book("b", "Newest", "X", "G", datetime!(2024-03-01 00:00 UTC)),
            book("c", "Middle", "X", "G", datetime!(2024-02-01 00:00 UTC)),
        ];
        assert_eq!(titles(&recently_added(&books, 2)), ["Newest", "Middle"]);
        assert_eq!(recently_added(&books, 10).len(), 3);
        assert!(recently_added(&books, 0).is_empty());
    }

    #[test]
    fn recently_added_breaks_ties_by_latest_insertion() {
        let same = datetime!(2024-01-01 00:00 UTC);
        let books = vec![
            book("a", "First", "X", "G", same),
            book("b", "Second", "X", "G", same),
            book("c", "Third", "X", "G", same),
        ];
        assert_eq!(
            titles(&recently_added(&books, 3)),
            ["Third", "Second", "First"]
        );
    }

    #[test]
    fn genres_are_distinct_in_first_seen_order() {
        let mut books = dune_and_hobbit();
        books.push(book(
            "3",
            "Foundation",
            "Isaac Asimov",
            "Science Fiction",
            datetime!(2024-01-03 00:00 UTC),
        ));
        assert_eq!(genres(&books), ["Science Fiction", "Fantasy"]);
    }

    #[test]
    fn query_deserializes_from_url_style_params() {
        let query: BookQuery = serde_json::from_value(serde_json::json!({
            "search": "dune",
            "borrowed": true,
            "scope": "any"
        }))
        .unwrap();
        assert!(query.borrowed_only);
        assert_eq!(query.scope, SearchScope::Any);
    }
}
