//! Built-in demo catalog.

use time::macros::{date, datetime};

use crate::model::{Book, BookId, Loan};

/// Five books, two of them out on loan.
pub fn sample_books() -> Vec<Book> {
    let book = |id: &str, title: &str, author: &str, genre: &str, year: u16, isbn: &str| Book {
        id: BookId::from(id),
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        publication_year: Some(year),
        isbn: Some(isbn.to_string()),
        description: None,
        loan: None,
        date_added: datetime!(2023-01-01 09:00 UTC),
    };

    let mut hobbit = book("1", "The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, "9780547928227");
    hobbit.description = Some(
        "Bilbo Baggins is swept into a quest to reclaim the dwarves' mountain home.".to_string(),
    );

    let mut dune = book("2", "Dune", "Frank Herbert", "Science Fiction", 1965, "9780441172719");
    dune.date_added = datetime!(2023-01-08 09:00 UTC);
    dune.loan = Some(Loan {
        borrower: "Alice".to_string(),
        borrowed_date: date!(2023 - 03 - 15),
    });

    let mut pride = book(
        "3",
        "Pride and Prejudice",
        "Jane Austen",
        "Romance",
        1813,
        "9780141439518",
    );
    pride.date_added = datetime!(2023-02-14 09:00 UTC);

    let mut shining = book("4", "The Shining", "Stephen King", "Horror", 1977, "9780307743657");
    shining.date_added = datetime!(2023-03-01 09:00 UTC);

    let mut alchemist = book(
        "5",
        "The Alchemist",
        "Paulo Coelho",
        "Fiction",
        1988,
        "9780062315007",
    );
    alchemist.date_added = datetime!(2023-03-20 09:00 UTC);
    alchemist.loan = Some(Loan {
        borrower: "Bob".to_string(),
        borrowed_date: date!(2023 - 04 - 01),
    });

    vec![hobbit, dune, pride, shining, alchemist]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query;
    use crate::repository::BookRepository;
    use crate::stats::{self, LibraryStats};

    #[test]
    fn sample_seeds_cleanly() {
        let mut repo = BookRepository::new();
        assert_eq!(repo.seed(sample_books()).unwrap(), 5);
    }

    #[test]
    fn sample_stats_match_the_dashboard() {
        let books = sample_books();
        assert_eq!(
            stats::summarize(&books),
            LibraryStats {
                total: 5,
                available: 3,
                borrowed: 2,
                unique_genres: 5,
                unique_authors: 5,
            }
        );
    }

    #[test]
    fn newest_sample_books_come_first() {
        let recent = query::recently_added(&sample_books(), 3);
        let titles: Vec<_> = recent.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["The Alchemist", "The Shining", "Pride and Prejudice"]);
    }
}
