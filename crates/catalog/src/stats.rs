//! Aggregate counts over a snapshot.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::Book;

/// Dashboard summary. `available + borrowed == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total: usize,
    pub available: usize,
    pub borrowed: usize,
    pub unique_genres: usize,
    pub unique_authors: usize,
}

/// A value and how many books carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub value: String,
    pub count: usize,
}

pub fn total(books: &[Book]) -> usize {
    books.len()
}

pub fn available(books: &[Book]) -> usize {
    books.iter().filter(|book| !book.is_borrowed()).count()
}

pub fn borrowed(books: &[Book]) -> usize {
    books.iter().filter(|book| book.is_borrowed()).count()
}

/// Case-sensitive.
pub fn unique_genres(books: &[Book]) -> usize {
    books
        .iter()
        .map(|book| book.genre.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn unique_authors(books: &[Book]) -> usize {
    books
        .iter()
        .map(|book| book.author.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// All five counts in one pass.
pub fn summarize(books: &[Book]) -> LibraryStats {
    let mut genres = HashSet::new();
    let mut authors = HashSet::new();
    let mut borrowed = 0;

    for book in books {
        genres.insert(book.genre.as_str());
        authors.insert(book.author.as_str());
        if book.is_borrowed() {
            borrowed += 1;
        }
    }

    LibraryStats {
        total: books.len(),
        available: books.len() - borrowed,
        borrowed,
        unique_genres: genres.len(),
        unique_authors: authors.len(),
    }
}

pub fn top_genres(books: &[Book], k: usize) -> Vec<Tally> {
    top_by(books, k, |book| &book.genre)
}

pub fn top_authors(books: &[Book], k: usize) -> Vec<Tally> {
    top_by(books, k, |book| &book.author)
}

/// Most frequent values first; equal counts keep first-seen order.
fn top_by<F>(books: &[Book], k: usize, key: F) -> Vec<Tally>
where
    F: Fn(&Book) -> &String,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for book in books {
        let value = key(book).as_str();
        let count = counts.entry(value).or_insert_with(|| {
            order.push(value);
            0
        });
        *count += 1;
    }

    let mut tallies: Vec<Tally> = order
        .into_iter()
        .map(|value| Tally {
            value: value.to_string(),
            count: counts.get(value).copied().unwrap_or_default(),
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies.truncate(k);
    tallies
}
