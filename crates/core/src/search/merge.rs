//! Cross-catalog deduplication by identifier.
//!
//! Lists are merged in priority order (earliest list wins conflicts). Records
//! are filed under ISBN-13, else ISBN-10, else ASIN, and any identifier a
//! record carries can match an existing entry. A match fills the existing
//! record's empty fields and never overwrites populated ones.

use std::collections::HashMap;

use crate::book::BookRecord;
use crate::isbn::{isbn10_to_isbn13, normalize_isbn};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Isbn13(usize),
    Isbn10(usize),
    Asin(usize),
}

#[derive(Debug, Default)]
struct Merger {
    by_isbn13: Vec<BookRecord>,
    by_isbn10: Vec<BookRecord>,
    asin_only: Vec<BookRecord>,
    index: HashMap<String, Slot>,
}

/// Every lookup key a record can be matched by.
///
/// ISBN-10s also index under their ISBN-13 form so a catalog that only
/// reports one meets a catalog that reports the other.
fn keys(book: &BookRecord) -> Vec<String> {
    let isbn13 = book.isbn_13.as_deref().map(normalize_isbn);
    let isbn10 = book.isbn_10.as_deref().map(normalize_isbn);

    let mut keys = Vec::with_capacity(4);
    if let Some(isbn) = &isbn13 {
        keys.push(format!("isbn13:{isbn}"));
    }
    if let Some(isbn) = &isbn10 {
        if let Some(converted) = isbn10_to_isbn13(isbn)
            && isbn13.as_deref() != Some(converted.as_str())
        {
            keys.push(format!("isbn13:{converted}"));
        }
        keys.push(format!("isbn10:{isbn}"));
    }
    if let Some(asin) = &book.asin {
        keys.push(format!("asin:{asin}"));
    }
    keys
}

impl Merger {
    fn slot_mut(&mut self, slot: Slot) -> &mut BookRecord {
        match slot {
            Slot::Isbn13(i) => &mut self.by_isbn13[i],
            Slot::Isbn10(i) => &mut self.by_isbn10[i],
            Slot::Asin(i) => &mut self.asin_only[i],
        }
    }

    fn add(&mut self, book: BookRecord) {
        let keys = keys(&book);
        if keys.is_empty() {
            tracing::debug!(title = %book.title, source = %book.source, "dropping record without identifiers");
            return;
        }

        let slot = match keys.iter().find_map(|k| self.index.get(k).copied()) {
            Some(slot) => {
                self.slot_mut(slot).fill_missing_from(&book);
                slot
            }
            None if book.isbn_13.is_some() => {
                self.by_isbn13.push(book);
                Slot::Isbn13(self.by_isbn13.len() - 1)
            }
            None if book.isbn_10.is_some() => {
                self.by_isbn10.push(book);
                Slot::Isbn10(self.by_isbn10.len() - 1)
            }
            None => {
                self.asin_only.push(book);
                Slot::Asin(self.asin_only.len() - 1)
            }
        };

        for key in keys {
            self.index.entry(key).or_insert(slot);
        }
    }

    fn finish(self, max_results: usize) -> Vec<BookRecord> {
        self.by_isbn13
            .into_iter()
            .chain(self.by_isbn10)
            .chain(self.asin_only)
            .take(max_results)
            .collect()
    }
}

/// Merge per-source result lists, highest priority first.
///
/// Output order: ISBN-13 entries, then ISBN-10 entries, then ASIN-only
/// entries, each in first-seen order, truncated to `max_results`. Records
/// with no identifier at all are dropped.
pub fn merge_by_identifier<I>(lists: I, max_results: usize) -> Vec<BookRecord>
where
    I: IntoIterator<Item = Vec<BookRecord>>,
{
    let mut merger = Merger::default();
    for book in lists.into_iter().flatten() {
        merger.add(book);
    }
    merger.finish(max_results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookSource;

    fn book(source: BookSource, isbn_13: Option<&str>, isbn_10: Option<&str>, title: &str) -> BookRecord {
        BookRecord {
            isbn_13: isbn_13.map(String::from),
            isbn_10: isbn_10.map(String::from),
            ..BookRecord::new(title, source)
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = BookRecord {
            authors: vec!["Frank Herbert".into()],
            cover_image: Some("https://covers.example/dune.jpg".into()),
            ..book(BookSource::GoogleBooks, Some("9780441013593"), None, "Dune")
        };

        let merged = merge_by_identifier([vec![a.clone()], vec![a.clone()]], 10);
        assert_eq!(merged, vec![a]);
    }

    #[test]
    fn test_priority_preserved() {
        let audible = BookRecord {
            asin: Some("B0AAAAAAAA".into()),
            narrators: vec!["Narrator".into()],
            ..book(BookSource::Audible, Some("9780000000002"), None, "Audible Title")
        };
        let google = BookRecord {
            subtitle: Some("Google Subtitle".into()),
            authors: vec!["Google Author".into()],
            external_id: Some("gb-1".into()),
            ..book(BookSource::GoogleBooks, Some("9780000000002"), Some("0000000000"), "Google Title")
        };
        let openlibrary = BookRecord {
            subtitle: Some("OpenLibrary Subtitle".into()),
            authors: vec!["OpenLibrary Author".into()],
            cover_image: Some("https://covers.openlibrary.org/b/id/1-M.jpg".into()),
            ..book(BookSource::OpenLibrary, Some("9780000000002"), None, "OpenLibrary Title")
        };

        let merged = merge_by_identifier([vec![audible], vec![google], vec![openlibrary]], 10);
        assert_eq!(merged.len(), 1);

        let book = &merged[0];
        assert_eq!(book.title, "Audible Title");
        assert_eq!(book.asin.as_deref(), Some("B0AAAAAAAA"));
        assert_eq!(book.narrators, vec!["Narrator".to_string()]);
        assert_eq!(book.subtitle.as_deref(), Some("Google Subtitle"));
        assert_eq!(book.authors, vec!["Google Author".to_string()]);
        assert_eq!(book.isbn_10.as_deref(), Some("0000000000"));
        assert_eq!(book.external_id.as_deref(), Some("gb-1"));
        assert_eq!(book.cover_image.as_deref(), Some("https://covers.openlibrary.org/b/id/1-M.jpg"));
        assert_eq!(book.source, BookSource::Hybrid);
    }

    #[test]
    fn test_isbn10_matches_isbn13() {
        let google = book(BookSource::GoogleBooks, Some("9780306406157"), None, "Google");
        let openlibrary = BookRecord {
            subtitle: Some("found".into()),
            ..book(BookSource::OpenLibrary, None, Some("0-306-40615-2"), "OpenLibrary")
        };

        let merged = merge_by_identifier([vec![google], vec![openlibrary]], 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].subtitle.as_deref(), Some("found"));
        assert_eq!(merged[0].isbn_10.as_deref(), Some("0-306-40615-2"));
    }

    #[test]
    fn test_output_order_and_truncation() {
        let asin_only = BookRecord { asin: Some("B0ASINONLY".into()), ..BookRecord::new("Asin", BookSource::Audible) };
        let isbn10 = book(BookSource::OpenLibrary, None, Some("0306406152"), "Ten");
        let isbn13 = book(BookSource::GoogleBooks, Some("9780441013593"), None, "Thirteen");

        let merged = merge_by_identifier([vec![asin_only], vec![isbn10, isbn13]], 10);
        let titles: Vec<_> = merged.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Thirteen", "Ten", "Asin"]);

        assert_eq!(merge_by_identifier([merged], 2).len(), 2);
    }

    #[test]
    fn test_asin_only_deduped_by_value() {
        let first = BookRecord { asin: Some("B0SAME0000".into()), ..BookRecord::new("One", BookSource::Audible) };
        let second = BookRecord {
            asin: Some("B0SAME0000".into()),
            subtitle: Some("sub".into()),
            ..BookRecord::new("Two", BookSource::Audible)
        };

        let merged = merge_by_identifier([vec![first], vec![second]], 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "One");
        assert_eq!(merged[0].subtitle.as_deref(), Some("sub"));
        assert_eq!(merged[0].source, BookSource::Audible);
    }

    #[test]
    fn test_records_without_identifiers_dropped() {
        let anonymous = BookRecord::new("Mystery", BookSource::OpenLibrary);
        assert!(merge_by_identifier([vec![anonymous]], 10).is_empty());
    }

    #[test]
    fn test_all_empty() {
        assert!(merge_by_identifier([Vec::new(), Vec::new(), Vec::new()], 10).is_empty());
    }
}
