//! ISBN-10 / ISBN-13 / ASIN validation and conversion.
//!
//! All functions are pure. Invalid input yields `false` or `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;

/// Strict pattern for queries that should be tried as a direct catalog lookup:
/// ten digits (ISBN-style ASIN) or `B` followed by nine uppercase alphanumerics.
static DIRECT_LOOKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$|^B[0-9A-Z]{9}$").expect("static regex is valid"));

/// Remove hyphens and spaces. No case folding.
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

/// Validate ISBN-10 format and checksum.
///
/// Weighted sum with weights 10..=1 must be divisible by 11; the last
/// character may be `X` (value 10).
pub fn validate_isbn10(isbn: &str) -> bool {
    let isbn = normalize_isbn(isbn);
    let bytes = isbn.as_bytes();
    if bytes.len() != 10 || !bytes[..9].iter().all(u8::is_ascii_digit) {
        return false;
    }

    let check = match bytes[9] {
        b @ b'0'..=b'9' => u32::from(b - b'0'),
        b'X' | b'x' => 10,
        _ => return false,
    };

    let total: u32 = bytes[..9]
        .iter()
        .enumerate()
        .map(|(i, b)| (10 - i as u32) * u32::from(b - b'0'))
        .sum();

    (total + check) % 11 == 0
}

/// Validate ISBN-13 format and checksum (alternating weights 1/3, mod 10).
pub fn validate_isbn13(isbn: &str) -> bool {
    let isbn = normalize_isbn(isbn);
    let bytes = isbn.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }

    isbn13_check_digit(&bytes[..12]) == u32::from(bytes[12] - b'0')
}

/// Convert a valid ISBN-10 to its `978`-prefixed ISBN-13.
pub fn isbn10_to_isbn13(isbn10: &str) -> Option<String> {
    let isbn10 = normalize_isbn(isbn10).to_uppercase();
    if !validate_isbn10(&isbn10) {
        return None;
    }

    let base = format!("978{}", &isbn10[..9]);
    let check = isbn13_check_digit(base.as_bytes());
    Some(format!("{base}{check}"))
}

/// Convert a valid ISBN-13 to ISBN-10.
///
/// Only `978`-prefixed ISBN-13s have an ISBN-10 form; `979` yields `None`.
pub fn isbn13_to_isbn10(isbn13: &str) -> Option<String> {
    let isbn13 = normalize_isbn(isbn13);
    if !validate_isbn13(&isbn13) || !isbn13.starts_with("978") {
        return None;
    }

    let base = &isbn13[3..12];
    let total: u32 = base
        .bytes()
        .enumerate()
        .map(|(i, b)| (10 - i as u32) * u32::from(b - b'0'))
        .sum();
    let check = (11 - total % 11) % 11;
    let check_char = if check == 10 { 'X' } else { char::from_digit(check, 10)? };

    Some(format!("{base}{check_char}"))
}

/// Format heuristic: ISBN-10 shape (9 digits + digit/X) or ISBN-13 shape
/// (13 digits starting with 978/979). Checksums are not verified.
pub fn is_isbn(value: &str) -> bool {
    let clean = normalize_isbn(value).to_uppercase();
    let bytes = clean.as_bytes();
    match bytes.len() {
        10 => bytes[..9].iter().all(u8::is_ascii_digit) && (bytes[9].is_ascii_digit() || bytes[9] == b'X'),
        13 => bytes.iter().all(u8::is_ascii_digit) && (clean.starts_with("978") || clean.starts_with("979")),
        _ => false,
    }
}

/// Format heuristic: ten alphanumeric characters once hyphens are removed.
pub fn is_asin(value: &str) -> bool {
    let clean: String = value.chars().filter(|c| *c != '-').collect();
    clean.len() == 10 && clean.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Whether a trimmed query should bypass keyword search and be looked up directly.
pub fn is_direct_lookup(query: &str) -> bool {
    DIRECT_LOOKUP.is_match(query)
}

/// Identifiers worth trying as an ASIN for a book known only by ISBN.
///
/// Older audiobooks frequently use their ISBN-10 as ASIN, so it is tried first.
pub fn candidate_asins(isbn_10: Option<&str>, isbn_13: Option<&str>) -> Vec<String> {
    [isbn_10, isbn_13]
        .into_iter()
        .flatten()
        .map(normalize_isbn)
        .filter(|s| !s.is_empty())
        .collect()
}

fn isbn13_check_digit(first_twelve: &[u8]) -> u32 {
    let total: u32 = first_twelve
        .iter()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    (10 - total % 10) % 10
}
