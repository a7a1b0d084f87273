//! Google Books `volumes` response types and normalization.

use abr_core::book::parse_release_date;
use abr_core::isbn::normalize_isbn;
use abr_core::{BookRecord, BookSource};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(rename = "volumeInfo", default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub published_date: Option<String>,
    #[serde(default)]
    pub industry_identifiers: Vec<IndustryIdentifier>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
}

impl VolumeInfo {
    /// (ISBN-10, ISBN-13), hyphens and spaces stripped.
    fn isbns(&self) -> (Option<String>, Option<String>) {
        let find = |kind: &str| {
            self.industry_identifiers
                .iter()
                .find(|i| i.kind == kind)
                .map(|i| normalize_isbn(&i.identifier))
                .filter(|i| !i.is_empty())
        };
        (find("ISBN_10"), find("ISBN_13"))
    }
}

impl From<Volume> for BookRecord {
    fn from(volume: Volume) -> Self {
        let (isbn_10, isbn_13) = volume.volume_info.isbns();
        let info = volume.volume_info;
        let cover_image = info.image_links.and_then(|links| links.thumbnail.or(links.small_thumbnail));

        BookRecord {
            isbn_10,
            isbn_13,
            external_id: Some(volume.id),
            subtitle: info.subtitle.filter(|s| !s.is_empty()),
            authors: info.authors,
            cover_image,
            release_date: info.published_date.as_deref().and_then(parse_release_date),
            ..BookRecord::new(info.title, BookSource::GoogleBooks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const VOLUMES: &str = r#"{
        "kind": "books#volumes",
        "totalItems": 2,
        "items": [
            {
                "id": "zyTCAlFPjgYC",
                "volumeInfo": {
                    "title": "Heaven and Hell",
                    "subtitle": "A History of the Afterlife",
                    "authors": ["Bart D. Ehrman"],
                    "publishedDate": "2020-03-31",
                    "industryIdentifiers": [
                        {"type": "ISBN_13", "identifier": "978-1-79710-102-6"},
                        {"type": "ISBN_10", "identifier": "1797101021"}
                    ],
                    "imageLinks": {
                        "smallThumbnail": "http://books.google.com/small.jpg",
                        "thumbnail": "http://books.google.com/thumb.jpg"
                    }
                }
            },
            {
                "id": "noIsbn0001",
                "volumeInfo": {
                    "title": "Lecture Notes",
                    "publishedDate": "1998",
                    "industryIdentifiers": [{"type": "OTHER", "identifier": "UOM:39015"}],
                    "imageLinks": {"smallThumbnail": "http://books.google.com/only-small.jpg"}
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_volumes() {
        let response: VolumesResponse = serde_json::from_str(VOLUMES).unwrap();
        let books: Vec<BookRecord> = response.items.into_iter().map(BookRecord::from).collect();
        assert_eq!(books.len(), 2);

        let heaven = &books[0];
        assert_eq!(heaven.title, "Heaven and Hell");
        assert_eq!(heaven.isbn_13.as_deref(), Some("9781797101026"));
        assert_eq!(heaven.isbn_10.as_deref(), Some("1797101021"));
        assert_eq!(heaven.external_id.as_deref(), Some("zyTCAlFPjgYC"));
        assert_eq!(heaven.cover_image.as_deref(), Some("http://books.google.com/thumb.jpg"));
        assert_eq!(heaven.release_date, NaiveDate::from_ymd_opt(2020, 3, 31));
        assert_eq!(heaven.source, BookSource::GoogleBooks);
        assert!(heaven.asin.is_none());
        assert!(heaven.narrators.is_empty());

        let notes = &books[1];
        assert!(notes.isbn_10.is_none() && notes.isbn_13.is_none());
        assert!(notes.authors.is_empty());
        assert_eq!(notes.cover_image.as_deref(), Some("http://books.google.com/only-small.jpg"));
        assert_eq!(notes.release_date, NaiveDate::from_ymd_opt(1998, 1, 1));
    }

    #[test]
    fn test_parse_no_items() {
        let response: VolumesResponse = serde_json::from_str(r#"{"kind": "books#volumes", "totalItems": 0}"#).unwrap();
        assert!(response.items.is_empty());
    }
}
