//! Catalog clients for abr.
//!
//! Each client wraps one upstream HTTP API and implements
//! [`abr_core::CatalogAdapter`], normalizing responses into
//! [`abr_core::BookRecord`]s:
//!
//! - [`AudibleClient`]: keyword search, ASIN lookup, and suggestions
//! - [`GoogleBooksClient`]: keyword, author, and ISBN search
//! - [`OpenLibraryClient`]: keyword, author, and ISBN search

pub mod audible;
pub mod error;
pub mod google_books;
pub mod http;
pub mod openlibrary;

pub use audible::{AudibleClient, AudibleEndpoints};
pub use error::CatalogError;
pub use google_books::GoogleBooksClient;
pub use http::{CatalogHttp, HttpConfig};
pub use openlibrary::OpenLibraryClient;
