//! Book CSV reader.
//!
//! Expected header: `id,title,price,rating,availability,category,image_url`.
//! Every row is checked against the catalog invariants; the first bad row
//! rejects the whole file.

use std::io::Read;
use std::path::Path;

use books_domain::Book;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

#[derive(Debug, Deserialize)]
struct CsvRow {
    id: i64,
    title: String,
    price: f64,
    rating: i32,
    availability: i64,
    category: String,
    image_url: Option<String>,
}

impl From<CsvRow> for Book {
    fn from(row: CsvRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            price: row.price,
            rating: row.rating,
            availability: row.availability,
            category: row.category,
            image_url: row.image_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Read and validate every book in the file at `path`.
pub fn read_books(path: impl AsRef<Path>) -> Result<Vec<Book>> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_books(file)
}

/// Read and validate every book from a CSV stream.
pub fn parse_books<R: Read>(reader: R) -> Result<Vec<Book>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut books = Vec::new();

    for record in reader.deserialize::<CsvRow>() {
        let row = record?;
        let book = Book::from(row);
        book.validate().map_err(|e| PipelineError::InvalidRow {
            line: u64::try_from(books.len()).unwrap_or(u64::MAX) + 2,
            reason: e.to_string(),
        })?;
        books.push(book);
    }

    Ok(books)
}
