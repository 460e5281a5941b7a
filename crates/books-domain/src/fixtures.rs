//! Generated sample data for tests.

use fake::Fake;
use fake::faker::lorem::en::Sentence;

use crate::Book;

const CATEGORIES: [&str; 5] = ["Poetry", "Mystery", "Travel", "Science", "Fiction"];

/// A valid book with a random title. Category is derived from `id` so
/// that generated sets spread evenly over [`CATEGORIES`].
pub fn sample_book(id: i64) -> Book {
    let idx = usize::try_from(id.rem_euclid(5)).unwrap_or_default();
    Book {
        id,
        title: Sentence(1..5).fake(),
        price: (1.0..60.0).fake::<f64>(),
        rating: (1..6).fake(),
        availability: (0..30).fake(),
        category: CATEGORIES[idx].to_string(),
        image_url: Some(format!("https://books.example/media/{id}.jpg")),
    }
}

/// `count` books with ids `1..=count`
pub fn sample_books(count: i64) -> Vec<Book> {
    (1..=count).map(sample_book).collect()
}
