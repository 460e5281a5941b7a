//! ML feature engineering.
//!
//! Turns catalog rows into flat numeric/boolean feature vectors:
//! min-max normalised price, the raw rating, one-hot categories and one-hot
//! availability buckets.

use books_domain::Book;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Stock level bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityBucket {
    /// No copies in stock
    OutOfStock,
    /// 1 to 10 copies
    Low,
    /// 11 to 20 copies
    Medium,
    /// More than 20 copies
    High,
}

impl AvailabilityBucket {
    /// Every bucket, in feature order
    pub const ALL: [Self; 4] = [Self::OutOfStock, Self::Low, Self::Medium, Self::High];

    /// Bucket for a stock count
    pub const fn from_stock(availability: i64) -> Self {
        match availability {
            i64::MIN..=0 => Self::OutOfStock,
            1..=10 => Self::Low,
            11..=20 => Self::Medium,
            _ => Self::High,
        }
    }

    /// Snake-case label
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfStock => "out_of_stock",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn feature_name(self) -> String {
        format!("avail_{}", self.as_str())
    }
}

/// One book's feature vector. One-hot columns are flattened into the
/// object next to the scalar features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Book id
    pub id: i64,
    /// Price scaled to 0..=1 over the sample; 0 when all prices are equal
    pub price_normalized: f64,
    /// Star rating
    pub rating_numerical: i32,
    /// `category_<name>` and `avail_<bucket>` indicators
    #[serde(flatten)]
    pub one_hot: BTreeMap<String, bool>,
}

/// Feature vectors plus their column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    /// Rows
    pub features: Vec<FeatureVector>,
    /// Column names in order: scalars, sorted categories, buckets
    pub feature_names: Vec<String>,
    /// Number of rows
    pub total_samples: usize,
}

/// Build the feature matrix for a sample of books.
pub fn build_features(books: &[Book]) -> FeatureMatrix {
    if books.is_empty() {
        return FeatureMatrix {
            features: Vec::new(),
            feature_names: Vec::new(),
            total_samples: 0,
        };
    }

    let (min_price, max_price) = books
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
            (lo.min(b.price), hi.max(b.price))
        });
    let price_span = max_price - min_price;

    let category_columns: Vec<String> = books
        .iter()
        .map(|b| b.category.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|c| format!("category_{c}"))
        .collect();

    let mut feature_names = vec![
        "id".to_string(),
        "price_normalized".to_string(),
        "rating_numerical".to_string(),
    ];
    feature_names.extend(category_columns.iter().cloned());
    feature_names.extend(AvailabilityBucket::ALL.map(AvailabilityBucket::feature_name));

    let features: Vec<FeatureVector> = books
        .iter()
        .map(|book| {
            let own_category = format!("category_{}", book.category);
            let bucket = AvailabilityBucket::from_stock(book.availability);

            let mut one_hot: BTreeMap<String, bool> = category_columns
                .iter()
                .map(|column| (column.clone(), *column == own_category))
                .collect();
            for candidate in AvailabilityBucket::ALL {
                one_hot.insert(candidate.feature_name(), candidate == bucket);
            }

            FeatureVector {
                id: book.id,
                price_normalized: if price_span > 0.0 {
                    (book.price - min_price) / price_span
                } else {
                    0.0
                },
                rating_numerical: book.rating,
                one_hot,
            }
        })
        .collect();

    FeatureMatrix {
        total_samples: features.len(),
        features,
        feature_names,
    }
}
