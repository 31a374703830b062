use crate::contract::model::{AgeCategory, BookDetail, CategorizedBooks, Owner};

/// Group the owners' books by owner age category.
///
/// With `hardcover_only` set, only books whose type is exactly `"Hardcover"`
/// are kept. Buckets appear in the order their first book was seen and only
/// non-empty buckets are returned. Books within a bucket are sorted by name
/// (byte-wise, stable for equal names).
pub fn categorize(owners: &[Owner], hardcover_only: bool) -> Vec<CategorizedBooks> {
    let mut buckets: Vec<CategorizedBooks> = Vec::new();

    for owner in owners {
        let category = AgeCategory::for_age(owner.age);
        let kept = owner
            .books
            .iter()
            .filter(|book| !hardcover_only || book.is_hardcover());

        for book in kept {
            let detail = BookDetail {
                book_name: book.name.clone(),
                book_type: book.kind.clone(),
                owner_name: owner.name.clone(),
                age: owner.age,
            };
            match buckets.iter_mut().find(|b| b.age_category == category) {
                Some(bucket) => bucket.books.push(detail),
                None => buckets.push(CategorizedBooks {
                    age_category: category,
                    books: vec![detail],
                }),
            }
        }
    }

    for bucket in &mut buckets {
        bucket.books.sort_by(|a, b| a.book_name.cmp(&b.book_name));
    }
    buckets
}
