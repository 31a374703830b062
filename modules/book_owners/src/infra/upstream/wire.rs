//! JSON records of the upstream `/api/v1/bookowners` payload.
//!
//! Field names are camelCase; PascalCase spellings are accepted as aliases.

use serde::{Deserialize, Deserializer};

use crate::contract::model::{Book, Owner};

#[derive(Debug, Deserialize)]
pub struct OwnerRecord {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Age")]
    pub age: i32,
    #[serde(default, alias = "Books", deserialize_with = "null_as_empty")]
    pub books: Vec<BookRecord>,
}

#[derive(Debug, Deserialize)]
pub struct BookRecord {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(rename = "type", alias = "Type")]
    pub kind: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<BookRecord> for Book {
    fn from(r: BookRecord) -> Self {
        Self {
            name: r.name,
            kind: r.kind,
        }
    }
}

impl From<OwnerRecord> for Owner {
    fn from(r: OwnerRecord) -> Self {
        Self {
            name: r.name,
            age: r.age,
            books: r.books.into_iter().map(Book::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners(json: &str) -> Vec<Owner> {
        serde_json::from_str::<Vec<OwnerRecord>>(json)
            .unwrap()
            .into_iter()
            .map(Owner::from)
            .collect()
    }

    #[test]
    fn null_and_missing_books_become_empty() {
        let parsed = owners(
            r#"[
                {"name": "Null", "age": 30, "books": null},
                {"name": "Missing", "age": 12},
                {"name": "Empty", "age": 44, "books": []}
            ]"#,
        );
        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(|o| o.books.is_empty()));
    }

    #[test]
    fn type_field_maps_to_kind() {
        let parsed = owners(
            r#"[{"name": "Ann", "age": 9, "books": [{"name": "Atlas", "type": "Hardcover"}]}]"#,
        );
        assert_eq!(
            parsed[0].books,
            vec![Book {
                name: "Atlas".into(),
                kind: "Hardcover".into()
            }]
        );
    }

    #[test]
    fn pascal_case_fields_are_accepted() {
        let parsed = owners(
            r#"[{"Name": "Bob", "Age": 41, "Books": [{"Name": "Dune", "Type": "Paperback"}]}]"#,
        );
        assert_eq!(parsed[0].name, "Bob");
        assert_eq!(parsed[0].age, 41);
        assert_eq!(parsed[0].books[0].kind, "Paperback");
    }

    #[test]
    fn wrong_shape_is_an_error() {
        assert!(serde_json::from_str::<Vec<OwnerRecord>>(r#"[{"name": "X", "age": "old"}]"#).is_err());
        assert!(serde_json::from_str::<Vec<OwnerRecord>>(r#"{"owners": []}"#).is_err());
    }
}
