use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{AgeCategory, BookDetail, CategorizedBooks};

/// Owner age category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AgeCategoryDto {
    Child,
    Adult,
}

/// A book together with its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetailDto {
    pub book_name: String,
    pub book_type: String,
    pub owner_name: String,
    pub age: i32,
}

/// Books of one age category, sorted by book name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedBooksDto {
    pub age_category: AgeCategoryDto,
    pub books: Vec<BookDetailDto>,
}

/// Query string of `GET /api/owners/booksbycategory`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BooksByCategoryQuery {
    #[serde(
        rename = "hardcoverOnly",
        default,
        deserialize_with = "bool_ignore_case"
    )]
    pub hardcover_only: bool,
}

/// `true` / `false` in any ASCII case, surrounding whitespace ignored.
fn bool_ignore_case<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(de::Error::invalid_value(
            de::Unexpected::Str(raw),
            &"`true` or `false`",
        ))
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<AgeCategory> for AgeCategoryDto {
    fn from(c: AgeCategory) -> Self {
        match c {
            AgeCategory::Child => Self::Child,
            AgeCategory::Adult => Self::Adult,
        }
    }
}

impl From<BookDetail> for BookDetailDto {
    fn from(d: BookDetail) -> Self {
        Self {
            book_name: d.book_name,
            book_type: d.book_type,
            owner_name: d.owner_name,
            age: d.age,
        }
    }
}

impl From<CategorizedBooks> for CategorizedBooksDto {
    fn from(c: CategorizedBooks) -> Self {
        Self {
            age_category: c.age_category.into(),
            books: c.books.into_iter().map(BookDetailDto::from).collect(),
        }
    }
}
