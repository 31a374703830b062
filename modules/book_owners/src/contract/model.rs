use std::fmt;

/// Age bucket of an owner. Owners under 18 are children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeCategory {
    Child,
    Adult,
}

impl AgeCategory {
    pub const ADULT_AGE: i32 = 18;

    pub fn for_age(age: i32) -> Self {
        if age < Self::ADULT_AGE {
            Self::Child
        } else {
            Self::Adult
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Child => "Child",
            Self::Adult => "Adult",
        }
    }
}

impl fmt::Display for AgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book as reported by the upstream service (no serde)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub name: String,
    /// Free-form binding, e.g. "Hardcover" or "Paperback".
    pub kind: String,
}

impl Book {
    pub const HARDCOVER: &'static str = "Hardcover";

    /// Exact, case-sensitive match on the binding.
    pub fn is_hardcover(&self) -> bool {
        self.kind == Self::HARDCOVER
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub age: i32,
    /// Never null; an absent list upstream becomes empty.
    pub books: Vec<Book>,
}

/// One book together with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetail {
    pub book_name: String,
    pub book_type: String,
    pub owner_name: String,
    pub age: i32,
}

/// Books of one age category, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedBooks {
    pub age_category: AgeCategory,
    pub books: Vec<BookDetail>,
}
