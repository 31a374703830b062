//! Book owners module.
//!
//! Fetches owners and their books from the upstream book-owners service and
//! serves the books grouped by owner age category at
//! `GET /api/owners/booksbycategory`.

pub mod config;
pub mod module;

pub mod contract {
    pub mod client;
    pub mod error;
    pub mod model;
}

pub mod domain {
    pub mod categorizer;
    pub mod error;
    pub mod ports;
    pub mod service;
}

pub mod gateways {
    pub mod local;
}

pub mod infra {
    pub mod upstream {
        pub mod http_owners_client;
        pub mod wire;
    }
}

pub mod api {
    pub mod rest {
        pub mod dto;
        pub mod handlers;
        pub mod routes;
    }
}

pub use config::BookOwnersConfig;
pub use contract::{
    client::BookOwnersApi,
    error::BookOwnersError,
    model::{AgeCategory, Book, BookDetail, CategorizedBooks, Owner},
};
pub use module::{BookOwnersModule, MODULE_NAME};
