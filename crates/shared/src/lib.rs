pub mod domain;
pub mod error;
pub mod graphql;
pub mod operations;
pub mod protocol;
