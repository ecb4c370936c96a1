pub mod auth;
pub mod books;
pub mod categories;
pub mod imports;
pub mod orders;
