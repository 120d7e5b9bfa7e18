pub mod models;
pub mod narma;
pub mod store;
