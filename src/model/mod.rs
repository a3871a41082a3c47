pub mod field;
pub mod mapping;
pub mod project;
