pub mod codes;
pub mod error;
pub mod repos;
pub mod service;
pub mod validation;
