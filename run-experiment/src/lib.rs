pub mod aggregate;
pub mod cloze;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod morphology;
pub mod scorer;
pub mod summary;
