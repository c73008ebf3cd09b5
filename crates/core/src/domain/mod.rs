pub mod claim;
pub mod document;
pub mod profile;
