//! Catalog domain module (authors and books).
//!
//! This crate holds the entity records, their input schemas (forms) and their
//! public serialization views. It is pure domain logic: no IO, no HTTP, no
//! storage.

pub mod author;
pub mod book;
pub mod form;
pub mod resource;

pub use author::{Author, AuthorData, AuthorFields, AuthorForm, AuthorView};
pub use book::{Book, BookData, BookFields, BookForm, BookView};
pub use form::{Form, FormErrors, Submission, submit};
pub use resource::{FieldsOf, Resource};
