//! BookCross domain model
//!
//! Relational entities (books, authors, genres and their join rows) and
//! the comment-thread documents, wired to the generic persistence traits.

mod author;
mod book;
mod comments;
mod genre;

pub use author::Author;
pub use book::{Book, BookAuthor, BookGenre, BOOK_AUTHORS, BOOK_GENRES};
pub use comments::{BookChildComment, BookRootComment};
pub use genre::Genre;
