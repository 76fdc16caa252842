//! Book aggregate and its association rows

use serde::{Deserialize, Serialize};

use crate::associations::{Aggregate, AssociationKind};
use crate::entity::{Entity, SqlValue};
use crate::error::PersistenceError;

/// The book's author links
pub const BOOK_AUTHORS: AssociationKind = AssociationKind {
    table: "book_author",
    owner_column: "book_id",
    related_column: "author_id",
};

/// The book's genre links
pub const BOOK_GENRES: AssociationKind = AssociationKind {
    table: "book_genre",
    owner_column: "book_id",
    related_column: "genre_id",
};

const BOOK_ASSOCIATIONS: [AssociationKind; 2] = [BOOK_AUTHORS, BOOK_GENRES];

/// A book offered for exchange
///
/// `authors` and `genres` are the association payload, not columns: they
/// carry the *full* new id set for the replace-all update. `None` means
/// the kind is absent from the payload and stays untouched; an empty
/// vector clears the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub user_id: Option<i64>,
    pub publisher: Option<String>,
    pub available: bool,
    pub notice: Option<String>,

    /// Author ids for the replace-all update, if included in the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<i64>>,

    /// Genre ids for the replace-all update, if included in the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<i64>>,
}

impl Entity for Book {
    const TABLE: &'static str = "book";

    fn columns() -> &'static [&'static str] {
        &["id", "name", "user_id", "publisher", "available", "notice"]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.id),
            SqlValue::Text(self.name.clone()),
            self.user_id.map(SqlValue::Int).unwrap_or(SqlValue::Null),
            SqlValue::from(self.publisher.clone()),
            SqlValue::Bool(self.available),
            SqlValue::from(self.notice.clone()),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Result<Self, PersistenceError> {
        match values {
            [SqlValue::Int(id), SqlValue::Text(name), user_id, publisher, SqlValue::Bool(available), notice] => {
                Ok(Self {
                    id: *id,
                    name: name.clone(),
                    user_id: user_id.as_int(),
                    publisher: publisher.as_text().map(str::to_owned),
                    available: *available,
                    notice: notice.as_text().map(str::to_owned),
                    authors: None,
                    genres: None,
                })
            }
            _ => Err(PersistenceError::RowShape(Self::TABLE)),
        }
    }

    fn key(&self) -> Vec<(&'static str, SqlValue)> {
        vec![(Self::ID_COLUMN, SqlValue::Int(self.id))]
    }
}

impl Aggregate for Book {
    fn id(&self) -> i64 {
        self.id
    }

    fn association_kinds() -> &'static [AssociationKind] {
        &BOOK_ASSOCIATIONS
    }

    fn association_ids(&self, kind: &AssociationKind) -> Option<Vec<i64>> {
        if kind.table == BOOK_AUTHORS.table {
            self.authors.clone()
        } else if kind.table == BOOK_GENRES.table {
            self.genres.clone()
        } else {
            None
        }
    }
}

/// Join row linking a book to an author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookAuthor {
    pub book_id: i64,
    pub author_id: i64,
}

impl Entity for BookAuthor {
    const TABLE: &'static str = "book_author";
    const ID_COLUMN: &'static str = "book_id";

    fn columns() -> &'static [&'static str] {
        &["book_id", "author_id"]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Int(self.book_id), SqlValue::Int(self.author_id)]
    }

    fn from_values(values: &[SqlValue]) -> Result<Self, PersistenceError> {
        match values {
            [SqlValue::Int(book_id), SqlValue::Int(author_id)] => Ok(Self {
                book_id: *book_id,
                author_id: *author_id,
            }),
            _ => Err(PersistenceError::RowShape(Self::TABLE)),
        }
    }

    fn key(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("book_id", SqlValue::Int(self.book_id)),
            ("author_id", SqlValue::Int(self.author_id)),
        ]
    }
}

/// Join row linking a book to a genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookGenre {
    pub book_id: i64,
    pub genre_id: i64,
}

impl Entity for BookGenre {
    const TABLE: &'static str = "book_genre";
    const ID_COLUMN: &'static str = "book_id";

    fn columns() -> &'static [&'static str] {
        &["book_id", "genre_id"]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Int(self.book_id), SqlValue::Int(self.genre_id)]
    }

    fn from_values(values: &[SqlValue]) -> Result<Self, PersistenceError> {
        match values {
            [SqlValue::Int(book_id), SqlValue::Int(genre_id)] => Ok(Self {
                book_id: *book_id,
                genre_id: *genre_id,
            }),
            _ => Err(PersistenceError::RowShape(Self::TABLE)),
        }
    }

    fn key(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("book_id", SqlValue::Int(self.book_id)),
            ("genre_id", SqlValue::Int(self.genre_id)),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book {
            id: 7,
            name: "The Dispossessed".to_string(),
            user_id: Some(11),
            publisher: None,
            available: true,
            notice: None,
            authors: Some(vec![2, 3]),
            genres: None,
        }
    }

    #[test]
    fn test_scalar_round_trip_drops_association_payload() {
        let loaded = Book::from_values(&book().values()).unwrap();
        assert_eq!(loaded.id, 7);
        assert_eq!(loaded.name, "The Dispossessed");
        // The payload fields are not columns and never round-trip.
        assert_eq!(loaded.authors, None);
        assert_eq!(loaded.genres, None);
    }

    #[test]
    fn test_association_payload_inclusion() {
        let book = book();
        assert_eq!(book.association_ids(&BOOK_AUTHORS), Some(vec![2, 3]));
        assert_eq!(book.association_ids(&BOOK_GENRES), None);
    }

    #[test]
    fn test_join_rows_have_composite_keys() {
        let link = BookAuthor {
            book_id: 7,
            author_id: 2,
        };
        assert_eq!(link.key().len(), 2);
    }
}
