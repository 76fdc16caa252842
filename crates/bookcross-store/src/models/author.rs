//! Author entity

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, SqlValue};
use crate::error::PersistenceError;

/// A book author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
}

impl Entity for Author {
    const TABLE: &'static str = "author";

    fn columns() -> &'static [&'static str] {
        &["id", "first_name", "last_name", "middle_name"]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.id),
            SqlValue::Text(self.first_name.clone()),
            SqlValue::Text(self.last_name.clone()),
            SqlValue::from(self.middle_name.clone()),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Result<Self, PersistenceError> {
        match values {
            [SqlValue::Int(id), SqlValue::Text(first_name), SqlValue::Text(last_name), middle_name] => {
                Ok(Self {
                    id: *id,
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    middle_name: middle_name.as_text().map(str::to_owned),
                })
            }
            _ => Err(PersistenceError::RowShape(Self::TABLE)),
        }
    }

    fn key(&self) -> Vec<(&'static str, SqlValue)> {
        vec![(Self::ID_COLUMN, SqlValue::Int(self.id))]
    }
}
