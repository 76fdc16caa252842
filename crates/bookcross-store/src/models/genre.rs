//! Genre entity

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, SqlValue};
use crate::error::PersistenceError;

/// A book genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl Entity for Genre {
    const TABLE: &'static str = "genre";

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Int(self.id), SqlValue::Text(self.name.clone())]
    }

    fn from_values(values: &[SqlValue]) -> Result<Self, PersistenceError> {
        match values {
            [SqlValue::Int(id), SqlValue::Text(name)] => Ok(Self {
                id: *id,
                name: name.clone(),
            }),
            _ => Err(PersistenceError::RowShape(Self::TABLE)),
        }
    }

    fn key(&self) -> Vec<(&'static str, SqlValue)> {
        vec![(Self::ID_COLUMN, SqlValue::Int(self.id))]
    }
}
