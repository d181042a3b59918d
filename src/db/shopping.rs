//! Shopping list repository

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// One entry on the shopping list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub checked: bool,
    pub created_at: DateTime<Utc>,
}

/// Shopping list repository
#[derive(Clone)]
pub struct ShoppingRepo {
    pool: DbPool,
}

impl ShoppingRepo {
    /// Create a new shopping list repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add an item to the list, returning its id
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn add(&self, name: &str) -> Result<String> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO shopping_items (id, name, created_at) VALUES (?1, ?2, ?3)",
            [id.as_str(), name, now.as_str()],
        )?;

        Ok(id)
    }

    /// Mark an item as bought
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn check(&self, id: &str) -> Result<()> {
        self.set_checked(id, true)
    }

    /// Mark an item as pending again
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn uncheck(&self, id: &str) -> Result<()> {
        self.set_checked(id, false)
    }

    fn set_checked(&self, id: &str, checked: bool) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "UPDATE shopping_items SET checked = ?1 WHERE id = ?2",
            rusqlite::params![i32::from(checked), id],
        )?;

        Ok(())
    }

    /// Remove one item
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn remove(&self, id: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute("DELETE FROM shopping_items WHERE id = ?1", [id])?;

        Ok(())
    }

    /// Remove every bought item, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn clear_checked(&self) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let removed = conn.execute("DELETE FROM shopping_items WHERE checked = 1", [])?;

        Ok(removed)
    }

    /// All items, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self) -> Result<Vec<ShoppingItem>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, name, checked, created_at FROM shopping_items ORDER BY created_at, id",
        )?;
        let items = stmt
            .query_map([], |row| {
                Ok(ShoppingItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    checked: row.get::<_, i32>(2)? != 0,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
