//! Favorite recipe repository

use super::DbPool;
use crate::{Error, Result};

/// Favorite recipe repository
#[derive(Clone)]
pub struct FavoriteRepo {
    pool: DbPool,
}

impl FavoriteRepo {
    /// Create a new favorites repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Mark a recipe as favorite. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn add(&self, recipe_id: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT OR IGNORE INTO favorites (recipe_id) VALUES (?1)",
            [recipe_id],
        )?;

        Ok(())
    }

    /// Remove a recipe from favorites. No-op if absent.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn remove(&self, recipe_id: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute("DELETE FROM favorites WHERE recipe_id = ?1", [recipe_id])?;

        Ok(())
    }

    /// Toggle a recipe's favorite status, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn toggle(&self, recipe_id: &str) -> Result<bool> {
        if self.contains(recipe_id)? {
            self.remove(recipe_id)?;
            Ok(false)
        } else {
            self.add(recipe_id)?;
            Ok(true)
        }
    }

    /// Whether a recipe is a favorite
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn contains(&self, recipe_id: &str) -> Result<bool> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE recipe_id = ?1",
            [recipe_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// All favorite recipe ids, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self) -> Result<Vec<String>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT recipe_id FROM favorites ORDER BY created_at, recipe_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> FavoriteRepo {
        let pool = init_memory().unwrap();
        FavoriteRepo::new(pool)
    }

    #[test]
    fn test_add_is_idempotent() {
        let repo = setup();
        repo.add("gazpacho-andaluz").unwrap();
        repo.add("gazpacho-andaluz").unwrap();
        assert_eq!(repo.list().unwrap(), vec!["gazpacho-andaluz"]);
    }

    #[test]
    fn test_toggle() {
        let repo = setup();
        assert!(repo.toggle("tortilla-de-patatas").unwrap());
        assert!(repo.contains("tortilla-de-patatas").unwrap());
        assert!(!repo.toggle("tortilla-de-patatas").unwrap());
        assert!(!repo.contains("tortilla-de-patatas").unwrap());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let repo = setup();
        repo.remove("no-such-recipe").unwrap();
        assert!(repo.list().unwrap().is_empty());
    }
}
