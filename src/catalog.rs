//! Recipe catalog
//!
//! Recipes ship compiled into the binary from `data/recipes.json`, so the
//! catalog works offline with no data directory. Filtering combines a
//! category, a time ceiling, a difficulty, and a free-text query; all
//! criteria are optional and AND-ed together.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Embedded recipe fixtures
const EMBEDDED_RECIPES: &str = include_str!("../data/recipes.json");

/// How demanding a recipe is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "fácil"),
            Self::Medium => write!(f, "media"),
            Self::Hard => write!(f, "difícil"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "easy" | "facil" | "fácil" => Ok(Self::Easy),
            "medium" | "media" => Ok(Self::Medium),
            "hard" | "dificil" | "difícil" => Ok(Self::Hard),
            other => Err(Error::Config(format!("unknown difficulty: {other}"))),
        }
    }
}

/// One ingredient line in a recipe
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Ingredient {
    /// Ingredient name
    pub name: String,

    /// Free-form quantity ("200 g", "2 cucharadas")
    pub quantity: Option<String>,
}

/// A recipe in the catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recipe {
    /// Unique identifier (slug)
    pub id: String,

    /// Display title
    pub title: String,

    /// Category ("desayuno", "plato principal", "postre", ...)
    pub category: String,

    /// Total preparation time in minutes
    pub minutes: u32,

    /// Difficulty rating
    pub difficulty: Difficulty,

    /// Number of servings
    pub servings: u32,

    /// Ingredient list
    pub ingredients: Vec<Ingredient>,

    /// Ordered preparation steps
    pub steps: Vec<String>,
}

/// Criteria for narrowing the catalog, AND-ed together
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Exact category match, case-insensitive
    pub category: Option<String>,

    /// Only recipes at or under this many minutes
    pub max_minutes: Option<u32>,

    /// Exact difficulty match
    pub difficulty: Option<Difficulty>,

    /// Case-insensitive substring match on title and ingredient names
    pub query: Option<String>,
}

/// The full recipe collection
#[derive(Debug, Clone)]
pub struct Catalog {
    recipes: Vec<Recipe>,
}

impl Catalog {
    /// Load the embedded catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON fails to parse, which would
    /// indicate a broken build.
    pub fn load() -> Result<Self> {
        let recipes: Vec<Recipe> = serde_json::from_str(EMBEDDED_RECIPES)?;
        Ok(Self { recipes })
    }

    /// All recipes in catalog order
    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Look up a recipe by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecipeNotFound`] if no recipe has the given id.
    pub fn get(&self, id: &str) -> Result<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::RecipeNotFound(id.to_string()))
    }

    /// Recipes matching every criterion in the filter
    #[must_use]
    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| Self::matches(r, filter))
            .collect()
    }

    fn matches(recipe: &Recipe, filter: &CatalogFilter) -> bool {
        if let Some(category) = &filter.category
            && !recipe.category.eq_ignore_ascii_case(category)
        {
            return false;
        }

        if let Some(max) = filter.max_minutes
            && recipe.minutes > max
        {
            return false;
        }

        if let Some(difficulty) = filter.difficulty
            && recipe.difficulty != difficulty
        {
            return false;
        }

        if let Some(query) = &filter.query {
            let query = query.to_lowercase();
            let in_title = recipe.title.to_lowercase().contains(&query);
            let in_ingredients = recipe
                .ingredients
                .iter()
                .any(|i| i.name.to_lowercase().contains(&query));
            if !in_title && !in_ingredients {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_parses() {
        let catalog = Catalog::load().unwrap();
        assert!(!catalog.recipes().is_empty());
        for recipe in catalog.recipes() {
            assert!(!recipe.steps.is_empty(), "recipe {} has no steps", recipe.id);
            assert!(
                !recipe.ingredients.is_empty(),
                "recipe {} has no ingredients",
                recipe.id
            );
        }
    }

    #[test]
    fn get_by_id() {
        let catalog = Catalog::load().unwrap();
        let first = &catalog.recipes()[0];
        assert_eq!(catalog.get(&first.id).unwrap().title, first.title);
        assert!(matches!(
            catalog.get("no-such-recipe"),
            Err(Error::RecipeNotFound(_))
        ));
    }

    #[test]
    fn filter_by_max_minutes() {
        let catalog = Catalog::load().unwrap();
        let quick = catalog.filter(&CatalogFilter {
            max_minutes: Some(20),
            ..CatalogFilter::default()
        });
        assert!(quick.iter().all(|r| r.minutes <= 20));
        assert!(quick.len() < catalog.recipes().len());
    }

    #[test]
    fn filter_by_query_matches_ingredients() {
        let catalog = Catalog::load().unwrap();
        let with_eggs = catalog.filter(&CatalogFilter {
            query: Some("huevo".to_string()),
            ..CatalogFilter::default()
        });
        assert!(!with_eggs.is_empty());
        for recipe in with_eggs {
            let hit = recipe.title.to_lowercase().contains("huevo")
                || recipe
                    .ingredients
                    .iter()
                    .any(|i| i.name.to_lowercase().contains("huevo"));
            assert!(hit, "recipe {} does not mention huevo", recipe.id);
        }
    }

    #[test]
    fn filter_combines_criteria() {
        let catalog = Catalog::load().unwrap();
        let filtered = catalog.filter(&CatalogFilter {
            difficulty: Some(Difficulty::Easy),
            max_minutes: Some(30),
            ..CatalogFilter::default()
        });
        assert!(
            filtered
                .iter()
                .all(|r| r.difficulty == Difficulty::Easy && r.minutes <= 30)
        );
    }
}
