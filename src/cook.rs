//! Guided cooking session
//!
//! Owns the domain state the voice loop mutates: the current step index,
//! the countdown timer, ingredient checks, and kitchen mode. Intents come
//! in, and each mutation that changes what the cook should hear comes back
//! out as a phrase for the synthesizer.

use crate::catalog::Recipe;
use crate::voice::Intent;
use crate::{Error, Result};

/// Countdown timer for a recipe step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    /// Seconds left
    pub remaining: u32,

    /// Seconds the countdown started from
    pub total: u32,
}

/// What a session produced in response to an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Phrase to speak aloud, if the action warrants one
    pub speak: Option<String>,

    /// The cook asked to leave the recipe entirely
    pub closed: bool,
}

impl Reply {
    fn silent() -> Self {
        Self { speak: None, closed: false }
    }

    fn spoken(text: String) -> Self {
        Self { speak: Some(text), closed: false }
    }
}

/// State of one recipe being cooked
#[derive(Debug, Clone)]
pub struct CookSession {
    recipe: Recipe,
    step: usize,
    kitchen_mode: bool,
    timer: Option<Timer>,
    checked: Vec<bool>,
}

impl CookSession {
    /// Start a session at the first step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRecipe`] if the recipe has no steps; every
    /// other operation indexes the step list unconditionally.
    pub fn new(recipe: Recipe, kitchen_mode: bool) -> Result<Self> {
        if recipe.steps.is_empty() {
            return Err(Error::EmptyRecipe(recipe.id));
        }
        let checked = vec![false; recipe.ingredients.len()];
        Ok(Self { recipe, step: 0, kitchen_mode, timer: None, checked })
    }

    /// The recipe being cooked
    #[must_use]
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Current 0-based step index
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Whether the large-display mode is active
    #[must_use]
    pub fn kitchen_mode(&self) -> bool {
        self.kitchen_mode
    }

    /// Active countdown, if any
    #[must_use]
    pub fn timer(&self) -> Option<Timer> {
        self.timer
    }

    /// Toggle an ingredient's checked-off state
    pub fn toggle_ingredient(&mut self, index: usize) {
        if let Some(slot) = self.checked.get_mut(index) {
            *slot = !*slot;
        }
    }

    /// Whether an ingredient has been checked off
    #[must_use]
    pub fn ingredient_checked(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    /// Spoken announcement for the current step
    #[must_use]
    pub fn announce_step(&self) -> String {
        format!("Paso {}. {}", self.step + 1, self.recipe.steps[self.step])
    }

    /// Apply one intent to the session.
    ///
    /// Step moves are clamped at the recipe bounds; an out-of-bounds move
    /// changes nothing and stays silent. Close leaves kitchen mode first
    /// when it is active, and closes the session otherwise.
    pub fn apply(&mut self, intent: &Intent) -> Reply {
        match intent {
            Intent::Close => {
                if self.kitchen_mode {
                    self.kitchen_mode = false;
                    Reply::silent()
                } else {
                    Reply { speak: None, closed: true }
                }
            }
            Intent::Next => {
                if self.step + 1 < self.recipe.steps.len() {
                    self.step += 1;
                    Reply::spoken(self.announce_step())
                } else {
                    Reply::silent()
                }
            }
            Intent::Previous => {
                if self.step > 0 {
                    self.step -= 1;
                    Reply::spoken(self.announce_step())
                } else {
                    Reply::silent()
                }
            }
            Intent::Repeat => Reply::spoken(self.announce_step()),
            Intent::StartTimer(minutes) => {
                // Absurd spoken counts saturate instead of overflowing
                let total = minutes.saturating_mul(60);
                self.timer = Some(Timer { remaining: total, total });
                Reply::spoken(format!("Temporizador de {minutes} minutos en marcha."))
            }
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns the expiry announcement when the countdown reaches zero;
    /// the timer deactivates at that moment.
    pub fn tick(&mut self) -> Option<String> {
        let timer = self.timer.as_mut()?;
        timer.remaining = timer.remaining.saturating_sub(1);
        if timer.remaining == 0 {
            self.timer = None;
            return Some("El temporizador ha terminado.".to_string());
        }
        None
    }

    /// Render the session for the terminal
    #[must_use]
    pub fn render(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        if self.kitchen_mode {
            let _ = writeln!(out, "==================== MODO COCINA ====================");
        }
        let _ = writeln!(out, "{}", self.recipe.title);
        let _ = writeln!(
            out,
            "Paso {}/{}",
            self.step + 1,
            self.recipe.steps.len()
        );
        if !self.kitchen_mode {
            let _ = writeln!(out, "\nIngredientes:");
            for (i, ingredient) in self.recipe.ingredients.iter().enumerate() {
                let mark = if self.checked[i] { "x" } else { " " };
                match &ingredient.quantity {
                    Some(q) => {
                        let _ = writeln!(out, "  [{mark}] {}. {} ({q})", i + 1, ingredient.name);
                    }
                    None => {
                        let _ = writeln!(out, "  [{mark}] {}. {}", i + 1, ingredient.name);
                    }
                }
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "  {}", self.recipe.steps[self.step]);
        if let Some(timer) = self.timer {
            let _ = writeln!(
                out,
                "\n  Temporizador: {:02}:{:02}",
                timer.remaining / 60,
                timer.remaining % 60
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Difficulty, Ingredient};

    fn recipe() -> Recipe {
        Recipe {
            id: "test".to_string(),
            title: "Prueba".to_string(),
            category: "test".to_string(),
            minutes: 10,
            difficulty: Difficulty::Easy,
            servings: 2,
            ingredients: vec![Ingredient { name: "sal".to_string(), quantity: None }],
            steps: vec![
                "Primer paso.".to_string(),
                "Segundo paso.".to_string(),
                "Tercer paso.".to_string(),
            ],
        }
    }

    #[test]
    fn next_advances_and_announces() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        let reply = session.apply(&Intent::Next);
        assert_eq!(session.step(), 1);
        assert_eq!(reply.speak.as_deref(), Some("Paso 2. Segundo paso."));
        assert!(!reply.closed);
    }

    #[test]
    fn bounds_are_clamped_silently() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        let reply = session.apply(&Intent::Previous);
        assert_eq!(session.step(), 0);
        assert_eq!(reply.speak, None);

        session.apply(&Intent::Next);
        session.apply(&Intent::Next);
        assert_eq!(session.step(), 2);
        let reply = session.apply(&Intent::Next);
        assert_eq!(session.step(), 2);
        assert_eq!(reply.speak, None);
    }

    #[test]
    fn repeat_reannounces_current_step() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        session.apply(&Intent::Next);
        let reply = session.apply(&Intent::Repeat);
        assert_eq!(session.step(), 1);
        assert_eq!(reply.speak.as_deref(), Some("Paso 2. Segundo paso."));
    }

    #[test]
    fn close_exits_kitchen_mode_before_closing() {
        let mut session = CookSession::new(recipe(), true).unwrap();
        let reply = session.apply(&Intent::Close);
        assert!(!reply.closed);
        assert!(!session.kitchen_mode());

        let reply = session.apply(&Intent::Close);
        assert!(reply.closed);
    }

    #[test]
    fn new_timer_replaces_existing() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        session.apply(&Intent::StartTimer(5));
        assert_eq!(session.timer(), Some(Timer { remaining: 300, total: 300 }));

        session.tick();
        session.apply(&Intent::StartTimer(2));
        assert_eq!(session.timer(), Some(Timer { remaining: 120, total: 120 }));
    }

    #[test]
    fn timer_expires_with_announcement() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        session.apply(&Intent::StartTimer(1));
        for _ in 0..59 {
            assert_eq!(session.tick(), None);
        }
        assert_eq!(
            session.tick().as_deref(),
            Some("El temporizador ha terminado.")
        );
        assert_eq!(session.timer(), None);
        assert_eq!(session.tick(), None);
    }

    #[test]
    fn absurd_timer_counts_saturate() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        let reply = session.apply(&Intent::StartTimer(u32::MAX));
        assert!(reply.speak.is_some());
        assert_eq!(
            session.timer(),
            Some(Timer { remaining: u32::MAX, total: u32::MAX })
        );
    }

    #[test]
    fn recipes_without_steps_are_rejected() {
        let mut empty = recipe();
        empty.steps.clear();
        assert!(matches!(
            CookSession::new(empty, false),
            Err(crate::Error::EmptyRecipe(_))
        ));
    }

    #[test]
    fn render_lists_ingredient_checks() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        assert!(session.render().contains("[ ] 1. sal"));
        session.toggle_ingredient(0);
        assert!(session.render().contains("[x] 1. sal"));

        // Kitchen mode keeps the large display on the current step only
        let session = CookSession::new(recipe(), true).unwrap();
        assert!(!session.render().contains("Ingredientes"));
    }

    #[test]
    fn ingredient_checks_toggle() {
        let mut session = CookSession::new(recipe(), false).unwrap();
        assert!(!session.ingredient_checked(0));
        session.toggle_ingredient(0);
        assert!(session.ingredient_checked(0));
        session.toggle_ingredient(0);
        assert!(!session.ingredient_checked(0));
        session.toggle_ingredient(99);
    }
}
