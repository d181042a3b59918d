//! Cocina - hands-free recipe assistant
//!
//! This library provides the core functionality for cocina:
//! - Voice-driven cooking navigation (session controller, STT, TTS)
//! - Spanish voice command interpretation
//! - Recipe catalog browsing and filtering
//! - Favorites and shopping-list persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        CLI  │  Guided cooking loop  │  Voice        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Voice Session                        │
//! │  State machine │ Recognizer │ Synthesizer │ Intents │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Domain                            │
//! │   Catalog  │  Cook session  │  Favorites/Shopping   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod cook;
pub mod db;
pub mod error;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
