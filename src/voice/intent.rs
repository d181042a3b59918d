//! Spoken command interpretation
//!
//! Maps a lowercase transcript to navigation intents. The phrase set is
//! Spanish, matching the recognizer locale. Interpretation is pure and
//! stateless: unmatched transcripts produce no intents, never an error.

use std::sync::LazyLock;

use regex::Regex;

/// A normalized action derived from a spoken phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Leave kitchen mode, or end the cook session
    Close,
    /// Advance to the next step
    Next,
    /// Go back to the previous step
    Previous,
    /// Read the current step again
    Repeat,
    /// Start a countdown of the given number of minutes (always >= 1)
    StartTimer(u32),
}

static CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cerrar|salir|menú|inicio|atrás").unwrap());
static NEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"siguiente|avanza|próximo|listo|hecho").unwrap());
static PREVIOUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"anterior|vuelve").unwrap());
static REPEAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"repite|lee|qué toca").unwrap());
static TIMER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"temporizador de (\d+) minutos").unwrap());

/// Interpret a lowercase transcript as navigation intents, in the order
/// they should be applied.
///
/// Qualitative phrase groups are tested in a fixed order (Close, Next,
/// Previous, Repeat) and the first match wins. The timer phrase is an
/// independent check: it contributes its intent whether or not a
/// qualitative group matched, so a single utterance can advance a step and
/// arm a countdown. A timer phrase with zero minutes contributes nothing.
#[must_use]
pub fn interpret(transcript: &str) -> Vec<Intent> {
    let mut intents = Vec::new();

    if CLOSE.is_match(transcript) {
        intents.push(Intent::Close);
    } else if NEXT.is_match(transcript) {
        intents.push(Intent::Next);
    } else if PREVIOUS.is_match(transcript) {
        intents.push(Intent::Previous);
    } else if REPEAT.is_match(transcript) {
        intents.push(Intent::Repeat);
    }

    if let Some(caps) = TIMER.captures(transcript)
        && let Ok(minutes) = caps[1].parse::<u32>()
        && minutes > 0
    {
        intents.push(Intent::StartTimer(minutes));
    }

    intents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_phrases() {
        for phrase in ["cerrar", "quiero salir", "vamos al inicio", "atrás por favor"] {
            assert_eq!(interpret(phrase), vec![Intent::Close], "{phrase}");
        }
    }

    #[test]
    fn test_next_phrases() {
        for phrase in ["siguiente paso", "avanza", "próximo", "listo", "ya está hecho"] {
            assert_eq!(interpret(phrase), vec![Intent::Next], "{phrase}");
        }
    }

    #[test]
    fn test_previous_and_repeat() {
        assert_eq!(interpret("paso anterior"), vec![Intent::Previous]);
        assert_eq!(interpret("vuelve"), vec![Intent::Previous]);
        assert_eq!(interpret("repite"), vec![Intent::Repeat]);
        assert_eq!(interpret("lee el paso"), vec![Intent::Repeat]);
        assert_eq!(interpret("qué toca ahora"), vec![Intent::Repeat]);
    }

    #[test]
    fn test_timer() {
        assert_eq!(
            interpret("pon un temporizador de 5 minutos"),
            vec![Intent::StartTimer(5)]
        );
        assert_eq!(
            interpret("temporizador de 45 minutos"),
            vec![Intent::StartTimer(45)]
        );
        // Zero-minute countdowns are rejected rather than fired immediately
        assert_eq!(interpret("temporizador de 0 minutos"), vec![]);
        // Digits are required
        assert_eq!(interpret("temporizador de cinco minutos"), vec![]);
    }

    #[test]
    fn test_timer_is_independent_of_qualitative_matches() {
        // A phrase can both navigate and arm a countdown
        assert_eq!(
            interpret("siguiente y pon un temporizador de 3 minutos"),
            vec![Intent::Next, Intent::StartTimer(3)]
        );
        assert_eq!(
            interpret("listo, temporizador de 10 minutos"),
            vec![Intent::Next, Intent::StartTimer(10)]
        );
        // The rejected zero-minute phrase still leaves the qualitative part
        assert_eq!(
            interpret("siguiente y temporizador de 0 minutos"),
            vec![Intent::Next]
        );
    }

    #[test]
    fn test_close_wins_evaluation_order() {
        // A phrase matching several groups resolves by fixed order
        assert_eq!(interpret("salir al siguiente"), vec![Intent::Close]);
        assert_eq!(interpret("siguiente, no, anterior"), vec![Intent::Next]);
    }

    #[test]
    fn test_unmatched_is_empty() {
        assert_eq!(interpret(""), vec![]);
        assert_eq!(interpret("hola buenas tardes"), vec![]);
        assert_eq!(interpret("the weather is nice"), vec![]);
    }

    #[test]
    fn test_huge_minute_counts_are_parsed_verbatim() {
        // Saturation is the cook session's job; interpretation stays literal
        assert_eq!(
            interpret("temporizador de 4294967295 minutos"),
            vec![Intent::StartTimer(u32::MAX)]
        );
        // Counts that do not fit in u32 fail the parse and contribute nothing
        assert_eq!(interpret("temporizador de 99999999999 minutos"), vec![]);
    }
}
