//! Voice pipeline integration tests
//!
//! Drives the session controller with scripted adapters instead of audio
//! hardware, checking the full listen, interpret, speak, resume cycle.

use std::time::Duration;

use cocina::voice::session::{RestartDelays, SessionEvent, SessionStatus, VoiceSession};
use cocina::voice::{Intent, RecognitionErrorKind, interpret};

mod common;

use common::{ScriptedRecognizer, ScriptedSynthesizer};

/// Short delays so restart timers fire within the test
fn test_delays() -> RestartDelays {
    RestartDelays {
        recognition: Duration::from_millis(10),
        after_speech: Duration::from_millis(20),
    }
}

async fn recv_restart(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("restart timer did not fire")
        .expect("event channel closed")
}

#[tokio::test]
async fn full_cycle_listen_interpret_speak_resume() {
    let (tx, mut rx) = VoiceSession::channel();
    let (recognizer, rec_calls) = ScriptedRecognizer::new(tx.clone());
    let (synthesizer, syn_calls) = ScriptedSynthesizer::new();
    let mut session = VoiceSession::new(
        Box::new(recognizer),
        Box::new(synthesizer),
        tx.clone(),
        test_delays(),
    );

    session.enable();
    assert_eq!(rec_calls.lock().unwrap().as_slice(), ["start"]);

    session.process(SessionEvent::RecognitionStarted);
    assert_eq!(session.status(), SessionStatus::Listening);

    // A final result hands the transcript back synchronously.
    let transcript = session
        .process(SessionEvent::RecognitionResult("siguiente".to_string()))
        .expect("transcript should be handed back");
    assert_eq!(session.status(), SessionStatus::Processing);
    assert_eq!(interpret(&transcript), vec![Intent::Next]);

    // The caller reacts by speaking; recognition is aborted first.
    session.speak("Paso 2. Segundo paso.");
    assert_eq!(rec_calls.lock().unwrap().as_slice(), ["start", "abort"]);
    assert_eq!(
        syn_calls.lock().unwrap().as_slice(),
        ["cancel", "speak:Paso 2. Segundo paso."]
    );

    session.process(SessionEvent::UtteranceStarted);
    assert_eq!(session.status(), SessionStatus::Speaking);

    // Speech end schedules the resume timer; when it elapses, listening
    // re-arms.
    session.process(SessionEvent::UtteranceFinished);
    session.process(SessionEvent::RecognitionEnded);
    let event = recv_restart(&mut rx).await;
    assert_eq!(event, SessionEvent::RestartElapsed);
    session.process(event);
    assert_eq!(rec_calls.lock().unwrap().as_slice(), ["start", "abort", "start"]);
}

#[tokio::test]
async fn no_speech_cycles_back_to_listening() {
    let (tx, mut rx) = VoiceSession::channel();
    let (mut recognizer, rec_calls) = ScriptedRecognizer::new(tx.clone());
    recognizer.fail_with = Some(RecognitionErrorKind::NoSpeech);
    let (synthesizer, _) = ScriptedSynthesizer::new();
    let mut session = VoiceSession::new(
        Box::new(recognizer),
        Box::new(synthesizer),
        tx.clone(),
        test_delays(),
    );

    session.enable();

    // The scripted recognizer reported NoSpeech and Ended immediately.
    let error = rx.recv().await.unwrap();
    let ended = rx.recv().await.unwrap();
    session.process(error);
    assert_eq!(session.status(), SessionStatus::Idle);
    session.process(ended);

    let event = recv_restart(&mut rx).await;
    session.process(event);
    assert_eq!(rec_calls.lock().unwrap().as_slice(), ["start", "start"]);
}

#[tokio::test]
async fn permission_denial_stops_the_session() {
    let (tx, mut rx) = VoiceSession::channel();
    let (mut recognizer, rec_calls) = ScriptedRecognizer::new(tx.clone());
    recognizer.fail_with = Some(RecognitionErrorKind::NotAllowed);
    let (synthesizer, _) = ScriptedSynthesizer::new();
    let mut session = VoiceSession::new(
        Box::new(recognizer),
        Box::new(synthesizer),
        tx.clone(),
        test_delays(),
    );

    session.enable();
    let error = rx.recv().await.unwrap();
    let ended = rx.recv().await.unwrap();
    session.process(error);
    session.process(ended);
    assert_eq!(session.status(), SessionStatus::Error);

    // No restart gets scheduled after a denial.
    let fired = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(fired.is_err(), "denied session must not re-arm");
    assert_eq!(rec_calls.lock().unwrap().as_slice(), ["start"]);
}

#[tokio::test]
async fn disable_cancels_everything_and_ignores_late_events() {
    let (tx, mut rx) = VoiceSession::channel();
    let (recognizer, rec_calls) = ScriptedRecognizer::new(tx.clone());
    let (synthesizer, syn_calls) = ScriptedSynthesizer::new();
    let mut session = VoiceSession::new(
        Box::new(recognizer),
        Box::new(synthesizer),
        tx.clone(),
        test_delays(),
    );

    session.enable();
    session.process(SessionEvent::RecognitionStarted);
    session.disable();
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(rec_calls.lock().unwrap().as_slice(), ["start", "abort"]);
    assert!(syn_calls.lock().unwrap().is_empty());

    // Late callbacks from the aborted recognition change nothing.
    session.process(SessionEvent::RecognitionError(RecognitionErrorKind::Other(
        "aborted".to_string(),
    )));
    session.process(SessionEvent::RecognitionEnded);
    assert_eq!(session.status(), SessionStatus::Idle);

    let fired = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(fired.is_err(), "disabled session must not re-arm");
}

#[tokio::test]
async fn speech_replaces_pending_restart() {
    let (tx, mut rx) = VoiceSession::channel();
    let (recognizer, _) = ScriptedRecognizer::new(tx.clone());
    let (synthesizer, syn_calls) = ScriptedSynthesizer::new();
    let mut session = VoiceSession::new(
        Box::new(recognizer),
        Box::new(synthesizer),
        tx.clone(),
        test_delays(),
    );

    session.enable();
    session.process(SessionEvent::RecognitionStarted);
    session.process(SessionEvent::RecognitionError(RecognitionErrorKind::NoSpeech));
    session.process(SessionEvent::RecognitionEnded);

    // Speaking while the restart is pending cancels the timer.
    session.speak("hola");
    assert_eq!(syn_calls.lock().unwrap().as_slice(), ["cancel", "speak:hola"]);
    session.process(SessionEvent::UtteranceStarted);

    let fired = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(
        fired.is_err(),
        "cancelled restart timer must not fire during speech"
    );
}

#[test]
fn interpreter_covers_all_phrase_sets() {
    assert_eq!(interpret("cerrar"), vec![Intent::Close]);
    assert_eq!(interpret("vamos al inicio"), vec![Intent::Close]);
    assert_eq!(interpret("siguiente paso"), vec![Intent::Next]);
    assert_eq!(interpret("ya está hecho"), vec![Intent::Next]);
    assert_eq!(interpret("paso anterior"), vec![Intent::Previous]);
    assert_eq!(interpret("repite por favor"), vec![Intent::Repeat]);
    assert_eq!(interpret("qué toca ahora"), vec![Intent::Repeat]);
    assert_eq!(
        interpret("pon un temporizador de 12 minutos"),
        vec![Intent::StartTimer(12)]
    );
    assert_eq!(
        interpret("avanza y pon un temporizador de 8 minutos"),
        vec![Intent::Next, Intent::StartTimer(8)]
    );
    assert_eq!(interpret("hola buenas tardes"), vec![]);
}
