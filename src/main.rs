use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use cocina::catalog::{Catalog, CatalogFilter, Difficulty, Recipe};
use cocina::cook::CookSession;
use cocina::db::{self, FavoriteRepo, ShoppingRepo};
use cocina::voice::audio::{MicCapture, PLAYBACK_SAMPLE_RATE, SpeakerOutput, rms_energy};
use cocina::voice::{HttpSynthesizer, Intent, MicRecognizer, VoiceSession, interpret};
use cocina::Config;

/// Cocina - hands-free recipe assistant
#[derive(Parser)]
#[command(name = "cocina", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (for machines without audio hardware)
    #[arg(long, env = "COCINA_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recipes in the catalog
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only recipes at or under this many minutes
        #[arg(short, long)]
        max_minutes: Option<u32>,

        /// Only this difficulty (easy, medium, hard)
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Free-text search over titles and ingredients
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one recipe in full
    Show {
        /// Recipe id
        id: String,
    },
    /// Cook a recipe step by step
    Cook {
        /// Recipe id
        id: String,

        /// Type commands instead of speaking them
        #[arg(long)]
        no_voice: bool,

        /// Start in large-display kitchen mode
        #[arg(long)]
        kitchen: bool,
    },
    /// Manage favorite recipes
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Manage the shopping list
    Shopping {
        #[command(subcommand)]
        action: ShoppingAction,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Mark a recipe as favorite
    Add { id: String },
    /// Remove a recipe from favorites
    Remove { id: String },
    /// List favorite recipes
    List,
}

#[derive(Subcommand)]
enum ShoppingAction {
    /// Add an item to the list
    Add { name: String },
    /// Add every ingredient of a recipe to the list
    AddRecipe { id: String },
    /// Mark an item as bought
    Check { id: String },
    /// Mark an item as pending again
    Uncheck { id: String },
    /// Remove one item
    Remove { id: String },
    /// Remove every bought item
    ClearChecked,
    /// List all items
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,cocina=info",
        1 => "info,cocina=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let catalog = Catalog::load()?;

    match cli.command {
        Command::List { category, max_minutes, difficulty, query } => {
            cmd_list(&catalog, &CatalogFilter { category, max_minutes, difficulty, query })
        }
        Command::Show { id } => cmd_show(&catalog, &id),
        Command::Cook { id, no_voice, kitchen } => {
            let recipe = catalog.get(&id)?.clone();
            cmd_cook(recipe, cli.disable_voice || no_voice, kitchen).await
        }
        Command::Favorites { action } => cmd_favorites(&catalog, &action),
        Command::Shopping { action } => cmd_shopping(&catalog, &action),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
    }
}

fn cmd_list(catalog: &Catalog, filter: &CatalogFilter) -> anyhow::Result<()> {
    let recipes = catalog.filter(filter);
    if recipes.is_empty() {
        println!("No recipes match.");
        return Ok(());
    }

    for recipe in recipes {
        println!(
            "{:24} {:32} {:16} {:>3} min  {}",
            recipe.id, recipe.title, recipe.category, recipe.minutes, recipe.difficulty
        );
    }
    Ok(())
}

fn cmd_show(catalog: &Catalog, id: &str) -> anyhow::Result<()> {
    let recipe = catalog.get(id)?;

    println!("{}", recipe.title);
    println!(
        "{} | {} min | {} | {} raciones\n",
        recipe.category, recipe.minutes, recipe.difficulty, recipe.servings
    );

    println!("Ingredientes:");
    for ingredient in &recipe.ingredients {
        match &ingredient.quantity {
            Some(q) => println!("  - {} ({q})", ingredient.name),
            None => println!("  - {}", ingredient.name),
        }
    }

    println!("\nPasos:");
    for (i, step) in recipe.steps.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    Ok(())
}

/// Apply interpreted intents in order, collecting what to say and whether
/// the session closed
fn apply_intents(cook: &mut CookSession, intents: &[Intent]) -> (Option<String>, bool) {
    let mut spoken = Vec::new();
    let mut closed = false;
    for intent in intents {
        let reply = cook.apply(intent);
        if let Some(text) = reply.speak {
            spoken.push(text);
        }
        if reply.closed {
            closed = true;
            break;
        }
    }
    let speak = (!spoken.is_empty()).then(|| spoken.join(" "));
    (speak, closed)
}

/// Drive one recipe end to end: voice (or typed) commands in, step
/// announcements and timer ticks out.
async fn cmd_cook(recipe: Recipe, no_voice: bool, kitchen: bool) -> anyhow::Result<()> {
    let config = Config::load_with_options(no_voice)?;
    let mut cook = CookSession::new(recipe, kitchen)?;

    let (tx, mut rx) = VoiceSession::channel();

    let mut session = if config.voice.enabled {
        let Some(api_key) = config.voice.api_key.clone() else {
            anyhow::bail!("voice needs an API key; set OPENAI_API_KEY or pass --no-voice");
        };

        let recognizer = MicRecognizer::new(
            tx.clone(),
            config.voice.stt_endpoint.clone(),
            api_key.clone(),
            config.voice.stt_model.clone(),
            config.locale.clone(),
        );
        let synthesizer = HttpSynthesizer::new(
            tx.clone(),
            config.voice.tts_endpoint.clone(),
            api_key,
            config.voice.tts_model.clone(),
            config.voice.tts_voice.clone(),
            config.voice.tts_speed,
        );

        let mut session = VoiceSession::new(
            Box::new(recognizer),
            Box::new(synthesizer),
            tx.clone(),
            config.voice.restart_delays(),
        );
        session.enable();
        session.speak(&cook.announce_step());
        Some(session)
    } else {
        None
    };

    print!("{}", cook.render());
    println!(
        "\nComandos: siguiente, anterior, repite, temporizador de N minutos, cerrar, marcar N"
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let mut speak: Option<String> = None;
        let mut closed = false;

        tokio::select! {
            Some(event) = rx.recv() => {
                let Some(session) = session.as_mut() else { continue };
                if let Some(transcript) = session.process(event) {
                    let intents = interpret(&transcript);
                    if intents.is_empty() {
                        tracing::debug!(transcript = %transcript, "no command matched");
                    } else {
                        (speak, closed) = apply_intents(&mut cook, &intents);
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(rest) = line.strip_prefix("marcar ") {
                    if let Ok(n) = rest.trim().parse::<usize>()
                        && n >= 1
                    {
                        cook.toggle_ingredient(n - 1);
                        print!("{}", cook.render());
                    } else {
                        println!("No entiendo ese comando.");
                    }
                    continue;
                }
                let intents = interpret(&line);
                if intents.is_empty() {
                    println!("No entiendo ese comando.");
                } else {
                    (speak, closed) = apply_intents(&mut cook, &intents);
                }
            }
            _ = ticker.tick() => {
                speak = cook.tick();
                if speak.is_none() {
                    continue;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        if closed {
            break;
        }

        if let Some(text) = speak {
            println!("{text}");
            if let Some(session) = session.as_mut() {
                session.speak(&text);
            }
        }
        print!("{}", cook.render());
    }

    if let Some(session) = session.as_mut() {
        session.disable();
    }
    drop(tx);

    println!("Hasta la próxima.");
    Ok(())
}

fn cmd_favorites(catalog: &Catalog, action: &FavoritesAction) -> anyhow::Result<()> {
    let config = Config::load()?;
    let repo = FavoriteRepo::new(db::init(config.db_path())?);

    match action {
        FavoritesAction::Add { id } => {
            let recipe = catalog.get(id)?;
            repo.add(&recipe.id)?;
            println!("Added {} to favorites.", recipe.title);
        }
        FavoritesAction::Remove { id } => {
            repo.remove(id)?;
            println!("Removed {id} from favorites.");
        }
        FavoritesAction::List => {
            let ids = repo.list()?;
            if ids.is_empty() {
                println!("No favorites yet.");
            }
            for id in ids {
                match catalog.get(&id) {
                    Ok(recipe) => println!("{:24} {}", recipe.id, recipe.title),
                    Err(_) => println!("{id:24} (no longer in catalog)"),
                }
            }
        }
    }
    Ok(())
}

fn cmd_shopping(catalog: &Catalog, action: &ShoppingAction) -> anyhow::Result<()> {
    let config = Config::load()?;
    let repo = ShoppingRepo::new(db::init(config.db_path())?);

    match action {
        ShoppingAction::Add { name } => {
            let id = repo.add(name)?;
            println!("Added {name} ({id}).");
        }
        ShoppingAction::AddRecipe { id } => {
            let recipe = catalog.get(id)?;
            for ingredient in &recipe.ingredients {
                let entry = match &ingredient.quantity {
                    Some(q) => format!("{} ({q})", ingredient.name),
                    None => ingredient.name.clone(),
                };
                repo.add(&entry)?;
            }
            println!(
                "Added {} ingredients from {}.",
                recipe.ingredients.len(),
                recipe.title
            );
        }
        ShoppingAction::Check { id } => {
            repo.check(id)?;
            println!("Checked {id}.");
        }
        ShoppingAction::Uncheck { id } => {
            repo.uncheck(id)?;
            println!("Unchecked {id}.");
        }
        ShoppingAction::Remove { id } => {
            repo.remove(id)?;
            println!("Removed {id}.");
        }
        ShoppingAction::ClearChecked => {
            let removed = repo.clear_checked()?;
            println!("Removed {removed} bought items.");
        }
        ShoppingAction::List => {
            let items = repo.list()?;
            if items.is_empty() {
                println!("Shopping list is empty.");
            }
            for item in items {
                let mark = if item.checked { "x" } else { " " };
                println!("[{mark}] {:36} {}", item.id, item.name);
            }
        }
    }
    Ok(())
}

async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    // The capture stream must stay on the thread that created it.
    let energies = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<f32>> {
        let mut capture = MicCapture::new()?;
        capture.start()?;

        let mut energies = Vec::new();
        for i in 0..duration {
            std::thread::sleep(Duration::from_secs(1));
            let samples = capture.take_buffer();
            let energy = rms_energy(&samples);
            energies.push(energy);

            // Visual meter
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);
            println!("[{:2}s] RMS: {energy:.4} | [{meter}]", i + 1);
        }
        capture.stop();
        Ok(energies)
    })
    .await??;

    println!("\n---");
    if energies.iter().any(|e| *e > 0.01) {
        println!("Microphone is picking up sound.");
    } else {
        println!("No sound detected. Check your microphone.");
    }
    Ok(())
}

async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    tokio::task::spawn_blocking(|| -> anyhow::Result<()> {
        let speaker = SpeakerOutput::new()?;

        let frequency = 440.0_f32;
        #[allow(clippy::cast_precision_loss)]
        let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE * 2)
            .map(|i| {
                let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
            })
            .collect();

        let cancelled = std::sync::atomic::AtomicBool::new(false);
        speaker.play_samples(&samples, &cancelled)?;
        Ok(())
    })
    .await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    Ok(())
}
