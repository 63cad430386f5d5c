use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use care_companion::core::Config;
use care_companion::database::Database;
use care_companion::features::{
    AudioTranscriber, CareAssistant, ConfirmationClassifier, DueDetector, DueQuery,
    OpenAiChat, OpenAiSpeech, ReminderTextBuilder, SpeechSynthesizer,
};

/// Care companion: medication and appointment reminders, confirmations and
/// conversational help for elderly users
#[derive(Parser)]
#[command(name = "care", version = env!("CARGO_PKG_VERSION"), long_about = None)]
struct Cli {
    /// User to act for (defaults to DEFAULT_USER_ID)
    #[arg(global = true, long)]
    user: Option<i64>,

    /// Local offset from UTC in minutes, e.g. -240 for UTC-4
    #[arg(global = true, long = "tz-offset", allow_hyphen_values = true)]
    tz_offset: Option<i32>,

    /// Override database path
    #[arg(global = true, long = "db")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Medications due right now
    DueMeds {
        /// Tolerance window in minutes
        #[arg(long)]
        window: Option<i64>,
        #[arg(long)]
        json: bool,
    },

    /// Appointments whose reminder is due right now
    DueAppointments {
        #[arg(long)]
        window: Option<i64>,
        #[arg(long)]
        json: bool,
    },

    /// All medications for the user, as JSON
    Meds,

    /// All appointments for the user, as JSON
    Appointments,

    /// Classify a reply to a reminder
    Confirm {
        text: String,
        #[arg(long)]
        json: bool,
    },

    /// Reminder text for the first due medication
    Remind {
        /// Also synthesize the reminder to this audio file
        #[arg(long)]
        speak: Option<PathBuf>,
    },

    /// Ask the assistant a question
    Ask { message: String },

    /// Transcribe an audio file
    Transcribe {
        file: PathBuf,
        /// Language hint, e.g. "es"
        #[arg(long)]
        lang: Option<String>,
    },
}

struct App {
    config: Config,
    database: Database,
    user_id: i64,
    tz_offset: Option<i32>,
}

impl App {
    fn detector(&self) -> DueDetector {
        DueDetector::new(Arc::new(self.database.clone()), self.config.detector_config())
    }

    fn due_query(&self, window: Option<i64>) -> Result<DueQuery> {
        let query = DueQuery::from_utc(self.user_id, Utc::now(), self.tz_offset)?;
        Ok(match window {
            Some(minutes) => query.with_tolerance(minutes),
            None => query,
        })
    }

    fn chat(&self) -> OpenAiChat {
        OpenAiChat::new(self.config.openai_model.clone())
            .with_temperature(self.config.chat_temperature)
            .with_timeout(Duration::from_secs(self.config.chat_timeout_secs))
    }

    fn require_openai_key(&self) -> Result<()> {
        if self.config.has_openai_key() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("OPENAI_API_KEY is not set"))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(app: App, command: Commands) -> Result<()> {
    match command {
        Commands::DueMeds { window, json } => {
            let query = app.due_query(window)?;
            let due = app.detector().find_due_medications(&query);
            if json {
                return print_json(&due);
            }
            if due.is_empty() {
                println!(
                    "No medications due at {} (±{} min)",
                    due.now_local.format("%Y-%m-%d %H:%M"),
                    due.tolerance_minutes
                );
            }
            for item in &due.items {
                let dosage = item.dosage.as_deref().unwrap_or("");
                println!("{}  {} {}", item.time, item.name, dosage);
            }
        }

        Commands::DueAppointments { window, json } => {
            let query = app.due_query(window)?;
            let due = app.detector().find_due_appointments(&query);
            if json {
                return print_json(&due);
            }
            if due.is_empty() {
                println!(
                    "No appointment reminders due at {} (±{} min)",
                    due.now_local.format("%Y-%m-%d %H:%M"),
                    due.tolerance_minutes
                );
            }
            for item in &due.items {
                println!(
                    "{} {}  {} ({} min notice)",
                    item.date, item.time, item.title, item.pre_notice_minutes
                );
            }
        }

        Commands::Meds => {
            let meds = app.detector().list_all_medications(app.user_id)?;
            print_json(&meds)?;
        }

        Commands::Appointments => {
            let appointments = app.detector().list_all_appointments(app.user_id)?;
            print_json(&appointments)?;
        }

        Commands::Confirm { text, json } => {
            if !app.config.has_openai_key() {
                warn!("OPENAI_API_KEY is not set, only keyword matching is available");
            }
            let model = app.chat().with_temperature(0.0);
            let classifier = ConfirmationClassifier::new(Arc::new(model), app.config.classifier_config());
            let result = classifier.classify(&text).await;
            if json {
                return print_json(&result);
            }
            let confidence = result
                .confidence
                .map(|c| format!("{c:.2}"))
                .unwrap_or_else(|| "-".to_string());
            println!("{:?} (confidence {confidence})", result.status);
            println!("{}", result.status.reply());
        }

        Commands::Remind { speak } => {
            let query = app.due_query(None)?;
            let due = app.detector().find_due_medications(&query);
            let Some(item) = due.first() else {
                println!("Nothing to remind right now");
                return Ok(());
            };
            if due.items.len() > 1 {
                info!("{} medications due, reminding the first", due.items.len());
            }

            let text = ReminderTextBuilder::for_due_medication(item).build();
            println!("{text}");

            if let Some(path) = speak {
                app.require_openai_key()?;
                let backend = OpenAiSpeech::new(
                    app.config.openai_api_key.clone(),
                    app.config.tts_model.clone(),
                );
                let synthesizer = SpeechSynthesizer::new(Arc::new(backend), app.config.voice.clone());
                let audio = synthesizer.synthesize(&text, None).await?;
                tokio::fs::write(&path, &audio.bytes)
                    .await
                    .with_context(|| format!("Failed to write audio to {}", path.display()))?;
                info!(
                    "Wrote {} ({}, {} bytes)",
                    path.display(),
                    audio.mime(),
                    audio.bytes.len()
                );
            }
        }

        Commands::Ask { message } => {
            app.require_openai_key()?;
            let assistant = CareAssistant::new(Arc::new(app.database.clone()), Arc::new(app.chat()))
                .with_tz_offset(app.tz_offset);
            let reply = assistant.answer(app.user_id, &message).await?;
            println!("{reply}");
        }

        Commands::Transcribe { file, lang } => {
            app.require_openai_key()?;
            let transcriber =
                AudioTranscriber::new(app.config.openai_api_key.clone(), app.config.stt_model.clone());
            let text = transcriber.transcribe_file(&file, lang.as_deref()).await?;
            println!("{text}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    // The openai crate reads its key from the environment
    std::env::set_var("OPENAI_API_KEY", &config.openai_api_key);
    std::env::set_var("OPENAI_KEY", &config.openai_api_key);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let database = Database::open(&config.database_path)?;
    let app = App {
        user_id: cli.user.unwrap_or(config.default_user_id),
        tz_offset: cli.tz_offset.or(config.tz_offset_minutes),
        database,
        config,
    };

    run(app, cli.command).await
}
