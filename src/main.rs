use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_agent::Tutor;
use tutor_config::TutorConfig;
use tutor_conversation::TranscriptStorage;
use tutor_core::{Message, ModelRequest};
use uuid::Uuid;

mod commands;
mod ui;

use commands::ReplCommand;

#[derive(Parser)]
#[command(name = "ds-tutor")]
#[command(about = "A chatty data science tutor for your terminal", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.ds-tutor/tutor.yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive tutoring session
    Chat {
        /// Stream replies as they are generated
        #[arg(short, long, action = clap::ArgAction::SetTrue)]
        stream: bool,

        /// CSV, PDF or TXT file to use as context
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// Read replies aloud (requires speech in the configuration)
        #[arg(long, action = clap::ArgAction::SetTrue)]
        speak: bool,
    },

    /// Ask a single question
    Ask {
        question: String,

        /// Stream the reply as it is generated
        #[arg(short, long, action = clap::ArgAction::SetTrue)]
        stream: bool,
    },

    /// Print a random data science tip
    Tip,

    /// Saved conversations
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },

    /// Check that the configured model answers
    Test,
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List saved conversations, newest first
    List,
    /// Print a saved conversation
    Show { id: Uuid },
    /// Remove a saved conversation
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat {
            stream,
            context,
            speak,
        } => {
            let tutor = Tutor::from_config(config).await?;
            interactive_chat(tutor, stream, context, speak).await?;
        }
        Commands::Ask { question, stream } => {
            let mut tutor = Tutor::from_config(config).await?;
            ask_once(&mut tutor, &question, stream).await?;
        }
        Commands::Tip => {
            println!("💡 {}", tutor_agent::random_tip(&mut rand::rng()));
        }
        Commands::History { action } => {
            let storage = TranscriptStorage::new(config.paths.transcripts_dir());
            match action {
                HistoryCommand::List => list_history(&storage)?,
                HistoryCommand::Show { id } => show_history(&storage, &id, &config)?,
                HistoryCommand::Delete { id } => {
                    storage.delete(&id)?;
                    println!("🗑️  Deleted conversation {id}");
                }
            }
        }
        Commands::Test => {
            test_connectivity(&config).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TutorConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(TutorConfig::default_config_path);

    if path.exists() {
        info!("Loading configuration from: {:?}", path);
        TutorConfig::from_yaml(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    } else {
        info!("Using default configuration");
        Ok(TutorConfig::default())
    }
}

async fn ask_once(tutor: &mut Tutor, question: &str, stream: bool) -> Result<()> {
    let name = tutor.config().tutor.name.clone();
    if stream {
        println!("\n🤓 {name}>");
        tutor
            .ask_stream(question, &mut |chunk: &str| ui::display_stream_chunk(chunk))
            .await?;
        println!("\n");
    } else {
        let reply = tutor.ask(question).await?;
        ui::display_reply(&name, &reply.text);
    }
    Ok(())
}

async fn interactive_chat(
    mut tutor: Tutor,
    stream: bool,
    context: Option<PathBuf>,
    speak: bool,
) -> Result<()> {
    let name = tutor.config().tutor.name.clone();
    let storage = TranscriptStorage::new(tutor.config().paths.transcripts_dir());

    if speak && !tutor.set_speak_replies(true) {
        warn!("--speak ignored: speech is not enabled in the configuration");
    } else if !speak {
        tutor.set_speak_replies(false);
    }

    println!("{}", ui::banner(&name, chrono::Local::now().date_naive()));
    println!(
        "Model: {} ({})",
        tutor.model().model_id(),
        tutor.model().provider()
    );

    if let Some(path) = context {
        match tutor.attach_context(&path) {
            Ok(doc) => println!("📎 Using {} file '{}' as context", doc.kind, doc.name),
            Err(e) => println!("❌ {e}"),
        }
    }

    ui::display_reply(&name, tutor.transcript().greeting());

    loop {
        ui::prompt("You> ")?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let Some(command) = commands::parse(&input) else {
            continue;
        };

        match command {
            ReplCommand::Quit => {
                println!("Goodbye! Keep exploring your data. 📈");
                break;
            }
            ReplCommand::Ask(question) => {
                if let Err(e) = ask_once(&mut tutor, &question, stream).await {
                    println!("❌ {e}");
                }
            }
            ReplCommand::Listen(path) => {
                if stream {
                    println!("(replies to recorded questions are not streamed)");
                }
                match tutor.listen(&path).await {
                    Ok(reply) => {
                        println!("🎤 You asked: {}", reply.question);
                        ui::display_reply(&name, &reply.text);
                    }
                    Err(e) => println!("❌ {e}"),
                }
            }
            ReplCommand::Reset => {
                tutor.reset();
                println!("🧹 Conversation cleared.");
                ui::display_reply(&name, tutor.transcript().greeting());
            }
            ReplCommand::Tip => {
                println!("💡 {}\n", tutor.tip(&mut rand::rng()));
            }
            ReplCommand::Replay => match tutor.replay_audio().await {
                Ok(path) => println!("🔊 Replayed {}", path.display()),
                Err(e) => println!("❌ {e}"),
            },
            ReplCommand::Upload(path) => match tutor.attach_context(&path) {
                Ok(doc) => println!(
                    "📎 Using {} file '{}' as context{}",
                    doc.kind,
                    doc.name,
                    if doc.truncated { " (truncated)" } else { "" }
                ),
                Err(e) => println!("❌ {e}"),
            },
            ReplCommand::Forget => match tutor.clear_context() {
                Some(doc) => println!("📎 Dropped '{}'", doc.name),
                None => println!("No file is attached."),
            },
            ReplCommand::Explain(on) => {
                tutor.options_mut().detailed_explanations = on;
                println!("Detailed explanations {}", on_off(on));
            }
            ReplCommand::Code(on) => {
                tutor.options_mut().code_examples = on;
                println!("Code examples {}", on_off(on));
            }
            ReplCommand::Filter(on) => {
                tutor.options_mut().topic_filter = on;
                println!("Topic filter {}", on_off(on));
            }
            ReplCommand::Speak(on) => {
                let now = tutor.set_speak_replies(on);
                if on && !now {
                    println!("Speech is not enabled in the configuration.");
                } else {
                    println!("Spoken replies {}", on_off(now));
                }
            }
            ReplCommand::Stats => print_stats(&tutor),
            ReplCommand::Save => match tutor.save(&storage) {
                Ok(path) => println!("💾 Saved to {}", path.display()),
                Err(e) => println!("❌ {e}"),
            },
            ReplCommand::Export(path) => match tutor.export(&path) {
                Ok(()) => println!("📤 Exported to {}", path.display()),
                Err(e) => println!("❌ {e}"),
            },
            ReplCommand::Help => println!("{}\n", ui::HELP),
            ReplCommand::Invalid(message) => println!("{message}"),
        }
    }

    Ok(())
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn print_stats(tutor: &Tutor) {
    let stats = tutor.stats();

    println!("\n📊 Session Statistics:");
    println!("  Exchanges: {}", stats.exchanges);
    println!("  Model requests: {}", stats.metrics.total_requests);
    println!("  Off-topic questions: {}", stats.metrics.off_topic_questions);
    println!("  Success rate: {:.1}%", stats.metrics.success_rate);
    println!("  Average latency: {:.0} ms", stats.metrics.average_latency_ms);

    println!("\n🔢 Tokens:");
    println!("  Input tokens: {}", stats.tokens.input_tokens);
    println!("  Output tokens: {}", stats.tokens.output_tokens);
    println!("  Total tokens: {}", stats.tokens.total_tokens);

    if stats.priced {
        println!("\n💰 Total cost: ${:.4}", stats.total_cost);
    } else {
        println!("\n💰 No pricing configured for this model");
    }
    println!();
}

fn list_history(storage: &TranscriptStorage) -> Result<()> {
    let summaries = storage.list()?;
    if summaries.is_empty() {
        println!("No saved conversations in {}", storage.base_dir().display());
        return Ok(());
    }

    println!("\n📚 Saved conversations");
    println!("{}", ui::rule());
    for summary in summaries {
        println!(
            "{}  {}  {} exchanges  {}",
            summary.id,
            summary.saved_at.format("%Y-%m-%d %H:%M"),
            summary.exchange_count,
            summary.first_question.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn show_history(storage: &TranscriptStorage, id: &Uuid, config: &TutorConfig) -> Result<()> {
    let transcript = storage.load(id)?;
    println!(
        "\n📚 Conversation {} ({})",
        transcript.id(),
        transcript.started_at().format("%B %d, %Y %H:%M")
    );
    println!("{}", ui::rule());

    for message in transcript.messages() {
        match message.role {
            tutor_core::Role::User => println!("\n👤 You> {}", message.content),
            _ => ui::display_reply(&config.tutor.name, &message.content),
        }
    }
    Ok(())
}

async fn test_connectivity(config: &TutorConfig) -> Result<()> {
    println!(
        "\n🔍 Testing {} model '{}'",
        config.model.provider.as_str(),
        config.model.model_id
    );
    println!("{}", ui::rule());

    let model = tutor_client::build_model(&config.model).await?;
    let request = ModelRequest {
        system: None,
        messages: vec![Message::user(
            "Greet a data science student in one short sentence.",
        )],
        temperature: config.model.temperature,
        max_tokens: 64,
    };

    ui::prompt("\nTesting API connection... ")?;
    match model.generate(request).await {
        Ok(reply) => {
            println!("✅ Success!");
            println!("Response: {}", reply.text.trim());
            if let Some(usage) = reply.usage {
                println!("\nToken usage: {} tokens", usage.total_tokens);
            }
        }
        Err(e) => {
            println!("❌ Failed");
            println!("Error: {e}");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_delete_parses_id() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["ds-tutor", "history", "delete", &id.to_string()]).unwrap();
        match cli.command {
            Commands::History {
                action: HistoryCommand::Delete { id: parsed },
            } => assert_eq!(parsed, id),
            _ => panic!("expected history delete"),
        }
    }

    #[test]
    fn test_history_delete_rejects_bad_id() {
        assert!(Cli::try_parse_from(["ds-tutor", "history", "delete", "not-a-uuid"]).is_err());
    }
}
