//! Mock interview console
//!
//! Runs one interview session in the terminal. With `endpoints.reply_url`
//! configured it talks to the HTTP interviewer and speech services; otherwise
//! (or with `--offline`) it plays a built-in case with silent speech.

mod commands;
mod demo;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use mock_interview_agent::{InterviewSession, SessionBackends, SessionEvent, TurnOutcome};
use mock_interview_config::{InterviewConfig, LoggingSettings};
use mock_interview_core::{AudioFormat, CapturedAudio, InterviewContext, TurnState};
use mock_interview_llm::{HttpReplyBackend, ScriptedReplyBackend};
use mock_interview_pipeline::{
    AudioPlayer, ClockedAudioPlayer, HttpSpeechBackend, HttpTranscriptionBackend,
    StubSpeechBackend, StubTranscriptionBackend,
};

use crate::commands::{parse_line, Command, HELP};

#[derive(Parser)]
#[command(name = "mock-interview", about = "Practice a case interview in the terminal")]
struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Case identifier forwarded to the interviewer
    #[arg(long)]
    case: Option<String>,

    /// Use the built-in interviewer script and silent speech
    #[arg(long)]
    offline: bool,

    /// Show replies as text instead of speaking them
    #[arg(long)]
    no_speech: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        InterviewConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.no_speech {
        config.session.speech_enabled = false;
    }

    init_tracing(&config.logging);

    let offline = cli.offline || config.endpoints.reply_url.is_none();
    if offline && !cli.offline {
        tracing::warn!("endpoints.reply_url is not set, running the offline interview");
    }

    let backends = build_backends(&config, offline)?;
    let mut context = InterviewContext::default().with_metadata("interview_type", "case");
    if let Some(case) = cli.case {
        context.case_id = Some(case);
    }

    let session = Arc::new(InterviewSession::new(
        Uuid::new_v4().to_string(),
        &config,
        context,
        backends,
    ));
    tracing::info!(session_id = %session.session_id(), offline, "Console session created");

    let printer = tokio::spawn(print_events(session.clone(), session.subscribe()));

    println!("{}\n", HELP);
    if let Err(e) = session.start().await {
        println!("! {} (type /start to try again)", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        if !handle(&session, command).await || session.is_concluded() {
            break;
        }
    }

    if !session.is_concluded() {
        session.end("candidate left");
    }
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;

    Ok(())
}

fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_backends(config: &InterviewConfig, offline: bool) -> Result<SessionBackends> {
    let player: Arc<dyn AudioPlayer> = Arc::new(ClockedAudioPlayer::new());

    if offline {
        return Ok(SessionBackends {
            reply: Arc::new(ScriptedReplyBackend::new(demo::script())),
            speech: Arc::new(
                StubSpeechBackend::new(16_000).with_char_duration(Duration::from_millis(20)),
            ),
            transcriber: Arc::new(StubTranscriptionBackend::new(
                "I would split profit into revenue and costs and look at each in turn.",
            )),
            player,
        });
    }

    let endpoints = &config.endpoints;
    let timeouts = &config.timeouts;
    Ok(SessionBackends {
        reply: Arc::new(
            HttpReplyBackend::from_settings(endpoints, timeouts)
                .context("Failed to create reply backend")?,
        ),
        speech: Arc::new(
            HttpSpeechBackend::from_settings(endpoints, timeouts)
                .context("Failed to create speech backend")?,
        ),
        transcriber: Arc::new(
            HttpTranscriptionBackend::from_settings(endpoints, timeouts)
                .context("Failed to create transcription backend")?,
        ),
        player,
    })
}

/// Run one command; `false` ends the input loop
async fn handle(session: &InterviewSession, command: Command) -> bool {
    let result = match command {
        Command::Answer(text) => session.submit_text(&text).await.map(report),
        Command::Record(path) => {
            let audio = match path {
                Some(path) => match read_recording(&path).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        println!("! {:#}", e);
                        return true;
                    }
                },
                None => CapturedAudio::default(),
            };

            match session.start_recording() {
                Ok(()) => session.stop_recording(audio).await.map(report),
                Err(e) => Err(e),
            }
        }
        Command::Skip => session.interrupt(),
        Command::Speech(enabled) => {
            session.set_speech_enabled(enabled);
            println!("Speech {}", if enabled { "on" } else { "off" });
            Ok(())
        }
        Command::Exhibit(id) => {
            match session.exhibit(id) {
                Some(exhibit) => print!("{}", render::exhibit_block(&exhibit)),
                None => println!("No exhibit #{}", id),
            }
            Ok(())
        }
        Command::Exhibits => {
            let exhibits = session.exhibits();
            if exhibits.is_empty() {
                println!("No exhibits yet");
            }
            for exhibit in exhibits {
                println!("#{} {} ({})", exhibit.id, exhibit.title, exhibit.kind);
            }
            Ok(())
        }
        Command::Status => {
            let actions: Vec<&str> = session.allowed_actions().iter().map(|a| a.as_str()).collect();
            println!("State: {} | allowed: {}", session.state(), actions.join(", "));
            if let Some((cursor, len)) = session.speech_progress() {
                println!("Speaking sentence {} of {}", cursor + 1, len);
            }
            Ok(())
        }
        Command::Start => session.start().await.map(report),
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => return false,
    };

    if let Err(e) = result {
        println!("! {}", e);
    }
    true
}

fn report(outcome: TurnOutcome) {
    tracing::debug!(?outcome, "Turn outcome");
}

async fn read_recording(path: &Path) -> Result<CapturedAudio> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse::<AudioFormat>().ok())
        .unwrap_or(AudioFormat::Wav);

    Ok(CapturedAudio::new(data, format))
}

async fn print_events(session: Arc<InterviewSession>, mut rx: broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind session events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            SessionEvent::MessageAdded(message) => {
                let introduced = session.exhibits_for(message.id);
                println!("{}", render::message_entry(&message, &introduced));
            }
            SessionEvent::StateChanged { new: TurnState::CandidateTurn, .. } => {
                println!("(your turn)");
            }
            SessionEvent::SentenceSkipped { index, reason } => {
                tracing::debug!(index, %reason, "Sentence played without audio");
            }
            SessionEvent::Notice(notice) => println!("! {}", notice),
            SessionEvent::Ended { reason } => {
                println!("Interview ended: {}", reason);
                break;
            }
            _ => {}
        }
    }
}
