//! A simple program demonstrates how to use `tiny-react` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::fs;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tiny_react::SessionBuilder;
use tiny_react_core::{AgentConfig, TranscriptSource};
use tiny_react_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tiny_react_test_model::{PresetCompletion, TestModelProvider};
use tokio::select;
use tokio::sync::mpsc;

const BAR_CHAR: &str = "▎";

const DEFAULT_QUESTION: &str =
    "What is the text length of the string DOG in characters?";

struct TranscriptEvent(String, TranscriptSource);

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let question = env::args().skip(1).collect::<Vec<_>>().join(" ");
    let question = if question.trim().is_empty() {
        DEFAULT_QUESTION.to_owned()
    } else {
        question
    };

    let mut config = AgentConfig::default();
    if let Ok(max_steps) = env::var("TINY_REACT_MAX_STEPS") {
        let Ok(max_steps) = max_steps.parse() else {
            eprintln!("TINY_REACT_MAX_STEPS must be a number: {max_steps}");
            return ExitCode::FAILURE;
        };
        config.max_steps = Some(max_steps);
    }

    let builder = match session_builder() {
        Ok(builder) => builder,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = builder
        .with_config(config)
        .on_transcript(move |transcript, source| {
            event_tx
                .send(TranscriptEvent(transcript.to_owned(), source))
                .ok();
        })
        .build();
    let session = match session {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to set up the agent: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("{}❓ {}", BAR_CHAR.bright_green(), question.bright_white());

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style);
    progress_bar.set_message("🤔 Thinking...");
    progress_bar.enable_steady_tick(Duration::from_millis(100));

    let mut answer_fut = pin!(session.ask(&question));
    let result = loop {
        select! {
            result = &mut answer_fut => break result,
            Some(event) = event_rx.recv() => {
                progress_bar.suspend(|| print_transcript(event));
            }
        }
    };
    progress_bar.finish_and_clear();
    while let Ok(event) = event_rx.try_recv() {
        print_transcript(event);
    }

    match result {
        Ok(solution) => {
            println!(
                "{}✅ {}",
                BAR_CHAR.bright_green(),
                solution.answer.bright_white().bold()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("agent failed: {err:?}");
            eprintln!("{}❌ {err}", BAR_CHAR.bright_red());
            ExitCode::FAILURE
        }
    }
}

/// Picks the model provider from the environment.
fn session_builder() -> Result<SessionBuilder, String> {
    if let Ok(path) = env::var("TINY_REACT_REPLAY") {
        let script = fs::read_to_string(&path)
            .map_err(|err| format!("cannot read {path}: {err}"))?;
        let script: Vec<PresetCompletion> = serde_json::from_str(&script)
            .map_err(|err| format!("invalid replay script {path}: {err}"))?;
        info!("replaying {} scripted completions", script.len());
        let provider = TestModelProvider::with_script(script);
        return Ok(SessionBuilder::with_model_provider(provider));
    }

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        return Err("OPENAI_API_KEY environment variable is not set".to_owned());
    };
    let mut config = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Ok(model) = env::var("OPENAI_MODEL") {
        config = config.with_model(model);
    }
    let provider = OpenAIProvider::new(config.build());
    Ok(SessionBuilder::with_model_provider(provider))
}

fn print_transcript(TranscriptEvent(transcript, source): TranscriptEvent) {
    match source {
        TranscriptSource::Prompt => {
            println!("{}📝 Prompt to the model:", BAR_CHAR.bright_black());
            for line in transcript.lines() {
                println!("{}{}", BAR_CHAR.bright_black(), line.dimmed());
            }
        }
        TranscriptSource::Completion => {
            println!("{}🤖 Model response:", BAR_CHAR.bright_cyan());
            for line in transcript.lines() {
                println!("{}{}", BAR_CHAR.bright_cyan(), line.bright_white());
            }
        }
        TranscriptSource::Observation => {
            println!(
                "{}🔧 Observation: {}",
                BAR_CHAR.bright_yellow(),
                transcript.bright_white()
            );
        }
    }
}
