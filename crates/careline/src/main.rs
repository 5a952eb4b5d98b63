//! A simple program demonstrates how to use `careline` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::fs;
use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use careline::SessionBuilder;
use careline::core::persona::Persona;
use careline_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };

    let mut config = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Ok(model) = env::var("OPENAI_MODEL") {
        config = config.with_model(model);
    }
    let provider = OpenAIProvider::new(config.build());

    let responder_persona = persona_from_env(
        "CARELINE_RESPONDER_PROMPT",
        "Averie",
        include_str!("./responder_prompt.md"),
    );
    let evaluator_persona = persona_from_env(
        "CARELINE_EVALUATOR_PROMPT",
        "Cora",
        include_str!("./evaluator_prompt.md"),
    );
    let responder_name = responder_persona.name().to_owned();

    let mut session =
        SessionBuilder::new(provider, responder_persona, evaluator_persona)
            .build();

    println!(
        "Chatting with {}. Type {} to review the conversation, {} to leave.",
        responder_name.bright_cyan().bold(),
        "/analyze".bold(),
        "/quit".bold(),
    );

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        if line == "/analyze" {
            let progress_bar = ProgressBar::new_spinner();
            progress_bar.set_style(progress_style.clone());
            progress_bar.set_message("🔍 Reviewing the conversation...");
            progress_bar.enable_steady_tick(Duration::from_millis(100));

            let report = session.analyze().await;
            progress_bar.finish_and_clear();

            let bar = BAR_CHAR.bright_magenta();
            println!("{bar}{}", "Conversation review".bright_white().bold());
            println!("{bar}{} {}", "Issues:".bold(), report.issues);
            println!("{bar}{} {}", "Causes:".bold(), report.causes);
            println!("{bar}{} {}", "Follow-ups:".bold(), report.follow_ups);
            println!();
            continue;
        }

        print!(
            "{}{} ",
            BAR_CHAR.bright_cyan(),
            format!("{responder_name}:").bright_white().bold()
        );
        std::io::stdout().flush().unwrap();

        let streamed = Arc::new(AtomicBool::new(false));
        let reply = session
            .send_message_with(line, {
                let streamed = Arc::clone(&streamed);
                move |delta| {
                    streamed.store(true, Ordering::Relaxed);
                    print!("{delta}");
                    std::io::stdout().flush().ok();
                }
            })
            .await;
        // Nothing arrived incrementally, e.g. the fallback text.
        if !streamed.load(Ordering::Relaxed) {
            print!("{reply}");
        }
        println!();
        println!();
    }
}

fn persona_from_env(
    var: &str,
    name: &str,
    default_instructions: &str,
) -> Persona {
    let instructions = match env::var(var) {
        Ok(path) => match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!("cannot read prompt file {path}: {err}");
                default_instructions.to_owned()
            }
        },
        Err(_) => default_instructions.to_owned(),
    };
    Persona::new(name, instructions)
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
