//! CLI channel — stdin/stdout REPL for local use.
//!
//! Plain lines go through the chat engine; slash commands drive the guided
//! flows. Bot messages arrive through the session event stream, so flow
//! output renders exactly like it would in the widget.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::assistant::Assistant;
use crate::error::ChannelError;
use crate::flow::Route;
use crate::session::{Card, Message, Sender, SessionEvent};

const HELP: &str = "Commands:\n  /weather            current weather card\n  /schemes            list government schemes\n  /protect            start crop diagnosis\n  /crops              pick a crop\n  /crop <name>        select a crop\n  /disease <crop>: <disease>   select a disease\n  /scheme <id|title>  scheme details\n  /home               reset to the welcome screen\n  /clear              clear chat history\n  /help               this help\n  /quit               exit\nAnything else is sent to the assistant as chat.";

/// Parsed REPL input.
#[derive(Debug, Clone, PartialEq)]
enum CliCommand {
    Say(String),
    Flow(Route),
    Crop(String),
    Disease { crop: String, disease: String },
    Scheme(String),
    Clear,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> CliCommand {
    let line = line.trim();
    if !line.starts_with('/') {
        return CliCommand::Say(line.to_string());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => CliCommand::Quit,
        "/clear" => CliCommand::Clear,
        "/help" => CliCommand::Help,
        "/home" => CliCommand::Flow(Route::Home),
        "/weather" => CliCommand::Flow(Route::Weather),
        "/schemes" => CliCommand::Flow(Route::Schemes),
        "/protect" => CliCommand::Flow(Route::PlantProtection),
        "/crops" => CliCommand::Flow(Route::SelectCrop),
        "/crop" if !rest.is_empty() => CliCommand::Crop(rest.to_string()),
        "/scheme" if !rest.is_empty() => CliCommand::Scheme(rest.to_string()),
        "/disease" => match rest.split_once(':') {
            Some((crop, disease)) if !disease.trim().is_empty() => CliCommand::Disease {
                crop: crop.trim().to_string(),
                disease: disease.trim().to_string(),
            },
            _ => CliCommand::Unknown("usage: /disease <crop>: <disease>".to_string()),
        },
        other => CliCommand::Unknown(format!("Unknown command: {}", other)),
    }
}

/// Render a bot message (text, quick replies, suggestions, card) as terminal
/// output.
fn render_message(message: &Message) -> String {
    let mut out = format!("\n🤖 {}\n", message.text);
    if let Some(card) = &message.card {
        out.push_str(&render_card(card));
    }
    if !message.quick_replies.is_empty() {
        out.push_str(&format!(
            "💬 Quick replies: {}\n",
            message.quick_replies.join(" · ")
        ));
    }
    if !message.suggestions.is_empty() {
        for chip in &message.suggestions {
            out.push_str(&format!("👉 {} {} (/{})\n", chip.icon, chip.label, chip.action));
        }
    }
    out
}

fn render_card(card: &Card) -> String {
    match card {
        Card::Weather { data } => format!(
            "┌ Weather — {}\n│ 🌡️ {}°C, {}\n│ 💧 Humidity {}%  💨 Wind {} km/h\n│ 🌅 {}  🌇 {}\n└\n",
            data.location,
            data.temperature,
            data.condition,
            data.humidity,
            data.wind_speed,
            data.sunrise,
            data.sunset
        ),
        Card::Scheme { data } => format!(
            "┌ {}\n│ {}\n│ Benefits: {}\n│ Eligibility: {}\n│ Deadline: {}\n│ Apply: {}\n└\n",
            data.title,
            data.full_description,
            data.benefits,
            data.eligibility,
            data.deadline,
            data.application_link
        ),
        Card::CropGrid { data } => {
            let mut out = String::from("Pick a crop with /crop <name>:\n");
            for (index, crop) in data.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", index + 1, crop));
            }
            out
        }
        Card::Dropdown { data, field, context } => {
            let hint = match (field, context) {
                (crate::session::DropdownField::Scheme, _) => "/scheme <title>".to_string(),
                (crate::session::DropdownField::Crop, _) => "/crop <name>".to_string(),
                (crate::session::DropdownField::Disease, Some(ctx)) => {
                    format!("/disease {}: <disease>", ctx.crop)
                }
                (crate::session::DropdownField::Disease, None) => {
                    "/disease <crop>: <disease>".to_string()
                }
            };
            let mut out = format!("Pick with {}:\n", hint);
            for (index, option) in data.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", index + 1, option));
            }
            out
        }
    }
}

/// Stdin/stdout REPL over the assistant core.
pub struct CliChannel {
    assistant: Arc<Assistant>,
}

impl CliChannel {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self { assistant }
    }

    /// Run the REPL until `/quit` or EOF.
    pub async fn run(&self) -> Result<(), ChannelError> {
        // Bot output arrives via the session event stream.
        let rx = self.assistant.session().subscribe();
        let renderer = tokio::spawn(async move {
            let mut events = BroadcastStream::new(rx);
            while let Some(event) = events.next().await {
                match event {
                    Ok(SessionEvent::MessageAdded { message })
                        if message.sender == Sender::Bot =>
                    {
                        print!("{}", render_message(&message));
                        eprint!("> ");
                    }
                    Ok(_) => {}
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!(missed = n, "CLI renderer lagged behind session events");
                    }
                }
            }
        });

        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        eprint!("> ");
        loop {
            let line = match lines.next_line().await? {
                Some(line) => line,
                None => break, // EOF
            };
            if line.trim().is_empty() {
                eprint!("> ");
                continue;
            }

            match parse_command(&line) {
                CliCommand::Quit => break,
                CliCommand::Help => {
                    println!("{}", HELP);
                    eprint!("> ");
                }
                CliCommand::Unknown(reason) => {
                    println!("{}", reason);
                    eprint!("> ");
                }
                CliCommand::Clear => self.assistant.clear_session().await,
                CliCommand::Say(text) => self.assistant.send_message(&text).await,
                CliCommand::Flow(route) => self.assistant.navigator().activate(route).await,
                CliCommand::Crop(crop) => self.assistant.navigator().select_crop(&crop).await,
                CliCommand::Disease { crop, disease } => {
                    self.assistant
                        .navigator()
                        .select_disease(&crop, &disease)
                        .await;
                }
                CliCommand::Scheme(key) => self.assistant.navigator().select_scheme(&key).await,
            }
        }

        renderer.abort();
        Ok(())
    }
}
