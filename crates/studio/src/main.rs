//! Terminal front end for Persona Studio.
//!
//! Plain lines go to whichever view is active; slash commands switch views
//! and drive the features.

use anyhow::Result;
use async_trait::async_trait;
use providers::CredentialReselector;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use studio::image_editor::ImageEditor;
use studio::image_generator::ImageGenerator;
use studio::settings::{load_settings_or_default, save_settings, settings_path};
use studio::slideshow::SlideshowPlayer;
use studio::{AppContext, PreferenceStore, SessionController, View};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Views:    /chat  /edit  /slides  /imagine
Chat:     type a message | /name <name> | /remember on|off | /new
Edit:     /file <path> | type an edit prompt | /save <path>
Slides:   type lines | /play | /replay | /stop | /clear
Imagine:  /ratio 1:1|3:4|4:3|9:16|16:9 | type a prompt | /save <path>
Other:    /key <api-key> | /help | /quit";

/// Tells the user how to supply a different key.
struct TerminalKeyPicker;

#[async_trait]
impl CredentialReselector for TerminalKeyPicker {
    async fn request_reselection(&self) -> Result<()> {
        eprintln!("Your API key was rejected. Use /key <your-api-key> to choose another one.");
        Ok(())
    }
}

struct Shell {
    ctx: AppContext,
    session: SessionController,
    editor: ImageEditor,
    generator: ImageGenerator,
    slideshow: SlideshowPlayer,
    script: Vec<String>,
}

impl Shell {
    /// Returns false when the user asked to quit.
    async fn handle(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(true);
        }
        let Some(command) = line.strip_prefix('/') else {
            self.handle_text(line).await;
            return Ok(true);
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));

        match name {
            "quit" | "exit" => return Ok(false),
            "help" => println!("{}", HELP),
            "chat" | "edit" | "slides" | "imagine" => {
                if let Ok(view) = name.parse::<View>() {
                    self.ctx.navigation.navigate(view);
                    println!("── {} ──", view);
                }
            }
            "name" => {
                self.session.set_name(arg);
                println!("Name set to {:?}", self.session.name());
            }
            "remember" => match arg {
                "on" => self.session.set_remember_me(true),
                "off" => self.session.set_remember_me(false),
                _ => println!("Usage: /remember on|off"),
            },
            "new" => match self.session.clear_transcript() {
                Ok(()) => println!("Started a new conversation."),
                Err(e) => println!("{}", e),
            },
            "key" => self.set_key(arg)?,
            "file" => {
                if let Err(e) = self.editor.select_file(Path::new(arg)) {
                    println!("{}", e);
                } else {
                    println!("Loaded {}", arg);
                }
            }
            "save" => self.save_result(arg),
            "ratio" => match self.generator.set_aspect_ratio(arg) {
                Ok(()) => println!("Aspect ratio {}", self.generator.aspect_ratio()),
                Err(e) => println!("{}", e),
            },
            "play" => {
                let script = std::mem::take(&mut self.script).join("\n");
                if self.slideshow.play(&script) == 0 {
                    println!("Type some lines first, then /play.");
                }
            }
            "replay" => {
                if !self.slideshow.replay() {
                    println!("Nothing to replay.");
                }
            }
            "stop" => self.slideshow.stop(),
            "clear" => {
                self.slideshow.clear();
                self.script.clear();
            }
            other => println!("Unknown command /{} (try /help)", other),
        }
        Ok(true)
    }

    async fn handle_text(&mut self, text: &str) {
        match self.ctx.navigation.active() {
            View::Chat => self.chat(text).await,
            View::ImageEditor => {
                self.editor.set_prompt(text);
                println!("Editing…");
                if self.editor.submit(&self.ctx.gateway).await.is_ok() {
                    report_image(self.editor.result(), self.editor.error());
                } else if let Some(error) = self.editor.error() {
                    println!("{}", error);
                }
            }
            View::ImageGenerator => {
                self.generator.set_prompt(text);
                println!("Generating…");
                if self.generator.submit(&self.ctx.gateway).await.is_ok() {
                    report_image(self.generator.result(), self.generator.error());
                } else if let Some(error) = self.generator.error() {
                    println!("{}", error);
                }
            }
            View::Slideshow => self.script.push(text.to_string()),
        }
    }

    async fn chat(&mut self, text: &str) {
        let pending = match self.session.begin_turn(text) {
            Ok(pending) => pending,
            Err(e) => {
                println!("{}", e);
                return;
            }
        };

        let gateway = Arc::clone(&self.ctx.gateway);
        let outcome = tokio::spawn(async move {
            gateway
                .send_chat_turn(&pending.message, &pending.prior_turns, &pending.display_name)
                .await
        })
        .await
        .map_err(anyhow::Error::from);

        match self.session.finish_turn(outcome) {
            Ok(reply) => println!("Nova: {}", reply.text),
            Err(e) => println!("{}", e),
        }
    }

    fn set_key(&mut self, key: &str) -> Result<()> {
        if key.is_empty() {
            println!("Usage: /key <api-key>");
            return Ok(());
        }
        self.ctx.settings.gemini.auth.api_key = Some(key.to_string());
        save_settings(&settings_path(), &self.ctx.settings)?;
        self.ctx.rebuild_gateway()?;
        println!("API key updated.");
        Ok(())
    }

    fn save_result(&self, arg: &str) {
        if arg.is_empty() {
            println!("Usage: /save <path>");
            return;
        }
        let saved = match self.ctx.navigation.active() {
            View::ImageEditor => self.editor.save_result(Path::new(arg)),
            View::ImageGenerator => self.generator.save_result(Path::new(arg)),
            _ => {
                println!("Switch to /edit or /imagine to save an image.");
                return;
            }
        };
        match saved {
            Ok(path) => println!("Saved {}", path.display()),
            Err(e) => println!("Couldn't save: {:#}", e),
        }
    }
}

fn report_image(result: Option<&str>, error: Option<&str>) {
    match (result, error) {
        (_, Some(error)) => println!("{}", error),
        (Some(uri), None) => println!("Image ready ({} bytes encoded). Use /save <path>.", uri.len()),
        (None, None) => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = load_settings_or_default(&settings_path());
    let slide_duration = Duration::from_millis(settings.slideshow.slide_duration_ms);
    let ctx = AppContext::new(settings, Arc::new(TerminalKeyPicker))?;

    let slideshow = SlideshowPlayer::new(slide_duration);
    let mut frames = slideshow.subscribe();
    tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            if let Some(slide) = frames.borrow_and_update().clone() {
                println!("  ▶ {}", slide);
            }
        }
    });

    let mut shell = Shell {
        ctx,
        session: SessionController::start(PreferenceStore::new()),
        editor: ImageEditor::default(),
        generator: ImageGenerator::default(),
        slideshow,
        script: Vec::new(),
    };

    for message in shell.session.transcript() {
        let who = match message.sender {
            shared::agent_api::Sender::User => "You",
            shared::agent_api::Sender::Assistant => "Nova",
        };
        println!("{}: {}", who, message.text);
    }
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !shell.handle(&line).await? {
            break;
        }
    }
    Ok(())
}
