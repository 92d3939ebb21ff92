use crate::document;
use crate::llm::{Role, TextGenerator};
use crate::session::Session;
use crate::summary::Summary;
use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;
use tokio::io::AsyncBufReadExt;

/// Interactive terminal front end. Routes user actions to the session and
/// renders its state; all analysis logic lives below this layer.
pub struct Shell<G> {
    session: Session,
    generator: G,
}

impl<G: TextGenerator> Shell<G> {
    pub fn new(generator: G) -> Self {
        Shell {
            session: Session::new(),
            generator,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("doc-lens: document analysis assistant");
        println!("Load a text file with `open <path>`, then `summarize` it. Type `help` for commands.");

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("> ");
            io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (command, rest) = match line.split_once(char::is_whitespace) {
                Some((command, rest)) => (command, rest.trim()),
                None => (line, ""),
            };

            match (command, rest) {
                ("quit", "") | ("exit", "") => break,
                ("help", "") => print_help(),
                ("open", path) if !path.is_empty() => self.open(Path::new(path)),
                ("open", _) => banner("usage: open <path>"),
                ("summarize", "") | ("analyze", "") => self.summarize().await,
                ("summary", "") => self.show_summary(),
                ("history", "") => self.show_history(),
                // Anything else is a question about the document.
                _ => self.ask(line).await,
            }
        }

        Ok(())
    }

    /// Load a document and make it the session's current one.
    pub fn open(&mut self, path: &Path) {
        match document::load(path) {
            Ok(doc) => {
                println!("Loaded {} ({} bytes).", doc.name, doc.text.len());
                println!("Type `summarize` to analyze it.");
                self.session.install_document(doc);
            }
            Err(err) => banner(&err.to_string()),
        }
    }

    async fn summarize(&mut self) {
        println!("Analyzing document...");
        match self.session.run_summarize(&self.generator).await {
            Ok(true) => {
                if let Some(summary) = self.session.summary() {
                    render_summary(summary);
                }
                if let Some(greeting) = self.session.transcript().messages().first() {
                    println!("{}", greeting.content);
                }
            }
            Ok(false) => {
                if let Some(msg) = self.session.last_error() {
                    banner(msg);
                }
            }
            Err(err) => banner(&err.to_string()),
        }
    }

    async fn ask(&mut self, question: &str) {
        let outcome = self
            .session
            .run_ask(&self.generator, question, |fragment| {
                print!("{fragment}");
                let _ = io::stdout().flush();
            })
            .await;
        println!();

        match outcome {
            Ok(()) => {
                if let Some(msg) = self.session.last_error() {
                    banner(msg);
                }
            }
            Err(err) => banner(&err.to_string()),
        }
    }

    fn show_summary(&self) {
        match self.session.summary() {
            Some(summary) => render_summary(summary),
            None => banner("no summary yet; load a document and run `summarize`"),
        }
    }

    fn show_history(&self) {
        if self.session.transcript().is_empty() {
            println!("(no conversation yet)");
            return;
        }
        for message in self.session.transcript().messages() {
            let speaker = match message.role {
                Role::User => "you",
                Role::Model => "assistant",
            };
            println!("{speaker}: {}", message.content);
        }
    }
}

fn render_summary(summary: &Summary) {
    println!();
    println!("TL;DR");
    println!("  {}", summary.tldr);
    if !summary.bullets.is_empty() {
        println!();
        println!("Key points");
        for bullet in &summary.bullets {
            println!("  - {bullet}");
        }
    }
    if !summary.entities.is_empty() {
        println!();
        println!("Entities");
        for entity in &summary.entities {
            println!("  {} ({}): {}", entity.name, entity.kind, entity.context);
        }
    }
    println!();
}

fn banner(message: &str) {
    eprintln!("error: {message}");
}

fn print_help() {
    println!("commands:");
    println!("  open <path>   load a plain-text file (replaces the current document)");
    println!("  summarize     generate a structured summary of the loaded document");
    println!("  summary       show the current summary again");
    println!("  history       show the conversation so far");
    println!("  quit          exit");
    println!("anything else is asked as a question about the document.");
}
