use anyhow::Context;
use application::context::{CacheContext, OllamaContext};
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use domain::models::ImportEntry;
use domain::ports::{EmbeddingModel, LanguageModel};
use infrastructure::config::Config;
use shared::confirmation::ask_confirmation;
use shared::types::Result;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::format::{print_cached_answers, print_title, print_with_title};

/// Ask questions of a local answer cache, falling back to an LLM on a miss.
#[derive(Parser, Debug)]
#[command(name = "questioncache", version)]
#[command(about = "Answer questions from a local embedding cache, asking an LLM on a miss")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Send the last question straight to the model
    #[arg(short = 's', long, conflicts_with_all = ["import", "last"])]
    pub send: bool,

    /// Import a JSON array of {question, answer} objects from stdin
    #[arg(short = 'i', long, conflicts_with = "last")]
    pub import: bool,

    /// Print the last question asked
    #[arg(short = 'l', long)]
    pub last: bool,

    /// The question to ask; `-` reads it from stdin
    #[arg(trailing_var_arg = true)]
    pub question: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a question (the default)
    Ask {
        /// Question words; `-` reads the question from stdin
        #[arg(trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Send the last question to the model and cache the response
    Send,
    /// Import answers from a JSON file, or stdin when no file is given
    Import { file: Option<PathBuf> },
    /// Print the last question asked
    Last,
    /// Delete the answer cache
    Clearcache {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the path of the cache database
    Db,
}

/// A fully resolved command, with any stdin or file input already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ask(String),
    Send,
    Import(String),
    Last,
    ClearCache { assume_yes: bool },
    Db,
    Usage,
}

impl Action {
    pub fn resolve(cli: Cli, stdin: &mut impl Read) -> Result<Self> {
        let action = match cli.command {
            Some(Command::Ask { question }) => Self::ask(&question, stdin)?,
            Some(Command::Send) => Self::Send,
            Some(Command::Import { file: Some(path) }) => Self::Import(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed reading {}", path.display()))?,
            ),
            Some(Command::Import { file: None }) => Self::Import(read_all(stdin)?),
            Some(Command::Last) => Self::Last,
            Some(Command::Clearcache { yes }) => Self::ClearCache { assume_yes: yes },
            Some(Command::Db) => Self::Db,
            None if cli.send => Self::Send,
            None if cli.import => Self::Import(read_all(stdin)?),
            None if cli.last => Self::Last,
            None => Self::ask(&cli.question, stdin)?,
        };
        Ok(action)
    }

    fn ask(words: &[String], stdin: &mut impl Read) -> Result<Self> {
        let question = match words {
            [dash] if dash == "-" => read_all(stdin)?.trim().to_string(),
            _ => words.join(" "),
        };
        if question.trim().is_empty() {
            Ok(Self::Usage)
        } else {
            Ok(Self::Ask(question))
        }
    }
}

fn read_all(input: &mut impl Read) -> Result<String> {
    let mut buffer = String::new();
    input
        .read_to_string(&mut buffer)
        .context("Failed reading standard input")?;
    Ok(buffer)
}

pub struct CliApp {
    config: Config,
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, cli: Cli) -> Result<()> {
        let action = Action::resolve(cli, &mut std::io::stdin().lock())?;
        let mut stdout = std::io::stdout();
        if action == Action::Usage {
            Cli::command().write_help(&mut stdout)?;
            return Ok(());
        }
        tracing::debug!(
            db = %self.config.db_path.display(),
            model = %self.config.ollama_model,
            "opening question cache"
        );
        let context = OllamaContext::open(&self.config)?;
        execute(&context, action, &mut stdout).await?;
        context.close()
    }
}

/// Run one command against an open context, writing user output to `out`.
pub async fn execute<E, L, W>(context: &CacheContext<E, L>, action: Action, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    match action {
        Action::Ask(question) => handle_ask(context, &question, out).await,
        Action::Send => handle_send(context, out).await,
        Action::Import(input) => handle_import(context, &input, out).await,
        Action::Last => handle_last(context, out),
        Action::ClearCache { assume_yes } => handle_clear_cache(context, assume_yes, out),
        Action::Db => {
            writeln!(out, "{}", context.db_path().display())?;
            Ok(())
        }
        Action::Usage => {
            Cli::command().write_help(out)?;
            Ok(())
        }
    }
}

async fn handle_ask<E, L, W>(context: &CacheContext<E, L>, question: &str, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    context.last_question().save(question)?;
    print_with_title(out, "Question", question)?;

    let responses = context.questions()?.search_fuzzy(question).await?;
    if !responses.is_empty() {
        print_cached_answers(out, &responses)?;
        writeln!(
            out,
            "{}",
            format!(
                "Run `questioncache send` to pose this question to {}",
                context.model().model_id()
            )
            .dimmed()
        )?;
        return Ok(());
    }

    writeln!(out, "{}", format!("cache miss; asking {}", context.model().model_id()).yellow())?;
    answer_live(context, question, out).await
}

async fn handle_send<E, L, W>(context: &CacheContext<E, L>, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    let Some(question) = context.last_question().load()? else {
        print_title(out, "You haven't asked any questions yet")?;
        return Ok(());
    };

    if let Some(response) = context.questions()?.search_exact(&question)? {
        print_title(out, "Already Sent")?;
        print_with_title(out, "Question:", &response.question)?;
        print_with_title(out, "Answer:", &response.answer)?;
        return Ok(());
    }

    print_with_title(
        out,
        &format!("Posing question to {}...", context.model().model_id()),
        &question,
    )?;
    answer_live(context, &question, out).await
}

async fn answer_live<E, L, W>(context: &CacheContext<E, L>, question: &str, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    print_title(out, "Answer")?;
    context
        .ask_and_record(question, |chunk| {
            write!(out, "{chunk}")?;
            out.flush()?;
            Ok(())
        })
        .await?;
    writeln!(out)?;
    Ok(())
}

async fn handle_import<E, L, W>(context: &CacheContext<E, L>, input: &str, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    let entries = ImportEntry::parse_batch(input)?;
    write!(out, "Importing {} answers... ", entries.len())?;
    out.flush()?;
    let stored = context.questions()?.import_batch(&entries).await?;
    writeln!(out, "done ({stored} new)")?;
    Ok(())
}

fn handle_last<E, L, W>(context: &CacheContext<E, L>, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    match context.last_question().load()? {
        Some(question) => writeln!(out, "{question}")?,
        None => print_title(out, "You haven't asked any questions yet")?,
    }
    Ok(())
}

fn handle_clear_cache<E, L, W>(context: &CacheContext<E, L>, assume_yes: bool, out: &mut W) -> Result<()>
where
    E: EmbeddingModel,
    L: LanguageModel,
    W: Write,
{
    let confirmed = ask_confirmation(
        "This will delete the answer cache. This cannot be undone. Continue?",
        false,
        assume_yes,
    )?;
    if !confirmed {
        writeln!(out, "{}", "Aborted.".yellow())?;
        return Ok(());
    }
    let removed = context.clear_questions()?;
    writeln!(out, "Cache cleared ({removed} answers removed)")?;
    Ok(())
}
