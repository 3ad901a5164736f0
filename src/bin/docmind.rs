//! CLI binary for docmind.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `DocmindConfig`, runs one operation and prints the result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docmind::prompts::language_name;
use docmind::{
    ChatRequest, Dispatcher, DocmindConfig, DocmindError, ExtractionRequest, Extractor,
    FileKind, GenerationRequest, GenerationResult, Message, Preset, Role, TaskKind,
    SUPPORTED_LANGUAGES,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain text from any supported source
  docmind extract lecture.pdf
  docmind extract scan.png
  docmind extract https://youtu.be/dQw4w9WgXcQ

  # Summaries, answers and analyses
  docmind summarize notes.docx --words 150 --preset study-notes
  docmind generate questions.txt --preset exam-answers
  docmind analyze past-papers.pdf --preset topic-importance

  # Translation (source defaults to auto-detect)
  echo "Bonjour tout le monde" | docmind translate - --to en

  # Plain-language rewrite
  docmind accessibility handout.docx

  # Chat
  docmind chat --system "Answer in one sentence." "What is OCR?"

  # Structured output
  docmind --json summarize report.pdf > summary.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY        OpenAI API key
  DOCMIND_PROVIDER      Provider name (openai, anthropic, gemini, ollama, …)
  DOCMIND_MODEL         Model ID (default: gpt-3.5-turbo)
  TESSERACT_CMD         Path to the tesseract binary
  DOCMIND_OCR_LANG      Tesseract language(s), e.g. eng+fra
  PDFIUM_LIB_PATH       Directory containing libpdfium
  DOCMIND_API_TIMEOUT   Per-attempt API timeout in seconds
  DOCMIND_MAX_ATTEMPTS  Attempts per API call, including the first
  RUST_LOG              Log filter (overrides -v / -q)
"#;

/// Extract text from documents, images and videos and run it through an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "docmind",
    version,
    about = "Extract text from PDF, DOCX, images and YouTube videos, then summarise, answer, analyse or translate it",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID.
    #[arg(long, global = true, env = "DOCMIND_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "DOCMIND_PROVIDER")]
    provider: Option<String>,

    /// Path to the tesseract binary.
    #[arg(long, global = true, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<String>,

    /// Per-attempt LLM call timeout in seconds.
    #[arg(long, global = true, env = "DOCMIND_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Attempts per LLM call, including the first.
    #[arg(long, global = true, env = "DOCMIND_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Verify the OCR engine before doing any work.
    #[arg(long, global = true, env = "DOCMIND_CHECK_OCR")]
    check_ocr: bool,

    /// Output structured JSON instead of plain text.
    #[arg(long, global = true, env = "DOCMIND_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCMIND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCMIND_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plain text of a source.
    Extract(SourceArgs),
    /// Summarise a source.
    Summarize(TemplatedArgs),
    /// Generate step-by-step answers for a source.
    Generate(TemplatedArgs),
    /// Analyse a source and rank its topics.
    Analyze(TemplatedArgs),
    /// Translate a source.
    Translate(TranslateArgs),
    /// Rewrite a source in plain, accessible language.
    Accessibility(AccessibilityArgs),
    /// Send a conversation to the model.
    Chat(ChatArgs),
    /// Print the video ID in a YouTube URL.
    VideoId {
        url: String,
    },
    /// List formatting presets per task.
    Presets,
    /// List translation languages.
    Languages,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// File path, YouTube URL, or `-` for text on stdin.
    input: String,

    /// Source kind: pdf, docx, image, txt, youtube. Inferred when omitted.
    #[arg(long)]
    kind: Option<String>,
}

#[derive(Args, Debug)]
struct TemplatedArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Target length in words.
    #[arg(long)]
    words: Option<u32>,

    /// Formatting preset (see `docmind presets`).
    #[arg(long)]
    preset: Option<String>,

    /// Max output tokens.
    #[arg(long, default_value_t = docmind::request::DEFAULT_MAX_TOKENS)]
    max_tokens: usize,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Target language code, e.g. en, es, fr.
    #[arg(long)]
    to: String,

    /// Source language code. Default: auto-detect.
    #[arg(long)]
    from: Option<String>,

    /// Max output tokens.
    #[arg(long, default_value_t = docmind::request::DEFAULT_MAX_TOKENS)]
    max_tokens: usize,
}

#[derive(Args, Debug)]
struct AccessibilityArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Max output tokens.
    #[arg(long, default_value_t = docmind::request::DEFAULT_MAX_TOKENS)]
    max_tokens: usize,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// System prompt sent before the conversation.
    #[arg(long)]
    system: Option<String>,

    /// Max output tokens.
    #[arg(long, default_value_t = docmind::request::DEFAULT_CHAT_MAX_TOKENS)]
    max_tokens: usize,

    /// Messages in order. Prefix with `assistant:` or `user:` to set the role;
    /// unprefixed messages are from the user.
    #[arg(required = true)]
    messages: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || !cli.json {
        // The spinner gives enough feedback; keep library logs quiet.
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&cli, &err);
            ExitCode::FAILURE
        }
    }
}

/// Print a failure: the library's user message (or JSON report) when the
/// cause is a `DocmindError`, the anyhow chain otherwise.
fn report_failure(cli: &Cli, err: &anyhow::Error) {
    match err.downcast_ref::<DocmindError>() {
        Some(e) if cli.json => match serde_json::to_string_pretty(&e.report()) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{}", e.user_message()),
        },
        Some(e) => {
            eprintln!("{} {}", red("✘"), e.user_message());
            if cli.verbose {
                eprintln!("{}", dim(&e.to_string()));
            }
        }
        None => eprintln!("{} {:#}", red("✘"), err),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::VideoId { url } => {
            let id = docmind::extract_video_id(url).ok_or_else(|| {
                DocmindError::VideoIdNotFound { url: url.clone() }
            })?;
            println!("{id}");
            Ok(())
        }
        Command::Presets => {
            for task in [TaskKind::Summarize, TaskKind::Generate, TaskKind::Analyze] {
                println!("{}", bold(task.as_str()));
                for preset in Preset::for_task(task) {
                    println!("  {:<20} {}", preset.name(), dim(preset.instruction().trim()));
                }
            }
            Ok(())
        }
        Command::Languages => {
            for (code, name) in SUPPORTED_LANGUAGES {
                println!("{code:<6} {name}");
            }
            Ok(())
        }
        Command::Extract(args) => {
            let config = build_config(cli)?;
            let text = source_text(cli, &config, args).await?;
            print_text(cli, &text)
        }
        Command::Summarize(args) => templated(cli, TaskKind::Summarize, args).await,
        Command::Generate(args) => templated(cli, TaskKind::Generate, args).await,
        Command::Analyze(args) => templated(cli, TaskKind::Analyze, args).await,
        Command::Translate(args) => {
            if language_name(&args.to).is_none() && !cli.quiet {
                eprintln!("{}", dim(&format!("note: '{}' is not a listed language code", args.to)));
            }
            let config = build_config(cli)?;
            let dispatcher = Dispatcher::from_config(&config)?;
            let text = source_text(cli, &config, &args.source).await?;
            let mut request = GenerationRequest::translate(text, &args.to)
                .with_max_tokens(args.max_tokens);
            if let Some(ref from) = args.from {
                request = request.with_source_language(from);
            }
            let result = with_spinner(cli, "Translating…", dispatcher.run(&request)).await?;
            print_result(cli, &result)
        }
        Command::Accessibility(args) => {
            let config = build_config(cli)?;
            let dispatcher = Dispatcher::from_config(&config)?;
            let text = source_text(cli, &config, &args.source).await?;
            let request = GenerationRequest::accessibility(text).with_max_tokens(args.max_tokens);
            let result = with_spinner(cli, "Rewriting…", dispatcher.run(&request)).await?;
            print_result(cli, &result)
        }
        Command::Chat(args) => {
            let config = build_config(cli)?;
            let dispatcher = Dispatcher::from_config(&config)?;
            let messages = args
                .messages
                .iter()
                .map(|m| parse_message(m))
                .collect::<Vec<_>>();
            let mut request = ChatRequest::new(messages).with_max_tokens(args.max_tokens);
            if let Some(ref system) = args.system {
                request = request.with_system_prompt(system);
            }
            let result = with_spinner(cli, "Thinking…", dispatcher.chat(&request)).await?;
            print_result(cli, &result)
        }
    }
}

async fn templated(cli: &Cli, task: TaskKind, args: &TemplatedArgs) -> Result<()> {
    let preset = args
        .preset
        .as_deref()
        .map(|name| Preset::lookup(task, name))
        .transpose()?;

    let config = build_config(cli)?;
    // Resolve the provider before extracting so a missing key fails fast.
    let dispatcher = Dispatcher::from_config(&config)?;
    let text = source_text(cli, &config, &args.source).await?;

    let mut request = GenerationRequest::new(task, text).with_max_tokens(args.max_tokens);
    request.target_words = args.words;
    request.preset = preset;

    let label = format!("Running {task}…");
    let result = with_spinner(cli, &label, dispatcher.run(&request)).await?;
    print_result(cli, &result)
}

/// Text of the source: stdin for `-`, otherwise extracted.
async fn source_text(cli: &Cli, config: &DocmindConfig, args: &SourceArgs) -> Result<String> {
    if args.input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read text from stdin")?;
        return Ok(text);
    }

    let request = match args.kind {
        Some(ref kind) => ExtractionRequest::new(args.input.clone(), kind.parse::<FileKind>()?),
        None => ExtractionRequest::infer(args.input.clone())?,
    };

    let extractor = Extractor::new(config)?;
    if config.validate_ocr_eagerly {
        extractor.check_ocr().await?;
    }
    let label = format!("Extracting {}…", request.kind);
    let extracted = with_spinner(cli, &label, extractor.extract(&request)).await?;
    Ok(extracted.text)
}

/// Map CLI args onto an env-layered `DocmindConfig`.
fn build_config(cli: &Cli) -> Result<DocmindConfig> {
    let mut builder = DocmindConfig::builder()
        .apply_env()
        .validate_ocr_eagerly(cli.check_ocr);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref cmd) = cli.tesseract_cmd {
        builder = builder.tesseract_cmd(cmd);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(n) = cli.max_attempts {
        builder = builder.max_attempts(n);
    }

    let config = builder.build()?;
    tracing::debug!("{:?}", config);
    Ok(config)
}

/// `assistant: hi` → assistant message; anything else is a user message.
fn parse_message(raw: &str) -> Message {
    if let Some((prefix, rest)) = raw.split_once(':') {
        if let Ok(role) = prefix.parse::<Role>() {
            let content = rest.trim_start().to_string();
            return match role {
                Role::System => Message::system(content),
                Role::User => Message::user(content),
                Role::Assistant => Message::assistant(content),
            };
        }
    }
    Message::user(raw)
}

async fn with_spinner<T, F>(cli: &Cli, label: &str, fut: F) -> Result<T, DocmindError>
where
    F: Future<Output = Result<T, DocmindError>>,
{
    if cli.quiet || cli.json || cli.verbose {
        return fut.await;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    bar.finish_and_clear();
    out
}

fn print_text(cli: &Cli, text: &str) -> Result<()> {
    if cli.json {
        let json = serde_json::json!({ "text": text, "char_count": text.chars().count() });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
        return Ok(());
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

fn print_result(cli: &Cli, result: &GenerationResult) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("Failed to serialise output")?
        );
        return Ok(());
    }
    print_text(cli, &result.text)?;
    if !cli.quiet {
        eprintln!(
            "{}",
            dim(&format!(
                "{}  {} tokens in / {} out  {}ms",
                result.model, result.input_tokens, result.output_tokens, result.duration_ms
            ))
        );
    }
    Ok(())
}
