// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subtrans::app_config::{self, Config, TranslationProvider};
use subtrans::app_controller::Controller;
use subtrans::file_utils::FileManager;
use subtrans::subtitle_processor::render_srt;
use subtrans::translation::FailurePolicy;
use subtrans::{language_utils, server};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Google,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Output format of the translate command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `{ "subtitles": [...], "errors": [...] }`
    Json,
    /// SubRip file with the translated text
    Srt,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Srt => "srt",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Parse a subtitle file and print its entries as JSON
    Parse {
        /// Subtitle file to parse
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Write the JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate a subtitle file or a parse JSON document
    Translate(TranslateArgs),

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Subtitle file (.srt) or JSON produced by `subtrans parse`
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: String,

    /// Abort on the first entry that fails instead of reporting it
    #[arg(long)]
    fail_fast: bool,

    /// Output file (default: next to the input, e.g. movie.fr.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// subtrans - subtitle parsing and batch translation
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Subtitle parsing and batch translation service")]
#[command(long_about = "subtrans parses SubRip subtitle files into timed entries and translates them \
with bounded concurrency, keeping every translation attached to its own entry.

EXAMPLES:
    subtrans serve                              # HTTP service on 0.0.0.0:5000
    PORT=8080 subtrans serve                    # Listen on another port
    subtrans parse movie.srt -o movie.json      # Parse to JSON
    subtrans translate movie.srt -t fr          # Writes movie.fr.json
    subtrans translate movie.json -t de --format srt
    subtrans -p ollama -m llama3.2:3b translate movie.srt -t es
    subtrans completions bash > subtrans.bash   # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json by default. You can specify a different
    config file with --config. Missing files fall back to built-in defaults.

SUPPORTED PROVIDERS:
    google - Public Google Translate endpoint (default)
    ollama - Local Ollama server (default: llama3.2:3b)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Maximum concurrent provider calls per batch
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The global max level does the runtime filtering
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::get_color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config)?;
    apply_overrides(&mut config, &cli);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_serve(config).await
        }
        Commands::Parse { input, output } => run_parse(config, input, output),
        Commands::Translate(args) => {
            if args.fail_fast {
                config.translation.common.failure_policy = FailurePolicy::FailFast;
            }
            run_translate(config, args).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Apply global CLI flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &CommandLineOptions) {
    if let Some(provider) = &cli.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &cli.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(concurrency) = cli.concurrency {
        config.translation.active_provider_config_mut().concurrent_requests = concurrency;
    }

    // Update log level in config if specified via command line
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    log::set_max_level(config.log_level.to_level_filter());
}

async fn run_serve(config: Config) -> Result<()> {
    info!(
        "Starting subtrans with {} provider",
        config.translation.provider.display_name()
    );
    let controller = Controller::with_config(config)?;
    server::serve(controller).await
}

/// Fail early with a readable message when the input file is missing
fn ensure_input_file(input: &Path) -> Result<()> {
    if !FileManager::file_exists(input) {
        bail!("Input file not found: {:?}", input);
    }
    Ok(())
}

fn run_parse(config: Config, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    ensure_input_file(&input)?;
    let controller = Controller::with_config(config)?;

    let bytes = FileManager::read_bytes(&input)?;
    let response = controller
        .parse_subtitles(Some(bytes.as_slice()))
        .with_context(|| format!("Failed to parse {:?}", input))?;

    let json = serde_json::to_string_pretty(&response)
        .context("Failed to serialize parsed subtitles")?;

    match output {
        Some(path) => {
            FileManager::write_to_file(&path, &json)?;
            info!("Wrote {} entries to {:?}", response.subtitles.len(), path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run_translate(config: Config, args: TranslateArgs) -> Result<()> {
    ensure_input_file(&args.input)?;

    if !language_utils::is_known_language(&args.target_language) {
        warn!(
            "'{}' is not a known ISO 639 code, passing it to the provider as is",
            args.target_language
        );
    }

    let controller = Controller::with_config(config)?;

    let bytes = FileManager::read_bytes(&args.input)?;
    let entries = controller
        .load_entries(&bytes)
        .with_context(|| format!("Failed to read subtitles from {:?}", args.input))?;

    info!(
        "Translating {} entries to {} with {}",
        entries.len(),
        language_utils::language_name(&args.target_language).unwrap_or_else(|| args.target_language.clone()),
        controller.translator().provider_name()
    );

    let progress_bar = ProgressBar::new(entries.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%) {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));

    let bar = progress_bar.clone();
    let result = controller
        .translate_entries_with_progress(&entries, &args.target_language, move |done, _total| {
            bar.set_position(done as u64);
        })
        .await;
    progress_bar.finish_and_clear();

    let response = result?;
    for failure in &response.errors {
        warn!("Not translated: {}", failure);
    }

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&response)
            .context("Failed to serialize translated subtitles")?,
        OutputFormat::Srt => render_srt(&response.subtitles, true),
    };

    let output = args.output.unwrap_or_else(|| {
        FileManager::generate_output_path(&args.input, &args.target_language, args.format.extension())
    });
    FileManager::write_to_file(&output, &rendered)?;

    info!(
        "Wrote {} entries to {:?} ({} failed)",
        response.subtitles.len(),
        output,
        response.errors.len()
    );
    Ok(())
}
