// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use resumeflow::app_config::{self, Config, PersistenceBackend};
use resumeflow::app_controller::Controller;
use resumeflow::errors::AppError;
use resumeflow::persistence::PageQuery;
use resumeflow::session::{PersistenceStatus, SessionReport};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform a text with the remote service
    #[command(alias = "run")]
    Modify(ModifyArgs),

    /// Browse saved results
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// List the languages offered by the service
    Languages,

    /// Generate shell completions for resumeflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List saved results, newest first
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Records per page (1-100)
        #[arg(long, default_value_t = 10)]
        size: u64,

        /// Only records of this user; defaults to the configured user
        #[arg(long)]
        user: Option<String>,
    },

    /// Show one saved result
    Show {
        /// Record id
        id: i64,
    },

    /// Delete one saved result
    Delete {
        /// Record id
        id: i64,
    },
}

#[derive(Parser, Debug)]
struct ModifyArgs {
    /// Input text file, or '-' for standard input
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Free-text transformation instructions
    #[arg(short, long, default_value = "")]
    requirements: String,

    /// Source language tag (e.g., 'zh', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language tag (e.g., 'zh', 'en')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Write the result to this file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds to wait for the job to finish once the stream is open
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Do not save the result
    #[arg(long)]
    no_save: bool,
}

/// resumeflow - streaming text transformation client
///
/// Submits a text to a multi-stage transformation service and follows its
/// progress events until the final result arrives.
#[derive(Parser, Debug)]
#[command(name = "resumeflow")]
#[command(version)]
#[command(about = "Streaming client for a staged text-transformation service")]
#[command(long_about = "resumeflow submits a text to a transformation service, follows the job's event stream and saves the final result.

EXAMPLES:
    resumeflow modify cv.txt -r \"emphasise leadership\"    # Transform a file
    cat cv.txt | resumeflow modify - -t en -o out.txt      # Read stdin, write a file
    resumeflow history list --page 2                        # Browse saved results
    resumeflow history show 42                              # Print one saved result
    resumeflow languages                                    # List supported languages
    resumeflow completions bash > resumeflow.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
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
        // The logger itself accepts everything; set_max_level does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI colour for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                marker,
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

    let cli = CommandLineOptions::parse();

    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "resumeflow", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }

    match cli.command {
        Commands::Modify(args) => run_modify(config, args).await,
        Commands::History { action } => run_history(config, action).await,
        Commands::Languages => run_languages(config).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Validate the final configuration, apply its log level and build the controller
fn prepare(config: Config) -> Result<Controller> {
    config.validate().map_err(|e| AppError::Config(format!("{:#}", e)))?;
    log::set_max_level(config.log_level.to_level_filter());
    Controller::with_config(config)
}

async fn run_modify(mut config: Config, args: ModifyArgs) -> Result<()> {
    if let Some(source_lang) = args.source_language {
        config.source_language = source_lang;
    }
    if let Some(target_lang) = args.target_language {
        config.target_language = target_lang;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.session.timeout_secs = timeout_secs;
    }
    if args.no_save {
        config.persistence.backend = PersistenceBackend::Disabled;
    }

    let controller = prepare(config)?;

    let run = controller.modify(&args.input, &args.requirements, args.output.as_deref());
    tokio::pin!(run);
    let report = loop {
        tokio::select! {
            report = &mut run => break report?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, abandoning the session");
                controller.client().cancel_active();
            }
        }
    };

    print_report(&report, args.output.is_some())
}

fn print_report(report: &SessionReport, written_to_file: bool) -> Result<()> {
    if report.abandoned() {
        return Err(anyhow!("Session abandoned"));
    }

    if let Some(error) = report.error() {
        error!("{} ({})", error.message, error.kind);
        return Err(AppError::Session(error.clone()).into());
    }

    if let (Some(output), false) = (report.output(), written_to_file) {
        println!("{}", output);
    }

    match &report.persistence {
        PersistenceStatus::Saved(id) => info!("Saved as record {}", id),
        PersistenceStatus::Failed(message) => {
            warn!("The result is complete but could not be saved: {}", message)
        }
        PersistenceStatus::NotAttempted => {}
    }
    Ok(())
}

async fn run_history(config: Config, action: HistoryAction) -> Result<()> {
    let controller = prepare(config)?;
    let default_user = controller.config().persistence.user_id.clone();

    match action {
        HistoryAction::List { page, size, user } => {
            let query = PageQuery::new(page, size, Some(user.unwrap_or(default_user)));
            let page = controller.list_history(query).await?;
            println!(
                "Page {}/{} ({} records)",
                page.current,
                page.pages.max(1),
                page.total
            );
            for record in &page.records {
                let description = record.modification_description.as_deref().unwrap_or("");
                println!(
                    "{:>6}  {}  {}",
                    record.id,
                    record.created_time.as_deref().unwrap_or("-"),
                    truncate(description, 60)
                );
            }
        }
        HistoryAction::Show { id } => {
            let record = controller.show_record(id).await?;
            println!("# Record {}", record.id);
            if let Some(description) = &record.modification_description {
                println!("Requirements: {}", description);
            }
            if let Some(category) = &record.resume_classification {
                println!("Category: {}", category);
            }
            if let Some(subcategory) = &record.modified_resume_classification {
                println!("Sub-category: {}", subcategory);
            }
            println!("\n## Original\n{}\n\n## Modified\n{}", record.original_content, record.modified_content);
        }
        HistoryAction::Delete { id } => {
            controller.delete_record(id).await?;
        }
    }
    Ok(())
}

async fn run_languages(config: Config) -> Result<()> {
    let controller = prepare(config)?;
    let catalog = controller.languages().await;
    for (code, name) in catalog.iter() {
        println!("{:<4} {}", code, name);
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut shortened: String = line.chars().take(max_chars.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}
