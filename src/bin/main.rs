//! Heron CLI - ask a database questions in plain language
//!
//! Usage:
//!   heron ask "<question>"
//!   heron repl
//!   heron tables "<question>" [-k <n>] [--strategy <strategy>]
//!   heron prepare "<sql>" [--dialect <dialect>] [--limit <n>]
//!   heron check
//!
//! Examples:
//!   heron ask "give me all site names"
//!   heron tables "max current at Surat" -k 3 --strategy overlap
//!   heron prepare "SELECT * FROM Site ORDER BY Name NULLS LAST" --dialect tsql

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use heron::config::Settings;
use heron::executor::{self, QueryExecutor};
use heron::inference::HttpGenerator;
use heron::retrieval::{self, RetrievalStrategy};
use heron::sql::{extract_select, prepare, Dialect};
use heron::{logging, Pipeline, SchemaIndex};
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "heron")]
#[command(about = "Heron - answer natural-language questions from a SQL database")]
#[command(version)]
struct Cli {
    /// Path to a heron.toml (defaults to HERON_CONFIG, ./heron.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Named connection from the config file
    #[arg(short, long, global = true)]
    connection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question and exit
    Ask {
        /// The question, in plain language
        question: String,
    },

    /// Answer questions interactively until exit, quit or EOF
    Repl,

    /// Show which tables a question retrieves, with scores
    Tables {
        /// The question, in plain language
        question: String,

        /// Number of tables to show (defaults to retrieval.top_k)
        #[arg(short)]
        k: Option<usize>,

        /// Retrieval strategy (defaults to retrieval.strategy)
        #[arg(short, long)]
        strategy: Option<StrategyArg>,
    },

    /// Salvage, check and rewrite a SQL statement without running it
    Prepare {
        /// Raw SQL or model output
        sql: String,

        /// Target dialect (defaults to the connection's dialect)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Row limit (defaults to query.row_limit)
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Run SELECT 1 against the configured connection
    Check,
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Tsql,
    Postgres,
    Mysql,
    Duckdb,
    Sqlite,
    Ansi,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Ansi => Dialect::Ansi,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum StrategyArg {
    Weighted,
    Overlap,
}

impl From<StrategyArg> for RetrievalStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Weighted => RetrievalStrategy::Weighted,
            StrategyArg::Overlap => RetrievalStrategy::Overlap,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match cli.command {
        Commands::Ask { question } => cmd_ask(&settings, cli.connection.as_deref(), &question),
        Commands::Repl => cmd_repl(&settings, cli.connection.as_deref()),
        Commands::Tables { question, k, strategy } => {
            cmd_tables(&settings, &question, k, strategy.map(Into::into))
        }
        Commands::Prepare { sql, dialect, limit } => {
            cmd_prepare(&settings, cli.connection.as_deref(), &sql, dialect.map(Into::into), limit)
        }
        Commands::Check => cmd_check(&settings, cli.connection.as_deref()),
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, heron::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn load_schema(settings: &Settings) -> Result<SchemaIndex, String> {
    let path = settings.schema.resolved_index_path().map_err(|e| e.to_string())?;
    SchemaIndex::load(&path, settings.schema.max_samples)
        .map_err(|e| format!("{} (run schema_gen to create it)", e))
}

async fn build_pipeline(settings: &Settings, connection: Option<&str>) -> Result<Pipeline, String> {
    let schema = load_schema(settings)?;

    let connection = settings
        .resolve_connection(connection)
        .map_err(|e| format!("Connection error: {}", e))?;
    let executor: Arc<dyn QueryExecutor> = executor::connect(settings, &connection)
        .await
        .map_err(|e| e.to_string())?
        .into();

    let generator = HttpGenerator::from_settings(&settings.inference).map_err(|e| e.to_string())?;

    Ok(Pipeline::from_settings(
        settings,
        Arc::new(schema),
        Arc::new(generator),
        executor,
    ))
}

fn runtime() -> Option<Runtime> {
    match Runtime::new() {
        Ok(rt) => Some(rt),
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            None
        }
    }
}

fn cmd_ask(settings: &Settings, connection: Option<&str>, question: &str) -> ExitCode {
    let Some(rt) = runtime() else {
        return ExitCode::FAILURE;
    };

    rt.block_on(async {
        let pipeline = match build_pipeline(settings, connection).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

        println!("{}", pipeline.answer(question).await);
        ExitCode::SUCCESS
    })
}

fn cmd_repl(settings: &Settings, connection: Option<&str>) -> ExitCode {
    let Some(rt) = runtime() else {
        return ExitCode::FAILURE;
    };

    let pipeline = match rt.block_on(build_pipeline(settings, connection)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Heron ready ({} tables). Type 'exit' or 'quit' to leave.",
        pipeline.schema().len()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                return ExitCode::FAILURE;
            }
            None => {
                println!();
                break;
            }
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        println!("{}\n", rt.block_on(pipeline.answer(question)));
    }

    ExitCode::SUCCESS
}

fn cmd_tables(
    settings: &Settings,
    question: &str,
    k: Option<usize>,
    strategy: Option<RetrievalStrategy>,
) -> ExitCode {
    let schema = match load_schema(settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let strategy = strategy.unwrap_or(settings.retrieval.strategy);
    let k = k.unwrap_or(settings.retrieval.top_k);
    let retriever = retrieval::build(strategy, &settings.retrieval);

    let ranked = retriever.rank(&schema, question);
    if ranked.is_empty() {
        println!("No relevant tables ({} strategy).", strategy);
        return ExitCode::SUCCESS;
    }

    println!("Strategy: {}", strategy);
    for table in ranked.iter().take(k) {
        println!("  {:>4}  {}", table.score, table.name);
    }
    if ranked.len() > k {
        println!("  ({} more below the cutoff)", ranked.len() - k);
    }

    ExitCode::SUCCESS
}

fn cmd_prepare(
    settings: &Settings,
    connection: Option<&str>,
    sql: &str,
    dialect: Option<Dialect>,
    limit: Option<u64>,
) -> ExitCode {
    let dialect = dialect.unwrap_or_else(|| {
        settings
            .resolve_connection(connection)
            .map(|c| c.dialect)
            .unwrap_or_default()
    });
    let limit = limit.unwrap_or(settings.query.row_limit);

    let candidate = match extract_select(sql) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match prepare(&candidate, limit, &dialect) {
        Ok(prepared) => {
            println!("{}", prepared);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Rejected: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(settings: &Settings, connection: Option<&str>) -> ExitCode {
    let connection = match settings.resolve_connection(connection) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Connection error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(rt) = runtime() else {
        return ExitCode::FAILURE;
    };

    rt.block_on(async {
        let executor = match executor::connect(settings, &connection).await {
            Ok(e) => e,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

        match executor.execute("SELECT 1", 1).await {
            Ok(_) => {
                println!(
                    "OK: connected ({}, {} dialect)",
                    connection.driver_name(),
                    connection.dialect
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Connection check failed: {}", e);
                ExitCode::FAILURE
            }
        }
    })
}
