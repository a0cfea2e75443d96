//! Binary entry point for the TerraSQL command-line client.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use terrasql::{
    logging::init_logging,
    query::{ResultSet, TypedCell},
    schema::CreateTableReport,
    ConnectReport, ConnectRequest, Session, TerraConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "terrasql",
    version,
    about = "Query and build SQLite/SpatiaLite databases",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    open: OpenArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        env = "TERRASQL_LOG",
        default_value = "warn",
        help = "Log filter directive (e.g. terrasql=debug)"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct OpenArgs {
    #[arg(
        long,
        global = true,
        env = "TERRASQL_CONFIG",
        value_name = "FILE",
        help = "Config file (defaults to the user config dir)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "TERRASQL_DB",
        value_name = "NAME",
        default_value = "terrasql",
        help = "Database name; .sqlite is appended when missing"
    )]
    db: String,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory for the database, resolved under the external root"
    )]
    local_path: Option<String>,

    #[arg(long, global = true, help = "Open as plain SQLite without the spatial extension")]
    no_spatial: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Connect and report spatial readiness")]
    Info,

    #[command(about = "Run a read query and print typed rows")]
    Query {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    #[command(about = "Step a statement once and print the first column")]
    Update {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    #[command(about = "Run a statement to completion and print the change count")]
    Bulk {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    #[command(about = "Create a table from a JSON description")]
    CreateTable {
        #[arg(value_name = "SPEC", help = "JSON file with tableName, columns and geometry")]
        spec: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let session = open_session(&cli.open)?;
    let mut request = ConnectRequest::new(cli.open.db.clone());
    request.local_path = cli.open.local_path.clone();
    let connected = session.connect(&request)?;

    let outcome = execute(&cli, &session, &connected);
    let closed = session.close();
    outcome?;
    closed?;
    Ok(())
}

fn open_session(args: &OpenArgs) -> Result<Session, Box<dyn Error>> {
    let mut config = TerraConfig::load(args.config.clone())?;
    if args.no_spatial {
        config.spatial.enabled = false;
    }
    Ok(Session::new(config))
}

fn execute(cli: &Cli, session: &Session, connected: &ConnectReport) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Info => emit(cli.format, connected, || print_connect_text(connected))?,
        Command::Query { sql } => {
            let result = session.execute_query(sql)?;
            emit(cli.format, &result, || print_rows_text(&result))?;
        }
        Command::Update { sql } => {
            let outcome = session.execute_update(sql)?;
            emit(cli.format, &outcome, || match (&outcome.count, &outcome.data) {
                (Some(count), Some(data)) => println!("count: {count}\ndata: {data}"),
                (Some(count), None) => println!("count: {count}"),
                _ => println!("no row produced"),
            })?;
        }
        Command::Bulk { sql } => {
            let outcome = session.execute_bulk(sql)?;
            emit(cli.format, &outcome, || {
                println!("{} row(s) changed", outcome.changes)
            })?;
        }
        Command::CreateTable { spec } => {
            let raw = fs::read_to_string(spec)?;
            let value: Value = serde_json::from_str(&raw)?;
            let report = session.create_table(&value)?;
            emit(cli.format, &report, || print_create_text(&report))?;
        }
    }
    Ok(())
}

fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(),
) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_connect_text(report: &ConnectReport) {
    println!("Database: {}", report.path.display());
    println!("  connected: {}", report.is_connected);
    println!("  spatial:   {}", report.is_spatial);
    if report.bootstrapped {
        println!("  spatial metadata initialized");
    }
}

fn print_rows_text(result: &ResultSet) {
    if let Some(first) = result.data.first() {
        let header: Vec<&str> = first.keys().map(String::as_str).collect();
        println!("{}", header.join("\t"));
    }
    for row in &result.data {
        let cells: Vec<String> = row.values().map(render_cell).collect();
        println!("{}", cells.join("\t"));
    }
    println!("({} row(s), {} column(s))", result.row_count, result.col_count);
}

fn render_cell(cell: &TypedCell) -> String {
    match cell {
        TypedCell::Text(s) | TypedCell::Unrecognized(s) => s.clone(),
        TypedCell::Integer(v) => v.to_string(),
        TypedCell::Float(v) => v.to_string(),
        TypedCell::Null => "NULL".to_string(),
    }
}

fn print_create_text(report: &CreateTableReport) {
    println!("table created: {}", report.table_created);
    if let Some(added) = report.geom_added {
        println!("geometry column added: {added}");
    }
    if let Some(indexed) = report.geom_indexed {
        println!("spatial index built: {indexed}");
    }
}
