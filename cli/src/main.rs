use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use gridquery::*;
use std::{
    fs,
    io::{self, Read},
    path::Path,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Compile data table state to SQL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile the query for one page, all rows or an export
    Compile(CompileArgs),
    /// Compile the query counting the rows that match the search and filters
    Count(TableArgs),
    /// Check a complex query against the columns of a table
    Validate(TableArgs),
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Path to the schema JSON file
    #[arg(short, long)]
    schema: String,
    /// The base table
    #[arg(short, long)]
    table: String,
    /// Path to a JSON array of column definitions. Defaults to every column of the table.
    #[arg(short, long)]
    columns: Option<String>,
    /// Path to the table state as JSON. If `-`, stdin will be used.
    #[arg(long)]
    state: Option<String>,
    #[arg(short, long, default_value = "sqlite")]
    dialect: DialectKind,
    /// Path to a TOML or JSON config file
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Args)]
struct CompileArgs {
    #[command(flatten)]
    table: TableArgs,
    /// One of `page`, `all` or `export`
    #[arg(short, long, default_value = "page")]
    mode: String,
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

fn load_config(path: &str) -> Result<Config> {
    let source = read_input(path)?;
    let config = match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("json") => Config::from_json(&source)?,
        _ => Config::from_toml(&source)?,
    };
    Ok(config)
}

fn build(args: &TableArgs) -> Result<(Compiler, Vec<Column>, FilterState)> {
    let mut options = Options::new(args.dialect);
    if let Some(path) = &args.config {
        options = options.with_config(load_config(path)?);
    }
    let schema_json = read_input(&args.schema)?;
    let compiler = Compiler::new(&schema_json, &args.table, options)?;
    let columns = match &args.columns {
        Some(path) => {
            let defs: Vec<ColumnDef> = serde_json::from_str(&read_input(path)?)
                .with_context(|| format!("parsing column definitions in {path}"))?;
            let columns = defs
                .into_iter()
                .map(Column::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            ColumnSet::build(columns).finish()?
        }
        None => {
            let table = compiler
                .schema()
                .get_table_by_name(&args.table)
                .ok_or_else(|| anyhow!("table `{}` not found", args.table))?;
            ColumnSet::from_table(table).finish()?
        }
    };
    let state = match &args.state {
        Some(path) => serde_json::from_str(&read_input(path)?)
            .with_context(|| format!("parsing table state in {path}"))?,
        None => FilterState::default(),
    };
    debug!(columns = columns.len(), table = %args.table, "loaded table");
    Ok((compiler, columns, state))
}

fn compile(args: CompileArgs) -> Result<()> {
    let mode = match args.mode.as_str() {
        "page" => QueryMode::Page,
        "all" => QueryMode::All,
        "export" => QueryMode::Export,
        other => return Err(anyhow!("unknown mode `{other}`")),
    };
    let (compiler, columns, state) = build(&args.table)?;
    let sql = compiler.compile_query(&columns, &state, mode)?;
    println!("{sql}");
    Ok(())
}

fn count(args: TableArgs) -> Result<()> {
    let (compiler, columns, state) = build(&args)?;
    println!("{}", compiler.compile_count(&columns, &state)?);
    Ok(())
}

fn validate(args: TableArgs) -> Result<()> {
    let (_, columns, state) = build(&args)?;
    match &state.complex_query {
        Some(tree) => {
            validate_rules(tree, &columns)?;
            println!("{}", tree.describe(|i| columns.get(i).map(|c| c.display_label().to_string())));
        }
        None => println!("No complex query."),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Cli::parse();
    match args.command {
        Command::Compile(args) => compile(args),
        Command::Count(args) => count(args),
        Command::Validate(args) => validate(args),
    }
}
