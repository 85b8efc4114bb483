use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use schemestore::{dbpath, store, Catalog, CreateTable, TableElement, TableName};
use std::sync::Arc;

mod logging;

#[derive(Parser, Debug)]
#[command(name = "schemestore")]
#[command(version, about = "Manage databases and table schemes in an embedded store")]
struct Cli {
    /// Store name (no slashes) or path to a store directory.
    ///
    /// If it contains no path separators, it is treated as a name and placed under
    /// the default schemestore data directory (platform-specific).
    #[arg(long, default_value = "default")]
    db: String,

    /// Increase logging verbosity (use together with RUST_LOG for fine control).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Current database for table commands; overrides the db part of db.table.
    #[arg(long = "use", global = true)]
    use_db: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a database
    CreateDb { name: String },

    /// Drop a database and all of its tables
    DropDb { name: String },

    /// List databases
    ListDbs,

    /// List the tables of a database
    ListTables { db: String },

    /// Create a table
    CreateTable {
        /// Table name, optionally qualified as db.table
        name: String,

        /// Column as name:type, in declaration order (repeatable)
        #[arg(long = "column", short = 'c')]
        columns: Vec<String>,

        /// Comma-separated PRIMARY KEY columns, in key order
        #[arg(long = "primary-key", short = 'k')]
        primary_keys: Vec<String>,
    },

    /// Drop a table
    DropTable { name: String },

    /// Show a table's columns and key/value layout
    Describe { name: String },

    /// Print a table's encoded scheme as hex
    Dump { name: String },

    /// Print store info
    Info,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let store_dir = dbpath::resolve_store_dir(&cli.db)
        .with_context(|| format!("Failed to resolve --db {}", cli.db))?;
    let store = store::open(&store_dir)
        .with_context(|| format!("Failed to open store in {}", store_dir.display()))?;
    let catalog = Catalog::new(Arc::new(store));
    let use_db = cli.use_db.as_deref();

    match cli.cmd {
        Command::CreateDb { name } => {
            catalog.create_database(&name)?;
            println!("Created database {name}");
        }

        Command::DropDb { name } => {
            catalog.drop_database(&name)?;
            println!("Dropped database {name}");
        }

        Command::ListDbs => {
            for name in catalog.list_databases()? {
                println!("{name}");
            }
        }

        Command::ListTables { db } => {
            for name in catalog.list_tables(&db)? {
                println!("{name}");
            }
        }

        Command::CreateTable {
            name,
            columns,
            primary_keys,
        } => {
            let stmt = CreateTable {
                name: TableName::parse(&name)?,
                elements: parse_elements(&columns, &primary_keys)?,
            };
            catalog.create_table(use_db, &stmt)?;
            println!("Created table {name}");
        }

        Command::DropTable { name } => {
            let (db, tbl) = qualify(&name, use_db)?;
            catalog.drop_table(&db, &tbl)?;
            println!("Dropped table {db}.{tbl}");
        }

        Command::Describe { name } => {
            let (db, tbl) = qualify(&name, use_db)?;
            let scheme = catalog.table_scheme(&db, &tbl)?;

            println!("TABLE {db}.{tbl}");
            println!("  {:<24} {:<10} {:<6} {:>7} {:>4}", "column", "type", "role", "pos_col", "pos");
            for col in scheme.cols() {
                let role = if col.is_key { "KEY" } else { "VALUE" };
                println!(
                    "  {:<24} {:<10} {:<6} {:>7} {:>4}",
                    col.name, col.data_type, role, col.pos_col, col.pos
                );
            }
            let key: Vec<_> = scheme.key_columns().map(|c| c.name.as_str()).collect();
            println!("  PRIMARY KEY ({})", key.join(", "));
        }

        Command::Dump { name } => {
            let (db, tbl) = qualify(&name, use_db)?;
            let bytes = catalog.encoded_scheme(&db, &tbl)?;
            println!("{}", hex::encode(bytes));
        }

        Command::Info => {
            println!("Store directory: {}", store_dir.display());
            println!("Databases:       {}", catalog.list_databases()?.len());
        }
    }

    Ok(())
}

/// `--column id:int --column v:text --primary-key id` in command-line order:
/// all columns first, then one PRIMARY KEY element per flag.
fn parse_elements(columns: &[String], primary_keys: &[String]) -> Result<Vec<TableElement>> {
    let mut out = Vec::with_capacity(columns.len() + primary_keys.len());
    for spec in columns {
        let (name, type_name) = spec
            .split_once(':')
            .ok_or_else(|| anyhow!("column must be name:type, got {spec:?}"))?;
        out.push(TableElement::column(name.trim(), type_name.trim()));
    }
    for spec in primary_keys {
        out.push(TableElement::primary_key(
            spec.split(',').map(str::trim).filter(|s| !s.is_empty()),
        ));
    }
    Ok(out)
}

fn qualify(name: &str, use_db: Option<&str>) -> Result<(String, String)> {
    let parsed = TableName::parse(name)?;
    let db = use_db
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or(parsed.database)
        .ok_or_else(|| anyhow!("No database name has been specified. Use --use or db.table"))?;
    Ok((db, parsed.table))
}
