use clap::{Parser, Subcommand, ValueEnum};
use farmstore::{view, Document, DocumentStore, NewUser, Role, Store, StoreConfig};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

/// Inspect and modify a FarmStore document from the command line
#[derive(Parser)]
#[command(name = "farmstore", version, about)]
struct Cli {
    /// Path to a farmstore.yaml config file (default: ./farmstore.yaml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data file from the config
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, ValueEnum)]
enum Collection {
    Users,
    Products,
    Orders,
    Chats,
}

#[derive(Subcommand)]
enum Command {
    /// Create the data file with bootstrap data if it does not exist
    Init,

    /// Print the whole document
    Get,

    /// List the records of one collection
    List {
        /// Collection name
        collection: Collection,
    },

    /// Replace the whole document with the contents of a JSON file
    Replace {
        /// JSON file holding the new document
        #[arg(long, conflicts_with = "stdin")]
        file: Option<PathBuf>,
        /// Read the new document from stdin
        #[arg(long)]
        stdin: bool,
        /// Id of the user making the change
        #[arg(long)]
        actor: Option<String>,
    },

    /// Check credentials and print the matching user
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Register a new user
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// admin, farmer or buyer
        #[arg(long, default_value = "buyer", value_parser = parse_role)]
        role: Role,
    },

    /// Show products with their farmer's name
    Catalog,

    /// Check the stored document against the invariants
    Validate,

    /// Show backend, version and collection counts
    Status,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse().map_err(|e: farmstore::FarmStoreError| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    let default_path = Path::new("farmstore.yaml");
    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None if default_path.exists() => StoreConfig::load(default_path)?,
        None => StoreConfig::default(),
    };
    let mut config = config.with_env()?;
    if let Some(path) = &cli.data_file {
        config.data_path = path.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let store = Store::open(config)?;

    match cli.command {
        Command::Init => {
            print_output(&store.status()?, &cli.format)?;
        }

        Command::Get => {
            print_output(&store.get()?, &cli.format)?;
        }

        Command::List { collection } => {
            let doc = store.get()?;
            match collection {
                Collection::Users => print_output(&doc.users, &cli.format)?,
                Collection::Products => print_output(&doc.products, &cli.format)?,
                Collection::Orders => print_output(&doc.orders, &cli.format)?,
                Collection::Chats => print_output(&doc.chats, &cli.format)?,
            }
        }

        Command::Replace { file, stdin, actor } => {
            let raw = read_document(file, stdin)?;
            let doc: Document = serde_json::from_str(&raw)?;
            let version = store.replace(doc, actor.as_deref())?;
            print_output(
                &serde_json::json!({ "ok": true, "version": version }),
                &cli.format,
            )?;
        }

        Command::Login { email, password } => {
            let user = store.authenticate(&email, &password)?;
            print_output(&user, &cli.format)?;
        }

        Command::Signup {
            name,
            email,
            password,
            role,
        } => {
            let user = store.register(NewUser {
                name,
                email,
                password,
                role,
            })?;
            print_output(&user, &cli.format)?;
        }

        Command::Catalog => {
            let doc = store.get()?;
            print_output(&view::catalog(&doc), &cli.format)?;
        }

        Command::Validate => {
            let result = store.validate()?;
            print_output(
                &serde_json::json!({
                    "ok": result.is_ok(),
                    "errors": result.errors,
                    "warnings": result.warnings,
                }),
                &cli.format,
            )?;
        }

        Command::Status => {
            print_output(&store.status()?, &cli.format)?;
        }
    }

    Ok(())
}

fn print_output<T: Serialize + ?Sized>(
    value: &T,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}

fn read_document(
    file: Option<PathBuf>,
    stdin: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(path) = file {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read document file '{}': {e}", path.display()))?;
        Ok(content)
    } else if stdin {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        Err("replace needs --file or --stdin".into())
    }
}
