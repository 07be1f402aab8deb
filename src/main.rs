use clap::{Parser, Subcommand, ValueEnum};
use payload_dynamic::app::App;
use payload_dynamic::errors::PayloadError;
use payload_dynamic::managers::options::{schema_field_options, OptionKind};
use payload_dynamic::schema::PayloadField;
use payload_dynamic::services::credentials::CredentialBundle;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "payload-dynamic", version, about = "Schema-discovering client for Payload CMS REST APIs")]
struct Cli {
    /// Credential bundle as JSON (baseUrl, apiKey | email+password, ...). Defaults to PAYLOAD_* env vars.
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the collection/global permission graph
    Discover,
    /// Print one dynamic option list
    Options {
        #[arg(value_enum)]
        kind: OptionsKind,
        /// Collection slug for `fields`
        #[arg(long)]
        collection: Option<String>,
        /// Global slug for `fields`
        #[arg(long)]
        global: Option<String>,
        /// JSON array of field definitions for `schema-fields`
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Run a JSON array of work items and print the result records
    Execute {
        /// Items file; reads stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Turn recoverable item failures into error records
        #[arg(long)]
        continue_on_fail: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OptionsKind {
    Collections,
    Globals,
    AuthCollections,
    Fields,
    SchemaFields,
}

fn read_json(path: Option<&Path>) -> Result<Value, PayloadError> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            PayloadError::invalid_params(format!("Failed to read {}: {}", path.display(), err))
        })?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| PayloadError::invalid_params(format!("Failed to read stdin: {}", err)))?;
            buf
        }
    };
    serde_json::from_str(&text)
        .map_err(|err| PayloadError::invalid_params(format!("Input is not valid JSON: {}", err)))
}

fn load_bundle(path: Option<&Path>) -> Result<CredentialBundle, PayloadError> {
    match path {
        Some(path) => CredentialBundle::from_value(&read_json(Some(path))?),
        None => CredentialBundle::from_env(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PayloadError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| PayloadError::internal(format!("Failed to render output: {}", err)))?;
    println!("{}", text);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), PayloadError> {
    if let Commands::Options {
        kind: OptionsKind::SchemaFields,
        schema,
        ..
    } = &cli.command
    {
        let fields: Vec<PayloadField> = serde_json::from_value(read_json(schema.as_deref())?)
            .map_err(|err| PayloadError::invalid_params(format!("Invalid field schema: {}", err)))?;
        return print_json(&schema_field_options(&fields));
    }

    let bundle = load_bundle(cli.credentials.as_deref())?;
    let app = App::initialize()?;

    let outcome = match cli.command {
        Commands::Discover => {
            let graph = app.discovery.discover_schema(&bundle).await?;
            print_json(&graph)
        }
        Commands::Options {
            kind,
            collection,
            global,
            ..
        } => {
            let kind = match (kind, collection, global) {
                (OptionsKind::Collections, _, _) => OptionKind::Collections,
                (OptionsKind::Globals, _, _) => OptionKind::Globals,
                (OptionsKind::AuthCollections, _, _) => OptionKind::AuthCollections,
                (OptionsKind::Fields, Some(slug), None) => OptionKind::CollectionFields(slug),
                (OptionsKind::Fields, None, Some(slug)) => OptionKind::GlobalFields(slug),
                (OptionsKind::Fields, _, _) => {
                    return Err(PayloadError::invalid_params(
                        "fields needs exactly one of --collection or --global",
                    ))
                }
                (OptionsKind::SchemaFields, _, _) => {
                    return Err(PayloadError::internal("schema-fields handled above"))
                }
            };
            let options = app.options.load(&bundle, &kind).await?;
            print_json(&options)
        }
        Commands::Execute {
            input,
            continue_on_fail,
        } => {
            let items = match read_json(input.as_deref())? {
                Value::Array(items) => items,
                single @ Value::Object(_) => vec![single],
                _ => {
                    return Err(PayloadError::invalid_params(
                        "Input must be a JSON array of item parameter objects",
                    ))
                }
            };
            let results = app
                .executor
                .execute(&bundle, &items, continue_on_fail)
                .await?;
            print_json(&results)
        }
    };
    app.shutdown();
    outcome
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("payload-dynamic: {}", err);
        if let Some(hint) = &err.hint {
            eprintln!("hint: {}", hint);
        }
        std::process::exit(1);
    }
}
