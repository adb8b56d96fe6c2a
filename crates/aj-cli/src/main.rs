//! CLI entry point for attr-json.
//!
//! This binary loads a declarative schema document and runs the typed
//! attribute engine against JSON documents: casting raw input into a model,
//! reading stored model JSON back, normalising record columns, and building
//! containment fragments for attribute paths.
//!
//! # Usage
//!
//! ```bash
//! attr-json --schema schema.json <COMMAND>
//!
//! # Show models, attributes, and store keys
//! attr-json --schema schema.json describe
//!
//! # Cast raw input (stdin) into a model and print its stored form
//! echo '{"title": 42}' | attr-json --schema schema.json cast --model Drawing
//!
//! # Normalise a record's JSON columns
//! attr-json --schema schema.json record --input row.json
//!
//! # Containment fragment for a nested attribute path
//! attr-json --schema schema.json contains --path drawing.title --value '"untitled"'
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::{Read, Write};
use std::sync::Arc;

use aj_core::Config;
use aj_model::{
    AttributeDefinition, Model, ModelClass, Record, RecordSchema, Registry, Schema, Value,
    ValueMap, resolve_path,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as Json};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Typed attributes for JSON containers.
///
/// Loads a schema document declaring models and a record schema, then casts,
/// deserializes, or normalises JSON documents against it.
#[derive(Parser)]
#[command(name = "attr-json", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to the schema document.
    #[arg(short, long, global = true, env = "ATTR_JSON_SCHEMA")]
    schema: Option<Utf8PathBuf>,

    /// Path to a configuration file (defaults apply if omitted).
    #[arg(short, long, global = true, env = "ATTR_JSON_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Print JSON on a single line.
    #[arg(long, global = true)]
    compact: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Describe every model and the record schema.
    Describe,

    /// Cast raw attribute input into a model and print its stored form.
    Cast {
        /// Model to cast into.
        #[arg(short, long)]
        model: String,

        /// Input file (defaults to stdin).
        #[arg(short, long)]
        input: Option<Utf8PathBuf>,
    },

    /// Deserialize stored model JSON and print its attributes.
    Deserialize {
        /// Model to deserialize into.
        #[arg(short, long)]
        model: String,

        /// Input file (defaults to stdin).
        #[arg(short, long)]
        input: Option<Utf8PathBuf>,
    },

    /// Load record columns and print them normalised.
    Record {
        /// Input file with one JSON object per column (defaults to stdin).
        #[arg(short, long)]
        input: Option<Utf8PathBuf>,
    },

    /// Print the JSON containment fragment for a record attribute path.
    Contains {
        /// Dotted attribute path, e.g. `author.name`.
        #[arg(short, long)]
        path: String,

        /// Value to match (JSON; bare words are read as strings).
        #[arg(long)]
        value: String,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `warn` level by default. Logs go
/// to stderr so stdout stays valid JSON.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "warn" };
        EnvFilter::new(level)
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration and schema named on the command line.
fn load_schema(cli: &Cli) -> color_eyre::Result<Schema> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let path = cli
        .schema
        .as_deref()
        .ok_or_else(|| eyre!("No schema given: pass --schema or set ATTR_JSON_SCHEMA"))?;

    Ok(Schema::load(path, &config)?)
}

/// Reads a JSON object from a file or stdin.
fn read_object(input: Option<&Utf8Path>) -> color_eyre::Result<JsonMap<String, Json>> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path.as_std_path())
            .wrap_err_with(|| format!("Failed to read {path}"))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    match serde_json::from_str(&text).wrap_err("Input is not valid JSON")? {
        Json::Object(object) => Ok(object),
        other => Err(eyre!(
            "Expected a JSON object, found {}",
            Value::from(other).kind_name()
        )),
    }
}

/// Parses a command-line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Json {
    serde_json::from_str(raw).unwrap_or_else(|_| Json::String(raw.to_owned()))
}

fn find_model<'a>(schema: &'a Schema, name: &str) -> color_eyre::Result<&'a Arc<ModelClass>> {
    schema.model(name).ok_or_else(|| {
        let known: Vec<_> = schema.models().map(|class| class.name()).collect();
        eyre!("Unknown model '{name}' (known: {})", known.join(", "))
    })
}

fn record_schema(schema: &Schema) -> color_eyre::Result<&Arc<RecordSchema>> {
    schema
        .record()
        .ok_or_else(|| eyre!("The schema does not declare a record"))
}

// =============================================================================
// DESCRIBE OUTPUT
// =============================================================================

#[derive(Debug, Serialize)]
struct AttributeSummary<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_name: String,
    kind: &'static str,
    store_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<&'a str>,
    array: bool,
    has_default: bool,
}

impl<'a> AttributeSummary<'a> {
    fn new(definition: &'a AttributeDefinition) -> Self {
        Self {
            name: definition.name(),
            type_name: definition.ty().type_name(),
            kind: kind_label(definition),
            store_key: definition.store_key(),
            container: definition.container(),
            array: definition.ty().is_array(),
            has_default: definition.has_default(),
        }
    }
}

fn kind_label(definition: &AttributeDefinition) -> &'static str {
    use aj_model::TypeKind;

    let ty = definition.ty().element_type().unwrap_or(definition.ty());
    match ty.kind() {
        TypeKind::Primitive => "primitive",
        TypeKind::Array => "array",
        TypeKind::Model => "model",
        TypeKind::Polymorphic => "polymorphic",
        TypeKind::Custom => "custom",
    }
}

fn summarize(registry: &Registry) -> Vec<AttributeSummary<'_>> {
    registry
        .definitions()
        .map(|definition| AttributeSummary::new(definition))
        .collect()
}

#[derive(Debug, Serialize)]
struct ModelSummary<'a> {
    name: &'a str,
    unknown_key: &'static str,
    attributes: Vec<AttributeSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct RecordSummary<'a> {
    default_container: &'a str,
    unknown_key: &'static str,
    columns: Vec<&'a str>,
    attributes: Vec<AttributeSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct Description<'a> {
    models: Vec<ModelSummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<RecordSummary<'a>>,
}

fn describe(schema: &Schema) -> Description<'_> {
    Description {
        models: schema
            .models()
            .map(|class| ModelSummary {
                name: class.name(),
                unknown_key: class.unknown_key().label(),
                attributes: summarize(class.registry()),
            })
            .collect(),
        record: schema.record().map(|record| RecordSummary {
            default_container: record.default_container(),
            unknown_key: record.unknown_key().label(),
            columns: record.columns(),
            attributes: summarize(record.registry()),
        }),
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn run_cast(schema: &Schema, model: &str, input: JsonMap<String, Json>) -> color_eyre::Result<Json> {
    let class = find_model(schema, model)?;
    let attributes: ValueMap = input
        .into_iter()
        .map(|(key, json)| (key, Value::from(json)))
        .collect();

    let instance = Model::from_attributes(class, attributes)
        .wrap_err_with(|| format!("Failed to cast input to {model}"))?;
    debug!(model, attributes = instance.attributes().len(), "Cast input");

    Ok(instance.to_json()?)
}

fn run_deserialize(
    schema: &Schema,
    model: &str,
    input: JsonMap<String, Json>,
) -> color_eyre::Result<Json> {
    let class = find_model(schema, model)?;
    let instance = Model::from_serializable(class, input)
        .wrap_err_with(|| format!("Failed to deserialize {model}"))?;

    Ok(Value::Map(instance.into_attributes()).to_json()?)
}

fn run_record(schema: &Schema, input: &JsonMap<String, Json>) -> color_eyre::Result<Json> {
    let record_schema = record_schema(schema)?;
    let record = Record::load(record_schema, input)?;
    info!(attributes = record.attributes().len(), "Record loaded");

    Ok(Json::Object(record.to_columns()?))
}

fn run_contains(schema: &Schema, path: &str, value: &str) -> color_eyre::Result<Json> {
    let record_schema = record_schema(schema)?;
    let resolved = resolve_path(record_schema.registry(), path)?;
    let fragment = resolved.containment(Value::from(parse_value(value)))?;

    let container = resolved
        .container()
        .unwrap_or(record_schema.default_container());
    let mut output = JsonMap::new();
    output.insert(container.to_owned(), fragment);
    Ok(Json::Object(output))
}

/// Writes JSON to stdout.
fn print_json<T: Serialize>(value: &T, compact: bool) -> color_eyre::Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{text}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load the schema every command works against
    let schema = load_schema(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Describe => print_json(&describe(&schema), cli.compact),
        Commands::Cast { model, input } => {
            let object = read_object(input.as_deref())?;
            print_json(&run_cast(&schema, model, object)?, cli.compact)
        }
        Commands::Deserialize { model, input } => {
            let object = read_object(input.as_deref())?;
            print_json(&run_deserialize(&schema, model, object)?, cli.compact)
        }
        Commands::Record { input } => {
            let object = read_object(input.as_deref())?;
            print_json(&run_record(&schema, &object)?, cli.compact)
        }
        Commands::Contains { path, value } => {
            print_json(&run_contains(&schema, path, value)?, cli.compact)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "models": [
            {"name": "Author", "attributes": {"name": {"type": "string", "store_key": "n"}}},
            {"name": "Post", "attributes": {
                "title": "string",
                "views": {"type": "integer", "default": 0},
                "authors": {"type": "Author", "array": true}
            }}
        ],
        "record": {
            "attributes": {
                "post": "Post",
                "flags": {"type": "boolean", "container": "settings", "store_key": "f"}
            }
        }
    }"#;

    fn schema() -> Schema {
        Schema::from_json_str(SCHEMA, &Config::default()).unwrap()
    }

    fn object(json: Json) -> JsonMap<String, Json> {
        match json {
            Json::Object(object) => object,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3"), json!(3));
        assert_eq!(parse_value(r#""x""#), json!("x"));
        assert_eq!(parse_value("hello world"), json!("hello world"));
    }

    #[test]
    fn test_describe() {
        let schema = schema();
        let text = serde_json::to_string(&describe(&schema)).unwrap();
        insta::assert_snapshot!(text, @r#"{"models":[{"name":"Author","unknown_key":"raise","attributes":[{"name":"name","type":"string","kind":"primitive","store_key":"n","array":false,"has_default":false}]},{"name":"Post","unknown_key":"raise","attributes":[{"name":"title","type":"string","kind":"primitive","store_key":"title","array":false,"has_default":false},{"name":"views","type":"integer","kind":"primitive","store_key":"views","array":false,"has_default":true},{"name":"authors","type":"array<Author>","kind":"model","store_key":"authors","array":true,"has_default":true}]}],"record":{"default_container":"json_attributes","unknown_key":"raise","columns":["json_attributes","settings"],"attributes":[{"name":"post","type":"Post","kind":"model","store_key":"post","container":"json_attributes","array":false,"has_default":false},{"name":"flags","type":"boolean","kind":"primitive","store_key":"f","container":"settings","array":false,"has_default":false}]}}"#);
    }

    #[test]
    fn test_contains_wraps_in_container() {
        let schema = schema();
        let fragment = run_contains(&schema, "post.authors.name", "Ann").unwrap();
        assert_eq!(
            fragment,
            json!({"json_attributes": {"post": {"authors": [{"n": "Ann"}]}}})
        );

        let fragment = run_contains(&schema, "flags", "off").unwrap();
        assert_eq!(fragment, json!({"settings": {"f": false}}));
    }

    #[test]
    fn test_find_model_lists_known_models() {
        let schema = schema();
        let err = find_model(&schema, "Comment").unwrap_err();
        assert_eq!(err.to_string(), "Unknown model 'Comment' (known: Author, Post)");
    }

    #[test]
    fn test_cast_prints_stored_form() {
        let schema = schema();
        let output = run_cast(
            &schema,
            "Post",
            object(json!({"title": 42, "authors": {"name": "Ann"}})),
        )
        .unwrap();
        insta::assert_snapshot!(
            output.to_string(),
            @r#"{"title":"42","views":0,"authors":[{"n":"Ann"}]}"#
        );

        let err = run_cast(&schema, "Post", object(json!({"subtitle": "x"}))).unwrap_err();
        assert_eq!(err.to_string(), "Failed to cast input to Post");
    }

    #[test]
    fn test_deserialize_prints_attribute_names() {
        let schema = schema();
        let output = run_deserialize(
            &schema,
            "Author",
            object(json!({"n": "Le Guin"})),
        )
        .unwrap();
        assert_eq!(output, json!({"name": "Le Guin"}));

        let output =
            run_deserialize(&schema, "Post", object(json!({"views": "3", "title": "Dune"})))
                .unwrap();
        assert_eq!(output, json!({"title": "Dune", "views": 3, "authors": []}));
    }

    #[test]
    fn test_record_normalises_columns() {
        let schema = schema();
        let output = run_record(
            &schema,
            &object(json!({
                "json_attributes": {"post": {"title": "x"}},
                "settings": {"f": "0"},
            })),
        )
        .unwrap();
        assert_eq!(
            output,
            json!({
                "json_attributes": {"post": {"title": "x", "views": 0, "authors": []}},
                "settings": {"f": false},
            })
        );

        let err = run_record(&schema, &object(json!({"settings": {"g": 1}}))).unwrap_err();
        assert_eq!(err.to_string(), "unknown attribute 'g' for record");
    }
}
