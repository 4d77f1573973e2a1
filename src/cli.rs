//! CLI: check schema documents, decode JSON documents against them.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use shapecast::jq_exec::JqFilter;
use shapecast::{schema_file, Decoder, Registry, Target};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against registered structural schemas
#[derive(Parser, Debug)]
#[command(name = "shapecast")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// register schema documents and list the resulting types
    Check(CheckCmd),
    /// decode JSON documents as one registered type
    Decode(DecodeCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema documents (a schema object or an array of them); literal paths or quoted globs
    #[arg(long, short, num_args = 1.., required = true)]
    schemas: Vec<String>,

    /// do not register the built-in casters (Date, Latitude, Longitude, NonEmptyString)
    #[arg(long, default_value_t = false)]
    no_builtins: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

#[derive(clap::Parser, Debug)]
struct DecodeCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// registered type to decode as
    #[arg(long = "type", short = 't')]
    type_name: String,

    /// decode each document as an array of `--type`
    #[arg(long, default_value_t = false)]
    array: bool,

    /// output .json file for the accepted documents (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document, labelled for reporting.
struct Document {
    label: String,
    value: Value,
}

enum Outcome {
    Accepted(Value),
    Rejected(Vec<String>),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load_registry(&self) -> Result<Registry> {
        let mut registry = if self.no_builtins {
            Registry::new()
        } else {
            Registry::with_builtins().context("failed to register built-in casters")?
        };
        let mut schemas = Vec::new();
        for path in resolve_file_path_patterns(&self.schemas)? {
            let source = read_source(&path)?;
            let loaded = schema_file::from_str(&source)
                .with_context(|| format!("invalid schema file {}", path.display()))?;
            schemas.extend(loaded);
        }
        registry.register_all(schemas).context("schema setup failed")?;
        Ok(registry)
    }
}

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let jq = self.jq_expr.as_deref().map(JqFilter::compile).transpose()?;
        let mut out = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let source = read_source(&source_path)?;
            let path_label = source_path.to_string_lossy().to_string();
            for (label, json_value) in self.parse(&path_label, &source)? {
                let json_value = self.select(&label, json_value)?;
                match jq.as_ref() {
                    None => out.push(Document { label, value: json_value }),
                    Some(jq) => {
                        let results = jq.run(&json_value)
                            .with_context(|| format!("failed to apply jq expression to {label}"))?;
                        for (i, value) in results.into_iter().enumerate() {
                            out.push(Document { label: format!("{label}#{i}"), value });
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn parse(&self, path_label: &str, source: &str) -> Result<Vec<(String, Value)>> {
        if !self.ndjson {
            let value: Value = serde_json::from_str(source)
                .with_context(|| format!("failed to parse JSON source file ({path_label})"))?;
            return Ok(vec![(path_label.to_string(), value)]);
        }
        source.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| -> Result<(String, Value)> {
                let label = format!("{path_label}:{}", i + 1);
                let value: Value = serde_json::from_str(line)
                    .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                Ok((label, value))
            })
            .collect()
    }

    fn select(&self, label: &str, value: Value) -> Result<Value> {
        match self.json_pointer.as_deref() {
            None => Ok(value),
            Some(pointer) => value.pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} matches nothing in {label}")),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Check(cmd) => cmd.run(),
            Command::Decode(cmd) => cmd.run(),
        }
    }
}

impl CheckCmd {
    fn run(&self) -> Result<()> {
        let registry = self.schema_settings.load_registry()?;
        let mut count = 0;
        for name in registry.names() {
            let marker = if registry.synthesizes_attrs(name) { " (attrs)" } else { "" };
            println!("{} {name}{}", "✓".green(), marker.dimmed());
            count += 1;
        }
        eprintln!("{count} types registered");
        Ok(())
    }
}

impl DecodeCmd {
    fn run(&self) -> Result<()> {
        let decoder = self.schema_settings.load_registry()?.finish();
        let target = if self.array {
            Target::array_of(self.type_name.as_str())
        } else {
            Target::named(self.type_name.as_str())
        };
        let documents = self.input_settings.load()?;

        let outcomes = documents.par_iter()
            .map(|doc| decode_document(&decoder, &target, doc))
            .collect::<Result<Vec<_>>>()?;

        let mut accepted = Vec::new();
        let mut rejected = 0;
        for (doc, outcome) in documents.iter().zip(outcomes) {
            match outcome {
                Outcome::Accepted(value) => {
                    eprintln!("{} {}", "✓".green(), doc.label);
                    accepted.push(value);
                }
                Outcome::Rejected(errors) => {
                    eprintln!("{} {}", "✗".red(), doc.label.bold());
                    for line in errors {
                        eprintln!("    {}", line.yellow());
                    }
                    rejected += 1;
                }
            }
        }

        let output = serde_json::to_string_pretty(&accepted)?;
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, &output)
                    .with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => println!("{output}"),
        }

        if rejected > 0 {
            bail!("{rejected} of {} documents rejected as {target}", documents.len());
        }
        Ok(())
    }
}

fn decode_document(decoder: &Decoder, target: &Target, doc: &Document) -> Result<Outcome> {
    let mut errors = Vec::new();
    let decoded = decoder.decode(target, &doc.value, |e| errors = e)
        .with_context(|| format!("{}: cannot decode as {target}", doc.label))?;
    Ok(match decoded {
        Some(d) => Outcome::Accepted(decoder.encode(target, &d)?),
        None => Outcome::Rejected(errors),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                // an explicit glob that matched nothing is almost always a typo
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
