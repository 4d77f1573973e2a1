//! jq pre-processing for CLI inputs: each document is piped through a filter and every output
//! becomes a document of its own.
use anyhow::{anyhow, Context, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// A jq filter checked up front and applied per document.
pub struct JqFilter {
    source: String,
}

impl JqFilter {
    /// Fails on syntax errors and undefined functions.
    pub fn compile(source: &str) -> Result<Self> {
        run_jaq(source, &Value::Null, false)?;
        Ok(Self { source: source.to_string() })
    }

    pub fn run(&self, input: &Value) -> Result<Vec<Value>> {
        run_jaq(&self.source, input, true)
    }
}

fn run_jaq(filter_src: &str, input: &Value, execute: bool) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(parse_errors)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(undefined_errors)?;
    if !execute {
        return Ok(Vec::new());
    }

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in outputs {
        let v = item.map_err(|e| anyhow!("jq `{filter_src}` failed: {e:?}"))?;
        // Val displays as JSON text
        let json: Value = serde_json::from_str(&v.to_string())
            .with_context(|| format!("jq `{filter_src}` produced a non-JSON value"))?;
        out.push(json);
    }
    Ok(out)
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs.into_iter()
        .map(|(file, err)| format!("parse error: {err:?} in `{}`", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines: Vec<String> = errs.into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("undefined `{name}`: {undef:?} in `{}`", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}
