//! Placeholder extraction and substitution for command templates

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `{name}` where the name holds no braces, so `{{x}}` yields `x` and `{}` is ignored
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown parameter kind `{0}` (expected string, file or file_or_string)")]
    UnknownKind(String),
    #[error("Invalid parameter type entry `{0}` (expected name=kind)")]
    InvalidEntry(String),
}

/// Advisory hint for how a parameter value should be collected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    #[default]
    #[serde(rename = "字符串", alias = "string")]
    String,
    #[serde(rename = "文件", alias = "file")]
    File,
    #[serde(rename = "文件或字符串", alias = "file_or_string")]
    FileOrString,
}

impl ParamKind {
    /// Whether a file path is an acceptable value (the form offers a path hint)
    #[must_use]
    pub fn accepts_file(self) -> bool {
        matches!(self, ParamKind::File | ParamKind::FileOrString)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::String => f.write_str("string"),
            ParamKind::File => f.write_str("file"),
            ParamKind::FileOrString => f.write_str("file_or_string"),
        }
    }
}

impl FromStr for ParamKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "string" | "字符串" => Ok(ParamKind::String),
            "file" | "文件" => Ok(ParamKind::File),
            "file_or_string" | "文件或字符串" => Ok(ParamKind::FileOrString),
            other => Err(TemplateError::UnknownKind(other.to_string())),
        }
    }
}

/// Every placeholder occurrence in `template`, left to right, duplicates included.
///
/// Only the innermost braces count: `{a{b}` yields `b` and `{}` yields nothing.
#[must_use]
pub fn extract_parameters(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitute `{name}` (and the doubled `{{name}}`) for every name in `values`.
///
/// Placeholders without a value are left untouched. Inserted values are never
/// scanned again, so a value that itself looks like a placeholder stays literal.
/// Extra braces around a doubled placeholder are kept: `{{{x}}}` with `x = 1` becomes `{1}`.
#[must_use]
pub fn render<S: std::hash::BuildHasher>(
    template: &str,
    values: &HashMap<String, String, S>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match substitute_at(tail, values) {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Match a placeholder at the start of `tail`, preferring the doubled form.
fn substitute_at<'v, S: std::hash::BuildHasher>(
    tail: &str,
    values: &'v HashMap<String, String, S>,
) -> Option<(&'v str, usize)> {
    if let Some(inner) = tail.strip_prefix("{{")
        && let Some(close) = inner.find("}}")
        && let Some(value) = values.get(&inner[..close])
    {
        return Some((value, close + 4));
    }
    let inner = &tail[1..];
    let close = inner.find('}')?;
    values
        .get(&inner[..close])
        .map(|value| (value.as_str(), close + 2))
}

/// Parse the one-line `name=kind, name=kind` form used by the editor dialogs.
///
/// # Errors
///
/// Returns `TemplateError::InvalidEntry` for an entry without `=`, or
/// `TemplateError::UnknownKind` for an unrecognised kind.
pub fn parse_param_types(entries: &str) -> Result<BTreeMap<String, ParamKind>, TemplateError> {
    entries.split([',', ';'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, kind) = entry
                .split_once('=')
                .ok_or_else(|| TemplateError::InvalidEntry(entry.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(TemplateError::InvalidEntry(entry.to_string()));
            }
            Ok((name.to_string(), kind.parse()?))
        })
        .collect()
}

/// Inverse of [`parse_param_types`]
#[must_use]
pub fn format_param_types(types: &BTreeMap<String, ParamKind>) -> String {
    types
        .iter()
        .map(|(name, kind)| format!("{name}={kind}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keep only the placeholders of `template`, filling absent ones with `ParamKind::String`
#[must_use]
pub fn normalize_param_types(
    template: &str,
    types: &BTreeMap<String, ParamKind>,
) -> BTreeMap<String, ParamKind> {
    extract_parameters(template)
        .into_iter()
        .map(|name| {
            let kind = types.get(&name).copied().unwrap_or_default();
            (name, kind)
        })
        .collect()
}

/// Unique placeholder names in order of first appearance
#[must_use]
pub fn unique_parameters(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_parameters(template)
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
