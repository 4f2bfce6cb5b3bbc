//! Rewrites module-style contract source into text a sandbox can invoke.
//!
//! The rewrite is purely textual and deterministic:
//!
//! 1. A bundler-style self-invoking wrapper is removed when both its opening
//!    line and its closing line are present.
//! 2. `export function handle` / `export async function handle` lose their
//!    `export` keyword. Nothing else exported is touched.
//! 3. A mode-specific trailer (and, for [`SandboxMode::Shared`], a prologue)
//!    is added around the body.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Entry point every contract must define.
pub const ENTRY_POINT: &str = "handle";
pub const CONTRACT_ERROR: &str = "ContractError";
pub const CONTRACT_ASSERT: &str = "ContractAssert";

lazy_static! {
    static ref RE_ARROW_WRAPPER_START: Regex = Regex::new(r"^\s*\(\s*\(\)\s*=>\s*\{\s*$").unwrap();
    static ref RE_FUNCTION_WRAPPER_START: Regex =
        Regex::new(r"^\s*\(\s*function\s*\(\)\s*\{\s*$").unwrap();
    static ref RE_WRAPPER_END: Regex = Regex::new(r"^\s*\}\s*\)\s*\(\)\s*;\s*$").unwrap();
    // `\b` would accept `$`, which continues a JS identifier.
    static ref RE_EXPORT_HANDLE: Regex =
        Regex::new(r"export\s+(async\s+)?function\s+handle([^A-Za-z0-9_$]|$)").unwrap();
    static ref RE_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref DEFAULT_NORMALIZER: SourceNormalizer = SourceNormalizer::default();
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("Invalid sandbox binding name: {0:?}")]
    InvalidBinding(String),
    #[error("Sandbox binding name used twice: {0}")]
    DuplicateBinding(String),
}

/// How the host sandbox isolates contract code.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SandboxMode {
    /// Every invocation gets fresh globals; the entry point is exported as a module value.
    Isolated,
    /// The host injects context, numeric library and logger through the arguments list.
    #[default]
    Shared,
}

/// Names under which the host's injected arguments are visible to the contract,
/// in argument order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxBindings {
    pub context: String,
    pub numeric: String,
    pub logger: String,
}

impl Default for SandboxBindings {
    fn default() -> Self {
        Self {
            context: "SmartWeave".to_string(),
            numeric: "BigNumber".to_string(),
            logger: "logger".to_string(),
        }
    }
}

impl SandboxBindings {
    pub fn validate(&self) -> Result<(), NormalizationError> {
        let names = [&self.context, &self.numeric, &self.logger];
        for (i, name) in names.iter().enumerate() {
            if !RE_IDENTIFIER.is_match(name) {
                return Err(NormalizationError::InvalidBinding(name.to_string()));
            }
            if names[..i].contains(name) {
                return Err(NormalizationError::DuplicateBinding(name.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceNormalizer {
    bindings: SandboxBindings,
}

impl SourceNormalizer {
    pub fn new(bindings: SandboxBindings) -> Result<Self, NormalizationError> {
        bindings.validate()?;
        Ok(Self { bindings })
    }

    pub fn bindings(&self) -> &SandboxBindings {
        &self.bindings
    }

    pub fn normalize(&self, source: &str, mode: SandboxMode) -> String {
        let body = strip_wrapper(source);
        let body = rewrite_entry_point(&body);

        debug!(
            "normalized {} bytes of contract source for {} sandbox",
            source.len(),
            mode
        );

        match mode {
            SandboxMode::Isolated => format!("{body}\nmodule.exports = {ENTRY_POINT};\n"),
            SandboxMode::Shared => format!(
                "{prologue}\n{body}\n;return {ENTRY_POINT};\n",
                prologue = self.prologue()
            ),
        }
    }

    fn prologue(&self) -> String {
        let SandboxBindings {
            context,
            numeric,
            logger,
        } = &self.bindings;
        format!(
            "const [{context}, {numeric}, {logger}] = arguments;\n\
             class {CONTRACT_ERROR} extends Error {{ constructor(message) {{ super(message); this.name = '{CONTRACT_ERROR}'; }} }}\n\
             function {CONTRACT_ASSERT}(cond, message) {{ if (!cond) throw new {CONTRACT_ERROR}(message); }}"
        )
    }
}

/// Normalizes with the default bindings.
pub fn normalize(source: &str, mode: SandboxMode) -> String {
    DEFAULT_NORMALIZER.normalize(source, mode)
}

/// Drops the first and last non-blank lines when they form a self-invoking wrapper.
pub fn strip_wrapper(source: &str) -> Cow<'_, str> {
    let lines: Vec<&str> = source.split('\n').collect();
    let first = lines.iter().position(|line| !line.trim().is_empty());
    let last = lines.iter().rposition(|line| !line.trim().is_empty());

    match (first, last) {
        (Some(first), Some(last))
            if first < last && is_wrapper_start(lines[first]) && RE_WRAPPER_END.is_match(lines[last]) =>
        {
            let body: Vec<&str> = lines
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != first && *i != last)
                .map(|(_, line)| *line)
                .collect();
            Cow::Owned(body.join("\n"))
        }
        _ => Cow::Borrowed(source),
    }
}

fn is_wrapper_start(line: &str) -> bool {
    RE_ARROW_WRAPPER_START.is_match(line) || RE_FUNCTION_WRAPPER_START.is_match(line)
}

/// Turns exported `handle` declarations into plain ones.
pub fn rewrite_entry_point(source: &str) -> String {
    RE_EXPORT_HANDLE
        .replace_all(source, |caps: &Captures| {
            let keyword = if caps.get(1).is_some() {
                "async function"
            } else {
                "function"
            };
            format!("{} {}{}", keyword, ENTRY_POINT, &caps[2])
        })
        .into_owned()
}
