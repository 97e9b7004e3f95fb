//! DLP redaction: a combined alternation regex scrubs matches out of tool
//! arguments before the call proceeds, and out of text content in the
//! result on the way back. A compile failure degrades to a pass-through
//! with a logged error — availability over confidentiality for what is a
//! defense-in-depth layer, not the primary access boundary.

use std::sync::Arc;

use gateway_core::config::DlpConfig;
use gateway_core::error::FilterError;
use gateway_core::pipeline::{ExecutionRequest, Executor, ExecutorFuture, ToolFilter};
use regex::Regex;
use serde_json::Value;

pub const REDACTION_TOKEN: &str = "***REDACTED***";

const BUILTIN_PATTERNS: &[&str] = &[
    r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
    r"\b(?:\d[ -]?){13,16}\b",
    r"\b\d{3}-\d{2}-\d{4}\b",
];

fn compile_matcher(config: &DlpConfig) -> Option<Regex> {
    let mut patterns: Vec<String> = BUILTIN_PATTERNS.iter().map(|p| p.to_string()).collect();
    patterns.extend(config.custom_patterns.iter().cloned());
    let combined = patterns
        .into_iter()
        .map(|p| format!("(?:{p})"))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&combined) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, "DLP pattern set failed to compile, filter is a pass-through");
            None
        }
    }
}

fn redact_string(re: &Regex, s: &str) -> String {
    re.replace_all(s, REDACTION_TOKEN).into_owned()
}

/// Recursively redact every leaf string in a decoded JSON value. Used for
/// tool call arguments, where no field is assumed to carry binary data.
fn redact_tree(re: &Regex, value: &mut Value) {
    match value {
        Value::String(s) => *s = redact_string(re, s),
        Value::Array(items) => items.iter_mut().for_each(|v| redact_tree(re, v)),
        Value::Object(map) => map.values_mut().for_each(|v| redact_tree(re, v)),
        _ => {}
    }
}

/// Redact only the text-bearing fields of an MCP-shaped tool result
/// envelope (`content: [{type, text}]` / `{type: "resource", resource: {text}}`),
/// leaving binary content (`data`, `blob`) untouched. Envelopes that don't
/// match this shape are returned unchanged.
fn redact_result_content(re: &Regex, value: &mut Value) {
    let Some(content) = value.get_mut("content").and_then(|c| c.as_array_mut()) else {
        return;
    };
    for item in content.iter_mut() {
        let kind = item.get("type").and_then(|t| t.as_str()).map(str::to_string);
        match kind.as_deref() {
            Some("text") => {
                if let Some(Value::String(text)) = item.get_mut("text") {
                    *text = redact_string(re, text);
                }
            }
            Some("resource") => {
                if let Some(resource) = item.get_mut("resource") {
                    if let Some(Value::String(text)) = resource.get_mut("text") {
                        *text = redact_string(re, text);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Build the DLP tool filter. A disabled config is a pass-through; so is a
/// config whose combined pattern set fails to compile.
pub fn dlp_filter(config: DlpConfig) -> ToolFilter {
    if !config.enabled {
        return Arc::new(|next: Executor| next);
    }
    let Some(regex) = compile_matcher(&config) else {
        return Arc::new(|next: Executor| next);
    };
    let regex = Arc::new(regex);

    Arc::new(move |next: Executor| {
        let regex = regex.clone();
        let next = next.clone();
        Arc::new(move |mut req: ExecutionRequest| -> ExecutorFuture {
            let regex = regex.clone();
            let next = next.clone();
            Box::pin(async move {
                if let Ok(mut parsed) = req.parsed_inputs() {
                    redact_tree(&regex, &mut parsed);
                    req.set_parsed_inputs(&parsed)?;
                }
                let result = next(req).await;
                match result {
                    Ok(mut value) => {
                        redact_result_content(&regex, &mut value);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            })
        })
    })
}

/// Registry-facing factory: parses `Middleware.settings` into [`DlpConfig`].
pub fn factory() -> gateway_core::McpFactory {
    Arc::new(|mw: &gateway_core::Middleware| {
        let value = serde_json::Value::Object(mw.settings.clone().into_iter().collect());
        let config: DlpConfig = serde_json::from_value(value).unwrap_or_default();
        dlp_filter(config)
    })
}
