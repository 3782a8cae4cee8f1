//! Inline directives: `/*{{key:value}}*/`
//!
//! Six keys are recognised. `file`, `temp` and `loop` expand a statement
//! during preparation; `save`, `load` and `call` ride along in the prepared
//! SQL and are acted on by the execute and upload phases.

use std::collections::BTreeMap;
use std::fmt;

/// Opening marker of a directive
pub const START: &str = "/*{{";

/// Closing marker of a directive
pub const END: &str = "}}*/";

/// Replacement that leaves a searchable annotation behind.
///
/// Rendered as `/* {{replaceMe:temp}} */` for a `temp` directive; the space
/// after `/*` keeps it from being read as a directive again.
pub const ANNOTATION_PATTERN: &str = "/* {{replaceMe:{cmdname}}} */";

/// Replacement for `file` directives.
///
/// Carries the target as well, so each include has a slot of its own.
pub const INCLUDE_PATTERN: &str = "/* {{replaceMe:{cmdname}:{cmdvalue}}} */";

/// The directive keys, in the order the preparation engine handles them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectiveKey {
    File,
    Temp,
    Loop,
    Save,
    Load,
    Call,
}

impl DirectiveKey {
    pub const ALL: [DirectiveKey; 6] = [
        DirectiveKey::File,
        DirectiveKey::Temp,
        DirectiveKey::Loop,
        DirectiveKey::Save,
        DirectiveKey::Load,
        DirectiveKey::Call,
    ];

    /// Keys that must survive preparation
    pub const POST_EXECUTE: [DirectiveKey; 3] =
        [DirectiveKey::Save, DirectiveKey::Load, DirectiveKey::Call];

    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKey::File => "file",
            DirectiveKey::Temp => "temp",
            DirectiveKey::Loop => "loop",
            DirectiveKey::Save => "save",
            DirectiveKey::Load => "load",
            DirectiveKey::Call => "call",
        }
    }

    /// Parse a key, ignoring case and surrounding whitespace
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for DirectiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Inline-include a local SQL file
    File(String),
    /// Materialise a CSV as a volatile table
    Temp(String),
    /// Emit one statement per CSV row
    Loop(String),
    /// Save the result to this CSV name
    Save(String),
    /// Append the saved CSV to this table
    Load(String),
    /// Call this procedure after the load
    Call(String),
}

impl Directive {
    pub fn new(key: DirectiveKey, value: impl Into<String>) -> Self {
        let value = value.into();
        match key {
            DirectiveKey::File => Directive::File(value),
            DirectiveKey::Temp => Directive::Temp(value),
            DirectiveKey::Loop => Directive::Loop(value),
            DirectiveKey::Save => Directive::Save(value),
            DirectiveKey::Load => Directive::Load(value),
            DirectiveKey::Call => Directive::Call(value),
        }
    }

    pub fn key(&self) -> DirectiveKey {
        match self {
            Directive::File(_) => DirectiveKey::File,
            Directive::Temp(_) => DirectiveKey::Temp,
            Directive::Loop(_) => DirectiveKey::Loop,
            Directive::Save(_) => DirectiveKey::Save,
            Directive::Load(_) => DirectiveKey::Load,
            Directive::Call(_) => DirectiveKey::Call,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Directive::File(v)
            | Directive::Temp(v)
            | Directive::Loop(v)
            | Directive::Save(v)
            | Directive::Load(v)
            | Directive::Call(v) => v,
        }
    }

    /// Directive text as written in a template
    pub fn to_marker(&self) -> String {
        format!("{}{}:{}{}", START, self.key(), self.value(), END)
    }
}

/// Result of [`extract`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted directives; a repeated key keeps its last value
    pub directives: BTreeMap<DirectiveKey, String>,
    /// Text with every extracted occurrence replaced
    pub text: String,
}

impl Extraction {
    pub fn get(&self, key: DirectiveKey) -> Option<&str> {
        self.directives.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: DirectiveKey) -> bool {
        self.directives.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Directives in handling order (`file`, `temp`, `loop`, `save`, ...)
    pub fn directives(&self) -> Vec<Directive> {
        self.directives
            .iter()
            .map(|(k, v)| Directive::new(*k, v.clone()))
            .collect()
    }
}

/// Render the replacement text for one occurrence
pub fn render_pattern(pattern: &str, key: DirectiveKey, value: &str) -> String {
    pattern
        .replace("{cmdname}", key.as_str())
        .replace("{cmdkey}", key.as_str())
        .replace("{cmdvalue}", value)
}

/// Extract directives from `text`.
///
/// Every `/*{{key:value}}*/` occurrence whose key is known and not in
/// `skip_keys` is replaced by `replace_pattern` and recorded. Skipped,
/// unknown and malformed (no `:`) occurrences are left verbatim. A start
/// marker without a closing marker ends the scan; the rest of the text is
/// kept as is.
pub fn extract(text: &str, replace_pattern: &str, skip_keys: &[DirectiveKey]) -> Extraction {
    let mut directives = BTreeMap::new();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(START) {
        let body_start = start + START.len();
        let Some(body_len) = rest[body_start..].find(END) else {
            log::warn!("unterminated directive, leaving remaining text unchanged");
            break;
        };
        let occurrence_end = body_start + body_len + END.len();
        let occurrence = &rest[start..occurrence_end];
        let body = &rest[body_start..body_start + body_len];

        out.push_str(&rest[..start]);
        match body.split_once(':') {
            None => {
                log::warn!("malformed directive (no ':') left in place: {}", occurrence);
                out.push_str(occurrence);
            }
            Some((raw_key, raw_value)) => match DirectiveKey::parse(raw_key) {
                None => {
                    log::info!("unknown directive '{}' left in place", raw_key.trim());
                    out.push_str(occurrence);
                }
                Some(key) if skip_keys.contains(&key) => {
                    out.push_str(occurrence);
                }
                Some(key) => {
                    let value = raw_value.trim();
                    log::debug!("  directive found: {} = {}", key, value);
                    out.push_str(&render_pattern(replace_pattern, key, value));
                    directives.insert(key, value.to_string());
                }
            },
        }
        rest = &rest[occurrence_end..];
    }
    out.push_str(rest);

    Extraction {
        directives,
        text: out,
    }
}

#[cfg(test)]
#[path = "directive_test.rs"]
mod tests;
