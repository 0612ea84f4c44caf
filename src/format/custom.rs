//! User-defined line layouts.
//!
//! Templates use `$name` or `${name}` placeholders and `$$` for a literal
//! dollar sign. The recognised names are `timestamp`, `log_level` and
//! `message`.
//!
//! ```text
//!     "$timestamp [$log_level] ${message}!"
//!        │            │           │
//!        ▼            ▼           ▼
//!     [Field(Ts), Lit(" ["), Field(Level), Lit("] "), Field(Msg), Lit("!")]
//! ```
//!
//! The template is parsed once. A template that does not parse falls back
//! to `{timestamp}, {log_level}, {message}` with a single warning.

use super::LogFormatter;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::warn;

/// Why a template was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The placeholder names a field that is not available.
    #[error("unknown field '{0}' in custom format")]
    UnknownField(String),

    /// A `$` that starts neither a name, a braced name nor `$$`.
    #[error("invalid placeholder at byte {0} in custom format")]
    InvalidPlaceholder(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Timestamp,
    LogLevel,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field(Field),
}

/// A parsed custom template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    /// Parses `source`.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let at = offset + pos;
            let after = &rest[pos + 1..];

            let (name, consumed) = if after.starts_with('$') {
                literal.push('$');
                (None, 1)
            } else if let Some(braced) = after.strip_prefix('{') {
                let end = braced
                    .find('}')
                    .ok_or(TemplateError::InvalidPlaceholder(at))?;
                let name = &braced[..end];
                if !is_identifier(name) {
                    return Err(TemplateError::InvalidPlaceholder(at));
                }
                (Some(name), end + 2)
            } else {
                let len = identifier_len(after);
                if len == 0 {
                    return Err(TemplateError::InvalidPlaceholder(at));
                }
                (Some(&after[..len]), len)
            };

            if let Some(name) = name {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Field(field(name)?));
            }

            let advance = pos + 1 + consumed;
            rest = &rest[advance..];
            offset += advance;
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Self { pieces })
    }

    /// Substitutes the three fields.
    pub fn render(&self, timestamp: &str, level: &str, message: &str) -> String {
        let mut out = String::with_capacity(timestamp.len() + level.len() + message.len() + 16);
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Field(Field::Timestamp) => out.push_str(timestamp),
                Piece::Field(Field::LogLevel) => out.push_str(level),
                Piece::Field(Field::Message) => out.push_str(message),
            }
        }
        out
    }
}

fn field(name: &str) -> Result<Field, TemplateError> {
    match name {
        "timestamp" => Ok(Field::Timestamp),
        "log_level" => Ok(Field::LogLevel),
        "message" => Ok(Field::Message),
        other => Err(TemplateError::UnknownField(other.to_string())),
    }
}

fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, ch) in s.char_indices() {
        let ok = if i == 0 {
            ch == '_' || ch.is_ascii_alphabetic()
        } else {
            ch == '_' || ch.is_ascii_alphanumeric()
        };
        if !ok {
            break;
        }
        len = i + ch.len_utf8();
    }
    len
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}

/// Formats lines through a user template, optionally prefixing an app name.
#[derive(Debug, Clone)]
pub struct CustomFormatter {
    template: Option<Template>,
    app_names: Vec<String>,
    rng: SmallRng,
}

impl CustomFormatter {
    /// Builds a formatter from `template`.
    ///
    /// An invalid template is logged once and replaced by the default layout.
    pub fn new(template: &str, app_names: Vec<String>, rng: SmallRng) -> Self {
        let template = match Template::parse(template) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("{}. Using default format.", e);
                None
            }
        };
        Self {
            template,
            app_names,
            rng,
        }
    }

    /// True when the configured template was rejected.
    pub fn is_fallback(&self) -> bool {
        self.template.is_none()
    }
}

impl LogFormatter for CustomFormatter {
    fn format_log(&mut self, timestamp: &str, level: &str, message: &str) -> String {
        let prefixed;
        let message = match self.app_names.choose(&mut self.rng) {
            Some(app) => {
                prefixed = format!("{}: {}", app, message);
                prefixed.as_str()
            }
            None => message,
        };

        match &self.template {
            Some(template) => template.render(timestamp, level, message),
            None => format!("{}, {}, {}", timestamp, level, message),
        }
    }
}
