// src/spec.rs

//! Package spec files
//!
//! A spec is a short line-oriented file at the root of a package source tree:
//!
//! ```text
//! # comment
//! Description: Example tools
//! Destination: dist
//! +src
//! +README
//! -src/generated
//! ~\.log$
//! ```
//!
//! `Key: value` lines set whitelisted fields, `+` adds a walk root, `-`
//! prunes an exact path, and `~` skips every path matching a regular
//! expression.

use crate::error::{Error, ParseError, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Name of the spec file expected at the root of a package source tree
pub const SPEC_FILE_NAME: &str = "driftpack.spec";

/// Recognized `Key: value` fields
///
/// Directive fields steer packaging. Metadata fields are recorded in the
/// package. Read-only fields are recorded too but only packaging sets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Destination,
    NameFormat,
    Prune,
    Author,
    Packager,
    Description,
    Homepage,
    License,
    Built,
    Vcs,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Destination,
        Field::NameFormat,
        Field::Prune,
        Field::Author,
        Field::Packager,
        Field::Description,
        Field::Homepage,
        Field::License,
        Field::Built,
        Field::Vcs,
    ];

    /// Canonical spelling, as written to metadata records
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Destination => "Destination",
            Self::NameFormat => "NameFormat",
            Self::Prune => "Prune",
            Self::Author => "Author",
            Self::Packager => "Packager",
            Self::Description => "Description",
            Self::Homepage => "Homepage",
            Self::License => "License",
            Self::Built => "Built",
            Self::Vcs => "VCS",
        }
    }

    /// Case-insensitive lookup
    pub fn lookup(key: &str) -> Option<Field> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(key))
    }

    pub const fn is_directive(&self) -> bool {
        matches!(self, Self::Destination | Self::NameFormat | Self::Prune)
    }

    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::Built | Self::Vcs)
    }

    /// Fields that end up in a package's metadata record
    pub const fn is_recorded(&self) -> bool {
        !self.is_directive()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field values keyed by field
pub type ConfigFields = BTreeMap<Field, String>;

/// What a selection rule does to the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    Add,
    Exclude,
    MatchExclude,
}

impl RuleKind {
    fn from_operator(op: char) -> Option<Self> {
        match op {
            '+' => Some(Self::Add),
            '-' => Some(Self::Exclude),
            '~' => Some(Self::MatchExclude),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionRule {
    pub kind: RuleKind,
    pub pattern: String,
}

/// The rule set of a spec; duplicates collapse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules(BTreeSet<SelectionRule>);

impl Rules {
    pub fn insert(&mut self, kind: RuleKind, pattern: impl Into<String>) -> bool {
        self.0.insert(SelectionRule {
            kind,
            pattern: pattern.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionRule> {
        self.0.iter()
    }

    /// Patterns of one kind, in sorted order
    pub fn patterns(&self, kind: RuleKind) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| r.pattern.as_str())
    }
}

/// A parsed spec file
#[derive(Debug, Clone, Default)]
pub struct PackageSpec {
    pub rules: Rules,
    pub fields: ConfigFields,
}

impl PackageSpec {
    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Whether VCS metadata directories are pruned during collection
    pub fn prune_vcs_dirs(&self) -> bool {
        match self.field(Field::Prune) {
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "no" | "false" | "off" | "0"
            ),
            None => true,
        }
    }
}

impl FromStr for PackageSpec {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        parse(text)
    }
}

/// Parse spec text into rules and fields
pub fn parse(text: &str) -> Result<PackageSpec> {
    let mut spec = PackageSpec::default();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = split_field(line) {
            match Field::lookup(key) {
                Some(field) if !field.is_read_only() => {
                    spec.fields.insert(field, value.to_string());
                }
                _ => {
                    tracing::debug!("Ignoring unrecognized spec field '{}' on line {}", key, line_no);
                }
            }
            continue;
        }

        let mut chars = line.chars();
        let kind = chars
            .next()
            .and_then(RuleKind::from_operator)
            .ok_or_else(|| ParseError::UnknownOperation {
                line: line_no,
                text: line.to_string(),
            })?;

        let pattern = normalize_pattern(chars.as_str());
        if pattern.is_empty() {
            return Err(ParseError::EmptyPattern {
                line: line_no,
                text: line.to_string(),
            }
            .into());
        }

        if kind == RuleKind::MatchExclude
            && let Err(source) = Regex::new(&pattern)
        {
            return Err(ParseError::InvalidPattern {
                line: line_no,
                pattern,
                source,
            }
            .into());
        }

        spec.rules.insert(kind, pattern);
    }

    Ok(spec)
}

/// Read and parse a spec file
pub fn parse_file(path: &Path) -> Result<PackageSpec> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse(&text)
}

/// Split `Key: value` where the key is a plain identifier
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let mut key_chars = key.chars();
    let starts_alpha = key_chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = key_chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    (starts_alpha && rest_ok).then(|| (key, value.trim()))
}

/// Trim whitespace and trailing slashes, then drop a leading `./`; applies
/// to every rule kind, regexes included
fn normalize_pattern(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
}
