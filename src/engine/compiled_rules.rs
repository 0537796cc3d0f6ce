//! Rule sets: declaration and compilation.
//!
//! This module holds the *static* side of the engine. A rule set is declared as
//! plain data ([`RuleSetSpec`], usually through the `field!`/`child!` macros in
//! `src/rules/*`), patched by configuration overrides, and compiled once per
//! run into a [`RuleSet`] that the segmenter and extractor use.
//!
//! Splitting declaration from compilation keeps bad entries out of the hot
//! path: every regex is compiled and every transform name resolved up front,
//! and a failure there is a [`ConfigError`] for that source kind only.
//!
//! ## Shape of a rule set
//!
//! - a **tag pattern** that finds block headers; capture group 1 is the tag
//! - **sentinels**: tags that are never returned (`NONE`, `EGG`, `Empty`)
//! - **delimiters** of the block body (braces or parentheses)
//! - **field rules**: one pattern per scalar field, tried independently
//!   against the whole body
//! - an optional **child rule**: a pattern applied repeatedly to the body,
//!   each match producing one child entry (learnset lines, evolution tuples)
//!
//! ## Invariants
//!
//! - field patterns read the first capture group that participated in the
//!   match, or the whole match when the pattern has no groups
//! - child field groups are checked against the pattern's group count when
//!   compiling, so extraction never indexes a group that cannot exist

use crate::config::RuleOverride;
use crate::error::ConfigError;
use crate::normalize::Normalizer;
use crate::{SourceKind, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};

// --- Declarations -------------------------------------------------------------

/// One scalar field rule: pattern, transform name, default, required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: String,
    pub pattern: String,
    pub transform: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildFieldSpec {
    pub field: String,
    pub group: usize,
    pub transform: String,
}

/// A repeated entry inside one block body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSpec {
    pub pattern: String,
    pub fields: Vec<ChildFieldSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiters {
    Braces,
    Parens,
    /// No delimiters: the body runs from the end of the header to the next
    /// header or the end of the text.
    Lines,
}

impl Delimiters {
    /// Opening and closing byte, if the block has any.
    pub fn pair(self) -> Option<(u8, u8)> {
        match self {
            Delimiters::Braces => Some((b'{', b'}')),
            Delimiters::Parens => Some((b'(', b')')),
            Delimiters::Lines => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSpec {
    pub kind: SourceKind,
    pub tag_pattern: String,
    pub sentinels: Vec<String>,
    pub delimiters: Delimiters,
    pub fields: Vec<FieldSpec>,
    pub children: Option<ChildSpec>,
}

impl RuleSetSpec {
    /// Patch one field rule in place.
    pub fn apply_override(&mut self, o: &RuleOverride) -> Result<(), ConfigError> {
        let Some(field) = self.fields.iter_mut().find(|f| f.field == o.field) else {
            return Err(ConfigError::UnknownField { kind: self.kind, field: o.field.clone() });
        };

        if let Some(pattern) = &o.pattern {
            field.pattern = pattern.clone();
        }
        if let Some(transform) = &o.transform {
            field.transform = transform.clone();
        }
        if let Some(default) = &o.default {
            field.default = Some(default.clone());
        }
        if let Some(required) = o.required {
            field.required = required;
        }
        tracing::debug!(kind = %self.kind, field = %o.field, "rule override applied");
        Ok(())
    }
}

/// The built-in rule set of every source kind, in scheduling order.
pub fn builtin_rule_sets() -> Vec<RuleSetSpec> {
    SourceKind::ALL.into_iter().map(crate::rules::rule_set).collect()
}

// --- Compiled form -------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct CompiledField {
    pub name: String,
    pub regex: Regex,
    pub normalizer: Normalizer,
    pub default: Option<Value>,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledChildField {
    pub name: String,
    pub group: usize,
    pub normalizer: Normalizer,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledChild {
    pub regex: Regex,
    pub fields: Vec<CompiledChildField>,
}

/// A rule set ready to run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub(crate) kind: SourceKind,
    pub(crate) tag: Regex,
    pub(crate) sentinels: Vec<String>,
    pub(crate) delimiters: Delimiters,
    pub(crate) fields: Vec<CompiledField>,
    pub(crate) children: Option<CompiledChild>,
}

impl RuleSet {
    pub fn compile(spec: &RuleSetSpec) -> Result<Self, ConfigError> {
        let kind = spec.kind;

        let tag = compile_pattern(kind, "<tag>", &spec.tag_pattern)?;
        if tag.captures_len() < 2 {
            return Err(ConfigError::MissingTagGroup { kind });
        }

        let fields = spec
            .fields
            .iter()
            .map(|f| {
                Ok(CompiledField {
                    name: f.field.clone(),
                    regex: compile_pattern(kind, &f.field, &f.pattern)?,
                    normalizer: resolve_normalizer(kind, &f.field, &f.transform)?,
                    default: f.default.clone(),
                    required: f.required,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let children = match &spec.children {
            None => None,
            Some(child) => {
                let regex = compile_pattern(kind, "<child>", &child.pattern)?;
                let available = regex.captures_len() - 1;
                let fields = child
                    .fields
                    .iter()
                    .map(|f| {
                        if f.group > available {
                            return Err(ConfigError::InvalidGroup { kind, field: f.field.clone(), group: f.group, available });
                        }
                        Ok(CompiledChildField {
                            name: f.field.clone(),
                            group: f.group,
                            normalizer: resolve_normalizer(kind, &f.field, &f.transform)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                Some(CompiledChild { regex, fields })
            }
        };

        tracing::debug!(%kind, fields = fields.len(), children = children.is_some(), "rule set compiled");

        Ok(RuleSet { kind, tag, sentinels: spec.sentinels.clone(), delimiters: spec.delimiters, fields, children })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub(crate) fn is_sentinel(&self, tag: &str) -> bool {
        self.sentinels.iter().any(|s| s == tag)
    }
}

fn compile_pattern(kind: SourceKind, field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern { kind, field: field.to_string(), source })
}

fn resolve_normalizer(kind: SourceKind, field: &str, name: &str) -> Result<Normalizer, ConfigError> {
    Normalizer::from_name(name).ok_or_else(|| ConfigError::UnknownNormalizer {
        kind,
        field: field.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RuleSetSpec {
        RuleSetSpec {
            kind: SourceKind::Moves,
            tag_pattern: r"\[MOVE_(\w+)\]\s*=\s*\{".to_string(),
            sentinels: vec!["NONE".to_string()],
            delimiters: Delimiters::Braces,
            fields: vec![field!("power", r"\.power\s*=\s*([^,\n}]+)", "int", default: Value::Int(0))],
            children: None,
        }
    }

    #[test]
    fn builtin_rule_sets_compile() {
        let specs = builtin_rule_sets();
        assert_eq!(specs.len(), SourceKind::ALL.len());
        for spec in &specs {
            let compiled = RuleSet::compile(spec);
            assert!(compiled.is_ok(), "{}: {:?}", spec.kind, compiled.err());
        }
    }

    #[test]
    fn unknown_normalizer_is_a_config_error() {
        let mut s = spec();
        s.fields[0].transform = "roman_numeral".to_string();
        let err = RuleSet::compile(&s).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownNormalizer { name, .. } if name == "roman_numeral"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let mut s = spec();
        s.fields[0].pattern = r"\.power\s*=\s*([".to_string();
        assert!(matches!(RuleSet::compile(&s), Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn tag_pattern_needs_a_group() {
        let mut s = spec();
        s.tag_pattern = r"\[MOVE_\w+\]\s*=\s*\{".to_string();
        assert!(matches!(RuleSet::compile(&s), Err(ConfigError::MissingTagGroup { .. })));
    }

    #[test]
    fn child_group_out_of_range() {
        let mut s = spec();
        s.children = Some(child!(r"LEVEL_UP_MOVE\((\d+), (\w+)\)", [("level", 1, "int"), ("move", 3, "move")]));
        assert!(matches!(RuleSet::compile(&s), Err(ConfigError::InvalidGroup { group: 3, available: 2, .. })));
    }

    #[test]
    fn overrides_patch_fields() {
        let mut s = spec();
        let o = RuleOverride {
            kind: SourceKind::Moves,
            field: "power".into(),
            pattern: Some(r"\.basePower\s*=\s*(\d+)".into()),
            transform: None,
            default: None,
            required: Some(true),
        };
        s.apply_override(&o).unwrap();
        assert_eq!(s.fields[0].pattern, r"\.basePower\s*=\s*(\d+)");
        assert!(s.fields[0].required);
        assert_eq!(s.fields[0].default, Some(Value::Int(0)));

        let unknown = RuleOverride { field: "speed".into(), ..o };
        assert!(matches!(s.apply_override(&unknown), Err(ConfigError::UnknownField { .. })));
    }

    #[test]
    fn sentinels() {
        let rules = RuleSet::compile(&spec()).unwrap();
        assert!(rules.is_sentinel("NONE"));
        assert!(!rules.is_sentinel("POUND"));
    }
}
