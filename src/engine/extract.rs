//! Field extraction.
//!
//! Applies a compiled rule set to one block body. Every field rule runs
//! independently against the whole body; there is no sequential parse, so the
//! order of fields in the source does not matter and an unknown field in the
//! source never derails the ones after it.

use super::compiled_rules::{CompiledField, RuleSet};
use crate::error::RecordError;
use crate::normalize::Symbols;
use crate::{EntityRecord, Fields, RawBlock, Value};
use regex::Captures;

/// A record plus the child entries that had to be rejected.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Extracted {
    pub record: EntityRecord,
    pub rejected_children: Vec<RecordError>,
}

impl RuleSet {
    /// Extract one record from `block`.
    ///
    /// Missing fields take their default; without a default a required field
    /// fails the record and an optional one becomes null (or `false` for
    /// flags). An unparseable optional field is treated as missing.
    pub(crate) fn extract(&self, block: &RawBlock<'_>, symbols: &Symbols) -> Result<Extracted, RecordError> {
        let mut fields = Fields::with_capacity(self.fields.len());
        for rule in &self.fields {
            let value = extract_field(rule, block, symbols)?;
            fields.insert(rule.name.clone(), value);
        }

        let mut children = Vec::new();
        let mut rejected_children = Vec::new();
        if let Some(child) = &self.children {
            for caps in child.regex.captures_iter(block.body) {
                let mut entry = Fields::with_capacity(child.fields.len());
                let mut failed = None;
                for f in &child.fields {
                    let value = match caps.get(f.group) {
                        None => Value::Null,
                        Some(m) => match f.normalizer.apply(m.as_str(), symbols) {
                            Ok(v) => v,
                            Err(reason) => {
                                failed = Some(RecordError::Unparseable {
                                    field: f.name.clone(),
                                    raw: m.as_str().trim().to_string(),
                                    reason,
                                });
                                break;
                            }
                        },
                    };
                    entry.insert(f.name.clone(), value);
                }
                match failed {
                    Some(err) => rejected_children.push(err),
                    None => children.push(entry),
                }
            }
        }

        Ok(Extracted {
            record: EntityRecord {
                kind: self.kind,
                tag: block.tag.to_string(),
                offset: block.start_offset,
                fields,
                children,
            },
            rejected_children,
        })
    }
}

fn extract_field(rule: &CompiledField, block: &RawBlock<'_>, symbols: &Symbols) -> Result<Value, RecordError> {
    let token = rule.regex.captures(block.body).map(|caps| first_group(&caps));

    let parse_error = match token {
        Some(token) => match rule.normalizer.apply(token, symbols) {
            Ok(value) => return Ok(value),
            Err(reason) => Some(RecordError::Unparseable {
                field: rule.name.clone(),
                raw: token.trim().to_string(),
                reason,
            }),
        },
        None => None,
    };

    // Defaults stand in for absent fields, never for unparseable required ones.
    match parse_error {
        Some(err) if rule.required => return Err(err),
        Some(err) => tracing::debug!(kind = %block.kind, tag = block.tag, %err, "optional field ignored"),
        None => {}
    }
    if let Some(default) = &rule.default {
        return Ok(default.clone());
    }
    if rule.required {
        return Err(RecordError::MissingField(rule.name.clone()));
    }
    Ok(rule.normalizer.absent_value())
}

/// First participating capture group, or the whole match.
fn first_group<'t>(caps: &Captures<'t>) -> &'t str {
    caps.iter().skip(1).flatten().next().or_else(|| caps.get(0)).map_or("", |m| m.as_str())
}
