//! `tm_compatibility/` and `tutor_compatibility/`: one text file per move,
//! listing the species that can learn it.
//!
//! ```text
//! TM01: Focus Punch
//! BULBASAUR
//! CHARMANDER
//! ```
//!
//! The header names the move. Each later non-blank line is a species
//! constant, with or without the `SPECIES_` prefix. Rows get learn method
//! `tm` or `tutor` and no level.

use super::{SourceRecord, join_key, row};
use crate::engine::{Delimiters, RuleSetSpec};
use crate::error::RecordError;
use crate::normalize::{Symbols, humanize_constant};
use crate::schema::Row;
use crate::{EntityRecord, SourceKind, Value, field_opt_str};

pub(crate) fn rule_set(kind: SourceKind) -> RuleSetSpec {
    RuleSetSpec {
        kind,
        tag_pattern: r"(?m)^[^\n:]*:[ \t]*([^\r\n]*?)[ \t]*\r?$".to_string(),
        sentinels: vec![],
        delimiters: Delimiters::Lines,
        fields: vec![],
        children: Some(child!(r"(?m)^[ \t]*([^\s:][^\r\n:]*?)[ \t]*\r?$", [("species", 1, "raw")])),
    }
}

/// Species that can learn one move by one method.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MoveCompatibility {
    pub move_key: String,
    pub learn_method: &'static str,
    pub creature_keys: Vec<String>,
}

impl MoveCompatibility {
    fn from_record(record: EntityRecord, learn_method: &'static str) -> Result<Self, RecordError> {
        let move_key = join_key(&record.tag)?;
        let mut creature_keys = Vec::with_capacity(record.children.len());
        for child in &record.children {
            if let Some(species) = field_opt_str(child, "species")? {
                let constant = species.strip_prefix("SPECIES_").unwrap_or(&species);
                creature_keys.push(join_key(&humanize_constant(constant))?);
            }
        }
        Ok(MoveCompatibility { move_key, learn_method, creature_keys })
    }

    fn rows(&self) -> Vec<Row> {
        self.creature_keys
            .iter()
            .map(|creature_key| {
                row([
                    ("creature_key", Value::from(creature_key.as_str())),
                    ("move_key", Value::from(self.move_key.as_str())),
                    ("learn_method", Value::from(self.learn_method)),
                    ("level", Value::Null),
                ])
            })
            .collect()
    }
}

macro_rules! compatibility_record {
    ($name:ident, $kind:expr, $method:literal) => {
        #[derive(Debug, Clone, PartialEq)]
        pub(crate) struct $name(pub MoveCompatibility);

        impl SourceRecord for $name {
            const KIND: SourceKind = $kind;

            fn from_record(record: EntityRecord, _symbols: &Symbols) -> Result<Self, RecordError> {
                MoveCompatibility::from_record(record, $method).map($name)
            }

            fn rows(&self) -> Vec<Row> {
                self.0.rows()
            }
        }
    };
}

compatibility_record!(TmCompatibility, SourceKind::TmCompatibility, "tm");
compatibility_record!(TutorCompatibility, SourceKind::TutorCompatibility, "tutor");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RecordAssembler, RuleSet};

    #[test]
    fn species_lines_become_rows() {
        let rules = RuleSet::compile(&rule_set(SourceKind::TmCompatibility)).unwrap();
        let symbols = Symbols::standard();
        let text = "TM24: Thunderbolt\r\nPIKACHU\r\n  SPECIES_RAICHU  \r\n\r\nNIDORAN_F\r\nPORYGON2\r\n";

        let records: Vec<_> = RecordAssembler::new(&rules, &symbols).records::<TmCompatibility>(text).collect();
        assert_eq!(records.len(), 1);
        let tm = &records[0].as_ref().unwrap().value.0;
        assert_eq!(tm.move_key, "thunderbolt");
        assert_eq!(tm.creature_keys, ["pikachu", "raichu", "nidoran_f", "porygon_2"]);

        let rows = TmCompatibility(tm.clone()).rows();
        assert!(rows.iter().all(|r| r["learn_method"] == Value::from("tm") && r["level"] == Value::Null));
    }

    #[test]
    fn file_without_header_has_no_records() {
        let rules = RuleSet::compile(&rule_set(SourceKind::TutorCompatibility)).unwrap();
        let symbols = Symbols::standard();
        let records: Vec<_> =
            RecordAssembler::new(&rules, &symbols).records::<TutorCompatibility>("BULBASAUR\nIVYSAUR\n").collect();
        assert!(records.is_empty());
    }
}
