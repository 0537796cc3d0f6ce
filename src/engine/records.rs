//! Record assembly: segmenter + extractor + typed conversion, as one stream.
//!
//! The stream is lazy. Each block is segmented, extracted and converted into
//! the kind's typed record before the next one is looked at, and nothing is
//! retained once the caller has consumed an item.

use super::compiled_rules::RuleSet;
use super::segment::{Blocks, segment};
use crate::SourceKind;
use crate::error::{Issue, RecordError};
use crate::normalize::Symbols;
use crate::rules::SourceRecord;
use std::collections::VecDeque;

/// A typed record together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Located<T> {
    pub tag: String,
    pub offset: usize,
    pub value: T,
}

pub(crate) type RecordItem<T> = Result<Located<T>, Issue>;

pub(crate) struct RecordAssembler<'r> {
    rules: &'r RuleSet,
    symbols: &'r Symbols,
}

impl<'r> RecordAssembler<'r> {
    pub fn new(rules: &'r RuleSet, symbols: &'r Symbols) -> Self {
        Self { rules, symbols }
    }

    /// Stream typed records from `text`. Recoverable problems come through
    /// as `Err(Issue)` items in source order, never as a stopped stream.
    pub fn records<'t, T: SourceRecord>(&self, text: &'t str) -> Records<'t, 'r, T> {
        debug_assert_eq!(self.rules.kind, T::KIND);
        Records { rules: self.rules, blocks: segment(text, self.rules), symbols: self.symbols, queue: VecDeque::new() }
    }
}

pub(crate) struct Records<'t, 'r, T> {
    rules: &'r RuleSet,
    blocks: Blocks<'t, 'r>,
    symbols: &'r Symbols,
    /// Items produced by the current block but not yet handed out.
    queue: VecDeque<RecordItem<T>>,
}

impl<T: SourceRecord> Iterator for Records<'_, '_, T> {
    type Item = RecordItem<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.queue.pop_front() {
            return Some(item);
        }

        let block = match self.blocks.next()? {
            Ok(block) => block,
            Err(issue) => return Some(Err(issue)),
        };

        let extracted = match self.rules.extract(&block, self.symbols) {
            Ok(extracted) => extracted,
            Err(err) => return Some(Err(reject(T::KIND, block.tag, &err))),
        };

        // Child rejections come out ahead of the record that survived them.
        for err in &extracted.rejected_children {
            self.queue.push_back(Err(reject(T::KIND, block.tag, err)));
        }

        let (tag, offset) = (extracted.record.tag.clone(), extracted.record.offset);
        let item = match T::from_record(extracted.record, self.symbols) {
            Ok(value) => Ok(Located { tag, offset, value }),
            Err(err) => Err(reject(T::KIND, &tag, &err)),
        };
        self.queue.push_back(item);
        self.queue.pop_front()
    }
}

fn reject(kind: SourceKind, tag: &str, err: &RecordError) -> Issue {
    let issue = Issue::invalid(kind, tag, err);
    tracing::warn!(%issue, "record rejected");
    issue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Creature, LevelUpLearnset};

    #[test]
    fn stream_keeps_source_order_and_reports_problems() {
        let spec = crate::rules::rule_set(SourceKind::Creatures);
        let rules = RuleSet::compile(&spec).unwrap();
        let symbols = Symbols::standard();
        let text = "\
            [SPECIES_NONE] = {0},
            [SPECIES_ALPHA] = { .baseHP = 1, .baseAttack = 1, .baseDefense = 1, .baseSpAttack = 1, .baseSpDefense = 1, .baseSpeed = 1 },
            [SPECIES_BROKEN] = { .baseAttack = 1, .baseDefense = 1 },
            [SPECIES_OPEN] = { .baseHP = 1,
            [SPECIES_OMEGA] = { .baseHP = 2, .baseAttack = 2, .baseDefense = 2, .baseSpAttack = 2, .baseSpDefense = 2, .baseSpeed = 2 },";

        let items: Vec<RecordItem<Creature>> = RecordAssembler::new(&rules, &symbols).records(text).collect();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_ref().unwrap().value.key, "alpha");
        assert!(matches!(&items[1], Err(Issue::InvalidRecord { tag, .. }) if tag == "BROKEN"));
        assert!(matches!(&items[2], Err(Issue::MalformedBlock { tag, .. }) if tag == "OPEN"));
        assert_eq!(items[3].as_ref().unwrap().value.key, "omega");
    }

    #[test]
    fn child_rejections_precede_their_record() {
        let rules = RuleSet::compile(&crate::rules::rule_set(SourceKind::Learnsets)).unwrap();
        let symbols = Symbols::standard();
        let text = "static const struct LevelUpMove sOddishLevelUpLearnset[] = {
            LEVEL_UP_MOVE(1, MOVE_ABSORB),
            LEVEL_UP_MOVE(LVL, MOVE_GROWTH),
            LEVEL_UP_END
        };";

        let items: Vec<RecordItem<LevelUpLearnset>> = RecordAssembler::new(&rules, &symbols).records(text).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().value.entries, [(1, "absorb".to_string())]);
    }
}
