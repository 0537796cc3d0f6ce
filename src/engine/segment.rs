//! Block segmentation.
//!
//! Finds block headers with the rule set's tag pattern and walks forward to
//! the *balanced* closing delimiter. Delimiters inside string literals, char
//! literals and comments do not count, and neither do header matches there.
//!
//! A block that is not closed before the next header (or before the end of
//! the text) is reported as a [`Issue::MalformedBlock`] and skipped. The next
//! header is the scan limit, so one unbalanced block never swallows the
//! blocks after it.
//!
//! Line-oriented sources ([`Delimiters::Lines`]) have no delimiters to
//! balance: a block is everything between its header and the next one.
//!
//! [`Delimiters::Lines`]: crate::engine::Delimiters::Lines

use super::compiled_rules::RuleSet;
use crate::error::Issue;
use crate::RawBlock;
use regex::{CaptureMatches, Captures};

/// Lazy iterator over the blocks of one source text, in source order.
pub(crate) struct Blocks<'t, 'r> {
    text: &'t str,
    rules: &'r RuleSet,
    headers: CaptureMatches<'r, 't>,
    lexer: Cursor,
    lookahead: Option<Captures<'t>>,
}

pub(crate) fn segment<'t, 'r>(text: &'t str, rules: &'r RuleSet) -> Blocks<'t, 'r> {
    Blocks { text, rules, headers: rules.tag.captures_iter(text), lexer: Cursor::default(), lookahead: None }
}

#[derive(Debug, PartialEq, Eq)]
enum Scan {
    /// Index of the closing delimiter.
    Closed(usize),
    Unterminated,
    RanIntoNextBlock,
}

impl<'t> Blocks<'t, '_> {
    /// Next header match that starts in code, not in a comment or literal.
    fn next_header(&mut self) -> Option<Captures<'t>> {
        for caps in self.headers.by_ref() {
            let start = caps.get(0).map_or(0, |m| m.start());
            if self.lexer.in_code_at(self.text.as_bytes(), start) {
                return Some(caps);
            }
            tracing::trace!(kind = %self.rules.kind, offset = start, "header inside a comment or literal ignored");
        }
        None
    }
}

impl<'t> Iterator for Blocks<'t, '_> {
    type Item = Result<RawBlock<'t>, Issue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let caps = match self.lookahead.take() {
                Some(caps) => caps,
                None => self.next_header()?,
            };
            let (Some(header), Some(tag)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let tag = tag.as_str();

            if self.rules.is_sentinel(tag) {
                tracing::trace!(kind = %self.rules.kind, tag, "sentinel block skipped");
                continue;
            }

            self.lookahead = self.next_header();
            let next_header = self.lookahead.as_ref().and_then(|c| c.get(0)).map(|m| m.start());
            let limit = next_header.unwrap_or(self.text.len());
            let malformed = |reason: &str| Issue::MalformedBlock {
                source_kind: self.rules.kind,
                tag: tag.to_string(),
                offset: header.start(),
                reason: reason.to_string(),
            };

            let Some((open, close)) = self.rules.delimiters.pair() else {
                let body = &self.text[header.end()..limit];
                return Some(Ok(RawBlock { kind: self.rules.kind, tag, body, start_offset: header.start() }));
            };

            // The header may already have consumed the opening delimiter.
            let mut depth = open_depth(header.as_str().as_bytes(), open, close);
            let mut body_start = header.end();
            if depth == 0 {
                let rest = &self.text.as_bytes()[header.end()..limit];
                match rest.iter().position(|b| !b.is_ascii_whitespace()) {
                    Some(i) if rest[i] == open => {
                        depth = 1;
                        body_start = header.end() + i + 1;
                    }
                    _ => {
                        let issue = malformed("header is not followed by an opening delimiter");
                        tracing::warn!(%issue, "block skipped");
                        return Some(Err(issue));
                    }
                }
            }

            let scan = scan_balanced(self.text.as_bytes(), body_start, limit, depth, open, close, next_header.is_some());
            return Some(match scan {
                Scan::Closed(end) => {
                    Ok(RawBlock { kind: self.rules.kind, tag, body: &self.text[body_start..end], start_offset: header.start() })
                }
                Scan::Unterminated => {
                    let issue = malformed("unterminated block");
                    tracing::warn!(%issue, "block skipped");
                    Err(issue)
                }
                Scan::RanIntoNextBlock => {
                    let issue = malformed("unbalanced block runs into the next header");
                    tracing::warn!(%issue, "block skipped");
                    Err(issue)
                }
            });
        }
    }
}

/// Net opening delimiters in a header match (string literals excluded).
fn open_depth(header: &[u8], open: u8, close: u8) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &b in header {
        if in_string {
            match (escaped, b) {
                (true, _) => escaped = false,
                (false, b'\\') => escaped = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.saturating_sub(1);
        }
    }
    depth
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Lexical {
    #[default]
    Code,
    Str,
    Char,
    LineComment,
    BlockComment,
}

/// Lexical state after byte `b`, and how many bytes it consumed.
fn step(state: Lexical, b: u8, next: Option<u8>) -> (Lexical, usize) {
    match state {
        Lexical::Code => match (b, next) {
            (b'"', _) => (Lexical::Str, 1),
            (b'\'', _) => (Lexical::Char, 1),
            (b'/', Some(b'/')) => (Lexical::LineComment, 2),
            (b'/', Some(b'*')) => (Lexical::BlockComment, 2),
            _ => (Lexical::Code, 1),
        },
        Lexical::Str | Lexical::Char => {
            let quote = if state == Lexical::Str { b'"' } else { b'\'' };
            match b {
                b'\\' => (state, 2),
                _ if b == quote || b == b'\n' => (Lexical::Code, 1),
                _ => (state, 1),
            }
        }
        Lexical::LineComment => (if b == b'\n' { Lexical::Code } else { state }, 1),
        Lexical::BlockComment => match (b, next) {
            (b'*', Some(b'/')) => (Lexical::Code, 2),
            _ => (state, 1),
        },
    }
}

/// Forward-only lexer over a whole text. Header matches arrive in order.
#[derive(Debug, Default)]
struct Cursor {
    pos: usize,
    state: Lexical,
}

impl Cursor {
    fn in_code_at(&mut self, text: &[u8], target: usize) -> bool {
        while self.pos < target {
            let (state, used) = step(self.state, text[self.pos], text.get(self.pos + 1).copied());
            self.state = state;
            self.pos += used;
        }
        self.pos == target && self.state == Lexical::Code
    }
}

fn scan_balanced(
    text: &[u8],
    from: usize,
    limit: usize,
    mut depth: usize,
    open: u8,
    close: u8,
    limited_by_header: bool,
) -> Scan {
    let mut state = Lexical::Code;
    let mut i = from;

    while i < limit {
        let b = text[i];
        if state == Lexical::Code && b == open {
            depth += 1;
        } else if state == Lexical::Code && b == close {
            depth -= 1;
            if depth == 0 {
                return Scan::Closed(i);
            }
        } else {
            let (next_state, used) = step(state, b, text.get(i + 1).copied());
            state = next_state;
            i += used;
            continue;
        }
        i += 1;
    }

    if limited_by_header { Scan::RanIntoNextBlock } else { Scan::Unterminated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compiled_rules::{Delimiters, RuleSetSpec};
    use crate::SourceKind;

    fn rules(delimiters: Delimiters, tag_pattern: &str) -> RuleSet {
        RuleSet::compile(&RuleSetSpec {
            kind: SourceKind::Creatures,
            tag_pattern: tag_pattern.to_string(),
            sentinels: vec!["NONE".to_string()],
            delimiters,
            fields: vec![],
            children: None,
        })
        .unwrap()
    }

    fn species() -> RuleSet {
        rules(Delimiters::Braces, r"\[SPECIES_(\w+)\]\s*=")
    }

    fn split(text: &str, rules: &RuleSet) -> (Vec<(String, String)>, Vec<Issue>) {
        let mut ok = Vec::new();
        let mut bad = Vec::new();
        for item in segment(text, rules) {
            match item {
                Ok(b) => ok.push((b.tag.to_string(), b.body.trim().to_string())),
                Err(issue) => bad.push(issue),
            }
        }
        (ok, bad)
    }

    #[test]
    fn nested_braces_stay_in_one_block() {
        let text = "[SPECIES_A] = { .x = 1, .sub = { .p = 1, .q = { 2 }, .r = 3 }, .y = 2 },\n[SPECIES_B] = { .x = 9 },";
        let (ok, bad) = split(text, &species());
        assert!(bad.is_empty());
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].1, ".x = 1, .sub = { .p = 1, .q = { 2 }, .r = 3 }, .y = 2");
        assert_eq!(ok[1], ("B".to_string(), ".x = 9".to_string()));
    }

    #[test]
    fn well_formed_and_malformed_mix() {
        let mut text = String::new();
        let mut expected = Vec::new();
        for i in 0..6 {
            if i % 3 == 1 {
                text.push_str(&format!("[SPECIES_BAD{i}] = {{ .x = {{ 1, \n"));
            } else {
                text.push_str(&format!("[SPECIES_OK{i}] = {{ .x = {{ {i} }} }},\n"));
                expected.push(format!("OK{i}"));
            }
        }
        let (ok, bad) = split(&text, &species());
        let tags: Vec<String> = ok.into_iter().map(|(t, _)| t).collect();
        assert_eq!(tags, expected);
        assert_eq!(bad.len(), 2);
        assert!(bad.iter().all(|i| matches!(i, Issue::MalformedBlock { .. })));
    }

    #[test]
    fn unterminated_last_block() {
        let (ok, bad) = split("[SPECIES_A] = { .x = 1 },\n[SPECIES_B] = { .x = 2", &species());
        assert_eq!(ok.len(), 1);
        assert!(matches!(&bad[0], Issue::MalformedBlock { tag, reason, .. } if tag == "B" && reason.contains("unterminated")));
    }

    #[test]
    fn sentinel_excluded() {
        let (ok, bad) = split("[SPECIES_NONE] = {0},\n[SPECIES_A] = { .x = 1 },", &species());
        assert!(bad.is_empty());
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].0, "A");
    }

    #[test]
    fn delimiters_in_strings_and_comments_are_ignored() {
        let text = r#"[SPECIES_A] = {
            .name = _("Brace } here"),
            .c = '}',
            // a stray } in a comment
            /* and { another */
            .x = 1,
        },
        [SPECIES_B] = { .x = 2 },"#;
        let (ok, bad) = split(text, &species());
        assert!(bad.is_empty(), "{bad:?}");
        assert_eq!(ok.len(), 2);
        assert!(ok[0].1.ends_with(".x = 1,"));
    }

    #[test]
    fn headers_in_comments_are_not_headers() {
        let text = r#"[SPECIES_A] = {
            .x = 1,
            // was [SPECIES_OLD] = { .x = 0 },
            /* see [SPECIES_B] = { below */
            .y = 2,
        },
        [SPECIES_B] = { .x = 2 },"#;
        let (ok, bad) = split(text, &species());
        assert!(bad.is_empty(), "{bad:?}");
        let tags: Vec<&str> = ok.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tags, ["A", "B"]);
        assert!(ok[0].1.ends_with(".y = 2,"));
    }

    #[test]
    fn header_may_consume_the_opening_delimiter() {
        let rules = rules(Delimiters::Parens, r"egg_moves\s*\(\s*(\w+)\s*,");
        let text = "egg_moves(BULBASAUR,\n MOVE_A,\n MOVE_B),\negg_moves(NONE, MOVE_C),\negg_moves(ODDISH, MOVE_D)";
        let (ok, bad) = split(text, &rules);
        assert!(bad.is_empty());
        assert_eq!(ok, [("BULBASAUR".to_string(), "MOVE_A,\n MOVE_B".to_string()), ("ODDISH".to_string(), "MOVE_D".to_string())]);
    }

    #[test]
    fn line_blocks_run_to_the_next_header() {
        let rules = rules(Delimiters::Lines, r"(?m)^[^\n:]*:[ \t]*([^\r\n]*?)[ \t]*\r?$");
        let (ok, bad) = split("TM01: Focus Punch\nBULBASAUR\nIVYSAUR\n\nTM02: Dragon Claw\nCHARIZARD\n", &rules);
        assert!(bad.is_empty());
        assert_eq!(
            ok,
            [
                ("Focus Punch".to_string(), "BULBASAUR\nIVYSAUR".to_string()),
                ("Dragon Claw".to_string(), "CHARIZARD".to_string())
            ]
        );
    }

    #[test]
    fn missing_opening_delimiter() {
        let (ok, bad) = split("[SPECIES_A] = 5,\n[SPECIES_B] = { .x = 1 },", &species());
        assert_eq!(ok.len(), 1);
        assert_eq!(bad.len(), 1);
    }

    #[test]
    fn offsets_point_at_headers() {
        let text = "  [SPECIES_A] = { },\n[SPECIES_B] = { },";
        let offsets: Vec<usize> = segment(text, &species()).filter_map(Result::ok).map(|b| b.start_offset).collect();
        assert_eq!(offsets, [2, text.find("[SPECIES_B]").unwrap()]);
    }
}
