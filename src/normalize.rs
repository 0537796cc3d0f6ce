//! Value normalizers.
//!
//! Pure functions that turn source tokens into canonical scalars:
//!
//! - conditional-compilation ternaries (`B_UPDATED_MOVE_DATA >= GEN_6 ? 90 : 95`)
//!   collapse to one branch, see [`resolve_conditional`]
//! - symbolic constants (`TYPE_FIRE`) go through the [`Symbols`] tables
//! - string macros (`COMPOUND_STRING("a" "b")`) are recombined into one string
//!
//! Rule tables refer to normalizers by name (`"int"`, `"type"`, ...). The name
//! is resolved once when a rule set is compiled, see [`Normalizer::from_name`].

use crate::error::NormalizeError;
use crate::Value;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Token that marks a boolean flag as set.
pub const TRUTHY_TOKENS: &[&str] = &["TRUE", "true"];

/// Which symbol table (or humanizer) a symbolic constant goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    Category,
    EvolutionMethod,
    Ability,
    EggGroup,
    Species,
    Move,
    Item,
}

impl SymbolKind {
    fn prefix(self) -> &'static str {
        match self {
            SymbolKind::Type => "TYPE_",
            SymbolKind::Category => "DAMAGE_CATEGORY_",
            SymbolKind::EvolutionMethod => "",
            SymbolKind::Ability => "ABILITY_",
            SymbolKind::EggGroup => "EGG_GROUP_",
            SymbolKind::Species => "SPECIES_",
            SymbolKind::Move => "MOVE_",
            SymbolKind::Item => "ITEM_",
        }
    }
}

/// A value transform referenced from a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Integer, after conditional resolution.
    Int,
    /// Floating point, after conditional resolution.
    Float,
    /// `true` only for a literal truthy token; never null.
    Flag,
    /// `true` whenever the pattern matched at all.
    Present,
    /// Quoted or compound string literal, recombined.
    Text,
    /// Trimmed token as-is.
    Raw,
    /// Symbolic constant through a lookup table.
    Symbol(SymbolKind),
}

impl Normalizer {
    pub fn from_name(name: &str) -> Option<Normalizer> {
        let n = match name {
            "int" => Normalizer::Int,
            "float" => Normalizer::Float,
            "flag" => Normalizer::Flag,
            "present" => Normalizer::Present,
            "text" => Normalizer::Text,
            "raw" => Normalizer::Raw,
            "type" => Normalizer::Symbol(SymbolKind::Type),
            "category" => Normalizer::Symbol(SymbolKind::Category),
            "evo_method" => Normalizer::Symbol(SymbolKind::EvolutionMethod),
            "ability" => Normalizer::Symbol(SymbolKind::Ability),
            "egg_group" => Normalizer::Symbol(SymbolKind::EggGroup),
            "species" => Normalizer::Symbol(SymbolKind::Species),
            "move" => Normalizer::Symbol(SymbolKind::Move),
            "item" => Normalizer::Symbol(SymbolKind::Item),
            _ => return None,
        };
        Some(n)
    }

    /// Value used when a non-required field has no match and no default.
    pub fn absent_value(self) -> Value {
        match self {
            Normalizer::Flag | Normalizer::Present => Value::Bool(false),
            _ => Value::Null,
        }
    }

    pub fn apply(self, token: &str, symbols: &Symbols) -> Result<Value, NormalizeError> {
        match self {
            Normalizer::Int => parse_int(resolve_conditional(token)).map(Value::Int),
            Normalizer::Float => parse_float(resolve_conditional(token)).map(Value::Float),
            Normalizer::Flag => {
                let word = resolve_conditional(token).split_whitespace().next().unwrap_or("");
                Ok(Value::Bool(TRUTHY_TOKENS.contains(&word)))
            }
            Normalizer::Present => Ok(Value::Bool(true)),
            Normalizer::Text => Ok(recombine_literals(token).map_or(Value::Null, Value::Str)),
            Normalizer::Raw => {
                let t = resolve_conditional(token);
                if t.is_empty() { Err(NormalizeError::Empty) } else { Ok(Value::Str(t.to_string())) }
            }
            Normalizer::Symbol(kind) => Ok(symbols.lookup(kind, resolve_conditional(token))),
        }
    }
}

// --- Conditional compilation ------------------------------------------------

/// Collapse a conditional-compilation ternary to a single branch.
///
/// Policy (fixed, not configurable): the *first* branch is taken, which in
/// these sources is always the value for the newer generation
/// (`B_UPDATED_MOVE_DATA >= GEN_6 ? 90 : 95` → `90`). Nested ternaries in that
/// branch are resolved the same way. Expressions without a top-level `?` are
/// returned trimmed, with balanced outer parentheses removed.
pub fn resolve_conditional(expr: &str) -> &str {
    let expr = strip_outer_parens(expr.trim());

    let Some(q) = top_level_find(expr, b'?') else {
        return expr;
    };

    let rest = &expr[q + 1..];
    let mut depth = 0i32;
    let mut nested = 0usize;
    for (i, b) in rest.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'?' if depth == 0 => nested += 1,
            b':' if depth == 0 => {
                if nested == 0 {
                    return resolve_conditional(&rest[..i]);
                }
                nested -= 1;
            }
            _ => {}
        }
    }

    // `?` without a matching `:` is not a ternary we understand.
    expr
}

fn top_level_find(s: &str, needle: u8) -> Option<usize> {
    let mut depth = 0i32;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if b == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn strip_outer_parens(mut s: &str) -> &str {
    while s.starts_with('(') && s.ends_with(')') && encloses(s) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

/// Does the opening paren at 0 close at the very last byte?
fn encloses(s: &str) -> bool {
    let mut depth = 0i32;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i == s.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn parse_int(token: &str) -> Result<i64, NormalizeError> {
    let t = token.trim();
    if t.is_empty() {
        return Err(NormalizeError::Empty);
    }
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    // One sign only; `str::parse` would accept a second one.
    if digits.starts_with(['-', '+']) {
        return Err(NormalizeError::NotAnInteger);
    }
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| NormalizeError::NotAnInteger)?
    } else {
        digits.parse::<i64>().map_err(|_| NormalizeError::NotAnInteger)?
    };
    Ok(if negative { -value } else { value })
}

fn parse_float(token: &str) -> Result<f64, NormalizeError> {
    let t = token.trim().trim_end_matches(['f', 'F']);
    if t.is_empty() {
        return Err(NormalizeError::Empty);
    }
    t.parse::<f64>().map_err(|_| NormalizeError::NotANumber)
}

// --- String literals --------------------------------------------------------

/// Join every `"..."` literal in `raw` into one logical string.
///
/// Handles `COMPOUND_STRING("a" "b")`, `_("...")` and literals split across
/// lines. `\n` escapes become spaces and whitespace runs collapse, so the
/// result is a single line. Returns `None` when `raw` holds no literal.
pub fn recombine_literals(raw: &str) -> Option<String> {
    let literal = regex!(r#""((?:[^"\\]|\\.)*)""#);

    let mut joined = String::new();
    let mut found = false;
    for caps in literal.captures_iter(raw) {
        found = true;
        joined.push_str(&unescape(caps.get(1).map_or("", |m| m.as_str())));
    }
    if !found {
        return None;
    }

    Some(joined.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('t') | Some('r') => out.push(' '),
            Some('p') | Some('l') => out.push(' '),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

// --- Humanizing -------------------------------------------------------------

/// `NIDORAN_F` → `Nidoran F`, `MR_MIME` → `Mr Mime`.
pub fn humanize_constant(suffix: &str) -> String {
    suffix.split('_').filter(|w| !w.is_empty()).map(title_word).collect::<Vec<_>>().join(" ")
}

/// `NidoranF` → `Nidoran F`, `MrMime` → `Mr Mime`, `Porygon_Z` → `Porygon Z`.
///
/// A digit run after a letter starts a new word (`Zygarde10` → `Zygarde 10`).
pub fn humanize_camel(tag: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for part in tag.split('_').filter(|p| !p.is_empty()) {
        let mut current = String::new();
        let mut prev: Option<char> = None;
        for c in part.chars() {
            let boundary = match prev {
                Some(p) => {
                    (c.is_ascii_uppercase() && (p.is_ascii_lowercase() || p.is_ascii_digit()))
                        || (c.is_ascii_digit() && p.is_ascii_alphabetic())
                }
                None => false,
            };
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
            prev = Some(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words.iter().map(|w| title_word(w)).collect::<Vec<_>>().join(" ")
}

fn title_word(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// --- Symbol tables -----------------------------------------------------------

static TYPE_NAMES: &[(&str, &str)] = &[
    ("NORMAL", "Normal"),
    ("FIGHTING", "Fighting"),
    ("FLYING", "Flying"),
    ("POISON", "Poison"),
    ("GROUND", "Ground"),
    ("ROCK", "Rock"),
    ("BUG", "Bug"),
    ("GHOST", "Ghost"),
    ("STEEL", "Steel"),
    ("MYSTERY", "Mystery"),
    ("FIRE", "Fire"),
    ("WATER", "Water"),
    ("GRASS", "Grass"),
    ("ELECTRIC", "Electric"),
    ("PSYCHIC", "Psychic"),
    ("ICE", "Ice"),
    ("DRAGON", "Dragon"),
    ("DARK", "Dark"),
    ("FAIRY", "Fairy"),
];

static CATEGORY_NAMES: &[(&str, &str)] = &[("PHYSICAL", "Physical"), ("SPECIAL", "Special"), ("STATUS", "Status")];

/// Day and night variants share one display name.
static EVOLUTION_METHOD_NAMES: &[(&str, &str)] = &[
    ("EVO_LEVEL", "Level"),
    ("EVO_LEVEL_DAY", "Level"),
    ("EVO_LEVEL_NIGHT", "Level"),
    ("EVO_LEVEL_DUSK", "Level"),
    ("EVO_LEVEL_ATK_GT_DEF", "Level (Atk > Def)"),
    ("EVO_LEVEL_ATK_EQ_DEF", "Level (Atk = Def)"),
    ("EVO_LEVEL_ATK_LT_DEF", "Level (Atk < Def)"),
    ("EVO_LEVEL_MALE", "Level (Male)"),
    ("EVO_LEVEL_FEMALE", "Level (Female)"),
    ("EVO_LEVEL_SILCOON", "Level (Silcoon)"),
    ("EVO_LEVEL_CASCOON", "Level (Cascoon)"),
    ("EVO_LEVEL_NINJASK", "Level (Ninjask)"),
    ("EVO_LEVEL_SHEDINJA", "Level (Shedinja)"),
    ("EVO_LEVEL_RAIN", "Level (Rain)"),
    ("EVO_LEVEL_DARK_TYPE_MON_IN_PARTY", "Level (Dark in Party)"),
    ("EVO_LEVEL_NATURE_LOW_KEY", "Level (Low Key Nature)"),
    ("EVO_LEVEL_NATURE_AMPED", "Level (Amped Nature)"),
    ("EVO_ITEM", "Stone"),
    ("EVO_ITEM_HOLD", "Held Item"),
    ("EVO_ITEM_HOLD_DAY", "Held Item"),
    ("EVO_ITEM_HOLD_NIGHT", "Held Item"),
    ("EVO_HOLD_ITEM_DAY", "Held Item"),
    ("EVO_HOLD_ITEM_NIGHT", "Held Item"),
    ("EVO_ITEM_MALE", "Stone (Male)"),
    ("EVO_ITEM_FEMALE", "Stone (Female)"),
    ("EVO_TRADE", "Trade"),
    ("EVO_TRADE_ITEM", "Trade"),
    ("EVO_TRADE_SPECIFIC_MON", "Trade"),
    ("EVO_FRIENDSHIP", "Friendship"),
    ("EVO_FRIENDSHIP_DAY", "Friendship"),
    ("EVO_FRIENDSHIP_NIGHT", "Friendship"),
    ("EVO_FRIENDSHIP_MOVE_TYPE", "Friendship (Move Type)"),
    ("EVO_MOVE", "Move"),
    ("EVO_MOVE_TYPE", "Move Type"),
    ("EVO_MOVE_TWO_SEGMENT", "Move (Two Segment)"),
    ("EVO_MOVE_THREE_SEGMENT", "Move (Three Segment)"),
    ("EVO_MAP", "Location"),
    ("EVO_MAPSEC", "Location"),
    ("EVO_SPECIFIC_MAP", "Location"),
    ("EVO_SPECIFIC_MAPSEC", "Location"),
    ("EVO_MEGA_EVOLUTION", "Mega"),
    ("EVO_PRIMAL_REVERSION", "Primal"),
    ("EVO_GIGANTAMAX", "Gigantamax"),
    ("EVO_OTHER_PARTY_MON", "Party Pokemon"),
    ("EVO_SPECIFIC_MON_IN_PARTY", "Party Pokemon"),
    ("EVO_BEAUTY", "Beauty"),
    ("EVO_CRITICAL_HITS", "Critical Hits"),
    ("EVO_SCRIPT_TRIGGER_DMG", "Script Trigger"),
    ("EVO_DARK_SCROLL", "Dark Scroll"),
    ("EVO_WATER_SCROLL", "Water Scroll"),
    ("EVO_RECOIL_DAMAGE_MALE", "Recoil (Male)"),
    ("EVO_RECOIL_DAMAGE_FEMALE", "Recoil (Female)"),
    ("EVO_NONE", "None"),
];

static STANDARD: Lazy<Symbols> = Lazy::new(|| Symbols {
    types: table(TYPE_NAMES),
    categories: table(CATEGORY_NAMES),
    evolution_methods: table(EVOLUTION_METHOD_NAMES),
});

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Immutable lookup tables for symbolic constants.
///
/// Built once per run and passed explicitly to whatever needs it. Closed sets
/// (types, damage categories, evolution methods) use explicit tables; open
/// sets (species, moves, items, abilities, egg groups) are humanized from the
/// constant name.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbols {
    types: HashMap<String, String>,
    categories: HashMap<String, String>,
    evolution_methods: HashMap<String, String>,
}

impl Default for Symbols {
    fn default() -> Self {
        Symbols::standard()
    }
}

impl Symbols {
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Add or replace entries, keyed by the constant suffix (`STELLAR`) or,
    /// for evolution methods, the full constant (`EVO_LEVEL_SNOW`).
    pub fn extend(&mut self, kind: SymbolKind, entries: impl IntoIterator<Item = (String, String)>) {
        let target = match kind {
            SymbolKind::Type => &mut self.types,
            SymbolKind::Category => &mut self.categories,
            SymbolKind::EvolutionMethod => &mut self.evolution_methods,
            _ => return,
        };
        target.extend(entries);
    }

    /// Map a symbolic constant to its display value.
    ///
    /// Tokens without the expected prefix pass through unchanged; tokens with
    /// the prefix but missing from a closed table pass through as their raw
    /// suffix. `*_NONE` open-set constants map to null.
    pub fn lookup(&self, kind: SymbolKind, token: &str) -> Value {
        let Some(suffix) = token.strip_prefix(kind.prefix()) else {
            return Value::Str(token.to_string());
        };

        let closed = match kind {
            SymbolKind::Type => Some(&self.types),
            SymbolKind::Category => Some(&self.categories),
            SymbolKind::EvolutionMethod => Some(&self.evolution_methods),
            _ => None,
        };

        match closed {
            Some(map) => Value::Str(map.get(suffix).cloned().unwrap_or_else(|| suffix.to_string())),
            None if suffix == "NONE" || suffix.is_empty() => Value::Null,
            None => Value::Str(humanize_constant(suffix)),
        }
    }

    /// Display string for a token, empty when the lookup yields null.
    pub fn display(&self, kind: SymbolKind, token: &str) -> String {
        match self.lookup(kind, token.trim()) {
            Value::Str(s) => s,
            _ => String::new(),
        }
    }
}
