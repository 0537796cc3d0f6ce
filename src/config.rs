//! Build configuration.
//!
//! Everything here is optional; `BuildConfig::default()` reads the standard
//! file names with the built-in rule sets. A TOML file can rename sources,
//! skip kinds, patch individual field rules and extend the symbol tables:
//!
//! ```toml
//! skip = ["egg_moves"]
//!
//! [sources]
//! moves = "battle_moves.h"
//!
//! [[overrides]]
//! kind = "moves"
//! field = "power"
//! pattern = '\.basePower\s*=\s*([^,\n]+)'
//!
//! [symbols.types]
//! STELLAR = "Stellar"
//! ```
//!
//! Which branch of a conditional-compilation ternary is taken is not part of
//! the configuration.

use crate::error::ConfigError;
use crate::normalize::{SymbolKind, Symbols};
use crate::{SourceKind, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Logical source name per source kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceNames {
    pub creatures: String,
    pub moves: String,
    pub learnsets: String,
    pub egg_moves: String,
    /// Directory with one file per TM move.
    pub tm_compatibility: String,
    /// Directory with one file per tutor move.
    pub tutor_compatibility: String,
    pub evolutions: String,
}

impl Default for SourceNames {
    fn default() -> Self {
        Self {
            creatures: "Base_Stats.c".to_string(),
            moves: "moves_info.h".to_string(),
            learnsets: "Learnsets.c".to_string(),
            egg_moves: "Egg_Moves.c".to_string(),
            tm_compatibility: "tm_compatibility".to_string(),
            tutor_compatibility: "tutor_compatibility".to_string(),
            evolutions: "Evolution Table.c".to_string(),
        }
    }
}

impl SourceNames {
    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Creatures => &self.creatures,
            SourceKind::Moves => &self.moves,
            SourceKind::Learnsets => &self.learnsets,
            SourceKind::EggMoves => &self.egg_moves,
            SourceKind::TmCompatibility => &self.tm_compatibility,
            SourceKind::TutorCompatibility => &self.tutor_compatibility,
            SourceKind::Evolutions => &self.evolutions,
        }
    }
}

/// Replace parts of one built-in field rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    pub kind: SourceKind,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl RuleOverride {
    fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.transform.is_none() && self.default.is_none() && self.required.is_none()
    }
}

/// Extra symbol-table entries, keyed like the built-in tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolOverrides {
    pub types: IndexMap<String, String>,
    pub categories: IndexMap<String, String>,
    pub evolution_methods: IndexMap<String, String>,
}

impl SymbolOverrides {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.categories.is_empty() && self.evolution_methods.is_empty()
    }

    pub fn apply(&self, symbols: &mut Symbols) {
        symbols.extend(SymbolKind::Type, self.types.clone());
        symbols.extend(SymbolKind::Category, self.categories.clone());
        symbols.extend(SymbolKind::EvolutionMethod, self.evolution_methods.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub sources: SourceNames,

    /// Source kinds not to process at all.
    pub skip: Vec<SourceKind>,

    pub overrides: Vec<RuleOverride>,

    pub symbols: SymbolOverrides,

    /// Derive a minimal moves table from learnset move keys when the moves
    /// source is missing or skipped.
    pub derive_moves_from_learnsets: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sources: SourceNames::default(),
            skip: Vec::new(),
            overrides: Vec::new(),
            symbols: SymbolOverrides::default(),
            derive_moves_from_learnsets: true,
        }
    }
}

impl BuildConfig {
    pub fn is_skipped(&self, kind: SourceKind) -> bool {
        self.skip.contains(&kind)
    }

    pub fn overrides_for(&self, kind: SourceKind) -> impl Iterator<Item = &RuleOverride> {
        self.overrides.iter().filter(move |o| o.kind == kind)
    }

    /// Standard symbol tables plus configured extensions.
    pub fn symbols(&self) -> Symbols {
        let mut symbols = Symbols::standard();
        self.symbols.apply(&mut symbols);
        symbols
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for kind in SourceKind::ALL {
            let name = self.sources.get(kind).trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!("source name for {kind} must not be empty")));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!("source `{name}` is assigned to more than one kind")));
            }
        }

        for o in &self.overrides {
            if o.field.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{}: override without a field name", o.kind)));
            }
            if o.is_empty() {
                return Err(ConfigError::Invalid(format!("{}: override for `{}` changes nothing", o.kind, o.field)));
            }
        }

        for (table, entries) in
            [("types", &self.symbols.types), ("categories", &self.symbols.categories), ("evolution_methods", &self.symbols.evolution_methods)]
        {
            if let Some((k, _)) = entries.iter().find(|(k, v)| k.trim().is_empty() || v.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("symbols.{table}: empty entry `{k}`")));
            }
        }

        Ok(())
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Toml(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BuildConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.derive_moves_from_learnsets);
        assert_eq!(config.sources.get(SourceKind::Evolutions), "Evolution Table.c");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BuildConfig::from_toml(
            r#"
            skip = ["egg_moves", "tutor_compatibility"]

            [sources]
            moves = "battle_moves.h"
            tm_compatibility = "tm"
            "#,
        )
        .unwrap();

        assert!(config.is_skipped(SourceKind::EggMoves));
        assert!(config.is_skipped(SourceKind::TutorCompatibility));
        assert_eq!(config.sources.get(SourceKind::TmCompatibility), "tm");
        assert_eq!(config.sources.get(SourceKind::TutorCompatibility), "tutor_compatibility");
        assert!(!config.is_skipped(SourceKind::Moves));
        assert_eq!(config.sources.moves, "battle_moves.h");
        assert_eq!(config.sources.creatures, "Base_Stats.c");
        assert!(config.derive_moves_from_learnsets);
    }

    #[test]
    fn overrides_and_symbols() {
        let config = BuildConfig::from_toml(
            r#"
            [[overrides]]
            kind = "moves"
            field = "power"
            pattern = '\.basePower\s*=\s*([^,\n]+)'

            [[overrides]]
            kind = "creatures"
            field = "catch_rate"
            default = 45

            [symbols.types]
            STELLAR = "Stellar"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let moves: Vec<_> = config.overrides_for(SourceKind::Moves).collect();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].field, "power");

        let creatures: Vec<_> = config.overrides_for(SourceKind::Creatures).collect();
        assert_eq!(creatures[0].default, Some(Value::Int(45)));

        assert_eq!(config.symbols().lookup(SymbolKind::Type, "TYPE_STELLAR"), Value::from("Stellar"));
    }

    #[test]
    fn invalid_configs() {
        let mut config = BuildConfig::default();
        config.sources.moves = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.sources.moves = config.sources.creatures.clone();
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.overrides.push(RuleOverride {
            kind: SourceKind::Moves,
            field: "power".into(),
            pattern: None,
            transform: None,
            default: None,
            required: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_toml() {
        assert!(matches!(BuildConfig::from_toml("skip = [\"dragons\"]"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = BuildConfig::default();
        config.skip.push(SourceKind::Evolutions);
        config.symbols.categories.insert("OTHER".into(), "Other".into());

        let parsed = BuildConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
