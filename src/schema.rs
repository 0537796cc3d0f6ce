//! Table schemas and the normalized table shape handed to sinks.
//!
//! Every table the pipeline can produce is declared here once: fixed column
//! order, column types, primary key, and foreign keys into the key-authority
//! tables. Typed records produce loose rows; [`TableSchema::shape_row`] is the
//! only place a loose row becomes a table row.

use crate::Value;
use crate::error::RecordError;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// One table row, keyed by column name, in schema column order.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
    /// Display string drawn from a closed symbol table ("Fire", "Physical").
    Enum,
}

impl ColumnType {
    fn name(self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Text => "text",
            ColumnType::Enum => "enum",
        }
    }

    /// Coerce `value` into this column type. Null always passes; nullability
    /// is the validator's concern.
    pub fn coerce(self, column: &str, value: Value) -> Result<Value, RecordError> {
        let mismatch = |v: &Value| RecordError::Coercion { column: column.to_string(), expected: self.name(), value: v.to_string() };

        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),

            (ColumnType::Int, Value::Int(v)) => Ok(Value::Int(v)),
            (ColumnType::Int, Value::Float(f)) if f.fract() == 0.0 => Ok(Value::Int(f as i64)),
            (ColumnType::Int, Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| mismatch(&Value::Str(s))),

            (ColumnType::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (ColumnType::Float, Value::Int(v)) => Ok(Value::Float(v as f64)),
            (ColumnType::Float, Value::Str(s)) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| mismatch(&Value::Str(s)))
            }

            (ColumnType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (ColumnType::Bool, Value::Int(0)) => Ok(Value::Bool(false)),
            (ColumnType::Bool, Value::Int(1)) => Ok(Value::Bool(true)),

            (ColumnType::Text | ColumnType::Enum, Value::Str(s)) => Ok(Value::Str(s)),
            (ColumnType::Text | ColumnType::Enum, Value::Int(v)) => Ok(Value::Str(v.to_string())),

            (_, other) => Err(mismatch(&other)),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    pub nullable: bool,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty, nullable: false }
}

const fn opt(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty, nullable: true }
}

/// A column whose non-null values must be primary keys of `references`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub primary_key: Vec<&'static str>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub const CREATURES: &'static str = "creatures";
    pub const MOVES: &'static str = "moves";
    pub const CREATURE_MOVES: &'static str = "creature_moves";
    pub const EVOLUTIONS: &'static str = "evolutions";

    pub fn creatures() -> Self {
        use ColumnType::*;
        TableSchema {
            name: Self::CREATURES,
            columns: vec![
                col("creature_key", Text),
                col("name", Text),
                col("hp", Int),
                col("attack", Int),
                col("defense", Int),
                col("sp_attack", Int),
                col("sp_defense", Int),
                col("speed", Int),
                col("bst", Int),
                opt("type1", Enum),
                opt("type2", Enum),
                opt("ability1", Text),
                opt("ability2", Text),
                opt("hidden_ability", Text),
                opt("catch_rate", Int),
                opt("exp_yield", Int),
                opt("egg_group1", Text),
                opt("egg_group2", Text),
            ],
            primary_key: vec!["creature_key"],
            foreign_keys: vec![],
        }
    }

    pub fn moves() -> Self {
        use ColumnType::*;
        TableSchema {
            name: Self::MOVES,
            columns: vec![
                col("move_key", Text),
                col("name", Text),
                opt("type", Enum),
                opt("category", Enum),
                opt("power", Int),
                opt("accuracy", Int),
                opt("pp", Int),
                opt("priority", Int),
                opt("effect", Text),
                col("makes_contact", Bool),
                col("is_punch_move", Bool),
                col("is_bite_move", Bool),
                col("is_sound_move", Bool),
                col("is_pulse_move", Bool),
                col("is_slicing_move", Bool),
                col("is_wind_move", Bool),
                col("has_secondary_effect", Bool),
                opt("description", Text),
            ],
            primary_key: vec!["move_key"],
            foreign_keys: vec![],
        }
    }

    pub fn creature_moves() -> Self {
        use ColumnType::*;
        TableSchema {
            name: Self::CREATURE_MOVES,
            columns: vec![col("creature_key", Text), col("move_key", Text), col("learn_method", Enum), opt("level", Int)],
            primary_key: vec!["creature_key", "move_key", "learn_method", "level"],
            foreign_keys: vec![
                ForeignKey { column: "creature_key", references: Self::CREATURES },
                ForeignKey { column: "move_key", references: Self::MOVES },
            ],
        }
    }

    pub fn evolutions() -> Self {
        use ColumnType::*;
        TableSchema {
            name: Self::EVOLUTIONS,
            columns: vec![
                col("from_creature_key", Text),
                col("to_creature_key", Text),
                col("from_creature", Text),
                col("to_creature", Text),
                col("method", Enum),
                col("condition", Text),
            ],
            primary_key: vec!["from_creature_key", "to_creature_key", "method", "condition"],
            foreign_keys: vec![
                ForeignKey { column: "from_creature_key", references: Self::CREATURES },
                ForeignKey { column: "to_creature_key", references: Self::CREATURES },
            ],
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Put a loose row into schema column order with coerced values.
    ///
    /// Columns the row does not mention become null; columns the schema does
    /// not declare are an error rather than silently dropped.
    pub fn shape_row(&self, mut loose: Row) -> Result<Row, RecordError> {
        let mut row = Row::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = loose.shift_remove(column.name).unwrap_or(Value::Null);
            row.insert(column.name.to_string(), column.ty.coerce(column.name, value)?);
        }
        if let Some((extra, value)) = loose.into_iter().next() {
            return Err(RecordError::Coercion { column: extra, expected: "a declared column", value: value.to_string() });
        }
        Ok(row)
    }

    /// Composite key text for `row`, stable across runs.
    pub fn key_of(&self, row: &Row) -> String {
        let mut parts = self.primary_key.iter().map(|c| row.get(*c).map_or_else(|| Value::Null.key_text(), Value::key_text));
        let mut key = parts.next().unwrap_or_default();
        for part in parts {
            key.push('|');
            key.push_str(&part);
        }
        key
    }
}

/// A finished table: schema plus validated rows in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub rows: Vec<Row>,
}

impl NormalizedTable {
    pub fn new(schema: &TableSchema, rows: Vec<Row>) -> Self {
        NormalizedTable {
            name: schema.name.to_string(),
            columns: schema.columns.clone(),
            primary_key: schema.primary_key.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over one column's values, in row order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |r| r.get(column).unwrap_or(&Value::Null))
    }

    /// First row whose primary key equals `key`. Composite keys are written
    /// with their parts joined by `|`, null parts as `∅`.
    pub fn find(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|r| self.key_of(r) == key)
    }

    fn key_of(&self, row: &Row) -> String {
        let parts: Vec<String> =
            self.primary_key.iter().map(|c| row.get(c).map_or_else(|| Value::Null.key_text(), Value::key_text)).collect();
        parts.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loose(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn shape_row_orders_and_fills() {
        let schema = TableSchema::creature_moves();
        let row = schema
            .shape_row(loose(&[
                ("level", Value::Int(7)),
                ("move_key", Value::from("tackle")),
                ("creature_key", Value::from("bulbasaur")),
                ("learn_method", Value::from("level")),
            ]))
            .unwrap();
        let cols: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(cols, ["creature_key", "move_key", "learn_method", "level"]);

        let egg = schema
            .shape_row(loose(&[("creature_key", Value::from("a")), ("move_key", Value::from("b")), ("learn_method", Value::from("egg"))]))
            .unwrap();
        assert_eq!(egg["level"], Value::Null);
    }

    #[test]
    fn shape_row_rejects_undeclared_columns() {
        let err = TableSchema::creature_moves().shape_row(loose(&[("nonsense", Value::Int(1))])).unwrap_err();
        assert!(matches!(err, RecordError::Coercion { column, .. } if column == "nonsense"));
    }

    #[test]
    fn coercions() {
        assert_eq!(ColumnType::Int.coerce("c", Value::from("12")), Ok(Value::Int(12)));
        assert_eq!(ColumnType::Float.coerce("c", Value::Int(3)), Ok(Value::Float(3.0)));
        assert_eq!(ColumnType::Bool.coerce("c", Value::Int(1)), Ok(Value::Bool(true)));
        assert_eq!(ColumnType::Text.coerce("c", Value::Int(16)), Ok(Value::from("16")));
        assert!(ColumnType::Int.coerce("c", Value::from("Fire")).is_err());
        assert!(ColumnType::Bool.coerce("c", Value::from("yes")).is_err());
        assert_eq!(ColumnType::Int.coerce("c", Value::Null), Ok(Value::Null));
    }

    #[test]
    fn composite_keys() {
        let schema = TableSchema::creature_moves();
        let level = schema
            .shape_row(loose(&[
                ("creature_key", Value::from("a")),
                ("move_key", Value::from("b")),
                ("learn_method", Value::from("level")),
                ("level", Value::Int(5)),
            ]))
            .unwrap();
        let egg = schema
            .shape_row(loose(&[("creature_key", Value::from("a")), ("move_key", Value::from("b")), ("learn_method", Value::from("egg"))]))
            .unwrap();
        assert_eq!(schema.key_of(&level), "a|b|level|5");
        assert_ne!(schema.key_of(&level), schema.key_of(&egg));
    }

    #[test]
    fn every_key_column_is_declared() {
        for schema in [TableSchema::creatures(), TableSchema::moves(), TableSchema::creature_moves(), TableSchema::evolutions()] {
            for pk in &schema.primary_key {
                assert!(schema.column(pk).is_some(), "{}: {pk}", schema.name);
            }
            for fk in &schema.foreign_keys {
                assert!(schema.column(fk.column).is_some(), "{}: {}", schema.name, fk.column);
            }
        }
    }
}
