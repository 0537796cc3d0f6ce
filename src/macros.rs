/// Compile a regex once and hand out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Declare one scalar field rule.
///
/// ```text
/// field!("hp", r"\.baseHP\s*=\s*([^,\n]+)", "int", required)
/// field!("speed", r"\.baseSpeed\s*=\s*([^,\n]+)", "int", default: Value::Int(0))
/// ```
///
/// Patterns and transforms are plain strings here; they are compiled (and the
/// transform name resolved) by `RuleSet::compile`, so a bad entry surfaces as
/// a `ConfigError` for its source kind rather than a panic.
#[macro_export]
macro_rules! field {
    ($name:literal, $pat:literal, $transform:literal $(, default: $default:expr)?, required $(,)?) => {
        $crate::field!(@spec $name, $pat, $transform, None $(.or(Some($default)))?, true)
    };
    ($name:literal, $pat:literal, $transform:literal $(, default: $default:expr)? $(,)?) => {
        $crate::field!(@spec $name, $pat, $transform, None $(.or(Some($default)))?, false)
    };
    (@spec $name:literal, $pat:literal, $transform:literal, $default:expr, $required:expr) => {
        $crate::engine::FieldSpec {
            field: $name.to_string(),
            pattern: $pat.to_string(),
            transform: $transform.to_string(),
            default: $default,
            required: $required,
        }
    };
}

/// Declare a repeated child rule: one pattern, several capture groups, each
/// mapped to a child field through a transform.
#[macro_export]
macro_rules! child {
    ($pat:literal, [ $(($name:literal, $group:literal, $transform:literal)),* $(,)? ]) => {{
        $crate::engine::ChildSpec {
            pattern: $pat.to_string(),
            fields: vec![ $($crate::engine::ChildFieldSpec {
                field: $name.to_string(),
                group: $group,
                transform: $transform.to_string(),
            }),* ],
        }
    }};
}
