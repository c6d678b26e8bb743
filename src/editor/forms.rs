//! Structured form fields per operator class.
//!
//! Each known class exposes a few typed fields that read from and write to
//! top-level keys of the operator config. Classes without a field set are
//! edited through raw JSON only.

use serde_json::{Map, Value};

/// Widget shape of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text; JSON literals keep their type, anything else is a string
    Text,
    /// Comma-separated input stored as a JSON array of strings
    StringList,
    /// `key = value` rows stored as a JSON object; values read like [`FieldKind::Text`]
    KeyValue,
    /// One of a fixed set of strings
    Select(&'static [&'static str]),
    /// Arbitrary JSON value
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Config key the field reads and writes
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub hint: &'static str,
}

const fn field(
    key: &'static str,
    label: &'static str,
    kind: FieldKind,
    hint: &'static str,
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        hint,
    }
}

const FILTER: &[FieldSpec] = &[field(
    "condition",
    "Condition",
    FieldKind::Text,
    "SQL-like predicate, e.g. age > 30",
)];

const AGGREGATE: &[FieldSpec] = &[
    field(
        "group_by",
        "Group by",
        FieldKind::StringList,
        "Comma-separated columns",
    ),
    field(
        "aggregates",
        "Aggregates",
        FieldKind::Json,
        r#"[{"column": "amount", "function": "sum", "alias": "total"}]"#,
    ),
];

const JOIN_HOW: &[&str] = &["inner", "left", "right", "outer"];

const JOIN: &[FieldSpec] = &[
    field(
        "on",
        "Join keys",
        FieldKind::StringList,
        "Comma-separated key columns",
    ),
    field("how", "Join type", FieldKind::Select(JOIN_HOW), ""),
];

const RENAME_COLUMNS: &[FieldSpec] = &[field(
    "mapping",
    "Renames",
    FieldKind::KeyValue,
    "old_name = new_name",
)];

const DROP_COLUMNS: &[FieldSpec] = &[field(
    "columns",
    "Columns",
    FieldKind::StringList,
    "Comma-separated columns to drop",
)];

const KEEP: &[&str] = &["first", "last"];

const DEDUPLICATE: &[FieldSpec] = &[
    field(
        "subset",
        "Key columns",
        FieldKind::StringList,
        "Empty means all columns",
    ),
    field("keep", "Keep", FieldKind::Select(KEEP), ""),
];

const FILL_NULLS: &[FieldSpec] = &[field(
    "values",
    "Fill values",
    FieldKind::KeyValue,
    "column = value",
)];

/// Structured fields for an operator class. Empty for unknown classes.
pub fn fields_for(operator_class: Option<&str>) -> &'static [FieldSpec] {
    match operator_class.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
        Some("filter") => FILTER,
        Some("aggregate") => AGGREGATE,
        Some("join") => JOIN,
        Some("rename_columns") => RENAME_COLUMNS,
        Some("drop_columns") => DROP_COLUMNS,
        Some("deduplicate") => DEDUPLICATE,
        Some("fill_nulls") => FILL_NULLS,
        _ => &[],
    }
}

/// Value held by a form widget.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Pairs(Vec<(String, String)>),
    Json(Value),
}

impl FieldValue {
    /// Hydrate a widget value from a config entry.
    ///
    /// Entries of an unexpected shape are shown as their JSON text rather
    /// than dropped.
    pub fn from_config(kind: FieldKind, value: Option<&Value>) -> Self {
        match kind {
            FieldKind::Text | FieldKind::Select(_) => FieldValue::Text(text_of(value)),
            FieldKind::StringList => match value {
                Some(Value::Array(items)) => {
                    FieldValue::List(items.iter().map(|v| text_of(Some(v))).collect())
                }
                Some(Value::String(s)) => FieldValue::List(parse_list(s)),
                None | Some(Value::Null) => FieldValue::List(Vec::new()),
                Some(other) => FieldValue::List(vec![other.to_string()]),
            },
            FieldKind::KeyValue => match value {
                Some(Value::Object(map)) => FieldValue::Pairs(
                    map.iter()
                        .map(|(k, v)| (k.clone(), text_of(Some(v))))
                        .collect(),
                ),
                _ => FieldValue::Pairs(Vec::new()),
            },
            FieldKind::Json => FieldValue::Json(value.cloned().unwrap_or(Value::Null)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) => scalar_of(text),
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Pairs(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), scalar_of(v)))
                    .collect(),
            ),
            FieldValue::Json(value) => value.clone(),
        }
    }
}

/// Widget text for a config value.
///
/// Strings that would read back as another JSON type are shown quoted so
/// [`scalar_of`] returns them unchanged.
fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) if serde_json::from_str::<Value>(s).is_ok() => {
            Value::String(s.clone()).to_string()
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Config value for widget text: a JSON literal when it parses, else a string.
fn scalar_of(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::String(text.to_string());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Split comma-separated input, dropping blanks.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key = value` lines, skipping lines without a key.
pub fn parse_pairs(input: &str) -> Vec<(String, String)> {
    input
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// A field spec with its hydrated value.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub spec: FieldSpec,
    pub value: FieldValue,
}

/// Hydrate the form for a class from an operator config.
pub fn hydrate(operator_class: Option<&str>, config: &Map<String, Value>) -> Vec<FormField> {
    fields_for(operator_class)
        .iter()
        .map(|spec| FormField {
            spec: *spec,
            value: FieldValue::from_config(spec.kind, config.get(spec.key)),
        })
        .collect()
}
