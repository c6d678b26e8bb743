//! Operator taxonomy: backend operator types ⇄ visual node kinds.
//!
//! The visual kind is never stored. It is recomputed from `operator_type`
//! (and `operator_class`) every time a node is shown.

use serde::{Deserialize, Serialize};

use crate::types::OperatorType;

/// Visual node kind shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    Source,
    Transform,
    Sink,
    Default,
}

impl VisualKind {
    /// Get the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            VisualKind::Source => "Source",
            VisualKind::Transform => "Transform",
            VisualKind::Sink => "Sink",
            VisualKind::Default => "Operator",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualKind::Source => "source",
            VisualKind::Transform => "transform",
            VisualKind::Sink => "sink",
            VisualKind::Default => "default",
        }
    }

    /// Kinds offered by the "add node" palette.
    pub fn palette() -> &'static [VisualKind] {
        &[VisualKind::Source, VisualKind::Transform, VisualKind::Sink]
    }

    pub fn description(&self) -> &'static str {
        match self {
            VisualKind::Source => "Reads records from a data asset.",
            VisualKind::Transform => {
                "Reshapes records in flight.\n\
                 Pick an operator class to choose the transformation."
            }
            VisualKind::Sink => "Writes records to a destination asset.",
            VisualKind::Default => "Operator type not recognised by this console.",
        }
    }
}

impl std::fmt::Display for VisualKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Operator classes that pick their own operator type regardless of kind.
pub const ROUTING_OVERRIDE_CLASSES: [&str; 5] = ["merge", "union", "join", "validate", "noop"];

/// Operator type an override class routes to, if `class` is one.
pub fn routing_override(class: Option<&str>) -> Option<OperatorType> {
    let class = class?.trim().to_ascii_lowercase();
    if ROUTING_OVERRIDE_CLASSES.contains(&class.as_str()) {
        Some(OperatorType::parse(&class))
    } else {
        None
    }
}

/// Visual kind for a backend operator.
///
/// `operator_class` does not influence the kind today; it is accepted so
/// callers pass the full operator identity.
pub fn to_visual_kind(operator_type: &OperatorType, _operator_class: Option<&str>) -> VisualKind {
    match operator_type {
        OperatorType::Extract => VisualKind::Source,
        OperatorType::Load => VisualKind::Sink,
        OperatorType::Transform
        | OperatorType::Validate
        | OperatorType::Noop
        | OperatorType::Merge
        | OperatorType::Union
        | OperatorType::Join => VisualKind::Transform,
        OperatorType::Other(_) => VisualKind::Default,
    }
}

/// Backend operator type for a visual kind.
///
/// An override class wins outright; otherwise source → extract,
/// sink → load, anything else → transform.
pub fn to_operator_type(kind: VisualKind, operator_class: Option<&str>) -> OperatorType {
    if let Some(routed) = routing_override(operator_class) {
        return routed;
    }
    match kind {
        VisualKind::Source => OperatorType::Extract,
        VisualKind::Sink => OperatorType::Load,
        VisualKind::Transform | VisualKind::Default => OperatorType::Transform,
    }
}

/// Operator type after a node's class changed from `previous_class` to
/// `new_class`.
///
/// Types the console does not derive (unknown strings, or a known type that
/// the previous class did not route to) are kept as they are.
pub fn rederive_operator_type(
    current: &OperatorType,
    previous_class: Option<&str>,
    new_class: Option<&str>,
) -> OperatorType {
    if let Some(routed) = routing_override(new_class) {
        return routed;
    }
    let kind = to_visual_kind(current, previous_class);
    let derived_before = to_operator_type(kind, previous_class);
    if &derived_before == current || routing_override(previous_class).is_some() {
        to_operator_type(kind, new_class)
    } else {
        current.clone()
    }
}

/// Known transform sub-kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorClass {
    Filter,
    Aggregate,
    Join,
    RenameColumns,
    DropColumns,
    Deduplicate,
    FillNulls,
    Merge,
    Union,
    Validate,
    Noop,
}

impl OperatorClass {
    pub fn all() -> &'static [OperatorClass] {
        &[
            OperatorClass::Filter,
            OperatorClass::Aggregate,
            OperatorClass::Join,
            OperatorClass::RenameColumns,
            OperatorClass::DropColumns,
            OperatorClass::Deduplicate,
            OperatorClass::FillNulls,
            OperatorClass::Merge,
            OperatorClass::Union,
            OperatorClass::Validate,
            OperatorClass::Noop,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorClass::Filter => "filter",
            OperatorClass::Aggregate => "aggregate",
            OperatorClass::Join => "join",
            OperatorClass::RenameColumns => "rename_columns",
            OperatorClass::DropColumns => "drop_columns",
            OperatorClass::Deduplicate => "deduplicate",
            OperatorClass::FillNulls => "fill_nulls",
            OperatorClass::Merge => "merge",
            OperatorClass::Union => "union",
            OperatorClass::Validate => "validate",
            OperatorClass::Noop => "noop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::all().iter().copied().find(|c| c.as_str() == value)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OperatorClass::Filter => "Filter",
            OperatorClass::Aggregate => "Aggregate",
            OperatorClass::Join => "Join",
            OperatorClass::RenameColumns => "Rename Columns",
            OperatorClass::DropColumns => "Drop Columns",
            OperatorClass::Deduplicate => "Deduplicate",
            OperatorClass::FillNulls => "Fill Nulls",
            OperatorClass::Merge => "Merge",
            OperatorClass::Union => "Union",
            OperatorClass::Validate => "Validate",
            OperatorClass::Noop => "No-op",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OperatorClass::Filter => "Keeps rows matching a condition.",
            OperatorClass::Aggregate => "Groups rows and computes aggregates per group.",
            OperatorClass::Join => "Joins two inputs on key columns.",
            OperatorClass::RenameColumns => "Renames columns using a mapping.",
            OperatorClass::DropColumns => "Removes the listed columns.",
            OperatorClass::Deduplicate => "Drops duplicate rows by key columns.",
            OperatorClass::FillNulls => "Replaces nulls with per-column defaults.",
            OperatorClass::Merge => "Merges several inputs into one stream.",
            OperatorClass::Union => "Concatenates inputs with the same schema.",
            OperatorClass::Validate => "Checks rows against expectations.",
            OperatorClass::Noop => "Passes rows through unchanged.",
        }
    }

    /// Whether choosing this class re-routes the operator type.
    pub fn overrides_type(&self) -> bool {
        routing_override(Some(self.as_str())).is_some()
    }
}
