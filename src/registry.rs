//! Static description of each entity kind.
//!
//! The tree, the inline editors and the detail panel never branch on concrete
//! entity types; they look up an [`EntitySchema`] by [`EntityKind`] and read
//! field specs, vocabularies and tab lists from it.

use jiff::civil::Date;

use crate::entity::{FieldMap, FieldValue};
use crate::error::{DeskError, Result};
use crate::types::{
    DefectCause, DefectPriority, DefectStatus, EntityKind, Environment, Id, Priority,
    RequirementStatus, Severity, SprintStatus, TaskStatus, TestCaseStatus, TestCaseType,
};

/// What a reference field points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    User,
    Sprint,
    Category,
    Entity(EntityKind),
}

/// Shape of the value a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Choice(&'static [&'static str]),
    /// A choice that may also be cleared.
    OptionalChoice(&'static [&'static str]),
    Ref(RefTarget),
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub value: ValueKind,
    /// Editable in the panel's edit mode.
    pub editable: bool,
    /// Rendered as a compact editor inside a tree row.
    pub inline: bool,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, value: ValueKind) -> FieldSpec {
    FieldSpec {
        name,
        label,
        value,
        editable: true,
        inline: false,
        required: false,
    }
}

impl FieldSpec {
    const fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Vocabulary of a choice field, empty for anything else.
    pub fn vocabulary(&self) -> &'static [&'static str] {
        match self.value {
            ValueKind::Choice(values) | ValueKind::OptionalChoice(values) => values,
            _ => &[],
        }
    }

    /// Check that `value` has the right shape and belongs to the vocabulary.
    pub fn validate(&self, value: &FieldValue) -> Result<()> {
        let ok = match (self.value, value) {
            (ValueKind::Text, FieldValue::Text(text)) => !self.required || !text.trim().is_empty(),
            (ValueKind::Choice(values), FieldValue::Choice(Some(c)))
            | (ValueKind::OptionalChoice(values), FieldValue::Choice(Some(c))) => {
                values.contains(&c.as_str())
            }
            (ValueKind::OptionalChoice(_), FieldValue::Choice(None)) => true,
            (ValueKind::Ref(_), FieldValue::Ref(id)) => !self.required || id.is_some(),
            (ValueKind::Date, FieldValue::Date(_)) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else if self.required && value.is_empty() {
            Err(DeskError::Validation(format!("{} is required", self.label)))
        } else {
            Err(DeskError::InvalidValue {
                field: self.name.to_string(),
                value: value.to_string(),
            })
        }
    }

    /// Parse user input into a value of this field's shape.
    ///
    /// An empty string or `-` clears optional references, dates and choices.
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue> {
        let raw = raw.trim();
        let clear = raw.is_empty() || raw == "-";
        let value = match self.value {
            ValueKind::Text => FieldValue::text(raw),
            ValueKind::Choice(_) => FieldValue::Choice(Some(raw.to_lowercase())),
            ValueKind::OptionalChoice(_) if clear => FieldValue::Choice(None),
            ValueKind::OptionalChoice(_) => FieldValue::Choice(Some(raw.to_lowercase())),
            ValueKind::Ref(_) if clear => FieldValue::Ref(None),
            ValueKind::Ref(_) => {
                let id: Id = raw.parse().map_err(|_| self.invalid(raw))?;
                FieldValue::Ref(Some(id))
            }
            ValueKind::Date if clear => FieldValue::Date(None),
            ValueKind::Date => {
                let date: Date = raw.parse().map_err(|_| self.invalid(raw))?;
                FieldValue::Date(Some(date))
            }
        };
        self.validate(&value)?;
        Ok(value)
    }

    fn invalid(&self, raw: &str) -> DeskError {
        DeskError::InvalidValue {
            field: self.name.to_string(),
            value: raw.to_string(),
        }
    }
}

/// Where a tab's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabContent {
    /// Sidebar fields of the entity itself.
    Detail,
    /// Per-field change log.
    History,
    /// Entities of `kind` whose `via` reference points at this entity.
    Related { kind: EntityKind, via: &'static str },
    /// The single entity this entity's own `field` points at (0 or 1).
    Reference { kind: EntityKind, field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub content: TabContent,
}

impl TabSpec {
    /// Whether this tab shows a relation count next to its label.
    pub fn has_badge(&self) -> bool {
        matches!(
            self.content,
            TabContent::Related { .. } | TabContent::Reference { .. }
        )
    }
}

const DETAIL: TabSpec = TabSpec {
    key: "detail",
    label: "Detail",
    content: TabContent::Detail,
};

const HISTORY: TabSpec = TabSpec {
    key: "history",
    label: "History",
    content: TabContent::History,
};

const fn related(key: &'static str, label: &'static str, kind: EntityKind, via: &'static str) -> TabSpec {
    TabSpec {
        key,
        label,
        content: TabContent::Related { kind, via },
    }
}

const fn reference(key: &'static str, label: &'static str, kind: EntityKind, field: &'static str) -> TabSpec {
    TabSpec {
        key,
        label,
        content: TabContent::Reference { kind, field },
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    /// Field holding the entity's display name.
    pub title_field: &'static str,
    pub fields: &'static [FieldSpec],
    pub tabs: &'static [TabSpec],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like [`field`](Self::field), but unknown names are an error.
    pub fn require_field(&self, name: &str) -> Result<&'static FieldSpec> {
        self.field(name).ok_or_else(|| DeskError::UnknownField {
            kind: self.kind,
            field: name.to_string(),
        })
    }

    /// Names of every field the panel snapshots on entry to edit mode.
    pub fn editable_fields(&self) -> impl Iterator<Item = &'static str> + use<> {
        self.fields.iter().filter(|f| f.editable).map(|f| f.name)
    }

    pub fn inline_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + use<> {
        self.fields.iter().filter(|f| f.inline)
    }

    pub fn tab(&self, key: &str) -> Option<&'static TabSpec> {
        self.tabs.iter().find(|t| t.key == key)
    }

    /// Reject a field set with a missing or blank required field, or with a
    /// value outside its vocabulary. Fields absent from `fields` are only an
    /// error when `creating` is set.
    pub fn validate(&self, fields: &FieldMap, creating: bool) -> Result<()> {
        for spec in self.fields {
            match fields.get(spec.name) {
                Some(value) => spec.validate(value)?,
                None if creating && spec.required => {
                    return Err(DeskError::Validation(format!("{} is required", spec.label)));
                }
                None => {}
            }
        }
        for name in fields.keys() {
            self.require_field(name)?;
        }
        Ok(())
    }

    pub fn validate_required(&self, fields: &FieldMap) -> Result<()> {
        self.validate(fields, true)
    }
}

const USER: ValueKind = ValueKind::Ref(RefTarget::User);
const SPRINT: ValueKind = ValueKind::Ref(RefTarget::Sprint);
const CATEGORY: ValueKind = ValueKind::Ref(RefTarget::Category);
const REQUIREMENT: ValueKind = ValueKind::Ref(RefTarget::Entity(EntityKind::Requirement));
const TASK: ValueKind = ValueKind::Ref(RefTarget::Entity(EntityKind::Task));
const TEST_CASE: ValueKind = ValueKind::Ref(RefTarget::Entity(EntityKind::TestCase));

static REQUIREMENT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Requirement,
    title_field: "title",
    fields: &[
        field("title", "Title", ValueKind::Text).required(),
        field("description", "Description", ValueKind::Text),
        field("status", "Status", ValueKind::Choice(RequirementStatus::VALUES)).inline(),
        field("priority", "Priority", ValueKind::Choice(Priority::VALUES)).inline(),
        field("assignee", "Assignee", USER).inline(),
        field("developer", "Developer", USER),
        field("tester", "Tester", USER),
        field("sprint", "Sprint", SPRINT).inline(),
        field("category", "Category", CATEGORY),
        field("start_date", "Start date", ValueKind::Date),
        field("end_date", "End date", ValueKind::Date),
    ],
    tabs: &[
        DETAIL,
        related("tasks", "Tasks", EntityKind::Task, "requirement"),
        related("test_cases", "Test cases", EntityKind::TestCase, "requirement"),
        related("defects", "Defects", EntityKind::Defect, "requirement"),
        HISTORY,
    ],
};

static TASK_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Task,
    title_field: "title",
    fields: &[
        field("title", "Title", ValueKind::Text).required(),
        field("description", "Description", ValueKind::Text),
        field("status", "Status", ValueKind::Choice(TaskStatus::VALUES)).inline(),
        field("priority", "Priority", ValueKind::Choice(Priority::VALUES)).inline(),
        field("assignee", "Assignee", USER).inline(),
        field("developer", "Developer", USER),
        field("tester", "Tester", USER),
        field("requirement", "Requirement", REQUIREMENT),
        field("start_date", "Start date", ValueKind::Date),
        field("end_date", "End date", ValueKind::Date),
    ],
    tabs: &[
        DETAIL,
        reference("requirement", "Requirement", EntityKind::Requirement, "requirement"),
        related("defects", "Defects", EntityKind::Defect, "task"),
        HISTORY,
    ],
};

static DEFECT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Defect,
    title_field: "title",
    fields: &[
        field("title", "Title", ValueKind::Text).required(),
        field("description", "Description", ValueKind::Text),
        field("status", "Status", ValueKind::Choice(DefectStatus::VALUES)).inline(),
        field("priority", "Priority", ValueKind::Choice(DefectPriority::VALUES)).inline(),
        field("severity", "Severity", ValueKind::Choice(Severity::VALUES)).inline(),
        field("assignee", "Assignee", USER).inline(),
        field("requirement", "Requirement", REQUIREMENT),
        field("task", "Task", TASK),
        field("test_case", "Test case", TEST_CASE),
        field("sprint", "Sprint", SPRINT).inline(),
        field("environment", "Environment", ValueKind::OptionalChoice(Environment::VALUES)).inline(),
        field("defect_cause", "Defect cause", ValueKind::OptionalChoice(DefectCause::VALUES))
            .inline(),
    ],
    tabs: &[
        DETAIL,
        reference("requirement", "Requirement", EntityKind::Requirement, "requirement"),
        reference("test_cases", "Test cases", EntityKind::TestCase, "test_case"),
        HISTORY,
    ],
};

static TEST_CASE_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::TestCase,
    title_field: "name",
    fields: &[
        field("name", "Name", ValueKind::Text).required(),
        field("status", "Status", ValueKind::Choice(TestCaseStatus::VALUES)).inline(),
        field("priority", "Priority", ValueKind::Choice(Priority::VALUES)).inline(),
        field("type", "Type", ValueKind::Choice(TestCaseType::VALUES)),
        field("category", "Category", CATEGORY),
        field("requirement", "Requirement", REQUIREMENT),
        field("sprint", "Sprint", SPRINT),
        field("module", "Module", ValueKind::Text),
        field("precondition", "Precondition", ValueKind::Text),
        field("steps", "Steps", ValueKind::Text),
        field("expected_result", "Expected result", ValueKind::Text),
    ],
    tabs: &[
        DETAIL,
        reference("requirement", "Requirement", EntityKind::Requirement, "requirement"),
        related("defects", "Defects", EntityKind::Defect, "test_case"),
        HISTORY,
    ],
};

static SPRINT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Sprint,
    title_field: "name",
    fields: &[
        field("name", "Name", ValueKind::Text).required(),
        field("goal", "Goal", ValueKind::Text),
        field("status", "Status", ValueKind::Choice(SprintStatus::VALUES)),
        field("start_date", "Start date", ValueKind::Date),
        field("end_date", "End date", ValueKind::Date),
    ],
    tabs: &[DETAIL],
};

pub fn schema(kind: EntityKind) -> &'static EntitySchema {
    match kind {
        EntityKind::Requirement => &REQUIREMENT_SCHEMA,
        EntityKind::Task => &TASK_SCHEMA,
        EntityKind::Defect => &DEFECT_SCHEMA,
        EntityKind::TestCase => &TEST_CASE_SCHEMA,
        EntityKind::Sprint => &SPRINT_SCHEMA,
    }
}
