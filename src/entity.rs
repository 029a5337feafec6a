//! Entity records and field-level access.
//!
//! Every entity kind exposes its editable state through string-named fields
//! carrying a [`FieldValue`]. Inline editors, the detail panel and the remote
//! store all speak in terms of [`FieldMap`]s, so a single code path serves
//! requirements, tasks, defects and test cases.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};
use crate::types::{
    DefectCause, DefectPriority, DefectStatus, EntityKind, Environment, Id, Priority,
    RequirementStatus, Severity, SprintStatus, TaskStatus, TestCaseStatus, TestCaseType,
};

/// The value held by one field of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    /// A vocabulary value; `None` clears an optional choice.
    Choice(Option<String>),
    /// A reference to another entity (user, sprint, requirement, ...).
    Ref(Option<Id>),
    Date(Option<Date>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn choice(value: impl fmt::Display) -> Self {
        FieldValue::Choice(Some(value.to_string()))
    }

    pub fn opt_choice<T: fmt::Display>(value: Option<T>) -> Self {
        FieldValue::Choice(value.map(|v| v.to_string()))
    }

    pub fn reference(id: Option<Id>) -> Self {
        FieldValue::Ref(id)
    }

    pub fn date(date: Option<Date>) -> Self {
        FieldValue::Date(date)
    }

    /// True when the value carries nothing (empty text, cleared choice/ref/date).
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Choice(c) => c.is_none(),
            FieldValue::Ref(r) => r.is_none(),
            FieldValue::Date(d) => d.is_none(),
        }
    }

    pub fn as_ref_id(&self) -> Option<Id> {
        match self {
            FieldValue::Ref(id) => *id,
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            FieldValue::Choice(Some(c)) => Some(c.as_str()),
            _ => None,
        }
    }

    fn into_text(self, field: &str) -> Result<String> {
        match self {
            FieldValue::Text(s) => Ok(s),
            other => Err(mismatch(field, &other)),
        }
    }

    fn into_choice<T: FromStr<Err = DeskError>>(self, field: &str) -> Result<T> {
        match self {
            FieldValue::Choice(Some(s)) => s.parse(),
            other => Err(mismatch(field, &other)),
        }
    }

    fn into_opt_choice<T: FromStr<Err = DeskError>>(self, field: &str) -> Result<Option<T>> {
        match self {
            FieldValue::Choice(Some(s)) => s.parse().map(Some),
            FieldValue::Choice(None) => Ok(None),
            other => Err(mismatch(field, &other)),
        }
    }

    fn into_ref(self, field: &str) -> Result<Option<Id>> {
        match self {
            FieldValue::Ref(id) => Ok(id),
            other => Err(mismatch(field, &other)),
        }
    }

    fn into_date(self, field: &str) -> Result<Option<Date>> {
        match self {
            FieldValue::Date(d) => Ok(d),
            other => Err(mismatch(field, &other)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Choice(Some(c)) => f.write_str(c),
            FieldValue::Ref(Some(id)) => write!(f, "{id}"),
            FieldValue::Date(Some(d)) => write!(f, "{d}"),
            FieldValue::Choice(None) | FieldValue::Ref(None) | FieldValue::Date(None) => {
                f.write_str("-")
            }
        }
    }
}

fn mismatch(field: &str, value: &FieldValue) -> DeskError {
    DeskError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// An ordered set of field assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, value: FieldValue) -> Self {
        let mut map = Self::new();
        map.insert(field, value);
        map
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(field.into(), value)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        FieldMap(iter.into_iter().collect())
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Field-level access shared by every entity kind.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> Id;
    fn project_id(&self) -> Id;
    fn number(&self) -> &str;
    fn title(&self) -> &str;

    /// Read a named field, `None` if the kind has no such field.
    fn get_field(&self, field: &str) -> Option<FieldValue>;

    /// Assign a named field, validating the value against the vocabulary.
    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()>;

    /// Read several fields at once; unknown names are an error.
    fn fields<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        for name in names {
            let value = self.get_field(name).ok_or_else(|| DeskError::UnknownField {
                kind: Self::KIND,
                field: name.to_string(),
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }

    /// Apply every assignment in `fields`, stopping at the first invalid one.
    fn apply_fields(&mut self, fields: &FieldMap) -> Result<()> {
        for (name, value) in fields.iter() {
            self.set_field(name, value.clone())?;
        }
        Ok(())
    }
}

fn unknown(kind: EntityKind, field: &str) -> DeskError {
    DeskError::UnknownField {
        kind,
        field: field.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: Id,
    pub project_id: Id,
    #[serde(default)]
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: RequirementStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee_id: Option<Id>,
    #[serde(default)]
    pub developer_id: Option<Id>,
    #[serde(default)]
    pub tester_id: Option<Id>,
    #[serde(default)]
    pub sprint_id: Option<Id>,
    #[serde(default)]
    pub category_id: Option<Id>,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    /// Child tasks, in display order. Maintained by the store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<Id>,
    /// Defects attached directly (not through a task). Maintained by the store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defect_ids: Vec<Id>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Requirement {
    pub fn new(id: Id, project_id: Id, title: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            number: String::new(),
            title: title.into(),
            description: String::new(),
            status: RequirementStatus::default(),
            priority: Priority::default(),
            assignee_id: None,
            developer_id: None,
            tester_id: None,
            sprint_id: None,
            category_id: None,
            start_date: None,
            end_date: None,
            task_ids: Vec::new(),
            defect_ids: Vec::new(),
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

impl Entity for Requirement {
    const KIND: EntityKind = EntityKind::Requirement;

    fn id(&self) -> Id {
        self.id
    }
    fn project_id(&self) -> Id {
        self.project_id
    }
    fn number(&self) -> &str {
        &self.number
    }
    fn title(&self) -> &str {
        &self.title
    }

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        Some(match field {
            "title" => FieldValue::text(&self.title),
            "description" => FieldValue::text(&self.description),
            "status" => FieldValue::choice(self.status),
            "priority" => FieldValue::choice(self.priority),
            "assignee" => FieldValue::reference(self.assignee_id),
            "developer" => FieldValue::reference(self.developer_id),
            "tester" => FieldValue::reference(self.tester_id),
            "sprint" => FieldValue::reference(self.sprint_id),
            "category" => FieldValue::reference(self.category_id),
            "start_date" => FieldValue::date(self.start_date),
            "end_date" => FieldValue::date(self.end_date),
            _ => return None,
        })
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "title" => self.title = value.into_text(field)?,
            "description" => self.description = value.into_text(field)?,
            "status" => self.status = value.into_choice(field)?,
            "priority" => self.priority = value.into_choice(field)?,
            "assignee" => self.assignee_id = value.into_ref(field)?,
            "developer" => self.developer_id = value.into_ref(field)?,
            "tester" => self.tester_id = value.into_ref(field)?,
            "sprint" => self.sprint_id = value.into_ref(field)?,
            "category" => self.category_id = value.into_ref(field)?,
            "start_date" => self.start_date = value.into_date(field)?,
            "end_date" => self.end_date = value.into_date(field)?,
            _ => return Err(unknown(Self::KIND, field)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Id,
    pub project_id: Id,
    #[serde(default)]
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee_id: Option<Id>,
    #[serde(default)]
    pub developer_id: Option<Id>,
    #[serde(default)]
    pub tester_id: Option<Id>,
    /// Owning requirement; `None` means the task is orphaned.
    #[serde(default)]
    pub requirement_id: Option<Id>,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    /// Defects attached to this task. Maintained by the store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defect_ids: Vec<Id>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Task {
    pub fn new(id: Id, project_id: Id, title: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            number: String::new(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            assignee_id: None,
            developer_id: None,
            tester_id: None,
            requirement_id: None,
            start_date: None,
            end_date: None,
            defect_ids: Vec::new(),
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> Id {
        self.id
    }
    fn project_id(&self) -> Id {
        self.project_id
    }
    fn number(&self) -> &str {
        &self.number
    }
    fn title(&self) -> &str {
        &self.title
    }

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        Some(match field {
            "title" => FieldValue::text(&self.title),
            "description" => FieldValue::text(&self.description),
            "status" => FieldValue::choice(self.status),
            "priority" => FieldValue::choice(self.priority),
            "assignee" => FieldValue::reference(self.assignee_id),
            "developer" => FieldValue::reference(self.developer_id),
            "tester" => FieldValue::reference(self.tester_id),
            "requirement" => FieldValue::reference(self.requirement_id),
            "start_date" => FieldValue::date(self.start_date),
            "end_date" => FieldValue::date(self.end_date),
            _ => return None,
        })
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "title" => self.title = value.into_text(field)?,
            "description" => self.description = value.into_text(field)?,
            "status" => self.status = value.into_choice(field)?,
            "priority" => self.priority = value.into_choice(field)?,
            "assignee" => self.assignee_id = value.into_ref(field)?,
            "developer" => self.developer_id = value.into_ref(field)?,
            "tester" => self.tester_id = value.into_ref(field)?,
            "requirement" => self.requirement_id = value.into_ref(field)?,
            "start_date" => self.start_date = value.into_date(field)?,
            "end_date" => self.end_date = value.into_date(field)?,
            _ => return Err(unknown(Self::KIND, field)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub id: Id,
    pub project_id: Id,
    #[serde(default)]
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: DefectStatus,
    #[serde(default)]
    pub priority: DefectPriority,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub assignee_id: Option<Id>,
    #[serde(default)]
    pub requirement_id: Option<Id>,
    #[serde(default)]
    pub task_id: Option<Id>,
    #[serde(default)]
    pub test_case_id: Option<Id>,
    #[serde(default)]
    pub sprint_id: Option<Id>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub defect_cause: Option<DefectCause>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Defect {
    pub fn new(id: Id, project_id: Id, title: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            number: String::new(),
            title: title.into(),
            description: String::new(),
            status: DefectStatus::default(),
            priority: DefectPriority::default(),
            severity: Severity::default(),
            assignee_id: None,
            requirement_id: None,
            task_id: None,
            test_case_id: None,
            sprint_id: None,
            environment: None,
            defect_cause: None,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

impl Entity for Defect {
    const KIND: EntityKind = EntityKind::Defect;

    fn id(&self) -> Id {
        self.id
    }
    fn project_id(&self) -> Id {
        self.project_id
    }
    fn number(&self) -> &str {
        &self.number
    }
    fn title(&self) -> &str {
        &self.title
    }

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        Some(match field {
            "title" => FieldValue::text(&self.title),
            "description" => FieldValue::text(&self.description),
            "status" => FieldValue::choice(self.status),
            "priority" => FieldValue::choice(self.priority),
            "severity" => FieldValue::choice(self.severity),
            "assignee" => FieldValue::reference(self.assignee_id),
            "requirement" => FieldValue::reference(self.requirement_id),
            "task" => FieldValue::reference(self.task_id),
            "test_case" => FieldValue::reference(self.test_case_id),
            "sprint" => FieldValue::reference(self.sprint_id),
            "environment" => FieldValue::opt_choice(self.environment),
            "defect_cause" => FieldValue::opt_choice(self.defect_cause),
            _ => return None,
        })
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "title" => self.title = value.into_text(field)?,
            "description" => self.description = value.into_text(field)?,
            "status" => self.status = value.into_choice(field)?,
            "priority" => self.priority = value.into_choice(field)?,
            "severity" => self.severity = value.into_choice(field)?,
            "assignee" => self.assignee_id = value.into_ref(field)?,
            "requirement" => self.requirement_id = value.into_ref(field)?,
            "task" => self.task_id = value.into_ref(field)?,
            "test_case" => self.test_case_id = value.into_ref(field)?,
            "sprint" => self.sprint_id = value.into_ref(field)?,
            "environment" => self.environment = value.into_opt_choice(field)?,
            "defect_cause" => self.defect_cause = value.into_opt_choice(field)?,
            _ => return Err(unknown(Self::KIND, field)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Id,
    pub project_id: Id,
    #[serde(default)]
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub status: TestCaseStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "type", default)]
    pub case_type: TestCaseType,
    #[serde(default)]
    pub category_id: Option<Id>,
    #[serde(default)]
    pub requirement_id: Option<Id>,
    #[serde(default)]
    pub sprint_id: Option<Id>,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub precondition: String,
    #[serde(default)]
    pub steps: String,
    #[serde(default)]
    pub expected_result: String,
    /// Defects raised against this case. Maintained by the store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defect_ids: Vec<Id>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl TestCase {
    pub fn new(id: Id, project_id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            number: String::new(),
            name: name.into(),
            status: TestCaseStatus::default(),
            priority: Priority::default(),
            case_type: TestCaseType::default(),
            category_id: None,
            requirement_id: None,
            sprint_id: None,
            module: String::new(),
            precondition: String::new(),
            steps: String::new(),
            expected_result: String::new(),
            defect_ids: Vec::new(),
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

impl Entity for TestCase {
    const KIND: EntityKind = EntityKind::TestCase;

    fn id(&self) -> Id {
        self.id
    }
    fn project_id(&self) -> Id {
        self.project_id
    }
    fn number(&self) -> &str {
        &self.number
    }
    fn title(&self) -> &str {
        &self.name
    }

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        Some(match field {
            "name" => FieldValue::text(&self.name),
            "status" => FieldValue::choice(self.status),
            "priority" => FieldValue::choice(self.priority),
            "type" => FieldValue::choice(self.case_type),
            "category" => FieldValue::reference(self.category_id),
            "requirement" => FieldValue::reference(self.requirement_id),
            "sprint" => FieldValue::reference(self.sprint_id),
            "module" => FieldValue::text(&self.module),
            "precondition" => FieldValue::text(&self.precondition),
            "steps" => FieldValue::text(&self.steps),
            "expected_result" => FieldValue::text(&self.expected_result),
            _ => return None,
        })
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "name" => self.name = value.into_text(field)?,
            "status" => self.status = value.into_choice(field)?,
            "priority" => self.priority = value.into_choice(field)?,
            "type" => self.case_type = value.into_choice(field)?,
            "category" => self.category_id = value.into_ref(field)?,
            "requirement" => self.requirement_id = value.into_ref(field)?,
            "sprint" => self.sprint_id = value.into_ref(field)?,
            "module" => self.module = value.into_text(field)?,
            "precondition" => self.precondition = value.into_text(field)?,
            "steps" => self.steps = value.into_text(field)?,
            "expected_result" => self.expected_result = value.into_text(field)?,
            _ => return Err(unknown(Self::KIND, field)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: Id,
    pub project_id: Id,
    pub name: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub status: SprintStatus,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Sprint {
    pub fn new(id: Id, project_id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            goal: String::new(),
            status: SprintStatus::default(),
            start_date: None,
            end_date: None,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

impl Entity for Sprint {
    const KIND: EntityKind = EntityKind::Sprint;

    fn id(&self) -> Id {
        self.id
    }
    fn project_id(&self) -> Id {
        self.project_id
    }
    fn number(&self) -> &str {
        &self.name
    }
    fn title(&self) -> &str {
        &self.name
    }

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        Some(match field {
            "name" => FieldValue::text(&self.name),
            "goal" => FieldValue::text(&self.goal),
            "status" => FieldValue::choice(self.status),
            "start_date" => FieldValue::date(self.start_date),
            "end_date" => FieldValue::date(self.end_date),
            _ => return None,
        })
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "name" => self.name = value.into_text(field)?,
            "goal" => self.goal = value.into_text(field)?,
            "status" => self.status = value.into_choice(field)?,
            "start_date" => self.start_date = value.into_date(field)?,
            "end_date" => self.end_date = value.into_date(field)?,
            _ => return Err(unknown(Self::KIND, field)),
        }
        Ok(())
    }
}

/// Tagged union of every entity the remote store can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRecord {
    Requirement(Requirement),
    Task(Task),
    Defect(Defect),
    TestCase(TestCase),
    Sprint(Sprint),
}

macro_rules! each_record {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            EntityRecord::Requirement($inner) => $body,
            EntityRecord::Task($inner) => $body,
            EntityRecord::Defect($inner) => $body,
            EntityRecord::TestCase($inner) => $body,
            EntityRecord::Sprint($inner) => $body,
        }
    };
}

macro_rules! record_accessors {
    ($($variant:ident, $as_fn:ident, $into_fn:ident);+ $(;)?) => {
        impl EntityRecord {
            $(
                pub fn $as_fn(&self) -> Option<&$variant> {
                    match self {
                        EntityRecord::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                pub fn $into_fn(self) -> Result<$variant> {
                    match self {
                        EntityRecord::$variant(inner) => Ok(inner),
                        other => Err(DeskError::Other(format!(
                            "expected {} record, got {}",
                            <$variant as Entity>::KIND,
                            other.kind()
                        ))),
                    }
                }
            )+
        }
    };
}

record_accessors! {
    Requirement, as_requirement, into_requirement;
    Task, as_task, into_task;
    Defect, as_defect, into_defect;
    TestCase, as_test_case, into_test_case;
    Sprint, as_sprint, into_sprint;
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Requirement(_) => EntityKind::Requirement,
            EntityRecord::Task(_) => EntityKind::Task,
            EntityRecord::Defect(_) => EntityKind::Defect,
            EntityRecord::TestCase(_) => EntityKind::TestCase,
            EntityRecord::Sprint(_) => EntityKind::Sprint,
        }
    }

    pub fn id(&self) -> Id {
        each_record!(self, e => e.id())
    }

    pub fn project_id(&self) -> Id {
        each_record!(self, e => e.project_id())
    }

    pub fn number(&self) -> &str {
        each_record!(self, e => e.number())
    }

    pub fn title(&self) -> &str {
        each_record!(self, e => e.title())
    }

    pub fn updated_at(&self) -> Timestamp {
        each_record!(self, e => e.updated_at)
    }

    pub fn get_field(&self, field: &str) -> Option<FieldValue> {
        each_record!(self, e => e.get_field(field))
    }

    pub fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        each_record!(self, e => e.set_field(field, value))
    }

    pub fn apply_fields(&mut self, fields: &FieldMap) -> Result<()> {
        each_record!(self, e => e.apply_fields(fields))
    }

    pub fn fields<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<FieldMap> {
        each_record!(self, e => e.fields(names))
    }

    pub(crate) fn set_number(&mut self, number: String) {
        match self {
            EntityRecord::Sprint(_) => {}
            EntityRecord::Requirement(e) => e.number = number,
            EntityRecord::Task(e) => e.number = number,
            EntityRecord::Defect(e) => e.number = number,
            EntityRecord::TestCase(e) => e.number = number,
        }
    }

    pub(crate) fn touch(&mut self, now: Timestamp) {
        each_record!(self, e => e.updated_at = now)
    }

    pub(crate) fn stamp_created(&mut self, now: Timestamp) {
        each_record!(self, e => {
            e.created_at = now;
            e.updated_at = now;
        })
    }
}

/// One recorded change of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: Timestamp,
}

/// A node of the test-case category tree, stored flat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub project_id: Id,
    #[serde(default)]
    pub parent_id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_field_roundtrip() {
        let mut req = Requirement::new(1, 10, "Login page");
        req.set_field("status", FieldValue::choice("approved")).unwrap();
        req.set_field("assignee", FieldValue::reference(Some(3))).unwrap();

        assert_eq!(req.status, RequirementStatus::Approved);
        assert_eq!(req.get_field("assignee"), Some(FieldValue::Ref(Some(3))));
    }

    #[test]
    fn test_set_field_rejects_out_of_vocabulary() {
        let mut task = Task::new(1, 10, "Wire API");
        let err = task
            .set_field("status", FieldValue::choice("resolved"))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn test_set_field_rejects_type_mismatch() {
        let mut defect = Defect::new(1, 10, "Crash");
        assert!(defect.set_field("severity", FieldValue::text("major")).is_err());
        assert!(defect.set_field("sprint", FieldValue::choice("3")).is_err());
    }

    #[test]
    fn test_unknown_field() {
        let mut defect = Defect::new(1, 10, "Crash");
        assert!(defect.get_field("steps").is_none());
        let err = defect.set_field("steps", FieldValue::text("x")).unwrap_err();
        assert!(matches!(err, DeskError::UnknownField { .. }));
    }

    #[test]
    fn test_optional_choice_can_be_cleared() {
        let mut defect = Defect::new(1, 10, "Crash");
        defect
            .set_field("environment", FieldValue::choice("staging"))
            .unwrap();
        assert_eq!(defect.environment, Some(Environment::Staging));

        defect
            .set_field("environment", FieldValue::Choice(None))
            .unwrap();
        assert_eq!(defect.environment, None);
    }

    #[test]
    fn test_record_accessors() {
        let record = EntityRecord::Task(Task::new(4, 10, "Wire API"));
        assert_eq!(record.kind(), EntityKind::Task);
        assert_eq!(record.id(), 4);
        assert!(record.as_task().is_some());
        assert!(record.as_defect().is_none());
        assert!(record.clone().into_requirement().is_err());
        assert_eq!(record.into_task().unwrap().title, "Wire API");
    }

    #[test]
    fn test_fields_collects_named_values() {
        let tc = TestCase::new(1, 10, "Login works");
        let fields = tc.fields(["name", "status"]).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("status"), Some(&FieldValue::choice("not_executed")));
        assert!(tc.fields(["severity"]).is_err());
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Ref(None).to_string(), "-");
        assert_eq!(FieldValue::reference(Some(12)).to_string(), "12");
        assert_eq!(FieldValue::choice(Severity::Minor).to_string(), "minor");
    }
}
