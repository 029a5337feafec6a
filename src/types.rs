use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DeskError;

/// Directory (relative to the working directory) holding local configuration.
pub const DESK_DIR: &str = ".sprintdesk";

/// Remote identifier of any entity.
pub type Id = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Requirement,
    Task,
    Defect,
    TestCase,
    Sprint,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Requirement,
        EntityKind::Task,
        EntityKind::Defect,
        EntityKind::TestCase,
        EntityKind::Sprint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Requirement => "requirement",
            EntityKind::Task => "task",
            EntityKind::Defect => "defect",
            EntityKind::TestCase => "test_case",
            EntityKind::Sprint => "sprint",
        }
    }

    /// Prefix used when the store generates display numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            EntityKind::Requirement => "REQ",
            EntityKind::Task => "TASK",
            EntityKind::Defect => "BUG",
            EntityKind::TestCase => "TC",
            EntityKind::Sprint => "SPRINT",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "requirement" | "story" => Ok(EntityKind::Requirement),
            "task" => Ok(EntityKind::Task),
            "defect" | "bug" => Ok(EntityKind::Defect),
            "test_case" | "testcase" | "test-case" => Ok(EntityKind::TestCase),
            "sprint" => Ok(EntityKind::Sprint),
            _ => Err(DeskError::InvalidKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    #[default]
    Draft,
    Approved,
    InProgress,
    Completed,
    Cancelled,
}

vocabulary!(RequirementStatus, "status", {
    Draft => "draft",
    Approved => "approved",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

vocabulary!(TaskStatus, "status", {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefectStatus {
    #[default]
    New,
    Confirmed,
    InProgress,
    Resolved,
    Closed,
    Reopened,
}

vocabulary!(DefectStatus, "status", {
    New => "new",
    Confirmed => "confirmed",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
    Reopened => "reopened",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseStatus {
    Passed,
    Failed,
    #[default]
    NotExecuted,
}

vocabulary!(TestCaseStatus, "status", {
    Passed => "passed",
    Failed => "failed",
    NotExecuted => "not_executed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    #[default]
    Planning,
    #[serde(alias = "in_progress")]
    Active,
    Completed,
}

impl SprintStatus {
    pub const VALUES: &'static [&'static str] = &["planning", "active", "completed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SprintStatus::Planning => "planning",
            SprintStatus::Active => "active",
            SprintStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SprintStatus {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planning" => Ok(SprintStatus::Planning),
            "active" | "in_progress" => Ok(SprintStatus::Active),
            "completed" => Ok(SprintStatus::Completed),
            _ => Err(DeskError::InvalidValue {
                field: "status".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Priority shared by requirements, tasks and test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

vocabulary!(Priority, "priority", {
    High => "high",
    Medium => "medium",
    Low => "low",
});

/// Defects carry one extra, more urgent, level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefectPriority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

vocabulary!(DefectPriority, "priority", {
    Critical => "critical",
    High => "high",
    Medium => "medium",
    Low => "low",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocker,
    Critical,
    #[default]
    Major,
    Minor,
    Trivial,
}

vocabulary!(Severity, "severity", {
    Blocker => "blocker",
    Critical => "critical",
    Major => "major",
    Minor => "minor",
    Trivial => "trivial",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testing,
    Staging,
    Production,
}

vocabulary!(Environment, "environment", {
    Development => "development",
    Testing => "testing",
    Staging => "staging",
    Production => "production",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectCause {
    CodeError,
    DesignDefect,
    RequirementIssue,
    ConfigError,
    Environment,
    ThirdParty,
    Other,
}

vocabulary!(DefectCause, "defect_cause", {
    CodeError => "code_error",
    DesignDefect => "design_defect",
    RequirementIssue => "requirement_issue",
    ConfigError => "config_error",
    Environment => "environment",
    ThirdParty => "third_party",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseType {
    #[default]
    Functional,
    Performance,
    Security,
    Compatibility,
    Smoke,
    Regression,
}

vocabulary!(TestCaseType, "type", {
    Functional => "functional",
    Performance => "performance",
    Security => "security",
    Compatibility => "compatibility",
    Smoke => "smoke",
    Regression => "regression",
});
