//! Mock data builders for creating test entities and boards.
//!
//! These build records in memory so tests never need a board file.

use std::sync::Arc;

use sprintdesk::entity::{Defect, EntityRecord, Requirement, Sprint, Task, TestCase};
use sprintdesk::mutation::MutationClient;
use sprintdesk::session::{SessionHandle, User};
use sprintdesk::store::{Board, InMemoryStore, InvalidationBus};
use sprintdesk::types::{Id, Priority, RequirementStatus};

pub const PROJECT: Id = 10;
pub const SPRINT: Id = 100;

/// Builder for creating test requirements
pub struct RequirementBuilder {
    requirement: Requirement,
}

impl RequirementBuilder {
    pub fn new(id: Id) -> Self {
        Self {
            requirement: Requirement::new(id, PROJECT, format!("Requirement {id}")),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.requirement.title = title.to_string();
        self
    }

    pub fn status(mut self, status: RequirementStatus) -> Self {
        self.requirement.status = status;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.requirement.priority = priority;
        self
    }

    pub fn sprint(mut self, sprint_id: Id) -> Self {
        self.requirement.sprint_id = Some(sprint_id);
        self
    }

    pub fn build(self) -> Requirement {
        self.requirement
    }
}

/// Builder for creating test tasks
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: Id) -> Self {
        Self {
            task: Task::new(id, PROJECT, format!("Task {id}")),
        }
    }

    pub fn requirement(mut self, requirement_id: Id) -> Self {
        self.task.requirement_id = Some(requirement_id);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for creating test defects
pub struct DefectBuilder {
    defect: Defect,
}

impl DefectBuilder {
    pub fn new(id: Id) -> Self {
        Self {
            defect: Defect::new(id, PROJECT, format!("Defect {id}")),
        }
    }

    pub fn requirement(mut self, requirement_id: Id) -> Self {
        self.defect.requirement_id = Some(requirement_id);
        self
    }

    pub fn task(mut self, task_id: Id) -> Self {
        self.defect.task_id = Some(task_id);
        self
    }

    pub fn test_case(mut self, test_case_id: Id) -> Self {
        self.defect.test_case_id = Some(test_case_id);
        self
    }

    pub fn build(self) -> Defect {
        self.defect
    }
}

pub fn session() -> SessionHandle {
    SessionHandle::signed_in(
        User {
            id: 1,
            name: "alice".to_string(),
        },
        "secret-token",
    )
}

/// A sprint with two planned requirements plus one unplanned:
///
/// ```text
/// REQ 1 (sprint) ── task 10 ── defect 20
///                ├─ task 11
///                └─ defect 21
/// REQ 2 (sprint) ── defect 22
/// REQ 3
/// ```
pub fn sprint_board() -> Board {
    Board {
        sprints: vec![Sprint::new(SPRINT, PROJECT, "Sprint 1"), Sprint::new(101, PROJECT, "Sprint 2")],
        requirements: vec![
            RequirementBuilder::new(1).title("Login").sprint(SPRINT).build(),
            RequirementBuilder::new(2).title("Signup").sprint(SPRINT).build(),
            RequirementBuilder::new(3).title("Billing").build(),
        ],
        tasks: vec![
            TaskBuilder::new(10).requirement(1).build(),
            TaskBuilder::new(11).requirement(1).build(),
        ],
        defects: vec![
            DefectBuilder::new(20).requirement(1).task(10).build(),
            DefectBuilder::new(21).requirement(1).build(),
            DefectBuilder::new(22).requirement(2).build(),
            DefectBuilder::new(23).test_case(30).build(),
        ],
        test_cases: vec![{
            let mut case = TestCase::new(30, PROJECT, "Login works");
            case.requirement_id = Some(1);
            case
        }],
        categories: Vec::new(),
    }
}

pub fn store_with(board: Board) -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_board(board, session()))
}

pub fn client_for(store: Arc<InMemoryStore>) -> MutationClient {
    MutationClient::new(store, InvalidationBus::new())
}

pub fn requirement_record(id: Id) -> EntityRecord {
    EntityRecord::Requirement(RequirementBuilder::new(id).build())
}
