//! Test data builders for case workflow integration tests

use caseflow_core::{Actor, CaseService, CaseflowConfig, NewCase, StepAssignment};
use uuid::Uuid;

/// One department/officer pair on a test route
#[derive(Debug, Clone, Copy)]
pub struct Assignee {
    pub department_id: Uuid,
    pub officer_id: Uuid,
}

impl Assignee {
    pub fn new() -> Self {
        Self {
            department_id: Uuid::new_v4(),
            officer_id: Uuid::new_v4(),
        }
    }

    /// Same officer, different department
    pub fn with_officer(officer_id: Uuid) -> Self {
        Self {
            department_id: Uuid::new_v4(),
            officer_id,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::officer(self.officer_id)
    }

    pub fn assignment(&self) -> StepAssignment {
        StepAssignment::new(self.department_id, self.officer_id)
    }
}

/// Builder pattern for creating test case requests
pub struct CaseRequestBuilder {
    title: String,
    description: String,
    route: Option<Vec<Assignee>>,
}

impl CaseRequestBuilder {
    pub fn new() -> Self {
        Self {
            title: "Land transfer".to_string(),
            description: "Transfer of parcel 12".to_string(),
            route: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_route(mut self, route: &[Assignee]) -> Self {
        self.route = Some(route.to_vec());
        self
    }

    pub fn build(self) -> NewCase {
        let request = NewCase::new(self.title, self.description);
        match self.route {
            Some(route) => request.with_steps(route.iter().map(Assignee::assignment).collect()),
            None => request,
        }
    }
}

pub fn in_memory_service() -> CaseService {
    CaseService::in_memory(&CaseflowConfig::default())
}

pub fn clerk() -> Actor {
    Actor::officer(Uuid::new_v4())
}

pub fn admin() -> Actor {
    Actor::admin(Uuid::new_v4())
}
