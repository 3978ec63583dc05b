#![allow(dead_code)]

use duraflow::*;
use std::sync::Arc;

pub const DOMAIN_ID: &str = "domain-1";
pub const TASK_LIST: &str = "orders-tl";
pub const WORKFLOW_TYPE: &str = "ProcessOrder";

pub fn new_state() -> MutableStateBuilder {
    MutableStateBuilder::new(Arc::new(EngineConfig::default()))
}

pub fn execution(workflow_id: &str, run_id: &str) -> WorkflowExecution {
    WorkflowExecution {
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
    }
}

pub fn start_request() -> StartWorkflowExecutionRequest {
    StartWorkflowExecutionRequest {
        request_id: "create-req-1".to_string(),
        domain: "orders".to_string(),
        workflow_id: "wf-1".to_string(),
        workflow_type_name: WORKFLOW_TYPE.to_string(),
        task_list: TASK_LIST.to_string(),
        input: "{}".to_string(),
        execution_start_to_close_timeout_seconds: 60,
        task_start_to_close_timeout_seconds: 10,
        identity: "client".to_string(),
        parent_execution: None,
    }
}

/// Workflow started; history holds event 1.
pub fn started_state() -> MutableStateBuilder {
    let mut state = new_state();
    state
        .add_workflow_execution_started_event(DOMAIN_ID, &execution("wf-1", "run-1"), &start_request())
        .expect("start event");
    state
}

/// Workflow started with a scheduled and started decision; history holds
/// events 1..=3 and the decision is in flight.
pub fn state_with_in_flight_decision() -> (MutableStateBuilder, DecisionInfo) {
    let mut state = started_state();
    let scheduled = state.add_decision_task_scheduled_event().expect("decision scheduled");
    let (_, di) = state.add_decision_task_started_event(scheduled.schedule_id, "req-d1", &poll_decision());
    let di = di.expect("decision started");
    (state, di)
}

pub fn poll_decision() -> PollForDecisionTaskRequest {
    PollForDecisionTaskRequest {
        task_list: TASK_LIST.to_string(),
        identity: "worker-1".to_string(),
    }
}

pub fn poll_activity() -> PollForActivityTaskRequest {
    PollForActivityTaskRequest {
        task_list: TASK_LIST.to_string(),
        identity: "worker-1".to_string(),
    }
}

pub fn respond_decision() -> RespondDecisionTaskCompletedRequest {
    RespondDecisionTaskCompletedRequest {
        execution_context: String::new(),
        identity: "worker-1".to_string(),
    }
}

pub fn schedule_activity(activity_id: &str) -> ScheduleActivityTaskAttributes {
    ScheduleActivityTaskAttributes {
        activity_id: Some(activity_id.to_string()),
        activity_type_name: "ChargeCard".to_string(),
        task_list: TASK_LIST.to_string(),
        input: "{}".to_string(),
        schedule_to_close_timeout_seconds: Some(30),
        schedule_to_start_timeout_seconds: Some(10),
        start_to_close_timeout_seconds: Some(20),
        heartbeat_timeout_seconds: Some(5),
    }
}

pub fn complete_activity() -> RespondActivityTaskCompletedRequest {
    RespondActivityTaskCompletedRequest {
        result: "ok".to_string(),
        identity: "worker-1".to_string(),
    }
}

pub fn event_ids(history: &[HistoryEvent]) -> Vec<i64> {
    history.iter().map(|event| event.event_id).collect()
}
