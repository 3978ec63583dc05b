//! Child workflow lifecycle: initiate, started, and the completion family
//! that resolves domain and workflow type from the stored started event.

use duraflow::*;
mod common;

fn child_attributes() -> StartChildWorkflowExecutionAttributes {
    StartChildWorkflowExecutionAttributes {
        domain: "child-dom".to_string(),
        workflow_id: "child-wf".to_string(),
        workflow_type_name: "ShipOrder".to_string(),
        task_list: "shipping-tl".to_string(),
        input: "{}".to_string(),
        execution_start_to_close_timeout_seconds: 30,
        task_start_to_close_timeout_seconds: 10,
        control: "ctl".to_string(),
    }
}

fn initiated_child(state: &mut MutableStateBuilder) -> ChildExecutionInfo {
    let (event, ci) = state
        .add_start_child_workflow_execution_initiated_event(1, "child-create-req", &child_attributes())
        .expect("initiated");
    assert_eq!(ci.initiated_id, event.event_id);
    assert_eq!(ci.started_id, EMPTY_EVENT_ID);
    ci
}

#[test]
fn initiated_event_is_retained_and_replayable() {
    let mut state = common::started_state();
    let ci = initiated_child(&mut state);

    let replayed = state
        .get_child_execution_initiated_event(ci.initiated_id)
        .expect("initiated event stored");
    match &replayed.attributes {
        EventAttributes::StartChildWorkflowExecutionInitiated {
            workflow_id,
            workflow_type_name,
            ..
        } => {
            assert_eq!(workflow_id, "child-wf");
            assert_eq!(workflow_type_name, "ShipOrder");
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_child_execution_started_event(ci.initiated_id).is_none());
}

#[test]
fn started_then_completed_resolves_stored_context() {
    let mut state = common::started_state();
    let ci = initiated_child(&mut state);
    let child_execution = common::execution("child-wf", "child-run");

    let started = state
        .add_child_workflow_execution_started_event("child-dom", &child_execution, "ShipOrder", ci.initiated_id)
        .expect("child started");
    assert_eq!(
        state.get_child_execution_info(ci.initiated_id).map(|ci| ci.started_id),
        Some(started.event_id)
    );
    assert!(state.get_child_execution_started_event(ci.initiated_id).is_some());

    let completed = state
        .add_child_workflow_execution_completed_event(ci.initiated_id, &child_execution, "shipped")
        .expect("child completed");
    match &completed.attributes {
        EventAttributes::ChildWorkflowExecutionCompleted {
            result,
            domain,
            workflow_type_name,
            initiated_event_id,
            started_event_id,
            ..
        } => {
            assert_eq!(result, "shipped");
            // domain and workflow type come from the stored started event
            assert_eq!(domain, "child-dom");
            assert_eq!(workflow_type_name, "ShipOrder");
            assert_eq!(*initiated_event_id, ci.initiated_id);
            assert_eq!(*started_event_id, started.event_id);
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_child_execution_info(ci.initiated_id).is_none());

    let updates = state.close_update_session().unwrap();
    assert_eq!(updates.delete_child_execution_info, Some(ci.initiated_id));
}

#[test]
fn start_failed_requires_unstarted_child_and_deletes() {
    let mut state = common::started_state();
    let ci = initiated_child(&mut state);

    let failed = state
        .add_start_child_workflow_execution_failed_event(
            ci.initiated_id,
            ChildWorkflowExecutionFailedCause::WorkflowAlreadyRunning,
            4,
        )
        .expect("start failed");
    match &failed.attributes {
        EventAttributes::StartChildWorkflowExecutionFailed {
            workflow_id,
            workflow_type_name,
            control,
            ..
        } => {
            assert_eq!(workflow_id, "child-wf");
            assert_eq!(workflow_type_name, "ShipOrder");
            assert_eq!(control, "ctl");
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_child_execution_info(ci.initiated_id).is_none());

    // once started, the start-failed transition is invalid
    let ci = initiated_child(&mut state);
    state
        .add_child_workflow_execution_started_event(
            "child-dom",
            &common::execution("child-wf", "child-run"),
            "ShipOrder",
            ci.initiated_id,
        )
        .unwrap();
    assert!(state
        .add_start_child_workflow_execution_failed_event(
            ci.initiated_id,
            ChildWorkflowExecutionFailedCause::WorkflowAlreadyRunning,
            4,
        )
        .is_none());
}

#[test]
fn completion_family_requires_started_child() {
    let mut state = common::started_state();
    let ci = initiated_child(&mut state);
    let child_execution = common::execution("child-wf", "child-run");

    assert!(state
        .add_child_workflow_execution_completed_event(ci.initiated_id, &child_execution, "early")
        .is_none());
    assert!(state
        .add_child_workflow_execution_terminated_event(ci.initiated_id, &child_execution)
        .is_none());
    assert!(state.get_child_execution_info(ci.initiated_id).is_some());
}

#[test]
fn second_started_event_is_rejected() {
    let mut state = common::started_state();
    let ci = initiated_child(&mut state);
    let child_execution = common::execution("child-wf", "child-run");

    state
        .add_child_workflow_execution_started_event("child-dom", &child_execution, "ShipOrder", ci.initiated_id)
        .expect("first started");
    assert!(state
        .add_child_workflow_execution_started_event("child-dom", &child_execution, "ShipOrder", ci.initiated_id)
        .is_none());
}

#[test]
fn failed_and_timed_out_children_close_out() {
    let mut state = common::started_state();
    let child_execution = common::execution("child-wf", "child-run");

    let ci = initiated_child(&mut state);
    state
        .add_child_workflow_execution_started_event("child-dom", &child_execution, "ShipOrder", ci.initiated_id)
        .unwrap();
    let failed = state
        .add_child_workflow_execution_failed_event(ci.initiated_id, &child_execution, "boom", "stack")
        .expect("child failed");
    assert_eq!(failed.event_type(), EventType::ChildWorkflowExecutionFailed);
    assert!(state.get_child_execution_info(ci.initiated_id).is_none());

    let mut attributes = child_attributes();
    attributes.workflow_id = "child-wf-2".to_string();
    let (event, ci) = state
        .add_start_child_workflow_execution_initiated_event(1, "child-create-req-2", &attributes)
        .unwrap();
    state
        .add_child_workflow_execution_started_event(
            "child-dom",
            &common::execution("child-wf-2", "child-run-2"),
            "ShipOrder",
            event.event_id,
        )
        .unwrap();
    let timed_out = state
        .add_child_workflow_execution_timed_out_event(
            ci.initiated_id,
            &common::execution("child-wf-2", "child-run-2"),
            TimeoutType::StartToClose,
        )
        .expect("child timed out");
    assert_eq!(timed_out.event_type(), EventType::ChildWorkflowExecutionTimedOut);
}
