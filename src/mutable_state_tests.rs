use crate::config::EngineConfig;
use crate::persistence::StickyExecutionAttributes;
use crate::*;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

fn new_state() -> MutableStateBuilder {
    MutableStateBuilder::new(Arc::new(EngineConfig::default()))
}

fn execution() -> WorkflowExecution {
    WorkflowExecution {
        workflow_id: "wf-1".to_string(),
        run_id: "run-1".to_string(),
    }
}

fn start_request() -> StartWorkflowExecutionRequest {
    StartWorkflowExecutionRequest {
        request_id: "create-req-1".to_string(),
        domain: "dom".to_string(),
        workflow_id: "wf-1".to_string(),
        workflow_type_name: "OrderWorkflow".to_string(),
        task_list: "tl-1".to_string(),
        input: "{}".to_string(),
        execution_start_to_close_timeout_seconds: 60,
        task_start_to_close_timeout_seconds: 10,
        identity: "starter".to_string(),
        parent_execution: None,
    }
}

fn poll_decision() -> PollForDecisionTaskRequest {
    PollForDecisionTaskRequest {
        task_list: "tl-1".to_string(),
        identity: "worker-1".to_string(),
    }
}

fn schedule_activity(activity_id: &str) -> ScheduleActivityTaskAttributes {
    ScheduleActivityTaskAttributes {
        activity_id: Some(activity_id.to_string()),
        activity_type_name: "ChargeCard".to_string(),
        task_list: "tl-1".to_string(),
        input: "{}".to_string(),
        schedule_to_close_timeout_seconds: None,
        schedule_to_start_timeout_seconds: None,
        start_to_close_timeout_seconds: None,
        heartbeat_timeout_seconds: None,
    }
}

fn started_state() -> MutableStateBuilder {
    let mut state = new_state();
    state
        .add_workflow_execution_started_event("domain-1", &execution(), &start_request())
        .expect("start event");
    state
}

#[test]
fn fresh_start_then_decision_assigns_contiguous_ids() {
    let mut state = new_state();

    let started = state
        .add_workflow_execution_started_event("domain-1", &execution(), &start_request())
        .expect("start event");
    assert_eq!(started.event_id, 1);
    assert_eq!(state.get_next_event_id(), 2);
    assert_eq!(state.execution_info().state, WorkflowState::Created);

    let di = state.add_decision_task_scheduled_event().expect("decision scheduled");
    assert_eq!(di.schedule_id, 2);
    assert_eq!(di.attempt, 0);
    assert_eq!(state.get_next_event_id(), 3);
    assert_eq!(state.execution_info().decision_schedule_id, 2);

    let (event, di) = state.add_decision_task_started_event(2, "r", &poll_decision());
    let event = event.expect("started event");
    let di = di.expect("started decision info");
    assert_eq!(event.event_id, 3);
    assert_eq!(di.started_id, 3);
    assert_eq!(state.execution_info().state, WorkflowState::Running);
    assert_eq!(state.execution_info().decision_started_id, 3);
}

#[test]
fn start_event_rejected_when_history_not_empty() {
    let mut state = started_state();
    assert!(state
        .add_workflow_execution_started_event("domain-1", &execution(), &start_request())
        .is_none());
}

#[test]
fn second_decision_schedule_is_refused() {
    let mut state = started_state();
    state.add_decision_task_scheduled_event().expect("first");
    assert!(state.add_decision_task_scheduled_event().is_none());
}

#[test]
fn events_during_in_flight_decision_are_buffered() {
    let mut state = started_state();
    state.add_decision_task_scheduled_event().unwrap();
    state.add_decision_task_started_event(2, "r", &poll_decision());

    let next_before = state.get_next_event_id();
    let (event, ai) = state
        .add_activity_task_scheduled_event(next_before, &schedule_activity("a"))
        .expect("activity scheduled");
    assert!(event.is_buffered());
    assert_eq!(ai.schedule_id, BUFFERED_EVENT_ID);
    // buffered events consume no event ID
    assert_eq!(state.get_next_event_id(), next_before);
    assert!(state.has_buffered_events());
}

#[test]
fn terminal_events_are_never_buffered() {
    let mut state = started_state();
    state.add_decision_task_scheduled_event().unwrap();
    state.add_decision_task_started_event(2, "r", &poll_decision());

    let attrs = CompleteWorkflowExecutionAttributes {
        result: "done".to_string(),
    };
    let event = state.add_completed_workflow_event(4, &attrs).expect("completed");
    assert_eq!(event.event_id, 4);
    assert_eq!(state.execution_info().close_status, WorkflowCloseStatus::Completed);
}

#[test]
fn activity_indexes_stay_consistent() {
    let mut state = started_state();
    let (_, a) = state.add_activity_task_scheduled_event(1, &schedule_activity("a")).unwrap();
    let (_, b) = state.add_activity_task_scheduled_event(1, &schedule_activity("b")).unwrap();

    let schedule_id = state.get_schedule_id_by_activity_id("a").expect("index entry");
    assert_eq!(schedule_id, a.schedule_id);
    assert_eq!(
        state.get_activity_by_activity_id("a").map(|ai| ai.schedule_id),
        state.get_activity_info(schedule_id).map(|ai| ai.schedule_id)
    );

    let poll = PollForActivityTaskRequest {
        task_list: "tl-1".to_string(),
        identity: "w".to_string(),
    };
    let started = state
        .add_activity_task_started_event(a.schedule_id, "req-1", &poll)
        .unwrap();
    let completed = state.add_activity_task_completed_event(
        a.schedule_id,
        started.event_id,
        &RespondActivityTaskCompletedRequest {
            result: "ok".to_string(),
            identity: "w".to_string(),
        },
    );
    assert!(completed.is_some());

    // both indexes dropped the completed activity, the other one remains
    assert!(state.get_activity_info(a.schedule_id).is_none());
    assert!(state.get_schedule_id_by_activity_id("a").is_none());
    assert!(state.get_activity_by_activity_id("b").is_some());
    assert_eq!(state.get_schedule_id_by_activity_id("b"), Some(b.schedule_id));
}

#[test]
fn duplicate_activity_id_is_rejected() {
    let mut state = started_state();
    state.add_activity_task_scheduled_event(1, &schedule_activity("a")).unwrap();
    assert!(state.add_activity_task_scheduled_event(1, &schedule_activity("a")).is_none());
}

#[test]
fn missing_activity_id_is_rejected() {
    let mut state = started_state();
    let mut attrs = schedule_activity("a");
    attrs.activity_id = None;
    assert!(state.add_activity_task_scheduled_event(1, &attrs).is_none());
}

#[test]
fn activity_timeouts_default_from_config() {
    let mut state = started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &schedule_activity("a")).unwrap();
    let config = EngineConfig::default();
    assert_eq!(
        ai.schedule_to_start_timeout_seconds,
        config.default_schedule_to_start_activity_timeout_seconds
    );
    assert_eq!(
        ai.schedule_to_close_timeout_seconds,
        config.default_schedule_to_close_activity_timeout_seconds
    );
    assert_eq!(
        ai.start_to_close_timeout_seconds,
        config.default_start_to_close_activity_timeout_seconds
    );
    assert_eq!(
        ai.heartbeat_timeout_seconds,
        config.default_heartbeat_activity_timeout_seconds
    );

    // explicit non-positive values fall back as well
    let mut attrs = schedule_activity("b");
    attrs.schedule_to_start_timeout_seconds = Some(0);
    attrs.start_to_close_timeout_seconds = Some(-1);
    attrs.heartbeat_timeout_seconds = Some(7);
    let (_, bi) = state.add_activity_task_scheduled_event(1, &attrs).unwrap();
    assert_eq!(
        bi.schedule_to_start_timeout_seconds,
        config.default_schedule_to_start_activity_timeout_seconds
    );
    assert_eq!(
        bi.start_to_close_timeout_seconds,
        config.default_start_to_close_activity_timeout_seconds
    );
    assert_eq!(bi.heartbeat_timeout_seconds, 7);
}

#[test]
fn cancel_request_is_idempotent() {
    let mut state = started_state();
    let request = RequestCancelWorkflowExecutionRequest {
        cancel_request_id: Some("c1".to_string()),
        identity: "admin".to_string(),
    };

    let first = state.add_workflow_execution_cancel_requested_event("operator", &request);
    assert!(first.is_some());
    assert!(state.execution_info().cancel_requested);
    assert_eq!(state.execution_info().cancel_request_id, "c1");
    assert_eq!(state.is_cancel_requested(), Some("c1"));

    let second = state.add_workflow_execution_cancel_requested_event("operator", &request);
    assert!(second.is_none());
    assert_eq!(state.execution_info().cancel_request_id, "c1");
}

#[test]
fn terminal_operations_rejected_after_close() {
    let mut state = started_state();
    state
        .add_completed_workflow_event(
            1,
            &CompleteWorkflowExecutionAttributes {
                result: "done".to_string(),
            },
        )
        .unwrap();

    assert!(state
        .add_fail_workflow_event(
            1,
            &FailWorkflowExecutionAttributes {
                reason: "late".to_string(),
                details: String::new(),
            },
        )
        .is_none());
    assert!(state.add_timeout_workflow_event().is_none());
    assert!(state
        .add_workflow_execution_terminated_event(&TerminateWorkflowExecutionRequest {
            reason: "late".to_string(),
            details: String::new(),
            identity: "admin".to_string(),
        })
        .is_none());

    assert_eq!(state.execution_info().state, WorkflowState::Completed);
    assert_eq!(state.execution_info().close_status, WorkflowCloseStatus::Completed);
    assert!(!state.is_workflow_execution_running());
}

#[test]
fn schedule_to_start_timeout_clears_stickiness() {
    let mut state = started_state();
    state.execution_info_mut().sticky = Some(StickyExecutionAttributes {
        task_list: "sticky-tl".to_string(),
        schedule_to_start_timeout_seconds: 5,
        client_library_version: "1.2.0".to_string(),
        client_feature_version: "1.0.0".to_string(),
        client_impl: "uber-go".to_string(),
    });
    assert!(state.is_sticky_task_list_enabled());

    let di = state.add_decision_task_scheduled_event().expect("scheduled");
    assert_eq!(di.task_list, "sticky-tl");

    let event = state
        .add_decision_task_schedule_to_start_timed_out_event(di.schedule_id)
        .expect("timed out");
    match event.attributes {
        EventAttributes::DecisionTaskTimedOut { timeout_type, .. } => {
            assert_eq!(timeout_type, TimeoutType::ScheduleToStart)
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(!state.is_sticky_task_list_enabled());
    assert!(!state.has_pending_decision_task());
}

#[test]
fn signal_request_ids_deduplicate() {
    let mut state = started_state();
    assert!(!state.is_signal_requested("sig-1"));
    state.add_signal_requested("sig-1");
    assert!(state.is_signal_requested("sig-1"));
    state.delete_signal_requested("sig-1");
    assert!(!state.is_signal_requested("sig-1"));
}

#[test]
fn completion_event_retained_only_for_child_runs() {
    let mut state = started_state();
    state
        .add_completed_workflow_event(
            1,
            &CompleteWorkflowExecutionAttributes {
                result: "done".to_string(),
            },
        )
        .unwrap();
    assert!(state.get_completion_event().is_none());

    let mut child = new_state();
    let mut request = start_request();
    request.parent_execution = Some(ParentExecutionInfo {
        domain_id: "parent-dom".to_string(),
        workflow_id: "parent-wf".to_string(),
        run_id: "parent-run".to_string(),
        initiated_id: 7,
    });
    child
        .add_workflow_execution_started_event("domain-1", &execution(), &request)
        .unwrap();
    let completed = child
        .add_completed_workflow_event(
            1,
            &CompleteWorkflowExecutionAttributes {
                result: "done".to_string(),
            },
        )
        .unwrap();

    let retained = child.get_completion_event().expect("completion retained for child");
    assert_eq!(retained, completed);
}

#[test]
fn last_updated_timestamp_corrects_clock_skew() {
    let mut state = started_state();
    let start = UNIX_EPOCH + Duration::from_secs(100);
    state.execution_info_mut().start_timestamp = start;
    state.execution_info_mut().last_updated_timestamp = UNIX_EPOCH + Duration::from_secs(50);

    let corrected = state.get_last_updated_timestamp();
    assert_eq!(corrected, 100_000_000_000 + 1);

    state.execution_info_mut().last_updated_timestamp = UNIX_EPOCH + Duration::from_secs(200);
    assert_eq!(state.get_last_updated_timestamp(), 200_000_000_000);
}

#[test]
fn timer_lifecycle_start_fire_cancel() {
    let mut state = started_state();
    let attrs = StartTimerAttributes {
        timer_id: "t1".to_string(),
        start_to_fire_timeout_seconds: 30,
    };
    let (event, ti) = state.add_timer_started_event(1, &attrs).expect("timer started");
    assert_eq!(ti.started_id, event.event_id);
    assert!(state.get_user_timer("t1").is_some());

    // a second start of the same timer ID is refused
    assert!(state.add_timer_started_event(1, &attrs).is_none());

    let fired = state.add_timer_fired_event(ti.started_id, "t1").expect("fired");
    match fired.attributes {
        EventAttributes::TimerFired { ref timer_id, started_event_id } => {
            assert_eq!(timer_id, "t1");
            assert_eq!(started_event_id, ti.started_id);
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_user_timer("t1").is_none());
    assert!(state.add_timer_fired_event(ti.started_id, "t1").is_none());

    // canceling an unknown timer records a no-op failure event
    let cancel_attrs = CancelTimerAttributes {
        timer_id: "missing".to_string(),
    };
    let failed = state.add_cancel_timer_failed_event(1, &cancel_attrs, "worker-1");
    match failed.attributes {
        EventAttributes::CancelTimerFailed { ref cause, .. } => assert_eq!(cause, "TIMER_ID_UNKNOWN"),
        other => panic!("unexpected attributes: {other:?}"),
    }
}

#[test]
fn activity_cancel_request_flow() {
    let mut state = started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &schedule_activity("a")).unwrap();
    let poll = PollForActivityTaskRequest {
        task_list: "tl-1".to_string(),
        identity: "w".to_string(),
    };
    let started = state.add_activity_task_started_event(ai.schedule_id, "req-1", &poll).unwrap();

    let (event, updated) = state
        .add_activity_task_cancel_requested_event(1, "a")
        .expect("cancel requested");
    assert!(updated.cancel_requested);
    assert_eq!(updated.cancel_request_id, event.event_id);

    // a duplicate cancel request still records the event but reports failure
    assert!(state.add_activity_task_cancel_requested_event(1, "a").is_none());

    let canceled = state
        .add_activity_task_canceled_event(ai.schedule_id, started.event_id, event.event_id, "bye", "w")
        .expect("canceled");
    match canceled.attributes {
        EventAttributes::ActivityTaskCanceled {
            latest_cancel_requested_event_id,
            ..
        } => assert_eq!(latest_cancel_requested_event_id, event.event_id),
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_activity_info(ai.schedule_id).is_none());
}

#[test]
fn activity_cancel_without_request_is_rejected() {
    let mut state = started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &schedule_activity("a")).unwrap();
    let poll = PollForActivityTaskRequest {
        task_list: "tl-1".to_string(),
        identity: "w".to_string(),
    };
    let started = state.add_activity_task_started_event(ai.schedule_id, "req-1", &poll).unwrap();

    assert!(state
        .add_activity_task_canceled_event(ai.schedule_id, started.event_id, 99, "bye", "w")
        .is_none());
    assert!(state.get_activity_info(ai.schedule_id).is_some());
}

#[test]
fn heartbeat_updates_activity_progress() {
    let mut state = started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &schedule_activity("a")).unwrap();

    state
        .update_activity_progress(ai.schedule_id, "halfway")
        .expect("progress recorded");
    let refreshed = state.get_activity_info(ai.schedule_id).unwrap();
    assert_eq!(refreshed.details, "halfway");
    assert!(refreshed.last_heartbeat_updated_time > UNIX_EPOCH);

    assert!(state.update_activity_progress(999, "nope").is_err());
}
