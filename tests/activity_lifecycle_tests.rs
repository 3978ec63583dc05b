//! Activity lifecycle: schedule, start, completion-family transitions, and
//! their preconditions.

use duraflow::*;
mod common;

#[test]
fn schedule_start_fail_round() {
    let mut state = common::started_state();
    let (scheduled, ai) = state
        .add_activity_task_scheduled_event(1, &common::schedule_activity("a"))
        .expect("scheduled");
    assert_eq!(ai.schedule_id, scheduled.event_id);
    assert_eq!(ai.started_id, EMPTY_EVENT_ID);
    // explicit timeouts from the decision are kept
    assert_eq!(ai.schedule_to_start_timeout_seconds, 10);
    assert_eq!(ai.heartbeat_timeout_seconds, 5);

    let started = state
        .add_activity_task_started_event(ai.schedule_id, "req-a1", &common::poll_activity())
        .expect("started");
    assert_eq!(
        state.get_activity_info(ai.schedule_id).map(|ai| ai.started_id),
        Some(started.event_id)
    );

    let failed = state
        .add_activity_task_failed_event(
            ai.schedule_id,
            started.event_id,
            &RespondActivityTaskFailedRequest {
                reason: "boom".to_string(),
                details: "stack".to_string(),
                identity: "worker-1".to_string(),
            },
        )
        .expect("failed event");
    match &failed.attributes {
        EventAttributes::ActivityTaskFailed {
            reason,
            scheduled_event_id,
            started_event_id,
            ..
        } => {
            assert_eq!(reason, "boom");
            assert_eq!(*scheduled_event_id, ai.schedule_id);
            assert_eq!(*started_event_id, started.event_id);
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_activity_info(ai.schedule_id).is_none());
}

#[test]
fn start_is_only_permitted_once() {
    let mut state = common::started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &common::schedule_activity("a")).unwrap();
    state
        .add_activity_task_started_event(ai.schedule_id, "req-a1", &common::poll_activity())
        .expect("first start");
    assert!(state
        .add_activity_task_started_event(ai.schedule_id, "req-a2", &common::poll_activity())
        .is_none());
}

#[test]
fn completion_requires_matching_started_id() {
    let mut state = common::started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &common::schedule_activity("a")).unwrap();
    let started = state
        .add_activity_task_started_event(ai.schedule_id, "req-a1", &common::poll_activity())
        .unwrap();

    assert!(state
        .add_activity_task_completed_event(ai.schedule_id, started.event_id + 7, &common::complete_activity())
        .is_none());
    assert!(state.get_activity_info(ai.schedule_id).is_some());

    assert!(state
        .add_activity_task_completed_event(ai.schedule_id, started.event_id, &common::complete_activity())
        .is_some());
}

#[test]
fn schedule_to_start_timeout_allowed_before_start() {
    let mut state = common::started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &common::schedule_activity("a")).unwrap();

    let event = state
        .add_activity_task_timed_out_event(ai.schedule_id, EMPTY_EVENT_ID, TimeoutType::ScheduleToStart, "")
        .expect("schedule-to-start timeout");
    match event.attributes {
        EventAttributes::ActivityTaskTimedOut { timeout_type, .. } => {
            assert_eq!(timeout_type, TimeoutType::ScheduleToStart)
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
    assert!(state.get_activity_info(ai.schedule_id).is_none());
}

#[test]
fn start_to_close_timeout_requires_started_activity() {
    let mut state = common::started_state();
    let (_, ai) = state.add_activity_task_scheduled_event(1, &common::schedule_activity("a")).unwrap();

    // not started yet: start-to-close and heartbeat timeouts are invalid
    assert!(state
        .add_activity_task_timed_out_event(ai.schedule_id, EMPTY_EVENT_ID, TimeoutType::StartToClose, "")
        .is_none());
    assert!(state
        .add_activity_task_timed_out_event(ai.schedule_id, EMPTY_EVENT_ID, TimeoutType::Heartbeat, "")
        .is_none());
    assert!(state.get_activity_info(ai.schedule_id).is_some());

    let started = state
        .add_activity_task_started_event(ai.schedule_id, "req-a1", &common::poll_activity())
        .unwrap();
    let event = state
        .add_activity_task_timed_out_event(ai.schedule_id, started.event_id, TimeoutType::StartToClose, "beat")
        .expect("start-to-close timeout");
    match &event.attributes {
        EventAttributes::ActivityTaskTimedOut { details, .. } => assert_eq!(details, "beat"),
        other => panic!("unexpected attributes: {other:?}"),
    }
}

#[test]
fn request_cancel_failure_and_marker_are_plain_events() {
    let mut state = common::started_state();

    let failed = state.add_request_cancel_activity_task_failed_event(1, "ghost", "ACTIVITY_ID_UNKNOWN");
    match &failed.attributes {
        EventAttributes::RequestCancelActivityTaskFailed { activity_id, cause, .. } => {
            assert_eq!(activity_id, "ghost");
            assert_eq!(cause, "ACTIVITY_ID_UNKNOWN");
        }
        other => panic!("unexpected attributes: {other:?}"),
    }

    let marker = state.add_record_marker_event(
        1,
        &RecordMarkerAttributes {
            marker_name: "side-effect".to_string(),
            details: "42".to_string(),
        },
    );
    assert_eq!(marker.event_type(), EventType::MarkerRecorded);

    let updates = state.close_update_session().unwrap();
    assert_eq!(updates.new_events_builder.history().len(), 3);
}

#[test]
fn scheduled_event_is_retained_for_dispatch() {
    let mut state = common::started_state();
    let (scheduled, ai) = state.add_activity_task_scheduled_event(1, &common::schedule_activity("a")).unwrap();

    let replayed = state
        .get_activity_scheduled_event(ai.schedule_id)
        .expect("stored scheduled event");
    assert_eq!(replayed, scheduled);
}
