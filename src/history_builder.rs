//! History builder: allocates event records and appends them to the current
//! history segment.
//!
//! The builder never assigns event IDs and never looks at pending
//! collections: the mutable-state core decides whether an event gets the next
//! sequential ID or the buffered sentinel and passes the ID in. Builder
//! methods stamp the event type and a wall-clock nanosecond timestamp.

use crate::serializer::{EventBatch, EventSerializer, JsonEventSerializer, SerializedEventBatch};
use crate::{
    now_nanos, CancelExternalWorkflowExecutionFailedCause, ChildWorkflowExecutionFailedCause, DecisionTaskFailedCause,
    EventAttributes, HistoryEvent, PollForActivityTaskRequest, RecordMarkerAttributes,
    RequestCancelExternalWorkflowExecutionAttributes, RequestCancelWorkflowExecutionRequest,
    RespondActivityTaskCompletedRequest, RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest,
    SignalExternalWorkflowExecutionAttributes, SignalExternalWorkflowExecutionFailedCause,
    SignalWorkflowExecutionRequest, StartChildWorkflowExecutionAttributes, StartTimerAttributes,
    StartWorkflowExecutionRequest, TerminateWorkflowExecutionRequest, TimeoutType, WorkflowExecution,
};
use crate::errors::SerializationError;
use std::sync::Arc;

/// Ordered list of events produced in the current update session.
pub struct HistoryBuilder {
    history: Vec<HistoryEvent>,
    serializer: Arc<dyn EventSerializer>,
}

impl std::fmt::Debug for HistoryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryBuilder").field("history", &self.history).finish()
    }
}

impl Default for HistoryBuilder {
    fn default() -> Self {
        Self::new(Arc::new(JsonEventSerializer))
    }
}

impl HistoryBuilder {
    pub fn new(serializer: Arc<dyn EventSerializer>) -> Self {
        Self {
            history: Vec::new(),
            serializer,
        }
    }

    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut Vec<HistoryEvent> {
        &mut self.history
    }

    pub(crate) fn replace_history(&mut self, history: Vec<HistoryEvent>) {
        self.history = history;
    }

    /// Encode a slice of events as one batch.
    pub fn serialize_events(&self, version: i32, events: Vec<HistoryEvent>) -> Result<SerializedEventBatch, SerializationError> {
        self.serializer.serialize_batch(&EventBatch::new(version, events))
    }

    /// Decode a persisted batch back into events.
    pub fn deserialize_events(&self, batch: &SerializedEventBatch) -> Result<EventBatch, SerializationError> {
        self.serializer.deserialize_batch(batch)
    }

    fn append(&mut self, event_id: i64, attributes: EventAttributes) -> HistoryEvent {
        let event = HistoryEvent {
            event_id,
            timestamp: now_nanos(),
            attributes,
        };
        self.history.push(event.clone());
        event
    }

    pub fn add_workflow_execution_started_event(
        &mut self,
        event_id: i64,
        request: &StartWorkflowExecutionRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionStarted {
                workflow_type_name: request.workflow_type_name.clone(),
                task_list: request.task_list.clone(),
                input: request.input.clone(),
                execution_start_to_close_timeout_seconds: request.execution_start_to_close_timeout_seconds,
                task_start_to_close_timeout_seconds: request.task_start_to_close_timeout_seconds,
                identity: request.identity.clone(),
            },
        )
    }

    pub fn add_decision_task_scheduled_event(
        &mut self,
        event_id: i64,
        task_list: &str,
        start_to_close_timeout_seconds: i32,
        attempt: i64,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::DecisionTaskScheduled {
                task_list: task_list.to_string(),
                start_to_close_timeout_seconds,
                attempt,
            },
        )
    }

    pub fn add_decision_task_started_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        request_id: &str,
        identity: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::DecisionTaskStarted {
                scheduled_event_id,
                identity: identity.to_string(),
                request_id: request_id.to_string(),
            },
        )
    }

    pub fn add_decision_task_completed_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        request: &RespondDecisionTaskCompletedRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::DecisionTaskCompleted {
                scheduled_event_id,
                started_event_id,
                identity: request.identity.clone(),
                execution_context: request.execution_context.clone(),
            },
        )
    }

    pub fn add_decision_task_timed_out_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        timeout_type: TimeoutType,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::DecisionTaskTimedOut {
                scheduled_event_id,
                started_event_id,
                timeout_type,
            },
        )
    }

    pub fn add_decision_task_failed_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        cause: DecisionTaskFailedCause,
        details: &str,
        identity: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::DecisionTaskFailed {
                scheduled_event_id,
                started_event_id,
                cause,
                details: details.to_string(),
                identity: identity.to_string(),
            },
        )
    }

    /// Timeouts arrive already resolved against the engine defaults.
    #[allow(clippy::too_many_arguments)]
    pub fn add_activity_task_scheduled_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        activity_id: &str,
        activity_type_name: &str,
        task_list: &str,
        input: &str,
        schedule_to_close_timeout_seconds: i32,
        schedule_to_start_timeout_seconds: i32,
        start_to_close_timeout_seconds: i32,
        heartbeat_timeout_seconds: i32,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskScheduled {
                activity_id: activity_id.to_string(),
                activity_type_name: activity_type_name.to_string(),
                task_list: task_list.to_string(),
                input: input.to_string(),
                schedule_to_close_timeout_seconds,
                schedule_to_start_timeout_seconds,
                start_to_close_timeout_seconds,
                heartbeat_timeout_seconds,
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_activity_task_started_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        request_id: &str,
        request: &PollForActivityTaskRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskStarted {
                scheduled_event_id,
                identity: request.identity.clone(),
                request_id: request_id.to_string(),
            },
        )
    }

    pub fn add_activity_task_completed_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        request: &RespondActivityTaskCompletedRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskCompleted {
                result: request.result.clone(),
                scheduled_event_id,
                started_event_id,
                identity: request.identity.clone(),
            },
        )
    }

    pub fn add_activity_task_failed_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        request: &RespondActivityTaskFailedRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskFailed {
                reason: request.reason.clone(),
                details: request.details.clone(),
                scheduled_event_id,
                started_event_id,
                identity: request.identity.clone(),
            },
        )
    }

    pub fn add_activity_task_timed_out_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        timeout_type: TimeoutType,
        last_heartbeat_details: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskTimedOut {
                details: last_heartbeat_details.to_string(),
                scheduled_event_id,
                started_event_id,
                timeout_type,
            },
        )
    }

    pub fn add_activity_task_cancel_requested_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        activity_id: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskCancelRequested {
                activity_id: activity_id.to_string(),
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_request_cancel_activity_task_failed_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        activity_id: &str,
        cause: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::RequestCancelActivityTaskFailed {
                activity_id: activity_id.to_string(),
                cause: cause.to_string(),
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_activity_task_canceled_event(
        &mut self,
        event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        latest_cancel_requested_event_id: i64,
        details: &str,
        identity: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ActivityTaskCanceled {
                details: details.to_string(),
                latest_cancel_requested_event_id,
                scheduled_event_id,
                started_event_id,
                identity: identity.to_string(),
            },
        )
    }

    pub fn add_timer_started_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        attributes: &StartTimerAttributes,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::TimerStarted {
                timer_id: attributes.timer_id.clone(),
                start_to_fire_timeout_seconds: attributes.start_to_fire_timeout_seconds,
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_timer_fired_event(&mut self, event_id: i64, started_event_id: i64, timer_id: &str) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::TimerFired {
                timer_id: timer_id.to_string(),
                started_event_id,
            },
        )
    }

    pub fn add_timer_canceled_event(
        &mut self,
        event_id: i64,
        started_event_id: i64,
        decision_task_completed_event_id: i64,
        timer_id: &str,
        identity: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::TimerCanceled {
                timer_id: timer_id.to_string(),
                started_event_id,
                decision_task_completed_event_id,
                identity: identity.to_string(),
            },
        )
    }

    pub fn add_cancel_timer_failed_event(
        &mut self,
        event_id: i64,
        timer_id: &str,
        decision_task_completed_event_id: i64,
        cause: &str,
        identity: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::CancelTimerFailed {
                timer_id: timer_id.to_string(),
                cause: cause.to_string(),
                decision_task_completed_event_id,
                identity: identity.to_string(),
            },
        )
    }

    pub fn add_marker_recorded_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        attributes: &RecordMarkerAttributes,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::MarkerRecorded {
                marker_name: attributes.marker_name.clone(),
                details: attributes.details.clone(),
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_completed_workflow_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        result: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionCompleted {
                result: result.to_string(),
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_fail_workflow_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        reason: &str,
        details: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionFailed {
                reason: reason.to_string(),
                details: details.to_string(),
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_timeout_workflow_event(&mut self, event_id: i64) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionTimedOut {
                timeout_type: TimeoutType::StartToClose,
            },
        )
    }

    pub fn add_workflow_execution_canceled_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        details: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionCanceled {
                decision_task_completed_event_id,
                details: details.to_string(),
            },
        )
    }

    pub fn add_workflow_execution_terminated_event(
        &mut self,
        event_id: i64,
        request: &TerminateWorkflowExecutionRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionTerminated {
                reason: request.reason.clone(),
                details: request.details.clone(),
                identity: request.identity.clone(),
            },
        )
    }

    pub fn add_workflow_execution_cancel_requested_event(
        &mut self,
        event_id: i64,
        cause: &str,
        request: &RequestCancelWorkflowExecutionRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionCancelRequested {
                cause: cause.to_string(),
                identity: request.identity.clone(),
                external_initiated_event_id: None,
                external_workflow_execution: None,
            },
        )
    }

    pub fn add_workflow_execution_signaled_event(
        &mut self,
        event_id: i64,
        request: &SignalWorkflowExecutionRequest,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionSignaled {
                signal_name: request.signal_name.clone(),
                input: request.input.clone(),
                identity: request.identity.clone(),
            },
        )
    }

    /// Fields arrive already resolved against the closing execution.
    #[allow(clippy::too_many_arguments)]
    pub fn add_continued_as_new_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        new_execution_run_id: &str,
        workflow_type_name: &str,
        task_list: &str,
        input: &str,
        execution_start_to_close_timeout_seconds: i32,
        task_start_to_close_timeout_seconds: i32,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::WorkflowExecutionContinuedAsNew {
                new_execution_run_id: new_execution_run_id.to_string(),
                workflow_type_name: workflow_type_name.to_string(),
                task_list: task_list.to_string(),
                input: input.to_string(),
                execution_start_to_close_timeout_seconds,
                task_start_to_close_timeout_seconds,
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_request_cancel_external_workflow_execution_initiated_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        attributes: &RequestCancelExternalWorkflowExecutionAttributes,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::RequestCancelExternalWorkflowExecutionInitiated {
                decision_task_completed_event_id,
                domain: attributes.domain.clone(),
                workflow_execution: WorkflowExecution {
                    workflow_id: attributes.workflow_id.clone(),
                    run_id: attributes.run_id.clone(),
                },
                control: attributes.control.clone(),
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_request_cancel_external_workflow_execution_failed_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        initiated_event_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
        cause: CancelExternalWorkflowExecutionFailedCause,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::RequestCancelExternalWorkflowExecutionFailed {
                cause,
                decision_task_completed_event_id,
                domain: domain.to_string(),
                workflow_execution: WorkflowExecution {
                    workflow_id: workflow_id.to_string(),
                    run_id: run_id.to_string(),
                },
                initiated_event_id,
                control: String::new(),
            },
        )
    }

    pub fn add_external_workflow_execution_cancel_requested_event(
        &mut self,
        event_id: i64,
        initiated_event_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ExternalWorkflowExecutionCancelRequested {
                initiated_event_id,
                domain: domain.to_string(),
                workflow_execution: WorkflowExecution {
                    workflow_id: workflow_id.to_string(),
                    run_id: run_id.to_string(),
                },
            },
        )
    }

    pub fn add_signal_external_workflow_execution_initiated_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        attributes: &SignalExternalWorkflowExecutionAttributes,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::SignalExternalWorkflowExecutionInitiated {
                decision_task_completed_event_id,
                domain: attributes.domain.clone(),
                workflow_execution: attributes.execution.clone(),
                signal_name: attributes.signal_name.clone(),
                input: attributes.input.clone(),
                control: attributes.control.clone(),
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_signal_external_workflow_execution_failed_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        initiated_event_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
        control: &str,
        cause: SignalExternalWorkflowExecutionFailedCause,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::SignalExternalWorkflowExecutionFailed {
                cause,
                decision_task_completed_event_id,
                domain: domain.to_string(),
                workflow_execution: WorkflowExecution {
                    workflow_id: workflow_id.to_string(),
                    run_id: run_id.to_string(),
                },
                initiated_event_id,
                control: control.to_string(),
            },
        )
    }

    pub fn add_external_workflow_execution_signaled_event(
        &mut self,
        event_id: i64,
        initiated_event_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
        control: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ExternalWorkflowExecutionSignaled {
                initiated_event_id,
                domain: domain.to_string(),
                workflow_execution: WorkflowExecution {
                    workflow_id: workflow_id.to_string(),
                    run_id: run_id.to_string(),
                },
                control: control.to_string(),
            },
        )
    }

    pub fn add_start_child_workflow_execution_initiated_event(
        &mut self,
        event_id: i64,
        decision_task_completed_event_id: i64,
        attributes: &StartChildWorkflowExecutionAttributes,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::StartChildWorkflowExecutionInitiated {
                domain: attributes.domain.clone(),
                workflow_id: attributes.workflow_id.clone(),
                workflow_type_name: attributes.workflow_type_name.clone(),
                task_list: attributes.task_list.clone(),
                input: attributes.input.clone(),
                execution_start_to_close_timeout_seconds: attributes.execution_start_to_close_timeout_seconds,
                task_start_to_close_timeout_seconds: attributes.task_start_to_close_timeout_seconds,
                control: attributes.control.clone(),
                decision_task_completed_event_id,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_start_child_workflow_execution_failed_event(
        &mut self,
        event_id: i64,
        initiated_event_id: i64,
        cause: ChildWorkflowExecutionFailedCause,
        domain: &str,
        workflow_id: &str,
        workflow_type_name: &str,
        control: &str,
        decision_task_completed_event_id: i64,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::StartChildWorkflowExecutionFailed {
                domain: domain.to_string(),
                workflow_id: workflow_id.to_string(),
                workflow_type_name: workflow_type_name.to_string(),
                cause,
                control: control.to_string(),
                initiated_event_id,
                decision_task_completed_event_id,
            },
        )
    }

    pub fn add_child_workflow_execution_started_event(
        &mut self,
        event_id: i64,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_event_id: i64,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ChildWorkflowExecutionStarted {
                domain: domain.to_string(),
                initiated_event_id,
                workflow_execution: execution.clone(),
                workflow_type_name: workflow_type_name.to_string(),
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_child_workflow_execution_completed_event(
        &mut self,
        event_id: i64,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_event_id: i64,
        started_event_id: i64,
        result: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ChildWorkflowExecutionCompleted {
                result: result.to_string(),
                domain: domain.to_string(),
                workflow_execution: execution.clone(),
                workflow_type_name: workflow_type_name.to_string(),
                initiated_event_id,
                started_event_id,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_child_workflow_execution_failed_event(
        &mut self,
        event_id: i64,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_event_id: i64,
        started_event_id: i64,
        reason: &str,
        details: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ChildWorkflowExecutionFailed {
                reason: reason.to_string(),
                details: details.to_string(),
                domain: domain.to_string(),
                workflow_execution: execution.clone(),
                workflow_type_name: workflow_type_name.to_string(),
                initiated_event_id,
                started_event_id,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_child_workflow_execution_canceled_event(
        &mut self,
        event_id: i64,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_event_id: i64,
        started_event_id: i64,
        details: &str,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ChildWorkflowExecutionCanceled {
                details: details.to_string(),
                domain: domain.to_string(),
                workflow_execution: execution.clone(),
                workflow_type_name: workflow_type_name.to_string(),
                initiated_event_id,
                started_event_id,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_child_workflow_execution_timed_out_event(
        &mut self,
        event_id: i64,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_event_id: i64,
        started_event_id: i64,
        timeout_type: TimeoutType,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ChildWorkflowExecutionTimedOut {
                timeout_type,
                domain: domain.to_string(),
                workflow_execution: execution.clone(),
                workflow_type_name: workflow_type_name.to_string(),
                initiated_event_id,
                started_event_id,
            },
        )
    }

    pub fn add_child_workflow_execution_terminated_event(
        &mut self,
        event_id: i64,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_event_id: i64,
        started_event_id: i64,
    ) -> HistoryEvent {
        self.append(
            event_id,
            EventAttributes::ChildWorkflowExecutionTerminated {
                domain: domain.to_string(),
                workflow_execution: execution.clone(),
                workflow_type_name: workflow_type_name.to_string(),
                initiated_event_id,
                started_event_id,
            },
        )
    }
}

/// Synthesize the scheduled event of a transient decision for dispatch. The
/// event is fabricated with the decision's notional ID and never appended to
/// history.
pub(crate) fn new_decision_task_scheduled_event_with_info(
    event_id: i64,
    timestamp: i64,
    task_list: &str,
    start_to_close_timeout_seconds: i32,
    attempt: i64,
) -> HistoryEvent {
    HistoryEvent {
        event_id,
        timestamp,
        attributes: EventAttributes::DecisionTaskScheduled {
            task_list: task_list.to_string(),
            start_to_close_timeout_seconds,
            attempt,
        },
    }
}

/// Synthesize the started event of a transient decision for dispatch.
pub(crate) fn new_decision_task_started_event_with_info(
    event_id: i64,
    timestamp: i64,
    scheduled_event_id: i64,
    request_id: &str,
    identity: &str,
) -> HistoryEvent {
    HistoryEvent {
        event_id,
        timestamp,
        attributes: EventAttributes::DecisionTaskStarted {
            scheduled_event_id,
            identity: identity.to_string(),
            request_id: request_id.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventType, BUFFERED_EVENT_ID};

    #[test]
    fn append_preserves_order_and_ids() {
        let mut builder = HistoryBuilder::default();
        builder.add_timer_fired_event(7, 3, "t1");
        builder.add_timer_fired_event(BUFFERED_EVENT_ID, 4, "t2");
        let history = builder.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_id, 7);
        assert!(history[1].is_buffered());
        assert_eq!(history[1].event_type(), EventType::TimerFired);
    }

    #[test]
    fn serialize_then_deserialize_history_segment() {
        let mut builder = HistoryBuilder::default();
        builder.add_timer_fired_event(5, 2, "t1");
        let batch = builder
            .serialize_events(crate::serializer::DEFAULT_HISTORY_VERSION, builder.history().to_vec())
            .unwrap();
        let decoded = builder.deserialize_events(&batch).unwrap();
        assert_eq!(decoded.events, builder.history());
    }
}
