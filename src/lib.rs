//! # Duraflow: mutable-state engine for durable workflow orchestration
//!
//! This crate is the in-memory authoritative representation of a single
//! workflow execution inside a durable orchestration service. It ingests
//! decisions, emits a totally-ordered history of events, tracks the lifecycle
//! of every outstanding activity, timer, child workflow, cancellation and
//! signal, and stages a coherent write-set for the persistence layer at the
//! end of each update session.
//!
//! ## Key Concepts
//!
//! - **History**: an append-only, totally-ordered sequence of [`HistoryEvent`]
//!   records. Event IDs are contiguous and strictly increasing per execution,
//!   starting at [`FIRST_EVENT_ID`].
//! - **Decision task**: the unit of work dispatched to a workflow worker to
//!   advance the workflow. At most one decision is ever in flight.
//! - **Buffered event**: an event produced while a decision is in flight.
//!   Buffered events carry the [`BUFFERED_EVENT_ID`] sentinel and are only
//!   numbered when the decision closes.
//! - **Transient decision**: a re-scheduled decision after a prior failure.
//!   Its scheduled/started events are not written to history unless new
//!   events intervene or the decision completes.
//! - **Update session**: a span of operations against the mutable state,
//!   closed by [`MutableStateBuilder::close_update_session`] which returns the
//!   diff the persistence layer commits atomically.
//!
//! ## Usage
//!
//! ```rust
//! use duraflow::{EngineConfig, MutableStateBuilder, StartWorkflowExecutionRequest, WorkflowExecution};
//! use std::sync::Arc;
//!
//! let mut state = MutableStateBuilder::new(Arc::new(EngineConfig::default()));
//! let execution = WorkflowExecution {
//!     workflow_id: "order-workflow".to_string(),
//!     run_id: "run-1".to_string(),
//! };
//! let request = StartWorkflowExecutionRequest {
//!     request_id: "req-1".to_string(),
//!     domain: "orders".to_string(),
//!     workflow_id: execution.workflow_id.clone(),
//!     workflow_type_name: "ProcessOrder".to_string(),
//!     task_list: "orders-tl".to_string(),
//!     input: "{}".to_string(),
//!     execution_start_to_close_timeout_seconds: 60,
//!     task_start_to_close_timeout_seconds: 10,
//!     identity: "client".to_string(),
//!     parent_execution: None,
//! };
//! let started = state
//!     .add_workflow_execution_started_event("domain-id", &execution, &request)
//!     .expect("fresh state accepts a start event");
//! assert_eq!(started.event_id, duraflow::FIRST_EVENT_ID);
//! let decision = state.add_decision_task_scheduled_event().unwrap();
//! assert_eq!(decision.schedule_id, 2);
//! let updates = state.close_update_session().unwrap();
//! assert_eq!(updates.new_events_builder.history().len(), 2);
//! ```

use serde::{Deserialize, Serialize};

pub mod config;
pub mod errors;
pub mod history_builder;
pub mod persistence;
pub mod serializer;

mod mutable_state;
#[cfg(test)]
mod mutable_state_tests;

pub use config::EngineConfig;
pub use errors::{SerializationError, StateError};
pub use history_builder::HistoryBuilder;
pub use mutable_state::{DecisionInfo, MutableStateBuilder, SessionUpdates};
pub use persistence::{
    ActivityInfo, ChildExecutionInfo, CreateWorkflowExecutionRequest, ParentExecutionInfo, RequestCancelInfo,
    SignalInfo, StickyExecutionAttributes, TimerInfo, TransferTask, WorkflowExecutionInfo, WorkflowMutableState,
};
pub use serializer::{EventBatch, EventSerializer, JsonEventSerializer, SerializedEventBatch};

/// First event ID of a new execution. The start event always has this ID.
pub const FIRST_EVENT_ID: i64 = 1;

/// Sentinel meaning "no event assigned".
pub const EMPTY_EVENT_ID: i64 = -23;

/// Sentinel stamped on events produced while a decision is in flight.
/// Such events are held unnumbered until the decision closes.
pub const BUFFERED_EVENT_ID: i64 = -123;

/// Sentinel for "no decision request ID".
pub const EMPTY_UUID: &str = "emptyUuid";

/// Identifies a single workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

/// Lifecycle state of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Created,
    Running,
    Completed,
}

/// Terminal disposition of a workflow execution. `None` while the workflow
/// is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowCloseStatus {
    None,
    Completed,
    Failed,
    Canceled,
    Terminated,
    TimedOut,
    ContinuedAsNew,
}

/// Which timeout elapsed for a task or workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeoutType {
    StartToClose,
    ScheduleToStart,
    ScheduleToClose,
    Heartbeat,
}

/// Why a decision task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionTaskFailedCause {
    UnhandledDecision,
    BadScheduleActivityAttributes,
    WorkflowWorkerUnhandledFailure,
}

/// Why starting a child workflow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildWorkflowExecutionFailedCause {
    WorkflowAlreadyRunning,
}

/// Why an external cancel request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelExternalWorkflowExecutionFailedCause {
    UnknownExternalWorkflowExecution,
}

/// Why an external signal failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalExternalWorkflowExecutionFailedCause {
    UnknownExternalWorkflowExecution,
}

/// A single history event: sequential position, wall-clock timestamp in
/// nanoseconds since the Unix epoch, and a kind-specific attribute payload.
///
/// `event_id` is [`BUFFERED_EVENT_ID`] for events produced during an
/// in-flight decision; the buffer engine assigns the final ID at flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_id: i64,
    pub timestamp: i64,
    #[serde(flatten)]
    pub attributes: EventAttributes,
}

impl HistoryEvent {
    pub fn event_type(&self) -> EventType {
        self.attributes.event_type()
    }

    pub fn is_buffered(&self) -> bool {
        self.event_id == BUFFERED_EVENT_ID
    }
}

/// Discriminant of a history event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    WorkflowExecutionStarted,
    WorkflowExecutionCompleted,
    WorkflowExecutionFailed,
    WorkflowExecutionTimedOut,
    WorkflowExecutionCanceled,
    WorkflowExecutionTerminated,
    WorkflowExecutionContinuedAsNew,
    WorkflowExecutionCancelRequested,
    WorkflowExecutionSignaled,
    DecisionTaskScheduled,
    DecisionTaskStarted,
    DecisionTaskCompleted,
    DecisionTaskTimedOut,
    DecisionTaskFailed,
    ActivityTaskScheduled,
    ActivityTaskStarted,
    ActivityTaskCompleted,
    ActivityTaskFailed,
    ActivityTaskTimedOut,
    ActivityTaskCancelRequested,
    RequestCancelActivityTaskFailed,
    ActivityTaskCanceled,
    TimerStarted,
    TimerFired,
    TimerCanceled,
    CancelTimerFailed,
    MarkerRecorded,
    RequestCancelExternalWorkflowExecutionInitiated,
    RequestCancelExternalWorkflowExecutionFailed,
    ExternalWorkflowExecutionCancelRequested,
    SignalExternalWorkflowExecutionInitiated,
    SignalExternalWorkflowExecutionFailed,
    ExternalWorkflowExecutionSignaled,
    StartChildWorkflowExecutionInitiated,
    StartChildWorkflowExecutionFailed,
    ChildWorkflowExecutionStarted,
    ChildWorkflowExecutionCompleted,
    ChildWorkflowExecutionFailed,
    ChildWorkflowExecutionCanceled,
    ChildWorkflowExecutionTimedOut,
    ChildWorkflowExecutionTerminated,
}

/// Kind-specific event payloads.
///
/// Events carry their attributes as a tagged variant so that the buffer
/// engine can match on kind during ID assignment and back-patching without
/// any dynamic typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventAttributes {
    WorkflowExecutionStarted {
        workflow_type_name: String,
        task_list: String,
        input: String,
        execution_start_to_close_timeout_seconds: i32,
        task_start_to_close_timeout_seconds: i32,
        identity: String,
    },
    WorkflowExecutionCompleted {
        result: String,
        decision_task_completed_event_id: i64,
    },
    WorkflowExecutionFailed {
        reason: String,
        details: String,
        decision_task_completed_event_id: i64,
    },
    WorkflowExecutionTimedOut {
        timeout_type: TimeoutType,
    },
    WorkflowExecutionCanceled {
        decision_task_completed_event_id: i64,
        details: String,
    },
    WorkflowExecutionTerminated {
        reason: String,
        details: String,
        identity: String,
    },
    WorkflowExecutionContinuedAsNew {
        new_execution_run_id: String,
        workflow_type_name: String,
        task_list: String,
        input: String,
        execution_start_to_close_timeout_seconds: i32,
        task_start_to_close_timeout_seconds: i32,
        decision_task_completed_event_id: i64,
    },
    WorkflowExecutionCancelRequested {
        cause: String,
        identity: String,
        external_initiated_event_id: Option<i64>,
        external_workflow_execution: Option<WorkflowExecution>,
    },
    WorkflowExecutionSignaled {
        signal_name: String,
        input: String,
        identity: String,
    },
    DecisionTaskScheduled {
        task_list: String,
        start_to_close_timeout_seconds: i32,
        attempt: i64,
    },
    DecisionTaskStarted {
        scheduled_event_id: i64,
        identity: String,
        request_id: String,
    },
    DecisionTaskCompleted {
        scheduled_event_id: i64,
        started_event_id: i64,
        identity: String,
        execution_context: String,
    },
    DecisionTaskTimedOut {
        scheduled_event_id: i64,
        started_event_id: i64,
        timeout_type: TimeoutType,
    },
    DecisionTaskFailed {
        scheduled_event_id: i64,
        started_event_id: i64,
        cause: DecisionTaskFailedCause,
        details: String,
        identity: String,
    },
    ActivityTaskScheduled {
        activity_id: String,
        activity_type_name: String,
        task_list: String,
        input: String,
        schedule_to_close_timeout_seconds: i32,
        schedule_to_start_timeout_seconds: i32,
        start_to_close_timeout_seconds: i32,
        heartbeat_timeout_seconds: i32,
        decision_task_completed_event_id: i64,
    },
    ActivityTaskStarted {
        scheduled_event_id: i64,
        identity: String,
        request_id: String,
    },
    ActivityTaskCompleted {
        result: String,
        scheduled_event_id: i64,
        started_event_id: i64,
        identity: String,
    },
    ActivityTaskFailed {
        reason: String,
        details: String,
        scheduled_event_id: i64,
        started_event_id: i64,
        identity: String,
    },
    ActivityTaskTimedOut {
        details: String,
        scheduled_event_id: i64,
        started_event_id: i64,
        timeout_type: TimeoutType,
    },
    ActivityTaskCancelRequested {
        activity_id: String,
        decision_task_completed_event_id: i64,
    },
    RequestCancelActivityTaskFailed {
        activity_id: String,
        cause: String,
        decision_task_completed_event_id: i64,
    },
    ActivityTaskCanceled {
        details: String,
        latest_cancel_requested_event_id: i64,
        scheduled_event_id: i64,
        started_event_id: i64,
        identity: String,
    },
    TimerStarted {
        timer_id: String,
        start_to_fire_timeout_seconds: i64,
        decision_task_completed_event_id: i64,
    },
    TimerFired {
        timer_id: String,
        started_event_id: i64,
    },
    TimerCanceled {
        timer_id: String,
        started_event_id: i64,
        decision_task_completed_event_id: i64,
        identity: String,
    },
    CancelTimerFailed {
        timer_id: String,
        cause: String,
        decision_task_completed_event_id: i64,
        identity: String,
    },
    MarkerRecorded {
        marker_name: String,
        details: String,
        decision_task_completed_event_id: i64,
    },
    RequestCancelExternalWorkflowExecutionInitiated {
        decision_task_completed_event_id: i64,
        domain: String,
        workflow_execution: WorkflowExecution,
        control: String,
    },
    RequestCancelExternalWorkflowExecutionFailed {
        cause: CancelExternalWorkflowExecutionFailedCause,
        decision_task_completed_event_id: i64,
        domain: String,
        workflow_execution: WorkflowExecution,
        initiated_event_id: i64,
        control: String,
    },
    ExternalWorkflowExecutionCancelRequested {
        initiated_event_id: i64,
        domain: String,
        workflow_execution: WorkflowExecution,
    },
    SignalExternalWorkflowExecutionInitiated {
        decision_task_completed_event_id: i64,
        domain: String,
        workflow_execution: WorkflowExecution,
        signal_name: String,
        input: String,
        control: String,
    },
    SignalExternalWorkflowExecutionFailed {
        cause: SignalExternalWorkflowExecutionFailedCause,
        decision_task_completed_event_id: i64,
        domain: String,
        workflow_execution: WorkflowExecution,
        initiated_event_id: i64,
        control: String,
    },
    ExternalWorkflowExecutionSignaled {
        initiated_event_id: i64,
        domain: String,
        workflow_execution: WorkflowExecution,
        control: String,
    },
    StartChildWorkflowExecutionInitiated {
        domain: String,
        workflow_id: String,
        workflow_type_name: String,
        task_list: String,
        input: String,
        execution_start_to_close_timeout_seconds: i32,
        task_start_to_close_timeout_seconds: i32,
        control: String,
        decision_task_completed_event_id: i64,
    },
    StartChildWorkflowExecutionFailed {
        domain: String,
        workflow_id: String,
        workflow_type_name: String,
        cause: ChildWorkflowExecutionFailedCause,
        control: String,
        initiated_event_id: i64,
        decision_task_completed_event_id: i64,
    },
    ChildWorkflowExecutionStarted {
        domain: String,
        initiated_event_id: i64,
        workflow_execution: WorkflowExecution,
        workflow_type_name: String,
    },
    ChildWorkflowExecutionCompleted {
        result: String,
        domain: String,
        workflow_execution: WorkflowExecution,
        workflow_type_name: String,
        initiated_event_id: i64,
        started_event_id: i64,
    },
    ChildWorkflowExecutionFailed {
        reason: String,
        details: String,
        domain: String,
        workflow_execution: WorkflowExecution,
        workflow_type_name: String,
        initiated_event_id: i64,
        started_event_id: i64,
    },
    ChildWorkflowExecutionCanceled {
        details: String,
        domain: String,
        workflow_execution: WorkflowExecution,
        workflow_type_name: String,
        initiated_event_id: i64,
        started_event_id: i64,
    },
    ChildWorkflowExecutionTimedOut {
        timeout_type: TimeoutType,
        domain: String,
        workflow_execution: WorkflowExecution,
        workflow_type_name: String,
        initiated_event_id: i64,
        started_event_id: i64,
    },
    ChildWorkflowExecutionTerminated {
        domain: String,
        workflow_execution: WorkflowExecution,
        workflow_type_name: String,
        initiated_event_id: i64,
        started_event_id: i64,
    },
}

impl EventAttributes {
    pub fn event_type(&self) -> EventType {
        match self {
            EventAttributes::WorkflowExecutionStarted { .. } => EventType::WorkflowExecutionStarted,
            EventAttributes::WorkflowExecutionCompleted { .. } => EventType::WorkflowExecutionCompleted,
            EventAttributes::WorkflowExecutionFailed { .. } => EventType::WorkflowExecutionFailed,
            EventAttributes::WorkflowExecutionTimedOut { .. } => EventType::WorkflowExecutionTimedOut,
            EventAttributes::WorkflowExecutionCanceled { .. } => EventType::WorkflowExecutionCanceled,
            EventAttributes::WorkflowExecutionTerminated { .. } => EventType::WorkflowExecutionTerminated,
            EventAttributes::WorkflowExecutionContinuedAsNew { .. } => EventType::WorkflowExecutionContinuedAsNew,
            EventAttributes::WorkflowExecutionCancelRequested { .. } => EventType::WorkflowExecutionCancelRequested,
            EventAttributes::WorkflowExecutionSignaled { .. } => EventType::WorkflowExecutionSignaled,
            EventAttributes::DecisionTaskScheduled { .. } => EventType::DecisionTaskScheduled,
            EventAttributes::DecisionTaskStarted { .. } => EventType::DecisionTaskStarted,
            EventAttributes::DecisionTaskCompleted { .. } => EventType::DecisionTaskCompleted,
            EventAttributes::DecisionTaskTimedOut { .. } => EventType::DecisionTaskTimedOut,
            EventAttributes::DecisionTaskFailed { .. } => EventType::DecisionTaskFailed,
            EventAttributes::ActivityTaskScheduled { .. } => EventType::ActivityTaskScheduled,
            EventAttributes::ActivityTaskStarted { .. } => EventType::ActivityTaskStarted,
            EventAttributes::ActivityTaskCompleted { .. } => EventType::ActivityTaskCompleted,
            EventAttributes::ActivityTaskFailed { .. } => EventType::ActivityTaskFailed,
            EventAttributes::ActivityTaskTimedOut { .. } => EventType::ActivityTaskTimedOut,
            EventAttributes::ActivityTaskCancelRequested { .. } => EventType::ActivityTaskCancelRequested,
            EventAttributes::RequestCancelActivityTaskFailed { .. } => EventType::RequestCancelActivityTaskFailed,
            EventAttributes::ActivityTaskCanceled { .. } => EventType::ActivityTaskCanceled,
            EventAttributes::TimerStarted { .. } => EventType::TimerStarted,
            EventAttributes::TimerFired { .. } => EventType::TimerFired,
            EventAttributes::TimerCanceled { .. } => EventType::TimerCanceled,
            EventAttributes::CancelTimerFailed { .. } => EventType::CancelTimerFailed,
            EventAttributes::MarkerRecorded { .. } => EventType::MarkerRecorded,
            EventAttributes::RequestCancelExternalWorkflowExecutionInitiated { .. } => {
                EventType::RequestCancelExternalWorkflowExecutionInitiated
            }
            EventAttributes::RequestCancelExternalWorkflowExecutionFailed { .. } => {
                EventType::RequestCancelExternalWorkflowExecutionFailed
            }
            EventAttributes::ExternalWorkflowExecutionCancelRequested { .. } => {
                EventType::ExternalWorkflowExecutionCancelRequested
            }
            EventAttributes::SignalExternalWorkflowExecutionInitiated { .. } => {
                EventType::SignalExternalWorkflowExecutionInitiated
            }
            EventAttributes::SignalExternalWorkflowExecutionFailed { .. } => {
                EventType::SignalExternalWorkflowExecutionFailed
            }
            EventAttributes::ExternalWorkflowExecutionSignaled { .. } => EventType::ExternalWorkflowExecutionSignaled,
            EventAttributes::StartChildWorkflowExecutionInitiated { .. } => {
                EventType::StartChildWorkflowExecutionInitiated
            }
            EventAttributes::StartChildWorkflowExecutionFailed { .. } => EventType::StartChildWorkflowExecutionFailed,
            EventAttributes::ChildWorkflowExecutionStarted { .. } => EventType::ChildWorkflowExecutionStarted,
            EventAttributes::ChildWorkflowExecutionCompleted { .. } => EventType::ChildWorkflowExecutionCompleted,
            EventAttributes::ChildWorkflowExecutionFailed { .. } => EventType::ChildWorkflowExecutionFailed,
            EventAttributes::ChildWorkflowExecutionCanceled { .. } => EventType::ChildWorkflowExecutionCanceled,
            EventAttributes::ChildWorkflowExecutionTimedOut { .. } => EventType::ChildWorkflowExecutionTimedOut,
            EventAttributes::ChildWorkflowExecutionTerminated { .. } => EventType::ChildWorkflowExecutionTerminated,
        }
    }
}

// ============================================================================
// Requests and decision attributes (inputs to the Add*Event operations)
// ============================================================================

/// Request to start a new workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkflowExecutionRequest {
    pub request_id: String,
    pub domain: String,
    pub workflow_id: String,
    pub workflow_type_name: String,
    pub task_list: String,
    pub input: String,
    pub execution_start_to_close_timeout_seconds: i32,
    pub task_start_to_close_timeout_seconds: i32,
    pub identity: String,
    /// Present when this run is a child of another workflow execution.
    pub parent_execution: Option<ParentExecutionInfo>,
}

/// Decision attribute: schedule an activity task.
///
/// `activity_id` is optional because workers can submit malformed decisions;
/// a missing ID rejects the decision without touching state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleActivityTaskAttributes {
    pub activity_id: Option<String>,
    pub activity_type_name: String,
    pub task_list: String,
    pub input: String,
    pub schedule_to_close_timeout_seconds: Option<i32>,
    pub schedule_to_start_timeout_seconds: Option<i32>,
    pub start_to_close_timeout_seconds: Option<i32>,
    pub heartbeat_timeout_seconds: Option<i32>,
}

/// Decision attribute: start a user timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTimerAttributes {
    pub timer_id: String,
    pub start_to_fire_timeout_seconds: i64,
}

/// Decision attribute: cancel a user timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTimerAttributes {
    pub timer_id: String,
}

/// Decision attribute: complete the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteWorkflowExecutionAttributes {
    pub result: String,
}

/// Decision attribute: fail the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailWorkflowExecutionAttributes {
    pub reason: String,
    pub details: String,
}

/// Decision attribute: cancel the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelWorkflowExecutionAttributes {
    pub details: String,
}

/// Decision attribute: close this run and chain a successor under the same
/// workflow ID. Absent fields fall back to the current execution's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueAsNewWorkflowExecutionAttributes {
    pub workflow_type_name: Option<String>,
    pub task_list: Option<String>,
    pub input: String,
    pub execution_start_to_close_timeout_seconds: i32,
    pub task_start_to_close_timeout_seconds: Option<i32>,
}

/// Decision attribute: request cancellation of an external workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelExternalWorkflowExecutionAttributes {
    pub domain: String,
    pub workflow_id: String,
    pub run_id: String,
    pub control: String,
}

/// Decision attribute: signal an external workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalExternalWorkflowExecutionAttributes {
    pub domain: String,
    pub execution: WorkflowExecution,
    pub signal_name: String,
    pub input: String,
    pub control: String,
}

/// Decision attribute: start a child workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartChildWorkflowExecutionAttributes {
    pub domain: String,
    pub workflow_id: String,
    pub workflow_type_name: String,
    pub task_list: String,
    pub input: String,
    pub execution_start_to_close_timeout_seconds: i32,
    pub task_start_to_close_timeout_seconds: i32,
    pub control: String,
}

/// Decision attribute: record a marker in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMarkerAttributes {
    pub marker_name: String,
    pub details: String,
}

/// Request to cancel a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelWorkflowExecutionRequest {
    pub cancel_request_id: Option<String>,
    pub identity: String,
}

/// Request to terminate a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateWorkflowExecutionRequest {
    pub reason: String,
    pub details: String,
    pub identity: String,
}

/// Request to deliver a signal to a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalWorkflowExecutionRequest {
    pub signal_name: String,
    pub input: String,
    pub identity: String,
    /// Deduplication key; delivered request IDs are remembered in the
    /// signaled-request-ID set.
    pub request_id: String,
}

/// Worker poll that claims a decision task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollForDecisionTaskRequest {
    pub task_list: String,
    pub identity: String,
}

/// Worker poll that claims an activity task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollForActivityTaskRequest {
    pub task_list: String,
    pub identity: String,
}

/// Worker response completing a decision task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondDecisionTaskCompletedRequest {
    pub execution_context: String,
    pub identity: String,
}

/// Worker response completing an activity task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondActivityTaskCompletedRequest {
    pub result: String,
    pub identity: String,
}

/// Worker response failing an activity task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondActivityTaskFailedRequest {
    pub reason: String,
    pub details: String,
    pub identity: String,
}

// Helper to generate UUID-format request IDs without an RNG dependency.
pub(crate) fn generate_guid() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    // Thread-local counter for uniqueness within the same timestamp
    thread_local! {
        static COUNTER: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
    }
    let counter = COUNTER.with(|c| {
        let val = c.get();
        c.set(val.wrapping_add(1));
        val
    });

    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (timestamp >> 96) as u32,
        ((timestamp >> 80) & 0xFFFF) as u16,
        (counter & 0xFFFF) as u16,
        ((timestamp >> 64) & 0xFFFF) as u16,
        (timestamp & 0xFFFF_FFFF_FFFF) as u64,
    )
}

pub(crate) fn now_nanos() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
