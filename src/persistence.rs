//! Persistence-facing records.
//!
//! These are the rows the persistence layer reads and writes: the execution
//! header, the pending-collection entries, the rehydration snapshot, and the
//! create request staged by continue-as-new. The engine owns their mutation;
//! persistence treats them as opaque values keyed as documented per type.

use crate::serializer::SerializedEventBatch;
use crate::{WorkflowCloseStatus, WorkflowExecution, WorkflowState, EMPTY_EVENT_ID, EMPTY_UUID, FIRST_EVENT_ID};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// No timer task has been created for this entry.
pub const TIMER_TASK_STATUS_NONE: i32 = 0;
/// A user-timer task exists for this entry.
pub const TIMER_TASK_STATUS_CREATED: i32 = 1;

// Activity timer bitmap: one bit per outstanding activity timeout task.
pub const TIMER_TASK_STATUS_CREATED_START_TO_CLOSE: i32 = 1 << 0;
pub const TIMER_TASK_STATUS_CREATED_SCHEDULE_TO_START: i32 = 1 << 1;
pub const TIMER_TASK_STATUS_CREATED_SCHEDULE_TO_CLOSE: i32 = 1 << 2;
pub const TIMER_TASK_STATUS_CREATED_HEARTBEAT: i32 = 1 << 3;

/// Identity of the parent execution when this run is a child workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentExecutionInfo {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    /// ID of the StartChildWorkflowExecutionInitiated event in the parent's
    /// history.
    pub initiated_id: i64,
}

/// Sticky task-list affinity plus the client version triple that negotiated
/// it. Cleared as a unit whenever a decision fails or times out waiting to
/// start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickyExecutionAttributes {
    pub task_list: String,
    pub schedule_to_start_timeout_seconds: i32,
    pub client_library_version: String,
    pub client_feature_version: String,
    pub client_impl: String,
}

/// The singleton header row for one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecutionInfo {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub parent_execution: Option<ParentExecutionInfo>,
    pub task_list: String,
    pub sticky: Option<StickyExecutionAttributes>,
    pub workflow_type_name: String,
    pub workflow_timeout_seconds: i32,
    /// Default start-to-close timeout for decision tasks of this run.
    pub decision_timeout_value_seconds: i32,
    pub state: WorkflowState,
    pub close_status: WorkflowCloseStatus,
    /// Next event ID to assign; monotonically non-decreasing.
    pub next_event_id: i64,
    /// Started-event ID of the last completed decision.
    pub last_processed_event: i64,
    /// First event ID of the most recently persisted history batch.
    pub last_first_event_id: i64,
    pub start_timestamp: SystemTime,
    pub last_updated_timestamp: SystemTime,
    pub create_request_id: String,

    // Current decision task, if any.
    pub decision_schedule_id: i64,
    pub decision_started_id: i64,
    pub decision_request_id: String,
    pub decision_timeout_seconds: i32,
    pub decision_attempt: i64,
    pub decision_timestamp: i64,

    pub cancel_requested: bool,
    pub cancel_request_id: String,

    /// Serialized completion event, retained only when this run has a parent
    /// so the close can be reported upstream.
    pub completion_event: Option<Vec<u8>>,
}

impl WorkflowExecutionInfo {
    pub fn new() -> Self {
        Self {
            domain_id: String::new(),
            workflow_id: String::new(),
            run_id: String::new(),
            parent_execution: None,
            task_list: String::new(),
            sticky: None,
            workflow_type_name: String::new(),
            workflow_timeout_seconds: 0,
            decision_timeout_value_seconds: 0,
            state: WorkflowState::Created,
            close_status: WorkflowCloseStatus::None,
            next_event_id: FIRST_EVENT_ID,
            last_processed_event: EMPTY_EVENT_ID,
            last_first_event_id: EMPTY_EVENT_ID,
            start_timestamp: UNIX_EPOCH,
            last_updated_timestamp: UNIX_EPOCH,
            create_request_id: String::new(),
            decision_schedule_id: EMPTY_EVENT_ID,
            decision_started_id: EMPTY_EVENT_ID,
            decision_request_id: EMPTY_UUID.to_string(),
            decision_timeout_seconds: 0,
            decision_attempt: 0,
            decision_timestamp: 0,
            cancel_requested: false,
            cancel_request_id: String::new(),
            completion_event: None,
        }
    }

    pub fn has_parent_execution(&self) -> bool {
        self.parent_execution.is_some()
    }
}

impl Default for WorkflowExecutionInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// An outstanding activity, keyed by its schedule-event ID. Also indexed by
/// activity ID (unique per run) in the mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub schedule_id: i64,
    /// Serialized ActivityTaskScheduled event, replayed to dispatch the task.
    pub scheduled_event: Vec<u8>,
    pub scheduled_time: SystemTime,
    /// `EMPTY_EVENT_ID` until a worker claims the task.
    pub started_id: i64,
    pub started_time: SystemTime,
    pub activity_id: String,
    pub request_id: String,
    /// Latest heartbeat details reported by the worker.
    pub details: String,
    pub schedule_to_start_timeout_seconds: i32,
    pub schedule_to_close_timeout_seconds: i32,
    pub start_to_close_timeout_seconds: i32,
    pub heartbeat_timeout_seconds: i32,
    pub cancel_requested: bool,
    /// Event ID of the ActivityTaskCancelRequested event, if any.
    pub cancel_request_id: i64,
    pub last_heartbeat_updated_time: SystemTime,
    /// Bitmap of activity timeout tasks already created.
    pub timer_task_status: i32,
}

/// An outstanding user timer, keyed by its timer ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    pub timer_id: String,
    pub started_id: i64,
    pub expiry_time: SystemTime,
    pub task_status: i64,
}

/// An outstanding child workflow execution, keyed by its initiated-event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildExecutionInfo {
    pub initiated_id: i64,
    pub initiated_event: Vec<u8>,
    /// `EMPTY_EVENT_ID` until the child's start is recorded.
    pub started_id: i64,
    pub started_event: Option<Vec<u8>>,
    pub create_request_id: String,
}

/// An outstanding cancellation request against an external workflow, keyed
/// by its initiated-event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelInfo {
    pub initiated_id: i64,
    pub cancel_request_id: String,
}

/// An outstanding signal to an external workflow, keyed by its
/// initiated-event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub initiated_id: i64,
    pub signal_request_id: String,
    pub signal_name: String,
    pub input: String,
    pub control: String,
}

/// The full rehydration snapshot persistence hands to
/// [`crate::MutableStateBuilder::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMutableState {
    pub execution_info: WorkflowExecutionInfo,
    pub activity_infos: HashMap<i64, ActivityInfo>,
    pub timer_infos: HashMap<String, TimerInfo>,
    pub child_execution_infos: HashMap<i64, ChildExecutionInfo>,
    pub request_cancel_infos: HashMap<i64, RequestCancelInfo>,
    pub signal_infos: HashMap<i64, SignalInfo>,
    pub signal_requested_ids: HashSet<String>,
    /// Buffered event batches already persisted by earlier sessions.
    pub buffered_events: Vec<SerializedEventBatch>,
}

/// A task handed to the transfer queue as part of an atomic write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferTask {
    Decision {
        domain_id: String,
        task_list: String,
        schedule_id: i64,
    },
}

/// Create request staged by continue-as-new: everything persistence needs to
/// start the successor run in the same atomic write that closes this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkflowExecutionRequest {
    pub request_id: String,
    pub domain_id: String,
    pub execution: WorkflowExecution,
    pub parent_execution: Option<ParentExecutionInfo>,
    pub task_list: String,
    pub workflow_type_name: String,
    pub workflow_timeout_seconds: i32,
    pub decision_timeout_value_seconds: i32,
    pub next_event_id: i64,
    pub last_processed_event: i64,
    pub transfer_tasks: Vec<TransferTask>,
    pub decision_schedule_id: i64,
    pub decision_started_id: i64,
    pub decision_start_to_close_timeout_seconds: i32,
    pub continue_as_new: bool,
    pub previous_run_id: String,
}
