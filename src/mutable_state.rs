//! Mutable-state core: the authoritative in-memory state of one workflow
//! execution.
//!
//! Every operation follows the same contract: validate preconditions against
//! the pending collections and decision state, emit an event through the
//! history builder, mutate pending state, and stage the delta for
//! persistence. Precondition violations log an invalid-history-action record
//! and return `None` without mutating anything.
//!
//! Events produced while a decision task is in flight are buffered: they
//! carry the [`BUFFERED_EVENT_ID`] sentinel and consume no event ID until the
//! decision closes. [`MutableStateBuilder::flush_buffered_events`] drains the
//! buffer, assigns final IDs, and repairs started-event cross-references.

use crate::config::EngineConfig;
use crate::errors::StateError;
use crate::history_builder::{
    new_decision_task_scheduled_event_with_info, new_decision_task_started_event_with_info, HistoryBuilder,
};
use crate::persistence::{
    ActivityInfo, ChildExecutionInfo, CreateWorkflowExecutionRequest, RequestCancelInfo, SignalInfo, TimerInfo,
    TransferTask, WorkflowExecutionInfo, WorkflowMutableState, TIMER_TASK_STATUS_NONE,
};
use crate::serializer::{EventBatch, EventSerializer, JsonEventSerializer, SerializedEventBatch, DEFAULT_HISTORY_VERSION};
use crate::{
    generate_guid, now_nanos, CancelExternalWorkflowExecutionFailedCause, CancelTimerAttributes,
    CancelWorkflowExecutionAttributes, ChildWorkflowExecutionFailedCause, CompleteWorkflowExecutionAttributes,
    ContinueAsNewWorkflowExecutionAttributes, DecisionTaskFailedCause, EventAttributes, EventType,
    FailWorkflowExecutionAttributes, HistoryEvent, PollForActivityTaskRequest, PollForDecisionTaskRequest,
    RecordMarkerAttributes, RequestCancelExternalWorkflowExecutionAttributes, RequestCancelWorkflowExecutionRequest,
    RespondActivityTaskCompletedRequest, RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest,
    ScheduleActivityTaskAttributes, SignalExternalWorkflowExecutionAttributes,
    SignalExternalWorkflowExecutionFailedCause, SignalWorkflowExecutionRequest, StartChildWorkflowExecutionAttributes,
    StartTimerAttributes, StartWorkflowExecutionRequest, TerminateWorkflowExecutionRequest, TimeoutType,
    WorkflowCloseStatus, WorkflowExecution, WorkflowState, BUFFERED_EVENT_ID, EMPTY_EVENT_ID, EMPTY_UUID,
    FIRST_EVENT_ID,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

const TIMER_CANCELLATION_MSG_TIMER_ID_UNKNOWN: &str = "TIMER_ID_UNKNOWN";

/// Read/update view of the single in-flight decision task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionInfo {
    pub schedule_id: i64,
    pub started_id: i64,
    pub request_id: String,
    pub decision_timeout_seconds: i32,
    /// Only populated when scheduling, to communicate the task list used.
    pub task_list: String,
    pub attempt: i64,
    pub timestamp: i64,
}

/// The diff handed to the persistence layer when an update session closes.
/// Delete fields are single-valued: the engine batches at most one deletion
/// per kind per session.
#[derive(Debug)]
pub struct SessionUpdates {
    pub new_events_builder: HistoryBuilder,
    pub update_activity_infos: Vec<ActivityInfo>,
    pub delete_activity_info: Option<i64>,
    pub update_timer_infos: Vec<TimerInfo>,
    pub delete_timer_infos: Vec<String>,
    pub update_child_execution_infos: Vec<ChildExecutionInfo>,
    pub delete_child_execution_info: Option<i64>,
    pub update_cancel_execution_infos: Vec<RequestCancelInfo>,
    pub delete_cancel_execution_info: Option<i64>,
    pub update_signal_infos: Vec<SignalInfo>,
    pub delete_signal_info: Option<i64>,
    pub update_signal_requested_ids: Vec<String>,
    pub delete_signal_requested_id: Option<String>,
    pub continue_as_new: Option<CreateWorkflowExecutionRequest>,
    pub new_buffered_events: Option<SerializedEventBatch>,
    pub clear_buffered_events: bool,
}

/// Authoritative mutable state of one workflow run.
///
/// Not internally concurrent: the surrounding service serializes access per
/// run, and no operation suspends mid-way.
pub struct MutableStateBuilder {
    // Pending collections, keyed as documented per record type, plus the
    // staging lists snapshotting this session's deltas.
    pending_activity_info_ids: HashMap<i64, ActivityInfo>,
    pending_activity_info_by_activity_id: HashMap<String, i64>,
    update_activity_infos: Vec<ActivityInfo>,
    delete_activity_info: Option<i64>,

    pending_timer_info_ids: HashMap<String, TimerInfo>,
    update_timer_infos: Vec<TimerInfo>,
    delete_timer_infos: Vec<String>,

    pending_child_execution_info_ids: HashMap<i64, ChildExecutionInfo>,
    update_child_execution_infos: Vec<ChildExecutionInfo>,
    delete_child_execution_info: Option<i64>,

    pending_request_cancel_info_ids: HashMap<i64, RequestCancelInfo>,
    update_request_cancel_infos: Vec<RequestCancelInfo>,
    delete_request_cancel_info: Option<i64>,

    pending_signal_info_ids: HashMap<i64, SignalInfo>,
    update_signal_infos: Vec<SignalInfo>,
    delete_signal_info: Option<i64>,

    pending_signal_requested_ids: HashSet<String>,
    update_signal_requested_ids: HashSet<String>,
    delete_signal_requested_id: Option<String>,

    /// Buffered batches already persisted by earlier sessions.
    buffered_events: Vec<SerializedEventBatch>,
    /// Buffered batch produced this session, not yet persisted.
    update_buffered_events: Option<SerializedEventBatch>,
    /// Tells persistence to drop its stored buffer.
    clear_buffered_events: bool,

    execution_info: WorkflowExecutionInfo,
    continue_as_new: Option<CreateWorkflowExecutionRequest>,
    h_builder: HistoryBuilder,
    serializer: Arc<dyn EventSerializer>,
    config: Arc<EngineConfig>,
}

impl MutableStateBuilder {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        let serializer: Arc<dyn EventSerializer> = Arc::new(JsonEventSerializer);
        Self {
            pending_activity_info_ids: HashMap::new(),
            pending_activity_info_by_activity_id: HashMap::new(),
            update_activity_infos: Vec::new(),
            delete_activity_info: None,
            pending_timer_info_ids: HashMap::new(),
            update_timer_infos: Vec::new(),
            delete_timer_infos: Vec::new(),
            pending_child_execution_info_ids: HashMap::new(),
            update_child_execution_infos: Vec::new(),
            delete_child_execution_info: None,
            pending_request_cancel_info_ids: HashMap::new(),
            update_request_cancel_infos: Vec::new(),
            delete_request_cancel_info: None,
            pending_signal_info_ids: HashMap::new(),
            update_signal_infos: Vec::new(),
            delete_signal_info: None,
            pending_signal_requested_ids: HashSet::new(),
            update_signal_requested_ids: HashSet::new(),
            delete_signal_requested_id: None,
            buffered_events: Vec::new(),
            update_buffered_events: None,
            clear_buffered_events: false,
            execution_info: WorkflowExecutionInfo::new(),
            continue_as_new: None,
            h_builder: HistoryBuilder::new(serializer.clone()),
            serializer,
            config,
        }
    }

    /// Rehydrate from a persistence snapshot.
    pub fn load(&mut self, state: WorkflowMutableState) {
        self.pending_activity_info_by_activity_id = state
            .activity_infos
            .values()
            .map(|ai| (ai.activity_id.clone(), ai.schedule_id))
            .collect();
        self.pending_activity_info_ids = state.activity_infos;
        self.pending_timer_info_ids = state.timer_infos;
        self.pending_child_execution_info_ids = state.child_execution_infos;
        self.pending_request_cancel_info_ids = state.request_cancel_infos;
        self.pending_signal_info_ids = state.signal_infos;
        self.pending_signal_requested_ids = state.signal_requested_ids;
        self.execution_info = state.execution_info;
        self.buffered_events = state.buffered_events;
    }

    pub fn execution_info(&self) -> &WorkflowExecutionInfo {
        &self.execution_info
    }

    pub fn execution_info_mut(&mut self) -> &mut WorkflowExecutionInfo {
        &mut self.execution_info
    }

    // ------------------------------------------------------------------
    // Buffer engine
    // ------------------------------------------------------------------

    /// Partition the session history into committed and buffered events,
    /// drain the buffer when no decision is in flight, and assign final IDs.
    pub fn flush_buffered_events(&mut self) -> Result<(), StateError> {
        // 1) events added during an in-flight decision go to the buffered
        //    bucket, everything else to the committed bucket
        let mut new_buffered_events: Vec<HistoryEvent> = Vec::new();
        let mut new_committed_events: Vec<HistoryEvent> = Vec::new();
        for event in self.h_builder.history_mut().drain(..) {
            if event.event_id == BUFFERED_EVENT_ID {
                new_buffered_events.push(event);
            } else {
                new_committed_events.push(event);
            }
        }

        // no decision in flight: flush all buffered events to the committed
        // bucket, oldest persisted batches first
        if !self.has_in_flight_decision_task() {
            for batch in &self.buffered_events {
                let event_batch = match self.serializer.deserialize_batch(batch) {
                    Ok(event_batch) => event_batch,
                    Err(err) => {
                        error!(error = %err, "unable to deserialize buffered execution history for update");
                        return Err(err.into());
                    }
                };
                new_committed_events.extend(event_batch.events);
            }
            if let Some(pending) = &self.update_buffered_events {
                let event_batch = match self.serializer.deserialize_batch(pending) {
                    Ok(event_batch) => event_batch,
                    Err(err) => {
                        error!(error = %err, "unable to deserialize buffered execution history for update");
                        return Err(err.into());
                    }
                };
                new_committed_events.extend(event_batch.events);
            }
            new_committed_events.append(&mut new_buffered_events);

            // the persisted buffer has been drained into history
            self.clear_buffered_events = self.clear_buffered_events || !self.buffered_events.is_empty();
            self.buffered_events.clear();
            self.update_buffered_events = None;
        }

        self.h_builder.replace_history(new_committed_events);
        self.assign_event_id_to_buffered_events()?;

        // decision still in flight: hold the newly buffered events in the
        // pending slot until the next flush
        if self.has_in_flight_decision_task() && !new_buffered_events.is_empty() {
            let batch = EventBatch::new(DEFAULT_HISTORY_VERSION, new_buffered_events);
            let serialized = match self.serializer.serialize_batch(&batch) {
                Ok(serialized) => serialized,
                Err(err) => {
                    error!(error = %err, "unable to serialize execution history for update");
                    return Err(err.into());
                }
            };
            self.update_buffered_events = Some(serialized);
        }

        Ok(())
    }

    /// Number every event still carrying the buffered sentinel and repair
    /// cross-references that could not be known at buffering time.
    fn assign_event_id_to_buffered_events(&mut self) -> Result<(), StateError> {
        let mut history = std::mem::take(self.h_builder.history_mut());
        let mut scheduled_id_to_started_id: HashMap<i64, i64> = HashMap::new();

        for event in history.iter_mut() {
            if event.event_id != BUFFERED_EVENT_ID {
                continue;
            }

            let event_id = self.execution_info.next_event_id;
            event.event_id = event_id;
            self.execution_info.next_event_id += 1;

            match &mut event.attributes {
                EventAttributes::ActivityTaskScheduled { activity_id, .. } => {
                    // the pending entry was keyed under the sentinel; re-key
                    // it and refresh the stored scheduled event
                    let activity_id = activity_id.clone();
                    if let Some(old_key) = self.pending_activity_info_by_activity_id.get(&activity_id).copied() {
                        if let Some(mut ai) = self.pending_activity_info_ids.remove(&old_key) {
                            ai.schedule_id = event_id;
                            ai.scheduled_event = self.serializer.serialize(&*event)?;
                            self.pending_activity_info_by_activity_id
                                .insert(activity_id.clone(), event_id);
                            self.pending_activity_info_ids.insert(event_id, ai.clone());
                            self.update_activity_infos.retain(|a| a.activity_id != activity_id);
                            self.update_activity_infos.push(ai);
                        }
                    }
                }
                EventAttributes::ActivityTaskStarted { scheduled_event_id, .. } => {
                    let scheduled_id = *scheduled_event_id;
                    scheduled_id_to_started_id.insert(scheduled_id, event_id);
                    if let Some(ai) = self.pending_activity_info_ids.get_mut(&scheduled_id) {
                        ai.started_id = event_id;
                        let snapshot = ai.clone();
                        self.update_activity_infos.push(snapshot);
                    }
                    // snapshots staged while the started event was still
                    // buffered carry the sentinel; patch them as well
                    for staged in self
                        .update_activity_infos
                        .iter_mut()
                        .filter(|ai| ai.schedule_id == scheduled_id)
                    {
                        staged.started_id = event_id;
                    }
                }
                EventAttributes::ChildWorkflowExecutionStarted { initiated_event_id, .. } => {
                    let initiated_id = *initiated_event_id;
                    scheduled_id_to_started_id.insert(initiated_id, event_id);
                    if let Some(ci) = self.pending_child_execution_info_ids.get_mut(&initiated_id) {
                        ci.started_id = event_id;
                        let snapshot = ci.clone();
                        self.update_child_execution_infos.push(snapshot);
                    }
                    for staged in self
                        .update_child_execution_infos
                        .iter_mut()
                        .filter(|ci| ci.initiated_id == initiated_id)
                    {
                        staged.started_id = event_id;
                    }
                }
                EventAttributes::ActivityTaskCompleted {
                    scheduled_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ActivityTaskFailed {
                    scheduled_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ActivityTaskTimedOut {
                    scheduled_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ActivityTaskCanceled {
                    scheduled_event_id,
                    started_event_id,
                    ..
                } => {
                    if let Some(started_id) = scheduled_id_to_started_id.get(scheduled_event_id) {
                        *started_event_id = *started_id;
                    }
                }
                EventAttributes::ChildWorkflowExecutionCompleted {
                    initiated_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ChildWorkflowExecutionFailed {
                    initiated_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ChildWorkflowExecutionCanceled {
                    initiated_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ChildWorkflowExecutionTimedOut {
                    initiated_event_id,
                    started_event_id,
                    ..
                }
                | EventAttributes::ChildWorkflowExecutionTerminated {
                    initiated_event_id,
                    started_event_id,
                    ..
                } => {
                    if let Some(started_id) = scheduled_id_to_started_id.get(initiated_event_id) {
                        *started_event_id = *started_id;
                    }
                }
                _ => {}
            }
        }

        self.h_builder.replace_history(history);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session staging
    // ------------------------------------------------------------------

    /// Flush buffered events, snapshot the staged deltas into an immutable
    /// session-update record, and reset the staging area for the next
    /// session.
    pub fn close_update_session(&mut self) -> Result<SessionUpdates, StateError> {
        self.flush_buffered_events()?;

        let updates = SessionUpdates {
            new_events_builder: std::mem::replace(&mut self.h_builder, HistoryBuilder::new(self.serializer.clone())),
            update_activity_infos: std::mem::take(&mut self.update_activity_infos),
            delete_activity_info: self.delete_activity_info.take(),
            update_timer_infos: std::mem::take(&mut self.update_timer_infos),
            delete_timer_infos: std::mem::take(&mut self.delete_timer_infos),
            update_child_execution_infos: std::mem::take(&mut self.update_child_execution_infos),
            delete_child_execution_info: self.delete_child_execution_info.take(),
            update_cancel_execution_infos: std::mem::take(&mut self.update_request_cancel_infos),
            delete_cancel_execution_info: self.delete_request_cancel_info.take(),
            update_signal_infos: std::mem::take(&mut self.update_signal_infos),
            delete_signal_info: self.delete_signal_info.take(),
            update_signal_requested_ids: self.update_signal_requested_ids.drain().collect(),
            delete_signal_requested_id: self.delete_signal_requested_id.take(),
            continue_as_new: self.continue_as_new.take(),
            new_buffered_events: self.update_buffered_events.clone(),
            clear_buffered_events: self.clear_buffered_events,
        };

        self.clear_buffered_events = false;
        // the pending buffered batch is persisted with this session; further
        // flushes drain it from the persisted list
        if let Some(pending) = self.update_buffered_events.take() {
            self.buffered_events.push(pending);
        }

        Ok(updates)
    }

    // ------------------------------------------------------------------
    // Event allocation
    // ------------------------------------------------------------------

    fn allocate_event_id(&mut self, event_type: EventType) -> i64 {
        if self.should_buffer_event(event_type) {
            BUFFERED_EVENT_ID
        } else {
            // only consume the next event ID if the event is not buffered
            let event_id = self.execution_info.next_event_id;
            self.execution_info.next_event_id += 1;
            event_id
        }
    }

    fn should_buffer_event(&self, event_type: EventType) -> bool {
        if !self.has_in_flight_decision_task() {
            return false;
        }
        // decision-terminal and workflow-terminal events are never buffered
        !matches!(
            event_type,
            EventType::DecisionTaskCompleted
                | EventType::DecisionTaskFailed
                | EventType::DecisionTaskTimedOut
                | EventType::WorkflowExecutionCompleted
                | EventType::WorkflowExecutionFailed
                | EventType::WorkflowExecutionTimedOut
                | EventType::WorkflowExecutionTerminated
                | EventType::WorkflowExecutionContinuedAsNew
                | EventType::WorkflowExecutionCanceled
        )
    }

    fn log_invalid_action(&self, action: &str, detail: String) {
        warn!(
            action,
            next_event_id = self.execution_info.next_event_id,
            detail,
            "invalid history action"
        );
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get_next_event_id(&self) -> i64 {
        self.execution_info.next_event_id
    }

    /// First event ID of the most recently persisted history batch.
    pub fn get_last_first_event_id(&self) -> i64 {
        self.execution_info.last_first_event_id
    }

    /// Started-event ID of the last completed decision.
    pub fn previous_decision_started_event_id(&self) -> i64 {
        self.execution_info.last_processed_event
    }

    pub fn is_workflow_execution_running(&self) -> bool {
        self.execution_info.state != WorkflowState::Completed
    }

    pub fn is_cancel_requested(&self) -> Option<&str> {
        if self.execution_info.cancel_requested {
            Some(&self.execution_info.cancel_request_id)
        } else {
            None
        }
    }

    pub fn is_sticky_task_list_enabled(&self) -> bool {
        self.execution_info.sticky.is_some()
    }

    pub fn get_workflow_type_name(&self) -> &str {
        &self.execution_info.workflow_type_name
    }

    pub fn has_parent_execution(&self) -> bool {
        self.execution_info.has_parent_execution()
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.pending_activity_info_ids.is_empty() || !self.pending_timer_info_ids.is_empty()
    }

    pub fn has_pending_decision_task(&self) -> bool {
        self.execution_info.decision_schedule_id != EMPTY_EVENT_ID
    }

    pub fn has_in_flight_decision_task(&self) -> bool {
        self.execution_info.decision_started_id > 0
    }

    pub fn has_buffered_events(&self) -> bool {
        if !self.buffered_events.is_empty() || self.update_buffered_events.is_some() {
            return true;
        }
        self.h_builder.history().iter().any(|event| event.is_buffered())
    }

    /// Last-updated timestamp in nanoseconds, corrected so it is always
    /// strictly after the start timestamp.
    pub fn get_last_updated_timestamp(&self) -> i64 {
        let last_updated = system_time_to_nanos(self.execution_info.last_updated_timestamp);
        let start = system_time_to_nanos(self.execution_info.start_timestamp);
        if start >= last_updated {
            // This could happen due to clock skews; keep lastUpdated strictly
            // greater than the start timestamp.
            return start + 1;
        }
        last_updated
    }

    pub fn get_activity_info(&self, schedule_event_id: i64) -> Option<&ActivityInfo> {
        self.pending_activity_info_ids.get(&schedule_event_id)
    }

    pub fn get_activity_by_activity_id(&self, activity_id: &str) -> Option<&ActivityInfo> {
        let schedule_id = self.pending_activity_info_by_activity_id.get(activity_id)?;
        self.pending_activity_info_ids.get(schedule_id)
    }

    pub fn get_schedule_id_by_activity_id(&self, activity_id: &str) -> Option<i64> {
        self.pending_activity_info_by_activity_id.get(activity_id).copied()
    }

    pub fn get_activity_scheduled_event(&self, schedule_event_id: i64) -> Option<HistoryEvent> {
        let ai = self.pending_activity_info_ids.get(&schedule_event_id)?;
        self.deserialize_event(&ai.scheduled_event)
    }

    pub fn get_child_execution_info(&self, initiated_event_id: i64) -> Option<&ChildExecutionInfo> {
        self.pending_child_execution_info_ids.get(&initiated_event_id)
    }

    pub fn get_child_execution_initiated_event(&self, initiated_event_id: i64) -> Option<HistoryEvent> {
        let ci = self.pending_child_execution_info_ids.get(&initiated_event_id)?;
        self.deserialize_event(&ci.initiated_event)
    }

    pub fn get_child_execution_started_event(&self, initiated_event_id: i64) -> Option<HistoryEvent> {
        let ci = self.pending_child_execution_info_ids.get(&initiated_event_id)?;
        self.deserialize_event(ci.started_event.as_deref()?)
    }

    pub fn get_request_cancel_info(&self, initiated_event_id: i64) -> Option<&RequestCancelInfo> {
        self.pending_request_cancel_info_ids.get(&initiated_event_id)
    }

    pub fn get_signal_info(&self, initiated_event_id: i64) -> Option<&SignalInfo> {
        self.pending_signal_info_ids.get(&initiated_event_id)
    }

    pub fn get_user_timer(&self, timer_id: &str) -> Option<&TimerInfo> {
        self.pending_timer_info_ids.get(timer_id)
    }

    /// The workflow completion event, retained only when this run has a
    /// parent awaiting the result.
    pub fn get_completion_event(&self) -> Option<HistoryEvent> {
        let serialized = self.execution_info.completion_event.as_ref()?;
        self.deserialize_event(serialized)
    }

    pub fn get_pending_decision(&self, schedule_event_id: i64) -> Option<DecisionInfo> {
        let di = DecisionInfo {
            schedule_id: self.execution_info.decision_schedule_id,
            started_id: self.execution_info.decision_started_id,
            request_id: self.execution_info.decision_request_id.clone(),
            decision_timeout_seconds: self.execution_info.decision_timeout_seconds,
            task_list: String::new(),
            attempt: self.execution_info.decision_attempt,
            timestamp: self.execution_info.decision_timestamp,
        };
        if schedule_event_id == di.schedule_id {
            return Some(di);
        }
        None
    }

    pub fn is_signal_requested(&self, request_id: &str) -> bool {
        self.pending_signal_requested_ids.contains(request_id)
    }

    fn deserialize_event(&self, serialized: &[u8]) -> Option<HistoryEvent> {
        self.serializer.deserialize(serialized).ok()
    }

    // ------------------------------------------------------------------
    // Pending-collection maintenance
    // ------------------------------------------------------------------

    /// Re-stage an activity after an out-of-band mutation (timer processors
    /// use this to record created timeout tasks).
    pub fn update_activity(&mut self, ai: ActivityInfo) -> Result<(), StateError> {
        if !self.pending_activity_info_ids.contains_key(&ai.schedule_id) {
            return Err(StateError::PendingEntryNotFound {
                entity: "activity",
                key: ai.schedule_id.to_string(),
            });
        }
        self.pending_activity_info_ids.insert(ai.schedule_id, ai.clone());
        self.update_activity_infos.push(ai);
        Ok(())
    }

    /// Record a heartbeat: stores the reported details and refreshes the
    /// last-heartbeat time.
    pub fn update_activity_progress(&mut self, schedule_event_id: i64, details: &str) -> Result<(), StateError> {
        let ai = self.pending_activity_info_ids.get_mut(&schedule_event_id).ok_or(
            StateError::PendingEntryNotFound {
                entity: "activity",
                key: schedule_event_id.to_string(),
            },
        )?;
        ai.details = details.to_string();
        ai.last_heartbeat_updated_time = SystemTime::now();
        let snapshot = ai.clone();
        self.update_activity_infos.push(snapshot);
        Ok(())
    }

    fn delete_activity(&mut self, schedule_event_id: i64) -> Result<(), StateError> {
        let ai = match self.pending_activity_info_ids.remove(&schedule_event_id) {
            Some(ai) => ai,
            None => {
                self.log_invalid_action(
                    "delete-activity",
                    format!("{{ScheduleID: {schedule_event_id}}}"),
                );
                return Err(StateError::PendingEntryNotFound {
                    entity: "activity",
                    key: schedule_event_id.to_string(),
                });
            }
        };

        if self.pending_activity_info_by_activity_id.remove(&ai.activity_id).is_none() {
            self.log_invalid_action("delete-activity", format!("{{ActivityID: {}}}", ai.activity_id));
            return Err(StateError::PendingEntryNotFound {
                entity: "activity",
                key: ai.activity_id,
            });
        }

        self.delete_activity_info = Some(schedule_event_id);
        Ok(())
    }

    /// Re-stage a user timer after an out-of-band mutation.
    pub fn update_user_timer(&mut self, ti: TimerInfo) {
        self.pending_timer_info_ids.insert(ti.timer_id.clone(), ti.clone());
        self.update_timer_infos.push(ti);
    }

    fn delete_user_timer(&mut self, timer_id: &str) -> Result<(), StateError> {
        if self.pending_timer_info_ids.remove(timer_id).is_none() {
            self.log_invalid_action("delete-timer", format!("{{TimerID: {timer_id}}}"));
            return Err(StateError::PendingEntryNotFound {
                entity: "timer",
                key: timer_id.to_string(),
            });
        }
        self.delete_timer_infos.push(timer_id.to_string());
        Ok(())
    }

    fn delete_pending_child_execution(&mut self, initiated_event_id: i64) -> Result<(), StateError> {
        if self.pending_child_execution_info_ids.remove(&initiated_event_id).is_none() {
            self.log_invalid_action(
                "delete-child-execution",
                format!("{{InitiatedID: {initiated_event_id}}}"),
            );
            return Err(StateError::PendingEntryNotFound {
                entity: "child execution",
                key: initiated_event_id.to_string(),
            });
        }
        self.delete_child_execution_info = Some(initiated_event_id);
        Ok(())
    }

    fn delete_pending_request_cancel(&mut self, initiated_event_id: i64) -> Result<(), StateError> {
        if self.pending_request_cancel_info_ids.remove(&initiated_event_id).is_none() {
            self.log_invalid_action(
                "delete-request-cancel",
                format!("{{InitiatedID: {initiated_event_id}}}"),
            );
            return Err(StateError::PendingEntryNotFound {
                entity: "request cancellation",
                key: initiated_event_id.to_string(),
            });
        }
        self.delete_request_cancel_info = Some(initiated_event_id);
        Ok(())
    }

    fn delete_pending_signal(&mut self, initiated_event_id: i64) -> Result<(), StateError> {
        if self.pending_signal_info_ids.remove(&initiated_event_id).is_none() {
            self.log_invalid_action(
                "delete-signal",
                format!("{{InitiatedID: {initiated_event_id}}}"),
            );
            return Err(StateError::PendingEntryNotFound {
                entity: "signal request",
                key: initiated_event_id.to_string(),
            });
        }
        self.delete_signal_info = Some(initiated_event_id);
        Ok(())
    }

    pub fn add_signal_requested(&mut self, request_id: &str) {
        self.pending_signal_requested_ids.insert(request_id.to_string());
        self.update_signal_requested_ids.insert(request_id.to_string());
    }

    pub fn delete_signal_requested(&mut self, request_id: &str) {
        self.pending_signal_requested_ids.remove(request_id);
        self.delete_signal_requested_id = Some(request_id.to_string());
    }

    // ------------------------------------------------------------------
    // Decision state
    // ------------------------------------------------------------------

    fn update_decision(&mut self, di: &DecisionInfo) {
        self.execution_info.decision_schedule_id = di.schedule_id;
        self.execution_info.decision_started_id = di.started_id;
        self.execution_info.decision_request_id = di.request_id.clone();
        self.execution_info.decision_timeout_seconds = di.decision_timeout_seconds;
        self.execution_info.decision_attempt = di.attempt;
        self.execution_info.decision_timestamp = di.timestamp;

        debug!(
            schedule_id = di.schedule_id,
            started_id = di.started_id,
            request_id = %di.request_id,
            timeout = di.decision_timeout_seconds,
            attempt = di.attempt,
            timestamp = di.timestamp,
            "decision updated"
        );
    }

    fn delete_decision(&mut self) {
        let empty = DecisionInfo {
            schedule_id: EMPTY_EVENT_ID,
            started_id: EMPTY_EVENT_ID,
            request_id: EMPTY_UUID.to_string(),
            decision_timeout_seconds: 0,
            task_list: String::new(),
            attempt: 0,
            timestamp: 0,
        };
        self.update_decision(&empty);
    }

    fn fail_decision(&mut self) {
        // stickiness does not survive a failed decision
        self.clear_stickiness();

        let failed = DecisionInfo {
            schedule_id: EMPTY_EVENT_ID,
            started_id: EMPTY_EVENT_ID,
            request_id: EMPTY_UUID.to_string(),
            decision_timeout_seconds: 0,
            task_list: String::new(),
            attempt: self.execution_info.decision_attempt + 1,
            timestamp: 0,
        };
        self.update_decision(&failed);
    }

    /// Drop sticky task-list affinity and the client version triple.
    pub fn clear_stickiness(&mut self) {
        self.execution_info.sticky = None;
    }

    /// Fabricate the scheduled/started events of a transient decision for
    /// dispatch to a worker. Nothing is appended to history.
    pub fn transient_decision_events(&self, di: &DecisionInfo, identity: &str) -> (HistoryEvent, HistoryEvent) {
        let task_list = &self.execution_info.task_list;
        let scheduled_event = new_decision_task_scheduled_event_with_info(
            di.schedule_id,
            di.timestamp,
            task_list,
            di.decision_timeout_seconds,
            di.attempt,
        );
        let started_event = new_decision_task_started_event_with_info(
            di.started_id,
            di.timestamp,
            di.schedule_id,
            &di.request_id,
            identity,
        );
        (scheduled_event, started_event)
    }

    // ------------------------------------------------------------------
    // Workflow lifecycle operations
    // ------------------------------------------------------------------

    pub fn add_workflow_execution_started_event(
        &mut self,
        domain_id: &str,
        execution: &WorkflowExecution,
        request: &StartWorkflowExecutionRequest,
    ) -> Option<HistoryEvent> {
        let event_id = self.get_next_event_id();
        if event_id != FIRST_EVENT_ID {
            self.log_invalid_action("workflow-started", String::new());
            return None;
        }

        self.execution_info.domain_id = domain_id.to_string();
        self.execution_info.workflow_id = execution.workflow_id.clone();
        self.execution_info.run_id = execution.run_id.clone();
        self.execution_info.task_list = request.task_list.clone();
        self.execution_info.workflow_type_name = request.workflow_type_name.clone();
        self.execution_info.workflow_timeout_seconds = request.execution_start_to_close_timeout_seconds;
        self.execution_info.decision_timeout_value_seconds = request.task_start_to_close_timeout_seconds;
        self.execution_info.parent_execution = request.parent_execution.clone();

        self.execution_info.state = WorkflowState::Created;
        self.execution_info.close_status = WorkflowCloseStatus::None;
        self.execution_info.last_processed_event = EMPTY_EVENT_ID;
        self.execution_info.create_request_id = request.request_id.clone();
        self.execution_info.decision_schedule_id = EMPTY_EVENT_ID;
        self.execution_info.decision_started_id = EMPTY_EVENT_ID;
        self.execution_info.decision_request_id = EMPTY_UUID.to_string();
        self.execution_info.decision_timeout_seconds = 0;

        let event_id = self.allocate_event_id(EventType::WorkflowExecutionStarted);
        Some(self.h_builder.add_workflow_execution_started_event(event_id, request))
    }

    fn add_workflow_execution_started_event_for_continue_as_new(
        &mut self,
        domain_id: &str,
        execution: &WorkflowExecution,
        previous: &MutableStateBuilder,
        attributes: &ContinueAsNewWorkflowExecutionAttributes,
    ) -> Option<HistoryEvent> {
        let task_list = attributes
            .task_list
            .clone()
            .unwrap_or_else(|| previous.execution_info.task_list.clone());
        let workflow_type_name = attributes
            .workflow_type_name
            .clone()
            .unwrap_or_else(|| previous.execution_info.workflow_type_name.clone());
        let decision_timeout = attributes
            .task_start_to_close_timeout_seconds
            .unwrap_or(previous.execution_info.decision_timeout_value_seconds);

        let create_request = StartWorkflowExecutionRequest {
            request_id: generate_guid(),
            domain: previous.execution_info.domain_id.clone(),
            workflow_id: execution.workflow_id.clone(),
            workflow_type_name,
            task_list,
            input: attributes.input.clone(),
            execution_start_to_close_timeout_seconds: attributes.execution_start_to_close_timeout_seconds,
            task_start_to_close_timeout_seconds: decision_timeout,
            identity: String::new(),
            parent_execution: None,
        };

        self.add_workflow_execution_started_event(domain_id, execution, &create_request)
    }

    pub fn add_completed_workflow_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &CompleteWorkflowExecutionAttributes,
    ) -> Option<HistoryEvent> {
        if self.execution_info.state == WorkflowState::Completed {
            self.log_invalid_action("complete-workflow", format!("{{State: {:?}}}", self.execution_info.state));
            return None;
        }

        self.execution_info.state = WorkflowState::Completed;
        self.execution_info.close_status = WorkflowCloseStatus::Completed;
        let event_id = self.allocate_event_id(EventType::WorkflowExecutionCompleted);
        let event =
            self.h_builder
                .add_completed_workflow_event(event_id, decision_task_completed_event_id, &attributes.result);
        self.write_completion_event_to_mutable_state(&event);

        Some(event)
    }

    pub fn add_fail_workflow_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &FailWorkflowExecutionAttributes,
    ) -> Option<HistoryEvent> {
        if self.execution_info.state == WorkflowState::Completed {
            self.log_invalid_action("fail-workflow", format!("{{State: {:?}}}", self.execution_info.state));
            return None;
        }

        self.execution_info.state = WorkflowState::Completed;
        self.execution_info.close_status = WorkflowCloseStatus::Failed;
        let event_id = self.allocate_event_id(EventType::WorkflowExecutionFailed);
        let event = self.h_builder.add_fail_workflow_event(
            event_id,
            decision_task_completed_event_id,
            &attributes.reason,
            &attributes.details,
        );
        self.write_completion_event_to_mutable_state(&event);

        Some(event)
    }

    pub fn add_timeout_workflow_event(&mut self) -> Option<HistoryEvent> {
        if self.execution_info.state == WorkflowState::Completed {
            self.log_invalid_action("timeout-workflow", format!("{{State: {:?}}}", self.execution_info.state));
            return None;
        }

        self.execution_info.state = WorkflowState::Completed;
        self.execution_info.close_status = WorkflowCloseStatus::TimedOut;
        let event_id = self.allocate_event_id(EventType::WorkflowExecutionTimedOut);
        let event = self.h_builder.add_timeout_workflow_event(event_id);
        self.write_completion_event_to_mutable_state(&event);

        Some(event)
    }

    pub fn add_workflow_execution_terminated_event(
        &mut self,
        request: &TerminateWorkflowExecutionRequest,
    ) -> Option<HistoryEvent> {
        if self.execution_info.state == WorkflowState::Completed {
            self.log_invalid_action("terminate-workflow", format!("{{State: {:?}}}", self.execution_info.state));
            return None;
        }

        self.execution_info.state = WorkflowState::Completed;
        self.execution_info.close_status = WorkflowCloseStatus::Terminated;
        let event_id = self.allocate_event_id(EventType::WorkflowExecutionTerminated);
        let event = self.h_builder.add_workflow_execution_terminated_event(event_id, request);
        self.write_completion_event_to_mutable_state(&event);

        Some(event)
    }

    pub fn add_workflow_execution_cancel_requested_event(
        &mut self,
        cause: &str,
        request: &RequestCancelWorkflowExecutionRequest,
    ) -> Option<HistoryEvent> {
        if self.execution_info.state == WorkflowState::Completed || self.execution_info.cancel_requested {
            self.log_invalid_action(
                "request-cancel-workflow",
                format!(
                    "{{State: {:?}, CancelRequested: {}, RequestID: {}}}",
                    self.execution_info.state, self.execution_info.cancel_requested, self.execution_info.cancel_request_id
                ),
            );
            return None;
        }

        self.execution_info.cancel_requested = true;
        if let Some(request_id) = &request.cancel_request_id {
            self.execution_info.cancel_request_id = request_id.clone();
        }

        let event_id = self.allocate_event_id(EventType::WorkflowExecutionCancelRequested);
        Some(
            self.h_builder
                .add_workflow_execution_cancel_requested_event(event_id, cause, request),
        )
    }

    /// Cancels the workflow. Logs when the workflow is already closed but
    /// still mutates; the original engine behaves this way and callers rely
    /// on it.
    pub fn add_workflow_execution_canceled_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &CancelWorkflowExecutionAttributes,
    ) -> HistoryEvent {
        if self.execution_info.state == WorkflowState::Completed {
            self.log_invalid_action("cancel-workflow", format!("{{State: {:?}}}", self.execution_info.state));
        }

        self.execution_info.state = WorkflowState::Completed;
        self.execution_info.close_status = WorkflowCloseStatus::Canceled;
        let event_id = self.allocate_event_id(EventType::WorkflowExecutionCanceled);
        let event = self.h_builder.add_workflow_execution_canceled_event(
            event_id,
            decision_task_completed_event_id,
            &attributes.details,
        );
        self.write_completion_event_to_mutable_state(&event);

        event
    }

    pub fn add_workflow_execution_signaled_event(
        &mut self,
        request: &SignalWorkflowExecutionRequest,
    ) -> Option<HistoryEvent> {
        if self.execution_info.state == WorkflowState::Completed {
            self.log_invalid_action("signal-workflow", format!("{{State: {:?}}}", self.execution_info.state));
            return None;
        }

        let event_id = self.allocate_event_id(EventType::WorkflowExecutionSignaled);
        Some(self.h_builder.add_workflow_execution_signaled_event(event_id, request))
    }

    fn write_completion_event_to_mutable_state(&mut self, completion_event: &HistoryEvent) {
        // only a child workflow needs its completion reported upstream
        if !self.has_parent_execution() {
            return;
        }
        match self.serializer.serialize(completion_event) {
            Ok(serialized) => self.execution_info.completion_event = Some(serialized),
            Err(err) => error!(error = %err, "unable to serialize workflow completion event"),
        }
    }

    // ------------------------------------------------------------------
    // Decision task operations
    // ------------------------------------------------------------------

    pub fn add_decision_task_scheduled_event(&mut self) -> Option<DecisionInfo> {
        // task list and decision timeout were fixed by the start event
        let task_list = match &self.execution_info.sticky {
            Some(sticky) => sticky.task_list.clone(),
            None => self.execution_info.task_list.clone(),
        };
        let start_to_close_timeout_seconds = self.execution_info.decision_timeout_value_seconds;

        if self.has_pending_decision_task() {
            self.log_invalid_action(
                "decision-scheduled",
                format!("{{Pending Decision ScheduleID: {}}}", self.execution_info.decision_schedule_id),
            );
            return None;
        }

        // Flush any buffered events before creating the decision, otherwise
        // it will result in invalid IDs for the transient decision and break
        // its timeout processing.
        if self.flush_buffered_events().is_err() {
            return None;
        }

        let mut schedule_id = self.get_next_event_id();
        // repeatedly failing decisions stay transient: the schedule event is
        // generated later, when the decision completes or new events arrive
        if self.execution_info.decision_attempt == 0 {
            let event_id = self.allocate_event_id(EventType::DecisionTaskScheduled);
            let event = self.h_builder.add_decision_task_scheduled_event(
                event_id,
                &task_list,
                start_to_close_timeout_seconds,
                self.execution_info.decision_attempt,
            );
            schedule_id = event.event_id;
        }

        let di = DecisionInfo {
            schedule_id,
            started_id: EMPTY_EVENT_ID,
            request_id: EMPTY_UUID.to_string(),
            decision_timeout_seconds: start_to_close_timeout_seconds,
            task_list,
            attempt: self.execution_info.decision_attempt,
            timestamp: 0,
        };
        self.update_decision(&di);

        Some(di)
    }

    pub fn add_decision_task_started_event(
        &mut self,
        schedule_event_id: i64,
        request_id: &str,
        request: &PollForDecisionTaskRequest,
    ) -> (Option<HistoryEvent>, Option<DecisionInfo>) {
        let has_pending_decision = self.has_pending_decision_task();
        let di = match self.get_pending_decision(schedule_event_id) {
            Some(di) if has_pending_decision && di.started_id == EMPTY_EVENT_ID => di,
            other => {
                let exist = other.is_some();
                self.log_invalid_action(
                    "decision-started",
                    format!(
                        "{{HasPending: {has_pending_decision}, ScheduleID: {schedule_event_id}, Exist: {exist}}}"
                    ),
                );
                return (None, None);
            }
        };

        let mut event = None;
        let mut schedule_id = di.schedule_id;
        let mut started_id = schedule_id + 1;
        let mut attempt = di.attempt;
        let mut timestamp = now_nanos();

        // new events arrived since the transient decision was scheduled:
        // materialise the schedule into history and restart the attempt count
        if attempt > 0 && di.schedule_id != self.get_next_event_id() {
            let event_id = self.allocate_event_id(EventType::DecisionTaskScheduled);
            let schedule_event = self.h_builder.add_decision_task_scheduled_event(
                event_id,
                &request.task_list,
                di.decision_timeout_seconds,
                0,
            );
            schedule_id = schedule_event.event_id;
            attempt = 0;
        }

        // transient decisions leave no started event in history either
        if attempt == 0 {
            let event_id = self.allocate_event_id(EventType::DecisionTaskStarted);
            let started_event =
                self.h_builder
                    .add_decision_task_started_event(event_id, schedule_id, request_id, &request.identity);
            started_id = started_event.event_id;
            timestamp = 0;
            event = Some(started_event);
        }

        self.execution_info.state = WorkflowState::Running;
        let di = DecisionInfo {
            schedule_id,
            started_id,
            request_id: request_id.to_string(),
            decision_timeout_seconds: di.decision_timeout_seconds,
            task_list: String::new(),
            attempt,
            timestamp,
        };
        self.update_decision(&di);

        (event, Some(di))
    }

    pub fn add_decision_task_completed_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
        request: &RespondDecisionTaskCompletedRequest,
    ) -> Option<HistoryEvent> {
        let has_pending_decision = self.has_pending_decision_task();
        let di = match self.get_pending_decision(schedule_event_id) {
            Some(di) if has_pending_decision && di.started_id == started_event_id => di,
            other => {
                let exist = other.is_some();
                self.log_invalid_action(
                    "decision-completed",
                    format!(
                        "{{HasPending: {has_pending_decision}, ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, Exist: {exist}}}"
                    ),
                );
                return None;
            }
        };

        // Make sure to delete the decision before adding events. Otherwise
        // they are buffered rather than getting appended.
        self.delete_decision();

        let mut started_event_id = started_event_id;
        if di.attempt > 0 {
            // materialise the transient decision's scheduled and started
            // events right before the completion
            let task_list = self.execution_info.task_list.clone();
            let event_id = self.allocate_event_id(EventType::DecisionTaskScheduled);
            let scheduled_event = self.h_builder.add_decision_task_scheduled_event(
                event_id,
                &task_list,
                di.decision_timeout_seconds,
                di.attempt,
            );
            let event_id = self.allocate_event_id(EventType::DecisionTaskStarted);
            let started_event = self.h_builder.add_decision_task_started_event(
                event_id,
                scheduled_event.event_id,
                &di.request_id,
                &request.identity,
            );
            started_event_id = started_event.event_id;
        }

        let event_id = self.allocate_event_id(EventType::DecisionTaskCompleted);
        let event =
            self.h_builder
                .add_decision_task_completed_event(event_id, schedule_event_id, started_event_id, request);

        self.execution_info.last_processed_event = started_event_id;
        Some(event)
    }

    pub fn add_decision_task_timed_out_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
    ) -> Option<HistoryEvent> {
        let has_pending_decision = self.has_pending_decision_task();
        let di = match self.get_pending_decision(schedule_event_id) {
            Some(di) if has_pending_decision && di.started_id == started_event_id => di,
            other => {
                let exist = other.is_some();
                self.log_invalid_action(
                    "decision-timedout",
                    format!(
                        "{{HasPending: {has_pending_decision}, ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, Exist: {exist}}}"
                    ),
                );
                return None;
            }
        };

        let mut event = None;
        // only the very first timeout of a retry streak leaves a trace
        if di.attempt == 0 {
            let event_id = self.allocate_event_id(EventType::DecisionTaskTimedOut);
            event = Some(self.h_builder.add_decision_task_timed_out_event(
                event_id,
                schedule_event_id,
                started_event_id,
                TimeoutType::StartToClose,
            ));
        }

        self.fail_decision();
        event
    }

    /// A scheduled decision was never claimed. Not subject to attempt
    /// suppression; always clears stickiness.
    pub fn add_decision_task_schedule_to_start_timed_out_event(&mut self, schedule_event_id: i64) -> Option<HistoryEvent> {
        if self.execution_info.decision_schedule_id != schedule_event_id || self.execution_info.decision_started_id > 0
        {
            self.log_invalid_action(
                "decision-timedout",
                format!(
                    "{{DecisionScheduleID: {}, DecisionStartedID: {}, ScheduleEventID: {schedule_event_id}}}",
                    self.execution_info.decision_schedule_id, self.execution_info.decision_started_id
                ),
            );
            return None;
        }

        self.clear_stickiness();

        let event_id = self.allocate_event_id(EventType::DecisionTaskTimedOut);
        let event = self.h_builder.add_decision_task_timed_out_event(
            event_id,
            schedule_event_id,
            0,
            TimeoutType::ScheduleToStart,
        );

        self.delete_decision();
        Some(event)
    }

    pub fn add_decision_task_failed_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
        cause: DecisionTaskFailedCause,
        details: &str,
        identity: &str,
    ) -> Option<HistoryEvent> {
        let has_pending_decision = self.has_pending_decision_task();
        let di = match self.get_pending_decision(schedule_event_id) {
            Some(di) if has_pending_decision && di.started_id == started_event_id => di,
            other => {
                let exist = other.is_some();
                self.log_invalid_action(
                    "decision-failed",
                    format!(
                        "{{HasPending: {has_pending_decision}, ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, Exist: {exist}}}"
                    ),
                );
                return None;
            }
        };

        let mut event = None;
        // only emit the failure event for the very first attempt
        if di.attempt == 0 {
            let event_id = self.allocate_event_id(EventType::DecisionTaskFailed);
            event = Some(self.h_builder.add_decision_task_failed_event(
                event_id,
                schedule_event_id,
                started_event_id,
                cause,
                details,
                identity,
            ));
        }

        self.fail_decision();
        event
    }

    // ------------------------------------------------------------------
    // Activity operations
    // ------------------------------------------------------------------

    pub fn add_activity_task_scheduled_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &ScheduleActivityTaskAttributes,
    ) -> Option<(HistoryEvent, ActivityInfo)> {
        if let Some(ai) = self.get_activity_info(self.get_next_event_id()) {
            let (schedule_id, started_id) = (ai.schedule_id, ai.started_id);
            self.log_invalid_action(
                "activity-scheduled",
                format!("{{Exist: true, ScheduleID: {schedule_id}, StartedID: {started_id}}}"),
            );
            return None;
        }

        let activity_id = attributes.activity_id.clone()?;

        // both indexes must be vacant; a duplicate activity ID rejects
        if self.pending_activity_info_by_activity_id.contains_key(&activity_id) {
            self.log_invalid_action("activity-scheduled", format!("{{Duplicate ActivityID: {activity_id}}}"));
            return None;
        }
        // a second buffered schedule would collide on the sentinel key
        if self.pending_activity_info_ids.contains_key(&BUFFERED_EVENT_ID) {
            self.log_invalid_action("activity-scheduled", format!("{{Buffered ActivityID: {activity_id}}}"));
            return None;
        }

        let schedule_to_start_timeout = match attributes.schedule_to_start_timeout_seconds {
            Some(timeout) if timeout > 0 => timeout,
            _ => self.config.default_schedule_to_start_activity_timeout_seconds,
        };
        let schedule_to_close_timeout = match attributes.schedule_to_close_timeout_seconds {
            Some(timeout) if timeout > 0 => timeout,
            _ => self.config.default_schedule_to_close_activity_timeout_seconds,
        };
        let start_to_close_timeout = match attributes.start_to_close_timeout_seconds {
            Some(timeout) if timeout > 0 => timeout,
            _ => self.config.default_start_to_close_activity_timeout_seconds,
        };
        let heartbeat_timeout = attributes
            .heartbeat_timeout_seconds
            .unwrap_or(self.config.default_heartbeat_activity_timeout_seconds);

        let event_id = self.allocate_event_id(EventType::ActivityTaskScheduled);
        let event = self.h_builder.add_activity_task_scheduled_event(
            event_id,
            decision_task_completed_event_id,
            &activity_id,
            &attributes.activity_type_name,
            &attributes.task_list,
            &attributes.input,
            schedule_to_close_timeout,
            schedule_to_start_timeout,
            start_to_close_timeout,
            heartbeat_timeout,
        );

        let scheduled_event = self.serializer.serialize(&event).ok()?;

        let schedule_event_id = event.event_id;
        let ai = ActivityInfo {
            schedule_id: schedule_event_id,
            scheduled_event,
            scheduled_time: system_time_from_nanos(event.timestamp),
            started_id: EMPTY_EVENT_ID,
            started_time: UNIX_EPOCH,
            activity_id: activity_id.clone(),
            request_id: String::new(),
            details: String::new(),
            schedule_to_start_timeout_seconds: schedule_to_start_timeout,
            schedule_to_close_timeout_seconds: schedule_to_close_timeout,
            start_to_close_timeout_seconds: start_to_close_timeout,
            heartbeat_timeout_seconds: heartbeat_timeout,
            cancel_requested: false,
            cancel_request_id: EMPTY_EVENT_ID,
            last_heartbeat_updated_time: UNIX_EPOCH,
            timer_task_status: TIMER_TASK_STATUS_NONE,
        };

        self.pending_activity_info_ids.insert(schedule_event_id, ai.clone());
        self.pending_activity_info_by_activity_id
            .insert(activity_id, schedule_event_id);
        self.update_activity_infos.push(ai.clone());

        Some((event, ai))
    }

    pub fn add_activity_task_started_event(
        &mut self,
        schedule_event_id: i64,
        request_id: &str,
        request: &PollForActivityTaskRequest,
    ) -> Option<HistoryEvent> {
        match self.get_activity_info(schedule_event_id) {
            Some(ai) if ai.started_id == EMPTY_EVENT_ID => {}
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "activity-started",
                    format!("{{ScheduleID: {schedule_event_id}, Exist: {exist}}}"),
                );
                return None;
            }
        }

        let event_id = self.allocate_event_id(EventType::ActivityTaskStarted);
        let event = self
            .h_builder
            .add_activity_task_started_event(event_id, schedule_event_id, request_id, request);

        if let Some(ai) = self.pending_activity_info_ids.get_mut(&schedule_event_id) {
            // started_id may still be the buffered sentinel here; the buffer
            // engine patches it at flush
            ai.started_id = event.event_id;
            ai.request_id = request_id.to_string();
            ai.started_time = system_time_from_nanos(event.timestamp);
            let snapshot = ai.clone();
            self.update_activity_infos.push(snapshot);
        }

        Some(event)
    }

    pub fn add_activity_task_completed_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
        request: &RespondActivityTaskCompletedRequest,
    ) -> Option<HistoryEvent> {
        match self.get_activity_info(schedule_event_id) {
            Some(ai) if ai.started_id == started_event_id => {}
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "activity-completed",
                    format!("{{ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, Exist: {exist}}}"),
                );
                return None;
            }
        }

        self.delete_activity(schedule_event_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ActivityTaskCompleted);
        Some(
            self.h_builder
                .add_activity_task_completed_event(event_id, schedule_event_id, started_event_id, request),
        )
    }

    pub fn add_activity_task_failed_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
        request: &RespondActivityTaskFailedRequest,
    ) -> Option<HistoryEvent> {
        match self.get_activity_info(schedule_event_id) {
            Some(ai) if ai.started_id == started_event_id => {}
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "activity-failed",
                    format!("{{ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, Exist: {exist}}}"),
                );
                return None;
            }
        }

        self.delete_activity(schedule_event_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ActivityTaskFailed);
        Some(
            self.h_builder
                .add_activity_task_failed_event(event_id, schedule_event_id, started_event_id, request),
        )
    }

    pub fn add_activity_task_timed_out_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
        timeout_type: TimeoutType,
        last_heartbeat_details: &str,
    ) -> Option<HistoryEvent> {
        match self.get_activity_info(schedule_event_id) {
            Some(ai)
                if ai.started_id == started_event_id
                    && !(matches!(timeout_type, TimeoutType::StartToClose | TimeoutType::Heartbeat)
                        && ai.started_id == EMPTY_EVENT_ID) => {}
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "activity-timedout",
                    format!(
                        "{{ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, TimeoutType: {timeout_type:?}, Exist: {exist}}}"
                    ),
                );
                return None;
            }
        }

        self.delete_activity(schedule_event_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ActivityTaskTimedOut);
        Some(self.h_builder.add_activity_task_timed_out_event(
            event_id,
            schedule_event_id,
            started_event_id,
            timeout_type,
            last_heartbeat_details,
        ))
    }

    /// The cancel-requested event is recorded before the lookup; a stale
    /// activity ID leaves the event in history and reports failure to the
    /// caller, matching the original engine.
    pub fn add_activity_task_cancel_requested_event(
        &mut self,
        decision_task_completed_event_id: i64,
        activity_id: &str,
    ) -> Option<(HistoryEvent, ActivityInfo)> {
        let event_id = self.allocate_event_id(EventType::ActivityTaskCancelRequested);
        let event =
            self.h_builder
                .add_activity_task_cancel_requested_event(event_id, decision_task_completed_event_id, activity_id);

        let schedule_id = match self.get_activity_by_activity_id(activity_id) {
            Some(ai) if !ai.cancel_requested => ai.schedule_id,
            existing => {
                let is_running = existing.is_some();
                self.log_invalid_action(
                    "activity-cancel-requested",
                    format!("{{IsRunning: {is_running}, ActivityID: {activity_id}}}"),
                );
                return None;
            }
        };

        // The activity may not be heartbeating, but the worker still observes
        // the cancellation when it next reports progress.
        let ai = self.pending_activity_info_ids.get_mut(&schedule_id)?;
        ai.cancel_requested = true;
        ai.cancel_request_id = event.event_id;
        let snapshot = ai.clone();
        self.update_activity_infos.push(snapshot.clone());

        Some((event, snapshot))
    }

    pub fn add_request_cancel_activity_task_failed_event(
        &mut self,
        decision_task_completed_event_id: i64,
        activity_id: &str,
        cause: &str,
    ) -> HistoryEvent {
        let event_id = self.allocate_event_id(EventType::RequestCancelActivityTaskFailed);
        self.h_builder
            .add_request_cancel_activity_task_failed_event(event_id, decision_task_completed_event_id, activity_id, cause)
    }

    pub fn add_activity_task_canceled_event(
        &mut self,
        schedule_event_id: i64,
        started_event_id: i64,
        latest_cancel_requested_event_id: i64,
        details: &str,
        identity: &str,
    ) -> Option<HistoryEvent> {
        match self.get_activity_info(schedule_event_id) {
            Some(ai) if ai.started_id == started_event_id => {
                // verify an outstanding cancel request as well
                if !ai.cancel_requested {
                    let activity_id = ai.activity_id.clone();
                    self.log_invalid_action(
                        "activity-canceled",
                        format!(
                            "{{No outstanding cancel request. ScheduleID: {schedule_event_id}, ActivityID: {activity_id}}}"
                        ),
                    );
                    return None;
                }
            }
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "activity-canceled",
                    format!("{{ScheduleID: {schedule_event_id}, StartedID: {started_event_id}, Exist: {exist}}}"),
                );
                return None;
            }
        }

        self.delete_activity(schedule_event_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ActivityTaskCanceled);
        Some(self.h_builder.add_activity_task_canceled_event(
            event_id,
            schedule_event_id,
            started_event_id,
            latest_cancel_requested_event_id,
            details,
            identity,
        ))
    }

    // ------------------------------------------------------------------
    // Timer operations
    // ------------------------------------------------------------------

    pub fn add_timer_started_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &StartTimerAttributes,
    ) -> Option<(HistoryEvent, TimerInfo)> {
        let timer_id = attributes.timer_id.clone();
        if let Some(ti) = self.get_user_timer(&timer_id) {
            let started_id = ti.started_id;
            self.log_invalid_action(
                "timer-started",
                format!("{{IsTimerRunning: true, TimerID: {timer_id}, StartedID: {started_id}}}"),
            );
            return None;
        }

        let event_id = self.allocate_event_id(EventType::TimerStarted);
        let event = self
            .h_builder
            .add_timer_started_event(event_id, decision_task_completed_event_id, attributes);

        // TODO: account for clock skew between history hosts when computing
        // the expiry.
        let fire_timeout = Duration::from_secs(attributes.start_to_fire_timeout_seconds.max(0) as u64);
        let expiry_time = SystemTime::now() + fire_timeout;
        let ti = TimerInfo {
            timer_id: timer_id.clone(),
            expiry_time,
            started_id: event.event_id,
            task_status: TIMER_TASK_STATUS_NONE as i64,
        };

        self.pending_timer_info_ids.insert(timer_id, ti.clone());
        self.update_timer_infos.push(ti.clone());

        Some((event, ti))
    }

    pub fn add_timer_fired_event(&mut self, started_event_id: i64, timer_id: &str) -> Option<HistoryEvent> {
        if self.get_user_timer(timer_id).is_none() {
            self.log_invalid_action(
                "timer-fired",
                format!("{{StartedEventID: {started_event_id}, Exist: false, TimerID: {timer_id}}}"),
            );
            return None;
        }

        self.delete_user_timer(timer_id).ok()?;

        let event_id = self.allocate_event_id(EventType::TimerFired);
        Some(self.h_builder.add_timer_fired_event(event_id, started_event_id, timer_id))
    }

    pub fn add_timer_canceled_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &CancelTimerAttributes,
        identity: &str,
    ) -> Option<HistoryEvent> {
        let timer_id = attributes.timer_id.clone();
        let started_id = match self.get_user_timer(&timer_id) {
            Some(ti) => ti.started_id,
            None => {
                self.log_invalid_action(
                    "timer-canceled",
                    format!("{{IsTimerRunning: false, TimerID: {timer_id}}}"),
                );
                return None;
            }
        };

        self.delete_user_timer(&timer_id).ok()?;

        let event_id = self.allocate_event_id(EventType::TimerCanceled);
        Some(self.h_builder.add_timer_canceled_event(
            event_id,
            started_id,
            decision_task_completed_event_id,
            &timer_id,
            identity,
        ))
    }

    /// No-op event recording a cancel decision against an unknown timer.
    pub fn add_cancel_timer_failed_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &CancelTimerAttributes,
        identity: &str,
    ) -> HistoryEvent {
        let event_id = self.allocate_event_id(EventType::CancelTimerFailed);
        self.h_builder.add_cancel_timer_failed_event(
            event_id,
            &attributes.timer_id,
            decision_task_completed_event_id,
            TIMER_CANCELLATION_MSG_TIMER_ID_UNKNOWN,
            identity,
        )
    }

    pub fn add_record_marker_event(
        &mut self,
        decision_task_completed_event_id: i64,
        attributes: &RecordMarkerAttributes,
    ) -> HistoryEvent {
        let event_id = self.allocate_event_id(EventType::MarkerRecorded);
        self.h_builder
            .add_marker_recorded_event(event_id, decision_task_completed_event_id, attributes)
    }

    // ------------------------------------------------------------------
    // External cancel / signal operations
    // ------------------------------------------------------------------

    pub fn add_request_cancel_external_workflow_execution_initiated_event(
        &mut self,
        decision_task_completed_event_id: i64,
        cancel_request_id: &str,
        attributes: &RequestCancelExternalWorkflowExecutionAttributes,
    ) -> Option<(HistoryEvent, RequestCancelInfo)> {
        let event_id = self.allocate_event_id(EventType::RequestCancelExternalWorkflowExecutionInitiated);
        let event = self.h_builder.add_request_cancel_external_workflow_execution_initiated_event(
            event_id,
            decision_task_completed_event_id,
            attributes,
        );

        let initiated_event_id = event.event_id;
        let ri = RequestCancelInfo {
            initiated_id: initiated_event_id,
            cancel_request_id: cancel_request_id.to_string(),
        };

        self.pending_request_cancel_info_ids.insert(initiated_event_id, ri.clone());
        self.update_request_cancel_infos.push(ri.clone());

        Some((event, ri))
    }

    pub fn add_external_workflow_execution_cancel_requested_event(
        &mut self,
        initiated_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
    ) -> Option<HistoryEvent> {
        if self.get_request_cancel_info(initiated_id).is_none() {
            self.log_invalid_action(
                "external-workflow-cancel-requested",
                format!("{{InitiatedID: {initiated_id}, Exist: false}}"),
            );
            return None;
        }

        self.delete_pending_request_cancel(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ExternalWorkflowExecutionCancelRequested);
        Some(self.h_builder.add_external_workflow_execution_cancel_requested_event(
            event_id,
            initiated_id,
            domain,
            workflow_id,
            run_id,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_request_cancel_external_workflow_execution_failed_event(
        &mut self,
        decision_task_completed_event_id: i64,
        initiated_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
        cause: CancelExternalWorkflowExecutionFailedCause,
    ) -> Option<HistoryEvent> {
        if self.get_request_cancel_info(initiated_id).is_none() {
            self.log_invalid_action(
                "external-workflow-cancel-failed",
                format!("{{InitiatedID: {initiated_id}, Exist: false}}"),
            );
            return None;
        }

        self.delete_pending_request_cancel(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::RequestCancelExternalWorkflowExecutionFailed);
        Some(self.h_builder.add_request_cancel_external_workflow_execution_failed_event(
            event_id,
            decision_task_completed_event_id,
            initiated_id,
            domain,
            workflow_id,
            run_id,
            cause,
        ))
    }

    pub fn add_signal_external_workflow_execution_initiated_event(
        &mut self,
        decision_task_completed_event_id: i64,
        signal_request_id: &str,
        attributes: &SignalExternalWorkflowExecutionAttributes,
    ) -> Option<HistoryEvent> {
        let event_id = self.allocate_event_id(EventType::SignalExternalWorkflowExecutionInitiated);
        let event = self.h_builder.add_signal_external_workflow_execution_initiated_event(
            event_id,
            decision_task_completed_event_id,
            attributes,
        );

        let initiated_event_id = event.event_id;
        let si = SignalInfo {
            initiated_id: initiated_event_id,
            signal_request_id: signal_request_id.to_string(),
            signal_name: attributes.signal_name.clone(),
            input: attributes.input.clone(),
            control: attributes.control.clone(),
        };

        self.pending_signal_info_ids.insert(initiated_event_id, si.clone());
        self.update_signal_infos.push(si);

        Some(event)
    }

    pub fn add_external_workflow_execution_signaled_event(
        &mut self,
        initiated_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
        control: &str,
    ) -> Option<HistoryEvent> {
        if self.get_signal_info(initiated_id).is_none() {
            self.log_invalid_action(
                "external-workflow-signaled",
                format!("{{InitiatedID: {initiated_id}, Exist: false}}"),
            );
            return None;
        }

        self.delete_pending_signal(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ExternalWorkflowExecutionSignaled);
        Some(self.h_builder.add_external_workflow_execution_signaled_event(
            event_id,
            initiated_id,
            domain,
            workflow_id,
            run_id,
            control,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_signal_external_workflow_execution_failed_event(
        &mut self,
        decision_task_completed_event_id: i64,
        initiated_id: i64,
        domain: &str,
        workflow_id: &str,
        run_id: &str,
        control: &str,
        cause: SignalExternalWorkflowExecutionFailedCause,
    ) -> Option<HistoryEvent> {
        if self.get_signal_info(initiated_id).is_none() {
            self.log_invalid_action(
                "external-workflow-signal-failed",
                format!("{{InitiatedID: {initiated_id}, Exist: false}}"),
            );
            return None;
        }

        self.delete_pending_signal(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::SignalExternalWorkflowExecutionFailed);
        Some(self.h_builder.add_signal_external_workflow_execution_failed_event(
            event_id,
            decision_task_completed_event_id,
            initiated_id,
            domain,
            workflow_id,
            run_id,
            control,
            cause,
        ))
    }

    // ------------------------------------------------------------------
    // Continue-as-new
    // ------------------------------------------------------------------

    /// Close this run as ContinuedAsNew and build the successor's mutable
    /// state, staging the create request for the same atomic write.
    pub fn add_continue_as_new_event(
        &mut self,
        decision_task_completed_event_id: i64,
        domain_id: &str,
        new_run_id: &str,
        attributes: &ContinueAsNewWorkflowExecutionAttributes,
    ) -> Result<(HistoryEvent, MutableStateBuilder), StateError> {
        if self.has_pending_tasks() || self.has_pending_decision_task() {
            // outstanding work is abandoned with the old run; worth a trace
            warn!(
                outstanding_activity_tasks = self.pending_activity_info_ids.len(),
                has_pending_decision = self.has_pending_decision_task(),
                "continue-as-new with outstanding tasks"
            );
        }

        let prev_run_id = self.execution_info.run_id.clone();
        self.execution_info.state = WorkflowState::Completed;
        self.execution_info.close_status = WorkflowCloseStatus::ContinuedAsNew;
        let new_execution = WorkflowExecution {
            workflow_id: self.execution_info.workflow_id.clone(),
            run_id: new_run_id.to_string(),
        };

        let mut new_state = MutableStateBuilder::new(self.config.clone());
        if new_state
            .add_workflow_execution_started_event_for_continue_as_new(domain_id, &new_execution, self, attributes)
            .is_none()
        {
            return Err(StateError::InternalService(
                "failed to add workflow execution started event".to_string(),
            ));
        }
        let di = new_state
            .add_decision_task_scheduled_event()
            .ok_or_else(|| StateError::InternalService("failed to add decision scheduled event".to_string()))?;

        self.continue_as_new = Some(CreateWorkflowExecutionRequest {
            request_id: generate_guid(),
            domain_id: domain_id.to_string(),
            execution: new_execution,
            parent_execution: self.execution_info.parent_execution.clone(),
            task_list: new_state.execution_info.task_list.clone(),
            workflow_type_name: new_state.execution_info.workflow_type_name.clone(),
            workflow_timeout_seconds: new_state.execution_info.workflow_timeout_seconds,
            decision_timeout_value_seconds: new_state.execution_info.decision_timeout_value_seconds,
            next_event_id: new_state.get_next_event_id(),
            last_processed_event: EMPTY_EVENT_ID,
            transfer_tasks: vec![TransferTask::Decision {
                domain_id: domain_id.to_string(),
                task_list: new_state.execution_info.task_list.clone(),
                schedule_id: di.schedule_id,
            }],
            decision_schedule_id: di.schedule_id,
            decision_started_id: di.started_id,
            decision_start_to_close_timeout_seconds: di.decision_timeout_seconds,
            continue_as_new: true,
            previous_run_id: prev_run_id,
        });

        let workflow_type_name = new_state.execution_info.workflow_type_name.clone();
        let task_list = new_state.execution_info.task_list.clone();
        let decision_timeout = new_state.execution_info.decision_timeout_value_seconds;
        let event_id = self.allocate_event_id(EventType::WorkflowExecutionContinuedAsNew);
        let event = self.h_builder.add_continued_as_new_event(
            event_id,
            decision_task_completed_event_id,
            new_run_id,
            &workflow_type_name,
            &task_list,
            &attributes.input,
            attributes.execution_start_to_close_timeout_seconds,
            decision_timeout,
        );

        Ok((event, new_state))
    }

    // ------------------------------------------------------------------
    // Child workflow operations
    // ------------------------------------------------------------------

    pub fn add_start_child_workflow_execution_initiated_event(
        &mut self,
        decision_task_completed_event_id: i64,
        create_request_id: &str,
        attributes: &StartChildWorkflowExecutionAttributes,
    ) -> Option<(HistoryEvent, ChildExecutionInfo)> {
        let event_id = self.allocate_event_id(EventType::StartChildWorkflowExecutionInitiated);
        let event = self.h_builder.add_start_child_workflow_execution_initiated_event(
            event_id,
            decision_task_completed_event_id,
            attributes,
        );

        let initiated_event = self.serializer.serialize(&event).ok()?;

        let initiated_event_id = event.event_id;
        let ci = ChildExecutionInfo {
            initiated_id: initiated_event_id,
            initiated_event,
            started_id: EMPTY_EVENT_ID,
            started_event: None,
            create_request_id: create_request_id.to_string(),
        };

        self.pending_child_execution_info_ids
            .insert(initiated_event_id, ci.clone());
        self.update_child_execution_infos.push(ci.clone());

        Some((event, ci))
    }

    pub fn add_child_workflow_execution_started_event(
        &mut self,
        domain: &str,
        execution: &WorkflowExecution,
        workflow_type_name: &str,
        initiated_id: i64,
    ) -> Option<HistoryEvent> {
        match self.get_child_execution_info(initiated_id) {
            Some(ci) if ci.started_id == EMPTY_EVENT_ID => {}
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "child-execution-started",
                    format!("{{InitiatedID: {initiated_id}, Exist: {exist}}}"),
                );
                return None;
            }
        }

        let event_id = self.allocate_event_id(EventType::ChildWorkflowExecutionStarted);
        let event = self.h_builder.add_child_workflow_execution_started_event(
            event_id,
            domain,
            execution,
            workflow_type_name,
            initiated_id,
        );

        let started_event = self.serializer.serialize(&event).ok()?;

        if let Some(ci) = self.pending_child_execution_info_ids.get_mut(&initiated_id) {
            ci.started_id = event.event_id;
            ci.started_event = Some(started_event);
            let snapshot = ci.clone();
            self.update_child_execution_infos.push(snapshot);
        }

        Some(event)
    }

    pub fn add_start_child_workflow_execution_failed_event(
        &mut self,
        initiated_id: i64,
        cause: ChildWorkflowExecutionFailedCause,
        decision_task_completed_event_id: i64,
    ) -> Option<HistoryEvent> {
        let initiated_event = match self.get_child_execution_info(initiated_id) {
            Some(ci) if ci.started_id == EMPTY_EVENT_ID => self.deserialize_event(&ci.initiated_event)?,
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(
                    "start-child-execution-failed",
                    format!("{{InitiatedID: {initiated_id}, Exist: {exist}}}"),
                );
                return None;
            }
        };

        let (domain, workflow_id, workflow_type_name, control) = match initiated_event.attributes {
            EventAttributes::StartChildWorkflowExecutionInitiated {
                domain,
                workflow_id,
                workflow_type_name,
                control,
                ..
            } => (domain, workflow_id, workflow_type_name, control),
            _ => return None,
        };

        self.delete_pending_child_execution(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::StartChildWorkflowExecutionFailed);
        Some(self.h_builder.add_start_child_workflow_execution_failed_event(
            event_id,
            initiated_id,
            cause,
            &domain,
            &workflow_id,
            &workflow_type_name,
            &control,
            decision_task_completed_event_id,
        ))
    }

    /// Domain and workflow type of the child come from the stored started
    /// event; the pending entry is deleted on success.
    fn child_execution_close_context(&self, initiated_id: i64, action: &str) -> Option<(String, String, i64)> {
        let ci = match self.get_child_execution_info(initiated_id) {
            Some(ci) if ci.started_id != EMPTY_EVENT_ID => ci,
            existing => {
                let exist = existing.is_some();
                self.log_invalid_action(action, format!("{{InitiatedID: {initiated_id}, Exist: {exist}}}"));
                return None;
            }
        };

        let started_event = self.deserialize_event(ci.started_event.as_deref()?)?;
        match started_event.attributes {
            EventAttributes::ChildWorkflowExecutionStarted {
                domain, workflow_type_name, ..
            } => Some((domain, workflow_type_name, ci.started_id)),
            _ => None,
        }
    }

    pub fn add_child_workflow_execution_completed_event(
        &mut self,
        initiated_id: i64,
        child_execution: &WorkflowExecution,
        result: &str,
    ) -> Option<HistoryEvent> {
        let (domain, workflow_type_name, started_id) =
            self.child_execution_close_context(initiated_id, "child-execution-completed")?;

        self.delete_pending_child_execution(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ChildWorkflowExecutionCompleted);
        Some(self.h_builder.add_child_workflow_execution_completed_event(
            event_id,
            &domain,
            child_execution,
            &workflow_type_name,
            initiated_id,
            started_id,
            result,
        ))
    }

    pub fn add_child_workflow_execution_failed_event(
        &mut self,
        initiated_id: i64,
        child_execution: &WorkflowExecution,
        reason: &str,
        details: &str,
    ) -> Option<HistoryEvent> {
        let (domain, workflow_type_name, started_id) =
            self.child_execution_close_context(initiated_id, "child-execution-failed")?;

        self.delete_pending_child_execution(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ChildWorkflowExecutionFailed);
        Some(self.h_builder.add_child_workflow_execution_failed_event(
            event_id,
            &domain,
            child_execution,
            &workflow_type_name,
            initiated_id,
            started_id,
            reason,
            details,
        ))
    }

    pub fn add_child_workflow_execution_canceled_event(
        &mut self,
        initiated_id: i64,
        child_execution: &WorkflowExecution,
        details: &str,
    ) -> Option<HistoryEvent> {
        let (domain, workflow_type_name, started_id) =
            self.child_execution_close_context(initiated_id, "child-execution-canceled")?;

        self.delete_pending_child_execution(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ChildWorkflowExecutionCanceled);
        Some(self.h_builder.add_child_workflow_execution_canceled_event(
            event_id,
            &domain,
            child_execution,
            &workflow_type_name,
            initiated_id,
            started_id,
            details,
        ))
    }

    pub fn add_child_workflow_execution_terminated_event(
        &mut self,
        initiated_id: i64,
        child_execution: &WorkflowExecution,
    ) -> Option<HistoryEvent> {
        let (domain, workflow_type_name, started_id) =
            self.child_execution_close_context(initiated_id, "child-execution-terminated")?;

        self.delete_pending_child_execution(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ChildWorkflowExecutionTerminated);
        Some(self.h_builder.add_child_workflow_execution_terminated_event(
            event_id,
            &domain,
            child_execution,
            &workflow_type_name,
            initiated_id,
            started_id,
        ))
    }

    pub fn add_child_workflow_execution_timed_out_event(
        &mut self,
        initiated_id: i64,
        child_execution: &WorkflowExecution,
        timeout_type: TimeoutType,
    ) -> Option<HistoryEvent> {
        let (domain, workflow_type_name, started_id) =
            self.child_execution_close_context(initiated_id, "child-execution-timedout")?;

        self.delete_pending_child_execution(initiated_id).ok()?;

        let event_id = self.allocate_event_id(EventType::ChildWorkflowExecutionTimedOut);
        Some(self.h_builder.add_child_workflow_execution_timed_out_event(
            event_id,
            &domain,
            child_execution,
            &workflow_type_name,
            initiated_id,
            started_id,
            timeout_type,
        ))
    }
}

fn system_time_from_nanos(nanos: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos.max(0) as u64)
}

fn system_time_to_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as i64).unwrap_or(0)
}
