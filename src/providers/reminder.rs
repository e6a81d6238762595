//! Milestone reminders
//!
//! Reads every candidate record, checks each configured milestone offset
//! against the run window and creates one notification per recipient that
//! has at least one milestone due. The notifications are independent, so a
//! partial failure is reported as such and nothing is rolled back.

use crate::adapters::store::bind_lookup;
use crate::config::ReminderConfig;
use crate::core::paging::{QueryTemplate, RecordQuery};
use crate::core::provider::{Engine, ProcessProvider, RunContext};
use crate::core::reminder::{due_offsets, ReminderWindow};
use crate::domain::{
    EngineError, EntityName, Payload, PendingOperation, ProcessResult, Record, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// Provider name used on the command line and as the state key
pub const REMINDER_PROVIDER: &str = "reminders";

/// Lookup on a notification pointing at the record that triggered it
pub const REGARDING_LOOKUP: &str = "regarding";

/// Creates notifications for milestones falling inside the run window
#[derive(Debug, Clone)]
pub struct ReminderProvider {
    config: ReminderConfig,
    query: RecordQuery,
    notification_entity: EntityName,
}

impl ReminderProvider {
    /// Creates a provider from its configuration section
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if an entity name is invalid.
    pub fn new(config: ReminderConfig) -> Result<Self> {
        let entity = EntityName::new(&config.entity).map_err(EngineError::Configuration)?;
        let notification_entity =
            EntityName::new(&config.notification_entity).map_err(EngineError::Configuration)?;
        let query = RecordQuery::new(
            entity,
            config.id_field.clone(),
            QueryTemplate::new(config.query.clone()),
        );

        Ok(Self {
            config,
            query,
            notification_entity,
        })
    }

    fn notification(
        &self,
        record: &Record,
        recipient: &str,
        milestone: i64,
        window: &ReminderWindow,
    ) -> PendingOperation {
        let mut payload = Payload::new();
        payload.insert("recipient".to_string(), Value::String(recipient.to_string()));
        payload.insert("milestone_days".to_string(), Value::from(milestone));
        payload.insert(
            "due_window_start".to_string(),
            Value::String(window.start().to_rfc3339()),
        );
        payload.insert(
            "due_window_end".to_string(),
            Value::String(window.end().to_rfc3339()),
        );
        bind_lookup(&mut payload, REGARDING_LOOKUP, &record.reference());

        PendingOperation::create(self.notification_entity.clone(), payload)
    }
}

#[async_trait]
impl ProcessProvider for ReminderProvider {
    type Dataset = Vec<Record>;
    type Plan = Vec<PendingOperation>;

    fn name(&self) -> &str {
        REMINDER_PROVIDER
    }

    async fn read(&self, ctx: &RunContext, engine: &Engine) -> Result<Self::Dataset> {
        ctx.require_window()?;
        let records = engine.reader(ctx.cancellation()).read_all(&self.query).await?;
        tracing::info!(
            entity = %self.query.entity,
            records = records.len(),
            "Candidate records read"
        );
        Ok(records)
    }

    fn transform(&self, ctx: &RunContext, dataset: Self::Dataset) -> Result<Self::Plan> {
        let window = ctx.require_window()?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut plan = Vec::new();
        let mut skipped = 0usize;

        for record in &dataset {
            let Some(anchor) = record.get_datetime(&self.config.anchor_field) else {
                skipped += 1;
                tracing::debug!(
                    record = %record.reference(),
                    field = %self.config.anchor_field,
                    "Record has no anchor date"
                );
                continue;
            };

            let due = due_offsets(anchor, &self.config.offsets_days, &window);
            let Some(&milestone) = due.first() else {
                continue;
            };

            let Some(recipient) = record.get_str(&self.config.recipient_field) else {
                skipped += 1;
                tracing::warn!(
                    record = %record.reference(),
                    field = %self.config.recipient_field,
                    "Due record has no recipient"
                );
                continue;
            };

            // One notification per recipient, first due record wins
            if seen.insert(recipient.to_string()) {
                plan.push(self.notification(record, recipient, milestone, &window));
            }
        }

        tracing::info!(
            window = %window,
            candidates = dataset.len(),
            notifications = plan.len(),
            skipped = skipped,
            "Due reminders evaluated"
        );
        Ok(plan)
    }

    fn planned_operations(&self, plan: &Self::Plan) -> usize {
        plan.len()
    }

    async fn write(
        &self,
        ctx: &mut RunContext,
        engine: &Engine,
        plan: Self::Plan,
    ) -> Result<ProcessResult> {
        if plan.is_empty() {
            tracing::info!("No reminders due");
            return Ok(ProcessResult::success(0));
        }

        let outcome = engine.writer(ctx.cancellation()).write(&plan).await?;
        for error in &outcome.errors {
            tracing::warn!(index = error.index, error = %error.message, "Notification not created");
        }

        Ok(ProcessResult::from_counts(
            outcome.total_succeeded,
            outcome.total_requested,
            outcome.error_messages(),
        ))
    }
}
