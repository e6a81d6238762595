//! End-to-end provider runs against an in-memory store

mod common;

use chrono::{TimeZone, Utc};
use common::{engine, engine_with, record, MockStore, PageStep};
use grantflow::adapters::store::RawPage;
use grantflow::config::{QuestionnaireConfig, ReminderConfig};
use grantflow::cli::commands::run::exit_code;
use grantflow::cli::EXIT_INTERRUPTED;
use grantflow::core::provider::{Cancellation, ProviderRunner, RunContext};
use grantflow::core::reminder::{ReminderWindow, RunSchedule, ScheduledWindow};
use grantflow::core::state::{FileStateStorage, RunStatus, StateManager};
use grantflow::domain::{EntityName, PendingOperation, ProcessStatus, Record, RecordId};
use grantflow::providers::{
    QuestionnaireProvider, ReminderProvider, QUESTIONNAIRE_PROVIDER, REMINDER_PROVIDER,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

// ============================================================================
// Reminders
// ============================================================================

fn reminder_config() -> ReminderConfig {
    ReminderConfig {
        entity: "applications".to_string(),
        id_field: "applicationid".to_string(),
        query: "<fetch page='{page}' count='{page_size}' paging-cookie='{token}'/>".to_string(),
        anchor_field: "submitted_on".to_string(),
        offsets_days: vec![30, 60, 90],
        recipient_field: "_ownerid_value".to_string(),
        notification_entity: "notifications".to_string(),
        interval_hours: 24,
    }
}

fn application(submitted_on: &str, owner: &str) -> Record {
    record(
        "applications",
        "applicationid",
        json!({ "submitted_on": submitted_on, "_ownerid_value": owner }),
    )
}

fn january_30() -> ReminderWindow {
    ReminderWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn application_pages() -> Vec<PageStep> {
    vec![
        PageStep::Page(RawPage::with_more(
            vec![
                application("2024-01-01", "alice"),
                application("2024-01-02", "bob"),
            ],
            "A",
        )),
        PageStep::Page(RawPage::last(vec![
            application("2023-12-02", "carol"),
            application("2024-01-01", "alice"),
            application("2024-01-01", "dave"),
        ])),
    ]
}

#[tokio::test]
async fn test_reminder_run_creates_one_notification_per_recipient() {
    let store = Arc::new(MockStore::new().with_pages("applications", application_pages()));
    let engine = engine(&store);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let ctx = RunContext::new(REMINDER_PROVIDER).with_window(january_30());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(result.status, ProcessStatus::Success);
    assert_eq!(result.processed_count, 3);
    assert_eq!(result.total_count, 3);

    let recipients: Vec<Value> = store
        .batched()
        .iter()
        .map(|op| match op {
            PendingOperation::Create { entity, payload } => {
                assert_eq!(entity.as_str(), "notifications");
                payload["recipient"].clone()
            }
            other => panic!("unexpected operation {other:?}"),
        })
        .collect();
    assert_eq!(recipients, vec![json!("alice"), json!("carol"), json!("dave")]);
}

#[tokio::test]
async fn test_reminder_item_failure_is_partial() {
    let store = Arc::new(
        MockStore::new()
            .with_pages("applications", application_pages())
            .failing_items([1]),
    );
    let engine = engine(&store);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let ctx = RunContext::new(REMINDER_PROVIDER).with_window(january_30());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(result.status, ProcessStatus::PartialFailure);
    assert_eq!(result.processed_count, 2);
    assert_eq!(result.total_count, 3);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("index 1"));
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn test_reminder_read_failure_fails_run_without_writes() {
    let store = Arc::new(MockStore::new().with_pages(
        "applications",
        vec![PageStep::Fail("service unavailable".to_string())],
    ));
    let engine = engine(&store);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let ctx = RunContext::new(REMINDER_PROVIDER).with_window(january_30());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(result.status, ProcessStatus::Failure);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("phase=reading"));
    assert!(result.errors[0].contains("service unavailable"));
    assert_eq!(store.batch_call_count(), 0);
}

#[tokio::test]
async fn test_reminder_without_window_is_rejected() {
    let store = Arc::new(MockStore::new());
    let engine = engine(&store);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let result = ProviderRunner::new(&engine)
        .run(&provider, RunContext::new(REMINDER_PROVIDER))
        .await;

    assert_eq!(result.status, ProcessStatus::Failure);
    assert!(store.queries().is_empty());
}

#[tokio::test]
async fn test_nothing_due_is_success_without_writes() {
    let store = Arc::new(MockStore::new().with_pages(
        "applications",
        vec![PageStep::Page(RawPage::last(vec![application("2024-01-15", "erin")]))],
    ));
    let engine = engine(&store);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let ctx = RunContext::new(REMINDER_PROVIDER).with_window(january_30());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert!(result.is_success());
    assert_eq!(result.total_count, 0);
    assert_eq!(store.batch_call_count(), 0);
}

#[tokio::test]
async fn test_scheduled_run_records_watermark() {
    let dir = TempDir::new().unwrap();
    let state = StateManager::new(Arc::new(FileStateStorage::new(dir.path())), false);
    let schedule = RunSchedule::daily();
    let now = Utc.with_ymd_and_hms(2024, 1, 31, 2, 0, 0).unwrap();

    let ScheduledWindow::Due(window) = state
        .next_window(REMINDER_PROVIDER, &schedule, now)
        .await
        .unwrap()
    else {
        panic!("first run should be due");
    };
    assert_eq!(window, january_30());

    let store = Arc::new(MockStore::new().with_pages("applications", application_pages()));
    let engine = engine(&store);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let watermark = state.begin_run(REMINDER_PROVIDER).await.unwrap();
    let ctx = RunContext::new(REMINDER_PROVIDER).with_window(window);
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;
    state
        .finish_run(watermark, &window, &result, false)
        .await
        .unwrap();

    let saved = state
        .load_watermark(REMINDER_PROVIDER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.last_run_status, RunStatus::Completed);
    assert_eq!(saved.last_window_end, Some(window.end()));
    assert_eq!(saved.runs_completed, 1);

    assert_eq!(
        state
            .next_window(REMINDER_PROVIDER, &schedule, now)
            .await
            .unwrap(),
        ScheduledWindow::UpToDate
    );
}

#[tokio::test]
async fn test_interrupted_reminder_run_keeps_committed_notifications() {
    let dir = TempDir::new().unwrap();
    let state = StateManager::new(Arc::new(FileStateStorage::new(dir.path())), false);
    let schedule = RunSchedule::daily();
    let now = Utc.with_ymd_and_hms(2024, 1, 31, 2, 0, 0).unwrap();

    let ScheduledWindow::Due(window) = state
        .next_window(REMINDER_PROVIDER, &schedule, now)
        .await
        .unwrap()
    else {
        panic!("first run should be due");
    };

    let (tx, rx) = watch::channel(false);
    let store = Arc::new(
        MockStore::new()
            .with_pages("applications", application_pages())
            .cancel_after_batch(1, tx),
    );
    let engine = engine_with(&store, 2, 100, 1);
    let provider = ReminderProvider::new(reminder_config()).unwrap();
    let cancellation = Cancellation::from_receiver(rx);

    let watermark = state.begin_run(REMINDER_PROVIDER).await.unwrap();
    let ctx = RunContext::new(REMINDER_PROVIDER)
        .with_window(window)
        .with_cancellation(cancellation.clone());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;
    let interrupted = cancellation.is_cancelled();

    assert!(interrupted);
    assert_eq!(store.batch_call_count(), 1);
    assert_eq!(store.batched().len(), 1);
    assert_eq!(result.status, ProcessStatus::PartialFailure);
    assert_eq!(result.processed_count, 1);
    assert_eq!(result.total_count, 3);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.contains("Shutdown requested")));
    assert_eq!(exit_code(&result, interrupted), EXIT_INTERRUPTED);

    let saved = state
        .finish_run(watermark, &window, &result, interrupted)
        .await
        .unwrap();
    assert_eq!(saved.last_run_status, RunStatus::Completed);
    assert_eq!(saved.last_window_end, Some(window.end()));

    assert_eq!(
        state
            .next_window(REMINDER_PROVIDER, &schedule, now)
            .await
            .unwrap(),
        ScheduledWindow::UpToDate
    );
}

#[tokio::test]
async fn test_cancelled_write_marks_only_unsent_items() {
    let (tx, rx) = watch::channel(false);
    let store = Arc::new(
        MockStore::new()
            .with_pages("applications", application_pages())
            .failing_items([0])
            .cancel_after_batch(2, tx),
    );
    let engine = engine_with(&store, 2, 100, 1);
    let provider = ReminderProvider::new(reminder_config()).unwrap();

    let ctx = RunContext::new(REMINDER_PROVIDER)
        .with_window(january_30())
        .with_cancellation(Cancellation::from_receiver(rx));
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(store.batch_call_count(), 2);
    assert_eq!(result.status, ProcessStatus::PartialFailure);
    assert_eq!(result.processed_count, 1);
    assert_eq!(result.total_count, 3);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].contains("index 0"));
    assert!(result.errors[1].contains("index 2"));
    assert!(result.errors[1].contains("Shutdown requested"));
}

// ============================================================================
// Questionnaire copy
// ============================================================================

const SOURCE: &str = "0b8e6f3a-2d4c-4f4e-9a1b-5c6d7e8f9a01";
const SECTION_A: &str = "0b8e6f3a-2d4c-4f4e-9a1b-5c6d7e8f9a02";
const SECTION_B: &str = "0b8e6f3a-2d4c-4f4e-9a1b-5c6d7e8f9a03";
const QUESTION_1: &str = "0b8e6f3a-2d4c-4f4e-9a1b-5c6d7e8f9a04";
const QUESTION_2: &str = "0b8e6f3a-2d4c-4f4e-9a1b-5c6d7e8f9a05";
const RULE: &str = "0b8e6f3a-2d4c-4f4e-9a1b-5c6d7e8f9a06";

fn questionnaire_config() -> QuestionnaireConfig {
    toml::from_str(
        r#"
        questionnaire_query = "<fetch page='{page}'><filter questionnaireid='{source}'/></fetch>"
        section_query = "<fetch page='{page}'><filter questionnaire='{source}'/></fetch>"
        question_query = "<fetch page='{page}'><link questionnaire='{source}'/></fetch>"
        rule_query = "<fetch page='{page}'><filter questionnaire='{source}'/></fetch>"
        "#,
    )
    .unwrap()
}

/// A template record with a known id
fn fixed(entity: &str, id: &str, fields: Value) -> Record {
    let id: RecordId = id.parse().unwrap();
    let mut fields = fields.as_object().cloned().unwrap();
    fields.insert(id_field_of(entity).to_string(), Value::String(id.to_string()));
    Record::new(EntityName::new(entity).unwrap(), id, fields)
}

fn id_field_of(entity: &str) -> &'static str {
    match entity {
        "questionnaires" => "questionnaireid",
        "questionnaire_sections" => "questionnaire_sectionid",
        "questions" => "questionid",
        _ => "business_ruleid",
    }
}

fn template_store() -> MockStore {
    let page = |records: Vec<Record>| vec![PageStep::Page(RawPage::last(records))];
    MockStore::new()
        .with_pages(
            "questionnaires",
            page(vec![fixed(
                "questionnaires",
                SOURCE,
                json!({ "name": "Capital grant", "modifiedon": "2024-01-01T00:00:00Z" }),
            )]),
        )
        .with_pages(
            "questionnaire_sections",
            page(vec![
                fixed(
                    "questionnaire_sections",
                    SECTION_A,
                    json!({ "title": "Budget", "_questionnaire_value": SOURCE }),
                ),
                fixed(
                    "questionnaire_sections",
                    SECTION_B,
                    json!({ "title": "Timeline", "_questionnaire_value": SOURCE }),
                ),
            ]),
        )
        .with_pages(
            "questions",
            page(vec![
                fixed(
                    "questions",
                    QUESTION_1,
                    json!({ "text": "Total cost?", "_section_value": SECTION_A }),
                ),
                fixed(
                    "questions",
                    QUESTION_2,
                    json!({ "text": "Start date?", "_section_value": SECTION_B }),
                ),
            ]),
        )
        .with_pages(
            "business_rules",
            page(vec![fixed(
                "business_rules",
                RULE,
                json!({ "expression": "cost > 0", "_question_value": QUESTION_1 }),
            )]),
        )
}

fn payload_of(op: &PendingOperation) -> &serde_json::Map<String, Value> {
    match op {
        PendingOperation::Create { payload, .. } => payload,
        other => panic!("unexpected operation {other:?}"),
    }
}

#[tokio::test]
async fn test_questionnaire_copy_builds_linked_aggregate() {
    let store = Arc::new(template_store());
    let engine = engine(&store);
    let provider = QuestionnaireProvider::new(questionnaire_config()).unwrap();
    let source: RecordId = SOURCE.parse().unwrap();

    let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER).with_source(source);
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(result.status, ProcessStatus::Success);
    assert_eq!(result.processed_count, 6);

    let rendered = store.queries_for("questionnaires");
    assert!(rendered[0].query.contains(SOURCE));

    let creates = store.creates();
    assert_eq!(creates.len(), 1);
    let (root, root_payload) = &creates[0];
    assert_eq!(root_payload["name"], json!("Capital grant (copy)"));
    assert!(!root_payload.contains_key("questionnaireid"));
    assert!(!root_payload.contains_key("modifiedon"));

    assert_eq!(store.batch_sizes(), vec![2, 2, 1]);
    let batched = store.batched();

    let root_path = json!(root.resource_path());
    for section in &batched[0..2] {
        let payload = payload_of(section);
        assert_eq!(payload["questionnaire@odata.bind"], root_path);
        assert!(!payload.contains_key("_questionnaire_value"));
        assert!(!payload.contains_key("questionnaire_sectionid"));
    }

    let section_binds: Vec<&Value> = batched[2..4]
        .iter()
        .map(|q| &payload_of(q)["section@odata.bind"])
        .collect();
    assert_ne!(section_binds[0], section_binds[1]);
    assert!(section_binds
        .iter()
        .all(|b| b.as_str().unwrap().starts_with("/questionnaire_sections(")));

    let rule = payload_of(&batched[4]);
    assert_eq!(rule["questionnaire@odata.bind"], root_path);
    assert!(rule["question@odata.bind"]
        .as_str()
        .unwrap()
        .starts_with("/questions("));
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn test_questionnaire_step_failure_rolls_back_root() {
    let store = Arc::new(template_store().failing_entity("questions"));
    let engine = engine(&store);
    let provider = QuestionnaireProvider::new(questionnaire_config()).unwrap();

    let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER).with_source(SOURCE.parse().unwrap());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(result.status, ProcessStatus::Failure);
    assert!(result.errors[0].contains("2 of 2 questions failed"));
    assert!(result.errors[0].contains("phase=compensating"));

    // Rules were never attempted
    assert_eq!(store.batch_call_count(), 2);
    let root = store.creates()[0].0.clone();
    assert_eq!(store.deletes(), vec![root]);
}

#[tokio::test]
async fn test_questionnaire_missing_template_is_validation_failure() {
    let store = Arc::new(MockStore::new());
    let engine = engine(&store);
    let provider = QuestionnaireProvider::new(questionnaire_config()).unwrap();

    let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER).with_source(SOURCE.parse().unwrap());
    let result = ProviderRunner::new(&engine).run(&provider, ctx).await;

    assert_eq!(result.status, ProcessStatus::Failure);
    assert!(result.errors[0].contains("matched 0 records"));
    assert!(store.creates().is_empty());
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn test_questionnaire_without_source_is_rejected() {
    let store = Arc::new(template_store());
    let engine = engine(&store);
    let provider = QuestionnaireProvider::new(questionnaire_config()).unwrap();

    let result = ProviderRunner::new(&engine)
        .run(&provider, RunContext::new(QUESTIONNAIRE_PROVIDER))
        .await;

    assert_eq!(result.status, ProcessStatus::Failure);
    assert!(store.queries().is_empty());
}
