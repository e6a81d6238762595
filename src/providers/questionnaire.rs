//! Questionnaire copy
//!
//! Copies a template questionnaire together with its sections, questions
//! and business rules. The copy is one aggregate: the root questionnaire is
//! created first and everything else hangs off it, so the whole write runs
//! inside a compensation scope. If any batch reports a failed item the root
//! is deleted and the store's cascade removes whatever was already attached.

use crate::adapters::store::{bind_lookup, copyable_fields, lookup_value_key};
use crate::config::QuestionnaireConfig;
use crate::core::batch::BatchOutcome;
use crate::core::paging::{QueryTemplate, RecordQuery};
use crate::core::provider::{Engine, ProcessProvider, RunContext};
use crate::domain::{
    EngineError, EntityName, Payload, PendingOperation, ProcessResult, Record, RecordId,
    RecordRef, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Provider name used on the command line and as the state key
pub const QUESTIONNAIRE_PROVIDER: &str = "questionnaire";

/// Everything read from the template
#[derive(Debug, Clone)]
pub struct QuestionnaireTemplate {
    /// The template questionnaire itself
    pub root: Record,
    /// Its sections
    pub sections: Vec<Record>,
    /// Questions of those sections
    pub questions: Vec<Record>,
    /// Business rules of the questionnaire
    pub rules: Vec<Record>,
}

/// A section to copy, keyed by its template id
#[derive(Debug, Clone)]
pub struct SectionCopy {
    pub source: RecordId,
    pub payload: Payload,
}

/// A question to copy, with the template section it belongs to
#[derive(Debug, Clone)]
pub struct QuestionCopy {
    pub source: RecordId,
    pub section: RecordId,
    pub payload: Payload,
}

/// A rule to copy, with the template question it guards if any
#[derive(Debug, Clone)]
pub struct RuleCopy {
    pub question: Option<RecordId>,
    pub payload: Payload,
}

/// Payloads of the copy in dependency order
#[derive(Debug, Clone)]
pub struct CopyPlan {
    pub root: Payload,
    pub sections: Vec<SectionCopy>,
    pub questions: Vec<QuestionCopy>,
    pub rules: Vec<RuleCopy>,
}

impl CopyPlan {
    /// Records the copy creates, root included
    pub fn len(&self) -> usize {
        1 + self.sections.len() + self.questions.len() + self.rules.len()
    }

    /// Always false; a plan has at least its root
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
struct Entities {
    questionnaire: EntityName,
    section: EntityName,
    question: EntityName,
    rule: EntityName,
}

/// Copies a questionnaire template into a new questionnaire
#[derive(Debug, Clone)]
pub struct QuestionnaireProvider {
    config: QuestionnaireConfig,
    entities: Entities,
}

impl QuestionnaireProvider {
    /// Creates a provider from its configuration section
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if an entity name is invalid.
    pub fn new(config: QuestionnaireConfig) -> Result<Self> {
        let entity = |name: &str| EntityName::new(name).map_err(EngineError::Configuration);
        let entities = Entities {
            questionnaire: entity(&config.questionnaire_entity)?,
            section: entity(&config.section_entity)?,
            question: entity(&config.question_entity)?,
            rule: entity(&config.rule_entity)?,
        };
        Ok(Self { config, entities })
    }

    fn query(
        &self,
        entity: &EntityName,
        id_field: &str,
        text: &str,
        source: RecordId,
    ) -> RecordQuery {
        RecordQuery::new(
            entity.clone(),
            id_field,
            QueryTemplate::new(text).bind("source", source.to_string()),
        )
    }

    fn copy_of(&self, record: &Record, id_field: &str) -> Payload {
        copyable_fields(record, id_field, &self.config.excluded_fields)
    }

    /// Template id stored in a lookup of `record`
    fn parent_of(&self, record: &Record, lookup: &str) -> Option<RecordId> {
        record.get_id(&lookup_value_key(lookup))
    }
}

/// Reference created by the operation at `index`
fn created(step: &str, outcome: &BatchOutcome, index: usize) -> Result<RecordRef> {
    outcome.created_ref(index).cloned().ok_or_else(|| {
        EngineError::Batch(format!("Store returned no id for {step} operation {index}"))
    })
}

#[async_trait]
impl ProcessProvider for QuestionnaireProvider {
    type Dataset = QuestionnaireTemplate;
    type Plan = CopyPlan;

    fn name(&self) -> &str {
        QUESTIONNAIRE_PROVIDER
    }

    async fn read(&self, ctx: &RunContext, engine: &Engine) -> Result<Self::Dataset> {
        let source = ctx.require_source()?;
        let reader = engine.reader(ctx.cancellation());
        let config = &self.config;

        let mut roots = reader
            .read_all(&self.query(
                &self.entities.questionnaire,
                &config.questionnaire_id_field,
                &config.questionnaire_query,
                source,
            ))
            .await?;
        if roots.len() != 1 {
            return Err(EngineError::Validation(format!(
                "Template questionnaire {source} matched {} records, expected exactly one",
                roots.len()
            )));
        }
        let root = roots.remove(0);

        let sections = reader
            .read_all(&self.query(
                &self.entities.section,
                &config.section_id_field,
                &config.section_query,
                source,
            ))
            .await?;
        let questions = reader
            .read_all(&self.query(
                &self.entities.question,
                &config.question_id_field,
                &config.question_query,
                source,
            ))
            .await?;
        let rules = reader
            .read_all(&self.query(
                &self.entities.rule,
                &config.rule_id_field,
                &config.rule_query,
                source,
            ))
            .await?;

        tracing::info!(
            source = %source,
            sections = sections.len(),
            questions = questions.len(),
            rules = rules.len(),
            "Template read"
        );

        Ok(QuestionnaireTemplate {
            root,
            sections,
            questions,
            rules,
        })
    }

    fn transform(&self, _ctx: &RunContext, dataset: Self::Dataset) -> Result<Self::Plan> {
        let config = &self.config;

        let mut root = self.copy_of(&dataset.root, &config.questionnaire_id_field);
        if let Some(Value::String(name)) = root.get_mut(&config.name_field) {
            name.push_str(&config.copy_suffix);
        }

        let sections: Vec<SectionCopy> = dataset
            .sections
            .iter()
            .map(|s| SectionCopy {
                source: s.id,
                payload: self.copy_of(s, &config.section_id_field),
            })
            .collect();
        let section_ids: HashSet<RecordId> = sections.iter().map(|s| s.source).collect();

        let mut questions = Vec::with_capacity(dataset.questions.len());
        for q in &dataset.questions {
            let section = self
                .parent_of(q, &config.section_lookup)
                .filter(|id| section_ids.contains(id))
                .ok_or_else(|| {
                    EngineError::Validation(format!(
                        "Question {} does not belong to a section of the template",
                        q.id
                    ))
                })?;
            questions.push(QuestionCopy {
                source: q.id,
                section,
                payload: self.copy_of(q, &config.question_id_field),
            });
        }
        let question_ids: HashSet<RecordId> = questions.iter().map(|q| q.source).collect();

        let mut rules = Vec::with_capacity(dataset.rules.len());
        for r in &dataset.rules {
            let question = self.parent_of(r, &config.question_lookup);
            if let Some(id) = question {
                if !question_ids.contains(&id) {
                    return Err(EngineError::Validation(format!(
                        "Business rule {} refers to question {id} outside the template",
                        r.id
                    )));
                }
            }
            rules.push(RuleCopy {
                question,
                payload: self.copy_of(r, &config.rule_id_field),
            });
        }

        Ok(CopyPlan {
            root,
            sections,
            questions,
            rules,
        })
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
        let total = plan.len();
        let CopyPlan {
            root,
            sections,
            questions,
            rules,
        } = plan;

        let config = &self.config;
        let entities = &self.entities;
        let writer = engine.writer(ctx.cancellation());
        let create_root = engine.store().create(&entities.questionnaire, &root);

        let copy = engine
            .coordinator()
            .with_scope(ctx, create_root, |root_ref, _undo| async move {
                let ops: Vec<PendingOperation> = sections
                    .iter()
                    .map(|s| {
                        let mut payload = s.payload.clone();
                        bind_lookup(&mut payload, &config.questionnaire_lookup, &root_ref);
                        PendingOperation::create(entities.section.clone(), payload)
                    })
                    .collect();
                let outcome = writer.write(&ops).await?;
                outcome.ensure_complete("sections")?;
                let mut new_sections: HashMap<RecordId, RecordRef> = HashMap::new();
                for (i, s) in sections.iter().enumerate() {
                    new_sections.insert(s.source, created("section", &outcome, i)?);
                }

                let mut ops = Vec::with_capacity(questions.len());
                for q in &questions {
                    let section = new_sections.get(&q.section).ok_or_else(|| {
                        EngineError::Batch(format!("Section {} was not copied", q.section))
                    })?;
                    let mut payload = q.payload.clone();
                    bind_lookup(&mut payload, &config.section_lookup, section);
                    ops.push(PendingOperation::create(entities.question.clone(), payload));
                }
                let outcome = writer.write(&ops).await?;
                outcome.ensure_complete("questions")?;
                let mut new_questions: HashMap<RecordId, RecordRef> = HashMap::new();
                for (i, q) in questions.iter().enumerate() {
                    new_questions.insert(q.source, created("question", &outcome, i)?);
                }

                let mut ops = Vec::with_capacity(rules.len());
                for r in &rules {
                    let mut payload = r.payload.clone();
                    bind_lookup(&mut payload, &config.questionnaire_lookup, &root_ref);
                    if let Some(source) = r.question {
                        let question = new_questions.get(&source).ok_or_else(|| {
                            EngineError::Batch(format!("Question {source} was not copied"))
                        })?;
                        bind_lookup(&mut payload, &config.question_lookup, question);
                    }
                    ops.push(PendingOperation::create(entities.rule.clone(), payload));
                }
                let outcome = writer.write(&ops).await?;
                outcome.ensure_complete("business rules")?;

                Ok(root_ref)
            })
            .await?;

        tracing::info!(copy = %copy, records = total, "Questionnaire copied");
        Ok(ProcessResult::success(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SOURCE: &str = "6f1c1d5e-3f3e-4d0a-9a53-0c3c1f3c9a10";
    const SECTION: &str = "6f1c1d5e-3f3e-4d0a-9a53-0c3c1f3c9a11";
    const QUESTION: &str = "6f1c1d5e-3f3e-4d0a-9a53-0c3c1f3c9a12";
    const RULE: &str = "6f1c1d5e-3f3e-4d0a-9a53-0c3c1f3c9a13";

    fn config() -> QuestionnaireConfig {
        toml::from_str(
            r#"
            questionnaire_query = "<fetch><filter questionnaireid='{source}'/></fetch>"
            section_query = "<fetch><filter questionnaire='{source}'/></fetch>"
            question_query = "<fetch><link section questionnaire='{source}'/></fetch>"
            rule_query = "<fetch><filter questionnaire='{source}'/></fetch>"
            "#,
        )
        .unwrap()
    }

    fn record(entity: &str, id: &str, fields: serde_json::Value) -> Record {
        Record::new(
            EntityName::new(entity).unwrap(),
            id.parse().unwrap(),
            fields.as_object().cloned().unwrap(),
        )
    }

    fn template() -> QuestionnaireTemplate {
        QuestionnaireTemplate {
            root: record(
                "questionnaires",
                SOURCE,
                json!({ "questionnaireid": SOURCE, "name": "Capital grant", "createdon": "2024-01-01" }),
            ),
            sections: vec![record(
                "questionnaire_sections",
                SECTION,
                json!({ "questionnaire_sectionid": SECTION, "title": "Budget", "_questionnaire_value": SOURCE }),
            )],
            questions: vec![record(
                "questions",
                QUESTION,
                json!({ "questionid": QUESTION, "text": "Total cost?", "_section_value": SECTION }),
            )],
            rules: vec![record(
                "business_rules",
                RULE,
                json!({ "business_ruleid": RULE, "expression": "> 0", "_question_value": QUESTION }),
            )],
        }
    }

    #[test]
    fn test_transform_builds_copy_plan() {
        let provider = QuestionnaireProvider::new(config()).unwrap();
        let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER);

        let plan = provider.transform(&ctx, template()).unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(plan.root["name"], json!("Capital grant (copy)"));
        assert!(!plan.root.contains_key("createdon"));
        assert!(!plan.root.contains_key("questionnaireid"));
        assert_eq!(plan.sections[0].source.to_string(), SECTION);
        assert!(!plan.sections[0].payload.contains_key("_questionnaire_value"));
        assert_eq!(plan.questions[0].section.to_string(), SECTION);
        assert_eq!(plan.rules[0].question.map(|q| q.to_string()).as_deref(), Some(QUESTION));
    }

    #[test]
    fn test_transform_rejects_orphan_question() {
        let provider = QuestionnaireProvider::new(config()).unwrap();
        let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER);
        let mut dataset = template();
        dataset.sections.clear();

        let err = provider.transform(&ctx, dataset).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains(QUESTION));
    }

    #[test]
    fn test_transform_allows_questionnaire_level_rule() {
        let provider = QuestionnaireProvider::new(config()).unwrap();
        let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER);
        let mut dataset = template();
        dataset.rules[0].fields.remove("_question_value");

        let plan = provider.transform(&ctx, dataset).unwrap();
        assert!(plan.rules[0].question.is_none());
    }
}
