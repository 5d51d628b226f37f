use chrono::Utc;
use indoc::formatdoc;
use serde_json::Value;
use tracing::info;

use crate::dispatcher::{Dispatcher, Generation};
use crate::errors::WizardError;
use crate::providers::base::GenerationRequest;
use crate::providers::utils::extract_json;
use crate::workflow::state::WorkflowState;
use crate::workflow::step::{
    AssemblyPayload, DesignPayload, FinalCtaPayload, GenerationRecord, HeroPayload,
    OutlinePayload, PasCopyPayload, ResearchPayload, SocialProofPayload, StepKind, StepPayload,
};

/// Project facts captured up front and interpolated into every prompt.
#[derive(Debug, Clone, Default)]
pub struct ProjectBrief {
    pub product_name: String,
    pub target_url: Option<String>,
    pub industry: String,
    pub target_audience: String,
    pub budget_range: String,
}

/// Drives the eight-step flow: builds each step's prompt from the
/// payloads already in the store, calls the dispatcher, normalizes the
/// reply into the step's typed payload, and completes the step. A
/// failed generation or extraction leaves the step pending so it can be
/// re-run.
pub struct Wizard {
    dispatcher: Dispatcher,
}

impl Wizard {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn run_step(
        &self,
        state: &mut WorkflowState,
        kind: StepKind,
        brief: &ProjectBrief,
    ) -> Result<(), WizardError> {
        let step = kind.index();
        if !state.can_proceed_to_step(step) {
            return Err(WizardError::StepLocked(step));
        }

        // Assembly is computed locally over the prior payloads; every
        // other step goes out to a provider.
        let payload = if kind == StepKind::Assembly {
            StepPayload::Assembly(assemble(state))
        } else {
            let request = GenerationRequest {
                prompt: build_prompt(kind, state, brief),
                model: state.selected_model.clone(),
                temperature: kind.temperature(),
                max_tokens: kind.max_tokens(),
            };
            let generation = self.dispatcher.generate(&request).await?;
            let body = extract_json(&generation.content)?;
            normalize(kind, state, brief, &body, &generation)
        };

        state.save_step_payload(step, payload);
        state.complete_step(step);
        info!(step, title = kind.title(), "step completed");
        Ok(())
    }
}

fn string_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn value_field(body: &Value, key: &str) -> Value {
    body.get(key).cloned().unwrap_or(Value::Null)
}

fn string_list(body: &Value, key: &str) -> Vec<String> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Summarized context from an earlier step, for interpolation into a
/// later prompt.
fn prior_context(state: &WorkflowState, step: usize) -> String {
    match state.step_payload(step) {
        Some(StepPayload::Research(p)) => p.insights.to_string(),
        Some(StepPayload::Outline(p)) => p.terminology.to_string(),
        Some(StepPayload::Hero(p)) => format!("headline: {}", p.headline),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
        None => String::new(),
    }
}

fn build_prompt(kind: StepKind, state: &WorkflowState, brief: &ProjectBrief) -> String {
    match kind {
        StepKind::Research => formatdoc! {"
            You are a senior product research analyst for direct response marketing.

            Product: {product}
            Product URL: {url}
            Industry: {industry}
            Target audience: {audience}
            Monthly PPC budget: {budget}

            Analyze the core value proposition, audience pain points with severity,
            competitive landscape, high-intent PPC keywords and trust signals.
            Return only a valid JSON object.",
            product = brief.product_name,
            url = brief.target_url.as_deref().unwrap_or("not provided"),
            industry = brief.industry,
            audience = brief.target_audience,
            budget = brief.budget_range,
        },
        StepKind::Outline => formatdoc! {"
            Design the section outline for a {page_type} landing page selling {product}.

            Research findings:
            {research}

            Include hero, problem, solution, benefits, social proof and final CTA
            sections{agitation}{comparison}. Return a JSON object with keys
            'sections' (ordered array) and 'terminology' (canonical phrases for
            the pain point, timeframe and primary benefit).",
            page_type = state.options.page_type,
            product = brief.product_name,
            research = prior_context(state, 1),
            agitation = if state.options.include_agitation_module { ", an agitation module" } else { "" },
            comparison = if state.options.include_comparison_table { " and a comparison table" } else { "" },
        },
        StepKind::Hero => formatdoc! {"
            Write the hero section for the {product} landing page.

            Research findings:
            {research}

            Terminology standards:
            {terminology}

            Return a JSON object with keys 'headline', 'subheadline', 'cta' and
            'variants' (two alternate headline/subheadline/cta sets).",
            product = brief.product_name,
            research = prior_context(state, 1),
            terminology = prior_context(state, 2),
        },
        StepKind::PasCopy => formatdoc! {"
            Write the Problem-Agitate-Solution body copy for {product}, aimed at:
            {audience}

            Terminology standards:
            {terminology}

            Return a JSON object with keys 'problem', {agitation}'solution' and
            'benefits' (array).",
            product = brief.product_name,
            audience = brief.target_audience,
            terminology = prior_context(state, 2),
            agitation = if state.options.include_agitation_module { "'agitation', " } else { "" },
        },
        StepKind::SocialProof => formatdoc! {"
            Write the social proof section for {product}.

            Research findings:
            {research}

            Return a JSON object with keys 'testimonials' (array of
            quote/attribution pairs){comparison}.",
            product = brief.product_name,
            research = prior_context(state, 1),
            comparison = if state.options.include_comparison_table {
                " and 'comparison_table' (product vs top competitors)"
            } else {
                ""
            },
        },
        StepKind::FinalCta => formatdoc! {"
            Write the final call-to-action for {product}. The hero promised:
            {hero}

            Return a JSON object with keys 'offer', 'guarantee' and 'roadmap'
            (a what-happens-next sequence of three steps).",
            product = brief.product_name,
            hero = prior_context(state, 3),
        },
        // Assembly never reaches the prompt builder.
        StepKind::Assembly => String::new(),
        StepKind::Design => formatdoc! {"
            Produce design and technical specs for the assembled {product} page,
            a {product_type} product sold via a {page_type} page.

            Return a JSON object with keys 'palette', 'layout' and
            'technical_notes' (array of strings covering mobile and page-speed
            requirements).",
            product = brief.product_name,
            product_type = state.options.product_type,
            page_type = state.options.page_type,
        },
    }
}

fn record(generation: &Generation) -> GenerationRecord {
    GenerationRecord {
        model_used: generation.model_used.clone(),
        tokens_used: generation.tokens_used,
        generated_at: Utc::now(),
        raw_response: generation.content.clone(),
    }
}

fn normalize(
    kind: StepKind,
    state: &WorkflowState,
    brief: &ProjectBrief,
    body: &Value,
    generation: &Generation,
) -> StepPayload {
    match kind {
        StepKind::Research => StepPayload::Research(ResearchPayload {
            product_name: brief.product_name.clone(),
            target_url: brief.target_url.clone(),
            industry: brief.industry.clone(),
            target_audience: brief.target_audience.clone(),
            budget_range: brief.budget_range.clone(),
            insights: body.clone(),
            record: record(generation),
        }),
        StepKind::Outline => StepPayload::Outline(OutlinePayload {
            page_type: state.options.page_type.clone(),
            sections: value_field(body, "sections"),
            terminology: value_field(body, "terminology"),
            record: record(generation),
        }),
        StepKind::Hero => StepPayload::Hero(HeroPayload {
            headline: string_field(body, "headline"),
            subheadline: string_field(body, "subheadline"),
            cta_label: string_field(body, "cta"),
            variants: value_field(body, "variants"),
            record: record(generation),
        }),
        StepKind::PasCopy => StepPayload::PasCopy(PasCopyPayload {
            problem: string_field(body, "problem"),
            agitation: if state.options.include_agitation_module {
                optional_field(body, "agitation")
            } else {
                None
            },
            solution: string_field(body, "solution"),
            body: body.clone(),
            record: record(generation),
        }),
        StepKind::SocialProof => StepPayload::SocialProof(SocialProofPayload {
            testimonials: value_field(body, "testimonials"),
            comparison_table: if state.options.include_comparison_table {
                body.get("comparison_table").cloned()
            } else {
                None
            },
            record: record(generation),
        }),
        StepKind::FinalCta => StepPayload::FinalCta(FinalCtaPayload {
            offer: string_field(body, "offer"),
            guarantee: optional_field(body, "guarantee"),
            roadmap: value_field(body, "roadmap"),
            record: record(generation),
        }),
        StepKind::Assembly => unreachable!("assembly is computed locally"),
        StepKind::Design => StepPayload::Design(DesignPayload {
            palette: value_field(body, "palette"),
            layout: value_field(body, "layout"),
            technical_notes: string_list(body, "technical_notes"),
            record: record(generation),
        }),
    }
}

/// Consistency pass over steps 1-6. Flags gaps instead of failing; the
/// notes ride along in the payload for the operator.
fn assemble(state: &WorkflowState) -> AssemblyPayload {
    let mut notes = Vec::new();

    if let Some(StepPayload::Hero(hero)) = state.step_payload(3) {
        if hero.headline.is_empty() {
            notes.push("hero headline is empty".to_string());
        }
        if hero.cta_label.is_empty() {
            notes.push("hero CTA label is empty".to_string());
        }
    }
    if let Some(StepPayload::PasCopy(pas)) = state.step_payload(4) {
        if pas.problem.is_empty() || pas.solution.is_empty() {
            notes.push("problem/solution copy is incomplete".to_string());
        }
        if state.options.include_agitation_module && pas.agitation.is_none() {
            notes.push("agitation module enabled but no agitation copy".to_string());
        }
    }
    if let Some(StepPayload::FinalCta(cta)) = state.step_payload(6) {
        if cta.offer.is_empty() {
            notes.push("final CTA has no offer".to_string());
        }
    }

    let sections_included = match state.step_payload(2) {
        Some(StepPayload::Outline(outline)) => outline
            .sections
            .as_array()
            .map(|a| a.len())
            .unwrap_or_default(),
        _ => 0,
    };

    if notes.is_empty() {
        notes.push("all sections consistent".to_string());
    }

    AssemblyPayload {
        consistency_notes: notes,
        sections_included,
        assembled_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::errors::WizardError;
    use crate::providers::factory::ProviderType;
    use crate::providers::mock::MockProvider;
    use crate::providers::openai::OPENAI_MODELS;

    fn brief() -> ProjectBrief {
        ProjectBrief {
            product_name: "KetoBurn Pro".to_string(),
            target_url: None,
            industry: "Health & Wellness".to_string(),
            target_audience: "Adults starting keto".to_string(),
            budget_range: "$1,000 - $5,000".to_string(),
        }
    }

    fn wizard_answering(content: &str) -> Wizard {
        let mock = MockProvider::new(
            "openai",
            OPENAI_MODELS,
            vec![Ok(MockProvider::completion(content, "gpt-4", 50))],
        );
        Wizard::new(
            Dispatcher::new(vec![(ProviderType::OpenAi, Box::new(mock))])
                .with_retry_delay(0.001, 0.002),
        )
    }

    #[tokio::test]
    async fn research_step_saves_typed_payload_and_advances() {
        let wizard =
            wizard_answering("Sure! {\"core_value_proposition\": \"fast keto adaptation\"}");
        let mut state = WorkflowState::new();
        state.selected_model = "gpt-4".to_string();

        wizard
            .run_step(&mut state, StepKind::Research, &brief())
            .await
            .unwrap();

        assert!(state.is_step_completed(1));
        assert_eq!(state.current_step, 2);
        match state.step_payload(1) {
            Some(StepPayload::Research(research)) => {
                assert_eq!(research.product_name, "KetoBurn Pro");
                assert_eq!(
                    research.insights["core_value_proposition"],
                    "fast keto adaptation"
                );
                assert_eq!(research.record.model_used, "gpt-4");
                assert_eq!(research.record.tokens_used, 50);
            }
            other => panic!("expected research payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn locked_step_is_rejected() {
        let wizard = wizard_answering("{}");
        let mut state = WorkflowState::new();

        let result = wizard.run_step(&mut state, StepKind::Hero, &brief()).await;

        assert!(matches!(result, Err(WizardError::StepLocked(3))));
        assert!(!state.is_step_completed(3));
    }

    #[tokio::test]
    async fn unparseable_reply_leaves_step_pending() {
        let wizard = wizard_answering("I could not produce JSON, sorry.");
        let mut state = WorkflowState::new();

        let result = wizard
            .run_step(&mut state, StepKind::Research, &brief())
            .await;

        assert!(matches!(result, Err(WizardError::Extract(_))));
        assert!(!state.is_step_completed(1));
        assert_eq!(state.current_step, 1);
        assert!(state.step_payload(1).is_none());
    }

    #[tokio::test]
    async fn assembly_runs_locally_without_a_provider_call() {
        // A dispatcher with no providers proves no call is made.
        let wizard = Wizard::new(Dispatcher::new(vec![]));
        let mut state = WorkflowState::new();
        for step in 1..=6 {
            state.complete_step(step);
        }

        wizard
            .run_step(&mut state, StepKind::Assembly, &brief())
            .await
            .unwrap();

        assert!(state.is_step_completed(7));
        assert_eq!(state.current_step, 8);
        match state.step_payload(7) {
            Some(StepPayload::Assembly(assembly)) => {
                assert!(!assembly.consistency_notes.is_empty());
            }
            other => panic!("expected assembly payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn assembly_flags_missing_agitation_copy() {
        let wizard = Wizard::new(Dispatcher::new(vec![]));
        let mut state = WorkflowState::new();
        for step in 1..=6 {
            state.complete_step(step);
        }
        state.save_step_payload(
            4,
            StepPayload::PasCopy(crate::workflow::step::PasCopyPayload {
                problem: "keto flu".to_string(),
                agitation: None,
                solution: "electrolytes".to_string(),
                body: serde_json::json!({}),
                record: GenerationRecord {
                    model_used: "gpt-4".to_string(),
                    tokens_used: 1,
                    generated_at: Utc::now(),
                    raw_response: String::new(),
                },
            }),
        );

        wizard
            .run_step(&mut state, StepKind::Assembly, &brief())
            .await
            .unwrap();

        match state.step_payload(7) {
            Some(StepPayload::Assembly(assembly)) => {
                assert!(assembly
                    .consistency_notes
                    .iter()
                    .any(|n| n.contains("agitation")));
            }
            other => panic!("expected assembly payload, got {other:?}"),
        }
    }
}
