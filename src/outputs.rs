use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use std::fmt::Write as _;

use crate::workflow::state::WorkflowState;
use crate::workflow::step::StepPayload;

/// A rendered file ready to hand to the operator or write to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// One export format over the workflow's completed payloads.
pub trait Deliverable {
    fn render(&self, state: &WorkflowState) -> Result<Artifact>;
}

fn slug(project_name: &str) -> String {
    let slug: String = project_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "landing-page".to_string()
    } else {
        trimmed.to_string()
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Copy brief in Markdown: every completed section in step order, with
/// structured fields rendered as JSON blocks.
pub struct MarkdownBrief;

impl Deliverable for MarkdownBrief {
    fn render(&self, state: &WorkflowState) -> Result<Artifact> {
        let mut out = String::new();
        writeln!(out, "# {}\n", state.project_name)?;
        writeln!(
            out,
            "Generated {} | model: {}\n",
            Utc::now().format("%Y-%m-%d"),
            state.selected_model
        )?;

        for (kind, payload) in state.completed_payloads() {
            writeln!(out, "## {}. {}\n", kind.index(), kind.title())?;
            match payload {
                StepPayload::Research(p) => {
                    writeln!(out, "- Product: {}", p.product_name)?;
                    writeln!(out, "- Industry: {}", p.industry)?;
                    writeln!(out, "- Audience: {}", p.target_audience)?;
                    writeln!(out, "- Budget: {}\n", p.budget_range)?;
                    writeln!(out, "```json\n{}\n```\n", pretty(&p.insights))?;
                }
                StepPayload::Outline(p) => {
                    writeln!(out, "Page type: {}\n", p.page_type)?;
                    writeln!(out, "```json\n{}\n```\n", pretty(&p.sections))?;
                }
                StepPayload::Hero(p) => {
                    writeln!(out, "> **{}**\n>\n> {}\n", p.headline, p.subheadline)?;
                    writeln!(out, "CTA: {}\n", p.cta_label)?;
                }
                StepPayload::PasCopy(p) => {
                    writeln!(out, "**Problem.** {}\n", p.problem)?;
                    if let Some(agitation) = &p.agitation {
                        writeln!(out, "**Agitation.** {agitation}\n")?;
                    }
                    writeln!(out, "**Solution.** {}\n", p.solution)?;
                }
                StepPayload::SocialProof(p) => {
                    writeln!(out, "```json\n{}\n```\n", pretty(&p.testimonials))?;
                    if let Some(table) = &p.comparison_table {
                        writeln!(out, "Comparison:\n\n```json\n{}\n```\n", pretty(table))?;
                    }
                }
                StepPayload::FinalCta(p) => {
                    writeln!(out, "Offer: {}\n", p.offer)?;
                    if let Some(guarantee) = &p.guarantee {
                        writeln!(out, "Guarantee: {guarantee}\n")?;
                    }
                    writeln!(out, "```json\n{}\n```\n", pretty(&p.roadmap))?;
                }
                StepPayload::Assembly(p) => {
                    writeln!(out, "Sections included: {}\n", p.sections_included)?;
                    for note in &p.consistency_notes {
                        writeln!(out, "- {note}")?;
                    }
                    writeln!(out)?;
                }
                StepPayload::Design(p) => {
                    writeln!(out, "```json\n{}\n```\n", pretty(&p.palette))?;
                    for note in &p.technical_notes {
                        writeln!(out, "- {note}")?;
                    }
                    writeln!(out)?;
                }
            }
        }

        Ok(Artifact {
            filename: format!("{}-brief.md", slug(&state.project_name)),
            bytes: out.into_bytes(),
        })
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Minimal standalone HTML preview of the page copy. Structured JSON
/// fields are not rendered here; the Markdown brief carries those.
pub struct HtmlPreview;

impl Deliverable for HtmlPreview {
    fn render(&self, state: &WorkflowState) -> Result<Artifact> {
        let mut body = String::new();
        for (kind, payload) in state.completed_payloads() {
            match payload {
                StepPayload::Hero(p) => {
                    writeln!(
                        body,
                        "<header><h1>{}</h1><p>{}</p><a class=\"cta\" href=\"#order\">{}</a></header>",
                        escape(&p.headline),
                        escape(&p.subheadline),
                        escape(&p.cta_label),
                    )?;
                }
                StepPayload::PasCopy(p) => {
                    writeln!(body, "<section id=\"problem\"><p>{}</p>", escape(&p.problem))?;
                    if let Some(agitation) = &p.agitation {
                        writeln!(body, "<p>{}</p>", escape(agitation))?;
                    }
                    writeln!(body, "<p>{}</p></section>", escape(&p.solution))?;
                }
                StepPayload::FinalCta(p) => {
                    writeln!(body, "<section id=\"order\"><p>{}</p>", escape(&p.offer))?;
                    if let Some(guarantee) = &p.guarantee {
                        writeln!(body, "<p><em>{}</em></p>", escape(guarantee))?;
                    }
                    writeln!(body, "</section>")?;
                }
                _ => {
                    writeln!(
                        body,
                        "<!-- {}: see the Markdown brief -->",
                        escape(kind.title())
                    )?;
                }
            }
        }

        let page = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
            title = escape(&state.project_name),
        );

        Ok(Artifact {
            filename: format!("{}-preview.html", slug(&state.project_name)),
            bytes: page.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::step::{GenerationRecord, HeroPayload};
    use chrono::Utc;

    fn state_with_hero() -> WorkflowState {
        let mut state = WorkflowState::new();
        state.project_name = "KetoBurn Pro".to_string();
        state.save_step_payload(
            3,
            StepPayload::Hero(HeroPayload {
                headline: "Beat Keto Flu in 48 Hours".to_string(),
                subheadline: "Smooth ketosis & real energy.".to_string(),
                cta_label: "Try It Risk-Free".to_string(),
                variants: serde_json::json!([]),
                record: GenerationRecord {
                    model_used: "gpt-4".to_string(),
                    tokens_used: 80,
                    generated_at: Utc::now(),
                    raw_response: "{}".to_string(),
                },
            }),
        );
        state.mark_step_completed(3);
        state
    }

    #[test]
    fn markdown_brief_includes_completed_sections_only() {
        let artifact = MarkdownBrief.render(&state_with_hero()).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();

        assert_eq!(artifact.filename, "ketoburn-pro-brief.md");
        assert!(text.contains("# KetoBurn Pro"));
        assert!(text.contains("## 3. Hero Section Copy"));
        assert!(text.contains("Beat Keto Flu in 48 Hours"));
        assert!(!text.contains("Product Research"));
    }

    #[test]
    fn html_preview_escapes_copy() {
        let mut state = state_with_hero();
        match state.steps[2].payload.as_mut() {
            Some(StepPayload::Hero(hero)) => {
                hero.subheadline = "Faster <ketosis> & energy".to_string();
            }
            _ => unreachable!(),
        }

        let artifact = HtmlPreview.render(&state).unwrap();
        let html = String::from_utf8(artifact.bytes).unwrap();

        assert_eq!(artifact.filename, "ketoburn-pro-preview.html");
        assert!(html.contains("Faster &lt;ketosis&gt; &amp; energy"));
        assert!(!html.contains("<ketosis>"));
    }

    #[test]
    fn empty_project_name_gets_a_fallback_slug() {
        let state = WorkflowState::new();
        let artifact = MarkdownBrief.render(&state).unwrap();
        assert_eq!(artifact.filename, "landing-page-brief.md");
    }
}
