use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::EnumIter;

/// The eight fixed stages of the wizard, in workflow order.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Research,
    Outline,
    Hero,
    PasCopy,
    SocialProof,
    FinalCta,
    Assembly,
    Design,
}

pub const STEP_COUNT: usize = 8;

impl StepKind {
    pub fn from_index(index: usize) -> Option<StepKind> {
        match index {
            1 => Some(StepKind::Research),
            2 => Some(StepKind::Outline),
            3 => Some(StepKind::Hero),
            4 => Some(StepKind::PasCopy),
            5 => Some(StepKind::SocialProof),
            6 => Some(StepKind::FinalCta),
            7 => Some(StepKind::Assembly),
            8 => Some(StepKind::Design),
            _ => None,
        }
    }

    /// 1-based position in the workflow.
    pub fn index(self) -> usize {
        match self {
            StepKind::Research => 1,
            StepKind::Outline => 2,
            StepKind::Hero => 3,
            StepKind::PasCopy => 4,
            StepKind::SocialProof => 5,
            StepKind::FinalCta => 6,
            StepKind::Assembly => 7,
            StepKind::Design => 8,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StepKind::Research => "Product Research & Intelligence",
            StepKind::Outline => "Landing Page Outline & Structure",
            StepKind::Hero => "Hero Section Copy",
            StepKind::PasCopy => "Problem-Agitate-Solution Copy",
            StepKind::SocialProof => "Social Proof & Comparisons",
            StepKind::FinalCta => "Final CTA & Roadmap",
            StepKind::Assembly => "Assembly & Consistency",
            StepKind::Design => "Design & Technical Specs",
        }
    }

    /// Default sampling temperature for the step's generation call.
    /// Research runs cold for factual analysis; copywriting steps run
    /// warmer.
    pub fn temperature(self) -> f32 {
        match self {
            StepKind::Research => 0.3,
            StepKind::Outline => 0.4,
            StepKind::Hero => 0.7,
            StepKind::PasCopy => 0.7,
            StepKind::SocialProof => 0.6,
            StepKind::FinalCta => 0.7,
            StepKind::Assembly => 0.2,
            StepKind::Design => 0.4,
        }
    }

    pub fn max_tokens(self) -> i32 {
        match self {
            StepKind::Research => 3000,
            StepKind::Outline => 2000,
            StepKind::Hero => 1500,
            StepKind::PasCopy => 3000,
            StepKind::SocialProof => 2500,
            StepKind::FinalCta => 1500,
            StepKind::Assembly => 2000,
            StepKind::Design => 2500,
        }
    }
}

/// Provenance attached to every generated payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub model_used: String,
    pub tokens_used: i32,
    pub generated_at: DateTime<Utc>,
    /// The unparsed model reply, kept for operator inspection.
    pub raw_response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPayload {
    pub product_name: String,
    pub target_url: Option<String>,
    pub industry: String,
    pub target_audience: String,
    pub budget_range: String,
    /// Free-form research body as returned by the model.
    pub insights: Value,
    pub record: GenerationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlinePayload {
    pub page_type: String,
    pub sections: Value,
    /// Terminology standards carried into later steps for consistency.
    pub terminology: Value,
    pub record: GenerationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroPayload {
    pub headline: String,
    pub subheadline: String,
    pub cta_label: String,
    pub variants: Value,
    pub record: GenerationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasCopyPayload {
    pub problem: String,
    pub agitation: Option<String>,
    pub solution: String,
    pub body: Value,
    pub record: GenerationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProofPayload {
    pub testimonials: Value,
    pub comparison_table: Option<Value>,
    pub record: GenerationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalCtaPayload {
    pub offer: String,
    pub guarantee: Option<String>,
    pub roadmap: Value,
    pub record: GenerationRecord,
}

/// Step 7 is assembled locally from the prior payloads rather than
/// generated, so it carries no [`GenerationRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPayload {
    pub consistency_notes: Vec<String>,
    pub sections_included: usize,
    pub assembled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignPayload {
    pub palette: Value,
    pub layout: Value,
    pub technical_notes: Vec<String>,
    pub record: GenerationRecord,
}

/// One case per step, each with its own typed record. The store treats
/// this as opaque; only the owning step constructs and reads its
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepPayload {
    Research(ResearchPayload),
    Outline(OutlinePayload),
    Hero(HeroPayload),
    PasCopy(PasCopyPayload),
    SocialProof(SocialProofPayload),
    FinalCta(FinalCtaPayload),
    Assembly(AssemblyPayload),
    Design(DesignPayload),
}

impl StepPayload {
    pub fn kind(&self) -> StepKind {
        match self {
            StepPayload::Research(_) => StepKind::Research,
            StepPayload::Outline(_) => StepKind::Outline,
            StepPayload::Hero(_) => StepKind::Hero,
            StepPayload::PasCopy(_) => StepKind::PasCopy,
            StepPayload::SocialProof(_) => StepKind::SocialProof,
            StepPayload::FinalCta(_) => StepKind::FinalCta,
            StepPayload::Assembly(_) => StepKind::Assembly,
            StepPayload::Design(_) => StepKind::Design,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn indices_round_trip() {
        for kind in StepKind::iter() {
            assert_eq!(StepKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(StepKind::from_index(0), None);
        assert_eq!(StepKind::from_index(9), None);
    }

    #[test]
    fn payload_serde_is_tagged_by_step() {
        let payload = StepPayload::Hero(HeroPayload {
            headline: "Beat Keto Flu in 48 Hours".to_string(),
            subheadline: "Smooth ketosis from day one.".to_string(),
            cta_label: "Get Started Risk-Free".to_string(),
            variants: serde_json::json!([]),
            record: GenerationRecord {
                model_used: "gpt-4".to_string(),
                tokens_used: 120,
                generated_at: Utc::now(),
                raw_response: "{}".to_string(),
            },
        });

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["step"], "hero");

        let back: StepPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), StepKind::Hero);
        assert_eq!(back, payload);
    }
}
