// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # PromptLibrary — Reasoning Stage Templates
//!
//! Handlebars templates for every reasoning stage, registered and
//! validated once at construction. Prompts are plain text sent to a
//! generation backend, so HTML escaping is disabled.
//!
//! The context struct carries only the fields a given stage needs;
//! unused fields are omitted from serialization and strict mode is off,
//! so each template picks what it wants.

use std::collections::HashMap;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use crate::domain::ReasoningStage;

/// Variables available to stage templates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_count: Option<usize>,

    /// Transcript of earlier steps, one `kind: content` line each
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,

    /// One `- category: description` line per evidence item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_cases: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_steps: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_reasoning: Option<String>,

    /// Additional ad-hoc variables
    #[serde(flatten)]
    pub extras: HashMap<String, serde_json::Value>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn evidence_count(mut self, count: usize) -> Self {
        self.evidence_count = Some(count);
        self
    }

    pub fn observations(mut self, observations: impl Into<String>) -> Self {
        self.observations = Some(observations.into());
        self
    }

    pub fn evidence_summary(mut self, summary: impl Into<String>) -> Self {
        self.evidence_summary = Some(summary.into());
        self
    }

    pub fn case_context(mut self, context: impl Into<String>) -> Self {
        self.case_context = Some(context.into());
        self
    }

    pub fn similar_cases(mut self, cases: impl Into<String>) -> Self {
        self.similar_cases = Some(cases.into());
        self
    }

    pub fn chain_summary(mut self, summary: impl Into<String>) -> Self {
        self.chain_summary = Some(summary.into());
        self
    }

    pub fn weaknesses(mut self, weaknesses: impl Into<String>) -> Self {
        self.weaknesses = Some(weaknesses.into());
        self
    }

    pub fn weak_steps(mut self, steps: impl Into<String>) -> Self {
        self.weak_steps = Some(steps.into());
        self
    }

    pub fn key_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.key_reasoning = Some(reasoning.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

const OBSERVATION_TEMPLATE: &str = "\
Analyze this case and make initial observations. List 5-7 key observations with reasoning.

Case: {{title}}
Date: {{date}}
Description: {{description}}
Evidence Count: {{evidence_count}}

For each observation, explain:
1. What you observe
2. Why it's significant
3. What evidence supports it

Format as numbered list.";

const EVIDENCE_INFERENCE_TEMPLATE: &str = "\
Based on previous observations, analyze the evidence systematically.

Previous Observations:
{{observations}}

Evidence:
{{evidence_summary}}

For each piece of evidence, determine:
1. What it tells us
2. How it connects to observations
3. What questions it raises
4. Reliability assessment

Format as numbered list with reasoning.";

const PATTERN_HYPOTHESIS_TEMPLATE: &str = "\
Identify patterns and connections.

Case Context:
{{case_context}}

Similar Cases:
{{similar_cases}}

Analyze:
1. Patterns in MO, timing, location
2. Connections to other cases
3. What patterns suggest
4. Confidence in pattern matches

Format as numbered list with detailed reasoning.";

const HYPOTHESIS_GENERATION_TEMPLATE: &str = "\
Generate hypotheses based on the reasoning chain.

Reasoning So Far:
{{chain_summary}}

For each hypothesis:
1. State the hypothesis clearly
2. Explain the reasoning that leads to it
3. List supporting evidence
4. Consider alternative explanations
5. Assess confidence level

Format as numbered list with full reasoning.";

const VALIDATION_TEMPLATE: &str = "\
Validate the reasoning chain. Check each step for:
1. Logical consistency
2. Evidence support
3. Potential errors or biases
4. Missing considerations

Reasoning Chain:
{{chain_summary}}

For each validation:
- Identify what you're checking
- Explain why it's valid or invalid
- Suggest improvements if needed

Format as numbered list.";

const REFLECTION_TEMPLATE: &str = "\
Reflect on your reasoning process. Be honest and critical.

Reasoning Process:
{{chain_summary}}

Assess:
1. Strengths: What did you do well?
2. Weaknesses: Where could you improve?
3. Improvements: Specific ways to enhance reasoning
4. Overall confidence: High, Medium, or Low and why

Be specific and actionable.";

const CORRECTION_TEMPLATE: &str = "\
Correct weaknesses in your reasoning.

Identified Weaknesses:
{{weaknesses}}

Steps Needing Correction:
{{weak_steps}}

Provide corrected reasoning for each weak step.";

const CONCLUSION_TEMPLATE: &str = "\
Draw final conclusions based on the complete reasoning chain.

Key Reasoning:
{{key_reasoning}}

Provide 5-8 specific, actionable conclusions. Each should:
1. Be clearly stated
2. Be supported by the reasoning chain
3. Include confidence level
4. Be actionable

Format as numbered list.";

const STAGE_TEMPLATES: [(ReasoningStage, &str); 8] = [
    (ReasoningStage::Observation, OBSERVATION_TEMPLATE),
    (ReasoningStage::EvidenceInference, EVIDENCE_INFERENCE_TEMPLATE),
    (ReasoningStage::PatternHypothesis, PATTERN_HYPOTHESIS_TEMPLATE),
    (ReasoningStage::HypothesisGeneration, HYPOTHESIS_GENERATION_TEMPLATE),
    (ReasoningStage::Validation, VALIDATION_TEMPLATE),
    (ReasoningStage::Reflection, REFLECTION_TEMPLATE),
    (ReasoningStage::Correction, CORRECTION_TEMPLATE),
    (ReasoningStage::Conclusion, CONCLUSION_TEMPLATE),
];

/// Renders the per-stage prompts.
pub struct PromptLibrary {
    handlebars: Handlebars<'static>,
}

impl PromptLibrary {
    /// Register and validate every stage template.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false); // Don't fail on missing variables
        handlebars.register_escape_fn(handlebars::no_escape);

        for (stage, template) in STAGE_TEMPLATES {
            handlebars
                .register_template_string(stage.label(), template)
                .with_context(|| format!("Failed to register {stage} template"))?;
        }

        Ok(Self { handlebars })
    }

    /// Render the prompt for one stage.
    pub fn render(&self, stage: ReasoningStage, context: &PromptContext) -> Result<String> {
        self.handlebars
            .render(stage.label(), context)
            .with_context(|| format!("Failed to render {stage} prompt"))
    }

    /// Fixed system prompt framing each stage's role.
    pub fn system_prompt(stage: ReasoningStage) -> &'static str {
        match stage {
            ReasoningStage::Observation => {
                "You are a meticulous detective making careful observations. \
                 Be specific and evidence-based."
            }
            ReasoningStage::EvidenceInference => {
                "You are analyzing evidence methodically, looking for connections \
                 and inconsistencies."
            }
            ReasoningStage::PatternHypothesis => {
                "You are identifying patterns with careful reasoning, avoiding false connections."
            }
            ReasoningStage::HypothesisGeneration => {
                "You are generating hypotheses with clear logical reasoning, \
                 considering alternatives."
            }
            ReasoningStage::Validation => {
                "You are a critical validator, checking reasoning for errors and improvements."
            }
            ReasoningStage::Reflection => {
                "You are engaging in honest self-reflection to improve your reasoning."
            }
            ReasoningStage::Correction => {
                "You are correcting your reasoning to improve accuracy and quality."
            }
            ReasoningStage::Conclusion => {
                "You are drawing final conclusions with clear reasoning and \
                 appropriate confidence."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_stage_templates_register() {
        let library = PromptLibrary::new().unwrap();
        for stage in ReasoningStage::ALL {
            let rendered = library.render(stage, &PromptContext::new()).unwrap();
            assert!(!rendered.is_empty());
        }
    }

    #[test]
    fn test_observation_prompt_interpolates_case_fields() {
        let library = PromptLibrary::new().unwrap();
        let context = PromptContext::new()
            .title("Riverside burglary")
            .date("2023-04-12")
            .description("Window forced, jewelry missing")
            .evidence_count(4);

        let prompt = library.render(ReasoningStage::Observation, &context).unwrap();
        assert!(prompt.contains("Case: Riverside burglary"));
        assert!(prompt.contains("Date: 2023-04-12"));
        assert!(prompt.contains("Evidence Count: 4"));
        assert!(prompt.ends_with("Format as numbered list."));
    }

    #[test]
    fn test_prompts_are_not_html_escaped() {
        let library = PromptLibrary::new().unwrap();
        let context = PromptContext::new()
            .title("O'Leary & Sons warehouse")
            .description("Padlock \"cut\" cleanly");

        let prompt = library.render(ReasoningStage::Observation, &context).unwrap();
        assert!(prompt.contains("O'Leary & Sons warehouse"));
        assert!(prompt.contains("Padlock \"cut\" cleanly"));
    }

    #[test]
    fn test_correction_prompt_lists_weak_steps() {
        let library = PromptLibrary::new().unwrap();
        let context = PromptContext::new()
            .weaknesses("Overreached on timeline\nIgnored alternative suspect")
            .weak_steps("Step 2: The gap proves intent");

        let prompt = library.render(ReasoningStage::Correction, &context).unwrap();
        assert!(prompt.contains("Identified Weaknesses:\nOverreached on timeline"));
        assert!(prompt.contains("Steps Needing Correction:\nStep 2: The gap proves intent"));
    }

    #[test]
    fn test_missing_variables_render_blank() {
        let library = PromptLibrary::new().unwrap();
        let prompt = library
            .render(ReasoningStage::PatternHypothesis, &PromptContext::new())
            .unwrap();
        assert!(prompt.contains("Case Context:\n\n"));
    }

    #[test]
    fn test_every_stage_has_a_system_prompt() {
        for stage in ReasoningStage::ALL {
            assert!(!PromptLibrary::system_prompt(stage).is_empty());
        }
    }

    #[test]
    fn test_context_serialization_skips_absent_fields() {
        let context = PromptContext::new().title("Only title");
        let json = serde_json::to_value(&context).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["title"], "Only title");
    }
}
