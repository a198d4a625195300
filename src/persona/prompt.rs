use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

use crate::persona::{humanize, title_case};
use crate::types::PersonaRecord;

/// Instructions with no demographic hints
pub const UNCONDITIONAL_PROMPTS: &[&str] = &[
    "Generate a realistic persona for a life simulation.",
    "Create a detailed character profile for a simulated person.",
    "Design a believable AI person with a complete background.",
    "Generate a new NPC persona with demographics, personality, and goals.",
    "Create a lifelike character with interests, skills, and ambitions.",
];

/// Instructions filled with the record's own demographics
pub const CONDITIONAL_TEMPLATES: &[&str] = &[
    "Generate a realistic persona for a {age}-year-old {sex} living in {city}, {state}.",
    "Create a character profile: {sex}, age {age}, {occupation} in {city}, {state}.",
    "Design a persona for someone who is {age}, {marital_status}, working as a {occupation}.",
    "Generate a believable person: {sex}, {age} years old, {education_level} education, based in {city}, {state}.",
];

/// Probability of drawing from the unconditional pool
const UNCONDITIONAL_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Unconditional,
    Conditional,
}

impl PromptKind {
    /// Classify an already-built prompt by pool membership.
    pub fn of(prompt: &str) -> Self {
        if UNCONDITIONAL_PROMPTS.iter().any(|p| *p == prompt) {
            PromptKind::Unconditional
        } else {
            PromptKind::Conditional
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPrompt {
    pub text: String,
    pub kind: PromptKind,
}

/// Chooses the instruction for each record.
pub struct PromptSelector {
    placeholder_re: Regex,
}

impl PromptSelector {
    pub fn new() -> Result<Self> {
        let placeholder_re =
            Regex::new(r"\{(\w+)\}").context("compiling placeholder regex")?;
        Ok(Self { placeholder_re })
    }

    /// Draw a prompt for `record`. Consumes one `f64` for the branch, then
    /// one pool choice.
    pub fn select<R: Rng + ?Sized>(
        &self,
        record: &PersonaRecord,
        rng: &mut R,
    ) -> Result<SelectedPrompt> {
        if rng.gen::<f64>() < UNCONDITIONAL_SHARE {
            let prompt = UNCONDITIONAL_PROMPTS
                .choose(rng)
                .context("unconditional prompt pool is empty")?;
            Ok(SelectedPrompt {
                text: prompt.to_string(),
                kind: PromptKind::Unconditional,
            })
        } else {
            let template = CONDITIONAL_TEMPLATES
                .choose(rng)
                .context("conditional template pool is empty")?;
            Ok(SelectedPrompt {
                text: self.fill(template, record)?,
                kind: PromptKind::Conditional,
            })
        }
    }

    /// Substitute every `{name}` placeholder in `template`. An unknown
    /// placeholder is an error.
    pub fn fill(&self, template: &str, record: &PersonaRecord) -> Result<String> {
        let mut output = String::with_capacity(template.len() + 32);
        let mut last = 0;

        for caps in self.placeholder_re.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = placeholder_value(name.as_str(), record).with_context(|| {
                format!(
                    "template placeholder {{{}}} has no matching field: {}",
                    name.as_str(),
                    template
                )
            })?;
            output.push_str(&template[last..whole.start()]);
            output.push_str(&value);
            last = whole.end();
        }

        output.push_str(&template[last..]);
        Ok(output)
    }
}

fn placeholder_value(name: &str, record: &PersonaRecord) -> Option<String> {
    let value = match name {
        "age" => record.age.clone(),
        "sex" => record.sex.clone(),
        "city" => record.city.clone(),
        "state" => record.state.clone(),
        "occupation" => title_case(&humanize(&record.occupation)),
        "marital_status" => humanize(&record.marital_status),
        "education_level" => humanize(&record.education_level),
        _ => return None,
    };
    Some(value)
}
