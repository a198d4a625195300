use crate::types::{Message, TrainingExample};

/// Instruction wrapper expected by the target model's fine-tuning convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstructFormat {
    /// `<s>[INST] prompt [/INST]\nresponse</s>`
    #[default]
    Mistral,
}

impl InstructFormat {
    fn markers(self) -> (&'static str, &'static str, &'static str) {
        match self {
            InstructFormat::Mistral => ("<s>[INST] ", " [/INST]\n", "</s>"),
        }
    }

    pub fn wrap(self, prompt: &str, response: &str) -> String {
        let (open, close, end) = self.markers();
        format!("{open}{prompt}{close}{response}{end}")
    }

    /// Recover the response from a string wrapped around `prompt`. The known
    /// prompt is stripped rather than searched for, so marker text inside
    /// the prompt cannot shift the split.
    pub fn response_of<'a>(self, text: &'a str, prompt: &str) -> Option<&'a str> {
        let (open, close, end) = self.markers();
        text.strip_prefix(open)?
            .strip_prefix(prompt)?
            .strip_prefix(close)?
            .strip_suffix(end)
    }
}

/// Build both representations from the same prompt and profile.
pub fn assemble(format: InstructFormat, prompt: &str, profile: &str) -> TrainingExample {
    TrainingExample {
        text: format.wrap(prompt, profile),
        messages: vec![Message::user(prompt), Message::assistant(profile)],
    }
}

/// True when the assistant message matches the response embedded in `text`
/// around the user message.
pub fn is_consistent(format: InstructFormat, example: &TrainingExample) -> bool {
    let (Some(prompt), Some(message)) = (example.prompt(), example.response()) else {
        return false;
    };
    format.response_of(&example.text, prompt) == Some(message)
}
