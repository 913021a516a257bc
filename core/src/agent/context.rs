use crate::agent::Conversation;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an intelligent AI assistant who answers questions about articles based on the RSS data loaded into your knowledge base.
Use the retriever tool available to answer questions about articles data. You can make multiple calls if needed.
If you need to look up some information before asking a follow up question, you are allowed to do that!
Please always cite the specific parts of the documents you use in your answers.";

/// Holds the fixed system instruction and opens new conversations with it.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Blank overrides are ignored.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.trim().is_empty() {
            self.system_prompt = prompt.trim().to_string();
        }
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn build_conversation(&self, question: &str) -> Conversation {
        Conversation::new(self.system_prompt.clone(), question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChatMessage;

    #[test]
    fn default_prompt_asks_for_citations() {
        let builder = ContextBuilder::new();
        assert!(builder.system_prompt().contains("cite"));
    }

    #[test]
    fn blank_override_keeps_default() {
        let builder = ContextBuilder::new().with_system_prompt("   ");
        assert_eq!(builder.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn conversation_opens_with_prompt_and_question() {
        let conv = ContextBuilder::new()
            .with_system_prompt("Be brief.")
            .build_conversation("What happened?");
        assert_eq!(
            conv.messages(),
            &[ChatMessage::system("Be brief."), ChatMessage::user("What happened?")]
        );
    }
}
