//! Prompt composer.
//!
//! Builds the persona directive and folds it into the caller's messages as
//! the conversation's single system message. Composition never mutates the
//! input; it returns a new sequence.

use wellmed_config::PersonaConfig;
use wellmed_core::message::Message;

/// The fixed assistant identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub developer: String,
    pub specialty: String,
    /// Provider names the assistant must never mention
    pub provider_tokens: Vec<String>,
}

impl From<&PersonaConfig> for Persona {
    fn from(config: &PersonaConfig) -> Self {
        Self {
            name: config.name.clone(),
            developer: config.developer.clone(),
            specialty: config.specialty.clone(),
            provider_tokens: config.provider_tokens.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    persona: Persona,
}

impl PromptComposer {
    pub fn new(persona: Persona) -> Self {
        Self { persona }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// The system directive for one request.
    ///
    /// A blank `document_context` counts as absent. A present one is
    /// embedded verbatim.
    pub fn directive(&self, document_context: Option<&str>) -> String {
        let persona = &self.persona;
        let mut directive = format!(
            "You are {}, a helpful assistant developed by {}. You specialize in {}.\n",
            persona.name, persona.developer, persona.specialty
        );

        if let Some(context) = document_context.filter(|c| !c.trim().is_empty()) {
            directive.push_str(
                "\nA document has been uploaded for analysis. Here is the document content:\n\n",
            );
            directive.push_str(context);
            directive.push_str(
                "\n\nGround your answers in this document whenever it is relevant to the question.\n",
            );
        }

        directive.push_str(
            "\nAlways format your responses in a clear, structured way using markdown \
             headings and bullet points.",
        );
        directive.push(' ');
        directive.push_str(&self.confidentiality_clause());
        directive
    }

    fn confidentiality_clause(&self) -> String {
        let name = &self.persona.name;
        match self.persona.provider_tokens.as_slice() {
            [] => format!(
                "Never reveal the name of the underlying model or its provider, and do not \
                 discuss your origins. Always stay in character as {name}."
            ),
            tokens => format!(
                "Never reveal the name of the underlying model or its provider: do not mention \
                 {} or your origins. Always stay in character as {name}.",
                tokens.join(", ")
            ),
        }
    }

    /// Produce the outbound message sequence.
    ///
    /// The first caller system message (if any) is replaced in place by the
    /// directive and later system messages are dropped; without one, the
    /// directive is prepended. Every other message keeps its content and
    /// relative order.
    pub fn compose(&self, messages: &[Message], document_context: Option<&str>) -> Vec<Message> {
        let mut directive = Some(self.directive(document_context));
        let mut composed = Vec::with_capacity(messages.len() + 1);

        for message in messages {
            if message.is_system() {
                if let Some(directive) = directive.take() {
                    composed.push(Message::system(directive));
                }
                continue;
            }
            composed.push(message.clone());
        }

        if let Some(directive) = directive {
            composed.insert(0, Message::system(directive));
        }

        composed
    }
}
