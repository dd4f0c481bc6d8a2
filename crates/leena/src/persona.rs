//! Persona instructions sent as the system prompt with every model call
//!
//! Both relays share one template; the fields below are the knobs that differ between them.
use serde::Serialize;
use std::path::PathBuf;

use crate::models::tool::WEB_SEARCH_TOOL;
use crate::prompt_template::{render_prompt, render_prompt_file};

const PERSONA_TEMPLATE: &str = include_str!("prompts/persona.md");

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Persona {
    /// Soft cap on reply length mentioned to the model
    pub max_reply_chars: u32,
    /// When the model may go past `max_reply_chars`
    pub length_exception: String,
    /// Append emoji to the conversation-style cues
    pub use_emoji_cues: bool,
    /// Ask the model not to answer with bulleted or numbered lists
    pub avoid_lists: bool,
    /// Tell the model about the search tool
    pub web_search: bool,
    /// Tool name the instructions refer to
    pub search_tool: &'static str,
    #[serde(skip)]
    template: Option<PathBuf>,
}

impl Persona {
    /// Persona for the plain chat relay
    pub fn chat() -> Self {
        Self {
            max_reply_chars: 100,
            length_exception: "it's warranted".to_string(),
            use_emoji_cues: true,
            avoid_lists: false,
            web_search: false,
            search_tool: WEB_SEARCH_TOOL,
            template: None,
        }
    }

    /// Persona for the relay that can search the web
    pub fn search() -> Self {
        Self {
            max_reply_chars: 150,
            length_exception: "you're sharing important information".to_string(),
            use_emoji_cues: false,
            avoid_lists: true,
            web_search: true,
            search_tool: WEB_SEARCH_TOOL,
            template: None,
        }
    }

    pub fn with_max_reply_chars(mut self, max_reply_chars: u32) -> Self {
        self.max_reply_chars = max_reply_chars;
        self
    }

    pub fn with_avoid_lists(mut self, avoid_lists: bool) -> Self {
        self.avoid_lists = avoid_lists;
        self
    }

    /// Render from a custom template file instead of the bundled one
    pub fn with_template<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.template = Some(path.into());
        self
    }

    /// Render the system prompt
    pub fn render(&self) -> Result<String, tera::Error> {
        let rendered = match &self.template {
            Some(path) => render_prompt_file(path, self)?,
            None => render_prompt(PERSONA_TEMPLATE, self)?,
        };
        Ok(rendered.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_chat_persona() {
        let prompt = Persona::chat().render().unwrap();

        assert!(prompt.starts_with("You're Leena, a warm and insightful therapist"));
        assert!(prompt.contains("Avoid responding with over 100 characters unless it's warranted."));
        assert!(prompt.contains("- Ask questions a caring friend would 🤔"));
        assert!(prompt.contains("- Offer support in a personal way 💪"));
        assert!(!prompt.contains("7. Avoid using bulleted"));
        assert!(!prompt.contains("web_search"));
        assert!(prompt.ends_with("keeping things real and relatable."));
    }

    #[test]
    fn test_search_persona() {
        let prompt = Persona::search().render().unwrap();

        assert!(prompt.contains(
            "Avoid responding with over 150 characters unless you're sharing important information."
        ));
        assert!(prompt.contains(
            "6. Respectful: Don't assume religious or cultural practices.\n7. Avoid using bulleted/numbered/hyphenated lists"
        ));
        assert!(prompt.contains("- Ask questions a caring friend would\n"));
        assert!(prompt.ends_with("ask the user for additional details if needed."));
        assert!(prompt.contains("use the web_search tool"));
    }

    #[test]
    fn test_knobs() {
        let prompt = Persona::chat()
            .with_max_reply_chars(280)
            .with_avoid_lists(true)
            .render()
            .unwrap();
        assert!(prompt.contains("over 280 characters"));
        assert!(prompt.contains("7. Avoid using bulleted"));
    }

    #[test]
    fn test_custom_template() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("short.md");
        fs::write(&path, "be brief: {{ max_reply_chars }} chars max\n").unwrap();

        let prompt = Persona::search().with_template(&path).render().unwrap();
        assert_eq!(prompt, "be brief: 150 chars max");
    }

    #[test]
    fn test_bundled_template_is_embedded() {
        let persona = Persona::chat();
        assert!(persona.template.is_none());
        assert!(PERSONA_TEMPLATE.contains("{{ max_reply_chars }}"));

        let rendered = render_prompt(PERSONA_TEMPLATE, &persona).unwrap();
        assert_eq!(persona.render().unwrap(), rendered.trim());
    }

    #[test]
    fn test_missing_custom_template_names_the_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("persona.md");

        let err = Persona::chat().with_template(&path).render().unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
