//! Fixed prompt text for chat runs and title generation.

/// Opening of every system prompt.
pub const PERSONA: &str =
    "You are a delightfully helpful assistant in a one-on-one chat. Be warm but succinct.";

/// Closing rules appended after the tool fragments.
pub const FORMATTING_RULES: &str = "Your response must be in Markdown. The Markdown environment also supports LaTeX using
KaTeX. Note that you MUST use $ for inline LaTeX and $$ for block LaTeX. KaTeX does
not support using \\( \\) or \\[ \\] for inline or block LaTeX. This is very important
since it will break rendering.";

/// System prompt for the one-shot title completion.
pub const TITLE_PROMPT: &str = "You are a chat assistant summarizing a conversation to create a title for the conversation in a chat app. Be succinct and return a string of no more than five words.";

/// Body written into the assistant message when the provider fails.
pub const APOLOGY: &str = "I'm sorry, but I'm having trouble right now. Please try again later.";

/// Assembles the system prompt from the persona, the registered tools'
/// prompt fragments and the formatting rules.
pub fn build_system_prompt(tool_prompts: &str) -> String {
    let mut sections = vec![PERSONA];
    if !tool_prompts.trim().is_empty() {
        sections.push(tool_prompts);
    }
    sections.push(FORMATTING_RULES);
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_tools_has_persona_and_rules() {
        let prompt = build_system_prompt("");
        assert!(prompt.starts_with(PERSONA));
        assert!(prompt.ends_with(FORMATTING_RULES));
        assert!(!prompt.contains("\n\n\n\n"));
    }

    #[test]
    fn tool_fragments_sit_between_persona_and_rules() {
        let prompt = build_system_prompt("Use the memory tool.");
        let persona = prompt.find(PERSONA).unwrap();
        let tools = prompt.find("Use the memory tool.").unwrap();
        let rules = prompt.find(FORMATTING_RULES).unwrap();
        assert!(persona < tools && tools < rules);
    }

    #[test]
    fn formatting_rules_mention_katex_delimiters() {
        assert!(FORMATTING_RULES.contains("$$"));
        assert!(FORMATTING_RULES.contains("\\( \\)"));
    }
}
