//! System prompt construction

use crate::error::Result;
use crate::tools::ToolRegistry;
use handlebars::Handlebars;
use serde_json::json;

/// Built-in guidance for generating a web application
pub const APP_BUILDER_GUIDANCE: &str = r#"You are an expert full-stack developer. You build complete, runnable web applications from a short natural-language description, one file at a time.

Follow these steps:
1. Understand what the user is asking for and the pages, routes and data it implies.
2. Plan the files the application needs: an entry point (for example `app.py`), route handlers (for example `routes/home.py`), templates (`templates/*.html`) and static assets (`static/css/*.css`, `static/js/*.js`).
3. Implement the plan step by step, writing each file in full.
4. Review files you already wrote with `read_file` before changing them.
5. Never leave placeholders or TODO stubs; every file must be complete.
6. Never ask the user for input; make reasonable decisions yourself.
7. When every file is written and consistent, call `finish` with a short summary."#;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"{{guidance}}

# Available tools
{{#each tools}}
- `{{this.signature}}`: {{this.description}}
{{/each}}

# Response format
Respond only through tool calls. You may call several tools in one response; they run in the order you list them, and later calls see the effects of earlier ones.
File paths are relative to the application root, use `/` as separator and must not leave the root (no leading `/`, no `..`).
A failed tool call returns an error message; read it and correct the call.
The session ends only when you call `finish`."#;

/// Render the system prompt
///
/// `guidance` replaces the built-in instructions; the tool list and the
/// response format contract are always included.
pub fn build_system_prompt(registry: &ToolRegistry, guidance: Option<&str>) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let tools: Vec<_> = registry
        .describe_all()
        .iter()
        .map(|definition| {
            json!({
                "signature": definition.signature(),
                "description": definition.description,
            })
        })
        .collect();

    let context = json!({
        "guidance": guidance.unwrap_or(APP_BUILDER_GUIDANCE).trim(),
        "tools": tools,
    });

    Ok(handlebars.render_template(SYSTEM_PROMPT_TEMPLATE, &context)?)
}

/// User message carrying the goal
pub fn build_user_message(goal: &str) -> String {
    format!(
        "Build the following web application:\n\n{}\n\nStart by planning the files, then write them with the tools.",
        goal.trim()
    )
}

/// Corrective note appended after a malformed response
pub fn malformed_response_note(reason: &str) -> String {
    format!(
        "Your last response could not be processed: {}. Respond only with tool calls whose arguments are JSON objects matching the tool schemas.",
        reason
    )
}

/// Nudge appended after a response without tool calls
pub const NO_TOOL_CALL_NOTE: &str = "Your last response did not call any tool. Continue building the application using the tools, and call `finish` when it is complete.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_lists_every_tool() {
        let registry = ToolRegistry::default();
        let prompt = build_system_prompt(&registry, None).unwrap();

        assert!(prompt.starts_with("You are an expert full-stack developer."));
        for definition in registry.describe_all() {
            assert!(prompt.contains(&definition.signature()));
        }
        assert!(prompt.contains("- `write_file(path, content)`: Create or overwrite"));
        assert!(prompt.contains("Respond only through tool calls."));
    }

    #[test]
    fn test_custom_guidance_keeps_contract() {
        let registry = ToolRegistry::default();
        let prompt =
            build_system_prompt(&registry, Some("Build <small> apps & keep it simple.")).unwrap();

        // No HTML escaping
        assert!(prompt.starts_with("Build <small> apps & keep it simple."));
        assert!(!prompt.contains("expert full-stack developer"));
        assert!(prompt.contains("`finish(summary)`"));
        assert!(prompt.contains("# Response format"));
    }

    #[test]
    fn test_user_message() {
        let message = build_user_message("  a todo list  ");
        assert!(message.contains("\n\na todo list\n\n"));
    }
}
