//! Plain-text export of a prompt and the response it produced.

use chrono::{DateTime, Local, NaiveDate};

use crate::document::PromptDocument;

const RULE: &str = "========================================";

/// File name for an export: `prompt_<title>_<date>.txt`.
///
/// Whitespace runs in the title collapse to one `_` and every other character
/// outside `[A-Za-z0-9_-]` becomes `_`, so the name never leaves the current
/// directory.
pub fn file_name(title: &str, date: NaiveDate) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    let title: String = words
        .join("_")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("prompt_{}_{}.txt", title, date.format("%Y-%m-%d"))
}

/// Renders the full transcript: header, every block (empty ones included),
/// the serialized prompt, and the response.
pub fn transcript(
    document: &PromptDocument,
    model: &str,
    temperature: f32,
    response: &str,
    generated_at: DateTime<Local>,
) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("PROMPT: {}\n", document.title()));
    out.push_str(&format!("Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Model: {}\n", model));
    out.push_str(&format!("Temperature: {}\n", temperature));
    out.push_str(RULE);
    out.push_str("\n\n=================== PROMPT BLOCKS ===================\n");

    for block in document.blocks() {
        let required = if block.is_required() { " (required)" } else { "" };
        out.push_str(&format!(
            "\n[{}]{}\nKind: {}\n---\n{}\n---\n",
            block.label(),
            required,
            block.kind(),
            block.content()
        ));
    }

    out.push_str("\n=================== FINAL PROMPT ===================\n\n");
    out.push_str(&document.serialize());
    out.push_str("\n\n=================== RESPONSE ===================\n\n");
    out.push_str(response);
    out.push_str("\n\n");
    out.push_str(RULE);
    out.push_str("\nEnd of file\n");

    out
}
