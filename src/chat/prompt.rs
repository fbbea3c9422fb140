use crate::chat::history::{Role, StoredMessage};
use crate::cortex::RetrievedDocument;

/// Persona block used when the config does not override it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Remedia, an expert health assistant that extracts information from the CONTEXT
provided between <context> and </context> tags.
You offer a chat experience considering the information included in the CHAT HISTORY
provided between <chat_history> and </chat_history> tags.
When answering the question contained between <question> and </question> tags
be concise and do not include anything that is not relevant to the question.

Do not mention the CONTEXT used in your answer.
Do not mention the CHAT HISTORY used in your answer.

Only answer the question if you can extract it from the CONTEXT provided.";

/// Single quotes are stripped before the question enters the retrieval and
/// prompt pipeline. The raw text still goes into the transcript.
pub fn sanitize_question(question: &str) -> String {
    question.replace('\'', "")
}

pub fn render_history(messages: &[StoredMessage]) -> String {
    messages
        .iter()
        .map(|message| format!("{}: {}", role_label(message.role), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Numbered context block, one entry per retrieved chunk in backend order.
pub fn render_context(documents: &[RetrievedDocument], search_column: &str) -> String {
    let mut context = String::new();
    for (index, document) in documents.iter().enumerate() {
        context.push_str(&format!(
            "Context document {}: {} \n\n",
            index + 1,
            document.text(search_column)
        ));
    }
    context
}

pub fn answer_prompt(system_prompt: &str, history: &str, context: &str, question: &str) -> String {
    format!(
        "[INST]\n\
         {system_prompt}\n\
         \n\
         <chat_history>\n\
         {history}\n\
         </chat_history>\n\
         <context>\n\
         {context}\n\
         </context>\n\
         <question>\n\
         {question}\n\
         </question>\n\
         [/INST]\n\
         Answer:"
    )
}

pub fn rewrite_prompt(history: &str, question: &str) -> String {
    format!(
        "[INST]\n\
         Based on the chat history below and the question, generate a query that extends the question\n\
         with the chat history provided. The query should be in natural language.\n\
         Answer with only the query. Do not add any explanation.\n\
         \n\
         <chat_history>\n\
         {history}\n\
         </chat_history>\n\
         <question>\n\
         {question}\n\
         </question>\n\
         [/INST]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn document(text: &str) -> RetrievedDocument {
        let mut columns = BTreeMap::new();
        columns.insert("chunk".to_string(), json!(text));
        RetrievedDocument::new(columns)
    }

    #[test]
    fn rewrite_prompt_has_no_persona_block() {
        let prompt = rewrite_prompt("user: hi", "what about dosage?");

        assert!(prompt.contains("<chat_history>\nuser: hi\n</chat_history>"));
        assert!(prompt.contains("<question>\nwhat about dosage?\n</question>"));
        assert!(!prompt.contains("CONTEXT"));
    }

    #[test]
    fn sanitize_strips_single_quotes_only() {
        assert_eq!(
            sanitize_question("What's in the children's syrup?"),
            "Whats in the childrens syrup?"
        );
        assert_eq!(sanitize_question("plain question"), "plain question");
    }

    #[test]
    fn context_entries_are_numbered_from_one_in_order() {
        let documents = vec![document("first chunk"), document("second chunk")];

        let context = render_context(&documents, "chunk");

        assert_eq!(
            context,
            "Context document 1: first chunk \n\nContext document 2: second chunk \n\n"
        );
    }

    #[test]
    fn context_of_no_documents_is_empty() {
        assert_eq!(render_context(&[], "chunk"), "");
    }

    #[test]
    fn history_renders_as_role_prefixed_lines() {
        let messages = vec![
            StoredMessage::user("Does aspirin thin the blood?"),
            StoredMessage::assistant("Yes, it inhibits clotting."),
        ];

        assert_eq!(
            render_history(&messages),
            "user: Does aspirin thin the blood?\nassistant: Yes, it inhibits clotting."
        );
    }

    #[test]
    fn answer_prompt_is_deterministic_and_ordered() {
        let first = answer_prompt(DEFAULT_SYSTEM_PROMPT, "h", "c", "q");
        let second = answer_prompt(DEFAULT_SYSTEM_PROMPT, "h", "c", "q");

        assert_eq!(first, second);

        let history_at = first.find("<chat_history>").unwrap();
        let context_at = first.find("<context>").unwrap();
        let question_at = first.find("<question>").unwrap();
        assert!(history_at < context_at);
        assert!(context_at < question_at);
        assert!(first.starts_with("[INST]"));
        assert!(first.ends_with("Answer:"));
    }
}
