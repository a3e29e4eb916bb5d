//! Splicing retrieved passages into a chat conversation
//!
//! The augmenter only builds the message list; sending it to a chat model is
//! the caller's business. Messages serialize in the OpenAI chat shape.

use serde::{Deserialize, Serialize};

/// Label that opens the synthetic context message.
pub const CONTEXT_LABEL: &str = "Relevant context from documentation:";

/// Input prefix that asks for retrieval on a single question.
pub const RAG_PREFIX: &str = "#rag ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    /// Only appears in conversations read back from JSON
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A user question and whether retrieval was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagQuery {
    /// The question with any `#rag ` prefix removed
    pub question: String,
    pub requested: bool,
}

impl RagQuery {
    /// Retrieval is requested when `rag_flag` is set or the input starts
    /// with `#rag `. The prefix is stripped either way.
    ///
    /// ```
    /// use budgie_retriever::retrieval::augment::RagQuery;
    ///
    /// let query = RagQuery::parse("#rag how do I install?", false);
    /// assert!(query.requested);
    /// assert_eq!(query.question, "how do I install?");
    ///
    /// assert!(!RagQuery::parse("#ragged edge", false).requested);
    /// ```
    pub fn parse(input: &str, rag_flag: bool) -> Self {
        match input.strip_prefix(RAG_PREFIX) {
            Some(question) => Self {
                question: question.to_string(),
                requested: true,
            },
            None => Self {
                question: input.to_string(),
                requested: rag_flag,
            },
        }
    }
}

/// The synthetic message carrying retrieved passages, or `None` when there
/// are none.
pub fn context_message<S: AsRef<str>>(results: &[S]) -> Option<ChatMessage> {
    if results.is_empty() {
        return None;
    }
    let joined = results
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(ChatMessage::system(format!("{CONTEXT_LABEL}\n\n{joined}")))
}

/// Appends the context message (when `requested` and there are results)
/// followed by the user's question.
pub fn augment<S: AsRef<str>>(
    messages: &mut Vec<ChatMessage>,
    results: &[S],
    requested: bool,
    question: &str,
) {
    if requested {
        messages.extend(context_message(results));
    }
    messages.push(ChatMessage::user(question));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rag_query() {
        assert_eq!(
            RagQuery::parse("what is rust?", true),
            RagQuery {
                question: "what is rust?".to_string(),
                requested: true
            }
        );
        assert!(!RagQuery::parse("what is rust?", false).requested);
        assert_eq!(RagQuery::parse("#rag  spaced", false).question, " spaced");
        // The prefix needs its trailing space.
        assert!(!RagQuery::parse("#rag", false).requested);
    }

    #[test]
    fn test_context_message() {
        let message = context_message(&["first passage", "second passage"]).unwrap();
        assert_eq!(message.role, Role::System);
        assert_eq!(
            message.content,
            "Relevant context from documentation:\n\nfirst passage\n\nsecond passage"
        );

        let none: [&str; 0] = [];
        assert!(context_message(&none).is_none());
    }

    #[test]
    fn test_augment_inserts_context_before_question() {
        let mut messages = vec![ChatMessage::system("You are helpful.")];
        augment(&mut messages, &["ctx".to_string()], true, "question?");

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "Relevant context from documentation:\n\nctx");
        assert_eq!(messages[2], ChatMessage::user("question?"));
    }

    #[test]
    fn test_augment_without_results_or_request() {
        let empty: Vec<String> = Vec::new();
        let mut messages = Vec::new();
        augment(&mut messages, &empty, true, "q1");
        assert_eq!(messages, vec![ChatMessage::user("q1")]);

        let mut messages = Vec::new();
        augment(&mut messages, &["ignored"], false, "q2");
        assert_eq!(messages, vec![ChatMessage::user("q2")]);
    }

    #[test]
    fn test_message_json_shape() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));

        let history: Vec<ChatMessage> = serde_json::from_str(
            r#"[{"role":"user","content":"q"},{"role":"assistant","content":"a"}]"#,
        )
        .unwrap();
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "a");
    }
}
