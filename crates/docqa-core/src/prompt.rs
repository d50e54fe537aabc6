//! Question-answering prompt template.
//!
//! A template is plain text containing the `{context}` and `{question}`
//! placeholders. Rendering substitutes both in a single pass, so braces that
//! appear inside the retrieved context or the question are copied verbatim
//! and never re-expanded.

use anyhow::{bail, Result};

use crate::models::RetrievedChunk;

/// The default instructions sent to the answer model.
pub const DEFAULT_QA_TEMPLATE: &str = "You are an AI assistant that answers questions based on the provided documents.
Use the context below to answer the question.
If the answer cannot be found in the context, reply \"I could not find relevant information in the provided documents.\"

Context:
{context}

Question: {question}

Answer:";

const CONTEXT: &str = "{context}";
const QUESTION: &str = "{question}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Context,
    Question,
}

/// A parsed template ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        // The built-in template always contains both placeholders.
        Self {
            segments: split_segments(DEFAULT_QA_TEMPLATE),
        }
    }
}

impl PromptTemplate {
    /// Parse `source`, requiring at least one `{context}` and one
    /// `{question}` placeholder.
    pub fn parse(source: &str) -> Result<Self> {
        let segments = split_segments(source);
        if !segments.contains(&Segment::Context) {
            bail!("prompt template is missing the {{context}} placeholder");
        }
        if !segments.contains(&Segment::Question) {
            bail!("prompt template is missing the {{question}} placeholder");
        }
        Ok(Self { segments })
    }

    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Context => out.push_str(context),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }
}

fn split_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = source;
    loop {
        let next = [(CONTEXT, Segment::Context), (QUESTION, Segment::Question)]
            .into_iter()
            .filter_map(|(needle, seg)| rest.find(needle).map(|pos| (pos, needle, seg)))
            .min_by_key(|(pos, _, _)| *pos);
        match next {
            Some((pos, needle, seg)) => {
                if pos > 0 {
                    segments.push(Segment::Text(rest[..pos].to_string()));
                }
                segments.push(seg);
                rest = &rest[pos + needle.len()..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest.to_string()));
                }
                return segments;
            }
        }
    }
}

/// Join retrieved chunk texts with blank lines, in retrieval order.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            source: "doc.txt".to_string(),
            page: None,
            chunk_index: 0,
            text: text.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn test_default_template_renders_both_placeholders() {
        let prompt = PromptTemplate::default().render("CTX", "Q?");
        assert!(prompt.contains("Context:\nCTX\n\nQuestion: Q?\n\nAnswer:"));
        assert!(prompt.contains("could not find relevant information"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn test_placeholders_in_values_are_not_expanded() {
        let t = PromptTemplate::parse("[{context}] [{question}]").unwrap();
        let out = t.render("uses {question} literally", "and {context} too");
        assert_eq!(out, "[uses {question} literally] [and {context} too]");
    }

    #[test]
    fn test_parse_requires_both_placeholders() {
        assert!(PromptTemplate::parse("only {context}").is_err());
        assert!(PromptTemplate::parse("only {question}").is_err());
        assert!(PromptTemplate::parse("{question} then {context}").is_ok());
    }

    #[test]
    fn test_repeated_placeholders() {
        let t = PromptTemplate::parse("{question}|{context}|{question}").unwrap();
        assert_eq!(t.render("c", "q"), "q|c|q");
    }

    #[test]
    fn test_format_context_joins_with_blank_lines() {
        let ctx = format_context(&[hit("one"), hit("two"), hit("three")]);
        assert_eq!(ctx, "one\n\ntwo\n\nthree");
        assert_eq!(format_context(&[]), "");
    }
}
