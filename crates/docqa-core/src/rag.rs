//! Retrieval-augmented answer chain.
//!
//! ```text
//! question ─▶ embed ─▶ top-K search ─▶ join context ─▶ template ─▶ chat model ─▶ text
//! ```
//!
//! Every call is independent: no conversation memory and no caching.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::embedding::{embed_one, EmbeddingProvider};
use crate::llm::ChatModel;
use crate::models::RetrievedChunk;
use crate::prompt::{format_context, PromptTemplate};
use crate::store::VectorStore;
use crate::transcript::Turn;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds a question and fetches its nearest chunks.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>, k: usize) -> Self {
        Self { embedder, store, k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>> {
        let query = embed_one(self.embedder.as_ref(), question)
            .await
            .context("failed to embed question")?;
        let hits = self.store.similarity_search(&query, self.k).await?;
        tracing::debug!(k = self.k, hits = hits.len(), "retrieved context");
        Ok(hits)
    }
}

/// A generated answer together with the chunks it was conditioned on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedChunk>,
}

/// The full question-answering pipeline.
pub struct AnswerChain {
    retriever: Retriever,
    template: PromptTemplate,
    model: Arc<dyn ChatModel>,
}

impl AnswerChain {
    pub fn new(retriever: Retriever, template: PromptTemplate, model: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            template,
            model,
        }
    }

    /// Retrieve context for `question` and render the filled prompt.
    pub async fn build_prompt(&self, question: &str) -> Result<(String, Vec<RetrievedChunk>)> {
        let sources = self.retriever.retrieve(question).await?;
        let context = format_context(&sources);
        Ok((self.template.render(&context, question), sources))
    }

    /// Answer `question`, returning the model's raw text.
    pub async fn answer(&self, question: &str) -> Result<String> {
        Ok(self.answer_with_sources(question).await?.text)
    }

    pub async fn answer_with_sources(&self, question: &str) -> Result<Answer> {
        let (prompt, sources) = self.build_prompt(question).await?;
        let text = self.model.complete(&[Turn::user(prompt)]).await?;
        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmbeddingRecord;
    use crate::store::memory::InMemoryStore;
    use crate::store::EmptyStoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TOPICS: [&str; 4] = ["refund", "shipping", "warranty", "password"];

    /// Embeds text as a bag of known topic words.
    struct TopicEmbedder;

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        fn model_name(&self) -> &str {
            "topics"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    TOPICS
                        .iter()
                        .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    /// Answers with the sentence of the prompt that mentions "days".
    #[derive(Default)]
    struct ReadingModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for ReadingModel {
        fn model_name(&self) -> &str {
            "reader"
        }

        async fn complete(&self, turns: &[Turn]) -> Result<String> {
            let prompt = turns[0].content.clone();
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(prompt
                .lines()
                .find(|l| l.contains("days"))
                .map(|l| format!("According to the documents: {}", l))
                .unwrap_or_else(|| "I could not find relevant information.".to_string()))
        }
    }

    async fn store_with(texts: &[&str]) -> Arc<InMemoryStore> {
        let embedder = TopicEmbedder;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed(&owned).await.unwrap();
        let records = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| EmbeddingRecord {
                id: i.to_string(),
                source: "policy.txt".to_string(),
                page: None,
                chunk_index: i as i64,
                text: text.to_string(),
                hash: crate::chunk::hash_text(text),
                vector,
            })
            .collect();
        Arc::new(InMemoryStore::with_records(records))
    }

    #[tokio::test]
    async fn test_refund_question_uses_retrieved_chunk() {
        let store = store_with(&[
            "Refunds are accepted within 30 days",
            "Shipping takes five business days",
            "The warranty covers manufacturing defects",
            "Reset your password from the login page",
        ])
        .await;
        let model = Arc::new(ReadingModel::default());
        let chain = AnswerChain::new(
            Retriever::new(Arc::new(TopicEmbedder), store, DEFAULT_TOP_K),
            PromptTemplate::default(),
            model.clone(),
        );

        let answer = chain
            .answer_with_sources("What is the refund window?")
            .await
            .unwrap();

        assert_eq!(answer.sources.len(), 3);
        assert_eq!(answer.sources[0].text, "Refunds are accepted within 30 days");
        assert!(answer.text.contains("30 days"));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Refunds are accepted within 30 days\n\n"));
        assert!(prompts[0].contains("Question: What is the refund window?"));
    }

    #[tokio::test]
    async fn test_empty_store_surfaces_error_instead_of_answer() {
        let model = Arc::new(ReadingModel::default());
        let chain = AnswerChain::new(
            Retriever::new(Arc::new(TopicEmbedder), Arc::new(InMemoryStore::new()), 3),
            PromptTemplate::default(),
            model.clone(),
        );

        let err = chain.answer("What is the refund window?").await.unwrap_err();
        assert!(err.downcast_ref::<EmptyStoreError>().is_some());
        assert!(model.prompts.lock().unwrap().is_empty());
    }
}
