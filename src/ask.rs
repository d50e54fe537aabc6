//! Query pipeline wiring.
//!
//! [`build_chain`] assembles the [`AnswerChain`] used by both `docqa ask`
//! and `docqa serve`. Clients are created eagerly so missing credentials
//! fail at startup; the store is opened lazily on the first question and
//! handed back so the caller can close it when done.

use anyhow::Result;
use std::sync::Arc;

use docqa_core::rag::{AnswerChain, Retriever};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::llm::create_chat_model;
use crate::sqlite_store::SqliteStore;

pub fn build_chain(config: &Config) -> Result<(AnswerChain, Arc<SqliteStore>)> {
    let embedder = create_provider(&config.embedding)?;
    let model = create_chat_model(&config.answer)?;
    let template = config.answer_template()?;
    let store = Arc::new(
        SqliteStore::open_existing(config.store_file())
            .with_expected_model(embedder.model_name()),
    );

    tracing::debug!(
        embedding = embedder.model_name(),
        model = model.model_name(),
        k = config.retrieval.k,
        "answer chain ready"
    );

    let chain = AnswerChain::new(
        Retriever::new(embedder, store.clone(), config.retrieval.k),
        template,
        model,
    );
    Ok((chain, store))
}

/// Answer one question from the command line.
pub async fn run_ask(config: &Config, question: &str, show_sources: bool) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("question must not be empty");
    }
    let (chain, store) = build_chain(config)?;
    let answer = chain.answer_with_sources(question).await;
    store.close().await;
    let answer = answer?;

    println!("{}", answer.text.trim_end());
    if show_sources {
        println!();
        println!("Sources:");
        for (i, hit) in answer.sources.iter().enumerate() {
            let page = hit
                .page
                .map(|p| format!(" p.{}", p))
                .unwrap_or_default();
            println!(
                "  {}. [{:.3}] {}{} #{}",
                i + 1,
                hit.score,
                hit.source,
                page,
                hit.chunk_index
            );
        }
    }
    Ok(())
}
