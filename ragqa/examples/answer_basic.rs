//! # Answer Basic Example
//!
//! Answers a question over a small in-memory corpus using the deterministic
//! mock providers, so it runs with **zero API keys**.
//!
//! Run: `cargo run -p ragqa --example answer_basic`

use std::sync::Arc;

use ragqa::mock::{MockCompletionProvider, MockEmbeddingProvider};
use ragqa::{ChatModel, Document, RagPipeline, Retriever};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragqa_telemetry::init_telemetry("answer_basic")?;

    let corpus = vec![
        Document::from("Paris is the capital of France."),
        Document::from("The Eiffel Tower is in Paris."),
        Document::from("Bananas are yellow."),
    ];
    let question = "What is the capital of France?";

    // Hash-based 64-dimensional embeddings; the ranking is deterministic but
    // not semantic.
    let embedder = Arc::new(MockEmbeddingProvider::new(64));

    // -- 1. Inspect retrieval on its own -----------------------------------
    let retrieved = Retriever::new(embedder.clone()).retrieve(question, &corpus).await?;
    println!("Query: \"{question}\"");
    for (i, hit) in retrieved.hits().iter().enumerate() {
        println!("  {}. [score={:.4}] {}", i + 1, hit.score, hit.document);
    }

    // -- 2. Full pipeline ---------------------------------------------------
    let pipeline = RagPipeline::builder()
        .embedding_provider(embedder)
        .completion_provider(Arc::new(MockCompletionProvider::with_answer(
            "Paris is the capital of France.",
        )))
        .build()?;

    let answer = pipeline.answer_query(question, &corpus, ChatModel::default().as_str()).await?;
    println!("\nAnswer: {answer}");
    Ok(())
}
