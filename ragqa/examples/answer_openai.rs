//! # Answer OpenAI Example
//!
//! Answers a question over the `.md`/`.txt` files in a directory using the
//! OpenAI embeddings and chat completions APIs.
//!
//! Requires `OPENAI_API_KEY`; `RAGQA_MODEL` optionally selects one of
//! `gpt-4o-mini`, `gpt-4o`, `gpt-4-turbo`.
//!
//! Run: `cargo run -p ragqa --example answer_openai --features openai -- <dir> "<question>"`

use std::sync::Arc;

use anyhow::Context;
use ragqa::openai::{OpenAICompletionProvider, OpenAIEmbeddingProvider};
use ragqa::{DirectoryCorpus, RagConfig, RagPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragqa_telemetry::init_telemetry("answer_openai")?;

    let mut args = std::env::args().skip(1);
    let dir = args.next().context("usage: answer_openai <dir> <question>")?;
    let question = args.next().context("usage: answer_openai <dir> <question>")?;

    let config = RagConfig::from_env()?;
    let pipeline = RagPipeline::builder()
        .config(&config)
        .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(&config)?))
        .completion_provider(Arc::new(OpenAICompletionProvider::from_config(&config)?))
        .build()?;

    let corpus = DirectoryCorpus::new(dir);
    let answer = pipeline
        .answer_from_corpus(&question, &corpus, config.selected_model.as_str())
        .await?;

    println!("{answer}");
    Ok(())
}
