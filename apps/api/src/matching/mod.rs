// Job matching engine.
// Implements: dedup, embedding, in-memory similarity index, retrieval,
// LLM curation and ranking. All model-service calls go through llm_client.

pub mod curator;
pub mod dedup;
pub mod embedder;
pub mod error;
pub mod handlers;
pub mod language;
pub mod pipeline;
pub mod prompts;
pub mod ranker;
pub mod retriever;
pub mod vector_index;

#[cfg(test)]
pub mod testing;
