//! Text normalization and language-model summarization

pub mod client;
pub mod normalizer;

pub use client::SummarizationClient;
pub use normalizer::TextNormalizer;
