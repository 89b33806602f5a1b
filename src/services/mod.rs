// src/services/mod.rs

pub mod document_cache;
pub mod evaluator;
pub mod extract;
pub mod llm;
pub mod mcq;
pub mod rag;
pub mod summarizer;
