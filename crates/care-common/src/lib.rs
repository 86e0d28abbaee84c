pub mod embedding;
pub mod error;
pub mod ollama;
pub mod translate;
pub mod vectordb;
