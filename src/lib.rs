pub mod document;
pub mod llm;
pub mod qa;
pub mod session;
pub mod shell;
pub mod summary;
pub mod transcript;
