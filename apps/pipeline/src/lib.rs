//! fusen — generates "reasons for job change" text items via the
//! chat-completion API, parses the response into a flat table, and posts
//! the items as sticky notes onto a Miro board, with run metadata sent to
//! an MLflow-compatible tracker.

pub mod aggregate;
pub mod config;
pub mod deliver;
pub mod errors;
pub mod llm_client;
pub mod miro;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod serve;
pub mod tracking;
