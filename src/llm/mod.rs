// src/llm/mod.rs
// Model-provider abstraction, concrete providers, credential store, gateway,
// and the tolerant JSON projection used by interpret/generate (§4.4).

pub mod credential_store;
pub mod deepseek;
pub mod gateway;
pub mod json_loose;
pub mod openai;
pub mod provider;

pub use credential_store::{CredentialStore, ResolvedCredential};
pub use gateway::ModelGateway;
pub use provider::{ChatRequest, ChatResponse, Message, ModelProvider, ResponseFormat, TokenUsage};
