pub mod catalog_client;
pub mod chat_model;
pub mod embedding_provider;
pub mod reranker;
