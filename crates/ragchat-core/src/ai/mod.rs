pub mod rag;

pub use rag::RagClient;
