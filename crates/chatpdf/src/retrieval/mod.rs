//! Vector index and conversational retrieval

mod chain;
mod index;

pub use chain::{ChainOutput, ConversationalRetrievalChain, Retriever};
pub use index::{SearchResult, VectorIndex};
