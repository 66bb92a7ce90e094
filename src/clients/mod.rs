pub mod llm_client;
pub mod web_search;

pub use llm_client::{
    ChatRequest, ChatRole, ChatTurn, ModelReply, ModelTransport, OpenAiTransport, TransportError,
};
pub use web_search::{DuckDuckGoSearch, SearchError, SearchHit, WebSearch};
