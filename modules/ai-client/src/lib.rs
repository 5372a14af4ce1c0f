//! Thin client for OpenAI-compatible endpoints.
//!
//! Any backend that speaks the `/chat/completions` and `/embeddings` wire
//! format (OpenAI, vLLM, Ollama, LiteLLM proxies) can sit behind [`OpenAi`]
//! by pointing `with_base_url` at it.

pub mod message;
pub mod openai;
pub mod util;

pub use openai::{CompletionOptions, OpenAi};
pub use message::{Message, Role};
pub use util::{extract_json_object, strip_code_blocks, truncate_to_char_boundary};
