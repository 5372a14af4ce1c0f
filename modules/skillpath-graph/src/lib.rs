pub mod client;
pub mod migrate;
pub mod reader;
pub mod vector_store;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use migrate::migrate;
pub use reader::GraphReader;
pub use vector_store::PgVectorStore;
pub use writer::GraphWriter;
