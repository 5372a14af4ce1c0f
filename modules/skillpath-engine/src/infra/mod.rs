pub mod graph;
pub mod search;
pub mod vectors;

pub use graph::Neo4jContentGraph;
pub use search::{NoopSearcher, TavilySearcher};
pub use vectors::PgVectors;
