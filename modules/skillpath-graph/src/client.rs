use neo4rs::{query, ConfigBuilder, Graph};
use tracing::info;

/// Shared Neo4j handle. Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect and verify the server answers before returning.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(16)
            .build()?;
        let client = Self {
            graph: Graph::connect(config).await?,
        };
        client.ping().await?;
        info!(uri, "Connected to Neo4j");
        Ok(client)
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), neo4rs::Error> {
        let mut rows = self.graph.execute(query("RETURN 1 AS ok")).await?;
        while rows.next().await?.is_some() {}
        Ok(())
    }
}
