use crate::config;
use crate::error::StoreError;
use crate::models::Record;
use anyhow::{bail, Context, Result};
use neo4rs::{query, BoltMap, BoltNull, BoltType, Graph};
use serde_json::Value;
use tracing::info;

/// A parameterized bulk mutation. The batch is bound as `$rows`; everything
/// else (e.g. the board name) is bound from `params`.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub name: String,
    pub cypher: &'static str,
    pub params: Vec<(String, Value)>,
}

impl Mutation {
    pub fn new(name: impl Into<String>, cypher: &'static str) -> Self {
        Self {
            name: name.into(),
            cypher,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }
}

/// The graph database as seen by the loader.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    /// Runs `mutation` with `rows` bound as `$rows` and returns the count the
    /// store reports for it, if any.
    async fn submit(&self, mutation: &Mutation, rows: &[Record]) -> Result<Option<u64>, StoreError>;
}

pub struct ConnectionConfig {
    pub bolt_uri: String,
    pub user: String,
    pub password: String,
}

/// Neo4j over Bolt. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let graph = connect_with_retry(config).await?;
        Ok(Self { graph })
    }

    /// Runs a statement whose result is not needed (schema changes).
    pub async fn run(&self, cypher: &str) -> Result<()> {
        self.graph
            .run(query(cypher))
            .await
            .with_context(|| format!("Failed to execute: {cypher}"))?;
        Ok(())
    }

    /// Runs a read query with bound parameters, returning the requested
    /// columns of each row as strings.
    pub async fn fetch(
        &self,
        cypher: &str,
        params: &[(&str, Value)],
        columns: &[&str],
    ) -> Result<Vec<Vec<String>>> {
        let mut q = query(cypher);
        for (key, value) in params {
            q = q.param(key, value_to_bolt(value));
        }
        let mut stream = self
            .graph
            .execute(q)
            .await
            .with_context(|| format!("Failed to execute query: {cypher}"))?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let values = columns
                .iter()
                .map(|col| row.get::<Option<String>>(col).ok().flatten().unwrap_or_default())
                .collect();
            rows.push(values);
        }
        Ok(rows)
    }
}

impl GraphStore for Neo4jStore {
    async fn submit(&self, mutation: &Mutation, rows: &[Record]) -> Result<Option<u64>, StoreError> {
        let batch: Vec<BoltType> = rows.iter().map(record_to_bolt).collect();
        let mut q = query(mutation.cypher).param("rows", batch);
        for (key, value) in &mutation.params {
            q = q.param(key, value_to_bolt(value));
        }

        let mut result = self.graph.execute(q).await?;
        let affected = match result.next().await? {
            Some(row) => row.get::<i64>("total").ok().map(|n| n.max(0) as u64),
            None => None,
        };
        Ok(affected)
    }
}

async fn connect_with_retry(config: &ConnectionConfig) -> Result<Graph> {
    let max_retries = config::CONNECT_MAX_RETRIES;
    let delay = tokio::time::Duration::from_secs(config::CONNECT_RETRY_DELAY_SECS);

    for attempt in 1..=max_retries {
        match Graph::new(&config.bolt_uri, &config.user, &config.password) {
            Ok(graph) => match graph.run(query("RETURN 1;")).await {
                Ok(_) => return Ok(graph),
                Err(e) if attempt < max_retries => {
                    info!(attempt, "Connection test failed, retrying: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(e).context(format!(
                        "Cannot connect to Neo4j at {} after {max_retries} attempts",
                        config.bolt_uri
                    ));
                }
            },
            Err(e) if attempt < max_retries => {
                info!(attempt, "Cannot connect to Neo4j at {}, retrying: {e}", config.bolt_uri);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Cannot connect to Neo4j at {} after {max_retries} attempts",
                    config.bolt_uri
                ));
            }
        }
    }

    bail!(
        "Cannot connect to Neo4j at {} after {max_retries} attempts",
        config.bolt_uri
    );
}

pub fn record_to_bolt(record: &Record) -> BoltType {
    let mut map = BoltMap::new();
    for (key, value) in record {
        map.put(key.as_str().into(), value_to_bolt(value));
    }
    BoltType::Map(map)
}

pub fn value_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or(f64::NAN).into(),
        },
        Value::String(s) => s.as_str().into(),
        Value::Array(items) => items.iter().map(value_to_bolt).collect::<Vec<_>>().into(),
        Value::Object(map) => record_to_bolt(map),
    }
}
