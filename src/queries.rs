//! Read queries linking forum discussions to the literature they cite.

use crate::store::Neo4jStore;
use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UseCase {
    /// Posts citing the same papers as posts whose title matches
    RelatedPosts,
    /// Papers cited by matching posts, their references, and co-authored work
    PaperNeighbourhood,
    /// Posts citing papers whose title matches
    CitingPosts,
}

const CYPHER_RELATED_POSTS: &str = r#"MATCH (post1:Post)
WHERE post1.title CONTAINS $title
MATCH (post1)-[:CITES]->(paper:Paper)<-[:CITES]-(post2:Post)
WHERE post2 <> post1
RETURN DISTINCT post2.board AS board, post2.postid AS id, post2.title AS title, paper.title AS via
LIMIT $limit"#;

const CYPHER_PAPER_NEIGHBOURHOOD: &str = r#"MATCH (post:Post)
WHERE post.title CONTAINS $title
MATCH (post)-[:CITES]->(paper1:Paper)
OPTIONAL MATCH (paper1)-[:CITES]->(paper2:Paper)
OPTIONAL MATCH (author:Author)-[:AUTHORED]->(paper1)
OPTIONAL MATCH (author)-[:AUTHORED]->(paper3:Paper)
WITH paper1, collect(DISTINCT paper2) + collect(DISTINCT paper3) AS related
UNWIND related AS other
RETURN DISTINCT paper1.title AS cited, other.title AS related, other.doi AS doi
LIMIT $limit"#;

const CYPHER_CITING_POSTS: &str = r#"MATCH (paper:Paper)
WHERE paper.title CONTAINS $title
MATCH (post:Post)-[:CITES]->(paper)
RETURN DISTINCT post.board AS board, post.postid AS id, post.title AS title, paper.title AS paper
LIMIT $limit"#;

impl UseCase {
    pub fn cypher(self) -> &'static str {
        match self {
            UseCase::RelatedPosts => CYPHER_RELATED_POSTS,
            UseCase::PaperNeighbourhood => CYPHER_PAPER_NEIGHBOURHOOD,
            UseCase::CitingPosts => CYPHER_CITING_POSTS,
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            UseCase::RelatedPosts => &["board", "id", "title", "via"],
            UseCase::PaperNeighbourhood => &["cited", "related", "doi"],
            UseCase::CitingPosts => &["board", "id", "title", "paper"],
        }
    }
}

/// Runs a use case with `title` bound as a parameter.
pub async fn run_use_case(
    store: &Neo4jStore,
    use_case: UseCase,
    title: &str,
    limit: i64,
) -> Result<Vec<Vec<String>>> {
    store
        .fetch(
            use_case.cypher(),
            &[("title", Value::from(title)), ("limit", Value::from(limit))],
            use_case.columns(),
        )
        .await
}
