use crate::store::Neo4jStore;
use anyhow::Result;
use tracing::info;

/// Constraints and indexes backing the MERGE and DOI lookups of the mutations.
/// DOIs are indexed rather than unique: the DBLP dump repeats some of them.
pub const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT paper_id_key IF NOT EXISTS FOR (p:Paper) REQUIRE p.paperid IS UNIQUE;",
    "CREATE INDEX paper_doi_index IF NOT EXISTS FOR (p:Paper) ON (p.doi);",
    "CREATE CONSTRAINT author_id_key IF NOT EXISTS FOR (a:Author) REQUIRE a.authorid IS UNIQUE;",
    "CREATE CONSTRAINT board_key IF NOT EXISTS FOR (b:Board) REQUIRE b.boardname IS UNIQUE;",
    "CREATE CONSTRAINT post_key IF NOT EXISTS FOR (p:Post) REQUIRE (p.board, p.postid) IS UNIQUE;",
    "CREATE CONSTRAINT comment_key IF NOT EXISTS FOR (c:Comment) REQUIRE (c.board, c.commentid) IS UNIQUE;",
];

pub async fn ensure_constraints(store: &Neo4jStore) -> Result<()> {
    for cypher in CONSTRAINTS {
        store.run(cypher).await?;
    }
    info!(count = CONSTRAINTS.len(), "Constraints and indexes in place");
    Ok(())
}
