//! Bulk mutations for the citation and forum graphs.
//!
//! Every template reads its batch from `$rows`. Forum templates take the board
//! name as `$board`, so one template serves every board.

use crate::store::Mutation;

const CYPHER_PAPERS: &str = r#"UNWIND $rows AS paper
MERGE (p:Paper {paperid: paper.id})
ON CREATE SET
    p.doi = paper.doi,
    p.title = paper.title,
    p.year = paper.year,
    p.n_citation = paper.n_citation
FOREACH (author IN coalesce(paper.authors, []) |
    MERGE (a:Author {authorid: author.id})
    ON CREATE SET a.name = author.name
    MERGE (a)-[:AUTHORED]->(p))
RETURN count(p) AS total"#;

const CYPHER_CITATIONS: &str = r#"UNWIND $rows AS paper
MATCH (p:Paper {paperid: paper.id})
UNWIND coalesce(paper.references, []) AS refid
MATCH (r:Paper {paperid: refid})
MERGE (p)-[cit:CITES]->(r)
RETURN count(cit) AS total"#;

const CYPHER_BOARDS: &str = r#"UNWIND $rows AS board
MERGE (b:Board {boardname: board.name})
RETURN count(b) AS total"#;

const CYPHER_POSTS: &str = r#"UNWIND $rows AS post
MERGE (p:Post {postid: post.Id, board: $board})
ON CREATE SET
    p.title = post.Title,
    p.text = post.Body,
    p.tags = post.Tags,
    p.score = post.Score
WITH post, p
MATCH (b:Board {boardname: $board})
MERGE (p)-[:FROM_BOARD]->(b)
WITH post, p
OPTIONAL MATCH (r:Paper) WHERE r.doi IN coalesce(post.DOIs, [])
FOREACH (_ IN CASE WHEN r IS NULL THEN [] ELSE [1] END |
    MERGE (p)-[:CITES]->(r))
RETURN count(DISTINCT p) AS total"#;

const CYPHER_COMMENTS: &str = r#"UNWIND $rows AS comment
MERGE (c:Comment {commentid: comment.Id, board: $board})
ON CREATE SET c.text = comment.Text
WITH comment, c
OPTIONAL MATCH (p:Post {postid: comment.PostId, board: $board})
FOREACH (_ IN CASE WHEN p IS NULL THEN [] ELSE [1] END |
    MERGE (c)-[:RESPONDS_TO]->(p))
WITH comment, c
OPTIONAL MATCH (r:Paper) WHERE r.doi IN coalesce(comment.DOIs, [])
FOREACH (_ IN CASE WHEN r IS NULL THEN [] ELSE [1] END |
    MERGE (c)-[:CITES]->(r))
RETURN count(DISTINCT c) AS total"#;

const CYPHER_POST_LINKS: &str = r#"UNWIND $rows AS link
MATCH (p:Post {postid: link.PostId, board: $board})
MATCH (p2:Post {postid: link.RelatedPostId, board: $board})
MERGE (p)-[ref:REFERS_TO]->(p2)
RETURN count(ref) AS total"#;

/// Paper nodes with their authors. Must run before [`citations`].
pub fn papers() -> Mutation {
    Mutation::new("papers", CYPHER_PAPERS)
}

/// CITES edges between papers already loaded by [`papers`].
pub fn citations() -> Mutation {
    Mutation::new("citations", CYPHER_CITATIONS)
}

/// Board nodes; each row carries a `name`.
pub fn boards() -> Mutation {
    Mutation::new("boards", CYPHER_BOARDS)
}

pub fn posts(board: &str) -> Mutation {
    Mutation::new(format!("{board}/posts"), CYPHER_POSTS).param("board", board)
}

pub fn comments(board: &str) -> Mutation {
    Mutation::new(format!("{board}/comments"), CYPHER_COMMENTS).param("board", board)
}

pub fn post_links(board: &str) -> Mutation {
    Mutation::new(format!("{board}/post_links"), CYPHER_POST_LINKS).param("board", board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_template_reads_rows_and_reports_total() {
        for m in [
            papers(),
            citations(),
            boards(),
            posts("ai"),
            comments("ai"),
            post_links("ai"),
        ] {
            assert!(m.cypher.starts_with("UNWIND $rows AS"), "{}", m.name);
            assert!(m.cypher.contains("AS total"), "{}", m.name);
        }
    }

    #[test]
    fn board_is_bound_not_spliced() {
        let m = posts("cstheory");
        assert!(!m.cypher.contains("cstheory"));
        assert!(m.cypher.contains("$board"));
        assert_eq!(m.params, vec![("board".to_string(), json!("cstheory"))]);
        assert_eq!(m.name, "cstheory/posts");
    }

    #[test]
    fn board_templates_shared_across_boards() {
        assert_eq!(comments("ai").cypher, comments("stats").cypher);
        assert_ne!(comments("ai").params, comments("stats").params);
    }

    #[test]
    fn forum_rows_cite_papers_by_doi() {
        assert!(CYPHER_POSTS.contains("r.doi IN coalesce(post.DOIs, [])"));
        assert!(CYPHER_COMMENTS.contains("r.doi IN coalesce(comment.DOIs, [])"));
        assert!(CYPHER_COMMENTS.contains("RESPONDS_TO"));
    }

    #[test]
    fn paper_passes_merge() {
        assert!(CYPHER_PAPERS.contains("MERGE (p:Paper {paperid: paper.id})"));
        assert!(CYPHER_CITATIONS.contains("MERGE (p)-[cit:CITES]->(r)"));
        assert!(!CYPHER_PAPERS.contains("CREATE (p"));
    }
}
