use crate::jsonl::JsonLinesSource;
use crate::loader::{BulkLoader, LoadOptions};
use crate::models::{LoadSummary, Record};
use crate::mutations;
use crate::parser::RowReader;
use crate::source::MemorySource;
use crate::store::{GraphStore, Mutation};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// A StackExchange table export loaded per board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Posts,
    Comments,
    PostLinks,
}

impl Table {
    /// Load order: posts before the comments and links that point at them.
    pub const ALL: [Table; 3] = [Table::Posts, Table::Comments, Table::PostLinks];

    /// File stem of the export, e.g. `Posts` for `Posts.xml`.
    pub fn file_stem(self) -> &'static str {
        match self {
            Table::Posts => "Posts",
            Table::Comments => "Comments",
            Table::PostLinks => "PostLinks",
        }
    }

    pub fn mutation(self, board: &str) -> Mutation {
        match self {
            Table::Posts => mutations::posts(board),
            Table::Comments => mutations::comments(board),
            Table::PostLinks => mutations::post_links(board),
        }
    }
}

pub struct BoardLoad {
    pub data_dir: PathBuf,
    pub boards: Vec<String>,
    /// Rows read per table, for sampling.
    pub limit: Option<u64>,
}

/// Loads papers and authors, then reads the file again for citations, which
/// can only be wired once every paper exists.
pub async fn load_papers<S: GraphStore>(
    loader: &mut BulkLoader<'_, S>,
    path: &Path,
    options: &LoadOptions,
) -> Result<Vec<LoadSummary>> {
    info!(path = %path.display(), "Adding papers");
    let source = JsonLinesSource::open(path)?;
    let papers = loader
        .load(&mutations::papers(), source, options)
        .await
        .context("Failed to load papers")?;
    if papers.cancelled {
        return Ok(vec![papers]);
    }

    info!("Adding paper citations");
    let source = JsonLinesSource::open(path)?;
    let citations = loader
        .load(&mutations::citations(), source, options)
        .await
        .context("Failed to load citations")?;

    Ok(vec![papers, citations])
}

/// Creates the board nodes, then loads posts, comments and post links board
/// by board.
pub async fn load_boards<S: GraphStore>(
    loader: &mut BulkLoader<'_, S>,
    request: &BoardLoad,
    options: &LoadOptions,
) -> Result<Vec<LoadSummary>> {
    let board_rows: Vec<Record> = request
        .boards
        .iter()
        .map(|name| {
            let mut row = Record::new();
            row.insert("name".to_string(), Value::from(name.as_str()));
            row
        })
        .collect();

    let mut summaries = Vec::new();
    let boards = loader
        .load(
            &mutations::boards(),
            MemorySource::new("boards", board_rows),
            options,
        )
        .await
        .context("Failed to create boards")?;
    let mut cancelled = boards.cancelled;
    summaries.push(boards);

    'boards: for board in &request.boards {
        info!(board = %board, "Loading board");
        for table in Table::ALL {
            if cancelled {
                break 'boards;
            }
            let stem = table.file_stem();
            let source = RowReader::for_table(&request.data_dir, board, stem, request.limit)?;
            let summary = loader
                .load(&table.mutation(board), source, options)
                .await
                .with_context(|| format!("Failed to load {board}/{stem}"))?;
            cancelled = summary.cancelled;
            summaries.push(summary);
        }
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_map_to_board_mutations() {
        assert_eq!(Table::Posts.mutation("ai").name, "ai/posts");
        assert_eq!(Table::Comments.mutation("ai").name, "ai/comments");
        assert_eq!(Table::PostLinks.mutation("ai").name, "ai/post_links");
    }

    #[test]
    fn tables_map_to_export_files() {
        let stems: Vec<&str> = Table::ALL.iter().map(|t| t.file_stem()).collect();
        assert_eq!(stems, vec!["Posts", "Comments", "PostLinks"]);
    }

    #[test]
    fn posts_load_first() {
        assert_eq!(Table::ALL[0], Table::Posts);
    }
}
