use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::SectionId;
use crate::model::content::MediaSource;

//
// ─── CONTENT TYPES ─────────────────────────────────────────────────────────────
//

/// One block of a section body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: MediaSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Code {
        language: String,
        code: String,
    },
    Formula {
        latex: String,
    },
    Video {
        source: MediaSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Diagram {
        source: MediaSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

/// Ordered body of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContent {
    pub section_id: SectionId,
    pub blocks: Vec<ContentBlock>,
}

//
// ─── CONTENT VALIDATION ERRORS ─────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentValidationError {
    #[error("Block {index} has empty text.")]
    EmptyText { index: usize },

    #[error("Table in block {index} has no columns.")]
    EmptyTable { index: usize },

    #[error("Table in block {index}: row {row} has {found} cells, expected {expected}.")]
    RaggedTable {
        index: usize,
        row: usize,
        expected: usize,
        found: usize,
    },
}

//
// ─── BLOCK IMPL ────────────────────────────────────────────────────────────────
//

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Short label of the block kind, as used by storage and the CLI.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Code { .. } => "code",
            ContentBlock::Formula { .. } => "formula",
            ContentBlock::Video { .. } => "video",
            ContentBlock::Table { .. } => "table",
            ContentBlock::Diagram { .. } => "diagram",
        }
    }

    fn validate(&self, index: usize) -> Result<(), ContentValidationError> {
        match self {
            ContentBlock::Text { text: body }
            | ContentBlock::Code { code: body, .. }
            | ContentBlock::Formula { latex: body } => {
                if body.trim().is_empty() {
                    return Err(ContentValidationError::EmptyText { index });
                }
            }
            ContentBlock::Table { headers, rows } => {
                if headers.is_empty() {
                    return Err(ContentValidationError::EmptyTable { index });
                }
                if let Some((row, cells)) = rows
                    .iter()
                    .enumerate()
                    .find(|(_, cells)| cells.len() != headers.len())
                {
                    return Err(ContentValidationError::RaggedTable {
                        index,
                        row,
                        expected: headers.len(),
                        found: cells.len(),
                    });
                }
            }
            ContentBlock::Image { .. } | ContentBlock::Video { .. } | ContentBlock::Diagram { .. } => {}
        }
        Ok(())
    }
}

impl SectionContent {
    /// Build a validated section body.
    ///
    /// # Errors
    ///
    /// Returns `ContentValidationError` for blank text blocks or malformed tables.
    pub fn new(section_id: SectionId, blocks: Vec<ContentBlock>) -> Result<Self, ContentValidationError> {
        for (index, block) in blocks.iter().enumerate() {
            block.validate(index)?;
        }
        Ok(Self { section_id, blocks })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of words across text-bearing blocks; drives the reading-time estimate.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.split_whitespace().count(),
                ContentBlock::Image { caption, .. } | ContentBlock::Diagram { caption, .. } => {
                    caption.as_deref().map_or(0, |c| c.split_whitespace().count())
                }
                _ => 0,
            })
            .sum()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SectionId {
        SectionId::new("s1").unwrap()
    }

    #[test]
    fn empty_text_fails() {
        let err = SectionContent::new(sid(), vec![ContentBlock::text("   ")]).unwrap_err();
        assert_eq!(err, ContentValidationError::EmptyText { index: 0 });
    }

    #[test]
    fn ragged_table_fails() {
        let table = ContentBlock::Table {
            headers: vec!["Protocol".into(), "States".into()],
            rows: vec![vec!["MESI".into(), "4".into()], vec!["MOESI".into()]],
        };
        let err = SectionContent::new(sid(), vec![ContentBlock::text("intro"), table]).unwrap_err();
        assert_eq!(
            err,
            ContentValidationError::RaggedTable {
                index: 1,
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn blocks_serialize_with_type_tag() {
        let block = ContentBlock::Formula {
            latex: "S = 1 / ((1 - p) + p / n)".into(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"type\":\"formula\""));

        let parsed: ContentBlock = serde_json::from_str(
            r#"{"type":"image","source":"figures/flynn.png","caption":"Flynn"}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind(), "image");
    }

    #[test]
    fn word_count_includes_captions() {
        let content = SectionContent::new(
            sid(),
            vec![
                ContentBlock::text("Amdahl's law bounds speedup"),
                ContentBlock::Image {
                    source: MediaSource::parse("fig.png").unwrap(),
                    caption: Some("Speedup curve".into()),
                },
                ContentBlock::Code {
                    language: "c".into(),
                    code: "int x;".into(),
                },
            ],
        )
        .unwrap();
        assert_eq!(content.word_count(), 6);
    }
}
