use serde::{Deserialize, Serialize};

/// A function extracted from a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    pub name: String,
    /// Leading doc comment with comment syntax stripped; empty if undocumented
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Rendered return types in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<String>,
    pub file_path: String,
    /// 1-based line of the first token
    pub start_line: u32,
    /// 1-based line of the last token, inclusive
    pub end_line: u32,
}

impl CodeChunk {
    /// Text sent to the embedding provider for this chunk
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.name, self.description)
    }

    /// Rendered signature, e.g. `Add(a int, b int) int`
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    p.type_name.clone()
                } else {
                    format!("{} {}", p.name, p.type_name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        match self.returns.len() {
            0 => format!("{}({})", self.name, params),
            1 => format!("{}({}) {}", self.name, params, self.returns[0]),
            _ => format!("{}({}) ({})", self.name, params, self.returns.join(", ")),
        }
    }
}

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Empty for unnamed parameters
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A stored chunk matched by a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: CodeChunk,
    /// `1 - cosine distance`; larger is more relevant
    pub similarity: f32,
}

/// Outcome of ingesting a directory or repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub files_processed: usize,
    pub chunks_stored: usize,
    /// Files that failed to parse and were skipped
    pub skipped_files: usize,
}

/// A grounded answer and the chunks it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SearchResult>,
}
