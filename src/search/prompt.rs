use std::fmt::Write;

use crate::types::SearchResult;

const CLOSING: &str = "\nBased on the code context above, with consideration for the relevance scores, please provide a clear and concise answer to the question.";

/// Render the generation prompt for `question` grounded in `results`.
///
/// Results are listed in the order given, which callers keep sorted by
/// descending similarity.
pub fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    let mut prompt = format!("Question: {question}\n\nRelevant code context (sorted by similarity):\n");

    for result in results {
        let chunk = &result.chunk;
        // Writing to a String cannot fail
        let _ = write!(
            prompt,
            "\nFile: {} (Lines {}-{})\nFunction: {}\nSignature: func {}\nDescription: {}\nRelevance Score: {:.2}\n",
            chunk.file_path,
            chunk.start_line,
            chunk.end_line,
            chunk.name,
            chunk.signature(),
            chunk.description,
            result.similarity
        );
    }

    prompt.push_str(CLOSING);
    prompt
}
