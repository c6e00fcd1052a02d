use std::path::Path;
use tree_sitter::{Language, Node};

use crate::error::ParseError;
use crate::types::{CodeChunk, Parameter};

/// Language tag attached to chunks produced by [`GoExtractor`]
pub const GO_LANGUAGE: &str = "go";

/// A grammar-specific chunk extractor.
///
/// Implementations are pure with respect to file content: extracting the
/// same source twice yields identical chunks.
pub trait SourceExtractor {
    /// Language tag written into every chunk
    fn language(&self) -> &'static str;

    /// Whether the walker should hand this file to the extractor
    fn accepts(&self, path: &Path) -> bool;

    /// Extract one chunk per function declared in `source`
    fn extract_source(&mut self, file_path: &str, source: &str)
        -> Result<Vec<CodeChunk>, ParseError>;

    /// Read `path` and extract its chunks, tagging them with the path as given
    fn extract(&mut self, path: &Path) -> Result<Vec<CodeChunk>, ParseError> {
        let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract_source(&path.to_string_lossy(), &source)
    }
}

/// Extracts function and method declarations from Go source using tree-sitter
pub struct GoExtractor {
    parser: tree_sitter::Parser,
}

impl GoExtractor {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            parser: create_parser(tree_sitter_go::LANGUAGE.into())?,
        })
    }
}

impl SourceExtractor for GoExtractor {
    fn language(&self) -> &'static str {
        GO_LANGUAGE
    }

    fn accepts(&self, path: &Path) -> bool {
        let is_go = path.extension().is_some_and(|ext| ext == "go");
        let is_test = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with("_test.go"));
        is_go && !is_test
    }

    fn extract_source(
        &mut self,
        file_path: &str,
        source: &str,
    ) -> Result<Vec<CodeChunk>, ParseError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParseError::NoTree(file_path.to_string()))?;
        let root = tree.root_node();

        if root.has_error() {
            let (line, column) = first_error(&root)
                .map(|n| (n.start_position().row + 1, n.start_position().column + 1))
                .unwrap_or((1, 1));
            return Err(ParseError::Syntax {
                path: file_path.to_string(),
                line,
                column,
            });
        }

        let mut chunks = Vec::new();
        collect_functions(&root, source, file_path, &mut chunks);
        Ok(chunks)
    }
}

fn create_parser(language: Language) -> Result<tree_sitter::Parser, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&language)?;
    Ok(parser)
}

/// Depth-first search for the first error or missing node
fn first_error<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'a>> = node.children(&mut cursor).collect();
    children
        .iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

/// Visit the tree in source order, emitting a chunk per declaration
fn collect_functions(node: &Node, source: &str, file_path: &str, chunks: &mut Vec<CodeChunk>) {
    if matches!(node.kind(), "function_declaration" | "method_declaration") {
        if let Some(chunk) = function_chunk(node, source, file_path) {
            chunks.push(chunk);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_functions(&child, source, file_path, chunks);
    }
}

fn function_chunk(node: &Node, source: &str, file_path: &str) -> Option<CodeChunk> {
    let name = node_text(&node.child_by_field_name("name")?, source).to_string();
    if name.is_empty() {
        return None;
    }

    let parameters = node
        .child_by_field_name("parameters")
        .map(|list| collect_parameters(&list, source))
        .unwrap_or_default();

    let returns = match node.child_by_field_name("result") {
        Some(result) if result.kind() == "parameter_list" => collect_parameters(&result, source)
            .into_iter()
            .map(|p| p.type_name)
            .collect(),
        Some(result) => vec![render_type(&result, source)],
        None => Vec::new(),
    };

    let start = node.start_position();
    let end = node.end_position();
    let end_row = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };

    Some(CodeChunk {
        name,
        description: doc_comment(node, source),
        language: GO_LANGUAGE.to_string(),
        parameters,
        returns,
        file_path: file_path.to_string(),
        start_line: start.row as u32 + 1,
        end_line: end_row as u32 + 1,
    })
}

/// Expand a `parameter_list` into one entry per declared name.
///
/// Unnamed parameters produce a single entry with an empty name.
fn collect_parameters(list: &Node, source: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = list.walk();

    for decl in list.named_children(&mut cursor) {
        let variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let Some(type_node) = decl.child_by_field_name("type") else {
            continue;
        };
        let mut type_name = render_type(&type_node, source);
        if variadic {
            type_name = format!("...{type_name}");
        }

        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| node_text(&n, source).to_string())
            .collect();

        if names.is_empty() {
            params.push(Parameter {
                name: String::new(),
                type_name,
            });
        } else {
            params.extend(names.into_iter().map(|name| Parameter {
                name,
                type_name: type_name.clone(),
            }));
        }
    }

    params
}

/// Render a type node to its canonical text form
fn render_type(node: &Node, source: &str) -> String {
    let field = |name: &str| {
        node.child_by_field_name(name)
            .map(|n| render_type(&n, source))
            .unwrap_or_default()
    };

    match node.kind() {
        "type_identifier" | "identifier" | "field_identifier" | "package_identifier" => {
            node_text(node, source).to_string()
        }
        "pointer_type" => format!("*{}", render_first_named(node, source)),
        "slice_type" => format!("[]{}", field("element")),
        "array_type" => {
            let length = node
                .child_by_field_name("length")
                .map(|n| collapse_whitespace(node_text(&n, source)))
                .unwrap_or_default();
            format!("[{length}]{}", field("element"))
        }
        "implicit_length_array_type" => format!("[...]{}", field("element")),
        "map_type" => format!("map[{}]{}", field("key"), field("value")),
        "channel_type" => {
            let mut cursor = node.walk();
            let tokens: Vec<&str> = node
                .children(&mut cursor)
                .filter(|c| !c.is_named())
                .map(|c| c.kind())
                .collect();
            let prefix = match tokens.as_slice() {
                ["<-", ..] => "<-chan",
                [_, "<-", ..] => "chan<-",
                _ => "chan",
            };
            format!("{prefix} {}", field("value"))
        }
        "qualified_type" => format!(
            "{}.{}",
            node.child_by_field_name("package")
                .map(|n| node_text(&n, source))
                .unwrap_or_default(),
            node.child_by_field_name("name")
                .map(|n| node_text(&n, source))
                .unwrap_or_default()
        ),
        "generic_type" => {
            let arguments = node
                .child_by_field_name("type_arguments")
                .map(|args| {
                    let mut cursor = args.walk();
                    args.named_children(&mut cursor)
                        .map(|arg| render_type(&arg, source))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{}[{arguments}]", field("type"))
        }
        "type_elem" => {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .map(|n| render_type(&n, source))
                .collect::<Vec<_>>()
                .join(" | ")
        }
        "parenthesized_type" => render_first_named(node, source),
        _ => collapse_whitespace(node_text(node, source)),
    }
}

fn render_first_named(node: &Node, source: &str) -> String {
    let mut cursor = node.walk();
    let inner = node.named_children(&mut cursor).next();
    inner
        .map(|n| render_type(&n, source))
        .unwrap_or_default()
}

/// Text of the comment group directly above a declaration.
///
/// The group is the run of comments ending on the line before the
/// declaration with no blank line between them. A comment trailing code on
/// its own line belongs to that code and ends the group.
fn doc_comment(decl: &Node, source: &str) -> String {
    let mut group = Vec::new();
    let mut next_start_row = decl.start_position().row;
    let mut current = decl.prev_sibling();

    while let Some(node) = current {
        if node.kind() != "comment" || node.end_position().row + 1 < next_start_row {
            break;
        }
        let trails_code = node.prev_sibling().is_some_and(|prev| {
            prev.kind() != "comment" && prev.end_position().row == node.start_position().row
        });
        if trails_code {
            break;
        }
        group.push(node_text(&node, source));
        next_start_row = node.start_position().row;
        current = node.prev_sibling();
    }

    group.reverse();
    comment_text(&group)
}

/// Strip comment markers and normalise blank lines the way `go doc` does.
pub(crate) fn comment_text(comments: &[&str]) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for raw in comments {
        let body = if let Some(line) = raw.strip_prefix("//") {
            if line.is_empty() {
                line
            } else if let Some(stripped) = line.strip_prefix(' ') {
                stripped
            } else if is_directive(line) {
                continue;
            } else {
                line
            }
        } else {
            raw.strip_prefix("/*")
                .and_then(|c| c.strip_suffix("*/"))
                .unwrap_or(raw)
        };
        lines.extend(body.split('\n'));
    }

    let mut out: Vec<&str> = Vec::new();
    for line in lines.into_iter().map(|l| l.trim_end()) {
        let blank = line.is_empty();
        if blank && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n").trim().to_string()
}

/// `//go:generate`, `//line`, `//export` and friends are not documentation
fn is_directive(comment: &str) -> bool {
    if ["line ", "extern ", "export "]
        .iter()
        .any(|p| comment.starts_with(p))
    {
        return true;
    }
    let Some(colon) = comment.find(':') else {
        return false;
    };
    let bytes = comment.as_bytes();
    if colon == 0 || colon + 1 >= bytes.len() {
        return false;
    }
    bytes[..=colon + 1]
        .iter()
        .enumerate()
        .all(|(i, b)| i == colon || b.is_ascii_lowercase() || b.is_ascii_digit())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn node_text<'s>(node: &Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}
