//! Stable, indented re-serialization of XML documents.
//!
//! Output rules:
//! - UTF-8 declaration, then the DOCTYPE (verbatim) if the source had one
//! - Element-only content is indented by two spaces per level and whitespace-only
//!   text between elements is dropped
//! - Any element holding non-whitespace text, or under `xml:space="preserve"`,
//!   keeps its content byte-for-byte apart from escaping
//! - Namespace declarations come before attributes, default namespace first,
//!   then sorted by prefix; attributes keep document order
//!
//! Serializing already-canonical output yields the same bytes.

mod escape;

use crate::core::error::TransformError;
use roxmltree::{Document, Node, NodeType, ParsingOptions};
use std::fs;
use std::path::Path;
use uuid::Uuid;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const INDENT: &str = "  ";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse `text` and return its canonical serialization.
pub fn canonicalize_str(text: &str) -> Result<String, roxmltree::Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)?;

    let mut out = String::with_capacity(text.len() + text.len() / 4);
    out.push_str(XML_DECLARATION);

    let root_start = doc.root_element().range().start;
    if let Some(doctype) = extract_doctype(&text[..root_start]) {
        out.push_str(doctype);
        out.push('\n');
    }

    for child in doc.root().children() {
        match child.node_type() {
            NodeType::Element | NodeType::Comment | NodeType::PI => {
                write_node(&mut out, child, 0, false);
                out.push('\n');
            }
            NodeType::Text | NodeType::Root => {}
        }
    }
    Ok(out)
}

/// Canonicalize the document at `path` in place.
///
/// The new content is written to a sibling file and renamed over `path`, so
/// readers never observe a half-written document.
pub fn canonicalize_file(path: &Path) -> Result<(), TransformError> {
    let bytes = fs::read(path)
        .map_err(|err| TransformError::io(format!("failed to read {}", path.display()), err))?;
    let text = std::str::from_utf8(&bytes).map_err(|err| TransformError::MalformedDocument {
        path: path.to_path_buf(),
        reason: format!("invalid UTF-8: {}", err),
    })?;
    let canonical = canonicalize_str(text).map_err(|err| TransformError::MalformedDocument {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    atomic_write(path, canonical.as_bytes())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), TransformError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
    fs::write(&tmp, data)
        .map_err(|err| TransformError::io(format!("failed to write {}", tmp.display()), err))?;
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        TransformError::io(
            format!("failed to rename {} -> {}", tmp.display(), path.display()),
            err,
        )
    })
}

fn write_node(out: &mut String, node: Node<'_, '_>, depth: usize, inline: bool) {
    match node.node_type() {
        NodeType::Element => write_element(out, node, depth, inline),
        NodeType::Text => out.push_str(&escape::escape_text(node.text().unwrap_or(""))),
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(node.text().unwrap_or(""));
            out.push_str("-->");
        }
        NodeType::PI => {
            if let Some(pi) = node.pi() {
                out.push_str("<?");
                out.push_str(pi.target);
                if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                    out.push(' ');
                    out.push_str(value);
                }
                out.push_str("?>");
            }
        }
        NodeType::Root => {}
    }
}

fn write_element(out: &mut String, node: Node<'_, '_>, depth: usize, inline: bool) {
    let name = qualified_element_name(node);
    out.push('<');
    out.push_str(&name);
    write_namespace_declarations(out, node);
    for attr in node.attributes() {
        out.push(' ');
        out.push_str(&qualified_attribute_name(node, attr.namespace(), attr.name()));
        out.push_str("=\"");
        out.push_str(&escape::escape_attr(attr.value()));
        out.push('"');
    }

    let keep_verbatim = inline || preserves_space(node) || has_significant_text(node);
    let children: Vec<Node<'_, '_>> = if keep_verbatim {
        node.children().collect()
    } else {
        node.children().filter(|child| !child.is_text()).collect()
    };

    if children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if keep_verbatim {
        for child in children {
            write_node(out, child, depth + 1, true);
        }
    } else {
        for child in children {
            out.push('\n');
            push_indent(out, depth + 1);
            write_node(out, child, depth + 1, false);
        }
        out.push('\n');
        push_indent(out, depth);
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn has_significant_text(node: Node<'_, '_>) -> bool {
    node.children().any(|child| {
        child.is_text() && !child.text().unwrap_or("").trim().is_empty()
    })
}

/// Nearest `xml:space` wins; the default is to normalize.
fn preserves_space(node: Node<'_, '_>) -> bool {
    node.ancestors()
        .filter(|n| n.is_element())
        .find_map(|n| n.attribute((XML_NAMESPACE, "space")))
        .map(|value| value == "preserve")
        .unwrap_or(false)
}

fn qualified_element_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        None => tag.name().to_string(),
        Some(uri) => {
            let is_default = node
                .namespaces()
                .any(|ns| ns.name().is_none() && ns.uri() == uri);
            if is_default {
                tag.name().to_string()
            } else {
                match prefix_for(node, uri) {
                    Some(prefix) => format!("{}:{}", prefix, tag.name()),
                    None => tag.name().to_string(),
                }
            }
        }
    }
}

fn qualified_attribute_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        None => local.to_string(),
        Some(XML_NAMESPACE) => format!("xml:{}", local),
        Some(uri) => match prefix_for(node, uri) {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        },
    }
}

fn prefix_for<'a>(node: Node<'a, '_>, uri: &str) -> Option<&'a str> {
    node.namespaces()
        .filter(|ns| ns.uri() == uri)
        .find_map(|ns| ns.name())
}

fn write_namespace_declarations(out: &mut String, node: Node<'_, '_>) {
    let parent_scope: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| {
            parent
                .namespaces()
                .map(|ns| (ns.name(), ns.uri()))
                .collect()
        })
        .unwrap_or_default();

    let mut declared: Vec<(Option<&str>, &str)> = node
        .namespaces()
        .map(|ns| (ns.name(), ns.uri()))
        .filter(|(prefix, _)| *prefix != Some("xml"))
        .filter(|binding| !parent_scope.contains(binding))
        .collect();

    let has_default = node.namespaces().any(|ns| ns.name().is_none());
    let parent_default = parent_scope
        .iter()
        .find(|(prefix, _)| prefix.is_none())
        .map(|(_, uri)| *uri);
    if !has_default && parent_default.is_some_and(|uri| !uri.is_empty()) {
        declared.push((None, ""));
    }

    declared.sort_by(|a, b| match (a.0, b.0) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
    });
    declared.dedup_by(|a, b| a.0 == b.0);

    for (prefix, uri) in declared {
        match prefix {
            None => out.push_str(" xmlns=\""),
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
            }
        }
        out.push_str(&escape::escape_attr(uri));
        out.push('"');
    }
}

/// The `<!DOCTYPE ...>` declaration in `prolog`, including any internal subset.
fn extract_doctype(prolog: &str) -> Option<&str> {
    let start = prolog.find("<!DOCTYPE")?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, ch) in prolog[start..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some(&prolog[start..start + offset + 1]),
            _ => {}
        }
    }
    None
}
