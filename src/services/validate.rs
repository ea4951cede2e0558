//! Structural sniffing for the accepted 3D model formats.
//!
//! Every validator returns a `Validation` and never propagates an error: an
//! unreadable file is simply `Invalid` with the I/O message as the reason.

use crate::domain::constants::{
    ASCII_SNIFF_CHARS, ASCII_STL_KEYWORDS, ASCII_STL_REQUIRED, OBJ_KEYWORDS, STL_HEADER_LEN,
    STL_PREAMBLE_LEN, STL_TRIANGLE_LEN,
};
use crate::domain::models::{ModelFormat, Validation};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Structurally sound ASCII STL is reported `Invalid` unless this is set.
    pub accept_ascii_stl: bool,
    pub ascii_extra_keywords: Vec<String>,
}

pub fn validate_binary_stl(path: &Path) -> Validation {
    match read_triangle_count(path) {
        Ok(Some((count, actual))) => {
            let expected = STL_PREAMBLE_LEN + STL_TRIANGLE_LEN * u64::from(count);
            if expected == actual {
                Validation::Valid {
                    format: ModelFormat::BinaryStl,
                    count: u64::from(count),
                }
            } else {
                Validation::invalid(format!(
                    "size mismatch: expected {expected}, got {actual}"
                ))
            }
        }
        Ok(None) => Validation::invalid("incomplete header"),
        Err(e) => Validation::invalid(format!("error reading file: {e}")),
    }
}

fn read_triangle_count(path: &Path) -> std::io::Result<Option<(u32, u64)>> {
    let mut file = std::fs::File::open(path)?;
    let actual = file.metadata()?.len();
    if actual < STL_PREAMBLE_LEN {
        return Ok(None);
    }
    let mut preamble = [0u8; STL_PREAMBLE_LEN as usize];
    file.read_exact(&mut preamble)?;
    let mut count = [0u8; 4];
    count.copy_from_slice(&preamble[STL_HEADER_LEN as usize..]);
    Ok(Some((u32::from_le_bytes(count), actual)))
}

/// Facet count and diagnostics for an ASCII STL that passed every structural
/// check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiStlSummary {
    pub facets: u64,
    pub unrecognized: BTreeSet<String>,
}

pub fn validate_ascii_stl(path: &Path, options: &ValidationOptions) -> Validation {
    match std::fs::read(path) {
        Ok(bytes) => check_ascii_stl(path, &bytes, options),
        Err(e) => Validation::invalid(format!("error reading file: {e}")),
    }
}

fn check_ascii_stl(path: &Path, bytes: &[u8], options: &ValidationOptions) -> Validation {
    if bytes.is_empty() {
        return Validation::invalid("file is empty");
    }
    let text = decode_permissive(bytes);
    match inspect_ascii_stl(&text, &options.ascii_extra_keywords) {
        Err(reason) => Validation::invalid(reason),
        Ok(summary) if options.accept_ascii_stl => {
            if !summary.unrecognized.is_empty() {
                tracing::warn!(
                    file = %path.display(),
                    tokens = ?summary.unrecognized,
                    "ASCII STL contains unrecognized tokens"
                );
            }
            Validation::Valid {
                format: ModelFormat::AsciiStl,
                count: summary.facets,
            }
        }
        Ok(summary) => Validation::invalid(format!(
            "Valid ASCII STL file with {} facets. unrecognized: {:?}",
            summary.facets, summary.unrecognized
        )),
    }
}

/// Drops byte sequences that are not UTF-8 instead of replacing them.
fn decode_permissive(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

pub fn inspect_ascii_stl(text: &str, extra_keywords: &[String]) -> Result<AsciiStlSummary, String> {
    let head: String = text.chars().take(ASCII_SNIFF_CHARS).collect::<String>().to_lowercase();
    let missing: Vec<&str> = ASCII_STL_REQUIRED
        .iter()
        .copied()
        .filter(|kw| !head.contains(kw))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "missing keywords in the first chunk: {}",
            missing.join(", ")
        ));
    }

    let lines: Vec<String> = text
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    match lines.first() {
        Some(first) if first.starts_with("solid") => {}
        _ => return Err("file does not start with 'solid'".to_string()),
    }
    match lines.last() {
        Some(last) if last.starts_with("endsolid") => {}
        _ => return Err("file does not end with 'endsolid'".to_string()),
    }

    let mut facets = 0u64;
    let mut vertices = 0u64;
    let mut inside_facet = false;
    for line in &lines {
        if line.starts_with("facet normal") {
            facets += 1;
            inside_facet = true;
        } else if line.starts_with("vertex") && inside_facet {
            vertices += 1;
        } else if line.starts_with("endfacet") {
            inside_facet = false;
        }
    }

    if facets == 0 {
        return Err("no 'facet normal' keywords found".to_string());
    }
    if vertices != facets * 3 {
        return Err(format!(
            "vertex count mismatch: expected {}, found {}",
            facets * 3,
            vertices
        ));
    }

    let mut recognized: BTreeSet<String> =
        ASCII_STL_KEYWORDS.iter().map(|k| k.to_string()).collect();
    recognized.extend(extra_keywords.iter().map(|k| k.to_lowercase()));

    let mut unrecognized = BTreeSet::new();
    for line in &lines {
        if line.starts_with(|c: char| c.is_ascii_digit() || "-+.".contains(c)) {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let pair = match tokens.next() {
            Some(second) => format!("{first} {second}"),
            None => first.to_string(),
        };
        if !recognized.contains(first) && !recognized.contains(&pair) {
            unrecognized.insert(first.to_string());
        }
    }

    Ok(AsciiStlSummary {
        facets,
        unrecognized,
    })
}

pub fn validate_obj(path: &Path) -> Validation {
    match std::fs::read(path) {
        Ok(bytes) => check_obj(&bytes),
        Err(e) => Validation::invalid(format!("error reading file: {e}")),
    }
}

/// Accepts when any non-blank line begins with an OBJ keyword. This is a raw
/// prefix test, so `solid`, `facet` and `vertex` lines match `s`, `f` and `v`
/// and a well-formed ASCII STL passes as OBJ. `count` is the number of `f`
/// face statements.
fn check_obj(bytes: &[u8]) -> Validation {
    if bytes.is_empty() {
        return Validation::invalid("file is empty");
    }
    let text = decode_permissive(bytes);

    let mut matched = false;
    let mut faces = 0u64;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if OBJ_KEYWORDS.iter().any(|kw| line.starts_with(kw)) {
            matched = true;
        }
        if line.split_whitespace().next() == Some("f") {
            faces += 1;
        }
    }

    if matched {
        Validation::Valid {
            format: ModelFormat::Obj,
            count: faces,
        }
    } else {
        Validation::invalid("no valid OBJ keywords found")
    }
}

/// Binary STL, then ASCII STL, then OBJ; the first `Valid` wins. The binary
/// check only reads the preamble; the text checks share one read.
pub fn classify_model(path: &Path, options: &ValidationOptions) -> Validation {
    let mut reasons = Vec::new();
    let mut bytes: Option<Vec<u8>> = None;
    for format in [ModelFormat::BinaryStl, ModelFormat::AsciiStl, ModelFormat::Obj] {
        let result = match format {
            ModelFormat::BinaryStl => validate_binary_stl(path),
            text_format => {
                if bytes.is_none() {
                    match std::fs::read(path) {
                        Ok(b) => bytes = Some(b),
                        Err(e) => {
                            reasons.push(format!("{text_format}: error reading file: {e}"));
                            break;
                        }
                    }
                }
                let content = bytes.as_deref().unwrap_or_default();
                if text_format == ModelFormat::AsciiStl {
                    check_ascii_stl(path, content, options)
                } else {
                    check_obj(content)
                }
            }
        };
        match result {
            valid @ Validation::Valid { .. } => return valid,
            Validation::Invalid { reason } => reasons.push(format!("{format}: {reason}")),
        }
    }
    Validation::invalid(reasons.join("; "))
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub fn binary_stl(triangles: u32) -> Vec<u8> {
        let mut out = vec![0u8; 80];
        out[..5].copy_from_slice(b"model");
        out.extend_from_slice(&triangles.to_le_bytes());
        out.resize(84 + 50 * triangles as usize, 0);
        out
    }

    pub fn ascii_stl(facets: usize) -> String {
        let mut out = String::from("solid cube\n");
        for _ in 0..facets {
            out.push_str("  facet normal 0 0 1\n    outer loop\n");
            out.push_str("      vertex 0 0 0\n      vertex 1 0 0\n      vertex 0 1 0\n");
            out.push_str("    endloop\n  endfacet\n");
        }
        out.push_str("endsolid cube\n");
        out
    }
}
