//! Definition text recovery and indentation normalization

use morph_core::{DefinitionRef, FileId, SourceRegistry};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Where a definition was written and what it says. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSite {
    pub name: String,
    pub file: FileId,
    /// 1-based line of the first marker (or of `def` when unmarked)
    pub start_line: u32,
    /// Block text exactly as written
    pub raw: String,
    /// Block text with the common indentation removed
    pub normalized: String,
    pub dedent_columns: u32,
}

/// Text with uniform leading whitespace removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub dedent_columns: u32,
}

pub struct SourceExtractor<'s> {
    sources: &'s SourceRegistry,
}

impl<'s> SourceExtractor<'s> {
    pub fn new(sources: &'s SourceRegistry) -> Self {
        Self { sources }
    }

    pub fn extract(&self, definition: &DefinitionRef) -> Result<DefinitionSite> {
        let unavailable = |reason: String| PipelineError::SourceUnavailable {
            name: definition.name.clone(),
            file: definition.file.clone(),
            reason,
        };

        let text = self
            .sources
            .text(&definition.file)
            .ok_or_else(|| unavailable("no source text is registered".to_string()))?;
        let lines: Vec<&str> = text.lines().collect();
        let block = recover_block(&lines, definition.line).map_err(unavailable)?;

        let mut raw = block.join("\n");
        raw.push('\n');
        let normalized = normalize(&raw);
        debug!(
            "Extracted '{}' from {}:{} ({} lines, dedent {})",
            definition.name,
            definition.file,
            definition.line,
            block.len(),
            normalized.dedent_columns
        );

        Ok(DefinitionSite {
            name: definition.name.clone(),
            file: definition.file.clone(),
            start_line: definition.line,
            raw,
            normalized: normalized.text,
            dedent_columns: normalized.dedent_columns,
        })
    }
}

/// Collects the marker lines, the header and the indented body starting at
/// the 1-based `line`. Blank and comment lines may sit between the markers
/// and the header.
fn recover_block<'t>(lines: &[&'t str], line: u32) -> std::result::Result<Vec<&'t str>, String> {
    let start = (line as usize)
        .checked_sub(1)
        .filter(|idx| *idx < lines.len())
        .ok_or_else(|| format!("line {line} is outside the file ({} lines)", lines.len()))?;
    let base = indentation(lines[start]);
    let mut block = Vec::new();
    let mut idx = start;

    loop {
        let Some(current) = lines.get(idx) else {
            return Err(format!("no definition follows line {line}"));
        };
        if !block.is_empty() && is_blank_or_comment(current) {
            block.push(*current);
            idx += 1;
            continue;
        }
        let code = current.trim_start();
        let is_header = is_def_header(code);
        if !is_header && !code.starts_with('@') {
            return Err(format!("line {} does not start a definition", idx + 1));
        }

        let mut depth = bracket_delta(current);
        block.push(*current);
        idx += 1;
        while depth > 0 {
            let Some(next) = lines.get(idx) else {
                break;
            };
            depth += bracket_delta(next);
            block.push(*next);
            idx += 1;
        }

        if is_header {
            break;
        }
    }

    // Lines inside an open bracket continue the statement above them at any
    // indentation
    let mut depth: i32 = 0;
    while let Some(current) = lines.get(idx) {
        if depth <= 0 && !is_blank_or_comment(current) && indentation(current) <= base {
            break;
        }
        depth += bracket_delta(current);
        block.push(*current);
        idx += 1;
    }

    while block.last().is_some_and(|last| is_blank_or_comment(last)) {
        block.pop();
    }
    Ok(block)
}

/// Strips the longest whitespace prefix shared by every code line.
///
/// Whitespace-only lines become empty. Comment-only lines and lines continuing
/// an open bracket do not take part in the prefix; they lose it, or all their
/// indentation when it is shorter.
pub fn normalize(raw: &str) -> Normalized {
    let lines: Vec<&str> = raw.lines().collect();
    let continued = continuation_lines(&lines);
    let prefix = common_prefix(
        lines
            .iter()
            .zip(&continued)
            .filter(|(line, continued)| !**continued && !is_blank_or_comment(line))
            .map(|(line, _)| *line),
    );

    let mut text = String::with_capacity(raw.len());
    for line in &lines {
        let stripped = if line.trim().is_empty() {
            ""
        } else {
            line.strip_prefix(prefix).unwrap_or_else(|| line.trim_start())
        };
        text.push_str(stripped);
        text.push('\n');
    }

    let dedent_columns = match (lines.first(), text.lines().next()) {
        (Some(raw_first), Some(first)) => indentation(raw_first).saturating_sub(indentation(first)),
        _ => 0,
    };
    Normalized {
        text,
        dedent_columns: dedent_columns as u32,
    }
}

fn common_prefix<'a>(lines: impl Iterator<Item = &'a str>) -> &'a str {
    let mut prefix: Option<&'a str> = None;
    for line in lines {
        let leading = &line[..indentation(line)];
        prefix = Some(match prefix {
            None => leading,
            Some(current) => {
                let shared = current
                    .bytes()
                    .zip(leading.bytes())
                    .take_while(|(a, b)| a == b)
                    .count();
                &current[..shared]
            }
        });
    }
    prefix.unwrap_or("")
}

/// Marks the lines that start inside a bracket opened on an earlier line
fn continuation_lines(lines: &[&str]) -> Vec<bool> {
    let mut depth: i32 = 0;
    lines
        .iter()
        .map(|line| {
            let continued = depth > 0;
            depth = (depth + bracket_delta(line)).max(0);
            continued
        })
        .collect()
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn is_blank_or_comment(line: &str) -> bool {
    let code = line.trim();
    code.is_empty() || code.starts_with('#')
}

fn is_def_header(code: &str) -> bool {
    code.strip_prefix("def")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// Net bracket depth change of a line, ignoring strings and comments
fn bracket_delta(line: &str) -> i32 {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '#' => break,
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
