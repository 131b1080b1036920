use crate::extraction::table::split_by_whitespace_gaps;
use crate::layouts::CompiledSection;
use regex::Regex;
use std::collections::HashMap;

/// Resolved sections by name. A section whose start marker never appears is
/// absent, and so is every section nested in it.
#[derive(Debug, Default)]
pub struct Sections {
    resolved: HashMap<String, Vec<String>>,
}

impl Sections {
    /// Resolve `sections` in declaration order against the document lines.
    pub fn resolve(sections: &[CompiledSection], lines: &[&str]) -> Self {
        let mut resolved: HashMap<String, Vec<String>> = HashMap::new();

        for section in sections {
            let found = match &section.within {
                Some(parent) => match resolved.get(parent) {
                    Some(parent_lines) => {
                        let parent_lines: Vec<&str> =
                            parent_lines.iter().map(String::as_str).collect();
                        slice_section(section, &parent_lines)
                    }
                    None => None,
                },
                None => slice_section(section, lines),
            };

            match found {
                Some(body) => {
                    tracing::trace!(section = %section.name, lines = body.len(), "section resolved");
                    resolved.insert(section.name.clone(), body);
                }
                None => tracing::trace!(section = %section.name, "section not found"),
            }
        }

        Sections { resolved }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.resolved.get(name).map(Vec::as_slice)
    }
}

/// Start line inclusive, end line exclusive; the end marker is searched only
/// after the start.
fn slice_section(section: &CompiledSection, lines: &[&str]) -> Option<Vec<String>> {
    let start = lines.iter().position(|l| section.start.is_match(l))?;
    let end = section
        .end
        .as_ref()
        .and_then(|end| {
            lines[start + 1..]
                .iter()
                .position(|l| end.is_match(l))
                .map(|i| start + 1 + i)
        })
        .unwrap_or(lines.len());

    let body = &lines[start..end];
    Some(match &section.heading {
        Some(heading) => keep_column(body, heading),
        None => body.iter().map(|l| l.to_string()).collect(),
    })
}

/// Keep one side of a two-column box.
///
/// The heading line is the first line matching `heading` with at least two
/// segments. The boundary sits halfway between its first two segments; every
/// line's segments go left or right by their offset. Without a heading line
/// the section is returned whole.
fn keep_column(lines: &[&str], heading: &Regex) -> Vec<String> {
    let split = lines.iter().find_map(|line| {
        if !heading.is_match(line) {
            return None;
        }
        let segments = split_by_whitespace_gaps(line);
        if segments.len() < 2 {
            return None;
        }
        let boundary = (segments[0].0 + segments[1].0) / 2;
        let keep_left = heading.is_match(segments[0].1);
        Some((boundary, keep_left))
    });

    let Some((boundary, keep_left)) = split else {
        return lines.iter().map(|l| l.to_string()).collect();
    };

    lines
        .iter()
        .filter_map(|line| {
            let kept: Vec<&str> = split_by_whitespace_gaps(line)
                .into_iter()
                .filter(|(offset, _)| (*offset < boundary) == keep_left)
                .map(|(_, text)| text)
                .collect();
            (!kept.is_empty()).then(|| kept.join("  "))
        })
        .collect()
}
