use crate::extraction::PageContent;
use serde::{Deserialize, Serialize};

/// Reconstruct column-aligned blocks from `pdftotext -layout` output.
///
/// A line is tabular when it splits into at least three segments on gaps of
/// two or more spaces. A run of tabular lines is a region: the first line is
/// taken as the header, the rest as rows whose cells are assigned to the
/// header column they sit under.
const MIN_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    /// Character offset of the cell within its line.
    pub offset: usize,
    /// Index of the header column the cell was aligned to.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub page_number: usize,
    /// First line of the region (the header line).
    pub start_line: usize,
    /// One past the last row line.
    pub end_line: usize,
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableRegion {
    /// Case- and accent-insensitive header texts, for matching by keyword.
    pub fn folded_header(&self) -> Vec<String> {
        self.header
            .iter()
            .map(|c| crate::parsing::text::fold(&c.text))
            .collect()
    }

    /// Cell text of `row` under header column `column`, joined if several
    /// cells drifted under the same column.
    pub fn cell_text(&self, row: usize, column: usize) -> Option<String> {
        let cells: Vec<&str> = self
            .rows
            .get(row)?
            .iter()
            .filter(|c| c.column == column)
            .map(|c| c.text.as_str())
            .collect();
        if cells.is_empty() {
            None
        } else {
            Some(cells.join(" "))
        }
    }
}

/// Find the table regions within one page.
pub fn find_table_regions(page: &PageContent) -> Vec<TableRegion> {
    let mut regions = Vec::new();
    let mut run: Vec<(usize, Vec<(usize, &str)>)> = Vec::new();

    for (i, line) in page.lines.iter().enumerate() {
        let segments = split_by_whitespace_gaps(line);
        if segments.len() >= MIN_COLUMNS {
            run.push((i, segments));
            continue;
        }
        if let Some(region) = close_region(page.page_number, &mut run) {
            regions.push(region);
        }
    }
    if let Some(region) = close_region(page.page_number, &mut run) {
        regions.push(region);
    }

    regions
}

fn close_region(
    page_number: usize,
    run: &mut Vec<(usize, Vec<(usize, &str)>)>,
) -> Option<TableRegion> {
    let lines = std::mem::take(run);
    if lines.len() < 2 {
        return None;
    }

    let (start_line, header_segments) = &lines[0];
    let header: Vec<Cell> = header_segments
        .iter()
        .enumerate()
        .map(|(column, (offset, text))| Cell {
            text: text.to_string(),
            offset: *offset,
            column,
        })
        .collect();

    let rows = lines[1..]
        .iter()
        .map(|(_, segments)| {
            segments
                .iter()
                .map(|(offset, text)| Cell {
                    text: text.to_string(),
                    offset: *offset,
                    column: nearest_column(&header, *offset, text.chars().count()),
                })
                .collect()
        })
        .collect();

    let end_line = lines.last().map(|(i, _)| i + 1).unwrap_or(*start_line + 1);
    Some(TableRegion {
        page_number,
        start_line: *start_line,
        end_line,
        header,
        rows,
    })
}

/// Header column whose start is closest to the cell. Numeric cells are often
/// right-aligned under their header, so both the cell start and its end are
/// considered.
fn nearest_column(header: &[Cell], offset: usize, width: usize) -> usize {
    let end = offset + width;
    header
        .iter()
        .enumerate()
        .min_by_key(|(_, h)| {
            let h_end = h.offset + h.text.chars().count();
            offset.abs_diff(h.offset).min(end.abs_diff(h_end))
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Split a line by gaps of 2+ whitespace characters, returning each segment
/// with its character offset.
pub fn split_by_whitespace_gaps(line: &str) -> Vec<(usize, &str)> {
    let mut segments = Vec::new();
    let mut start: Option<(usize, usize)> = None;
    let mut space_count = 0;
    let mut last_non_space_end = 0;

    for (char_pos, (byte_pos, c)) in line.char_indices().enumerate() {
        if c.is_whitespace() {
            space_count += 1;
            if space_count == 2 {
                if let Some((col, s)) = start.take() {
                    segments.push((col, &line[s..last_non_space_end]));
                }
            }
        } else {
            if start.is_none() {
                start = Some((char_pos, byte_pos));
            }
            space_count = 0;
            last_non_space_end = byte_pos + c.len_utf8();
        }
    }

    if let Some((col, s)) = start {
        segments.push((col, &line[s..last_non_space_end]));
    }

    segments
}
