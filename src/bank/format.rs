//! Backing-file framing codec.
//!
//! A bank file is a sequence of record blocks. Each block starts with the
//! literal line `object`, carries `key=value` header lines, and closes with
//! the literal line `end`. Every block names a `name` and a `type`; `code`
//! blocks also declare `count`, and exactly that many raw content lines
//! follow the `end` line verbatim. `link` blocks carry nothing after `end`.

use std::collections::{BTreeMap, HashMap};

use crate::bank::{paths, Record};
use crate::error::{AppError, AppResult};

/// Splits text into lines regardless of line-ending style and drops trailing
/// blank lines. An empty payload has zero lines.
pub fn split_lines(data: &str) -> Vec<String> {
    let normalized = data.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Decodes a full bank file into its record map.
pub fn parse(data: &str) -> AppResult<BTreeMap<String, Record>> {
    let lines = split_lines(data);
    let mut records = BTreeMap::new();
    let mut pos = 0usize;
    while pos < lines.len() {
        let (key, record, next) = parse_block(&lines, pos)?;
        records.insert(key, record);
        pos = next;
    }
    Ok(records)
}

/// Parses one block starting at `pos`; returns the record and the position
/// just past its content.
fn parse_block(lines: &[String], mut pos: usize) -> AppResult<(String, Record, usize)> {
    if lines[pos] != "object" {
        return Err(AppError::format("Object identifier missing."));
    }
    pos += 1;
    let mut fields: HashMap<&str, &str> = HashMap::new();
    loop {
        let line = lines
            .get(pos)
            .ok_or_else(|| AppError::format("No more lines to read."))?;
        pos += 1;
        if line == "end" {
            break;
        }
        // Header lines without exactly one '=' are skipped, not rejected.
        let pieces: Vec<&str> = line.split('=').collect();
        if pieces.len() == 2 {
            fields.insert(pieces[0], pieces[1]);
        }
    }
    let name = fields.get("name").ok_or_else(|| AppError::format("Missing file name."))?;
    let kind = fields.get("type").ok_or_else(|| AppError::format("Missing file type."))?;
    let key = paths::to_bank_key(name);
    match *kind {
        "code" => {
            let count = fields
                .get("count")
                .ok_or_else(|| AppError::format("Missing number of lines."))?;
            let count: usize = count
                .parse()
                .map_err(|_| AppError::format(format!("Bad line count {count}.")))?;
            if pos + count > lines.len() {
                return Err(AppError::format("No more lines to read."));
            }
            let content = lines[pos..pos + count].to_vec();
            pos += count;
            Ok((key, Record::Code { lines: content }, pos))
        }
        "link" => Ok((key, Record::Link, pos)),
        other => Err(AppError::format(format!("Unknown file type {other}."))),
    }
}

/// Renders the record map back into the backing-file format. Header fields
/// are written in the order `name`, `type`, `count`; lines join with `\n`.
pub fn render(records: &BTreeMap<String, Record>) -> String {
    let mut out: Vec<String> = Vec::new();
    for (name, record) in records {
        out.push("object".to_string());
        out.push(format!("name={name}"));
        match record {
            Record::Code { lines } => {
                out.push("type=code".to_string());
                out.push(format!("count={}", lines.len()));
                out.push("end".to_string());
                out.extend(lines.iter().cloned());
            }
            Record::Link => {
                out.push("type=link".to_string());
                out.push("end".to_string());
            }
        }
    }
    out.join("\n")
}
