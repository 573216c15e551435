//! Matched / unmatched query logs
//!
//! Both logs are append-only and sanitized before anything is written.
//! Unmatched queries go to a CSV file for review; every answered query is
//! appended to a free-form text log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;

use super::paths::KbPaths;

const UNMATCHED_HEADER: &str = "timestamp,query,top_suggestions";
const SUGGESTION_SEPARATOR: &str = " | ";
const MAX_LOGGED_SUGGESTIONS: usize = 5;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
    // 7-15 digits, optional leading '+', single spaces or dashes between digits
    static ref PHONE_RE: Regex = Regex::new(r"\+?\b\d(?:[\s-]?\d){6,14}\b").unwrap();
}

/// Mask e-mail addresses and phone numbers.
pub fn sanitize(text: &str) -> String {
    let text = EMAIL_RE.replace_all(text, "[email]");
    PHONE_RE.replace_all(&text, "[phone]").into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedLogEntry {
    pub timestamp: String,
    pub query: String,
    pub top_suggestions: Vec<String>,
}

pub struct QueryLog {
    unmatched: PathBuf,
    matched: PathBuf,
    write_lock: Mutex<()>,
}

impl QueryLog {
    pub fn new(paths: &KbPaths) -> Self {
        Self {
            unmatched: paths.unmatched_log.clone(),
            matched: paths.matched_log.clone(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn log_unmatched(&self, query: &str, suggestions: &[String]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let write_header = !self.unmatched.exists();
        let mut file = open_append(&self.unmatched)?;

        if write_header {
            writeln!(file, "{}", UNMATCHED_HEADER)?;
        }
        let top: Vec<&str> = suggestions
            .iter()
            .take(MAX_LOGGED_SUGGESTIONS)
            .map(String::as_str)
            .collect();
        writeln!(
            file,
            "{},{},{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            csv_field(&sanitize(query)),
            csv_field(&top.join(SUGGESTION_SEPARATOR)),
        )?;
        Ok(())
    }

    pub fn log_matched(&self, query: &str, scored: &[(String, f32)]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut file = open_append(&self.matched)?;

        let mut sorted = scored.to_vec();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut block = format!("\nInput: {}\n", sanitize(query));
        for (question, score) in &sorted {
            block.push_str(&format!("  {} — {:.3}\n", question, score));
        }
        file.write_all(block.as_bytes())?;
        Ok(())
    }

    /// Read back the unmatched log, oldest first.
    pub fn read_unmatched(&self) -> Result<Vec<UnmatchedLogEntry>> {
        if !self.unmatched.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.unmatched)
            .with_context(|| format!("Failed to read {}", self.unmatched.display()))?;

        Ok(parse_csv(&raw)
            .into_iter()
            .skip(1)
            .filter(|record| record.len() >= 2)
            .map(|mut record| {
                record.resize(3, String::new());
                let suggestions = record[2]
                    .split(SUGGESTION_SEPARATOR)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                UnmatchedLogEntry {
                    timestamp: std::mem::take(&mut record[0]),
                    query: std::mem::take(&mut record[1]),
                    top_suggestions: suggestions,
                }
            })
            .collect())
    }
}

fn open_append(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Minimal RFC 4180 reader for the files written above.
fn parse_csv(raw: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => record.push(std::mem::take(&mut field)),
            ('\r', false) => {}
            ('\n', false) => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
