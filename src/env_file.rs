// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `.env` file parsing.
//!
//! Line-oriented `KEY=VALUE` format:
//!
//! - Blank lines and lines starting with `#` are ignored.
//! - An optional leading `export ` is accepted.
//! - Double-quoted values lose their quotes and have `\n` expanded to a newline.
//! - Single-quoted values lose their quotes and are kept verbatim.
//! - Unquoted values are trimmed.
//! - Any other line is a [`EnvFileError::MalformedLine`] naming its 1-based line number.
//!
//! Pairs are returned in file order, duplicates included. Consumers apply them in order so
//! the last occurrence of a key wins.

use std::path::Path;

use tracing::debug;

use crate::errors::EnvFileError;

/// Parses `.env` formatted text into ordered `(key, value)` pairs.
///
/// # Errors
///
/// Returns [`EnvFileError::MalformedLine`] for a line without `=` or with an empty key.
pub fn parse_env(contents: &str) -> Result<Vec<(String, String)>, EnvFileError> {
    let mut pairs = Vec::new();

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = || EnvFileError::MalformedLine {
            line_number: index + 1,
            line: raw_line.to_string(),
        };

        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=').ok_or_else(malformed)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(malformed());
        }

        pairs.push((key.to_string(), unquote(value.trim())));
    }

    Ok(pairs)
}

/// Reads and parses a `.env` file.
///
/// # Errors
///
/// Returns [`EnvFileError::Io`] if the file cannot be read, or a parse error from [`parse_env`].
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, EnvFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| EnvFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pairs = parse_env(&contents)?;
    debug!(path = %path.display(), entries = pairs.len(), "Parsed env file");
    Ok(pairs)
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\n", "\n");
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
#[path = "env_file_tests.rs"]
mod env_file_tests;
