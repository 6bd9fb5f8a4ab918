// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security validation for parsed CLI arguments: path traversal and shell
//! metacharacter rejection before a value ever reaches the engine.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("argument contains a disallowed character: {0}")]
    UnsafeArgument(String),
}

/// Rejects characters that have no legitimate purpose in a resource id,
/// category, or run name but are classic shell/SQL injection vectors.
const DISALLOWED_CHARS: &[char] = &[';', '|', '&', '$', '`', '\n', '\0'];

pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a free-form string argument (not a filesystem path).
    pub fn validate_argument(value: &str) -> Result<(), ParseError> {
        if value.is_empty() {
            return Err(ParseError::UnsafeArgument("argument must not be empty".to_string()));
        }
        if value.contains("..") {
            return Err(ParseError::UnsafeArgument(value.to_string()));
        }
        if value.chars().any(|c| DISALLOWED_CHARS.contains(&c)) {
            return Err(ParseError::UnsafeArgument(value.to_string()));
        }
        Ok(())
    }

    /// Validates that `value` is both a safe argument and an existing
    /// path, returning the canonicalized form.
    pub fn validate_path(value: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(value)?;
        let path = Path::new(value);
        path.canonicalize().map_err(|_| ParseError::PathNotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal() {
        assert!(SecureArgParser::validate_argument("../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("name; rm -rf /").is_err());
    }

    #[test]
    fn accepts_plain_identifier() {
        assert!(SecureArgParser::validate_argument("word-count").is_ok());
    }

    #[test]
    fn missing_path_is_not_found() {
        assert!(matches!(
            SecureArgParser::validate_path("/no/such/file/for/this/test"),
            Err(ParseError::PathNotFound(_))
        ));
    }
}
