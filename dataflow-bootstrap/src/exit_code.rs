// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Maps engine and CLI errors onto the BSD `sysexits.h` convention, so a
//! shell script driving the demo binary can branch on failure class
//! without parsing log output.

use dataflow_core::EngineError;

use crate::cli::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    /// EX_USAGE: command line usage error.
    Usage = 64,
    /// EX_DATAERR: input data was incorrect.
    DataErr = 65,
    /// EX_UNAVAILABLE: a required service was unavailable (persistence, storage).
    Unavailable = 69,
    /// EX_SOFTWARE: internal software error (a stage panicked, an invariant broke).
    Software = 70,
    /// EX_TEMPFAIL: the run was cancelled before completion.
    TempFail = 75,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

pub fn map_error_to_exit_code(err: &EngineError) -> ExitCode {
    match err {
        EngineError::InvalidConfiguration(_) | EngineError::DuplicateStepName(_) | EngineError::DuplicateChildResourceId { .. } => {
            ExitCode::Usage
        }
        EngineError::Persistence(_) | EngineError::ArtifactStorage(_) => ExitCode::Unavailable,
        EngineError::StageFailure { .. } => ExitCode::Software,
        EngineError::Cancelled => ExitCode::TempFail,
    }
}

pub fn result_to_exit_code(result: Result<(), EngineError>) -> std::process::ExitCode {
    match result {
        Ok(()) => ExitCode::Ok.into(),
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            map_error_to_exit_code(&err).into()
        }
    }
}

pub fn parse_error_exit_code(_err: &ParseError) -> ExitCode {
    ExitCode::Usage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_maps_to_tempfail() {
        assert_eq!(map_error_to_exit_code(&EngineError::Cancelled), ExitCode::TempFail);
    }

    #[test]
    fn persistence_failure_maps_to_unavailable() {
        let err = EngineError::Persistence("connection refused".to_string());
        assert_eq!(map_error_to_exit_code(&err), ExitCode::Unavailable);
    }

    #[test]
    fn stage_failure_maps_to_software() {
        let err = EngineError::StageFailure {
            step: "transform".to_string(),
            source_message: "boom".to_string(),
        };
        assert_eq!(map_error_to_exit_code(&err), ExitCode::Software);
    }
}
