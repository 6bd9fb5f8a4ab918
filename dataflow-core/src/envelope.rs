// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Result Envelope
//!
//! Every stage boundary in the engine passes an [`Envelope<T>`] rather than
//! a bare `Result<T, EngineError>`. The difference is resource identity:
//! a `Failure` still carries the `resource_id` and the name of the stage
//! that produced it, so a downstream stage (or the terminal sink) can skip
//! the resource without losing track of which one failed.
//!
//! Stages that forward a `Failure` unchanged (the default for every stage
//! except the one that produced it) do so without invoking their own user
//! function — see [`Envelope::map`].

use std::time::Duration;

/// Either a successful payload or a description of why processing this
/// resource failed, always paired with the resource's stable id.
#[derive(Debug, Clone)]
pub enum Envelope<T> {
    Success {
        payload: T,
        resource_id: String,
        duration: Duration,
    },
    Failure {
        resource_id: String,
        error_message: String,
        error_step: String,
        duration: Duration,
    },
}

impl<T> Envelope<T> {
    pub fn success(payload: T, resource_id: impl Into<String>, duration: Duration) -> Self {
        Envelope::Success {
            payload,
            resource_id: resource_id.into(),
            duration,
        }
    }

    pub fn failure(
        resource_id: impl Into<String>,
        error_message: impl Into<String>,
        error_step: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Envelope::Failure {
            resource_id: resource_id.into(),
            error_message: error_message.into(),
            error_step: error_step.into(),
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Envelope::Failure { .. })
    }

    pub fn resource_id(&self) -> &str {
        match self {
            Envelope::Success { resource_id, .. } => resource_id,
            Envelope::Failure { resource_id, .. } => resource_id,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Envelope::Success { duration, .. } => *duration,
            Envelope::Failure { duration, .. } => *duration,
        }
    }

    /// Applies `f` to a `Success` payload, converting it to a `Failure`
    /// (preserving `resource_id`) if `f` itself errors. A `Failure` passes
    /// through unchanged and `f` is never called — this is what lets a
    /// downstream stage skip already-failed resources without knowing
    /// anything about why they failed.
    pub fn map<U>(
        self,
        step_name: &str,
        f: impl FnOnce(T) -> Result<U, String>,
    ) -> Envelope<U> {
        match self {
            Envelope::Success {
                payload,
                resource_id,
                duration,
            } => match f(payload) {
                Ok(new_payload) => Envelope::Success {
                    payload: new_payload,
                    resource_id,
                    duration,
                },
                Err(error_message) => Envelope::Failure {
                    resource_id,
                    error_message,
                    error_step: step_name.to_string(),
                    duration,
                },
            },
            Envelope::Failure {
                resource_id,
                error_message,
                error_step,
                duration,
            } => Envelope::Failure {
                resource_id,
                error_message,
                error_step,
                duration,
            },
        }
    }

    /// Like [`Envelope::map`], but `f` itself may already be expressed in
    /// terms of an [`crate::error::EngineError`] rather than a raw string.
    pub fn and_then<U>(
        self,
        step_name: &str,
        f: impl FnOnce(T) -> Result<U, crate::error::EngineError>,
    ) -> Envelope<U> {
        self.map(step_name, |payload| f(payload).map_err(|e| e.to_string()))
    }

    /// Unwraps a terminal envelope into a plain `Result`, for use at a
    /// terminal sink or test assertion.
    pub fn into_result(self) -> Result<T, crate::error::EngineError> {
        match self {
            Envelope::Success { payload, .. } => Ok(payload),
            Envelope::Failure {
                error_message,
                error_step,
                ..
            } => Err(crate::error::EngineError::StageFailure {
                step: error_step,
                source_message: error_message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_transforms_success_payload() {
        let env = Envelope::success(2, "r1", Duration::from_millis(5));
        let mapped = env.map("double", |n| Ok::<_, String>(n * 2));
        match mapped {
            Envelope::Success { payload, resource_id, .. } => {
                assert_eq!(payload, 4);
                assert_eq!(resource_id, "r1");
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn map_converts_user_error_to_failure_with_step_name() {
        let env = Envelope::success(2, "r1", Duration::from_millis(5));
        let mapped: Envelope<i32> = env.map("divide", |_| Err("boom".to_string()));
        match mapped {
            Envelope::Failure {
                resource_id,
                error_step,
                error_message,
                ..
            } => {
                assert_eq!(resource_id, "r1");
                assert_eq!(error_step, "divide");
                assert_eq!(error_message, "boom");
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn map_forwards_failure_unchanged_without_calling_f() {
        let env: Envelope<i32> =
            Envelope::failure("r1", "earlier error", "stage1", Duration::from_millis(1));
        let mut called = false;
        let mapped = env.map("stage2", |n| {
            called = true;
            Ok::<_, String>(n + 1)
        });
        assert!(!called);
        match mapped {
            Envelope::Failure { error_step, .. } => assert_eq!(error_step, "stage1"),
            _ => panic!("expected failure to pass through"),
        }
    }
}
