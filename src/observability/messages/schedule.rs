// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the scheduled invocation path.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The timer rule fired.
///
/// # Log Level
/// `debug!` - Routine, fires every interval
pub struct TimerFired<'a> {
    pub rule: &'a str,
    pub expression: &'a str,
}

impl Display for TimerFired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Timer {} fired ({})", self.rule, self.expression)
    }
}

impl StructuredLog for TimerFired<'_> {
    fn log(&self) {
        tracing::debug!(rule = self.rule, expression = self.expression, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "timer",
            span_name = name,
            rule = self.rule,
            expression = self.expression,
        )
    }
}

/// The target function may not be invoked by this rule. Nothing else reports
/// this, so the warning is the only trace a silent failure leaves.
///
/// # Log Level
/// `warn!` - Degraded behavior
pub struct InvocationDenied<'a> {
    pub rule: &'a str,
    pub function: &'a str,
    pub reason: &'a str,
}

impl Display for InvocationDenied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Invocation of {} by {} denied: {}",
            self.function, self.rule, self.reason
        )
    }
}

impl StructuredLog for InvocationDenied<'_> {
    fn log(&self) {
        tracing::warn!(
            rule = self.rule,
            function = self.function,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "invocation_denied",
            span_name = name,
            rule = self.rule,
            function = self.function,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct JobInvoked<'a> {
    pub rule: &'a str,
    pub function: &'a str,
}

impl Display for JobInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rule {} invoked {}", self.rule, self.function)
    }
}

impl StructuredLog for JobInvoked<'_> {
    fn log(&self) {
        tracing::info!(rule = self.rule, function = self.function, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "job_invoked",
            span_name = name,
            rule = self.rule,
            function = self.function,
        )
    }
}
