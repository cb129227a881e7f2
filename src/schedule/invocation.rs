// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The runtime path a timer tick takes:
//! `TimerIdle -> Fired -> InvocationPermitted -> JobInvoked`.
//!
//! The invocation permission is a precondition of the middle transition. When
//! it is missing, or the rule has no target, the tick is denied, logged at
//! `warn` and the machine returns to `TimerIdle`. Nothing else reports it.
//! Retries are not modeled.

use crate::blueprint::Stack;
use crate::errors::ScheduleError;
use crate::observability::messages::schedule::{InvocationDenied, JobInvoked, TimerFired};
use crate::observability::messages::StructuredLog;
use crate::resources::{ResourceAddress, ResourceBody, ResourceKind};
use crate::schedule::RateExpression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    TimerIdle,
    Fired,
    InvocationPermitted,
    JobInvoked,
}

/// What a stack declares for one schedule rule: its timer, the function its
/// target points at, and whether a permission lets the rule invoke it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationBinding {
    pub rule: ResourceAddress,
    pub expression: RateExpression,
    pub enabled: bool,
    pub function: Option<ResourceAddress>,
    pub permitted: bool,
}

impl InvocationBinding {
    pub fn from_stack(stack: &Stack, rule: &ResourceAddress) -> Result<Self, ScheduleError> {
        let declared = match stack.get(rule).map(|r| &r.body) {
            Some(ResourceBody::ScheduleRule(declared)) => declared,
            _ => return Err(ScheduleError::UnknownRule(rule.to_string())),
        };
        let expression: RateExpression = declared.schedule_expression.parse()?;

        let function = stack
            .of_kind(ResourceKind::ScheduleTarget)
            .find_map(|resource| match &resource.body {
                ResourceBody::ScheduleTarget(target) if target.rule.address == *rule => {
                    Some(target.arn.address.clone())
                }
                _ => None,
            });

        let permitted = function.as_ref().is_some_and(|function| {
            stack
                .of_kind(ResourceKind::InvokePermission)
                .any(|resource| match &resource.body {
                    ResourceBody::InvokePermission(permission) => permission.grants(function, rule),
                    _ => false,
                })
        });

        Ok(Self {
            rule: rule.clone(),
            expression,
            enabled: declared.enabled,
            function,
            permitted,
        })
    }
}

/// Result of one full timer tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Invoked { function: ResourceAddress },
    Denied { reason: String },
    Disabled,
}

#[derive(Debug, Clone)]
pub struct InvocationMachine {
    binding: InvocationBinding,
    state: InvocationState,
}

impl InvocationMachine {
    pub fn new(binding: InvocationBinding) -> Self {
        Self {
            binding,
            state: InvocationState::TimerIdle,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn binding(&self) -> &InvocationBinding {
        &self.binding
    }

    fn transition(
        &mut self,
        expected: InvocationState,
        next: InvocationState,
        event: &'static str,
    ) -> Result<(), ScheduleError> {
        if self.state != expected {
            return Err(ScheduleError::InvalidTransition {
                from: self.state,
                event,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn fire(&mut self) -> Result<(), ScheduleError> {
        self.transition(InvocationState::TimerIdle, InvocationState::Fired, "fire")?;
        TimerFired {
            rule: &self.binding.rule.to_string(),
            expression: &self.binding.expression.to_string(),
        }
        .log();
        Ok(())
    }

    /// Check the invocation permission. On denial the machine is back at `TimerIdle`.
    pub fn authorize(&mut self) -> Result<(), ScheduleError> {
        if self.state != InvocationState::Fired {
            return Err(ScheduleError::InvalidTransition {
                from: self.state,
                event: "authorize",
            });
        }

        let denial = match &self.binding.function {
            None => Some(("<none>".to_string(), "rule has no target".to_string())),
            Some(function) if !self.binding.permitted => Some((
                function.to_string(),
                "no invoke permission names this rule as its source".to_string(),
            )),
            Some(_) => None,
        };

        match denial {
            None => {
                self.state = InvocationState::InvocationPermitted;
                Ok(())
            }
            Some((function, reason)) => {
                let rule = self.binding.rule.to_string();
                InvocationDenied {
                    rule: &rule,
                    function: &function,
                    reason: &reason,
                }
                .log();
                self.state = InvocationState::TimerIdle;
                Err(ScheduleError::PermissionDenied {
                    rule,
                    function,
                    reason,
                })
            }
        }
    }

    pub fn invoke(&mut self) -> Result<ResourceAddress, ScheduleError> {
        let function = match (&self.binding.function, self.state) {
            (Some(function), InvocationState::InvocationPermitted) => function.clone(),
            _ => {
                return Err(ScheduleError::InvalidTransition {
                    from: self.state,
                    event: "invoke",
                })
            }
        };
        self.state = InvocationState::JobInvoked;
        JobInvoked {
            rule: &self.binding.rule.to_string(),
            function: &function.to_string(),
        }
        .log();
        Ok(function)
    }

    pub fn complete(&mut self) -> Result<(), ScheduleError> {
        self.transition(
            InvocationState::JobInvoked,
            InvocationState::TimerIdle,
            "complete",
        )
    }

    /// Run one tick end to end. A denial is an outcome, not an error.
    pub fn tick(&mut self) -> Result<TickOutcome, ScheduleError> {
        if !self.binding.enabled {
            return Ok(TickOutcome::Disabled);
        }

        self.fire()?;
        match self.authorize() {
            Ok(()) => {}
            Err(ScheduleError::PermissionDenied { reason, .. }) => {
                return Ok(TickOutcome::Denied { reason })
            }
            Err(other) => return Err(other),
        }
        let function = self.invoke()?;
        self.complete()?;
        Ok(TickOutcome::Invoked { function })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::names;
    use crate::config::minimal_config;

    fn etl_rule() -> ResourceAddress {
        ResourceAddress::new(ResourceKind::ScheduleRule, names::ETL)
    }

    fn stack() -> Stack {
        Stack::from_config(&minimal_config())
    }

    #[test]
    fn tick_invokes_the_etl_function() {
        let binding = InvocationBinding::from_stack(&stack(), &etl_rule()).unwrap();
        assert!(binding.permitted);
        assert_eq!(binding.expression.to_string(), "rate(5 minutes)");

        let mut machine = InvocationMachine::new(binding);
        let outcome = machine.tick().unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Invoked {
                function: ResourceAddress::new(ResourceKind::Function, names::ETL)
            }
        );
        assert_eq!(machine.state(), InvocationState::TimerIdle);
    }

    #[test]
    fn missing_permission_is_denied_and_returns_to_idle() {
        let mut stack = stack();
        stack.remove(&ResourceAddress::new(
            ResourceKind::InvokePermission,
            names::SCHEDULE_PERMISSION,
        ));

        let binding = InvocationBinding::from_stack(&stack, &etl_rule()).unwrap();
        assert!(!binding.permitted);

        let mut machine = InvocationMachine::new(binding);
        machine.fire().unwrap();
        let error = machine.authorize().unwrap_err();
        assert!(matches!(error, ScheduleError::PermissionDenied { .. }));
        assert_eq!(machine.state(), InvocationState::TimerIdle);

        assert!(matches!(machine.tick().unwrap(), TickOutcome::Denied { .. }));
    }

    #[test]
    fn rule_without_target_is_denied() {
        let mut stack = stack();
        stack.remove(&ResourceAddress::new(ResourceKind::ScheduleTarget, names::ETL));

        let binding = InvocationBinding::from_stack(&stack, &etl_rule()).unwrap();
        assert_eq!(binding.function, None);

        let mut machine = InvocationMachine::new(binding);
        match machine.tick().unwrap() {
            TickOutcome::Denied { reason } => assert!(reason.contains("no target")),
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn out_of_order_transitions_are_errors() {
        let binding = InvocationBinding::from_stack(&stack(), &etl_rule()).unwrap();
        let mut machine = InvocationMachine::new(binding);

        assert_eq!(
            machine.invoke().unwrap_err(),
            ScheduleError::InvalidTransition {
                from: InvocationState::TimerIdle,
                event: "invoke"
            }
        );
        assert!(machine.authorize().is_err());
        assert!(machine.complete().is_err());

        machine.fire().unwrap();
        assert!(machine.fire().is_err());
        assert_eq!(machine.state(), InvocationState::Fired);
    }

    #[test]
    fn disabled_rule_does_not_fire() {
        let mut config = minimal_config();
        config.schedule.enabled = false;
        let stack = Stack::from_config(&config);

        let binding = InvocationBinding::from_stack(&stack, &etl_rule()).unwrap();
        let mut machine = InvocationMachine::new(binding);
        assert_eq!(machine.tick().unwrap(), TickOutcome::Disabled);
        assert_eq!(machine.state(), InvocationState::TimerIdle);
    }

    #[test]
    fn unknown_rule_is_reported() {
        let missing = ResourceAddress::new(ResourceKind::ScheduleRule, "hourly");
        assert_eq!(
            InvocationBinding::from_stack(&stack(), &missing).unwrap_err(),
            ScheduleError::UnknownRule("schedule_rule.hourly".to_string())
        );
    }
}
