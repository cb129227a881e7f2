// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Minute,
    Hour,
    Day,
}

impl RateUnit {
    fn seconds(&self) -> u64 {
        match self {
            RateUnit::Minute => 60,
            RateUnit::Hour => 3_600,
            RateUnit::Day => 86_400,
        }
    }

    fn singular(&self) -> &'static str {
        match self {
            RateUnit::Minute => "minute",
            RateUnit::Hour => "hour",
            RateUnit::Day => "day",
        }
    }

    fn plural(&self) -> &'static str {
        match self {
            RateUnit::Minute => "minutes",
            RateUnit::Hour => "hours",
            RateUnit::Day => "days",
        }
    }
}

/// A fixed-interval timer, `rate(<value> <unit>)`.
///
/// The unit is singular exactly when the value is 1, as the scheduler requires.
///
/// ```
/// use corrgraph_infra::schedule::RateExpression;
/// use std::time::Duration;
///
/// let rate: RateExpression = "rate(5 minutes)".parse().unwrap();
/// assert_eq!(rate.period(), Duration::from_secs(300));
/// assert!("rate(1 minutes)".parse::<RateExpression>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateExpression {
    pub value: u32,
    pub unit: RateUnit,
}

impl RateExpression {
    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.value) * self.unit.seconds())
    }
}

impl FromStr for RateExpression {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ScheduleError::InvalidExpression {
            expression: s.to_string(),
            reason: reason.to_string(),
        };

        let inner = s
            .trim()
            .strip_prefix("rate(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| invalid("expected rate(<value> <unit>)"))?;

        let mut parts = inner.split_whitespace();
        let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected a value and a unit"));
        };

        let value: u32 = value
            .parse()
            .map_err(|_| invalid("value must be a positive integer"))?;
        if value == 0 {
            return Err(invalid("value must be a positive integer"));
        }

        let (unit, plural) = match unit {
            "minute" => (RateUnit::Minute, false),
            "minutes" => (RateUnit::Minute, true),
            "hour" => (RateUnit::Hour, false),
            "hours" => (RateUnit::Hour, true),
            "day" => (RateUnit::Day, false),
            "days" => (RateUnit::Day, true),
            _ => return Err(invalid("unit must be minute(s), hour(s) or day(s)")),
        };
        if plural == (value == 1) {
            return Err(invalid(if value == 1 {
                "a value of 1 takes a singular unit"
            } else {
                "a value above 1 takes a plural unit"
            }));
        }

        Ok(Self { value, unit })
    }
}

impl fmt::Display for RateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.value == 1 {
            self.unit.singular()
        } else {
            self.unit.plural()
        };
        write!(f, "rate({} {})", self.value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_expressions() {
        let rate: RateExpression = "rate(5 minutes)".parse().unwrap();
        assert_eq!(rate, RateExpression { value: 5, unit: RateUnit::Minute });
        assert_eq!(rate.to_string(), "rate(5 minutes)");

        let hourly: RateExpression = "rate(1 hour)".parse().unwrap();
        assert_eq!(hourly.period(), Duration::from_secs(3_600));

        let weekly: RateExpression = "rate(7 days)".parse().unwrap();
        assert_eq!(weekly.period(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn rejects_unit_number_mismatch() {
        assert!("rate(1 minutes)".parse::<RateExpression>().is_err());
        assert!("rate(5 minute)".parse::<RateExpression>().is_err());
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expression in [
            "rate(0 minutes)",
            "rate(-5 minutes)",
            "rate(five minutes)",
            "rate(5 weeks)",
            "rate(5)",
            "rate(5 minutes extra)",
            "cron(0/5 * * * ? *)",
            "",
        ] {
            let result = expression.parse::<RateExpression>();
            assert!(
                matches!(result, Err(ScheduleError::InvalidExpression { .. })),
                "{} should be rejected",
                expression
            );
        }
    }
}
