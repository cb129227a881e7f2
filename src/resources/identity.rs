// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

/// The service allowed to assume a role. One role exists per principal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePrincipal {
    /// Serverless functions (the compute job and the event-driven stages).
    Lambda,
    /// The graph database, loading objects from storage.
    GraphDatabase,
    /// The managed notebook host.
    Notebook,
}

impl ServicePrincipal {
    pub const ALL: [ServicePrincipal; 3] = [
        ServicePrincipal::Lambda,
        ServicePrincipal::GraphDatabase,
        ServicePrincipal::Notebook,
    ];

    pub fn service(&self) -> &'static str {
        match self {
            ServicePrincipal::Lambda => "lambda.amazonaws.com",
            ServicePrincipal::GraphDatabase => "rds.amazonaws.com",
            ServicePrincipal::Notebook => "sagemaker.amazonaws.com",
        }
    }
}

impl fmt::Display for ServicePrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl PolicyStatement {
    pub fn allow(sid: &str, actions: &[&str], resources: Vec<String>) -> Self {
        Self {
            sid: sid.to_string(),
            effect: Effect::Allow,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamRole {
    pub name: String,
    pub trust: ServicePrincipal,
    pub statements: Vec<PolicyStatement>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl IamRole {
    /// The trust policy document granting `sts:AssumeRole` to the principal.
    pub fn assume_role_policy(&self) -> serde_json::Value {
        json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": self.trust.service() },
                "Action": "sts:AssumeRole"
            }]
        })
    }

    /// The inline permission policy document.
    pub fn permission_policy(&self) -> serde_json::Value {
        let statements: Vec<serde_json::Value> = self
            .statements
            .iter()
            .map(|statement| {
                json!({
                    "Sid": statement.sid,
                    "Effect": statement.effect,
                    "Action": statement.actions,
                    "Resource": statement.resources,
                })
            })
            .collect();
        json!({ "Version": "2012-10-17", "Statement": statements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_policy_names_the_service() {
        let role = IamRole {
            name: "crypto-notebook".to_string(),
            trust: ServicePrincipal::Notebook,
            statements: vec![PolicyStatement::allow(
                "GraphAccess",
                &["neptune-db:*"],
                vec!["*".to_string()],
            )],
            tags: BTreeMap::new(),
        };
        let trust = role.assume_role_policy();
        assert_eq!(
            trust["Statement"][0]["Principal"]["Service"],
            "sagemaker.amazonaws.com"
        );
        let policy = role.permission_policy();
        assert_eq!(policy["Statement"][0]["Effect"], "Allow");
        assert_eq!(policy["Statement"][0]["Action"][0], "neptune-db:*");
    }
}
