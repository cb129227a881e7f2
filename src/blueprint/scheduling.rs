// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Triggers: the timer rule for the ETL job and the bucket notifications for
//! the event-driven stages. Every trigger is paired with the invoke
//! permission that lets its source call the function.

use super::{address, names, reference};
use crate::config::StackConfig;
use crate::resources::compute::principal_for;
use crate::resources::{
    BucketNotification, InvokePermission, Resource, ResourceBody, ResourceKind, ScheduleRule,
    ScheduleTarget,
};

const INVOKE_ACTION: &str = "lambda:InvokeFunction";
const OBJECT_CREATED: &str = "s3:ObjectCreated:*";

fn permission(name: &str, statement_id: &str, function: &str, source: (ResourceKind, &str)) -> Resource {
    let (source_kind, source_name) = source;
    Resource::new(
        name,
        ResourceBody::InvokePermission(InvokePermission {
            statement_id: statement_id.to_string(),
            action: INVOKE_ACTION.to_string(),
            function_name: reference(ResourceKind::Function, function, "function_name"),
            principal: principal_for(source_kind).to_string(),
            source_arn: reference(source_kind, source_name, "arn"),
        }),
    )
}

fn notification(
    bucket: &str,
    function: &str,
    permission: &str,
    filter_prefix: Option<&str>,
) -> Resource {
    // The storage service tests the destination when the notification is saved.
    Resource::new(
        bucket,
        ResourceBody::BucketNotification(BucketNotification {
            bucket: reference(ResourceKind::Bucket, bucket, "id"),
            lambda_function_arn: reference(ResourceKind::Function, function, "arn"),
            events: vec![OBJECT_CREATED.to_string()],
            filter_prefix: filter_prefix.map(str::to_string),
            filter_suffix: Some(".csv".to_string()),
        }),
    )
    .with_depends_on(address(ResourceKind::InvokePermission, permission))
}

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let mut resources = vec![
        Resource::new(
            names::ETL,
            ResourceBody::ScheduleRule(ScheduleRule {
                name: format!("{}-etl-schedule", config.name_prefix()),
                description: "Runs the correlation ETL job".to_string(),
                schedule_expression: config.schedule.expression.clone(),
                enabled: config.schedule.enabled,
            }),
        ),
        Resource::new(
            names::ETL,
            ResourceBody::ScheduleTarget(ScheduleTarget {
                rule: reference(ResourceKind::ScheduleRule, names::ETL, "name"),
                target_id: format!("{}-etl", config.name_prefix()),
                arn: reference(ResourceKind::Function, names::ETL, "arn"),
            }),
        ),
        permission(
            names::SCHEDULE_PERMISSION,
            "AllowExecutionFromEventBridge",
            names::ETL,
            (ResourceKind::ScheduleRule, names::ETL),
        ),
    ];

    if config.loader.enabled {
        resources.push(permission(
            names::RAW_LOADER_PERMISSION,
            "AllowExecutionFromRawBucket",
            names::LOADER,
            (ResourceKind::Bucket, names::RAW),
        ));
        resources.push(notification(
            names::RAW,
            names::LOADER,
            names::RAW_LOADER_PERMISSION,
            Some("upload/"),
        ));
    }

    if config.signals.enabled {
        resources.push(permission(
            names::ANALYSIS_SIGNALS_PERMISSION,
            "AllowExecutionFromAnalysisBucket",
            names::SIGNALS,
            (ResourceKind::Bucket, names::ANALYSIS),
        ));
        resources.push(notification(
            names::ANALYSIS,
            names::SIGNALS,
            names::ANALYSIS_SIGNALS_PERMISSION,
            None,
        ));
    }

    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;
    use crate::resources::ResourceAddress;

    #[test]
    fn schedule_permission_matches_rule_and_function() {
        let resources = declare(&minimal_config());
        let permission = resources
            .iter()
            .find_map(|r| match &r.body {
                ResourceBody::InvokePermission(p) if r.address.name == names::SCHEDULE_PERMISSION => Some(p),
                _ => None,
            })
            .unwrap();

        let function = ResourceAddress::new(ResourceKind::Function, names::ETL);
        let rule = ResourceAddress::new(ResourceKind::ScheduleRule, names::ETL);
        assert!(permission.grants(&function, &rule));
        assert_eq!(permission.principal, "events.amazonaws.com");
    }

    #[test]
    fn notifications_wait_for_their_permissions() {
        let resources = declare(&minimal_config());
        let raw = resources
            .iter()
            .find(|r| r.address == address(ResourceKind::BucketNotification, names::RAW))
            .unwrap();
        assert_eq!(
            raw.depends_on,
            vec![address(ResourceKind::InvokePermission, names::RAW_LOADER_PERMISSION)]
        );
        match &raw.body {
            ResourceBody::BucketNotification(n) => {
                assert_eq!(n.filter_prefix.as_deref(), Some("upload/"));
                assert_eq!(n.filter_suffix.as_deref(), Some(".csv"));
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn disabled_stages_declare_no_triggers() {
        let mut config = minimal_config();
        config.loader.enabled = false;
        config.signals.enabled = false;
        let resources = declare(&config);
        assert_eq!(resources.len(), 3);
    }
}
