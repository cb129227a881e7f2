// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{named_tags, names};
use crate::config::consts::LOCK_HASH_KEY;
use crate::config::StackConfig;
use crate::resources::{Bucket, BucketPurpose, LockTable, Resource, ResourceBody};

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let storage = &config.storage;
    let buckets = [
        (names::RAW, &storage.raw_bucket, BucketPurpose::Raw),
        (names::ANALYSIS, &storage.analysis_bucket, BucketPurpose::Analysis),
        (names::SIGNALS, &storage.signals_bucket, BucketPurpose::Signals),
    ];

    let mut resources: Vec<Resource> = buckets
        .into_iter()
        .map(|(name, bucket, purpose)| {
            Resource::new(
                name,
                ResourceBody::Bucket(Bucket {
                    bucket: bucket.clone(),
                    purpose,
                    force_destroy: storage.force_destroy,
                    tags: named_tags(config, name),
                }),
            )
        })
        .collect();

    resources.push(Resource::new(
        names::STATE_LOCK,
        ResourceBody::LockTable(LockTable {
            name: config.backend.lock_table.clone(),
            hash_key: LOCK_HASH_KEY.to_string(),
            billing_mode: "PAY_PER_REQUEST".to_string(),
        }),
    ));
    resources
}
