// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

pub const APP_NAME: &str = "terraform-provider-couchbase-capella";
pub const ENV_PREFIX: &str = "CAPELLA";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

pub const DEFAULT_HOST: &str = "https://cloudapi.cloud.couchbase.com";
pub const DEFAULT_PROVIDER_TYPE_NAME: &str = "couchbase-capella";
