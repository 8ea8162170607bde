// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

#[allow(unused_extern_crates)]
extern crate self as capella_provider_resources;

pub mod api;
pub mod datasources;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schema;
