// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// Configuration for Tempest serialization.
///
/// Shared between the `Tempest` instance and the per-call write/read contexts
/// so both sides of a round trip observe the same policy.
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether reference tracking is enabled. When enabled, shared references
    /// are written once and subsequent occurrences become id references.
    /// Per-type opt-outs still apply on top of this flag.
    pub track_ref: bool,
    /// Maximum depth for nested dynamic reads (e.g. maps inside maps).
    pub max_dyn_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            track_ref: false,
            max_dyn_depth: 5,
        }
    }
}
