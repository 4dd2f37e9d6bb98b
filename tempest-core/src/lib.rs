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

//! # Tempest Core
//!
//! Core of the Tempest serialization protocol: the chunk-encoded map wire
//! format and the adaptive bit-packed meta-string codec used for type and
//! field identifiers.
//!
//! ## Architecture
//!
//! - **`tempest`**: the `Tempest` facade and public entry points
//! - **`buffer`**: binary `Writer`/`Reader` cursors with varint codecs and
//!   positional back-patching
//! - **`serializer`**: reference-aware element helpers and the map codec
//! - **`resolver`**: class registry, reference tracking, per-call contexts
//! - **`meta`**: adaptive meta-string encoding
//! - **`generics`**: declared-type propagation for container elements
//! - **`types`**: wire constants and type ids
//! - **`error`**: error kinds surfaced by the codec
//!
//! ## Wire format sketch
//!
//! A map is written as a varuint32 entry count followed by chunks. Each chunk
//! carries a back-patched `[chunk_size, header]` prelude; the header byte
//! describes null-ness, reference tracking and type homogeneity of the keys
//! and values in that chunk. When both sides of a map turn out heterogeneous
//! the writer abandons chunking with a `0` sentinel and the remaining entries
//! are written one by one with per-entry type tags.

pub mod buffer;
pub mod config;
pub mod error;
pub mod generics;
pub mod meta;
pub mod resolver;
pub mod serializer;
pub mod tempest;
pub mod types;
