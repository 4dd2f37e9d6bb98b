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

use crate::error::Error;
use anyhow::anyhow;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Reference flags preceding a nullable or ref-tracked element.
///
/// `Ref` is followed by the referent's id as a varuint32. A first occurrence
/// under tracking is written as `NotNullValue` and assigned the next dense id
/// on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum RefFlag {
    Null = 0,
    Ref = 1,
    NotNullValue = 2,
}

/// Wire ids for the built-in value types. Written as a varuint32 class tag by
/// the class resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[allow(non_camel_case_types)]
#[repr(u32)]
pub enum TypeId {
    BOOL = 1,
    INT8 = 2,
    INT16 = 3,
    INT32 = 4,
    INT64 = 6,
    FLOAT32 = 10,
    FLOAT64 = 11,
    STRING = 12,
    LIST = 21,
    SET = 22,
    MAP = 23,
}

impl TryFrom<u8> for RefFlag {
    type Error = Error;

    fn try_from(num: u8) -> Result<Self, Error> {
        match num {
            0 => Ok(RefFlag::Null),
            1 => Ok(RefFlag::Ref),
            2 => Ok(RefFlag::NotNullValue),
            _ => Err(anyhow!("Unsupported reference flag, value:{num}"))?,
        }
    }
}
