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

/// Whether every char of `s` fits in Latin-1 (code point <= 0xFF).
pub fn is_latin(s: &str) -> bool {
    // ASCII fast path: a pure-ASCII byte slice cannot contain chars > 0xFF.
    if s.is_ascii() {
        return true;
    }
    s.chars().all(|c| (c as u32) <= 0xFF)
}

/// Char count of `s` if it is Latin-1, otherwise -1.
pub fn get_latin1_length(s: &str) -> i32 {
    if s.is_ascii() {
        return s.len() as i32;
    }
    let mut len = 0;
    for c in s.chars() {
        if c as u32 > 0xFF {
            return -1;
        }
        len += 1;
    }
    len
}
