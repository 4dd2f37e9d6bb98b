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

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::types::RefFlag;
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

/// Reference writer for tracking shared objects during one serialization
/// call.
///
/// Maps object pointer addresses to dense reference ids so that the same
/// instance is written once; subsequent occurrences emit `Ref` plus the id.
///
/// # Examples
///
/// ```rust
/// use tempest_core::buffer::Writer;
/// use tempest_core::resolver::ref_resolver::RefWriter;
/// use std::any::Any;
/// use std::rc::Rc;
///
/// let mut ref_writer = RefWriter::new();
/// let mut writer = Writer::default();
/// let rc: Rc<dyn Any> = Rc::new(42);
///
/// // First encounter: flag written, caller must write the payload.
/// assert!(!ref_writer.write_ref_or_null(&mut writer, Some(&rc)));
/// // Second encounter: a back reference was written instead.
/// assert!(ref_writer.write_ref_or_null(&mut writer, Some(&rc)));
/// ```
#[derive(Default)]
pub struct RefWriter {
    /// Maps pointer addresses to reference ids.
    refs: HashMap<usize, u32>,
    next_ref_id: u32,
}

impl RefWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `Null` and return true when `obj` is none; otherwise write
    /// nothing and return false.
    #[inline]
    pub fn write_null_flag(&mut self, writer: &mut Writer, obj: Option<&Rc<dyn Any>>) -> bool {
        if obj.is_none() {
            writer.write_u8(RefFlag::Null as u8);
            return true;
        }
        false
    }

    /// Write the reference flag for `obj`.
    ///
    /// Returns true when the flag fully encodes the object (`Null`, or `Ref`
    /// plus id for an already-seen instance). Returns false after writing
    /// `NotNullValue` for a first occurrence; the caller then writes the
    /// payload. First occurrences are assigned the next dense id.
    #[inline]
    pub fn write_ref_or_null(&mut self, writer: &mut Writer, obj: Option<&Rc<dyn Any>>) -> bool {
        let Some(rc) = obj else {
            writer.write_u8(RefFlag::Null as u8);
            return true;
        };
        let ptr_addr = Rc::as_ptr(rc) as *const () as usize;
        if let Some(&ref_id) = self.refs.get(&ptr_addr) {
            writer.write_u8(RefFlag::Ref as u8);
            writer.write_varuint32(ref_id);
            true
        } else {
            let ref_id = self.next_ref_id;
            self.next_ref_id += 1;
            self.refs.insert(ptr_addr, ref_id);
            writer.write_u8(RefFlag::NotNullValue as u8);
            false
        }
    }

    /// Clear all stored references for reuse across serialization calls.
    #[inline(always)]
    pub fn reset(&mut self) {
        self.refs.clear();
        self.next_ref_id = 0;
    }
}

/// Outcome of reading a reference flag.
pub enum RefRead {
    /// The element is null.
    Null,
    /// A back reference to an already materialized object.
    Existing(Rc<dyn Any>),
    /// First occurrence; the caller reads the payload and must bind it to the
    /// reserved id via [`RefReader::set_read_object`].
    Fresh(u32),
}

/// Reference reader resolving back references during one deserialization
/// call. Objects are stored in read order, indexed by the same dense ids the
/// writer assigned.
#[derive(Default)]
pub struct RefReader {
    refs: Vec<Option<Rc<dyn Any>>>,
}

impl RefReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the next reference flag.
    ///
    /// `NotNullValue` reserves the next id slot so that nested reads keep ids
    /// aligned with the write side.
    #[inline]
    pub fn try_preserve_ref_id(&mut self, reader: &mut Reader) -> Result<RefRead, Error> {
        let flag = RefFlag::try_from(reader.read_u8()?)
            .map_err(|_| Error::protocol_mismatch("unexpected reference flag byte"))?;
        match flag {
            RefFlag::Null => Ok(RefRead::Null),
            RefFlag::Ref => {
                let ref_id = reader.read_varuint32()?;
                let obj = self
                    .refs
                    .get(ref_id as usize)
                    .cloned()
                    .flatten()
                    .ok_or_else(|| {
                        Error::invalid_ref(format!("reference {ref_id} not found"))
                    })?;
                Ok(RefRead::Existing(obj))
            }
            RefFlag::NotNullValue => {
                let ref_id = self.refs.len() as u32;
                self.refs.push(None);
                Ok(RefRead::Fresh(ref_id))
            }
        }
    }

    /// Reserve the next id slot without reading a flag, for call sites that
    /// have already consumed the `NotNullValue` byte themselves.
    #[inline(always)]
    pub fn reserve_ref_id(&mut self) -> u32 {
        let ref_id = self.refs.len() as u32;
        self.refs.push(None);
        ref_id
    }

    /// Bind a freshly read object to the id reserved by
    /// [`RefReader::try_preserve_ref_id`].
    #[inline(always)]
    pub fn set_read_object(&mut self, ref_id: u32, obj: Rc<dyn Any>) {
        self.refs[ref_id as usize] = Some(obj);
    }

    #[inline(always)]
    pub fn get_read_object(&self, ref_id: u32) -> Option<Rc<dyn Any>> {
        self.refs.get(ref_id as usize).cloned().flatten()
    }

    /// Clear all stored references for reuse across deserialization calls.
    #[inline(always)]
    pub fn reset(&mut self) {
        self.refs.clear();
    }
}
