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
use crate::resolver::context::{ReadContext, WriteContext};
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

/// Writes the payload of a value whose runtime type matched this class.
pub type WriteDataFn = fn(&dyn Any, &mut WriteContext<'_>) -> Result<(), Error>;
/// Reads one payload and returns the materialized value.
pub type ReadDataFn = fn(&mut ReadContext<'_, '_>) -> Result<Rc<dyn Any>, Error>;

/// Everything the codec needs to know about one concrete type: its wire id,
/// its payload codec, and its reference/monomorphism policy.
#[derive(Clone)]
pub struct ClassInfo {
    class_id: u32,
    concrete_type_id: std::any::TypeId,
    write_data: WriteDataFn,
    read_data: ReadDataFn,
    /// Types that never participate in reference tracking (immutable value
    /// types such as numbers) set this even when tracking is globally on.
    track_ref_opt_out: bool,
    /// Whether a declared use of this type fully determines the runtime type,
    /// allowing the class tag to be omitted.
    is_final: bool,
}

impl ClassInfo {
    pub fn new<T: 'static>(
        class_id: u32,
        write_data: WriteDataFn,
        read_data: ReadDataFn,
        track_ref_opt_out: bool,
        is_final: bool,
    ) -> ClassInfo {
        ClassInfo {
            class_id,
            concrete_type_id: std::any::TypeId::of::<T>(),
            write_data,
            read_data,
            track_ref_opt_out,
            is_final,
        }
    }

    #[inline(always)]
    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    #[inline(always)]
    pub fn concrete_type_id(&self) -> std::any::TypeId {
        self.concrete_type_id
    }

    #[inline(always)]
    pub fn track_ref_opt_out(&self) -> bool {
        self.track_ref_opt_out
    }

    #[inline(always)]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    #[inline(always)]
    pub fn write_data(&self, value: &dyn Any, context: &mut WriteContext<'_>) -> Result<(), Error> {
        (self.write_data)(value, context)
    }

    #[inline(always)]
    pub fn read_data(&self, context: &mut ReadContext<'_, '_>) -> Result<Rc<dyn Any>, Error> {
        (self.read_data)(context)
    }
}

/// Single-slot class-info cache.
///
/// Passed by mutable reference into lookup calls inside entry loops so that a
/// run of same-typed elements resolves through one pointer compare instead of
/// a hash lookup.
#[derive(Default)]
pub struct ClassInfoHolder {
    slot: Option<Rc<ClassInfo>>,
}

/// Registry mapping concrete Rust types to [`ClassInfo`], in both directions:
/// by `std::any::TypeId` on the write side and by wire class id on the read
/// side. Registrations are immutable once made; lookups are pure memoization.
#[derive(Default)]
pub struct ClassResolver {
    by_type: HashMap<std::any::TypeId, Rc<ClassInfo>>,
    by_id: HashMap<u32, Rc<ClassInfo>>,
}

impl ClassResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static>(
        &mut self,
        class_id: u32,
        write_data: WriteDataFn,
        read_data: ReadDataFn,
        track_ref_opt_out: bool,
        is_final: bool,
    ) -> Result<(), Error> {
        let info = Rc::new(ClassInfo::new::<T>(
            class_id,
            write_data,
            read_data,
            track_ref_opt_out,
            is_final,
        ));
        if self.by_id.insert(class_id, info.clone()).is_some() {
            return Err(Error::type_error(format!(
                "class id {class_id} registered twice"
            )));
        }
        if self.by_type.insert(info.concrete_type_id, info).is_some() {
            return Err(Error::type_error(format!(
                "type {} registered twice",
                std::any::type_name::<T>()
            )));
        }
        Ok(())
    }

    /// Resolve the class info of a concrete runtime type, via the single-slot
    /// `holder` cache.
    pub fn get_class_info(
        &self,
        concrete: std::any::TypeId,
        holder: &mut ClassInfoHolder,
    ) -> Result<Rc<ClassInfo>, Error> {
        if let Some(info) = &holder.slot {
            if info.concrete_type_id == concrete {
                return Ok(info.clone());
            }
        }
        let info = self
            .by_type
            .get(&concrete)
            .cloned()
            .ok_or_else(|| Error::type_error("type not registered"))?;
        holder.slot = Some(info.clone());
        Ok(info)
    }

    pub fn get_by_type(&self, concrete: std::any::TypeId) -> Option<Rc<ClassInfo>> {
        self.by_type.get(&concrete).cloned()
    }

    /// Write the class tag: the class id as a varuint32.
    pub fn write_class(&self, writer: &mut Writer, class_info: &ClassInfo) {
        writer.write_varuint32(class_info.class_id);
    }

    /// Read a class tag and resolve it, via the single-slot `holder` cache.
    pub fn read_class_info(
        &self,
        reader: &mut Reader,
        holder: &mut ClassInfoHolder,
    ) -> Result<Rc<ClassInfo>, Error> {
        let class_id = reader.read_varuint32()?;
        if let Some(info) = &holder.slot {
            if info.class_id == class_id {
                return Ok(info.clone());
            }
        }
        let info = self
            .by_id
            .get(&class_id)
            .cloned()
            .ok_or_else(|| Error::type_error(format!("unregistered class id {class_id}")))?;
        holder.slot = Some(info.clone());
        Ok(info)
    }

    /// Combine the global tracking policy with the per-type opt-out.
    pub fn need_to_write_ref(&self, track_ref: bool, class_info: &ClassInfo) -> bool {
        track_ref && !class_info.track_ref_opt_out
    }
}
