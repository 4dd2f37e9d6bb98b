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
use crate::resolver::class_resolver::{ClassInfo, ClassInfoHolder};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::ref_resolver::RefRead;
use crate::types::RefFlag;
use std::any::Any;
use std::rc::Rc;

pub mod basic;
pub mod map;

/// A dynamically typed value. Map keys and values are `Option<DynAny>`;
/// `None` is the wire's null.
pub type DynAny = Rc<dyn Any>;

/// Class tag plus payload, no reference flag. Used for non-null elements on a
/// side that is heterogeneous but not reference-tracked.
pub fn write_non_ref(
    context: &mut WriteContext,
    obj: &DynAny,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    let class_info = context.get_class_info((**obj).type_id(), holder)?;
    context.write_class(&class_info);
    class_info.write_data(&**obj, context)
}

pub fn read_non_ref(
    context: &mut ReadContext,
    holder: &mut ClassInfoHolder,
) -> Result<DynAny, Error> {
    context.inc_depth()?;
    let class_info = context.read_class_info(holder)?;
    let obj = class_info.read_data(context)?;
    context.dec_depth();
    Ok(obj)
}

/// `Null`, or `NotNullValue` followed by class tag and payload.
pub fn write_nullable(
    context: &mut WriteContext,
    obj: Option<&DynAny>,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    match obj {
        None => {
            context.writer.write_u8(RefFlag::Null as u8);
            Ok(())
        }
        Some(o) => {
            context.writer.write_u8(RefFlag::NotNullValue as u8);
            write_non_ref(context, o, holder)
        }
    }
}

pub fn read_nullable(
    context: &mut ReadContext,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    let flag = context.reader.read_u8()?;
    if flag == RefFlag::Null as u8 {
        Ok(None)
    } else if flag == RefFlag::NotNullValue as u8 {
        Ok(Some(read_non_ref(context, holder)?))
    } else {
        Err(Error::protocol_mismatch(format!(
            "unexpected nullable flag byte {flag}"
        )))
    }
}

/// Full reference-tracked element with a per-entry class tag:
/// `(NULL | REF id | NOT_NULL_VALUE ClassTag payload)`.
pub fn write_ref_tagged(
    context: &mut WriteContext,
    obj: Option<&DynAny>,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    if !context.ref_writer.write_ref_or_null(&mut context.writer, obj) {
        if let Some(o) = obj {
            write_non_ref(context, o, holder)?;
        }
    }
    Ok(())
}

pub fn read_ref_tagged(
    context: &mut ReadContext,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    match context.ref_reader.try_preserve_ref_id(&mut context.reader)? {
        RefRead::Null => Ok(None),
        RefRead::Existing(obj) => Ok(Some(obj)),
        RefRead::Fresh(ref_id) => {
            let obj = read_non_ref(context, holder)?;
            context.ref_reader.set_read_object(ref_id, obj.clone());
            Ok(Some(obj))
        }
    }
}

/// Reference-tracked element whose serializer is pinned, so no class tag:
/// `(NULL | REF id | NOT_NULL_VALUE payload)`.
pub fn write_ref_with(
    context: &mut WriteContext,
    obj: Option<&DynAny>,
    class_info: &ClassInfo,
) -> Result<(), Error> {
    if !context.ref_writer.write_ref_or_null(&mut context.writer, obj) {
        if let Some(o) = obj {
            class_info.write_data(&**o, context)?;
        }
    }
    Ok(())
}

pub fn read_ref_with(
    context: &mut ReadContext,
    class_info: &ClassInfo,
) -> Result<Option<DynAny>, Error> {
    match context.ref_reader.try_preserve_ref_id(&mut context.reader)? {
        RefRead::Null => Ok(None),
        RefRead::Existing(obj) => Ok(Some(obj)),
        RefRead::Fresh(ref_id) => {
            let obj = class_info.read_data(context)?;
            context.ref_reader.set_read_object(ref_id, obj.clone());
            Ok(Some(obj))
        }
    }
}

/// Non-null element with a known serializer: a bare payload, or a
/// ref-flag-guarded payload when the serializer participates in tracking.
pub fn write_no_null_ref(
    context: &mut WriteContext,
    obj: &DynAny,
    class_info: &ClassInfo,
) -> Result<(), Error> {
    if context.need_to_write_ref(class_info) {
        write_ref_with(context, Some(obj), class_info)
    } else {
        class_info.write_data(&**obj, context)
    }
}

pub fn read_no_null_ref(
    context: &mut ReadContext,
    class_info: &ClassInfo,
) -> Result<DynAny, Error> {
    if context.need_to_write_ref(class_info) {
        match context.ref_reader.try_preserve_ref_id(&mut context.reader)? {
            RefRead::Null => Err(Error::protocol_mismatch(
                "null flag on an element declared non-null",
            )),
            RefRead::Existing(obj) => Ok(obj),
            RefRead::Fresh(ref_id) => {
                let obj = class_info.read_data(context)?;
                context.ref_reader.set_read_object(ref_id, obj.clone());
                Ok(obj)
            }
        }
    } else {
        class_info.read_data(context)
    }
}

/// One side of an unchunked generic entry. With tracking this is
/// `(NULL | REF id | NOT_NULL_VALUE ClassTag payload)`; without it,
/// `(NULL | NOT_NULL_VALUE ClassTag payload)`.
pub fn write_ref_optimized(
    context: &mut WriteContext,
    obj: Option<&DynAny>,
    tracking: bool,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    if tracking {
        if !context.ref_writer.write_null_flag(&mut context.writer, obj) {
            write_ref_tagged(context, obj, holder)?;
        }
        Ok(())
    } else {
        write_nullable(context, obj, holder)
    }
}

pub fn read_ref_optimized(
    context: &mut ReadContext,
    tracking: bool,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    if tracking {
        read_ref_tagged(context, holder)
    } else {
        read_nullable(context, holder)
    }
}
