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

//! Payload codecs for the built-in value types.
//!
//! These functions are registered as the `write_data`/`read_data` pair of a
//! [`ClassInfo`](crate::resolver::class_resolver::ClassInfo); reference flags
//! and class tags are the caller's concern.

use crate::error::Error;
use crate::meta::get_latin1_length;
use crate::resolver::class_resolver::ClassResolver;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::map::{read_map_data, write_map_data, DynMap};
use crate::types::TypeId;
use std::any::Any;
use std::rc::Rc;

enum StrEncoding {
    Latin1 = 0,
    Utf8 = 2,
}

macro_rules! impl_basic_codec {
    ($ty:ty, $write_fn:ident, $read_fn:ident, $write:expr, $read:expr) => {
        pub(crate) fn $write_fn(value: &dyn Any, context: &mut WriteContext) -> Result<(), Error> {
            let value = value.downcast_ref::<$ty>().ok_or_else(|| {
                Error::type_error(concat!("value is not a ", stringify!($ty)))
            })?;
            #[allow(clippy::redundant_closure_call)]
            $write(&mut context.writer, *value);
            Ok(())
        }

        pub(crate) fn $read_fn(context: &mut ReadContext) -> Result<Rc<dyn Any>, Error> {
            #[allow(clippy::redundant_closure_call)]
            let value: $ty = $read(&mut context.reader)?;
            Ok(Rc::new(value))
        }
    };
}

impl_basic_codec!(
    bool,
    write_bool,
    read_bool,
    |w: &mut crate::buffer::Writer, v: bool| w.write_u8(v as u8),
    |r: &mut crate::buffer::Reader| -> Result<bool, Error> { Ok(r.read_u8()? != 0) }
);
impl_basic_codec!(
    i8,
    write_i8,
    read_i8,
    |w: &mut crate::buffer::Writer, v: i8| w.write_i8(v),
    |r: &mut crate::buffer::Reader| -> Result<i8, Error> { r.read_i8() }
);
impl_basic_codec!(
    i16,
    write_i16,
    read_i16,
    |w: &mut crate::buffer::Writer, v: i16| w.write_i16(v),
    |r: &mut crate::buffer::Reader| -> Result<i16, Error> { r.read_i16() }
);
impl_basic_codec!(
    i32,
    write_i32,
    read_i32,
    |w: &mut crate::buffer::Writer, v: i32| w.write_varint32(v),
    |r: &mut crate::buffer::Reader| -> Result<i32, Error> { r.read_varint32() }
);
impl_basic_codec!(
    i64,
    write_i64,
    read_i64,
    |w: &mut crate::buffer::Writer, v: i64| w.write_varint64(v),
    |r: &mut crate::buffer::Reader| -> Result<i64, Error> { r.read_varint64() }
);
impl_basic_codec!(
    f32,
    write_f32,
    read_f32,
    |w: &mut crate::buffer::Writer, v: f32| w.write_f32(v),
    |r: &mut crate::buffer::Reader| -> Result<f32, Error> { r.read_f32() }
);
impl_basic_codec!(
    f64,
    write_f64,
    read_f64,
    |w: &mut crate::buffer::Writer, v: f64| w.write_f64(v),
    |r: &mut crate::buffer::Reader| -> Result<f64, Error> { r.read_f64() }
);

// Strings carry `varuint36((len << 2) | coder)`: Latin-1 when every char fits
// one byte, UTF-8 otherwise.
pub(crate) fn write_string(value: &dyn Any, context: &mut WriteContext) -> Result<(), Error> {
    let s = value
        .downcast_ref::<String>()
        .ok_or_else(|| Error::type_error("value is not a String"))?;
    let latin1_len = get_latin1_length(s);
    if latin1_len >= 0 {
        let bitor = ((latin1_len as u64) << 2) | StrEncoding::Latin1 as u64;
        context.writer.write_varuint36_small(bitor);
        context.writer.write_latin1_string(s);
    } else {
        let bitor = ((s.len() as u64) << 2) | StrEncoding::Utf8 as u64;
        context.writer.write_varuint36_small(bitor);
        context.writer.write_utf8_string(s);
    }
    Ok(())
}

pub(crate) fn read_string(context: &mut ReadContext) -> Result<Rc<dyn Any>, Error> {
    let bitor = context.reader.read_varuint36small()?;
    let len = (bitor >> 2) as usize;
    let s = match bitor & 0b11 {
        0 => context.reader.read_latin1_string(len)?,
        2 => context.reader.read_utf8_string(len)?,
        coder => {
            return Err(Error::encoding_error(format!(
                "wrong string coder value: {coder}"
            )))
        }
    };
    Ok(Rc::new(s))
}

/// Register the built-in value types. Numbers and bool are immutable value
/// types and opt out of reference tracking; all built-ins are final.
pub fn register_defaults(class_resolver: &mut ClassResolver) -> Result<(), Error> {
    class_resolver.register::<bool>(TypeId::BOOL as u32, write_bool, read_bool, true, true)?;
    class_resolver.register::<i8>(TypeId::INT8 as u32, write_i8, read_i8, true, true)?;
    class_resolver.register::<i16>(TypeId::INT16 as u32, write_i16, read_i16, true, true)?;
    class_resolver.register::<i32>(TypeId::INT32 as u32, write_i32, read_i32, true, true)?;
    class_resolver.register::<i64>(TypeId::INT64 as u32, write_i64, read_i64, true, true)?;
    class_resolver.register::<f32>(TypeId::FLOAT32 as u32, write_f32, read_f32, true, true)?;
    class_resolver.register::<f64>(TypeId::FLOAT64 as u32, write_f64, read_f64, true, true)?;
    class_resolver.register::<String>(TypeId::STRING as u32, write_string, read_string, false, true)?;
    class_resolver.register::<DynMap>(TypeId::MAP as u32, write_map_data, read_map_data, false, true)?;
    Ok(())
}
