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

//! Chunk-framed map codec.
//!
//! A map is written as a varuint32 entry count followed by chunks of up to
//! 127 entries. Each chunk owns a two-byte `[chunk_size, header]` prelude
//! that is reserved up front and back-patched when the chunk closes. The
//! header bits describe null-ness, reference tracking and type homogeneity
//! per side, which lets a homogeneous chunk write its class tag once instead
//! of per entry. When both sides turn heterogeneous the writer gives up on
//! chunking: it closes the current chunk, emits a `0` sentinel byte and
//! writes the remaining entries through the generic per-entry path.

use crate::ensure;
use crate::error::Error;
use crate::generics::GenericType;
use crate::resolver::class_resolver::{ClassInfo, ClassInfoHolder, ClassResolver};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{
    read_no_null_ref, read_non_ref, read_nullable, read_ref_optimized, read_ref_tagged,
    read_ref_with, write_no_null_ref, write_non_ref, write_nullable, write_ref_optimized,
    write_ref_tagged, write_ref_with, DynAny,
};
use crate::types::RefFlag;
use std::any::Any;
use std::rc::Rc;

const MAX_CHUNK_SIZE: u32 = 127;

pub const TRACKING_KEY_REF: u8 = 0b1;
pub const KEY_HAS_NULL: u8 = 0b10;
pub const KEY_NOT_SAME_TYPE: u8 = 0b100;
pub const TRACKING_VALUE_REF: u8 = 0b1000;
pub const VALUE_HAS_NULL: u8 = 0b10000;
pub const VALUE_NOT_SAME_TYPE: u8 = 0b100000;

/// Insertion-ordered map of dynamically typed entries. Either side of an
/// entry may be null.
#[derive(Default, Clone)]
pub struct DynMap {
    entries: Vec<(Option<DynAny>, Option<DynAny>)>,
}

impl DynMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DynMap {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, key: Option<DynAny>, value: Option<DynAny>) {
        self.entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Option<DynAny>, Option<DynAny>)] {
        &self.entries
    }
}

/// One-shot key/value serializer overrides for a single map write or read.
///
/// Consumed by value so nested map fields cannot inherit them; recursion
/// always starts from `MapCall::default()`.
#[derive(Default)]
pub struct MapCall {
    pub key_serializer: Option<Rc<ClassInfo>>,
    pub value_serializer: Option<Rc<ClassInfo>>,
}

/// How one side (keys or values) of the map is encoded.
enum SideStrategy {
    /// The serializer is fixed for the whole map (user-supplied, or resolved
    /// from a monomorphic declared type); no class tags on the wire.
    Pinned {
        info: Rc<ClassInfo>,
        tracking: bool,
        generic: Option<Rc<GenericType>>,
    },
    /// Runtime types decide; class tags are written under the chunk rules.
    Dynamic {
        tracking: bool,
        generic: Option<Rc<GenericType>>,
    },
}

impl SideStrategy {
    fn is_dynamic(&self) -> bool {
        matches!(self, SideStrategy::Dynamic { .. })
    }

    fn tracking(&self) -> bool {
        match self {
            SideStrategy::Pinned { tracking, .. } => *tracking,
            SideStrategy::Dynamic { tracking, .. } => *tracking,
        }
    }

    fn generic(&self) -> Option<&Rc<GenericType>> {
        match self {
            SideStrategy::Pinned { generic, .. } => generic.as_ref(),
            SideStrategy::Dynamic { generic, .. } => generic.as_ref(),
        }
    }
}

fn side_strategy(
    class_resolver: &ClassResolver,
    track_ref: bool,
    supplied: Option<Rc<ClassInfo>>,
    generic: Option<Rc<GenericType>>,
) -> Result<SideStrategy, Error> {
    if let Some(info) = supplied {
        let tracking = class_resolver.need_to_write_ref(track_ref, &info);
        return Ok(SideStrategy::Pinned {
            info,
            tracking,
            generic: None,
        });
    }
    match generic {
        Some(g) if g.is_monomorphic() => {
            let info = g.class_info(class_resolver)?;
            let tracking = class_resolver.need_to_write_ref(track_ref, &info);
            Ok(SideStrategy::Pinned {
                info,
                tracking,
                generic: Some(g),
            })
        }
        Some(g) => {
            let tracking = match g.concrete() {
                Some(type_id) => class_resolver
                    .get_by_type(type_id)
                    .map(|info| class_resolver.need_to_write_ref(track_ref, &info))
                    .unwrap_or(track_ref),
                None => track_ref,
            };
            Ok(SideStrategy::Dynamic {
                tracking,
                generic: Some(g),
            })
        }
        None => Ok(SideStrategy::Dynamic {
            tracking: track_ref,
            generic: None,
        }),
    }
}

// Specialization on (key, value): user-supplied serializers win, then the
// declared generic's monomorphic sides, then the fully dynamic path.
fn resolve_strategies(
    class_resolver: &ClassResolver,
    track_ref: bool,
    next_generic: Option<Rc<GenericType>>,
    call: MapCall,
) -> Result<(SideStrategy, SideStrategy), Error> {
    let MapCall {
        key_serializer,
        value_serializer,
    } = call;
    let (key_generic, value_generic) = match next_generic {
        Some(generic) => {
            let (k, v) = generic.kv_pair();
            (Some(k), Some(v))
        }
        None => (None, None),
    };
    let key = side_strategy(class_resolver, track_ref, key_serializer, key_generic)?;
    let value = side_strategy(class_resolver, track_ref, value_serializer, value_generic)?;
    Ok((key, value))
}

/// Per-chunk dynamic-side state: the first class seen, whether its tag went
/// out, the cached serializer, and the sticky heterogeneity mark.
#[derive(Default)]
struct SideState {
    class0: Option<std::any::TypeId>,
    wrote_class_info: bool,
    cached: Option<Rc<ClassInfo>>,
    not_same_type: bool,
}

impl SideState {
    fn reset_chunk(&mut self, current: Option<&DynAny>) {
        self.class0 = current.map(|o| (**o).type_id());
        self.wrote_class_info = false;
        self.cached = None;
    }

    /// Track the runtime class of this entry; returns true on the entry that
    /// first makes the side heterogeneous. Once set, `not_same_type` is never
    /// cleared for the rest of the map.
    fn observe(&mut self, current: Option<&DynAny>) -> bool {
        if self.not_same_type {
            return false;
        }
        if let Some(obj) = current {
            let class = (**obj).type_id();
            match self.class0 {
                None => self.class0 = Some(class),
                Some(class0) => {
                    if class0 != class {
                        self.not_same_type = true;
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Write `map` as `varuint32(size)` followed by chunked entries.
pub fn write_map(context: &mut WriteContext, map: &DynMap, call: MapCall) -> Result<(), Error> {
    context.writer.write_varuint32(map.len() as u32);
    if map.is_empty() {
        return Ok(());
    }
    let next_generic = context.generics.next_generic_type();
    let (key_strategy, value_strategy) = resolve_strategies(
        context.get_class_resolver(),
        context.track_ref(),
        next_generic,
        call,
    )?;
    chunk_write(context, map, &key_strategy, &value_strategy)
}

/// Read a map written by [`write_map`] with the same strategies.
pub fn read_map(context: &mut ReadContext, call: MapCall) -> Result<DynMap, Error> {
    let size = context.reader.read_varuint32()?;
    let mut map = DynMap::with_capacity(size as usize);
    if size == 0 {
        return Ok(map);
    }
    let next_generic = context.generics.next_generic_type();
    let (key_strategy, value_strategy) = resolve_strategies(
        context.get_class_resolver(),
        context.track_ref(),
        next_generic,
        call,
    )?;
    chunk_read(context, &mut map, size, &key_strategy, &value_strategy)?;
    Ok(map)
}

// Payload codecs registered for nested map values.

pub(crate) fn write_map_data(value: &dyn Any, context: &mut WriteContext) -> Result<(), Error> {
    let map = value
        .downcast_ref::<DynMap>()
        .ok_or_else(|| Error::type_error("value is not a map"))?;
    write_map(context, map, MapCall::default())
}

pub(crate) fn read_map_data(context: &mut ReadContext) -> Result<Rc<dyn Any>, Error> {
    context.inc_depth()?;
    let map = read_map(context, MapCall::default())?;
    context.dec_depth();
    Ok(Rc::new(map))
}

fn write_chunk_prelude(context: &mut WriteContext, chunk_size: u32, header: u8, start_offset: usize) {
    if chunk_size > 0 {
        context
            .writer
            .set_bytes(start_offset, &[chunk_size as u8, header]);
    }
}

fn chunk_write(
    context: &mut WriteContext,
    map: &DynMap,
    key_strategy: &SideStrategy,
    value_strategy: &SideStrategy,
) -> Result<(), Error> {
    let mut header: u8 = 0;
    let mut chunk_size: u32 = 0;
    let mut start_offset: usize = 0;
    let mut has_preserved_byte = false;
    let mut prev_key_is_null = false;
    let mut mark_chunk_write_finish = false;
    let mut key_state = SideState::default();
    let mut value_state = SideState::default();
    let mut key_holder = ClassInfoHolder::default();
    let mut value_holder = ClassInfoHolder::default();
    for entry in map.entries() {
        let key = entry.0.as_ref();
        let value = entry.1.as_ref();
        if !mark_chunk_write_finish {
            let mut need_reset = false;
            let mut need_mark_finish = false;
            if key.is_none() {
                prev_key_is_null = true;
                if chunk_size > 0 {
                    need_reset = true;
                }
            }
            if key_strategy.is_dynamic() && key_state.observe(key) {
                if value_state.not_same_type {
                    need_mark_finish = true;
                } else {
                    need_reset = true;
                }
            }
            if value_strategy.is_dynamic() && value_state.observe(value) {
                if key_state.not_same_type {
                    need_mark_finish = true;
                } else {
                    need_reset = true;
                }
            }
            if need_mark_finish {
                write_chunk_prelude(context, chunk_size, header, start_offset);
                // chunk size 0: the rest of the map is unchunked
                context.writer.write_u8(0);
                mark_chunk_write_finish = true;
                chunk_size = 0;
            } else if (key.is_none() && chunk_size > 0)
                || (prev_key_is_null && key.is_some())
                || (value.is_none() && chunk_size > 0 && (header & VALUE_HAS_NULL) == 0)
                || need_reset
                || chunk_size >= MAX_CHUNK_SIZE
            {
                write_chunk_prelude(context, chunk_size, header, start_offset);
                header = 0;
                chunk_size = 0;
                has_preserved_byte = false;
                prev_key_is_null = key.is_none();
                key_state.reset_chunk(key);
                value_state.reset_chunk(value);
            }
        }
        if mark_chunk_write_finish {
            write_generic_side(context, key, key_strategy, &mut key_holder)?;
            write_generic_side(context, value, value_strategy, &mut value_holder)?;
        } else {
            if !has_preserved_byte {
                start_offset = context.writer.reserve(2);
                has_preserved_byte = true;
            }
            if key_strategy.tracking() {
                header |= TRACKING_KEY_REF;
            }
            if key.is_none() {
                header |= KEY_HAS_NULL;
            }
            if value_strategy.tracking() {
                header |= TRACKING_VALUE_REF;
            }
            if value.is_none() {
                header |= VALUE_HAS_NULL;
            }
            if key_state.not_same_type {
                header |= KEY_NOT_SAME_TYPE;
            }
            if value_state.not_same_type {
                header |= VALUE_NOT_SAME_TYPE;
            }
            write_key(context, key, key_strategy, &mut key_state, &mut key_holder)?;
            write_value(
                context,
                value,
                value_strategy,
                &mut value_state,
                &mut value_holder,
                header,
            )?;
            chunk_size += 1;
        }
    }
    write_chunk_prelude(context, chunk_size, header, start_offset);
    Ok(())
}

fn write_generic_side(
    context: &mut WriteContext,
    obj: Option<&DynAny>,
    strategy: &SideStrategy,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    if let Some(generic) = strategy.generic() {
        context.generics.push_generic_type(generic.clone());
    }
    let result = write_ref_optimized(context, obj, strategy.tracking(), holder);
    if strategy.generic().is_some() {
        context.generics.pop_generic_type();
    }
    result
}

fn write_key(
    context: &mut WriteContext,
    key: Option<&DynAny>,
    strategy: &SideStrategy,
    state: &mut SideState,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    if let Some(generic) = strategy.generic() {
        context.generics.push_generic_type(generic.clone());
    }
    let result = write_key_inner(context, key, strategy, state, holder);
    if strategy.generic().is_some() {
        context.generics.pop_generic_type();
    }
    result
}

fn write_key_inner(
    context: &mut WriteContext,
    key: Option<&DynAny>,
    strategy: &SideStrategy,
    state: &mut SideState,
    holder: &mut ClassInfoHolder,
) -> Result<(), Error> {
    match strategy {
        SideStrategy::Pinned { info, tracking, .. } => {
            if *tracking {
                write_ref_with(context, key, info)
            } else {
                // at most one null key per chunk, flagged in the header
                match key {
                    None => {
                        context.writer.write_u8(RefFlag::Null as u8);
                        Ok(())
                    }
                    Some(k) => info.write_data(&**k, context),
                }
            }
        }
        SideStrategy::Dynamic { tracking, .. } => {
            let Some(k) = key else {
                context.writer.write_u8(RefFlag::Null as u8);
                return Ok(());
            };
            if !state.not_same_type {
                let class_info = context.get_class_info((**k).type_id(), holder)?;
                if !state.wrote_class_info {
                    context.write_class(&class_info);
                    state.wrote_class_info = true;
                }
                let ser = state.cached.get_or_insert_with(|| class_info).clone();
                if *tracking {
                    write_no_null_ref(context, k, &ser)
                } else {
                    ser.write_data(&**k, context)
                }
            } else if *tracking {
                write_ref_tagged(context, Some(k), holder)
            } else {
                write_non_ref(context, k, holder)
            }
        }
    }
}

fn write_value(
    context: &mut WriteContext,
    value: Option<&DynAny>,
    strategy: &SideStrategy,
    state: &mut SideState,
    holder: &mut ClassInfoHolder,
    header: u8,
) -> Result<(), Error> {
    if let Some(generic) = strategy.generic() {
        context.generics.push_generic_type(generic.clone());
    }
    let result = write_value_inner(context, value, strategy, state, holder, header);
    if strategy.generic().is_some() {
        context.generics.pop_generic_type();
    }
    result
}

fn write_value_inner(
    context: &mut WriteContext,
    value: Option<&DynAny>,
    strategy: &SideStrategy,
    state: &mut SideState,
    holder: &mut ClassInfoHolder,
    header: u8,
) -> Result<(), Error> {
    let value_has_null = (header & VALUE_HAS_NULL) != 0;
    match strategy {
        SideStrategy::Pinned { info, tracking, .. } => {
            if *tracking {
                write_ref_with(context, value, info)
            } else {
                match value {
                    None => {
                        context.writer.write_u8(RefFlag::Null as u8);
                        Ok(())
                    }
                    Some(v) => {
                        if value_has_null {
                            context.writer.write_u8(RefFlag::NotNullValue as u8);
                        }
                        info.write_data(&**v, context)
                    }
                }
            }
        }
        SideStrategy::Dynamic { tracking, .. } => {
            let Some(v) = value else {
                context.writer.write_u8(RefFlag::Null as u8);
                return Ok(());
            };
            if state.not_same_type {
                return if *tracking {
                    write_ref_tagged(context, Some(v), holder)
                } else {
                    write_nullable(context, Some(v), holder)
                };
            }
            if value_has_null {
                // flag first so null stays distinguishable; the class tag
                // rides with the first materialized payload
                let class_info = context.get_class_info((**v).type_id(), holder)?;
                let ser = state.cached.get_or_insert_with(|| class_info).clone();
                if *tracking && context.need_to_write_ref(&ser) {
                    if !context
                        .ref_writer
                        .write_ref_or_null(&mut context.writer, Some(v))
                    {
                        if !state.wrote_class_info {
                            context.write_class(&ser);
                            state.wrote_class_info = true;
                        }
                        ser.write_data(&**v, context)?;
                    }
                } else {
                    context.writer.write_u8(RefFlag::NotNullValue as u8);
                    if !state.wrote_class_info {
                        context.write_class(&ser);
                        state.wrote_class_info = true;
                    }
                    ser.write_data(&**v, context)?;
                }
                Ok(())
            } else {
                let class_info = context.get_class_info((**v).type_id(), holder)?;
                if !state.wrote_class_info {
                    context.write_class(&class_info);
                    state.wrote_class_info = true;
                }
                let ser = state.cached.get_or_insert_with(|| class_info).clone();
                if *tracking {
                    write_no_null_ref(context, v, &ser)
                } else {
                    ser.write_data(&**v, context)
                }
            }
        }
    }
}

fn chunk_read(
    context: &mut ReadContext,
    map: &mut DynMap,
    mut size: u32,
    key_strategy: &SideStrategy,
    value_strategy: &SideStrategy,
) -> Result<(), Error> {
    let mut key_holder = ClassInfoHolder::default();
    let mut value_holder = ClassInfoHolder::default();
    while size > 0 {
        let chunk_size = context.reader.read_u8()?;
        ensure!(
            chunk_size < 0x80,
            Error::protocol_mismatch(
                "chunkSize < 0, which means serialization protocol is not same with deserialization protocol"
            )
        );
        if chunk_size == 0 {
            // unchunked tail
            while size > 0 {
                let key = read_generic_side(context, key_strategy, &mut key_holder)?;
                let value = read_generic_side(context, value_strategy, &mut value_holder)?;
                map.insert(key, value);
                size -= 1;
            }
        } else {
            let header = context.reader.read_u8()?;
            ensure!(
                chunk_size as u32 <= size,
                Error::protocol_mismatch("chunk overruns the declared map size")
            );
            let mut key_cached: Option<Rc<ClassInfo>> = None;
            let mut value_cached: Option<Rc<ClassInfo>> = None;
            for _ in 0..chunk_size {
                let key = read_key(
                    context,
                    header,
                    key_strategy,
                    &mut key_cached,
                    &mut key_holder,
                )?;
                let value = read_value(
                    context,
                    header,
                    value_strategy,
                    &mut value_cached,
                    &mut value_holder,
                )?;
                map.insert(key, value);
                size -= 1;
            }
        }
    }
    Ok(())
}

fn read_generic_side(
    context: &mut ReadContext,
    strategy: &SideStrategy,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    if let Some(generic) = strategy.generic() {
        context.generics.push_generic_type(generic.clone());
    }
    let result = read_ref_optimized(context, strategy.tracking(), holder);
    if strategy.generic().is_some() {
        context.generics.pop_generic_type();
    }
    result
}

fn read_cached_class_info(
    context: &mut ReadContext,
    cached: &mut Option<Rc<ClassInfo>>,
    holder: &mut ClassInfoHolder,
) -> Result<Rc<ClassInfo>, Error> {
    match cached {
        Some(info) => Ok(info.clone()),
        None => {
            let info = context.read_class_info(holder)?;
            *cached = Some(info.clone());
            Ok(info)
        }
    }
}

fn read_key(
    context: &mut ReadContext,
    header: u8,
    strategy: &SideStrategy,
    cached: &mut Option<Rc<ClassInfo>>,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    if let Some(generic) = strategy.generic() {
        context.generics.push_generic_type(generic.clone());
    }
    let result = read_key_inner(context, header, strategy, cached, holder);
    if strategy.generic().is_some() {
        context.generics.pop_generic_type();
    }
    result
}

fn read_key_inner(
    context: &mut ReadContext,
    header: u8,
    strategy: &SideStrategy,
    cached: &mut Option<Rc<ClassInfo>>,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    match strategy {
        SideStrategy::Pinned { info, tracking, .. } => {
            if *tracking {
                read_ref_with(context, info)
            } else if (header & KEY_HAS_NULL) != 0 {
                expect_null_flag(context)
            } else {
                Ok(Some(info.read_data(context)?))
            }
        }
        SideStrategy::Dynamic { tracking, .. } => {
            if (header & KEY_HAS_NULL) != 0 {
                expect_null_flag(context)
            } else if (header & KEY_NOT_SAME_TYPE) == 0 {
                let ser = read_cached_class_info(context, cached, holder)?;
                if *tracking {
                    Ok(Some(read_no_null_ref(context, &ser)?))
                } else {
                    Ok(Some(ser.read_data(context)?))
                }
            } else if *tracking {
                read_ref_tagged(context, holder)
            } else {
                Ok(Some(read_non_ref(context, holder)?))
            }
        }
    }
}

fn expect_null_flag(context: &mut ReadContext) -> Result<Option<DynAny>, Error> {
    let flag = context.reader.read_u8()?;
    ensure!(
        flag == RefFlag::Null as u8,
        Error::protocol_mismatch(format!("expected null flag, got {flag}"))
    );
    Ok(None)
}

fn read_value(
    context: &mut ReadContext,
    header: u8,
    strategy: &SideStrategy,
    cached: &mut Option<Rc<ClassInfo>>,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    if let Some(generic) = strategy.generic() {
        context.generics.push_generic_type(generic.clone());
    }
    let result = read_value_inner(context, header, strategy, cached, holder);
    if strategy.generic().is_some() {
        context.generics.pop_generic_type();
    }
    result
}

fn read_value_inner(
    context: &mut ReadContext,
    header: u8,
    strategy: &SideStrategy,
    cached: &mut Option<Rc<ClassInfo>>,
    holder: &mut ClassInfoHolder,
) -> Result<Option<DynAny>, Error> {
    let value_has_null = (header & VALUE_HAS_NULL) != 0;
    match strategy {
        SideStrategy::Pinned { info, tracking, .. } => {
            if *tracking {
                read_ref_with(context, info)
            } else if value_has_null {
                let flag = context.reader.read_u8()?;
                if flag == RefFlag::NotNullValue as u8 {
                    Ok(Some(info.read_data(context)?))
                } else if flag == RefFlag::Null as u8 {
                    Ok(None)
                } else {
                    Err(Error::protocol_mismatch(format!(
                        "unexpected value flag byte {flag}"
                    )))
                }
            } else {
                Ok(Some(info.read_data(context)?))
            }
        }
        SideStrategy::Dynamic { tracking, .. } => {
            if (header & VALUE_NOT_SAME_TYPE) != 0 {
                return if *tracking {
                    read_ref_tagged(context, holder)
                } else {
                    read_nullable(context, holder)
                };
            }
            if value_has_null {
                let flag = context.reader.read_u8()?;
                if flag == RefFlag::Null as u8 {
                    Ok(None)
                } else if flag == RefFlag::Ref as u8 {
                    let ref_id = context.reader.read_varuint32()?;
                    let obj = context.ref_reader.get_read_object(ref_id).ok_or_else(|| {
                        Error::invalid_ref(format!("reference {ref_id} not found"))
                    })?;
                    Ok(Some(obj))
                } else if flag == RefFlag::NotNullValue as u8 {
                    let ser = read_cached_class_info(context, cached, holder)?;
                    if *tracking && context.need_to_write_ref(&ser) {
                        let ref_id = context.ref_reader.reserve_ref_id();
                        let obj = ser.read_data(context)?;
                        context.ref_reader.set_read_object(ref_id, obj.clone());
                        Ok(Some(obj))
                    } else {
                        Ok(Some(ser.read_data(context)?))
                    }
                } else {
                    Err(Error::protocol_mismatch(format!(
                        "unexpected value flag byte {flag}"
                    )))
                }
            } else {
                let ser = read_cached_class_info(context, cached, holder)?;
                if *tracking {
                    Ok(Some(read_no_null_ref(context, &ser)?))
                } else {
                    Ok(Some(ser.read_data(context)?))
                }
            }
        }
    }
}
