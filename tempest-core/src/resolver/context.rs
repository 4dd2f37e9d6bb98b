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
use crate::config::Config;
use crate::error::Error;
use crate::generics::Generics;
use crate::resolver::class_resolver::{ClassInfo, ClassInfoHolder, ClassResolver};
use crate::resolver::ref_resolver::{RefReader, RefWriter};
use std::rc::Rc;

/// Per-call mutable state of one serialization: the output buffer, the
/// reference writer and the generics stack. Lives on the stack of the
/// top-level call; nested element writes borrow it.
pub struct WriteContext<'a> {
    pub writer: Writer,
    pub ref_writer: RefWriter,
    pub generics: Generics,
    class_resolver: &'a ClassResolver,
    track_ref: bool,
}

impl<'a> WriteContext<'a> {
    pub fn new(class_resolver: &'a ClassResolver, config: &Config) -> WriteContext<'a> {
        WriteContext {
            writer: Writer::default(),
            ref_writer: RefWriter::new(),
            generics: Generics::new(),
            class_resolver,
            track_ref: config.track_ref,
        }
    }

    #[inline(always)]
    pub fn get_class_resolver(&self) -> &ClassResolver {
        self.class_resolver
    }

    #[inline(always)]
    pub fn track_ref(&self) -> bool {
        self.track_ref
    }

    #[inline(always)]
    pub fn get_class_info(
        &self,
        concrete: std::any::TypeId,
        holder: &mut ClassInfoHolder,
    ) -> Result<Rc<ClassInfo>, Error> {
        self.class_resolver.get_class_info(concrete, holder)
    }

    #[inline(always)]
    pub fn write_class(&mut self, class_info: &ClassInfo) {
        self.class_resolver.write_class(&mut self.writer, class_info);
    }

    /// Effective tracking for one concrete class.
    #[inline(always)]
    pub fn need_to_write_ref(&self, class_info: &ClassInfo) -> bool {
        self.class_resolver.need_to_write_ref(self.track_ref, class_info)
    }

    /// Effective tracking for a declared type; `None` (the dynamic object
    /// type) falls back to the global policy.
    pub fn need_to_write_ref_type(&self, concrete: Option<std::any::TypeId>) -> bool {
        match concrete {
            Some(type_id) => match self.class_resolver.get_by_type(type_id) {
                Some(info) => self.need_to_write_ref(&info),
                None => self.track_ref,
            },
            None => self.track_ref,
        }
    }
}

/// Per-call mutable state of one deserialization, mirroring [`WriteContext`],
/// plus a depth guard for nested dynamic reads.
pub struct ReadContext<'a, 'de> {
    pub reader: Reader<'de>,
    pub ref_reader: RefReader,
    pub generics: Generics,
    class_resolver: &'a ClassResolver,
    track_ref: bool,
    max_dyn_depth: u32,
    current_depth: u32,
}

impl<'a, 'de> ReadContext<'a, 'de> {
    pub fn new(
        bytes: &'de [u8],
        class_resolver: &'a ClassResolver,
        config: &Config,
    ) -> ReadContext<'a, 'de> {
        ReadContext {
            reader: Reader::new(bytes),
            ref_reader: RefReader::new(),
            generics: Generics::new(),
            class_resolver,
            track_ref: config.track_ref,
            max_dyn_depth: config.max_dyn_depth,
            current_depth: 0,
        }
    }

    #[inline(always)]
    pub fn get_class_resolver(&self) -> &ClassResolver {
        self.class_resolver
    }

    #[inline(always)]
    pub fn track_ref(&self) -> bool {
        self.track_ref
    }

    #[inline(always)]
    pub fn read_class_info(
        &mut self,
        holder: &mut ClassInfoHolder,
    ) -> Result<Rc<ClassInfo>, Error> {
        self.class_resolver.read_class_info(&mut self.reader, holder)
    }

    #[inline(always)]
    pub fn need_to_write_ref(&self, class_info: &ClassInfo) -> bool {
        self.class_resolver.need_to_write_ref(self.track_ref, class_info)
    }

    /// Effective tracking for a declared type; `None` (the dynamic object
    /// type) falls back to the global policy.
    pub fn need_to_write_ref_type(&self, concrete: Option<std::any::TypeId>) -> bool {
        match concrete {
            Some(type_id) => match self.class_resolver.get_by_type(type_id) {
                Some(info) => self.need_to_write_ref(&info),
                None => self.track_ref,
            },
            None => self.track_ref,
        }
    }

    #[inline(always)]
    pub fn inc_depth(&mut self) -> Result<(), Error> {
        self.current_depth += 1;
        if self.current_depth > self.max_dyn_depth {
            return Err(Error::depth_exceed(format!(
                "maximum dynamic nesting depth ({}) exceeded",
                self.max_dyn_depth
            )));
        }
        Ok(())
    }

    #[inline(always)]
    pub fn dec_depth(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
    }
}
