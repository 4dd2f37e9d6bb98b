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

use crate::config::Config;
use crate::error::Error;
use crate::generics::GenericType;
use crate::resolver::class_resolver::ClassResolver;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::basic::register_defaults;
use crate::serializer::map::{read_map, write_map, DynMap, MapCall};
use crate::types::TypeId;
use std::rc::Rc;

/// The Tempest serialization instance.
///
/// Owns the configuration and the class registry; every serialize or
/// deserialize call gets a fresh context on the stack, so an instance can be
/// reused across calls.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use tempest_core::serializer::map::DynMap;
/// use tempest_core::tempest::Tempest;
///
/// let tempest = Tempest::default();
/// let mut map = DynMap::new();
/// map.insert(Some(Rc::new("a".to_string())), Some(Rc::new(1i32)));
/// let bytes = tempest.serialize_map(&map).unwrap();
/// let decoded = tempest.deserialize_map(&bytes).unwrap();
/// assert_eq!(decoded.len(), 1);
/// ```
pub struct Tempest {
    config: Config,
    class_resolver: ClassResolver,
}

impl Default for Tempest {
    fn default() -> Self {
        let mut class_resolver = ClassResolver::new();
        register_defaults(&mut class_resolver).expect("register built-in types");
        Tempest {
            config: Config::default(),
            class_resolver,
        }
    }
}

impl Tempest {
    /// Enable or disable reference tracking for shared objects.
    pub fn track_ref(mut self, track_ref: bool) -> Self {
        self.config.track_ref = track_ref;
        self
    }

    /// Limit nesting of dynamic reads.
    pub fn max_dyn_depth(mut self, max_dyn_depth: u32) -> Self {
        self.config.max_dyn_depth = max_dyn_depth;
        self
    }

    pub fn get_class_resolver(&self) -> &ClassResolver {
        &self.class_resolver
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    /// Serialize a map with no declared generics: every side is dynamic.
    pub fn serialize_map(&self, map: &DynMap) -> Result<Vec<u8>, Error> {
        self.serialize_map_with(map, MapCall::default(), None)
    }

    /// Serialize a map under a declared `Map<K, V>` type. Monomorphic sides
    /// omit class tags on the wire.
    pub fn serialize_map_as(
        &self,
        map: &DynMap,
        declared: Rc<GenericType>,
    ) -> Result<Vec<u8>, Error> {
        self.serialize_map_with(map, MapCall::default(), Some(declared))
    }

    /// Serialize a map with one-shot serializer overrides and/or a declared
    /// type. `call` is consumed; nested maps always use default resolution.
    pub fn serialize_map_with(
        &self,
        map: &DynMap,
        call: MapCall,
        declared: Option<Rc<GenericType>>,
    ) -> Result<Vec<u8>, Error> {
        let mut context = WriteContext::new(&self.class_resolver, &self.config);
        let pushed = declared.is_some();
        if let Some(generic) = declared {
            context.generics.push_generic_type(generic);
        }
        let result = write_map(&mut context, map, call);
        if pushed {
            context.generics.pop_generic_type();
        }
        result?;
        Ok(context.writer.into_inner())
    }

    /// Deserialize a map with no declared generics.
    pub fn deserialize_map(&self, bytes: &[u8]) -> Result<DynMap, Error> {
        self.deserialize_map_with(bytes, MapCall::default(), None)
    }

    /// Deserialize a map under the declared `Map<K, V>` type used on write.
    pub fn deserialize_map_as(
        &self,
        bytes: &[u8],
        declared: Rc<GenericType>,
    ) -> Result<DynMap, Error> {
        self.deserialize_map_with(bytes, MapCall::default(), Some(declared))
    }

    /// Deserialize a map with one-shot serializer overrides and/or a declared
    /// type. The declared type must be a registered map container.
    pub fn deserialize_map_with(
        &self,
        bytes: &[u8],
        call: MapCall,
        declared: Option<Rc<GenericType>>,
    ) -> Result<DynMap, Error> {
        if let Some(generic) = &declared {
            self.check_map_target(generic)?;
        }
        let mut context = ReadContext::new(bytes, &self.class_resolver, &self.config);
        let pushed = declared.is_some();
        if let Some(generic) = declared {
            context.generics.push_generic_type(generic);
        }
        let result = read_map(&mut context, call);
        if pushed {
            context.generics.pop_generic_type();
        }
        result
    }

    // The declared read target must be a map container we know how to
    // instantiate.
    fn check_map_target(&self, declared: &GenericType) -> Result<(), Error> {
        let concrete = declared
            .concrete()
            .ok_or_else(|| Error::missing_constructor("declared map type is not concrete"))?;
        let info = self
            .class_resolver
            .get_by_type(concrete)
            .ok_or_else(|| Error::missing_constructor("declared map type is not registered"))?;
        if info.class_id() != TypeId::MAP as u32 {
            return Err(Error::missing_constructor(
                "declared type has no usable no-argument map constructor",
            ));
        }
        Ok(())
    }
}
