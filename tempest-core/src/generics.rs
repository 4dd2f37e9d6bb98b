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
use crate::resolver::class_resolver::{ClassInfo, ClassResolver};
use crate::serializer::map::DynMap;
use std::rc::Rc;

/// A declared type, possibly parameterized, as seen at a container boundary.
///
/// `monomorphic` is true when the declared type fully determines the runtime
/// type, which lets the wire omit the element's class tag.
pub struct GenericType {
    concrete: Option<std::any::TypeId>,
    type_parameters: Vec<Rc<GenericType>>,
    monomorphic: bool,
}

impl GenericType {
    /// Declared type `T`. Monomorphism follows the registered class policy.
    pub fn of<T: 'static>(class_resolver: &ClassResolver) -> Result<Rc<GenericType>, Error> {
        let concrete = std::any::TypeId::of::<T>();
        let info = class_resolver
            .get_by_type(concrete)
            .ok_or_else(|| Error::type_error("declared type not registered"))?;
        Ok(Rc::new(GenericType {
            concrete: Some(concrete),
            type_parameters: vec![],
            monomorphic: info.is_final(),
        }))
    }

    /// The dynamic object type: nothing is known statically.
    pub fn object() -> Rc<GenericType> {
        Rc::new(GenericType {
            concrete: None,
            type_parameters: vec![],
            monomorphic: false,
        })
    }

    /// A declared map with key/value parameters. The container class itself
    /// is concrete, so the map type is monomorphic.
    pub fn map_of(key: Rc<GenericType>, value: Rc<GenericType>) -> Rc<GenericType> {
        Rc::new(GenericType {
            concrete: Some(std::any::TypeId::of::<DynMap>()),
            type_parameters: vec![key, value],
            monomorphic: true,
        })
    }

    #[inline(always)]
    pub fn is_monomorphic(&self) -> bool {
        self.monomorphic
    }

    #[inline(always)]
    pub fn concrete(&self) -> Option<std::any::TypeId> {
        self.concrete
    }

    #[inline(always)]
    pub fn type_parameters_count(&self) -> usize {
        self.type_parameters.len()
    }

    /// Key/value parameters of a declared map type; missing parameters
    /// default to the dynamic object type.
    pub fn kv_pair(&self) -> (Rc<GenericType>, Rc<GenericType>) {
        (
            self.type_parameters
                .first()
                .cloned()
                .unwrap_or_else(GenericType::object),
            self.type_parameters
                .get(1)
                .cloned()
                .unwrap_or_else(GenericType::object),
        )
    }

    /// Resolve this declared type's serializer. Only valid for concrete
    /// declared types.
    pub fn class_info(&self, class_resolver: &ClassResolver) -> Result<Rc<ClassInfo>, Error> {
        let concrete = self
            .concrete
            .ok_or_else(|| Error::type_error("dynamic type has no serializer"))?;
        class_resolver
            .get_by_type(concrete)
            .ok_or_else(|| Error::type_error("declared type not registered"))
    }
}

/// Stack of declared types, pushed and popped around every element write and
/// read so nested containers see their own declared element types.
#[derive(Default)]
pub struct Generics {
    stack: Vec<Rc<GenericType>>,
}

impl Generics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn push_generic_type(&mut self, generic_type: Rc<GenericType>) {
        self.stack.push(generic_type);
    }

    #[inline(always)]
    pub fn pop_generic_type(&mut self) {
        self.stack.pop();
    }

    /// The declared type pushed by the enclosing serializer, if any.
    #[inline(always)]
    pub fn next_generic_type(&self) -> Option<Rc<GenericType>> {
        self.stack.last().cloned()
    }
}
