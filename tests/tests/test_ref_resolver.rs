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

use std::any::Any;
use std::rc::Rc;
use tempest_core::buffer::{Reader, Writer};
use tempest_core::error::Error;
use tempest_core::resolver::ref_resolver::{RefRead, RefReader, RefWriter};

#[test]
fn test_write_null_flag() {
    let mut ref_writer = RefWriter::new();
    let mut writer = Writer::default();
    assert!(ref_writer.write_null_flag(&mut writer, None));
    assert_eq!(writer.dump(), vec![0]);

    let rc: Rc<dyn Any> = Rc::new(1i32);
    let mut writer = Writer::default();
    assert!(!ref_writer.write_null_flag(&mut writer, Some(&rc)));
    assert!(writer.is_empty());
}

#[test]
fn test_write_ref_or_null_assigns_dense_ids() {
    let mut ref_writer = RefWriter::new();
    let mut writer = Writer::default();
    let first: Rc<dyn Any> = Rc::new("one".to_string());
    let second: Rc<dyn Any> = Rc::new("two".to_string());

    assert!(!ref_writer.write_ref_or_null(&mut writer, Some(&first)));
    assert!(!ref_writer.write_ref_or_null(&mut writer, Some(&second)));
    // repeats become back references to ids 0 and 1
    assert!(ref_writer.write_ref_or_null(&mut writer, Some(&first)));
    assert!(ref_writer.write_ref_or_null(&mut writer, Some(&second)));
    assert!(ref_writer.write_ref_or_null(&mut writer, None));
    assert_eq!(writer.dump(), vec![2, 2, 1, 0, 1, 1, 0]);
}

#[test]
fn test_try_preserve_ref_id_roundtrip() {
    let mut ref_writer = RefWriter::new();
    let mut writer = Writer::default();
    let shared: Rc<dyn Any> = Rc::new(42i32);
    assert!(!ref_writer.write_ref_or_null(&mut writer, Some(&shared)));
    assert!(ref_writer.write_ref_or_null(&mut writer, Some(&shared)));

    let binding = writer.dump();
    let mut reader = Reader::new(binding.as_slice());
    let mut ref_reader = RefReader::new();
    let obj: Rc<dyn Any> = Rc::new(42i32);
    match ref_reader.try_preserve_ref_id(&mut reader).unwrap() {
        RefRead::Fresh(ref_id) => {
            assert_eq!(ref_id, 0);
            ref_reader.set_read_object(ref_id, obj.clone());
        }
        _ => panic!("expected a first occurrence"),
    }
    match ref_reader.try_preserve_ref_id(&mut reader).unwrap() {
        RefRead::Existing(resolved) => assert!(Rc::ptr_eq(&resolved, &obj)),
        _ => panic!("expected a back reference"),
    }
}

#[test]
fn test_null_flag_read() {
    let mut reader = Reader::new(&[0]);
    let mut ref_reader = RefReader::new();
    assert!(matches!(
        ref_reader.try_preserve_ref_id(&mut reader).unwrap(),
        RefRead::Null
    ));
}

#[test]
fn test_unresolved_ref_id_fails() {
    // REF flag pointing at an id that was never stored
    let mut reader = Reader::new(&[1, 5]);
    let mut ref_reader = RefReader::new();
    assert!(matches!(
        ref_reader.try_preserve_ref_id(&mut reader),
        Err(Error::InvalidRef(_))
    ));
}

#[test]
fn test_unknown_flag_byte_fails() {
    let mut reader = Reader::new(&[9]);
    let mut ref_reader = RefReader::new();
    assert!(matches!(
        ref_reader.try_preserve_ref_id(&mut reader),
        Err(Error::ProtocolMismatch(_))
    ));
}
