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

use std::rc::Rc;
use tempest_core::error::Error;
use tempest_core::generics::GenericType;
use tempest_core::serializer::map::{DynMap, MapCall};
use tempest_core::serializer::DynAny;
use tempest_core::tempest::Tempest;

fn s(v: &str) -> Option<DynAny> {
    Some(Rc::new(v.to_string()))
}

fn int(v: i32) -> Option<DynAny> {
    Some(Rc::new(v))
}

fn long(v: i64) -> Option<DynAny> {
    Some(Rc::new(v))
}

fn double(v: f64) -> Option<DynAny> {
    Some(Rc::new(v))
}

fn boolean(v: bool) -> Option<DynAny> {
    Some(Rc::new(v))
}

fn assert_dyn_eq(a: &Option<DynAny>, b: &Option<DynAny>) {
    match (a, b) {
        (None, None) => {}
        (Some(x), Some(y)) => {
            if let (Some(xs), Some(ys)) = (x.downcast_ref::<String>(), y.downcast_ref::<String>())
            {
                assert_eq!(xs, ys);
            } else if let (Some(xi), Some(yi)) = (x.downcast_ref::<i32>(), y.downcast_ref::<i32>())
            {
                assert_eq!(xi, yi);
            } else if let (Some(xi), Some(yi)) = (x.downcast_ref::<i64>(), y.downcast_ref::<i64>())
            {
                assert_eq!(xi, yi);
            } else if let (Some(xf), Some(yf)) = (x.downcast_ref::<f64>(), y.downcast_ref::<f64>())
            {
                assert_eq!(xf, yf);
            } else if let (Some(xb), Some(yb)) =
                (x.downcast_ref::<bool>(), y.downcast_ref::<bool>())
            {
                assert_eq!(xb, yb);
            } else if let (Some(xm), Some(ym)) =
                (x.downcast_ref::<DynMap>(), y.downcast_ref::<DynMap>())
            {
                assert_map_eq(xm, ym);
            } else {
                panic!("mismatched or unsupported value types");
            }
        }
        _ => panic!("null-ness mismatch"),
    }
}

fn assert_map_eq(a: &DynMap, b: &DynMap) {
    assert_eq!(a.len(), b.len());
    for (ea, eb) in a.entries().iter().zip(b.entries()) {
        assert_dyn_eq(&ea.0, &eb.0);
        assert_dyn_eq(&ea.1, &eb.1);
    }
}

fn string_int_generic(tempest: &Tempest) -> Rc<GenericType> {
    GenericType::map_of(
        GenericType::of::<String>(tempest.get_class_resolver()).unwrap(),
        GenericType::of::<i32>(tempest.get_class_resolver()).unwrap(),
    )
}

#[test]
fn test_empty_map() {
    let tempest = Tempest::default();
    let map = DynMap::new();
    let bytes = tempest.serialize_map(&map).unwrap();
    assert_eq!(bytes, vec![0]);
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert!(decoded.is_empty());
}

#[test]
fn test_simple_map_roundtrip() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(s("key1"), s("value1"));
    map.insert(s("key2"), s("value2"));
    let bytes = tempest.serialize_map(&map).unwrap();
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

// Declared Map<String, i32> with both sides final: one chunk, header 0, no
// class tags anywhere in the payload.
#[test]
fn test_monomorphic_map_layout() {
    let tempest = Tempest::default();
    let generic = string_int_generic(&tempest);
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    map.insert(s("b"), int(2));
    map.insert(s("c"), int(3));
    let bytes = tempest.serialize_map_as(&map, generic.clone()).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        bytes,
        vec![
            3,          // entry count
            3, 0,       // chunk: size 3, header 0
            4, 97, 2,   // "a" -> 1
            4, 98, 4,   // "b" -> 2
            4, 99, 6,   // "c" -> 3
        ]
    );
    let decoded = tempest.deserialize_map_as(&bytes, generic).unwrap();
    assert_map_eq(&map, &decoded);
}

// A null value opens a fresh chunk with VALUE_HAS_NULL; later non-null values
// in that chunk carry a NOT_NULL_VALUE prefix.
#[test]
fn test_null_value_splits_chunk() {
    let tempest = Tempest::default();
    let generic = string_int_generic(&tempest);
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    map.insert(s("b"), None);
    map.insert(s("c"), int(3));
    let bytes = tempest.serialize_map_as(&map, generic.clone()).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        bytes,
        vec![
            3,            // entry count
            1, 0,         // chunk 1: size 1, header 0
            4, 97, 2,     // "a" -> 1
            2, 16,        // chunk 2: size 2, VALUE_HAS_NULL
            4, 98, 0,     // "b" -> NULL
            4, 99, 2, 6,  // "c" -> NOT_NULL_VALUE 3
        ]
    );
    let decoded = tempest.deserialize_map_as(&bytes, generic).unwrap();
    assert_map_eq(&map, &decoded);
}

// A null key always sits alone in its own single-entry chunk.
#[test]
fn test_null_key_isolated_chunk() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    map.insert(None, int(2));
    map.insert(s("b"), int(3));
    let bytes = tempest.serialize_map(&map).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        bytes,
        vec![
            3,                   // entry count
            1, 0, 12, 4, 97, 4, 2, // chunk 1: "a" -> 1 (tags STRING, INT32)
            1, 2, 0, 4, 4,       // chunk 2: KEY_HAS_NULL, null -> 2
            1, 0, 12, 4, 98, 4, 6, // chunk 3: "b" -> 3
        ]
    );
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

#[test]
fn test_at_most_one_null_key_per_chunk() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(None, int(1));
    map.insert(None, int(2));
    let bytes = tempest.serialize_map(&map).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        bytes,
        vec![
            2,             // entry count
            1, 2, 0, 4, 2, // chunk 1: KEY_HAS_NULL, null -> 1
            1, 2, 0, 4, 4, // chunk 2: KEY_HAS_NULL, null -> 2
        ]
    );
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

// When keys and values both turn heterogeneous the writer closes the chunk,
// emits the 0 sentinel and continues with per-entry generic encoding.
#[test]
fn test_heterogeneity_escalation() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(s("k"), long(10));
    map.insert(int(1), s("v"));
    map.insert(double(2.5), boolean(true));
    let bytes = tempest.serialize_map(&map).unwrap();
    let mut expected = vec![
        3, // entry count
        1, 0, 12, 4, 107, 6, 20, // chunk 1: "k" -> 10i64
        0, // sentinel: unchunked from here on
        2, 4, 2, 2, 12, 4, 118, // 1i32 -> "v"
        2, 11,
    ];
    expected.extend_from_slice(&2.5f64.to_le_bytes());
    expected.extend_from_slice(&[2, 1, 1]); // -> true
    assert_eq!(bytes, expected);
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

// Once escalated, the writer never returns to chunked mode within the map.
#[test]
fn test_no_reentry_into_chunked_mode() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(s("k"), long(10));
    map.insert(int(1), s("v"));
    // homogeneous again from here, but the tail stays unchunked
    map.insert(int(2), s("w"));
    map.insert(int(3), s("x"));
    let bytes = tempest.serialize_map(&map).unwrap();
    // entry count, one chunk of 1, sentinel, then three generic entries
    assert_eq!(bytes[0], 4);
    assert_eq!(bytes[1], 1);
    assert_eq!(bytes[8], 0);
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

// A heterogeneous side opposite a pinned side resets chunks and goes sticky
// per-entry-tagged, but never escalates to unchunked mode.
#[test]
fn test_pinned_key_heterogeneous_values() {
    let tempest = Tempest::default();
    let generic = GenericType::map_of(
        GenericType::of::<String>(tempest.get_class_resolver()).unwrap(),
        GenericType::object(),
    );
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    map.insert(s("b"), s("two"));
    map.insert(s("c"), double(3.0));
    map.insert(s("d"), int(4));
    let bytes = tempest.serialize_map_as(&map, generic.clone()).unwrap();
    let decoded = tempest.deserialize_map_as(&bytes, generic).unwrap();
    assert_map_eq(&map, &decoded);
}

#[test]
fn test_chunk_split_at_127_entries() {
    let tempest = Tempest::default();
    let generic = GenericType::map_of(
        GenericType::of::<i32>(tempest.get_class_resolver()).unwrap(),
        GenericType::of::<i32>(tempest.get_class_resolver()).unwrap(),
    );
    let mut map = DynMap::new();
    for _ in 0..128 {
        map.insert(int(1), int(1));
    }
    let bytes = tempest.serialize_map_as(&map, generic.clone()).unwrap();
    // varuint(128) = [0x80, 0x01], then a full chunk of 127 and a chunk of 1
    assert_eq!(&bytes[0..2], &[0x80, 0x01]);
    assert_eq!(bytes[2], 127);
    assert_eq!(bytes[3], 0);
    let tail = 4 + 127 * 2;
    assert_eq!(bytes[tail], 1);
    assert_eq!(bytes[tail + 1], 0);
    assert_eq!(bytes.len(), tail + 4);
    let decoded = tempest.deserialize_map_as(&bytes, generic).unwrap();
    assert_map_eq(&map, &decoded);
}

#[test]
fn test_large_map_roundtrip() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    for idx in 0..1000 {
        map.insert(int(idx), s(&format!("value-{idx}")));
    }
    let bytes = tempest.serialize_map(&map).unwrap();
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

// The same instance written twice must come back as the same instance.
#[test]
fn test_ref_tracking_identity() {
    let tempest = Tempest::default().track_ref(true);
    let generic = GenericType::map_of(
        GenericType::of::<String>(tempest.get_class_resolver()).unwrap(),
        GenericType::of::<String>(tempest.get_class_resolver()).unwrap(),
    );
    let shared: DynAny = Rc::new("dup".to_string());
    let mut map = DynMap::new();
    map.insert(s("a"), Some(shared.clone()));
    map.insert(s("b"), Some(shared));
    let bytes = tempest.serialize_map_as(&map, generic.clone()).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        bytes,
        vec![
            2,                      // entry count
            2, 9,                   // chunk: size 2, TRACKING_KEY_REF | TRACKING_VALUE_REF
            2, 4, 97,               // "a" first occurrence
            2, 12, 100, 117, 112,   // "dup" first occurrence (id 1)
            2, 4, 98,               // "b"
            1, 1,                   // REF 1
        ]
    );
    let decoded = tempest.deserialize_map_as(&bytes, generic).unwrap();
    assert_map_eq(&map, &decoded);
    let first = decoded.entries()[0].1.as_ref().unwrap();
    let second = decoded.entries()[1].1.as_ref().unwrap();
    assert!(Rc::ptr_eq(first, second));
}

// Tracking plus a null value in the chunk: the per-entry ref flag comes
// first and the class tag rides with the first materialized payload.
#[test]
fn test_ref_tracking_with_null_values() {
    let tempest = Tempest::default().track_ref(true);
    let shared: DynAny = Rc::new("dup".to_string());
    let mut map = DynMap::new();
    map.insert(s("x"), None);
    map.insert(s("y"), Some(shared.clone()));
    map.insert(s("z"), Some(shared));
    let bytes = tempest.serialize_map(&map).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        bytes,
        vec![
            3,                        // entry count
            3, 25,                    // chunk: size 3, TRACKING_KEY_REF | TRACKING_VALUE_REF | VALUE_HAS_NULL
            12, 2, 4, 120,            // key tag STRING, then "x"
            0,                        // null value
            2, 4, 121,                // "y"
            2, 12, 12, 100, 117, 112, // NOT_NULL_VALUE, tag STRING, "dup"
            2, 4, 122,                // "z"
            1, 2,                     // REF 2
        ]
    );
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
    assert!(decoded.entries()[0].1.is_none());
    let y = decoded.entries()[1].1.as_ref().unwrap();
    let z = decoded.entries()[2].1.as_ref().unwrap();
    assert!(Rc::ptr_eq(y, z));
}

#[test]
fn test_nested_map_with_generics() {
    let tempest = Tempest::default();
    let resolver = tempest.get_class_resolver();
    let inner_generic = GenericType::map_of(
        GenericType::of::<String>(resolver).unwrap(),
        GenericType::of::<i32>(resolver).unwrap(),
    );
    let outer_generic = GenericType::map_of(
        GenericType::of::<String>(resolver).unwrap(),
        inner_generic,
    );
    let mut inner = DynMap::new();
    inner.insert(s("x"), int(1));
    inner.insert(s("y"), int(2));
    let mut map = DynMap::new();
    map.insert(s("outer"), Some(Rc::new(inner) as DynAny));
    let bytes = tempest.serialize_map_as(&map, outer_generic.clone()).unwrap();
    let decoded = tempest.deserialize_map_as(&bytes, outer_generic).unwrap();
    assert_map_eq(&map, &decoded);
}

#[test]
fn test_nested_map_dynamic() {
    let tempest = Tempest::default();
    let mut inner = DynMap::new();
    inner.insert(s("x"), int(1));
    inner.insert(None, s("null-key"));
    let mut map = DynMap::new();
    map.insert(s("outer"), Some(Rc::new(inner) as DynAny));
    map.insert(s("plain"), int(7));
    let bytes = tempest.serialize_map(&map).unwrap();
    let decoded = tempest.deserialize_map(&bytes).unwrap();
    assert_map_eq(&map, &decoded);
}

// User-supplied serializers pin both sides: the wire matches the declared
// monomorphic layout byte for byte.
#[test]
fn test_user_supplied_serializers() {
    let tempest = Tempest::default();
    let resolver = tempest.get_class_resolver();
    let call = MapCall {
        key_serializer: resolver.get_by_type(std::any::TypeId::of::<String>()),
        value_serializer: resolver.get_by_type(std::any::TypeId::of::<i32>()),
    };
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    map.insert(s("b"), int(2));
    map.insert(s("c"), int(3));
    let bytes = tempest.serialize_map_with(&map, call, None).unwrap();
    let generic = string_int_generic(&tempest);
    let declared_bytes = tempest.serialize_map_as(&map, generic).unwrap();
    assert_eq!(bytes, declared_bytes);
    let read_call = MapCall {
        key_serializer: resolver.get_by_type(std::any::TypeId::of::<String>()),
        value_serializer: resolver.get_by_type(std::any::TypeId::of::<i32>()),
    };
    let decoded = tempest.deserialize_map_with(&bytes, read_call, None).unwrap();
    assert_map_eq(&map, &decoded);
}

// One-shot serializers must not leak into nested map serialization.
#[test]
fn test_user_supplied_serializers_do_not_leak_into_nested_maps() {
    let tempest = Tempest::default();
    let resolver = tempest.get_class_resolver();
    let mut inner = DynMap::new();
    inner.insert(s("x"), int(1));
    let mut map = DynMap::new();
    map.insert(s("outer"), Some(Rc::new(inner) as DynAny));
    let call = MapCall {
        key_serializer: resolver.get_by_type(std::any::TypeId::of::<String>()),
        value_serializer: resolver.get_by_type(std::any::TypeId::of::<DynMap>()),
    };
    let bytes = tempest.serialize_map_with(&map, call, None).unwrap();
    let read_call = MapCall {
        key_serializer: resolver.get_by_type(std::any::TypeId::of::<String>()),
        value_serializer: resolver.get_by_type(std::any::TypeId::of::<DynMap>()),
    };
    let decoded = tempest.deserialize_map_with(&bytes, read_call, None).unwrap();
    assert_map_eq(&map, &decoded);
}

#[test]
fn test_negative_chunk_size_rejected() {
    let tempest = Tempest::default();
    let bytes = vec![1, 0x80];
    assert!(matches!(
        tempest.deserialize_map(&bytes),
        Err(Error::ProtocolMismatch(_))
    ));
}

#[test]
fn test_chunk_overrun_rejected() {
    let tempest = Tempest::default();
    // declares 1 entry but a chunk of 2
    let bytes = vec![1, 2, 0, 12, 4, 97, 4, 2, 12, 4, 98, 4, 4];
    assert!(matches!(
        tempest.deserialize_map(&bytes),
        Err(Error::ProtocolMismatch(_))
    ));
}

#[test]
fn test_truncated_stream_rejected() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    map.insert(s("b"), int(2));
    let bytes = tempest.serialize_map(&map).unwrap();
    for cut in 1..bytes.len() {
        let err = tempest.deserialize_map(&bytes[..cut]);
        assert!(err.is_err(), "truncation at {cut} must fail");
    }
}

#[test]
fn test_missing_constructor_for_non_map_target() {
    let tempest = Tempest::default();
    let mut map = DynMap::new();
    map.insert(s("a"), int(1));
    let bytes = tempest.serialize_map(&map).unwrap();
    let declared = GenericType::of::<i32>(tempest.get_class_resolver()).unwrap();
    assert!(matches!(
        tempest.deserialize_map_as(&bytes, declared),
        Err(Error::MissingConstructor(_))
    ));
}

#[test]
fn test_tracking_roundtrip_all_configurations() {
    for track_ref in [false, true] {
        let tempest = Tempest::default().track_ref(track_ref);
        let mut map = DynMap::new();
        map.insert(s("a"), int(1));
        map.insert(s("b"), None);
        map.insert(None, s("nk"));
        map.insert(int(9), double(0.5));
        let bytes = tempest.serialize_map(&map).unwrap();
        let decoded = tempest.deserialize_map(&bytes).unwrap();
        assert_map_eq(&map, &decoded);

        let generic = string_int_generic(&tempest);
        let mut typed = DynMap::new();
        typed.insert(s("a"), int(1));
        typed.insert(s("b"), None);
        typed.insert(None, int(3));
        let bytes = tempest.serialize_map_as(&typed, generic.clone()).unwrap();
        let decoded = tempest.deserialize_map_as(&bytes, generic).unwrap();
        assert_map_eq(&typed, &decoded);
    }
}
