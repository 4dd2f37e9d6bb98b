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

use std::borrow::Cow;

use thiserror::Error;

/// Compile-time flag: set `TEMPEST_PANIC_ON_ERROR=1` when building to panic
/// at the exact location an error is created, with a full backtrace.
pub const PANIC_ON_ERROR: bool = option_env!("TEMPEST_PANIC_ON_ERROR").is_some();

/// Error type for Tempest serialization and deserialization operations.
///
/// Construct variants through the static constructor functions
/// ([`Error::protocol_mismatch`], [`Error::encode_error`], ...) rather than
/// the enum syntax; the constructors take anything convertible into a
/// `Cow<'static, str>` and honor `TEMPEST_PANIC_ON_ERROR`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The byte stream does not follow the map chunk protocol: a chunk size
    /// with the high bit set, an unexpected flag byte, or a chunk that
    /// overruns the declared entry count.
    #[error("{0}")]
    ProtocolMismatch(Cow<'static, str>),

    /// Buffer underflow during read: `offset + length > capacity`.
    #[error("Buffer out of bound: {0} + {1} > {2}")]
    BufferOutOfBound(usize, usize, usize),

    /// Input violated an encoding contract, e.g. a meta string longer than
    /// the 32767-character limit.
    #[error("{0}")]
    EncodeError(Cow<'static, str>),

    /// A character outside the chosen alphabet reached a packed encoder, or
    /// an unknown encoding byte was read. The write-side case indicates a bug
    /// in encoding selection.
    #[error("{0}")]
    EncodingError(Cow<'static, str>),

    /// A reference id that does not resolve to a previously read object.
    #[error("{0}")]
    InvalidRef(Cow<'static, str>),

    /// A type that is not registered, or a value whose runtime type does not
    /// match its class tag.
    #[error("{0}")]
    TypeError(Cow<'static, str>),

    /// The declared deserialization target is not a map container with a
    /// usable no-argument constructor.
    #[error("{0}")]
    MissingConstructor(Cow<'static, str>),

    /// Maximum dynamic nesting depth exceeded while reading.
    #[error("{0}")]
    DepthExceed(Cow<'static, str>),

    /// Generic error raised by the `ensure!`/`bail!` macros.
    #[error("{0}")]
    Unknown(Cow<'static, str>),

    /// Wrapped ad-hoc error from a conversion helper.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

macro_rules! impl_error_ctor {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[inline(always)]
        #[cold]
        #[track_caller]
        pub fn $name<S: Into<Cow<'static, str>>>(s: S) -> Self {
            let err = Error::$variant(s.into());
            if PANIC_ON_ERROR {
                panic!("TEMPEST_PANIC_ON_ERROR: {}", err);
            }
            err
        }
    };
}

impl Error {
    impl_error_ctor!(
        /// Creates a new [`Error::ProtocolMismatch`].
        protocol_mismatch,
        ProtocolMismatch
    );

    impl_error_ctor!(
        /// Creates a new [`Error::EncodeError`].
        encode_error,
        EncodeError
    );

    impl_error_ctor!(
        /// Creates a new [`Error::EncodingError`].
        encoding_error,
        EncodingError
    );

    impl_error_ctor!(
        /// Creates a new [`Error::InvalidRef`].
        invalid_ref,
        InvalidRef
    );

    impl_error_ctor!(
        /// Creates a new [`Error::TypeError`].
        type_error,
        TypeError
    );

    impl_error_ctor!(
        /// Creates a new [`Error::MissingConstructor`].
        missing_constructor,
        MissingConstructor
    );

    impl_error_ctor!(
        /// Creates a new [`Error::DepthExceed`].
        depth_exceed,
        DepthExceed
    );

    impl_error_ctor!(
        /// Creates a new [`Error::Unknown`].
        unknown,
        Unknown
    );

    /// Creates a new [`Error::BufferOutOfBound`] with the given bounds.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn buffer_out_of_bound(offset: usize, length: usize, capacity: usize) -> Self {
        let err = Error::BufferOutOfBound(offset, length, capacity);
        if PANIC_ON_ERROR {
            panic!("TEMPEST_PANIC_ON_ERROR: {}", err);
        }
        err
    }
}

/// Ensures a condition is true; otherwise returns an [`enum@Error`].
///
/// ```
/// use tempest_core::ensure;
/// use tempest_core::error::Error;
///
/// fn check_value(n: i32) -> Result<(), Error> {
///     ensure!(n > 0, "value must be positive");
///     ensure!(n < 10, Error::encode_error("value too large"));
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:literal) => {
        if !$cond {
            return Err($crate::error::Error::unknown($msg));
        }
    };
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::unknown(format!($fmt, $($arg)*)));
        }
    };
}

/// Returns early with an [`enum@Error`].
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::error::Error::unknown($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::unknown(format!($fmt, $($arg)*)))
    };
}
