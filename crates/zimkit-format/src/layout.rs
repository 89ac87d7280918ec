//! Fixed-layout record views over a shared byte buffer
//!
//! A record is declared once as an ordered list of `name: type` fields. The
//! [`record_layout!`] macro accumulates the field widths into offsets and
//! generates a borrowed view with one accessor per field. Accessors decode
//! the little-endian value straight from the buffer on every call; nothing
//! is copied or cached.
//!
//! ```text
//! record_layout! {
//!     pub struct RedirectRecord {
//!         pub mimetype: u16,        // offset 0
//!         pub parameter_len: u8,    // offset 2
//!         pub namespace: u8,        // offset 3
//!         pub revision: u32,        // offset 4
//!         pub redirect_index: u32,  // offset 8, SIZE = 12
//!     }
//! }
//! ```

use crate::error::{ZimError, ZimResult};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt::Debug;

/// Little-endian primitive decodable in place.
///
/// `decode` is only called with at least `WIDTH` bytes available.
pub trait Primitive: Copy + Debug {
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Decode from the first `WIDTH` bytes of `bytes`
    fn decode(bytes: &[u8]) -> Self;
}

impl Primitive for u8 {
    const WIDTH: usize = 1;

    fn decode(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Primitive for u16 {
    const WIDTH: usize = 2;

    fn decode(bytes: &[u8]) -> Self {
        LittleEndian::read_u16(bytes)
    }
}

impl Primitive for u32 {
    const WIDTH: usize = 4;

    fn decode(bytes: &[u8]) -> Self {
        LittleEndian::read_u32(bytes)
    }
}

impl Primitive for u64 {
    const WIDTH: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        LittleEndian::read_u64(bytes)
    }
}

impl<const N: usize> Primitive for [u8; N] {
    const WIDTH: usize = N;

    fn decode(bytes: &[u8]) -> Self {
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes[..N]);
        out
    }
}

/// Position of one field inside a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as declared
    pub name: &'static str,
    /// Offset from the start of the record
    pub offset: usize,
    /// Encoded width in bytes
    pub width: usize,
}

impl FieldSpec {
    /// Build the field table from `(name, width)` declarations in order
    pub const fn table<const N: usize>(decls: [(&'static str, usize); N]) -> [Self; N] {
        let mut out = [Self {
            name: "",
            offset: 0,
            width: 0,
        }; N];
        let mut offset = 0;
        let mut i = 0;
        while i < N {
            let (name, width) = decls[i];
            out[i] = Self {
                name,
                offset,
                width,
            };
            offset += width;
            i += 1;
        }
        out
    }
}

/// Borrow `len` bytes at `offset`, failing if the span leaves the buffer
pub fn span(buf: &[u8], offset: usize, len: usize) -> ZimResult<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| ZimError::out_of_bounds(offset, len, buf.len()))
}

/// Decode one primitive at an absolute buffer offset
pub fn read_at<T: Primitive>(buf: &[u8], offset: usize) -> ZimResult<T> {
    span(buf, offset, T::WIDTH).map(T::decode)
}

/// Convert a stored 64-bit position into a buffer offset
pub fn to_offset(value: u64) -> ZimResult<usize> {
    usize::try_from(value)
        .map_err(|_| ZimError::MalformedRecord(format!("offset {value} exceeds address space")))
}

/// Declare a fixed-layout record view.
///
/// Fields may carry their own visibility so a record can keep a raw field
/// private behind a checked accessor.
macro_rules! record_layout {
    (@accessors $offset:expr; ) => {};
    (
        @accessors $offset:expr;
        $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty, $($rest:tt)*
    ) => {
        $(#[$fmeta])*
        $fvis fn $field(&self) -> $ty {
            self.field::<$ty>($offset)
        }

        $crate::layout::record_layout!(
            @accessors $offset + <$ty as $crate::layout::Primitive>::WIDTH; $($rest)*
        );
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        $vis struct $name<'a> {
            buf: &'a [u8],
            base: usize,
        }

        impl<'a> $name<'a> {
            /// Size in bytes of the fixed part
            pub const SIZE: usize = 0 $(+ <$ty as $crate::layout::Primitive>::WIDTH)+;

            /// Field table in declaration order
            pub const FIELDS: &'static [$crate::layout::FieldSpec] =
                &$crate::layout::FieldSpec::table([
                    $( (stringify!($field), <$ty as $crate::layout::Primitive>::WIDTH) ),+
                ]);

            /// View the record whose fixed part starts at `base`
            pub fn new(buf: &'a [u8], base: usize) -> $crate::error::ZimResult<Self> {
                $crate::layout::span(buf, base, Self::SIZE)?;
                Ok(Self { buf, base })
            }

            /// Offset of the record in the buffer
            pub fn base(&self) -> usize {
                self.base
            }

            /// Offset of the first byte after the fixed part
            pub fn end(&self) -> usize {
                self.base + Self::SIZE
            }

            /// Buffer the record borrows from
            pub fn buffer(&self) -> &'a [u8] {
                self.buf
            }

            // The span was checked in `new`.
            fn field<T: $crate::layout::Primitive>(&self, offset: usize) -> T {
                T::decode(&self.buf[self.base + offset..])
            }

            $crate::layout::record_layout!(
                @accessors 0usize; $( $(#[$fmeta])* $fvis $field : $ty, )+
            );
        }

        impl std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("base", &self.base)
                    $( .field(stringify!($field), &self.$field()) )+
                    .finish()
            }
        }
    };
}

pub(crate) use record_layout;
