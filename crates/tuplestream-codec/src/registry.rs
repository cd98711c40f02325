//! Registry mapping value types to wire tags and codecs.
//!
//! Built once at job setup (`&mut self` registration), then frozen behind an
//! `Arc` and shared read-only by every worker. Lookups take no locks.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use tuplestream_core::config::CodecLimits;
use tuplestream_core::schema::{DataType, TypeFamily};
use tuplestream_core::types::Value;

use crate::builtin::Builtin;
use crate::error::{Error, Result};

/// Wire tags of the built-in codecs. Tag 0 is reserved for null.
pub mod tags {
    pub const NULL: u32 = 0;
    pub const BOOL: u32 = 1;
    pub const I32: u32 = 2;
    pub const I64: u32 = 3;
    pub const F32: u32 = 4;
    pub const F64: u32 = 5;
    pub const STR: u32 = 6;
    pub const BIN: u32 = 7;
    /// First tag free for application types when using `with_builtins`.
    pub const FIRST_USER: u32 = 32;
}

/// Writer/reader pair for one registered type. Payload only; the tag is
/// written by the tuple codec.
pub trait ValueCodec: Send + Sync {
    fn write(&self, value: &Value, out: &mut dyn Write) -> Result<()>;

    fn read(&self, input: &mut dyn Read, limits: &CodecLimits) -> Result<Value>;
}

/// What a codec is registered for: one exact type, or a whole family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Exact(DataType),
    Family(TypeFamily),
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Exact(dt) => write!(f, "{dt}"),
            TypeKey::Family(fam) => write!(f, "family:{fam:?}"),
        }
    }
}

impl From<DataType> for TypeKey {
    fn from(dt: DataType) -> Self {
        TypeKey::Exact(dt)
    }
}

impl From<TypeFamily> for TypeKey {
    fn from(fam: TypeFamily) -> Self {
        TypeKey::Family(fam)
    }
}

struct Binding {
    key: TypeKey,
    tag: u32,
    codec: Arc<dyn ValueCodec>,
}

/// Built-in scalar bindings: distinct types on distinct non-null tags.
const BUILTINS: [(DataType, u32, Builtin); 7] = [
    (DataType::Boolean, tags::BOOL, Builtin::Bool),
    (DataType::Int32, tags::I32, Builtin::I32),
    (DataType::Int64, tags::I64, Builtin::I64),
    (DataType::Float32, tags::F32, Builtin::F32),
    (DataType::Float64, tags::F64, Builtin::F64),
    (DataType::Utf8, tags::STR, Builtin::Str),
    (DataType::Binary, tags::BIN, Builtin::Bin),
];

#[derive(Default)]
pub struct TypeCodecRegistry {
    bindings: Vec<Binding>,
    by_key: HashMap<TypeKey, usize>,
    // Ext types are looked up by borrowed name on the write path.
    by_ext_name: HashMap<String, usize>,
    by_tag: HashMap<u32, usize>,
}

impl TypeCodecRegistry {
    /// An empty registry. Only nulls can be encoded until types are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with exact codecs for every built-in scalar type.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        for (dt, tag, codec) in BUILTINS {
            reg.bind(TypeKey::Exact(dt), tag, Arc::new(codec));
        }
        reg
    }

    /// Bind `key` to `tag` and `codec`.
    ///
    /// Fails if the tag is reserved, if the tag is bound to another type, or if
    /// the type already has a binding.
    pub fn register(
        &mut self,
        key: impl Into<TypeKey>,
        tag: u32,
        codec: Arc<dyn ValueCodec>,
    ) -> Result<()> {
        let key = key.into();
        if tag == tags::NULL {
            return Err(Error::ReservedTag(tag));
        }
        if let Some(&idx) = self.by_tag.get(&tag) {
            let existing = &self.bindings[idx];
            if existing.key != key {
                return Err(Error::DuplicateTag {
                    tag,
                    existing: existing.key.to_string(),
                    requested: key.to_string(),
                });
            }
        }
        if let Some(&idx) = self.by_key.get(&key) {
            return Err(Error::DuplicateType {
                key: key.to_string(),
                existing_tag: self.bindings[idx].tag,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%key, tag, "registered type codec");

        self.bind(key, tag, codec);
        Ok(())
    }

    // Callers guarantee the tag is not reserved and neither key nor tag is bound.
    fn bind(&mut self, key: TypeKey, tag: u32, codec: Arc<dyn ValueCodec>) {
        let idx = self.bindings.len();
        if let TypeKey::Exact(DataType::Ext(name)) = &key {
            self.by_ext_name.insert(name.clone(), idx);
        }
        self.by_key.insert(key.clone(), idx);
        self.by_tag.insert(tag, idx);
        self.bindings.push(Binding { key, tag, codec });
    }

    /// Find the tag and codec for `value`: exact type first, then its family.
    pub fn writer_for(&self, value: &Value) -> Result<(u32, &dyn ValueCodec)> {
        let idx = match value {
            Value::Null => None,
            Value::Ext(ext) => self.by_ext_name.get(ext.type_name.as_str()).copied(),
            other => other.data_type().and_then(|dt| {
                let family = dt.family();
                self.by_key
                    .get(&TypeKey::Exact(dt))
                    .or_else(|| family.and_then(|f| self.by_key.get(&TypeKey::Family(f))))
                    .copied()
            }),
        };
        let binding = idx
            .map(|i| &self.bindings[i])
            .ok_or_else(|| Error::UnregisteredType {
                type_name: value.type_label().to_string(),
            })?;
        Ok((binding.tag, binding.codec.as_ref()))
    }

    /// Find the codec for a tag read off the wire.
    pub fn reader_for(&self, tag: u32) -> Result<&dyn ValueCodec> {
        self.by_tag
            .get(&tag)
            .map(|&i| self.bindings[i].codec.as_ref())
            .ok_or(Error::UnknownTag { tag })
    }

    pub fn tag_of(&self, key: &TypeKey) -> Option<u32> {
        self.by_key.get(key).map(|&i| self.bindings[i].tag)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Freeze for sharing across workers.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for TypeCodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.bindings.iter().map(|b| (b.tag, b.key.to_string())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{NumericCodec, StructCodec};

    #[test]
    fn builtins_cover_scalars() {
        let reg = TypeCodecRegistry::with_builtins();
        assert_eq!(reg.len(), 7);
        let (tag, _) = reg.writer_for(&Value::Str("a".into())).unwrap();
        assert_eq!(tag, tags::STR);
        assert!(reg.reader_for(tags::F64).is_ok());
        for (dt, tag, _) in BUILTINS {
            assert_eq!(reg.tag_of(&TypeKey::Exact(dt)), Some(tag));
        }
        assert!(reg.reader_for(tags::NULL).is_err());
    }

    #[test]
    fn duplicate_tag_for_other_type() {
        let mut reg = TypeCodecRegistry::with_builtins();
        let err = reg
            .register(
                DataType::Ext("point".into()),
                tags::STR,
                Arc::new(StructCodec::new("point", &[DataType::Float64]).unwrap()),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { tag: tags::STR, .. }));
    }

    #[test]
    fn duplicate_type() {
        let mut reg = TypeCodecRegistry::with_builtins();
        let err = reg
            .register(DataType::Int32, 40, Arc::new(Builtin::I32))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateType { existing_tag: tags::I32, .. }));

        // Same pair twice is still a duplicate type.
        let err = reg
            .register(DataType::Int32, tags::I32, Arc::new(Builtin::I32))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateType { .. }));
    }

    #[test]
    fn null_tag_is_reserved() {
        let mut reg = TypeCodecRegistry::new();
        let err = reg
            .register(DataType::Boolean, tags::NULL, Arc::new(Builtin::Bool))
            .unwrap_err();
        assert!(matches!(err, Error::ReservedTag(0)));
    }

    #[test]
    fn unregistered_and_unknown() {
        let reg = TypeCodecRegistry::with_builtins();
        let ext = Value::Ext(tuplestream_core::ExtValue::new("point", vec![]));
        assert!(matches!(
            reg.writer_for(&ext),
            Err(Error::UnregisteredType { ref type_name }) if type_name == "point"
        ));
        assert!(matches!(reg.reader_for(99), Err(Error::UnknownTag { tag: 99 })));
    }

    #[test]
    fn family_fallback_serves_numerics() {
        let mut reg = TypeCodecRegistry::new();
        reg.register(TypeFamily::Numeric, 9, Arc::new(NumericCodec))
            .unwrap();
        for v in [Value::I32(1), Value::I64(2), Value::F32(3.0), Value::F64(4.0)] {
            let (tag, _) = reg.writer_for(&v).unwrap();
            assert_eq!(tag, 9);
        }
        assert!(reg.writer_for(&Value::Bool(true)).is_err());
    }

    #[test]
    fn exact_wins_over_family() {
        let mut reg = TypeCodecRegistry::new();
        reg.register(TypeFamily::Numeric, 9, Arc::new(NumericCodec))
            .unwrap();
        reg.register(DataType::Int64, 10, Arc::new(Builtin::I64))
            .unwrap();
        assert_eq!(reg.writer_for(&Value::I64(5)).unwrap().0, 10);
        assert_eq!(reg.writer_for(&Value::I32(5)).unwrap().0, 9);
    }
}
