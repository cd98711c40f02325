use thiserror::Error;

/// Result type local to tuplestream-codec.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no codec registered for value type '{type_name}'")]
    UnregisteredType { type_name: String },

    #[error("unknown type tag {tag} on the wire (corrupt stream or mismatched codec registrations)")]
    UnknownTag { tag: u32 },

    #[error("type tag {tag} is already bound to '{existing}', cannot bind it to '{requested}'")]
    DuplicateTag {
        tag: u32,
        existing: String,
        requested: String,
    },

    #[error("type '{key}' is already registered with tag {existing_tag}")]
    DuplicateType { key: String, existing_tag: u32 },

    #[error("type tag {0} is reserved for null")]
    ReservedTag(u32),

    #[error("{what} of {len} exceeds limit {limit}")]
    LimitExceeded {
        what: &'static str,
        len: u64,
        limit: usize,
    },

    #[error("codec for '{codec}' cannot handle a value of type '{found}'")]
    CodecMismatch { codec: String, found: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("codec i/o: {0}")]
    Io(#[from] std::io::Error),
}
