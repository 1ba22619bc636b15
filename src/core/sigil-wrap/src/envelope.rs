//! Serialized form of a key before it is encrypted.
//!
//! Layout:
//!
//! ```text
//! version (1) | name length (1) | algorithm name | kind (1) | field count (1)
//!     | { field length (2, big endian) | field bytes }*
//! ```
//!
//! Fields are the big-endian component values from
//! [`KeyComponents::to_fields`].

use sigil_crypto::{KeyAlgorithm, KeyComponents, KeyKind, KeyMaterial};
use zeroize::Zeroizing;

use crate::error::WrapError;

const ENVELOPE_VERSION: u8 = 1;

fn kind_tag(kind: KeyKind) -> u8 {
    match kind {
        KeyKind::Secret => 0,
        KeyKind::Public => 1,
        KeyKind::Private => 2,
    }
}

fn kind_from_tag(tag: u8) -> Result<KeyKind, WrapError> {
    match tag {
        0 => Ok(KeyKind::Secret),
        1 => Ok(KeyKind::Public),
        2 => Ok(KeyKind::Private),
        other => Err(WrapError::InvalidWrappedKey(format!(
            "unknown key kind tag {other}"
        ))),
    }
}

/// Serializes `key`. The result holds key bytes and is wiped on drop.
pub(crate) fn encode(key: &KeyMaterial) -> Result<Zeroizing<Vec<u8>>, WrapError> {
    let name = key.algorithm().name().as_bytes();
    let fields = key.components().to_fields();
    let field_count = u8::try_from(fields.len())
        .map_err(|_| WrapError::InvalidWrappedKey("too many key fields".into()))?;

    let mut out = Zeroizing::new(Vec::with_capacity(
        4 + name.len() + fields.iter().map(|f| f.len() + 2).sum::<usize>(),
    ));
    out.push(ENVELOPE_VERSION);
    out.push(name.len() as u8);
    out.extend_from_slice(name);
    out.push(kind_tag(key.kind()));
    out.push(field_count);

    for field in &fields {
        let len = u16::try_from(field.len())
            .map_err(|_| WrapError::InvalidWrappedKey("key field too large".into()))?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(field);
    }

    Ok(out)
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], WrapError> {
        if self.bytes.len() < n {
            return Err(WrapError::InvalidWrappedKey("truncated key envelope".into()));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn byte(&mut self) -> Result<u8, WrapError> {
        Ok(self.take(1)?[0])
    }
}

/// Header of a decoded envelope plus the raw component fields.
pub(crate) struct Decoded {
    pub algorithm: KeyAlgorithm,
    pub kind: KeyKind,
    pub fields: Vec<Zeroizing<Vec<u8>>>,
}

impl Decoded {
    /// Rebuilds the key, validating its components.
    pub(crate) fn into_key(self) -> Result<KeyMaterial, WrapError> {
        let components = KeyComponents::from_fields(self.algorithm, self.kind, &self.fields)?;
        Ok(KeyMaterial::reconstruct(
            self.algorithm,
            self.kind,
            components,
        )?)
    }
}

/// Parses an envelope produced by [`encode`].
pub(crate) fn decode(bytes: &[u8]) -> Result<Decoded, WrapError> {
    let mut cursor = Cursor { bytes };

    let version = cursor.byte()?;
    if version != ENVELOPE_VERSION {
        return Err(WrapError::InvalidWrappedKey(format!(
            "unsupported envelope version {version}"
        )));
    }

    let name_len = cursor.byte()? as usize;
    let name = std::str::from_utf8(cursor.take(name_len)?)
        .map_err(|_| WrapError::InvalidWrappedKey("algorithm name is not UTF-8".into()))?;
    let algorithm: KeyAlgorithm = name
        .parse()
        .map_err(|_| WrapError::InvalidWrappedKey(format!("unknown key algorithm {name}")))?;
    let kind = kind_from_tag(cursor.byte()?)?;

    let count = cursor.byte()? as usize;
    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        let len_bytes = cursor.take(2)?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        fields.push(Zeroizing::new(cursor.take(len)?.to_vec()));
    }

    if !cursor.bytes.is_empty() {
        return Err(WrapError::InvalidWrappedKey(
            "trailing bytes after key envelope".into(),
        ));
    }

    Ok(Decoded {
        algorithm,
        kind,
        fields,
    })
}
