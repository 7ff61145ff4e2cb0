//! Remote object reference
//!
//! A `RemoteReference` is the wire-transmissible stand-in for a local proxy.
//! It carries everything a remote caller needs to address the home or an
//! instance of a deployed component.
//!
//! Binary layout (all integers in the requested byte order):
//!
//! ```text
//! u32  signature ("EJBR")
//! u32  role flag (1 = home, 2 = remote)
//! str  type id
//! str  container id
//! str  endpoint
//! blob object key
//! ```
//!
//! `str` and `blob` are a u32 length followed by that many bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt::Write as _;

use super::error::{BridgeError, Result};
use super::identifiers::{ContainerId, ProxyRole};

/// Reference signature ("EJBR" in little-endian)
pub const REFERENCE_SIGNATURE: u32 = 0x52424A45;

/// Wire-transmissible reference to a home or component instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteReference {
    /// Repository/type ID of the referenced interface
    pub type_id: String,
    /// Container the reference resolves into
    pub container_id: ContainerId,
    /// Home or instance reference
    pub role: ProxyRole,
    /// Advertised endpoint (host:port)
    pub endpoint: String,
    /// Object key within the endpoint
    pub object_key: Bytes,
}

impl RemoteReference {
    pub fn new(
        type_id: impl Into<String>,
        container_id: ContainerId,
        role: ProxyRole,
        endpoint: impl Into<String>,
        object_key: Bytes,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            container_id,
            role,
            endpoint: endpoint.into(),
            object_key,
        }
    }

    /// Encode to buffer
    pub fn encode<B: BufMut>(&self, buf: &mut B, little_endian: bool) -> Result<()> {
        put_u32(buf, REFERENCE_SIGNATURE, little_endian);
        put_u32(buf, self.role.flag(), little_endian);
        put_blob(buf, self.type_id.as_bytes(), little_endian)?;
        put_blob(buf, self.container_id.as_str().as_bytes(), little_endian)?;
        put_blob(buf, self.endpoint.as_bytes(), little_endian)?;
        put_blob(buf, &self.object_key, little_endian)
    }

    /// Decode from buffer
    pub fn decode<B: Buf>(buf: &mut B, little_endian: bool) -> Result<Self> {
        let signature = get_u32(buf, little_endian)?;
        if signature != REFERENCE_SIGNATURE {
            return Err(BridgeError::InvalidReference(format!(
                "bad signature 0x{:08x}",
                signature
            )));
        }

        let flag = get_u32(buf, little_endian)?;
        let role = ProxyRole::from_flag(flag)
            .ok_or_else(|| BridgeError::InvalidReference(format!("unknown role flag {}", flag)))?;

        let type_id = get_string(buf, little_endian)?;
        let container_id = ContainerId::new(get_string(buf, little_endian)?);
        let endpoint = get_string(buf, little_endian)?;
        let object_key = get_blob(buf, little_endian)?;

        Ok(Self {
            type_id,
            container_id,
            role,
            endpoint,
            object_key,
        })
    }

    /// Encode into a fresh little-endian buffer
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(
            16 + self.type_id.len()
                + self.container_id.as_str().len()
                + self.endpoint.len()
                + self.object_key.len(),
        );
        self.encode(&mut buf, true)?;
        Ok(buf.freeze())
    }

    /// Decode from a little-endian buffer
    pub fn from_bytes(mut data: Bytes) -> Result<Self> {
        Self::decode(&mut data, true)
    }

    /// String form: `corbaloc:iiop:<endpoint>/<hex object key>`
    pub fn to_corbaloc(&self) -> String {
        let mut s = format!("corbaloc:iiop:{}/", self.endpoint);
        for b in self.object_key.iter() {
            let _ = write!(s, "{:02x}", b);
        }
        s
    }
}

pub(crate) fn put_u32<B: BufMut>(buf: &mut B, v: u32, little_endian: bool) {
    if little_endian {
        buf.put_u32_le(v);
    } else {
        buf.put_u32(v);
    }
}

/// Write a u32 length prefix, refusing lengths the prefix cannot hold
pub(crate) fn put_len<B: BufMut>(buf: &mut B, len: usize, little_endian: bool) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| BridgeError::LengthOverflow(len))?;
    put_u32(buf, len, little_endian);
    Ok(())
}

pub(crate) fn put_blob<B: BufMut>(buf: &mut B, data: &[u8], little_endian: bool) -> Result<()> {
    put_len(buf, data.len(), little_endian)?;
    buf.put_slice(data);
    Ok(())
}

pub(crate) fn get_u32<B: Buf>(buf: &mut B, little_endian: bool) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(BridgeError::BufferUnderflow {
            needed: 4,
            have: buf.remaining(),
        });
    }
    Ok(if little_endian {
        buf.get_u32_le()
    } else {
        buf.get_u32()
    })
}

pub(crate) fn get_blob<B: Buf>(buf: &mut B, little_endian: bool) -> Result<Bytes> {
    let len = get_u32(buf, little_endian)? as usize;
    if buf.remaining() < len {
        return Err(BridgeError::BufferUnderflow {
            needed: len,
            have: buf.remaining(),
        });
    }
    Ok(buf.copy_to_bytes(len))
}

pub(crate) fn get_string<B: Buf>(buf: &mut B, little_endian: bool) -> Result<String> {
    let data = get_blob(buf, little_endian)?;
    String::from_utf8(data.to_vec())
        .map_err(|e| BridgeError::InvalidReference(format!("invalid UTF-8: {}", e)))
}
