//! Document parsing into graph entities.
//!
//! A codec turns the content of one document into the [`Entity`] values it declares, in
//! document order. Codecs see one file at a time and never consult the store; cross-document
//! linking is the resolver's job.
//!
//! The built-in [`XmlCodec`] implements the element conventions described by
//! [`GraphConfig`](crate::config::GraphConfig):
//!
//! ```rust
//! use xmlgraph::{codec::{EntityCodec, XmlCodec}, config::GraphConfig};
//! use std::path::Path;
//!
//! let codec = XmlCodec::new(GraphConfig::default());
//! let entities = codec
//!     .extract(
//!         r#"<Person Guid="p1" Name="Alice"><Person Guid="p2" Name="Bob"/></Person>"#,
//!         Path::new("people.xml"),
//!     )
//!     .unwrap();
//! assert_eq!(entities.len(), 2);
//! assert_eq!(entities[1].parent_id.as_deref(), Some("p1"));
//! ```

use std::path::Path;

use crate::{entity::Entity, error::GraphCacheError};

pub mod xml;

pub use xml::XmlCodec;

/// Decodes raw document bytes. A UTF-16 byte order mark (either endianness) selects UTF-16,
/// anything else must be UTF-8. A UTF-8 byte order mark is dropped.
pub fn decode_document(bytes: &[u8], source: &Path) -> Result<String, GraphCacheError> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes, source),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes, source),
        [0xEF, 0xBB, 0xBF, rest @ ..] => decode_utf8(rest, source),
        _ => decode_utf8(bytes, source),
    }
}

fn decode_utf8(bytes: &[u8], source: &Path) -> Result<String, GraphCacheError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| GraphCacheError::extraction(source, None, format!("invalid UTF-8: {e}")))
}

fn decode_utf16(
    bytes: &[u8],
    unit: fn([u8; 2]) -> u16,
    source: &Path,
) -> Result<String, GraphCacheError> {
    if bytes.len() % 2 != 0 {
        return Err(GraphCacheError::extraction(
            source,
            None,
            "UTF-16 document has an odd number of bytes",
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| GraphCacheError::extraction(source, None, format!("invalid UTF-16: {e}")))
}

pub trait EntityCodec: Send + Sync {
    /// Extracts every entity declared in `content`. Any failure fails the whole document so
    /// a file contributes either all of its entities or none.
    fn extract(&self, content: &str, source: &Path) -> Result<Vec<Entity>, GraphCacheError>;
}
