//! Legacy byte encodings for embedded annotation strings.
//!
//! Library files carry no encoding marker of their own; the caller names
//! one by WHATWG label (`"shift_jis"`, `"euc-kr"`, `"gbk"`, `"utf-8"`, ...).

use crate::LibraryError;
use encoding_rs::Encoding;
use std::fmt;

/// A resolved text encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    pub const UTF_8: TextEncoding = TextEncoding(&encoding_rs::UTF_8_INIT);
    pub const SHIFT_JIS: TextEncoding = TextEncoding(&encoding_rs::SHIFT_JIS_INIT);
    pub const EUC_KR: TextEncoding = TextEncoding(&encoding_rs::EUC_KR_INIT);
    pub const GBK: TextEncoding = TextEncoding(&encoding_rs::GBK_INIT);

    /// Resolve a WHATWG encoding label, case-insensitively.
    pub fn for_label(label: &str) -> Result<Self, LibraryError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| LibraryError::UnknownEncoding(label.to_string()))
    }

    /// Canonical name, as written into charset declarations.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Decode bytes, replacing malformed sequences. No BOM sniffing.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        self.0.decode_without_bom_handling(bytes).0.into_owned()
    }

    /// Encode text, replacing unmappable characters with numeric references.
    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        self.0.encode(text).0.into_owned()
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextEncoding({})", self.name())
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
