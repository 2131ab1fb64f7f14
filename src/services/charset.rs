use encoding_rs::Encoding;
use tracing::warn;

/// Charset assumed for archive entry names that are not valid UTF-8.
pub static FALLBACK_CHARSET: &Encoding = &encoding_rs::GBK_INIT;

/// Strategy turning raw archive entry names into UTF-8 object keys.
pub trait FilenameDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> String;
}

/// Keeps UTF-8 names as-is and converts anything else from a fixed legacy
/// charset.
///
/// Conversion is best-effort: byte sequences invalid in the legacy charset
/// become U+FFFD and a warning is logged.
#[derive(Debug, Clone, Copy)]
pub struct LegacyCharsetDecoder {
    fallback: &'static Encoding,
}

impl LegacyCharsetDecoder {
    pub fn new(fallback: &'static Encoding) -> Self {
        Self { fallback }
    }

    /// Resolves a WHATWG charset label such as `gbk` or `shift_jis`.
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self::new)
    }

    pub fn fallback(&self) -> &'static Encoding {
        self.fallback
    }
}

impl Default for LegacyCharsetDecoder {
    fn default() -> Self {
        Self::new(FALLBACK_CHARSET)
    }
}

impl FilenameDecoder for LegacyCharsetDecoder {
    fn decode(&self, raw: &[u8]) -> String {
        if let Ok(name) = std::str::from_utf8(raw) {
            return name.to_owned();
        }

        let (name, had_errors) = self.fallback.decode_without_bom_handling(raw);
        if had_errors {
            warn!(
                "Entry name is not valid {}, using lossy conversion: {}",
                self.fallback.name(),
                name
            );
        }
        name.into_owned()
    }
}
