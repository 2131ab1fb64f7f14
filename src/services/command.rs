use crate::error::UnzipError;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;
use std::str::FromStr;

/// URL-safe base64 that emits padding but accepts tokens with or without it.
const BUCKET_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const VERB: &str = "unzip";
const BUCKET_PARAM: &str = "bucket";
const OVERWRITE_PARAM: &str = "overwrite";

/// Decoded form of `unzip/bucket/<base64url>[/overwrite/<n>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnzipCommand {
    pub bucket: String,
    pub overwrite: bool,
}

impl UnzipCommand {
    pub fn new(bucket: impl Into<String>, overwrite: bool) -> Self {
        Self {
            bucket: bucket.into(),
            overwrite,
        }
    }

    /// Validates the command structure, then decodes its parameters.
    pub fn parse(cmd: &str) -> Result<Self, UnzipError> {
        let segments: Vec<&str> = cmd.split('/').collect();
        let (token, flag) = match segments.as_slice() {
            [VERB, BUCKET_PARAM, token] if is_bucket_token(token) => (*token, None),
            [VERB, BUCKET_PARAM, token, OVERWRITE_PARAM, flag]
                if is_bucket_token(token) && is_integer(flag) =>
            {
                (*token, Some(*flag))
            }
            _ => return Err(UnzipError::InvalidCommand),
        };

        let bucket = BUCKET_ENCODING
            .decode(token)
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
            .filter(|bucket| !bucket.is_empty())
            .ok_or(UnzipError::InvalidBucket)?;

        let overwrite = match flag {
            Some(flag) => flag.parse::<i64>().map_err(|_| UnzipError::InvalidOverwrite)? == 1,
            None => false,
        };

        Ok(Self { bucket, overwrite })
    }

    /// Inverse of [`UnzipCommand::parse`].
    pub fn encode(&self) -> String {
        let token = BUCKET_ENCODING.encode(self.bucket.as_bytes());
        if self.overwrite {
            format!("{VERB}/{BUCKET_PARAM}/{token}/{OVERWRITE_PARAM}/1")
        } else {
            format!("{VERB}/{BUCKET_PARAM}/{token}")
        }
    }
}

impl FromStr for UnzipCommand {
    type Err = UnzipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UnzipCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn is_bucket_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'='))
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
