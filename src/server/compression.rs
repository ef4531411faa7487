//! Response compression setting.

use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;

/// Content encoding applied to static file responses.
///
/// Negotiated against the request's `Accept-Encoding`; clients that do not
/// accept gzip always get the identity encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Identity,
    #[default]
    Gzip,
}

impl Compression {
    pub fn from_enabled(gzip: bool) -> Self {
        if gzip { Self::Gzip } else { Self::Identity }
    }

    pub fn layer(self) -> CompressionLayer {
        CompressionLayer::new().gzip(self == Self::Gzip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_enabled() {
        assert_eq!(Compression::from_enabled(true), Compression::Gzip);
        assert_eq!(Compression::from_enabled(false), Compression::Identity);
    }

    #[test]
    fn test_serialized_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            compression: Compression,
        }

        let toml = toml::to_string(&Wrapper {
            compression: Compression::Identity,
        })
        .unwrap();
        assert_eq!(toml.trim(), r#"compression = "identity""#);

        let parsed: Wrapper = toml::from_str(r#"compression = "gzip""#).unwrap();
        assert_eq!(parsed.compression, Compression::Gzip);
    }
}
