//! TEP-64 token metadata.
//!
//! # Content Layouts
//!
//! - **On-chain (0x00)**: `HashmapE 256 ^Cell` from `sha256(attribute)` to a value cell
//! - **Off-chain (0x01)**: a snake string holding the metadata URI
//!
//! Value cells are snake strings behind a `0x00` byte. Cells with any other
//! leading byte are read as raw UTF-8.

use std::sync::Arc;

use tracing::{debug, warn};
use ton_cell::{Cell, CellBuilder, CellSlice, Dictionary, snake};
use ton_crypto::sha256;

use crate::error::{JettonError, JettonResult};

/// Layout byte of on-chain content.
pub const ONCHAIN_CONTENT_PREFIX: u8 = 0x00;

/// Layout byte of off-chain content.
pub const OFFCHAIN_CONTENT_PREFIX: u8 = 0x01;

/// Prefix of a snake-encoded attribute value.
pub const SNAKE_VALUE_PREFIX: u8 = 0x00;

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_DECIMALS: u8 = 9;

/// Where the decoded fields came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// Attributes stored in the content dictionary.
    OnChain,
    /// Attributes live at `uri`; only the defaults are filled in.
    OffChain { uri: String },
    /// The content could not be decoded; every field is a default.
    Unparsed,
}

/// Decoded jetton metadata with defaults for absent fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JettonMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub description: Option<String>,
    pub image: Option<String>,
    /// `uri` attribute of on-chain content, or the off-chain URI.
    pub uri: Option<String>,
    pub source: MetadataSource,
}

impl Default for JettonMetadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
            description: None,
            image: None,
            uri: None,
            source: MetadataSource::Unparsed,
        }
    }
}

impl JettonMetadata {
    pub fn is_onchain(&self) -> bool {
        self.source == MetadataSource::OnChain
    }

    pub fn is_offchain(&self) -> bool {
        matches!(self.source, MetadataSource::OffChain { .. })
    }
}

/// Dictionary key of a TEP-64 attribute.
pub fn attribute_key(name: &str) -> [u8; 32] {
    sha256(name.as_bytes())
}

/// Decoder for TEP-64 content cells.
pub struct MetadataDecoder;

impl MetadataDecoder {
    /// Decode `content`, falling back to defaults on any error.
    ///
    /// Metadata is cosmetic: a malformed cell is logged and never fails the
    /// caller. An unreadable attribute keeps its default while the readable
    /// ones are still returned.
    pub fn parse(content: &Cell) -> JettonMetadata {
        match Self::decode(content) {
            Ok((metadata, skipped)) => {
                for e in skipped {
                    warn!(error = %e, "Unreadable metadata attribute, keeping default");
                }
                metadata
            }
            Err(e) => {
                warn!(error = %e, "Unreadable jetton metadata, using defaults");
                JettonMetadata::default()
            }
        }
    }

    /// Decode `content`, reporting why it could not be read.
    ///
    /// Any unreadable attribute fails the whole decode.
    pub fn try_parse(content: &Cell) -> JettonResult<JettonMetadata> {
        let (metadata, skipped) = Self::decode(content)?;
        match skipped.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(metadata),
        }
    }

    /// Metadata plus the attribute errors that were skipped over.
    fn decode(content: &Cell) -> JettonResult<(JettonMetadata, Vec<JettonError>)> {
        let mut slice = CellSlice::new(content);
        if slice.bits_left() < 8 {
            return Err(JettonError::EmptyContent);
        }

        match slice.load_u8()? {
            ONCHAIN_CONTENT_PREFIX => Self::parse_onchain(&mut slice),
            OFFCHAIN_CONTENT_PREFIX => {
                let uri = snake::load_snake_string(&mut slice)?;
                let metadata = JettonMetadata {
                    uri: Some(uri.clone()),
                    source: MetadataSource::OffChain { uri },
                    ..JettonMetadata::default()
                };
                Ok((metadata, Vec::new()))
            }
            other => Err(JettonError::InvalidContentType(other)),
        }
    }

    fn parse_onchain(slice: &mut CellSlice) -> JettonResult<(JettonMetadata, Vec<JettonError>)> {
        let dict = Dictionary::load(slice)?;
        let mut metadata = JettonMetadata {
            source: MetadataSource::OnChain,
            ..JettonMetadata::default()
        };
        let mut skipped = Vec::new();

        let mut read = |key: &'static str| -> Option<String> {
            let cell = dict.get(&attribute_key(key))?;
            decode_value(cell)
                .map_err(|reason| skipped.push(JettonError::InvalidAttribute { key, reason }))
                .ok()
        };

        if let Some(name) = read("name") {
            metadata.name = name;
        }
        if let Some(symbol) = read("symbol") {
            metadata.symbol = symbol;
        }
        let decimals = read("decimals");
        metadata.description = read("description");
        metadata.image = read("image");
        metadata.uri = read("uri");

        if let Some(decimals) = decimals {
            match decimals.trim().parse() {
                Ok(value) => metadata.decimals = value,
                Err(_) => skipped.push(JettonError::InvalidAttribute {
                    key: "decimals",
                    reason: format!("not an integer in 0..=255: {decimals:?}"),
                }),
            }
        }

        debug!(
            name = %metadata.name,
            symbol = %metadata.symbol,
            decimals = metadata.decimals,
            attributes = dict.len(),
            skipped = skipped.len(),
            "Decoded on-chain metadata"
        );
        Ok((metadata, skipped))
    }
}

/// Decode one attribute value cell.
fn decode_value(cell: &Cell) -> Result<String, String> {
    let mut slice = CellSlice::new(cell);
    if slice.bits_left() >= 8 && slice.load_u8().map_err(|e| e.to_string())? == SNAKE_VALUE_PREFIX {
        return snake::load_snake_string(&mut slice).map_err(|e| e.to_string());
    }

    let whole = &cell.data()[..cell.bit_len() / 8];
    String::from_utf8(whole.to_vec()).map_err(|e| e.to_string())
}

/// Build an on-chain content cell from `(attribute, value)` pairs.
pub fn build_onchain_content(attributes: &[(&str, &str)]) -> JettonResult<Cell> {
    let mut dict = Dictionary::new();
    for (key, value) in attributes {
        let value = snake::snake_cell(Some(SNAKE_VALUE_PREFIX), value.as_bytes())?;
        dict.insert(attribute_key(key), Arc::new(value));
    }

    let mut builder = CellBuilder::new();
    builder.store_u8(ONCHAIN_CONTENT_PREFIX)?;
    dict.store(&mut builder)?;
    Ok(builder.build()?)
}

/// Build an off-chain content cell pointing at `uri`.
pub fn build_offchain_content(uri: &str) -> JettonResult<Cell> {
    Ok(snake::snake_cell(Some(OFFCHAIN_CONTENT_PREFIX), uri.as_bytes())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_keys() {
        let cases = [
            ("name", "82a3537ff0dbce7eec35d69edc3a189ee6f17d82f353a553f9aa96cb0be3ce89"),
            ("symbol", "b76a7ca153c24671658335bbd08946350ffc621fa1c516e7123095d4ffd5c581"),
            ("decimals", "ee80fd2f1e03480e2282363596ee752d7bb27f50776b95086a0279189675923e"),
            ("description", "c9046f7a37ad0ea7cee73355984fa5428982f8b37c8f7bcec91f7ac71a7cd104"),
            ("image", "6105d6cc76af400325e94d588ce511be5bfdbb73b437dc51eca43917d7a43e3d"),
        ];
        for (name, expected) in cases {
            assert_eq!(hex::encode(attribute_key(name)), expected, "{name}");
        }
    }

    #[test]
    fn test_onchain_metadata() {
        let long_description = "A token for testing snake values. ".repeat(8);
        let content = build_onchain_content(&[
            ("name", "Tether USD"),
            ("symbol", "USD₮"),
            ("decimals", "6"),
            ("description", &long_description),
            ("image", "https://example.org/usdt.png"),
        ])
        .unwrap();

        let metadata = MetadataDecoder::try_parse(&content).unwrap();
        assert!(metadata.is_onchain());
        assert_eq!(metadata.name, "Tether USD");
        assert_eq!(metadata.symbol, "USD₮");
        assert_eq!(metadata.decimals, 6);
        assert_eq!(metadata.description.as_deref(), Some(long_description.as_str()));
        assert_eq!(metadata.image.as_deref(), Some("https://example.org/usdt.png"));
        assert_eq!(metadata.uri, None);
    }

    #[test]
    fn test_missing_attributes_keep_defaults() {
        let content = build_onchain_content(&[("symbol", "ABC")]).unwrap();
        let metadata = MetadataDecoder::parse(&content);
        assert_eq!(metadata.name, "Unknown");
        assert_eq!(metadata.symbol, "ABC");
        assert_eq!(metadata.decimals, 9);
        assert_eq!(metadata.description, None);
    }

    #[test]
    fn test_offchain_metadata() {
        let uri = "https://example.org/jetton-metadata.json";
        let metadata = MetadataDecoder::parse(&build_offchain_content(uri).unwrap());
        assert_eq!(
            metadata.source,
            MetadataSource::OffChain {
                uri: uri.to_string()
            }
        );
        assert_eq!(metadata.uri.as_deref(), Some(uri));
        assert_eq!(metadata.decimals, 9);
    }

    #[test]
    fn test_unknown_prefix_degrades_to_defaults() {
        let mut b = CellBuilder::new();
        b.store_u8(0x02).unwrap();
        b.store_bytes(b"whatever").unwrap();
        let cell = b.build().unwrap();

        assert!(matches!(
            MetadataDecoder::try_parse(&cell),
            Err(JettonError::InvalidContentType(0x02))
        ));
        let metadata = MetadataDecoder::parse(&cell);
        assert_eq!(metadata.name, "Unknown");
        assert_eq!(metadata.symbol, "UNKNOWN");
        assert_eq!(metadata.decimals, 9);
        assert_eq!(metadata.source, MetadataSource::Unparsed);
    }

    #[test]
    fn test_empty_and_truncated_content() {
        assert!(matches!(
            MetadataDecoder::try_parse(&Cell::empty()),
            Err(JettonError::EmptyContent)
        ));

        // on-chain prefix claiming a dictionary root that is missing
        let mut b = CellBuilder::new();
        b.store_u8(0x00).unwrap();
        b.store_bit(true).unwrap();
        let cell = b.build().unwrap();
        assert!(MetadataDecoder::try_parse(&cell).is_err());
        assert_eq!(MetadataDecoder::parse(&cell), JettonMetadata::default());
    }

    #[test]
    fn test_raw_value_without_snake_prefix() {
        let mut raw = CellBuilder::new();
        raw.store_bytes(b"RAW").unwrap();
        let mut dict = Dictionary::new();
        dict.insert(attribute_key("symbol"), Arc::new(raw.build().unwrap()));

        let mut b = CellBuilder::new();
        b.store_u8(0x00).unwrap();
        dict.store(&mut b).unwrap();
        let metadata = MetadataDecoder::try_parse(&b.build().unwrap()).unwrap();
        assert_eq!(metadata.symbol, "RAW");
    }

    #[test]
    fn test_bad_decimals_is_error() {
        let content = build_onchain_content(&[("decimals", "nine")]).unwrap();
        assert!(matches!(
            MetadataDecoder::try_parse(&content),
            Err(JettonError::InvalidAttribute { key: "decimals", .. })
        ));
        assert_eq!(MetadataDecoder::parse(&content).decimals, 9);
    }

    #[test]
    fn test_bad_attribute_keeps_readable_ones() {
        let mut bad_name = CellBuilder::new();
        bad_name.store_u8(SNAKE_VALUE_PREFIX).unwrap();
        bad_name.store_bytes(&[0xFF, 0xFE]).unwrap();

        let mut dict = Dictionary::new();
        for (key, value) in [("symbol", "TST"), ("image", "https://example.org/t.png")] {
            dict.insert(
                attribute_key(key),
                Arc::new(snake::snake_cell(Some(SNAKE_VALUE_PREFIX), value.as_bytes()).unwrap()),
            );
        }
        dict.insert(attribute_key("name"), Arc::new(bad_name.build().unwrap()));
        dict.insert(
            attribute_key("decimals"),
            Arc::new(snake::snake_cell(Some(SNAKE_VALUE_PREFIX), b"lots").unwrap()),
        );
        let mut b = CellBuilder::new();
        b.store_u8(ONCHAIN_CONTENT_PREFIX).unwrap();
        dict.store(&mut b).unwrap();
        let content = b.build().unwrap();

        assert!(matches!(
            MetadataDecoder::try_parse(&content),
            Err(JettonError::InvalidAttribute { key: "name", .. })
        ));

        let metadata = MetadataDecoder::parse(&content);
        assert_eq!(metadata.source, MetadataSource::OnChain);
        assert_eq!(metadata.name, DEFAULT_NAME);
        assert_eq!(metadata.decimals, DEFAULT_DECIMALS);
        assert_eq!(metadata.symbol, "TST");
        assert_eq!(metadata.image.as_deref(), Some("https://example.org/t.png"));
    }
}
