pub mod avro;
pub mod error;
pub mod payload;
pub mod split;
pub mod thrift;

pub use error::CodecError;
pub use payload::{CollectorPayload, ErrorPayload};

/// Wire format in use for the raw lane within one deployment. Chosen once by
/// configuration and applied end-to-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Thrift,
    Avro,
}

impl CollectorPayload {
    pub fn encode(&self, format: Format) -> Vec<u8> {
        match format {
            Format::Thrift => thrift::encode(self),
            Format::Avro => avro::encode(self),
        }
    }

    pub fn decode(bytes: &[u8], format: Format) -> Result<CollectorPayload, CodecError> {
        match format {
            Format::Thrift => thrift::decode(bytes),
            Format::Avro => avro::decode(bytes),
        }
    }

    pub fn split_and_serialize(
        &self,
        format: Format,
        max_size: usize,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        split::split_and_serialize(self, format, max_size)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codec_round_trip_both_formats() {
        let payload = CollectorPayload {
            schema: payload::THRIFT_SCHEMA.to_string(),
            ip_address: "192.0.2.1".to_string(),
            timestamp: 42,
            encoding: "UTF-8".to_string(),
            collector: "ssc".to_string(),
            user_agent: Some("curl/8.0".to_string()),
            ..Default::default()
        };

        for format in [Format::Thrift, Format::Avro] {
            let encoded = payload.encode(format);
            let decoded = CollectorPayload::decode(&encoded, format).unwrap();
            assert_eq!(payload.ip_address, decoded.ip_address);
            assert_eq!(payload.timestamp, decoded.timestamp);
            assert_eq!(payload.user_agent, decoded.user_agent);
        }
    }
}
