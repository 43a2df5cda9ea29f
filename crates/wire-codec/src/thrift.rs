//! Minimal Apache Thrift TBinaryProtocol reader/writer, scoped to exactly the
//! fields of the Snowplow `CollectorPayload` struct. No generated-code
//! dependency: the struct is small and fixed, so round-tripping it by hand
//! keeps the wire bytes identical to the canonical Stream Collector encoding.

use crate::error::CodecError;
use crate::payload::CollectorPayload;

const TYPE_STOP: u8 = 0;
const TYPE_BOOL: u8 = 2;
const TYPE_I16: u8 = 6;
const TYPE_I32: u8 = 8;
const TYPE_I64: u8 = 10;
const TYPE_STRING: u8 = 11;
const TYPE_STRUCT: u8 = 12;
const TYPE_MAP: u8 = 13;
const TYPE_SET: u8 = 14;
const TYPE_LIST: u8 = 15;

const FID_SCHEMA: i16 = 31337;
const FID_IP_ADDRESS: i16 = 100;
const FID_TIMESTAMP: i16 = 200;
const FID_ENCODING: i16 = 210;
const FID_COLLECTOR: i16 = 220;
const FID_USER_AGENT: i16 = 300;
const FID_REFERER_URI: i16 = 310;
const FID_PATH: i16 = 320;
const FID_QUERYSTRING: i16 = 330;
const FID_BODY: i16 = 340;
const FID_HEADERS: i16 = 350;
const FID_CONTENT_TYPE: i16 = 360;
const FID_HOSTNAME: i16 = 400;
const FID_NETWORK_USER_ID: i16 = 410;

pub fn encode(payload: &CollectorPayload) -> Vec<u8> {
    let mut buf = Vec::new();

    write_string_field(&mut buf, FID_SCHEMA, payload.schema.as_bytes());
    write_string_field(&mut buf, FID_IP_ADDRESS, payload.ip_address.as_bytes());
    write_i64_field(&mut buf, FID_TIMESTAMP, payload.timestamp);
    write_string_field(&mut buf, FID_ENCODING, payload.encoding.as_bytes());
    write_string_field(&mut buf, FID_COLLECTOR, payload.collector.as_bytes());

    if let Some(v) = &payload.user_agent {
        write_string_field(&mut buf, FID_USER_AGENT, v.as_bytes());
    }
    if let Some(v) = &payload.referer_uri {
        write_string_field(&mut buf, FID_REFERER_URI, v.as_bytes());
    }
    if let Some(v) = &payload.path {
        write_string_field(&mut buf, FID_PATH, v.as_bytes());
    }
    if let Some(v) = &payload.querystring {
        write_string_field(&mut buf, FID_QUERYSTRING, v.as_bytes());
    }
    if let Some(v) = &payload.body {
        write_string_field(&mut buf, FID_BODY, v);
    }
    if let Some(v) = &payload.headers {
        write_list_field(&mut buf, FID_HEADERS, v);
    }
    if let Some(v) = &payload.content_type {
        write_string_field(&mut buf, FID_CONTENT_TYPE, v.as_bytes());
    }
    if let Some(v) = &payload.hostname {
        write_string_field(&mut buf, FID_HOSTNAME, v.as_bytes());
    }
    if let Some(v) = &payload.network_user_id {
        write_string_field(&mut buf, FID_NETWORK_USER_ID, v.as_bytes());
    }

    buf.push(TYPE_STOP);
    buf
}

pub fn decode(bytes: &[u8]) -> Result<CollectorPayload, CodecError> {
    let mut r = Reader::new(bytes);
    let mut payload = CollectorPayload::default();

    loop {
        let field_type = r.read_u8()?;
        if field_type == TYPE_STOP {
            break;
        }
        let field_id = r.read_i16()?;

        match (field_id, field_type) {
            (FID_SCHEMA, TYPE_STRING) => payload.schema = r.read_utf8_string()?,
            (FID_IP_ADDRESS, TYPE_STRING) => payload.ip_address = r.read_utf8_string()?,
            (FID_TIMESTAMP, TYPE_I64) => payload.timestamp = r.read_i64()?,
            (FID_ENCODING, TYPE_STRING) => payload.encoding = r.read_utf8_string()?,
            (FID_COLLECTOR, TYPE_STRING) => payload.collector = r.read_utf8_string()?,
            (FID_USER_AGENT, TYPE_STRING) => payload.user_agent = Some(r.read_utf8_string()?),
            (FID_REFERER_URI, TYPE_STRING) => payload.referer_uri = Some(r.read_utf8_string()?),
            (FID_PATH, TYPE_STRING) => payload.path = Some(r.read_utf8_string()?),
            (FID_QUERYSTRING, TYPE_STRING) => payload.querystring = Some(r.read_utf8_string()?),
            (FID_BODY, TYPE_STRING) => payload.body = Some(r.read_bytes_field()?),
            (FID_HEADERS, TYPE_LIST) => payload.headers = Some(r.read_string_list()?),
            (FID_CONTENT_TYPE, TYPE_STRING) => payload.content_type = Some(r.read_utf8_string()?),
            (FID_HOSTNAME, TYPE_STRING) => payload.hostname = Some(r.read_utf8_string()?),
            (FID_NETWORK_USER_ID, TYPE_STRING) => {
                payload.network_user_id = Some(r.read_utf8_string()?)
            }
            (_, t) => r.skip(t)?,
        }
    }

    if payload.timestamp < 0 {
        return Err(CodecError::Decode {
            format: "thrift",
            reason: format!("timestamp must be non-negative, got {}", payload.timestamp),
        });
    }

    Ok(payload)
}

fn write_string_field(buf: &mut Vec<u8>, field_id: i16, value: &[u8]) {
    buf.push(TYPE_STRING);
    buf.extend_from_slice(&field_id.to_be_bytes());
    write_binary(buf, value);
}

fn write_i64_field(buf: &mut Vec<u8>, field_id: i16, value: i64) {
    buf.push(TYPE_I64);
    buf.extend_from_slice(&field_id.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_list_field(buf: &mut Vec<u8>, field_id: i16, items: &[String]) {
    buf.push(TYPE_LIST);
    buf.extend_from_slice(&field_id.to_be_bytes());
    buf.push(TYPE_STRING);
    buf.extend_from_slice(&(items.len() as i32).to_be_bytes());
    for item in items {
        write_binary(buf, item.as_bytes());
    }
}

fn write_binary(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend_from_slice(&(value.len() as i32).to_be_bytes());
    buf.extend_from_slice(value);
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + n > self.bytes.len() {
            return Err(CodecError::Decode {
                format: "thrift",
                reason: "unexpected end of input".to_string(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_bytes_field(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(CodecError::Decode {
                format: "thrift",
                reason: format!("negative string length {len}"),
            });
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    fn read_utf8_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_bytes_field()?;
        String::from_utf8(bytes).map_err(|e| CodecError::Decode {
            format: "thrift",
            reason: format!("invalid UTF-8 in string field: {e}"),
        })
    }

    fn read_string_list(&mut self) -> Result<Vec<String>, CodecError> {
        let elem_type = self.read_u8()?;
        let len = self.read_i32()?;
        if len < 0 {
            return Err(CodecError::Decode {
                format: "thrift",
                reason: format!("negative list length {len}"),
            });
        }
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            if elem_type == TYPE_STRING {
                out.push(self.read_utf8_string()?);
            } else {
                self.skip(elem_type)?;
            }
        }
        Ok(out)
    }

    /// Skips a value of the given wire type, for forward-compatibility with
    /// fields this codec doesn't know about.
    fn skip(&mut self, field_type: u8) -> Result<(), CodecError> {
        match field_type {
            TYPE_BOOL => {
                self.read_u8()?;
            }
            3 /* byte */ => {
                self.read_u8()?;
            }
            4 /* double */ => {
                self.take(8)?;
            }
            TYPE_I16 => {
                self.read_i16()?;
            }
            TYPE_I32 => {
                self.read_i32()?;
            }
            TYPE_I64 => {
                self.read_i64()?;
            }
            TYPE_STRING => {
                self.read_bytes_field()?;
            }
            TYPE_STRUCT => loop {
                let t = self.read_u8()?;
                if t == TYPE_STOP {
                    break;
                }
                self.read_i16()?;
                self.skip(t)?;
            },
            TYPE_MAP => {
                let key_type = self.read_u8()?;
                let val_type = self.read_u8()?;
                let len = self.read_i32()?;
                for _ in 0..len.max(0) {
                    self.skip(key_type)?;
                    self.skip(val_type)?;
                }
            }
            TYPE_SET | TYPE_LIST => {
                let elem_type = self.read_u8()?;
                let len = self.read_i32()?;
                for _ in 0..len.max(0) {
                    self.skip(elem_type)?;
                }
            }
            other => {
                return Err(CodecError::Decode {
                    format: "thrift",
                    reason: format!("unsupported wire type {other} while skipping"),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> CollectorPayload {
        CollectorPayload {
            schema: crate::payload::THRIFT_SCHEMA.to_string(),
            ip_address: "127.0.0.1".to_string(),
            timestamp: 1_700_000_000_000,
            encoding: "UTF-8".to_string(),
            collector: "ssc-2.5.0-kafka".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            referer_uri: None,
            path: Some("/com.snowplowanalytics.snowplow/tp2".to_string()),
            querystring: None,
            body: Some(br#"{"schema":"s","data":[]}"#.to_vec()),
            headers: Some(vec![
                "Content-Type: application/json".to_string(),
                "X-Forwarded-For: 1.2.3.4".to_string(),
            ]),
            content_type: Some("application/json".to_string()),
            hostname: Some("collector.example.com".to_string()),
            network_user_id: Some("abc-123".to_string()),
        }
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let original = sample();
        let encoded = encode(&original);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_round_trip_with_all_optionals_absent() {
        let original = CollectorPayload {
            schema: crate::payload::THRIFT_SCHEMA.to_string(),
            ip_address: "10.0.0.1".to_string(),
            timestamp: 0,
            encoding: "UTF-8".to_string(),
            collector: "ssc".to_string(),
            ..Default::default()
        };
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_negative_timestamp_is_rejected() {
        let mut buf = Vec::new();
        buf.push(TYPE_I64);
        buf.extend_from_slice(&FID_TIMESTAMP.to_be_bytes());
        buf.extend_from_slice(&(-1i64).to_be_bytes());
        buf.push(TYPE_STOP);
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn test_truncated_input_is_a_decode_error() {
        let encoded = encode(&sample());
        let truncated = &encoded[..encoded.len() - 5];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn test_unknown_field_is_skipped() {
        let mut buf = Vec::new();
        buf.push(TYPE_I32);
        buf.extend_from_slice(&9999i16.to_be_bytes());
        buf.extend_from_slice(&42i32.to_be_bytes());
        buf.push(TYPE_STRING);
        buf.extend_from_slice(&FID_IP_ADDRESS.to_be_bytes());
        write_binary(&mut buf, b"127.0.0.1");
        buf.push(TYPE_I64);
        buf.extend_from_slice(&FID_TIMESTAMP.to_be_bytes());
        buf.extend_from_slice(&0i64.to_be_bytes());
        buf.push(TYPE_STRING);
        buf.extend_from_slice(&FID_ENCODING.to_be_bytes());
        write_binary(&mut buf, b"UTF-8");
        buf.push(TYPE_STRING);
        buf.extend_from_slice(&FID_COLLECTOR.to_be_bytes());
        write_binary(&mut buf, b"ssc");
        buf.push(TYPE_STOP);

        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.ip_address, "127.0.0.1");
    }
}
