use std::fmt;

use crate::error::IgluError;

/// A parsed `iglu:{vendor}/{name}/{format}/{version}` reference. `format` is
/// always `jsonschema` in this system; anything else fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IgluReference {
    pub vendor: String,
    pub name: String,
    pub format: String,
    pub version: String,
}

impl IgluReference {
    pub fn from_string(schema: &str) -> Result<Self, IgluError> {
        let path = schema.strip_prefix("iglu:").ok_or_else(|| IgluError::InvalidReference {
            reason: format!("not an iglu reference: {schema}"),
        })?;
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != 4 {
            return Err(IgluError::InvalidReference {
                reason: format!("expected 4 path segments, got {}: {schema}", parts.len()),
            });
        }
        if parts[2] != "jsonschema" {
            return Err(IgluError::InvalidReference {
                reason: format!("unsupported schema format: {}", parts[2]),
            });
        }
        Ok(IgluReference {
            vendor: parts[0].to_string(),
            name: parts[1].to_string(),
            format: parts[2].to_string(),
            version: parts[3].to_string(),
        })
    }

    pub fn to_path(&self) -> String {
        format!("{}/{}/{}/{}", self.vendor, self.name, self.format, self.version)
    }
}

impl fmt::Display for IgluReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iglu:{}", self.to_path())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parses_a_well_formed_reference() {
        let r = IgluReference::from_string(
            "iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4",
        )
        .unwrap();
        assert_eq!(r.vendor, "com.snowplowanalytics.snowplow");
        assert_eq!(r.name, "payload_data");
        assert_eq!(r.version, "1-0-4");
        assert_eq!(r.to_string(), "iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4");
    }

    #[test]
    fn test_rejects_missing_prefix() {
        assert!(IgluReference::from_string("com.acme/foo/jsonschema/1-0-0").is_err());
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        assert!(IgluReference::from_string("iglu:com.acme/foo/jsonschema").is_err());
    }

    #[test]
    fn test_rejects_non_jsonschema_format() {
        assert!(IgluReference::from_string("iglu:com.acme/foo/thrift/1-0-0").is_err());
    }
}
