//! MaxMind GeoLite2-City lookups on `user_ipaddress`, run after the
//! transform stage has already normalised the IP string.

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;
use std::path::Path;

use crate::{EnrichError, Enrichment};

pub struct GeoIpEnrichment {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl GeoIpEnrichment {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, EnrichError> {
        let reader = maxminddb::Reader::open_readfile(db_path)?;
        Ok(GeoIpEnrichment { reader })
    }
}

#[async_trait]
impl Enrichment for GeoIpEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let Some(ip_str) = event.get_value("user_ipaddress").and_then(|v| v.as_str()).map(str::to_string)
        else {
            return Ok(());
        };
        let Ok(ip) = ip_str.parse::<std::net::IpAddr>() else {
            return Ok(());
        };

        let city: Option<maxminddb::geoip2::City> = match self.reader.lookup(ip) {
            Ok(city) => city,
            Err(maxminddb::MaxMindDBError::AddressNotFoundError(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let Some(city) = city else {
            return Ok(());
        };

        if let Some(country) = city.country.as_ref().and_then(|c| c.iso_code) {
            event.set_value("geo_country", country)?;
        }
        if let Some(region) = city
            .subdivisions
            .as_ref()
            .and_then(|s| s.first())
            .and_then(|s| s.iso_code)
        {
            event.set_value("geo_region", region)?;
        }
        if let Some(name) = city
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
        {
            event.set_value("geo_city", *name)?;
        }

        Ok(())
    }
}
