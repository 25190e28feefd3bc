//! MaxMind GeoLite2 本地数据库（Country 或 City 库均可）

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::Reader;
use tracing::trace;

use super::provider::GeoIpLookup;

pub struct MaxMindProvider {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindProvider {
    pub fn new(path: &str) -> Result<Self, maxminddb::MaxMindDbError> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

#[async_trait]
impl GeoIpLookup for MaxMindProvider {
    async fn lookup_country(&self, ip: &str) -> Option<String> {
        let ip_addr: IpAddr = ip.parse().ok()?;

        let result = self.reader.lookup(ip_addr).ok()?;
        let record: maxminddb::geoip2::Country = result.decode().ok()??;
        let country = record.country.iso_code.map(String::from);

        trace!("MaxMind lookup for {}: country={:?}", ip, country);
        country
    }

    fn name(&self) -> &'static str {
        "MaxMind"
    }
}
