//! Watermark code generation

use chrono::{DateTime, Utc};
use rand::Rng;
use thirdeye_domain::watermark::SUFFIX_LEN;
use thirdeye_domain::WatermarkCode;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates `<PREFIX>-<YYYYMMDD>-<12 base36 chars>` codes
#[derive(Debug, Clone)]
pub struct WatermarkGenerator {
    prefix: String,
}

impl WatermarkGenerator {
    /// Create a generator for a product prefix
    ///
    /// Fails if the prefix is not upper-case base36.
    pub fn new(prefix: impl Into<String>) -> Result<Self, String> {
        let prefix = prefix.into();
        WatermarkCode::from_parts(&prefix, "20000101", &"0".repeat(SUFFIX_LEN))?;
        Ok(Self { prefix })
    }

    /// Generate a code dated now
    pub fn generate(&self) -> Result<WatermarkCode, String> {
        self.generate_at(Utc::now())
    }

    /// Generate a code dated `now`
    pub fn generate_at(&self, now: DateTime<Utc>) -> Result<WatermarkCode, String> {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        let date = now.format("%Y%m%d").to_string();
        WatermarkCode::from_parts(&self.prefix, &date, &suffix)
    }
}
