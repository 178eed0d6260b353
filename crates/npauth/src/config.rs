//! Auth configuration
//!
//! Values that end up inside the login ticket plus the notice shown when no
//! online id is configured. Every field has a default, so a partial JSON
//! document is enough.

use npauth_core::ticket::{DEFAULT_COUNTRY_CODE, DEFAULT_REGION_CODE, DEFAULT_USER_AGE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{AuthError, Result};

/// Auth configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpAuthConfig {
    /// Online id embedded in tickets (already sanitized by the host)
    pub online_id: String,
    /// Country code, at most 4 bytes
    pub country_code: String,
    /// Region code, at most 4 bytes
    pub region_code: String,
    /// Reported account age, 7 bits
    pub user_age: u8,
    /// Whether parental control is reported as enabled
    pub parental_control: bool,
    /// How long the missing-identity notice stays on screen (seconds)
    pub notice_duration_secs: u64,
}

impl Default for NpAuthConfig {
    fn default() -> Self {
        Self {
            online_id: "DummyOnlineId".to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            region_code: DEFAULT_REGION_CODE.to_string(),
            user_age: DEFAULT_USER_AGE,
            parental_control: true,
            notice_duration_secs: 5,
        }
    }
}

impl NpAuthConfig {
    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.country_code.len() > 4 {
            return Err(AuthError::Config(format!(
                "country code {:?} longer than 4 bytes",
                self.country_code
            )));
        }
        if self.region_code.len() > 4 {
            return Err(AuthError::Config(format!(
                "region code {:?} longer than 4 bytes",
                self.region_code
            )));
        }
        if self.user_age > 0x7F {
            return Err(AuthError::Config(format!(
                "user age {} does not fit in 7 bits",
                self.user_age
            )));
        }
        Ok(())
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_secs(self.notice_duration_secs)
    }
}
