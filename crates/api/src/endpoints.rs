use meetbridge_config::ApiConfig;

use crate::{
    error::{Error, Result},
    request::{ApiTier, Provider},
};

/// Versioned base URLs per provider and tier.
#[derive(Debug, Clone)]
pub struct Endpoints {
    calendar: String,
    meet_stable: String,
    meet_preview: String,
}

impl Endpoints {
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        let join = |base: &str, version: &str| {
            format!("{}/{}", base.trim_end_matches('/'), version.trim_matches('/'))
        };
        Self {
            calendar: join(&config.calendar_base_url, &config.calendar_version),
            meet_stable: join(&config.meet_base_url, &config.meet_stable_version),
            meet_preview: join(&config.meet_base_url, &config.meet_preview_version),
        }
    }

    /// Base URL for a provider and tier. Calendar has no preview surface.
    pub fn base(&self, provider: Provider, tier: ApiTier) -> Result<&str> {
        match (provider, tier) {
            (Provider::Calendar, ApiTier::Stable) => Ok(&self.calendar),
            (Provider::Calendar, ApiTier::Preview) => Err(Error::validation(
                "calendar has no preview surface",
            )),
            (Provider::Meet, ApiTier::Stable) => Ok(&self.meet_stable),
            (Provider::Meet, ApiTier::Preview) => Ok(&self.meet_preview),
        }
    }

    pub fn url(&self, provider: Provider, tier: ApiTier, path: &str) -> Result<String> {
        Ok(format!(
            "{}/{}",
            self.base(provider, tier)?,
            path.trim_start_matches('/')
        ))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_tier() {
        let endpoints = Endpoints::from_config(&ApiConfig::default());
        assert_eq!(
            endpoints
                .url(Provider::Meet, ApiTier::Stable, "spaces/abc-defg-hij")
                .unwrap(),
            "https://meet.googleapis.com/v2/spaces/abc-defg-hij"
        );
        assert_eq!(
            endpoints
                .url(Provider::Meet, ApiTier::Preview, "/spaces/x/members")
                .unwrap(),
            "https://meet.googleapis.com/v2beta/spaces/x/members"
        );
        assert_eq!(
            endpoints
                .url(Provider::Calendar, ApiTier::Stable, "users/me/calendarList")
                .unwrap(),
            "https://www.googleapis.com/calendar/v3/users/me/calendarList"
        );
        assert!(
            endpoints
                .url(Provider::Calendar, ApiTier::Preview, "x")
                .is_err()
        );
    }
}
