use {meetbridge_api::ResponseMeta, serde::Serialize};

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaSource {
    /// Figures come from provider headers.
    Headers,
    /// Counted locally against the configured daily ceiling.
    Estimated,
}

/// Remaining quota for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaState {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
    /// Epoch ms at which the window resets.
    pub reset_at_ms: u64,
    pub source: QuotaSource,
}

impl QuotaState {
    #[must_use]
    pub fn new(daily_limit: u64, now_ms: u64) -> Self {
        Self {
            limit: daily_limit,
            used: 0,
            remaining: daily_limit,
            reset_at_ms: now_ms.saturating_add(DAY_MS),
            source: QuotaSource::Estimated,
        }
    }

    /// Account for one call. Header figures win; without them each call
    /// consumes one unit of the daily ceiling.
    pub fn observe(&mut self, meta: Option<&ResponseMeta>, now_ms: u64) {
        if now_ms >= self.reset_at_ms {
            self.used = 0;
            self.remaining = self.limit;
            self.reset_at_ms = now_ms.saturating_add(DAY_MS);
        }

        if let Some(meta) = meta
            && let Some(remaining) = meta.remaining
        {
            if let Some(limit) = meta.limit {
                self.limit = limit;
            }
            self.remaining = remaining.min(self.limit);
            self.used = self.limit.saturating_sub(self.remaining);
            if let Some(reset) = meta.reset_secs {
                self.reset_at_ms = now_ms.saturating_add(reset.saturating_mul(1000));
            }
            self.source = QuotaSource::Headers;
            return;
        }

        self.used = self.used.saturating_add(1);
        self.remaining = self.limit.saturating_sub(self.used);
        self.source = QuotaSource::Estimated;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn counts_calls_without_headers() {
        let mut q = QuotaState::new(3, NOW);
        q.observe(None, NOW);
        q.observe(Some(&ResponseMeta::default()), NOW + 1);
        assert_eq!(q.used, 2);
        assert_eq!(q.remaining, 1);
        q.observe(None, NOW + 2);
        q.observe(None, NOW + 3);
        assert_eq!(q.remaining, 0);
        assert_eq!(q.source, QuotaSource::Estimated);
    }

    #[test]
    fn headers_replace_the_estimate() {
        let mut q = QuotaState::new(1000, NOW);
        q.observe(None, NOW);
        q.observe(
            Some(&ResponseMeta {
                remaining: Some(7),
                limit: Some(600),
                reset_secs: Some(60),
                ..Default::default()
            }),
            NOW + 10,
        );
        assert_eq!(q.limit, 600);
        assert_eq!(q.remaining, 7);
        assert_eq!(q.used, 593);
        assert_eq!(q.reset_at_ms, NOW + 10 + 60_000);
        assert_eq!(q.source, QuotaSource::Headers);
    }

    #[test]
    fn window_resets_after_a_day() {
        let mut q = QuotaState::new(10, NOW);
        for i in 0..5 {
            q.observe(None, NOW + i);
        }
        q.observe(None, NOW + DAY_MS);
        assert_eq!(q.used, 1);
        assert_eq!(q.remaining, 9);
    }
}
