//! Case-detail enrichment.
//!
//! The crash listing carries no crash date, only the case number and year.
//! The date lives in the per-case detail endpoint, which has to be called
//! once per case. This module calls it only for cases the store has never
//! seen, and keeps every answer (including "not released yet") so the same
//! case is not fetched again on later runs.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::data_sources::NhtsaClient;
use crate::data_sources::nhtsa::NhtsaCaseDetailResponse;
use crate::error::{EtlError, Result};
use crate::model::{CaseDetail, CrashSummary};
use crate::storage::Storage;

/// Result of one enrichment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    /// Known records followed by the newly fetched ones.
    pub details: Vec<CaseDetail>,

    /// Cases fetched during this pass, placeholders included.
    pub fetched: usize,

    /// Cases skipped because a record already existed.
    pub skipped: usize,

    /// Cases whose fetch failed. They remain absent and are retried next run.
    pub failed: usize,
}

/// Fetches missing case details for a set of crashes.
pub struct CaseDetailEnricher<'a> {
    client: &'a NhtsaClient,
    state_code: u32,
    pacing_delay: Duration,
}

impl<'a> CaseDetailEnricher<'a> {
    /// # Arguments
    ///
    /// * `client` - NHTSA client used for detail requests
    /// * `state_code` - FIPS state code the case numbers belong to
    /// * `pacing_delay` - Wait before every detail request
    pub fn new(client: &'a NhtsaClient, state_code: u32, pacing_delay: Duration) -> Self {
        Self {
            client,
            state_code,
            pacing_delay,
        }
    }

    /// Load the stored case details and extend them with any missing cases.
    ///
    /// A store without a `case_specifics` table starts from an empty set.
    pub async fn enrich(
        &self,
        storage: &Storage,
        crashes: &[CrashSummary],
    ) -> Result<EnrichmentOutcome> {
        let known = storage.read_case_details().await?;
        Ok(self.merge_new(known, crashes).await)
    }

    /// Fetch detail for every crash not present in `known` and merge it in.
    ///
    /// Requests are strictly sequential, each preceded by the pacing delay.
    #[instrument(skip_all, fields(known = known.len(), crashes = crashes.len()))]
    pub async fn merge_new(
        &self,
        known: Vec<CaseDetail>,
        crashes: &[CrashSummary],
    ) -> EnrichmentOutcome {
        let mut seen: HashSet<i64> = known.iter().map(|d| d.state_case).collect();
        let mut details = known;
        let mut fetched = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for crash in crashes {
            if seen.contains(&crash.state_case) {
                debug!(state_case = crash.state_case, "Case already known, skipping");
                skipped += 1;
                continue;
            }

            tokio::time::sleep(self.pacing_delay).await;

            match self.fetch_one(crash).await {
                Ok(detail) => {
                    seen.insert(detail.state_case);
                    details.push(detail);
                    fetched += 1;
                }
                Err(e) => {
                    warn!(
                        state_case = crash.state_case,
                        error = %e,
                        "Failed to fetch case detail"
                    );
                    failed += 1;
                }
            }
        }

        info!(fetched, skipped, failed, total = details.len(), "Case details merged");

        EnrichmentOutcome {
            details,
            fetched,
            skipped,
            failed,
        }
    }

    async fn fetch_one(&self, crash: &CrashSummary) -> Result<CaseDetail> {
        let data = self
            .client
            .get_case_details(crash.state_case, crash.year, self.state_code)
            .await?;
        case_detail_from_response(crash.state_case, data)
    }
}

/// Interpret a `GetCaseDetails` body.
///
/// A `Count` of exactly one yields the crash date with month and day
/// zero-padded. Any other count (0 while the case is unreleased, or an
/// unexpected multiple) yields a pending placeholder.
pub fn case_detail_from_response(state_case: i64, data: Value) -> Result<CaseDetail> {
    let response: NhtsaCaseDetailResponse = serde_json::from_value(data)?;

    if response.count != 1 {
        info!(
            state_case,
            count = response.count,
            "Case detail not available, recording placeholder"
        );
        return Ok(CaseDetail::pending(state_case));
    }

    let crash = response
        .results
        .first()
        .and_then(|page| page.first())
        .map(|result| &result.crash_result_set)
        .ok_or_else(|| {
            EtlError::Shape(format!("case {state_case} reports Count 1 but has no results"))
        })?;

    debug!(state_case, "Got date for case");

    Ok(CaseDetail {
        state_case,
        year: Some(crash.year),
        month: Some(format!("{:02}", crash.month)),
        day: Some(format!("{:02}", crash.day)),
    })
}
