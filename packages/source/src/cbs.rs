//! CBS (Statistics Netherlands) OData table fetcher.
//!
//! Pulls a dataset's `TypedDataSet` feed page-by-page using
//! `$top`/`$skip` query parameters. Responses wrap rows in a `value`
//! array. Termination mirrors the WFS fetcher: a page with fewer rows
//! than requested is the last one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use nl_atlas_models::{PropertyValue, StatisticsRecord};

use crate::SourceError;

/// Configuration for one CBS OData table fetch.
pub struct CbsConfig<'a> {
    /// Dataset base URL, e.g.
    /// `"https://opendata.cbs.nl/ODataApi/odata/83765NED"`.
    pub base_url: &'a str,
    /// Columns to request via `$select`.
    pub select: &'a [&'a str],
    /// Column holding the region code join key.
    pub region_code_field: &'a str,
    /// Rows per page request.
    pub page_size: u32,
}

/// Retrieves one raw page of OData rows.
///
/// The only non-test implementation is [`HttpRowPager`]; tests script
/// rows in memory to exercise the pagination logic without a network.
#[async_trait]
pub trait RowPager: Send + Sync {
    /// Fetches at most `top` rows starting at `skip`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failure or a payload that
    /// lacks the `value` array.
    async fn fetch_rows(
        &self,
        config: &CbsConfig<'_>,
        skip: u64,
        top: u32,
    ) -> Result<Vec<serde_json::Value>, SourceError>;
}

/// [`RowPager`] backed by the real OData endpoint.
pub struct HttpRowPager {
    client: reqwest::Client,
}

impl HttpRowPager {
    /// Builds a pager with the shared timeout-configured client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be built.
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: crate::build_http_client()?,
        })
    }
}

#[async_trait]
impl RowPager for HttpRowPager {
    async fn fetch_rows(
        &self,
        config: &CbsConfig<'_>,
        skip: u64,
        top: u32,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let url = format!("{}/TypedDataSet", config.base_url);
        let select = config.select.join(",");
        let top = top.to_string();
        let skip = skip.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("$select", select.as_str()),
                ("$top", top.as_str()),
                ("$skip", skip.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        body.get("value")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .ok_or_else(|| SourceError::Schema {
                message: format!("OData response from {url} lacks a `value` array"),
            })
    }
}

/// Fetches every row of the configured table as statistics records.
///
/// Rows without a region code cannot join anything and are skipped
/// with a warning rather than failing the run.
///
/// # Errors
///
/// Returns [`SourceError::Http`] on transport failure and
/// [`SourceError::Schema`] when a page lacks the `value` array.
pub async fn fetch_table(
    pager: &dyn RowPager,
    config: &CbsConfig<'_>,
) -> Result<Vec<StatisticsRecord>, SourceError> {
    let mut records: Vec<StatisticsRecord> = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let rows = pager.fetch_rows(config, offset, config.page_size).await?;
        let count = rows.len();

        for row in &rows {
            if let Some(record) = parse_record(row, config.region_code_field) {
                records.push(record);
            } else {
                log::warn!(
                    "skipping statistics row without a {} value",
                    config.region_code_field
                );
            }
        }
        offset += count as u64;

        log::info!("[statistics] offset {offset}: {count} rows");

        // Short page means last page, like the boundary fetcher.
        if count < config.page_size as usize {
            break;
        }
    }

    log::info!("[statistics] fetch complete: {} records", records.len());
    Ok(records)
}

/// Parses one OData row into a statistics record, trimming the region
/// code. Returns `None` when the key column is missing or not text.
fn parse_record(row: &serde_json::Value, region_code_field: &str) -> Option<StatisticsRecord> {
    let object = row.as_object()?;
    let region_code = object.get(region_code_field)?.as_str()?;

    let values: BTreeMap<String, PropertyValue> = object
        .iter()
        .filter(|(key, _)| *key != region_code_field)
        .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
        .collect();

    Some(StatisticsRecord::new(region_code, values))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves `total` rows from memory, slicing pages the way the
    /// OData endpoint would, and counts requests.
    struct ScriptedRows {
        total: usize,
        requests: AtomicUsize,
    }

    impl ScriptedRows {
        fn new(total: usize) -> Self {
            Self {
                total,
                requests: AtomicUsize::new(0),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RowPager for ScriptedRows {
        async fn fetch_rows(
            &self,
            _config: &CbsConfig<'_>,
            skip: u64,
            top: u32,
        ) -> Result<Vec<serde_json::Value>, SourceError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let start = usize::try_from(skip).unwrap();
            let end = (start + top as usize).min(self.total);
            Ok((start..end)
                .map(|i| {
                    serde_json::json!({
                        "Codering_3": format!("GM{i:04}"),
                        "Bevolkingsdichtheid_33": i,
                    })
                })
                .collect())
        }
    }

    fn config(page_size: u32) -> CbsConfig<'static> {
        CbsConfig {
            base_url: "https://example.test/odata",
            select: &["Codering_3", "Bevolkingsdichtheid_33"],
            region_code_field: "Codering_3",
            page_size,
        }
    }

    #[tokio::test]
    async fn partial_last_page_terminates_without_extra_request() {
        let pager = ScriptedRows::new(1500);

        let records = fetch_table(&pager, &config(1000)).await.unwrap();

        assert_eq!(records.len(), 1500);
        assert_eq!(pager.request_count(), 2);
    }

    #[tokio::test]
    async fn exact_multiple_costs_one_empty_page_and_no_duplicates() {
        // 2000 rows at page size 1000: two full pages plus one empty
        // page (k + 1 requests), never 3000 records.
        let pager = ScriptedRows::new(2000);

        let records = fetch_table(&pager, &config(1000)).await.unwrap();

        assert_eq!(records.len(), 2000);
        assert_eq!(pager.request_count(), 3);

        let codes: std::collections::BTreeSet<_> =
            records.iter().map(|r| r.region_code.as_str()).collect();
        assert_eq!(codes.len(), 2000);
    }

    #[test]
    fn parses_row_and_trims_region_code() {
        let row = serde_json::json!({
            "Codering_3": "GM0344  ",
            "GemiddeldInkomenPerInwoner_66": 31.4,
            "ScholenBinnen3Km_98": "12.5",
        });

        let record = parse_record(&row, "Codering_3").unwrap();
        assert_eq!(record.region_code, "GM0344");
        assert_eq!(
            record.values.get("GemiddeldInkomenPerInwoner_66"),
            Some(&PropertyValue::Number(31.4))
        );
        assert_eq!(
            record.values.get("ScholenBinnen3Km_98"),
            Some(&PropertyValue::Text("12.5".to_owned()))
        );
        assert!(!record.values.contains_key("Codering_3"));
    }

    #[test]
    fn null_statistic_is_absent() {
        let row = serde_json::json!({
            "Codering_3": "GM0001",
            "Bevolkingsdichtheid_33": null,
        });

        let record = parse_record(&row, "Codering_3").unwrap();
        assert_eq!(
            record.values.get("Bevolkingsdichtheid_33"),
            Some(&PropertyValue::Absent)
        );
    }

    #[test]
    fn row_without_key_is_rejected() {
        let row = serde_json::json!({ "Bevolkingsdichtheid_33": 518 });
        assert!(parse_record(&row, "Codering_3").is_none());
    }
}
