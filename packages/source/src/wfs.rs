//! Paginated WFS `GetFeature` fetcher with per-source memoization.
//!
//! Pages are requested with an explicit `startIndex` equal to the
//! number of features retrieved so far. The loop terminates when a page
//! returns fewer features than requested; a collection whose size is an
//! exact multiple of the page size therefore costs one extra
//! empty-page request. PDOK's WFS exposes no usable total count, so no
//! pre-count request is attempted.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use nl_atlas_models::{Crs, Feature, FeatureCollection, PropertyValue, QuerySource};
use tokio::sync::Mutex;

use crate::{FetchOptions, SourceError};

/// One page of a WFS response: the raw feature objects plus the
/// payload's own CRS declaration, when the endpoint includes one.
pub struct WfsPage {
    /// Raw GeoJSON feature objects in arrival order.
    pub features: Vec<serde_json::Value>,
    /// The `crs.properties.name` identifier of the payload, if any.
    pub crs: Option<String>,
}

/// Retrieves one raw page of WFS features.
///
/// The only non-test implementation is [`HttpPager`]; tests script
/// pages in memory to exercise the pagination and caching logic
/// without a network.
#[async_trait]
pub trait FeaturePager: Send + Sync {
    /// Fetches the page starting at `start_index`, at most `count`
    /// features.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failure or a payload that
    /// lacks the `features` array.
    async fn fetch_page(
        &self,
        source: &QuerySource,
        start_index: u64,
        count: u32,
    ) -> Result<WfsPage, SourceError>;
}

/// [`FeaturePager`] backed by a real WFS endpoint.
pub struct HttpPager {
    client: reqwest::Client,
}

impl HttpPager {
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
impl FeaturePager for HttpPager {
    async fn fetch_page(
        &self,
        source: &QuerySource,
        start_index: u64,
        count: u32,
    ) -> Result<WfsPage, SourceError> {
        let start_index = start_index.to_string();
        let count = count.to_string();
        let params = [
            ("service", "wfs"),
            ("version", "2.0.0"),
            ("request", "GetFeature"),
            ("typeName", source.type_name.as_str()),
            ("outputFormat", "json"),
            ("startIndex", start_index.as_str()),
            ("count", count.as_str()),
        ];

        let response = self
            .client
            .get(&source.endpoint)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        let features = body
            .get("features")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .ok_or_else(|| SourceError::Schema {
                message: format!(
                    "WFS response for {} lacks a `features` array",
                    source.type_name
                ),
            })?;
        let crs = body
            .pointer("/crs/properties/name")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned);

        Ok(WfsPage { features, crs })
    }
}

/// Fetches full feature collections and memoizes them per source.
///
/// The cache is keyed on [`QuerySource::cache_key`] (endpoint + type
/// name), holds `Arc`s for the process lifetime, and is never evicted —
/// this is a one-shot batch job. The lock is held across the whole
/// fetch, so concurrent calls for the same source collapse into one
/// network pass and every later caller gets the same collection.
pub struct WfsClient {
    pager: Arc<dyn FeaturePager>,
    cache: Mutex<BTreeMap<String, Arc<FeatureCollection>>>,
}

impl WfsClient {
    /// Wraps an arbitrary pager (tests use a scripted one).
    #[must_use]
    pub fn new(pager: Arc<dyn FeaturePager>) -> Self {
        Self {
            pager,
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// Builds a client over a real HTTP pager.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn with_http() -> Result<Self, SourceError> {
        Ok(Self::new(Arc::new(HttpPager::new()?)))
    }

    /// Fetches every feature of `source`, accumulating pages in arrival
    /// order. When the payload declares its own CRS that declaration is
    /// validated and wins; otherwise the collection is stamped with
    /// `declared_crs` (the reference system the endpoint is known to
    /// serve).
    ///
    /// Repeat calls with an equal source return the identical
    /// `Arc`-shared collection and issue no further requests.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] when the endpoint is unreachable
    /// or times out, [`SourceError::Json`] on a malformed body,
    /// [`SourceError::Schema`] when a page lacks the feature array or a
    /// feature has no geometry, and [`SourceError::Crs`] when the
    /// payload declares a reference system the pipeline cannot convert.
    pub async fn fetch(
        &self,
        source: &QuerySource,
        declared_crs: Crs,
        options: &FetchOptions,
    ) -> Result<Arc<FeatureCollection>, SourceError> {
        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(&source.cache_key()) {
            log::debug!(
                "[{}] cache hit: {} features, no request issued",
                source.type_name,
                hit.len()
            );
            return Ok(Arc::clone(hit));
        }

        let mut features: Vec<Feature> = Vec::new();
        let mut payload_crs: Option<String> = None;
        let mut start_index: u64 = 0;

        loop {
            let page = self
                .pager
                .fetch_page(source, start_index, source.page_size)
                .await?;
            let count = page.features.len();

            if payload_crs.is_none() {
                payload_crs = page.crs;
            }
            for raw in &page.features {
                features.push(parse_feature(raw)?);
            }
            start_index += count as u64;

            log::info!(
                "[{}] page at offset {}: {count} features (total: {start_index})",
                source.type_name,
                start_index - count as u64,
            );

            // Short page means last page. A full page keeps going, so an
            // exact multiple of the page size ends on one empty page.
            if count < source.page_size as usize {
                break;
            }

            if let Some(limit) = options.limit
                && start_index >= limit
            {
                log::info!("[{}] reached limit of {limit} features", source.type_name);
                break;
            }
        }

        log::info!(
            "[{}] fetch complete: {} features",
            source.type_name,
            features.len()
        );

        // The payload's own declaration wins over the caller's; an
        // unrecognized identifier aborts the fetch.
        let crs = match &payload_crs {
            Some(identifier) => nl_atlas_spatial::parse_crs(identifier)?,
            None => declared_crs,
        };

        let collection = Arc::new(FeatureCollection { crs, features });
        cache.insert(source.cache_key(), Arc::clone(&collection));
        Ok(collection)
    }
}

/// Parses one raw GeoJSON feature object into the shared model.
fn parse_feature(raw: &serde_json::Value) -> Result<Feature, SourceError> {
    let geometry_value = raw
        .get("geometry")
        .filter(|v| !v.is_null())
        .ok_or_else(|| SourceError::Schema {
            message: "feature lacks a geometry member".to_owned(),
        })?;

    let geometry = geojson::Geometry::try_from(geometry_value.clone())
        .map_err(schema_error)
        .and_then(|g| geo::Geometry::<f64>::try_from(&g).map_err(schema_error))?;

    let properties = raw
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
                .collect()
        })
        .unwrap_or_default();

    Ok(Feature {
        geometry,
        properties,
    })
}

fn schema_error(err: geojson::Error) -> SourceError {
    SourceError::Schema {
        message: format!("invalid feature geometry: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves `total` identical polygon features from memory, slicing
    /// pages the way a WFS endpoint would, and counts requests.
    struct ScriptedPager {
        total: usize,
        crs: Option<String>,
        requests: AtomicUsize,
    }

    impl ScriptedPager {
        fn new(total: usize) -> Self {
            Self {
                total,
                crs: None,
                requests: AtomicUsize::new(0),
            }
        }

        fn with_crs(total: usize, crs: &str) -> Self {
            Self {
                crs: Some(crs.to_owned()),
                ..Self::new(total)
            }
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeaturePager for ScriptedPager {
        async fn fetch_page(
            &self,
            _source: &QuerySource,
            start_index: u64,
            count: u32,
        ) -> Result<WfsPage, SourceError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let start = usize::try_from(start_index).unwrap();
            let end = (start + count as usize).min(self.total);
            Ok(WfsPage {
                features: (start..end).map(|i| raw_feature(&format!("GM{i:04}"))).collect(),
                crs: self.crs.clone(),
            })
        }
    }

    fn raw_feature(code: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            },
            "properties": { "statcode": code, "statnaam": "Testgemeente" }
        })
    }

    fn source(page_size: u32) -> QuerySource {
        QuerySource {
            endpoint: "https://example.test/wfs".to_owned(),
            type_name: "gemeente_gegeneraliseerd".to_owned(),
            page_size,
        }
    }

    #[tokio::test]
    async fn one_short_page_terminates_after_two_requests() {
        // 1000 features with page size 1000: a full page, then an empty one.
        let pager = Arc::new(ScriptedPager::new(1000));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);

        let collection = client
            .fetch(&source(1000), Crs::Rd, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(collection.len(), 1000);
        assert_eq!(pager.request_count(), 2);
    }

    #[tokio::test]
    async fn exact_multiple_returns_no_duplicates() {
        // 2000 features at page size 1000: two full pages plus one
        // empty page (k + 1 requests), never 3000 features.
        let pager = Arc::new(ScriptedPager::new(2000));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);

        let collection = client
            .fetch(&source(1000), Crs::Rd, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(collection.len(), 2000);
        assert_eq!(pager.request_count(), 3);

        let codes: std::collections::BTreeSet<_> = collection
            .features
            .iter()
            .filter_map(|f| f.property("statcode").and_then(PropertyValue::as_text))
            .collect();
        assert_eq!(codes.len(), 2000);
    }

    #[tokio::test]
    async fn partial_last_page_terminates_without_extra_request() {
        let pager = Arc::new(ScriptedPager::new(1500));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);

        let collection = client
            .fetch(&source(1000), Crs::Rd, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(collection.len(), 1500);
        assert_eq!(pager.request_count(), 2);
    }

    #[tokio::test]
    async fn memoized_fetch_issues_no_further_requests() {
        let pager = Arc::new(ScriptedPager::new(1500));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);
        let src = source(1000);

        let first = client
            .fetch(&src, Crs::Rd, &FetchOptions::default())
            .await
            .unwrap();
        let requests_after_first = pager.request_count();
        let second = client
            .fetch(&src, Crs::Rd, &FetchOptions::default())
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pager.request_count(), requests_after_first);
    }

    #[tokio::test]
    async fn limit_stops_early() {
        let pager = Arc::new(ScriptedPager::new(5000));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);

        let collection = client
            .fetch(&source(1000), Crs::Rd, &FetchOptions { limit: Some(2000) })
            .await
            .unwrap();

        assert_eq!(collection.len(), 2000);
    }

    #[tokio::test]
    async fn payload_crs_declaration_wins_over_callers() {
        let pager = Arc::new(ScriptedPager::with_crs(
            10,
            "urn:ogc:def:crs:EPSG::28992",
        ));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);

        let collection = client
            .fetch(&source(1000), Crs::Wgs84, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(collection.crs, Crs::Rd);
    }

    #[tokio::test]
    async fn unsupported_payload_crs_aborts_the_fetch() {
        let pager = Arc::new(ScriptedPager::with_crs(10, "EPSG:3857"));
        let client = WfsClient::new(Arc::clone(&pager) as Arc<dyn FeaturePager>);

        let result = client
            .fetch(&source(1000), Crs::Rd, &FetchOptions::default())
            .await;

        assert!(matches!(result, Err(SourceError::Crs(_))));
    }

    #[test]
    fn parse_feature_maps_properties() {
        let feature = parse_feature(&raw_feature("GM0344")).unwrap();
        assert_eq!(
            feature.property("statcode"),
            Some(&PropertyValue::Text("GM0344".to_owned()))
        );
        assert!(matches!(feature.geometry, geo::Geometry::Polygon(_)));
    }

    #[test]
    fn parse_feature_without_geometry_is_schema_error() {
        let raw = serde_json::json!({
            "type": "Feature",
            "geometry": null,
            "properties": { "statcode": "GM0001" }
        });
        assert!(matches!(
            parse_feature(&raw),
            Err(SourceError::Schema { .. })
        ));
    }
}
