#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! One-shot batch job that renders the NL municipal atlas.
//!
//! Strictly sequential: boundary fetch completes before the join
//! begins, the join completes before any color scale is derived, and
//! all scales exist before any layer is built — per-attribute domains
//! need the full joined set. The artifact is written last; any failure
//! aborts the run with nothing persisted.

mod catalog;

use std::path::PathBuf;

use clap::Parser;
use nl_atlas_models::{Crs, QuerySource};
use nl_atlas_render::{ColorScaleRegistry, ScaleSpec};
use nl_atlas_source::wfs::WfsClient;
use nl_atlas_source::{FetchOptions, SourceError};

/// Renders the municipal choropleth map with flood-risk and city
/// overlays to a single HTML file.
#[derive(Parser)]
#[command(name = "nl_atlas", version, about)]
struct Args {
    /// Output HTML path.
    #[arg(long, default_value = "map-with-all-layers.html")]
    output: PathBuf,

    /// WFS endpoint for the municipal boundaries.
    #[arg(long, default_value = catalog::BOUNDARIES_ENDPOINT)]
    endpoint: String,

    /// Historical flooding GeoJSON file.
    #[arg(long, default_value = "flooding_data/historical_flooding.geojson")]
    hazard: PathBuf,

    /// City table CSV file.
    #[arg(long, default_value = "city_data/nl.csv")]
    cities: PathBuf,

    /// Boundary features per page request.
    #[arg(long, default_value_t = 1000)]
    page_size: u32,

    /// Cap on fetched boundary features (smoke runs only).
    #[arg(long)]
    limit: Option<u64>,
}

/// Top-level pipeline error.
#[derive(Debug, thiserror::Error)]
enum AtlasError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Ingest(#[from] nl_atlas_ingest::IngestError),

    #[error(transparent)]
    Join(#[from] nl_atlas_join::JoinError),

    #[error(transparent)]
    Render(#[from] nl_atlas_render::RenderError),
}

#[tokio::main]
async fn main() -> Result<(), AtlasError> {
    pretty_env_logger::init();
    let args = Args::parse();
    run(&args).await
}

async fn run(args: &Args) -> Result<(), AtlasError> {
    // Local collaborators first: fail on a missing file before any
    // network traffic.
    let hazard = nl_atlas_ingest::load_hazard_polygons(&args.hazard, Crs::Rd)?;
    let cities = nl_atlas_ingest::load_cities(&args.cities)?;

    // Boundary geometry, paginated, then normalized to WGS84.
    let wfs = WfsClient::with_http()?;
    let source = QuerySource {
        endpoint: args.endpoint.clone(),
        type_name: catalog::BOUNDARIES_TYPE_NAME.to_owned(),
        page_size: args.page_size,
    };
    let boundaries = wfs
        .fetch(&source, Crs::Rd, &FetchOptions { limit: args.limit })
        .await?;
    let boundaries = nl_atlas_spatial::reproject(&boundaries, Crs::Wgs84);
    let hazard = nl_atlas_spatial::reproject(&hazard, Crs::Wgs84);

    // Statistics table.
    let statistics = nl_atlas_source::cbs::fetch_table(
        &nl_atlas_source::cbs::HttpRowPager::new()?,
        &nl_atlas_source::cbs::CbsConfig {
            base_url: catalog::STATISTICS_BASE_URL,
            select: &catalog::statistics_select(),
            region_code_field: catalog::STATISTICS_KEY_FIELD,
            page_size: 10_000,
        },
    )
    .await?;

    // Join, then derive every scale from the complete joined set.
    let numeric_fields: Vec<&str> = catalog::INDICATORS.iter().map(|i| i.field).collect();
    let regions = nl_atlas_join::join(
        &boundaries,
        &statistics,
        catalog::GEOMETRY_KEY_FIELD,
        catalog::GEOMETRY_NAME_FIELD,
        &numeric_fields,
    )?;
    log::info!("joined {} regions", regions.len());

    let specs: Vec<ScaleSpec<'_>> = catalog::INDICATORS
        .iter()
        .map(|indicator| ScaleSpec {
            attribute: indicator.field,
            anchors: indicator.anchors,
            caption: indicator.caption,
        })
        .collect();
    let registry = ColorScaleRegistry::from_joined(&regions, &specs, catalog::ABSENT_COLOR)?;

    // Layers in catalog order, then the overlays.
    let mut layers = Vec::with_capacity(catalog::INDICATORS.len() + 2);
    for indicator in catalog::INDICATORS {
        let scale = registry.scale(indicator.field)?;
        layers.push(nl_atlas_render::layer::build_choropleth_layer(
            &regions,
            indicator.field,
            scale,
            indicator.display_name,
            indicator.name_label,
            indicator.value_label,
        )?);
    }
    layers.push(nl_atlas_render::layer::build_hazard_layer(
        &hazard,
        "Historical Flooding",
    )?);
    layers.push(nl_atlas_render::layer::build_city_layer(&cities, "Cities"));

    let html = nl_atlas_render::compose(
        "NL Municipal Atlas",
        &layers,
        nl_atlas_render::DEFAULT_CENTER,
        nl_atlas_render::DEFAULT_ZOOM,
    )?;
    nl_atlas_render::write_artifact(&args.output, &html)?;

    Ok(())
}
