//! The thematic layer catalog: which CBS statistics get rendered, with
//! which captions and anchor colors.
//!
//! Field names are the CBS `83765NED` column identifiers (the trailing
//! number is part of the column name in the dataset).

use nl_atlas_models::Color;

/// PDOK WFS endpoint serving generalized municipal boundaries.
pub const BOUNDARIES_ENDPOINT: &str =
    "https://service.pdok.nl/cbs/gebiedsindelingen/2023/wfs/v1_0";

/// WFS type name for the generalized municipality polygons.
pub const BOUNDARIES_TYPE_NAME: &str = "gemeente_gegeneraliseerd";

/// CBS OData base URL of the neighbourhood statistics dataset.
pub const STATISTICS_BASE_URL: &str = "https://opendata.cbs.nl/ODataApi/odata/83765NED";

/// Statistics column holding the region code join key.
pub const STATISTICS_KEY_FIELD: &str = "Codering_3";

/// Boundary property holding the region code join key.
pub const GEOMETRY_KEY_FIELD: &str = "statcode";

/// Boundary property holding the municipality display name.
pub const GEOMETRY_NAME_FIELD: &str = "statnaam";

/// Fill color for regions with no data.
pub const ABSENT_COLOR: Color = Color::LIGHT_GRAY;

/// One thematic layer: a CBS statistic plus its presentation.
pub struct Indicator {
    /// CBS column name, also the joined stats key.
    pub field: &'static str,
    /// Layer name in the layer control.
    pub display_name: &'static str,
    /// Legend caption.
    pub caption: &'static str,
    /// Tooltip label in front of the municipality name.
    pub name_label: &'static str,
    /// Tooltip label in front of the value.
    pub value_label: &'static str,
    /// Scale anchors from domain minimum to maximum.
    pub anchors: &'static [Color],
}

/// The eight rendered indicators, in layer order.
pub const INDICATORS: &[Indicator] = &[
    Indicator {
        field: "GemiddeldInkomenPerInwoner_66",
        display_name: "Average Income per Resident",
        caption: "Average Income per Resident (x1000 \u{20ac})",
        name_label: "Municipality:",
        value_label: "Average Income (x1000 \u{20ac}):",
        anchors: &[
            Color::BLUE,
            Color::CYAN,
            Color::GREEN,
            Color::YELLOW,
            Color::ORANGE,
            Color::RED,
        ],
    },
    Indicator {
        field: "ScholenBinnen3Km_98",
        display_name: "Schools within 3 km",
        caption: "Schools within 3 km",
        name_label: "Municipality:",
        value_label: "Schools within 3 km:",
        anchors: &[Color::WHITE, Color::DARK_BLUE],
    },
    Indicator {
        field: "ALandbouwBosbouwEnVisserij_79",
        display_name: "Agriculture, Forestry, and Fishing",
        caption: "Agriculture, Forestry, and Fishing",
        name_label: "Municipality:",
        value_label: "Agriculture, Forestry, and Fishing:",
        anchors: &[Color::WHITE, Color::GREEN],
    },
    Indicator {
        field: "BFNijverheidEnEnergie_80",
        display_name: "Industry and Energy",
        caption: "Industry and Energy",
        name_label: "Municipality:",
        value_label: "Industry and Energy:",
        anchors: &[Color::WHITE, Color::ORANGE],
    },
    Indicator {
        field: "k_65JaarOfOuder_12",
        display_name: "65 years or older",
        caption: "65 years or older",
        name_label: "Municipality:",
        value_label: "65 years or older:",
        anchors: &[Color::WHITE, Color::PURPLE],
    },
    Indicator {
        field: "k_0Tot15Jaar_8",
        display_name: "0 to 15 years",
        caption: "0 to 15 years",
        name_label: "Municipality:",
        value_label: "0 to 15 years:",
        anchors: &[Color::WHITE, Color::PINK],
    },
    Indicator {
        field: "Bevolkingsdichtheid_33",
        display_name: "Population Density",
        caption: "Population Density",
        name_label: "Municipality:",
        value_label: "Population Density:",
        anchors: &[Color::WHITE, Color::BROWN],
    },
    Indicator {
        field: "HuishOnderOfRondSociaalMinimum_73",
        display_name: "Households under or around social minimum",
        caption: "Households under or around social minimum",
        name_label: "Municipality:",
        value_label: "Households under or around social minimum:",
        anchors: &[Color::WHITE, Color::RED],
    },
];

/// Columns to request from the statistics source: the region fields
/// plus every indicator field.
#[must_use]
pub fn statistics_select() -> Vec<&'static str> {
    let mut columns = vec!["WijkenEnBuurten", STATISTICS_KEY_FIELD];
    columns.extend(INDICATORS.iter().map(|indicator| indicator.field));
    columns
}
