//! Built-in dataset jobs.
//!
//! Each job pairs a source with the declarative transform of its target
//! table. The two suites preserve the cleaning policies of the script
//! variants they consolidate: `climate_health` drops rows with missing
//! values and aggregates to annual country means, while `climate_change`
//! keeps every row and mean-imputes numeric gaps.

use climatepipe_core::source::DatasetSource;
use climatepipe_core::transform::{
    CellParse, ColumnMap, GroupSpec, MissingPolicy, Reducer, RowFilter, TableSpec,
};

/// One dataset to extract, transform, and load.
#[derive(Debug, Clone)]
pub struct DatasetJob {
    /// Short name used in progress lines and error messages.
    pub name: &'static str,
    /// Target table in the output store.
    pub table: &'static str,
    pub source: DatasetSource,
    pub spec: TableSpec,
}

const SUITE_NAMES: [&str; 2] = ["climate_health", "climate_change"];

/// Names of the built-in suites, in default run order.
pub fn suite_names() -> &'static [&'static str] {
    &SUITE_NAMES
}

/// Look up a suite by name.
pub fn suite(name: &str) -> Option<Vec<DatasetJob>> {
    match name {
        "climate_health" => Some(vec![temperature_job(), mortality_job()]),
        "climate_change" => Some(vec![co2_job(), quality_of_life_job()]),
        _ => None,
    }
}

/// Annual surface temperature by country, fetched as a plain CSV.
///
/// Source rows are per-reading; the clean table keeps one row per
/// (Year, Country) with mean temperature and anomaly over 2000–2019.
fn temperature_job() -> DatasetJob {
    DatasetJob {
        name: "temperature",
        table: "TemperatureData",
        source: DatasetSource::direct(
            "https://raw.githubusercontent.com/climate-mirror/global-temperatures/main/temperature_by_country.csv",
        ),
        spec: TableSpec {
            columns: vec![
                ColumnMap::keep("Country"),
                ColumnMap::renamed("Year", "Year", CellParse::AsInt),
                ColumnMap::renamed(
                    "Temperature",
                    "AverageAnnualTemperature",
                    CellParse::AsFloat,
                ),
                ColumnMap::renamed("Anomaly", "AverageAnnualAnomaly", CellParse::AsFloat),
            ],
            missing: MissingPolicy::DropRow,
            filter: Some(RowFilter::YearRange {
                column: "Year".into(),
                min: 2000,
                max: 2019,
            }),
            group: Some(GroupSpec {
                keys: vec!["Year".into(), "Country".into()],
                reduce: Reducer::Mean,
            }),
        },
    }
}

/// Heat-related mortality indicator, fetched as a plain CSV.
///
/// The source reports one observation per country per period date; the year
/// is derived from that date column.
fn mortality_job() -> DatasetJob {
    DatasetJob {
        name: "mortality",
        table: "HealthData",
        source: DatasetSource::direct(
            "https://raw.githubusercontent.com/climate-mirror/health-indicators/main/heat_mortality_by_country.csv",
        ),
        spec: TableSpec {
            columns: vec![
                ColumnMap::renamed("Location", "Country", CellParse::Keep),
                ColumnMap::renamed(
                    "Period",
                    "Year",
                    CellParse::YearFromDate {
                        format: "%Y-%m-%d".into(),
                    },
                ),
                ColumnMap::renamed("FactValueNumeric", "MortalityRate", CellParse::AsFloat),
            ],
            missing: MissingPolicy::DropRow,
            filter: None,
            group: None,
        },
    }
}

/// CO2 emissions by country, downloaded as a hosted-dataset archive.
fn co2_job() -> DatasetJob {
    DatasetJob {
        name: "co2_emissions",
        table: "co2_emissions",
        source: DatasetSource::hosted(
            "ulrikthygepedersen/co2-emissions-by-country",
            "co2_emissions_kt_by_country.csv",
        ),
        spec: TableSpec {
            columns: vec![
                ColumnMap::keep("country_code"),
                ColumnMap::keep("country_name"),
                ColumnMap::renamed("year", "year", CellParse::AsInt),
                ColumnMap::renamed("value", "value", CellParse::AsFloat),
            ],
            missing: MissingPolicy::ImputeNumericMean,
            filter: None,
            group: None,
        },
    }
}

/// Quality-of-life indicators, downloaded as a hosted-dataset archive.
fn quality_of_life_job() -> DatasetJob {
    DatasetJob {
        name: "quality_of_life",
        table: "quality_of_life",
        source: DatasetSource::hosted(
            "thedevastator/impact-of-co2-on-quality-of-life-around-the-world",
            "QoL_cleaned.csv",
        ),
        spec: TableSpec {
            columns: vec![
                ColumnMap::keep("Country"),
                ColumnMap::renamed("QualityOfLife", "QualityOfLifeIndex", CellParse::AsFloat),
                ColumnMap::renamed("CO2Emissions", "Co2EmissionsTonnes", CellParse::AsFloat),
            ],
            missing: MissingPolicy::ImputeNumericMean,
            filter: None,
            group: None,
        },
    }
}
