use crate::error::{Result, ScrapeError};
use crate::models::{Cmu, DatasetIdentity, QueryParameters, Table};
use crate::scrapers::fips::state_fips;
use crate::scrapers::soda::{records_to_table, Soda, DEFAULT_FORMAT, DEFAULT_RESOURCE};
use crate::scrapers::traits::{ScraperTrait, Transport};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CDC_SODA_URL: &str = "https://data.cdc.gov";
pub const TRACKER_URL: &str = "https://covid.cdc.gov/covid-data-tracker/COVIDData/getAjaxData";

/// Columns of every normalized CDC table, in order
pub const NORMALIZED_COLUMNS: [&str; 11] = [
    "vintage",
    "dt",
    "location",
    "loc_name",
    "category",
    "measurement",
    "unit",
    "age",
    "race",
    "sex",
    "value",
];

/// Weekly per-jurisdiction vaccine allocations published on data.cdc.gov
pub struct CdcVaccineAllocations {
    source_name: &'static str,
    data_id: &'static str,
    dose_columns: Vec<(&'static str, Cmu)>,
    soda: Soda,
    identity: DatasetIdentity,
    vintage: DateTime<Utc>,
}

impl CdcVaccineAllocations {
    fn for_maker(
        maker: &str,
        source_name: &'static str,
        data_id: &'static str,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dose_columns = vec![
            (
                "_1st_dose_allocations",
                Cmu::new(&format!("{}_vaccine_first_dose_allocated", maker), "new", "doses"),
            ),
            (
                "_2nd_dose_allocations",
                Cmu::new(&format!("{}_vaccine_second_dose_allocated", maker), "new", "doses"),
            ),
        ];

        Self {
            source_name,
            data_id,
            dose_columns,
            soda: Soda::new(CDC_SODA_URL, transport),
            identity: DatasetIdentity::federal("cdc"),
            vintage: Utc::now(),
        }
    }

    pub fn moderna(transport: Arc<dyn Transport>) -> Self {
        Self::for_maker("moderna", "CDC Moderna allocations", "b7pe-5nws", transport)
    }

    pub fn pfizer(transport: Arc<dyn Transport>) -> Self {
        Self::for_maker("pfizer", "CDC Pfizer allocations", "saz5-9hgg", transport)
    }

    /// Pin the vintage stamped on normalized rows
    pub fn with_vintage(self, vintage: DateTime<Utc>) -> Self {
        Self { vintage, ..self }
    }
}

#[async_trait]
impl ScraperTrait for CdcVaccineAllocations {
    async fn fetch(&self) -> Result<Table> {
        self.soda
            .get_dataset(self.data_id, DEFAULT_RESOURCE, DEFAULT_FORMAT)
            .await
    }

    fn normalize(&self, raw: Table) -> Result<Table> {
        let vintage = format_vintage(&self.vintage);
        let mut out = Table::new();

        for row in raw.rows() {
            let loc_name = text_field(row, "jurisdiction")?;
            let dt = date_field(row, "week_of_allocations")?;
            for (column, cmu) in &self.dose_columns {
                match row.get(*column).and_then(parse_count) {
                    Some(value) => out.push(observation(
                        &vintage,
                        dt,
                        state_fips(&loc_name),
                        &loc_name,
                        cmu,
                        value,
                    )),
                    None => debug!("No {} for {} on {}", column, loc_name, dt),
                }
            }
        }

        info!("Normalized {} raw rows into {} observations", raw.len(), out.len());
        Ok(out)
    }

    fn identity(&self) -> &DatasetIdentity {
        &self.identity
    }

    fn source_name(&self) -> &'static str {
        self.source_name
    }
}

/// Cumulative distributed and administered doses from the COVID Data Tracker
pub struct CdcVaccineTotal {
    transport: Arc<dyn Transport>,
    variables: Vec<(&'static str, Cmu)>,
    identity: DatasetIdentity,
    vintage: DateTime<Utc>,
}

impl CdcVaccineTotal {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let variables = vec![
            (
                "Doses_Distributed",
                Cmu::new("total_vaccine_distributed", "cumulative", "doses"),
            ),
            (
                "Doses_Administered",
                Cmu::new("total_vaccine_doses_administered", "cumulative", "doses"),
            ),
            (
                "Administered_Dose1",
                Cmu::new("total_vaccine_initiated", "cumulative", "people"),
            ),
            (
                "Administered_Dose2",
                Cmu::new("total_vaccine_completed", "cumulative", "people"),
            ),
        ];

        Self {
            transport,
            variables,
            identity: DatasetIdentity::federal("cdc"),
            vintage: Utc::now(),
        }
    }

    pub fn with_vintage(self, vintage: DateTime<Utc>) -> Self {
        Self { vintage, ..self }
    }
}

#[async_trait]
impl ScraperTrait for CdcVaccineTotal {
    async fn fetch(&self) -> Result<Table> {
        info!("Fetching CDC vaccination data from {}", TRACKER_URL);
        let params = QueryParameters::new().with("id", "vaccination_data");
        let mut body = self.transport.get_json(TRACKER_URL, &params).await?;

        match body.get_mut("vaccination_data") {
            Some(records) => records_to_table(records.take()),
            None => Err(ScrapeError::UnexpectedResponse(
                "missing `vaccination_data` records".into(),
            )),
        }
    }

    fn normalize(&self, raw: Table) -> Result<Table> {
        let vintage = format_vintage(&self.vintage);
        let mut out = Table::new();

        for row in raw.rows() {
            let code = text_field(row, "Location")?;
            let loc_name = row
                .get("LongName")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| code.clone());
            let dt = date_field(row, "Date")?;
            let location = state_fips(&code);
            if location.is_none() {
                debug!("No FIPS code for {}", code);
            }

            for (column, cmu) in &self.variables {
                if let Some(value) = row.get(*column).and_then(parse_count) {
                    out.push(observation(&vintage, dt, location, &loc_name, cmu, value));
                }
            }
        }

        info!("Normalized {} raw rows into {} observations", raw.len(), out.len());
        Ok(out)
    }

    fn identity(&self) -> &DatasetIdentity {
        &self.identity
    }

    fn source_name(&self) -> &'static str {
        "CDC vaccination totals"
    }
}

fn format_vintage(vintage: &DateTime<Utc>) -> String {
    vintage.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn observation(
    vintage: &str,
    dt: NaiveDate,
    location: Option<u32>,
    loc_name: &str,
    cmu: &Cmu,
    value: i64,
) -> Map<String, Value> {
    let values = [
        Value::from(vintage),
        Value::from(dt.format("%Y-%m-%d").to_string()),
        location.map_or(Value::Null, Value::from),
        Value::from(loc_name),
        Value::from(cmu.category.as_str()),
        Value::from(cmu.measurement.as_str()),
        Value::from(cmu.unit.as_str()),
        Value::from("all"),
        Value::from("all"),
        Value::from("all"),
        Value::from(value),
    ];

    NORMALIZED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .zip(values)
        .collect()
}

fn text_field(row: &Map<String, Value>, column: &str) -> Result<String> {
    row.get(column)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ScrapeError::UnexpectedResponse(format!("row without `{}`", column)))
}

/// Leading `YYYY-MM-DD` of a date or timestamp string
fn date_field(row: &Map<String, Value>, column: &str) -> Result<NaiveDate> {
    let raw = text_field(row, column)?;
    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| ScrapeError::UnexpectedResponse(format!("bad {} value '{}'", column, raw)))
}

/// Whole count from a JSON number or numeric string
fn parse_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim().replace(',', "");
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => {
            if !value.is_null() {
                warn!("Ignoring non-numeric value {}", value);
            }
            None
        }
    }
}
