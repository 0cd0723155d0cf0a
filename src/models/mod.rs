mod table;

pub use table::{cell_text, Table};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database table every official dashboard writes to
pub const DEFAULT_TABLE: &str = "covid_official";

/// Primary key of [`DEFAULT_TABLE`]
pub const DEFAULT_PK: [&str; 5] = ["vintage", "dt", "location", "variable_id", "demographic_id"];

/// Static identity of a dashboard scraper.
///
/// Defined once per scraper type and handed to the components that need it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetIdentity {
    /// Destination table under the `data` schema
    pub table_name: String,
    /// Primary key columns of the destination table
    pub pk: Vec<String>,
    /// Provider name matched against `data.covid_providers`
    pub provider: String,
    pub data_type: String,
    /// True when rows carry a FIPS `location` code
    pub has_location: bool,
    /// Two digit state FIPS code, required for county-level rows
    pub state_fips: Option<u8>,
}

impl DatasetIdentity {
    fn base(provider: &str, has_location: bool, state_fips: Option<u8>) -> Self {
        Self {
            table_name: DEFAULT_TABLE.to_string(),
            pk: DEFAULT_PK.iter().map(|c| c.to_string()).collect(),
            provider: provider.to_string(),
            data_type: "covid".to_string(),
            has_location,
            state_fips,
        }
    }

    /// State dashboard; `has_location` says whether rows carry FIPS codes
    pub fn state(state_fips: u8, has_location: bool) -> Self {
        Self::base("state", has_location, Some(state_fips))
    }

    /// County-run dashboard within the given state
    pub fn county(state_fips: u8, has_location: bool) -> Self {
        Self::base("county", has_location, Some(state_fips))
    }

    /// Federal source reporting FIPS codes directly
    pub fn federal(provider: &str) -> Self {
        Self::base(provider, true, None)
    }

    pub fn with_table_name(self, table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            ..self
        }
    }

    pub fn with_pk(self, pk: &[&str]) -> Self {
        Self {
            pk: pk.iter().map(|c| c.to_string()).collect(),
            ..self
        }
    }
}

/// Category / measurement / unit triple identifying a variable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Cmu {
    pub category: String,
    pub measurement: String,
    pub unit: String,
}

impl Cmu {
    pub fn new(category: &str, measurement: &str, unit: &str) -> Self {
        Self {
            category: category.to_string(),
            measurement: measurement.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Scalar query parameter value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(s) => write!(f, "{}", s),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<usize> for QueryValue {
    fn from(value: usize) -> Self {
        QueryValue::Int(value as i64)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

/// Ordered query parameters for one outbound request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryParameters(Vec<(String, QueryValue)>);

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`, keeping its original position
    pub fn set(&mut self, name: &str, value: impl Into<QueryValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<QueryValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stringified pairs ready for `reqwest::RequestBuilder::query`
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}
