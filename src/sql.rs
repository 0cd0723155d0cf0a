//! Upsert statement generation for the official covid tables.
//!
//! Rows are expected in a staging table with the columns
//! `vintage, dt, location|county, category, measurement, unit, age, race, sex, value`.
//! The statement produced here moves them into `data.<table>`, resolving variable,
//! provider and demographic ids against the metadata tables.

use crate::error::{Result, ScrapeError};
use crate::models::{DatasetIdentity, Table};
use serde::Serialize;
use tracing::debug;

/// How rows in a result set are tied to a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geography {
    /// Rows carry a FIPS `location` column
    Location,
    /// Rows carry a `county` name resolved within the given state
    County { state_fips: u8 },
}

/// Bound value for an [`InsertQuery`] placeholder.
///
/// Every placeholder is cast with `::TEXT` or compared to a text column, so
/// values are bound as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(String),
}

/// Statement plus the values for its `$n` placeholders, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Decides which geography shape a result set uses
pub trait GeographyPolicy {
    fn geography(&self, table: &Table) -> Result<Geography>;
}

impl GeographyPolicy for DatasetIdentity {
    fn geography(&self, table: &Table) -> Result<Geography> {
        if self.has_location {
            Ok(Geography::Location)
        } else if table.has_column("county") {
            let state_fips = self.state_fips.ok_or(ScrapeError::MissingStateFips)?;
            Ok(Geography::County { state_fips })
        } else {
            Err(ScrapeError::MissingGeography)
        }
    }
}

/// Anything that exposes a [`DatasetIdentity`]
pub trait HasIdentity {
    fn identity(&self) -> &DatasetIdentity;
}

impl HasIdentity for DatasetIdentity {
    fn identity(&self) -> &DatasetIdentity {
        self
    }
}

/// Builds the upsert statement for a staged result set
pub trait SqlUpsertBuilder {
    fn insert_query(&self, table: &Table, temp_name: &str) -> Result<InsertQuery>;
}

impl<T> SqlUpsertBuilder for T
where
    T: GeographyPolicy + HasIdentity,
{
    fn insert_query(&self, table: &Table, temp_name: &str) -> Result<InsertQuery> {
        let identity = self.identity();
        let geography = self.geography(table)?;
        let pk: Vec<&str> = identity.pk.iter().map(String::as_str).collect();
        render(
            geography,
            &identity.table_name,
            temp_name,
            &pk,
            &identity.provider,
        )
    }
}

/// Build the upsert for an explicit destination table and primary key
pub fn insert_query_for(
    identity: &DatasetIdentity,
    table: &Table,
    table_name: &str,
    temp_name: &str,
    pk: &[&str],
) -> Result<InsertQuery> {
    let geography = identity.geography(table)?;
    render(geography, table_name, temp_name, pk, &identity.provider)
}

fn render(
    geography: Geography,
    table_name: &str,
    temp_name: &str,
    pk: &[&str],
    provider: &str,
) -> Result<InsertQuery> {
    check_identifier(table_name)?;
    check_identifier(temp_name)?;
    if pk.is_empty() {
        return Err(ScrapeError::InvalidIdentifier(String::new()));
    }
    for column in pk {
        check_identifier(column)?;
    }
    let pk = format!(
        "({})",
        pk.iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let (sql, params) = match geography {
        Geography::Location => (
            format!(
                r#"
                INSERT INTO data.{table_name} (
                  vintage, dt, location, variable_id, demographic_id, value, provider
                )
                SELECT tt.vintage, tt.dt, tt.location, cv.id as variable_id,
                       cd.id as demographic_id, tt.value, cp.id
                FROM {temp_name} tt
                LEFT JOIN meta.covid_variables cv ON tt.category=cv.category AND tt.measurement=cv.measurement AND tt.unit=cv.unit
                LEFT JOIN data.covid_providers cp ON $1=cp.name
                INNER JOIN meta.covid_demographics cd ON tt.age=cd.age AND tt.race=cd.race AND tt.sex=cd.sex
                ON CONFLICT {pk} DO UPDATE SET value = excluded.value
                "#
            ),
            vec![SqlParam::Text(provider.to_string())],
        ),
        Geography::County { state_fips } => (
            format!(
                r#"
                INSERT INTO data.{table_name} (
                  vintage, dt, location, variable_id, demographic_id, value, provider
                )
                SELECT tt.vintage, tt.dt, loc.location, cv.id as variable_id,
                       cd.id as demographic_id, tt.value, cp.id
                FROM {temp_name} tt
                LEFT JOIN meta.locations loc on tt.county=loc.name
                LEFT JOIN meta.location_type loct on loc.location_type=loct.id
                LEFT JOIN meta.covid_variables cv ON tt.category=cv.category AND tt.measurement=cv.measurement AND tt.unit=cv.unit
                LEFT JOIN data.covid_providers cp ON $1=cp.name
                INNER JOIN meta.covid_demographics cd ON tt.age=cd.age AND tt.race=cd.race AND tt.sex=cd.sex
                WHERE (loc.state = LPAD($2::TEXT, 2, '0')) AND
                      (loct.name = 'county')
                ON CONFLICT {pk} DO UPDATE SET value = excluded.value
                "#
            ),
            vec![
                SqlParam::Text(provider.to_string()),
                SqlParam::Text(state_fips.to_string()),
            ],
        ),
    };

    debug!("Built {:?} insert into data.{} from {}", geography, table_name, temp_name);

    Ok(InsertQuery {
        sql: dedent(&sql),
        params,
    })
}

/// Accepts `name` or `schema.name` made of ASCII word characters
fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty()
                && !part.starts_with(|c: char| c.is_ascii_digit())
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(ScrapeError::InvalidIdentifier(name.to_string()))
    }
}

/// Strip the indentation common to every non-blank line
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| if l.trim().is_empty() { "" } else { &l[indent..] })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(value: serde_json::Value) -> Table {
        Table::from_records(vec![value.as_object().cloned().unwrap()])
    }

    fn staged_row(geo_key: &str) -> Table {
        let mut row = json!({
            "vintage": "2021-01-02T00:00:00Z",
            "dt": "2021-01-01",
            "category": "cases",
            "measurement": "cumulative",
            "unit": "people",
            "age": "all",
            "race": "all",
            "sex": "all",
            "value": 10,
        });
        row[geo_key] = json!("x");
        table(row)
    }

    #[test]
    fn location_mode_selects_location_directly() {
        let identity = DatasetIdentity::state(6, true);
        let query = identity
            .insert_query(&staged_row("location"), "tmp_covid")
            .unwrap();

        assert!(query.sql.contains("tt.location"));
        assert!(!query.sql.contains("meta.locations"));
        assert!(!query.sql.contains("meta.location_type"));
        assert!(query.sql.contains("FROM tmp_covid tt"));
        assert!(query.sql.contains("INSERT INTO data.covid_official ("));
        assert!(query.sql.contains(
            r#"ON CONFLICT ("vintage", "dt", "location", "variable_id", "demographic_id") DO UPDATE SET value = excluded.value"#
        ));
        assert_eq!(query.params, vec![SqlParam::Text("state".into())]);
    }

    #[test]
    fn location_flag_wins_over_county_column() {
        let identity = DatasetIdentity::state(6, true);
        let query = identity.insert_query(&staged_row("county"), "tmp").unwrap();
        assert!(!query.sql.contains("loct.name"));
    }

    #[test]
    fn county_mode_filters_on_state_and_location_type() {
        let identity = DatasetIdentity::county(6, false);
        let query = identity.insert_query(&staged_row("county"), "tmp").unwrap();

        assert!(query.sql.contains("LEFT JOIN meta.locations loc on tt.county=loc.name"));
        assert!(query.sql.contains("loc.state = LPAD($2::TEXT, 2, '0')"));
        assert!(query.sql.contains("loct.name = 'county'"));
        assert!(query.sql.contains("loc.location"));
        assert_eq!(
            query.params,
            vec![SqlParam::Text("county".into()), SqlParam::Text("6".into())]
        );
    }

    #[test]
    fn missing_geography_fails() {
        let identity = DatasetIdentity::state(6, false);
        let err = identity
            .insert_query(&staged_row("loc_name"), "tmp")
            .unwrap_err();
        assert!(matches!(err, ScrapeError::MissingGeography));

        let err = identity.insert_query(&Table::new(), "tmp").unwrap_err();
        assert!(matches!(err, ScrapeError::MissingGeography));
    }

    #[test]
    fn county_mode_needs_state_fips() {
        let mut identity = DatasetIdentity::county(6, false);
        identity.state_fips = None;
        let err = identity.insert_query(&staged_row("county"), "tmp").unwrap_err();
        assert!(matches!(err, ScrapeError::MissingStateFips));
    }

    #[test]
    fn state_fips_is_bound_as_text() {
        let identity = DatasetIdentity::county(1, false);
        let query = identity.insert_query(&staged_row("county"), "tmp").unwrap();

        // LPAD pads the text value, so Alabama's "1" becomes '01' server side
        assert!(query.sql.contains("LPAD($2::TEXT, 2, '0')"));
        assert_eq!(query.params[1], SqlParam::Text("1".into()));
        assert_eq!(
            serde_json::to_value(&query.params).unwrap(),
            json!(["county", "1"])
        );
    }

    #[test]
    fn output_has_no_common_indent() {
        let identity = DatasetIdentity::county(36, false);
        let query = identity.insert_query(&staged_row("county"), "tmp").unwrap();

        assert!(query
            .sql
            .lines()
            .any(|l| l.starts_with("INSERT INTO data.covid_official")));
        assert!(query.sql.contains("\n  vintage, dt, location"));
        assert!(query.sql.contains("\n      (loct.name = 'county')"));
    }

    #[test]
    fn explicit_table_and_pk() {
        let identity = DatasetIdentity::federal("cdc");
        let query = insert_query_for(
            &identity,
            &staged_row("location"),
            "covid_us",
            "tmp_cdc",
            &["vintage", "dt", "location"],
        )
        .unwrap();
        assert!(query.sql.contains("INSERT INTO data.covid_us ("));
        assert!(query.sql.contains(r#"ON CONFLICT ("vintage", "dt", "location")"#));
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let identity = DatasetIdentity::state(6, true);
        let rows = staged_row("location");

        let err = identity.insert_query(&rows, "tmp; DROP TABLE x").unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidIdentifier(_)));

        let err = insert_query_for(&identity, &rows, "covid", "tmp", &["dt\""]).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidIdentifier(_)));

        assert!(insert_query_for(&identity, &rows, "covid", "pg_temp.tmp", &["dt"]).is_ok());
    }
}
