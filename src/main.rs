use anyhow::Context;
use covid_dashboards::config::ClientConfig;
use covid_dashboards::export::write_csv;
use covid_dashboards::models::cell_text;
use covid_dashboards::scrapers::{
    CdcVaccineAllocations, CdcVaccineTotal, HttpTransport, ScraperTrait, Transport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DATASETS: [&str; 3] = ["moderna", "pfizer", "total"];

/// What a command line asks for
#[derive(Debug, PartialEq)]
enum Plan<'a> {
    NoArgs,
    Unknown(&'a str),
    Run {
        dataset: &'a str,
        csv_path: Option<PathBuf>,
    },
}

/// `<moderna|pfizer|total> [csv]`; a trailing literal `csv` requests `<dataset>.csv`
fn plan(args: &[String]) -> Plan<'_> {
    let Some(dataset) = args.first().map(String::as_str) else {
        return Plan::NoArgs;
    };
    if !DATASETS.contains(&dataset) {
        return Plan::Unknown(dataset);
    }

    let csv_path = (args.last().map(String::as_str) == Some("csv"))
        .then(|| PathBuf::from(format!("{}.csv", dataset)));
    Plan::Run { dataset, csv_path }
}

fn select(prompt: &str, transport: Arc<dyn Transport>) -> Option<Box<dyn ScraperTrait>> {
    match prompt {
        "moderna" => Some(Box::new(CdcVaccineAllocations::moderna(transport))),
        "pfizer" => Some(Box::new(CdcVaccineAllocations::pfizer(transport))),
        "total" => Some(Box::new(CdcVaccineTotal::new(transport))),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (dataset, csv_path) = match plan(&args) {
        Plan::NoArgs => {
            println!("no args supplied. bye");
            return Ok(());
        }
        Plan::Unknown(prompt) => {
            println!(
                "unknown dataset '{}'; expected {}. bye",
                prompt,
                DATASETS.join(", ")
            );
            return Ok(());
        }
        Plan::Run { dataset, csv_path } => (dataset, csv_path),
    };

    let config = ClientConfig::from_env();
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::with_config(&config).context("Failed to create HTTP client")?);

    let scraper = select(dataset, transport)
        .with_context(|| format!("No scraper registered for {}", dataset))?;

    info!("Scraping {}", scraper.source_name());
    let raw = scraper
        .fetch()
        .await
        .with_context(|| format!("Failed to fetch {}", scraper.source_name()))?;
    let df = scraper
        .normalize(raw)
        .with_context(|| format!("Failed to normalize {}", scraper.source_name()))?;

    println!("{}", df);
    for value in df.unique("loc_name") {
        println!("{}", cell_text(value));
    }

    if let Some(path) = csv_path {
        println!("\nwriting to csv...");
        write_csv(&path, &df).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("done +++");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn no_args_plans_nothing() {
        assert_eq!(plan(&[]), Plan::NoArgs);
    }

    #[test]
    fn unknown_dataset_is_reported() {
        let argv = args(&["foo"]);
        assert_eq!(plan(&argv), Plan::Unknown("foo"));

        let argv = args(&["csv"]);
        assert_eq!(plan(&argv), Plan::Unknown("csv"));
    }

    #[test]
    fn dataset_without_csv() {
        let argv = args(&["moderna"]);
        assert_eq!(
            plan(&argv),
            Plan::Run {
                dataset: "moderna",
                csv_path: None
            }
        );
    }

    #[test]
    fn trailing_csv_names_the_file() {
        let argv = args(&["pfizer", "csv"]);
        assert_eq!(
            plan(&argv),
            Plan::Run {
                dataset: "pfizer",
                csv_path: Some(PathBuf::from("pfizer.csv"))
            }
        );

        // Only the last argument counts
        let argv = args(&["total", "csv", "now"]);
        assert_eq!(
            plan(&argv),
            Plan::Run {
                dataset: "total",
                csv_path: None
            }
        );
    }

    #[test]
    fn every_dataset_has_a_scraper() {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new().unwrap());
        for dataset in DATASETS {
            assert!(select(dataset, transport.clone()).is_some(), "{}", dataset);
        }
        assert!(select("foo", transport).is_none());
    }
}
