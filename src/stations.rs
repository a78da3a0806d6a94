//! # Station Lookup
//!
//! Resolves city names to air-quality monitoring stations through the WAQI
//! search API, and writes a plain-text report of the results.

use crate::error::{Error, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const WAQI_BASE_URL: &str = "https://api.waqi.info";

/// A monitoring station with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    station: StationEntry,
}

#[derive(Debug, Deserialize)]
struct StationEntry {
    name: String,
    geo: Vec<f64>,
}

/// Parses the body of a `/search/` response.
///
/// A `status` other than `ok` is reported as [`Error::StationLookup`], with
/// the API's message when it sent one.
pub fn parse_search_response(city: &str, body: &str) -> Result<Vec<Station>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    if response.status != "ok" {
        let reason = match &response.data {
            serde_json::Value::String(msg) => msg.clone(),
            _ => format!("status '{}'", response.status),
        };
        return Err(Error::StationLookup {
            city: city.to_string(),
            reason,
        });
    }

    let entries: Vec<SearchEntry> = serde_json::from_value(response.data)?;
    entries
        .into_iter()
        .map(|entry| match entry.station.geo.as_slice() {
            [lat, lon, ..] => Ok(Station {
                name: entry.station.name,
                latitude: *lat,
                longitude: *lon,
            }),
            _ => Err(Error::StationLookup {
                city: city.to_string(),
                reason: format!("station '{}' has no coordinates", entry.station.name),
            }),
        })
        .collect()
}

/// Queries `{base_url}/search/` for stations matching `city`.
pub async fn fetch_stations(
    client: &reqwest::Client,
    base_url: &str,
    city: &str,
    token: &str,
) -> Result<Vec<Station>> {
    let url = format!("{}/search/", base_url.trim_end_matches('/'));
    debug!("Querying {} for '{}'", url, city);
    let body = client
        .get(&url)
        .query(&[("token", token), ("keyword", city)])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let stations = parse_search_response(city, &body)?;
    info!("Found {} stations for {}", stations.len(), city);
    Ok(stations)
}

/// Looks up every city in turn. Results keep the order of `cities`.
pub async fn lookup_cities(
    client: &reqwest::Client,
    base_url: &str,
    cities: &[String],
    token: &str,
) -> Result<Vec<(String, Vec<Station>)>> {
    let mut results = Vec::with_capacity(cities.len());
    for city in cities {
        let stations = fetch_stations(client, base_url, city, token).await?;
        results.push((city.clone(), stations));
    }
    Ok(results)
}

/// Writes one `City:` block per city, each followed by a blank line.
pub fn write_station_report<W: Write>(
    writer: &mut W,
    results: &[(String, Vec<Station>)],
) -> Result<()> {
    for (city, stations) in results {
        writeln!(writer, "City: {}", city)?;
        for s in stations {
            writeln!(
                writer,
                " Station Name: {}, Latitude: {}, Longitude: {}",
                s.name, s.latitude, s.longitude
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn save_station_report<P: AsRef<Path>>(
    path: P,
    results: &[(String, Vec<Station>)],
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_station_report(&mut writer, results)?;
    writer.flush()?;
    info!("Data has been saved to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "status": "ok",
        "data": [
            {"uid": 1, "aqi": "31", "station": {"name": "London Westminster", "geo": [51.4946, -0.1319]}},
            {"uid": 2, "aqi": "-", "station": {"name": "London Bloomsbury", "geo": [51.5223, -0.1259], "url": "x"}}
        ]
    }"#;

    #[test]
    fn test_parse_ok_response() {
        let stations = parse_search_response("London", LONDON).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "London Westminster");
        assert_eq!(stations[0].latitude, 51.4946);
        assert_eq!(stations[1].longitude, -0.1259);
    }

    #[test]
    fn test_error_status_is_an_error() {
        let err = parse_search_response("London", r#"{"status": "error", "data": "Invalid key"}"#)
            .unwrap_err();
        match err {
            Error::StationLookup { city, reason } => {
                assert_eq!(city, "London");
                assert_eq!(reason, "Invalid key");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_report_format() {
        let results = vec![
            (
                "London".to_string(),
                vec![Station {
                    name: "Westminster".to_string(),
                    latitude: 51.5,
                    longitude: -0.13,
                }],
            ),
            ("Nowhere".to_string(), vec![]),
        ];
        let mut out = Vec::new();
        write_station_report(&mut out, &results).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "City: London\n Station Name: Westminster, Latitude: 51.5, Longitude: -0.13\n\nCity: Nowhere\n\n"
        );
    }
}
