//! MTR Static-Data Cache
//!
//! Reference datasets (lines & stations, fares, light rail stops) are
//! downloaded as CSV at most once per refresh period and persisted. Live
//! next-train data is never cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Result, TransitError};
use crate::mtr::tabular::parse_rows;
use crate::mtr::{MtrLine, NextTrains, Station, TabularRow, TrainArrival, MTR_LINES};
use crate::net::HttpFetcher;
use crate::storage::Storage;

const LAST_UPDATE_KEY: &str = "mtr_last_update";

/// The three downloadable datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtrDataset {
    LinesAndStations,
    Fares,
    LightRail,
}

impl MtrDataset {
    pub const ALL: [MtrDataset; 3] = [
        MtrDataset::LinesAndStations,
        MtrDataset::Fares,
        MtrDataset::LightRail,
    ];

    /// File name under the open data root.
    pub fn file_name(self) -> &'static str {
        match self {
            MtrDataset::LinesAndStations => "mtr_lines_and_stations.csv",
            MtrDataset::Fares => "mtr_lines_fares.csv",
            MtrDataset::LightRail => "light_rail_routes_and_stops.csv",
        }
    }

    pub fn storage_key(self) -> &'static str {
        match self {
            MtrDataset::LinesAndStations => "mtr_lines_and_stations",
            MtrDataset::Fares => "mtr_fares",
            MtrDataset::LightRail => "mtr_light_rail",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MtrData {
    stations: Vec<TabularRow>,
    fares: Vec<TabularRow>,
    light_rail: Vec<TabularRow>,
    /// Unix ms of the last successful download, 0 = never
    last_update: u64,
}

impl MtrData {
    fn rows(&self, dataset: MtrDataset) -> &Vec<TabularRow> {
        match dataset {
            MtrDataset::LinesAndStations => &self.stations,
            MtrDataset::Fares => &self.fares,
            MtrDataset::LightRail => &self.light_rail,
        }
    }

    fn is_fresh(&self, max_age: Duration, now_ms: u64) -> bool {
        self.last_update != 0
            && now_ms.saturating_sub(self.last_update) < max_age.as_millis() as u64
    }
}

/// Endpoints used by [`MtrService`].
#[derive(Debug, Clone)]
pub struct MtrEndpoints {
    /// Next-train endpoint taking `line` and `sta` query parameters
    pub schedule_url: String,
    /// Directory URL holding the CSV datasets
    pub data_base_url: String,
}

/// Cached MTR reference data plus uncached next-train lookups.
pub struct MtrService {
    fetcher: Arc<HttpFetcher>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    endpoints: MtrEndpoints,
    max_age: Duration,
    data: RwLock<MtrData>,
    init_lock: Mutex<()>,
}

impl MtrService {
    pub fn new(
        endpoints: MtrEndpoints,
        max_age: Duration,
        fetcher: Arc<HttpFetcher>,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            storage,
            clock,
            endpoints,
            max_age,
            data: RwLock::new(MtrData::default()),
            init_lock: Mutex::new(()),
        }
    }

    // == Initialize ==
    /// Makes the reference data available, downloading it when the
    /// persisted copy is missing or older than the refresh period.
    ///
    /// Safe to call repeatedly; concurrent calls run one at a time.
    ///
    /// # Errors
    ///
    /// Propagates the first download or parse failure. Previously loaded
    /// data is left untouched in that case.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        let now = self.clock.now_ms();

        if self.data.read().await.is_fresh(self.max_age, now) {
            debug!("MTR data already fresh");
            return Ok(());
        }

        if let Some(persisted) = self.load_persisted().await {
            let fresh = persisted.is_fresh(self.max_age, now);
            *self.data.write().await = persisted;
            if fresh {
                info!("Loaded MTR reference data from storage");
                return Ok(());
            }
            info!("Persisted MTR reference data is stale, refreshing");
        }

        self.refresh(now).await
    }

    async fn refresh(&self, now: u64) -> Result<()> {
        let (stations, fares, light_rail) = tokio::try_join!(
            self.download(MtrDataset::LinesAndStations),
            self.download(MtrDataset::Fares),
            self.download(MtrDataset::LightRail),
        )?;

        let data = MtrData {
            stations,
            fares,
            light_rail,
            last_update: now,
        };
        info!(
            "Downloaded MTR reference data: {} stations, {} fares, {} light rail stops",
            data.stations.len(),
            data.fares.len(),
            data.light_rail.len()
        );

        if let Err(e) = self.persist(&data).await {
            warn!("Could not persist MTR reference data: {}", e);
        }
        *self.data.write().await = data;
        Ok(())
    }

    async fn download(&self, dataset: MtrDataset) -> Result<Vec<TabularRow>> {
        let url = format!(
            "{}/{}",
            self.endpoints.data_base_url.trim_end_matches('/'),
            dataset.file_name()
        );
        let text = self.fetcher.fetch_text(&url).await?;
        parse_rows(&url, &text)
    }

    async fn persist(&self, data: &MtrData) -> Result<()> {
        for dataset in MtrDataset::ALL {
            let blob = serde_json::to_string(data.rows(dataset))
                .map_err(|e| TransitError::Storage(e.to_string()))?;
            self.storage.set(dataset.storage_key(), &blob).await?;
        }
        // Timestamp last, so a partial write never looks fresh
        self.storage
            .set(LAST_UPDATE_KEY, &data.last_update.to_string())
            .await
    }

    /// Reads all datasets from storage; None unless every blob is present
    /// and readable.
    async fn load_persisted(&self) -> Option<MtrData> {
        let last_update: u64 = self
            .read_blob(LAST_UPDATE_KEY)
            .await?
            .trim()
            .parse()
            .ok()?;

        let mut loaded = HashMap::new();
        for dataset in MtrDataset::ALL {
            let raw = self.read_blob(dataset.storage_key()).await?;
            match serde_json::from_str::<Vec<TabularRow>>(&raw) {
                Ok(rows) => {
                    loaded.insert(dataset.storage_key(), rows);
                }
                Err(e) => {
                    warn!("Discarding persisted {}: {}", dataset.storage_key(), e);
                    return None;
                }
            }
        }

        let mut take = |dataset: MtrDataset| loaded.remove(dataset.storage_key()).unwrap_or_default();
        Some(MtrData {
            stations: take(MtrDataset::LinesAndStations),
            fares: take(MtrDataset::Fares),
            light_rail: take(MtrDataset::LightRail),
            last_update,
        })
    }

    async fn read_blob(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Could not read {}: {}", key, e);
                None
            }
        }
    }

    // == Queries ==
    /// True once reference data has been loaded or downloaded.
    pub async fn is_initialized(&self) -> bool {
        self.data.read().await.last_update != 0
    }

    /// Unix ms of the data currently held, if any.
    pub async fn last_update(&self) -> Option<u64> {
        let last_update = self.data.read().await.last_update;
        (last_update != 0).then_some(last_update)
    }

    /// Every station row of a line ordered by sequence. Empty before
    /// initialization.
    ///
    /// The dataset lists each station once per direction (`UT`, `DT` and
    /// branch variants such as `LMC-DT`), so stations repeat. Use
    /// [`MtrService::get_line_stations_in_direction`] for a single run.
    pub async fn get_line_stations(&self, line_code: &str) -> Vec<Station> {
        self.stations_where(|row| row.get("Line Code") == Some(line_code))
            .await
    }

    /// Stations of a line in one direction, ordered by sequence.
    pub async fn get_line_stations_in_direction(
        &self,
        line_code: &str,
        direction: &str,
    ) -> Vec<Station> {
        self.stations_where(|row| {
            row.get("Line Code") == Some(line_code) && row.get("Direction") == Some(direction)
        })
        .await
    }

    async fn stations_where(&self, keep: impl Fn(&TabularRow) -> bool) -> Vec<Station> {
        let data = self.data.read().await;
        let mut stations: Vec<Station> = data
            .stations
            .iter()
            .filter(|row| keep(row))
            .filter_map(Station::from_row)
            .collect();
        stations.sort_by(|a, b| a.sequence.total_cmp(&b.sequence));
        stations
    }

    /// Stops of a light rail route ordered by sequence.
    pub async fn get_light_rail_stops(&self, route: &str) -> Vec<TabularRow> {
        let data = self.data.read().await;
        let mut rows: Vec<TabularRow> = data
            .light_rail
            .iter()
            .filter(|row| row.get("Line Code") == Some(route))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let seq = |row: &TabularRow| row.get_f64("Sequence").unwrap_or(f64::MAX);
            seq(a).total_cmp(&seq(b))
        });
        rows
    }

    /// Fare row between two station IDs, if published.
    pub async fn get_fare(&self, src_station_id: &str, dest_station_id: &str) -> Option<TabularRow> {
        self.data
            .read()
            .await
            .fares
            .iter()
            .find(|row| {
                row.get("SRC_STATION_ID") == Some(src_station_id)
                    && row.get("DEST_STATION_ID") == Some(dest_station_id)
            })
            .cloned()
    }

    /// Every heavy-rail line with names and colour.
    pub fn get_all_lines(&self) -> &'static [MtrLine] {
        MTR_LINES
    }

    // == Next Trains ==
    /// Live departures for a station. Never cached; failures propagate.
    pub async fn get_next_trains(&self, line_code: &str, station_code: &str) -> Result<NextTrains> {
        if line_code.is_empty() || station_code.is_empty() {
            return Err(TransitError::InvalidParameter(
                "line and station codes must be non-empty".to_string(),
            ));
        }
        let url = Url::parse_with_params(
            &self.endpoints.schedule_url,
            &[("line", line_code), ("sta", station_code)],
        )
        .map_err(|e| TransitError::InvalidParameter(format!("schedule URL: {e}")))?;

        let response = self.fetcher.fetch_json_once(url.as_str()).await?;
        parse_schedule(url.as_str(), response, line_code, station_code)
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    curr_time: Option<String>,
    #[serde(default, rename = "isdelay")]
    is_delay: Option<String>,
    #[serde(default)]
    data: HashMap<String, StationSchedule>,
}

#[derive(Debug, Default, Deserialize)]
struct StationSchedule {
    #[serde(default)]
    curr_time: Option<String>,
    #[serde(default, rename = "UP")]
    up: Vec<TrainArrival>,
    #[serde(default, rename = "DOWN")]
    down: Vec<TrainArrival>,
}

fn parse_schedule(
    url: &str,
    response: serde_json::Value,
    line_code: &str,
    station_code: &str,
) -> Result<NextTrains> {
    let parsed: ScheduleResponse = serde_json::from_value(response)
        .map_err(|e| TransitError::data_shape(url, e.to_string()))?;

    if parsed.status == Some(0) {
        return Err(TransitError::data_shape(
            url,
            parsed
                .message
                .unwrap_or_else(|| "schedule unavailable".to_string()),
        ));
    }

    let mut data = parsed.data;
    let schedule = data
        .remove(&format!("{line_code}-{station_code}"))
        .unwrap_or_default();

    Ok(NextTrains {
        line_code: line_code.to_string(),
        station_code: station_code.to_string(),
        current_time: schedule.curr_time.or(parsed.curr_time),
        is_delay: parsed.is_delay.as_deref() == Some("Y"),
        up: schedule.up,
        down: schedule.down,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_schedule() {
        let response = json!({
            "status": 1,
            "message": "successful",
            "curr_time": "2024-03-01 12:00:00",
            "isdelay": "N",
            "data": {
                "TKL-TKO": {
                    "curr_time": "2024-03-01 12:00:01",
                    "UP": [{"seq": "1", "dest": "POA", "plat": "1", "time": "2024-03-01 12:02:00", "ttnt": "2", "valid": "Y", "source": "-"}],
                    "DOWN": []
                }
            }
        });

        let trains = parse_schedule("u", response, "TKL", "TKO").unwrap();
        assert_eq!(trains.up.len(), 1);
        assert_eq!(trains.up[0].dest, "POA");
        assert!(trains.down.is_empty());
        assert!(!trains.is_delay);
        assert_eq!(trains.current_time.as_deref(), Some("2024-03-01 12:00:01"));
    }

    #[test]
    fn test_parse_schedule_error_status() {
        let response = json!({"status": 0, "message": "The contents are empty!"});
        let err = parse_schedule("u", response, "TKL", "TKO").unwrap_err();
        assert!(matches!(err, TransitError::DataShape { .. }));
        assert!(err.to_string().contains("The contents are empty!"));
    }

    #[test]
    fn test_parse_schedule_missing_station_is_empty() {
        let response = json!({"status": 1, "isdelay": "Y", "data": {}});
        let trains = parse_schedule("u", response, "TKL", "TKO").unwrap();
        assert!(trains.up.is_empty());
        assert!(trains.is_delay);
    }

    #[test]
    fn test_data_freshness() {
        let day = Duration::from_secs(86_400);
        let mut data = MtrData::default();
        assert!(!data.is_fresh(day, 1_000));

        data.last_update = 1_000;
        assert!(data.is_fresh(day, 1_000 + 86_399_999));
        assert!(!data.is_fresh(day, 1_000 + 86_400_000));
    }
}
