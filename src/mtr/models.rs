//! MTR reference data and live schedule types.

use serde::{Deserialize, Serialize};

use crate::mtr::TabularRow;

/// A heavy-rail line with its brand colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MtrLine {
    pub code: &'static str,
    pub name_en: &'static str,
    pub name_tc: &'static str,
    pub color: &'static str,
}

/// Heavy-rail lines served by the next-train API.
pub const MTR_LINES: &[MtrLine] = &[
    MtrLine { code: "AEL", name_en: "Airport Express", name_tc: "機場快綫", color: "#00888A" },
    MtrLine { code: "TCL", name_en: "Tung Chung Line", name_tc: "東涌綫", color: "#F7943E" },
    MtrLine { code: "TML", name_en: "Tuen Ma Line", name_tc: "屯馬綫", color: "#923011" },
    MtrLine { code: "TKL", name_en: "Tseung Kwan O Line", name_tc: "將軍澳綫", color: "#7D499D" },
    MtrLine { code: "EAL", name_en: "East Rail Line", name_tc: "東鐵綫", color: "#53B7E8" },
    MtrLine { code: "SIL", name_en: "South Island Line", name_tc: "南港島綫", color: "#BAC429" },
    MtrLine { code: "TWL", name_en: "Tsuen Wan Line", name_tc: "荃灣綫", color: "#ED1D24" },
    MtrLine { code: "ISL", name_en: "Island Line", name_tc: "港島綫", color: "#0860A8" },
    MtrLine { code: "KTL", name_en: "Kwun Tong Line", name_tc: "觀塘綫", color: "#00AB4E" },
    MtrLine { code: "DRL", name_en: "Disneyland Resort Line", name_tc: "迪士尼綫", color: "#F173AC" },
];

/// A station on a line, from `mtr_lines_and_stations.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub line_code: String,
    /// `UT`/`DT`, or a branch marker such as `LMC-DT`
    pub direction: String,
    pub station_code: String,
    pub station_id: String,
    pub chinese_name: String,
    pub english_name: String,
    pub sequence: f64,
}

impl Station {
    /// Builds a station from a CSV row. Rows without a line code, station
    /// code or numeric sequence are rejected.
    pub fn from_row(row: &TabularRow) -> Option<Self> {
        let text = |column: &str| row.get(column).unwrap_or_default().to_string();
        let line_code = row.get("Line Code").filter(|s| !s.is_empty())?.to_string();
        let station_code = row.get("Station Code").filter(|s| !s.is_empty())?.to_string();
        Some(Self {
            line_code,
            direction: text("Direction"),
            station_code,
            station_id: text("Station ID"),
            chinese_name: text("Chinese Name"),
            english_name: text("English Name"),
            sequence: row.get_f64("Sequence")?,
        })
    }
}

/// Next departures from one station, from the live schedule endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NextTrains {
    pub line_code: String,
    pub station_code: String,
    /// Time the schedule was produced, as reported upstream
    pub current_time: Option<String>,
    pub is_delay: bool,
    pub up: Vec<TrainArrival>,
    pub down: Vec<TrainArrival>,
}

/// One scheduled arrival.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainArrival {
    pub seq: String,
    /// Destination station code
    pub dest: String,
    pub plat: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    /// Minutes until arrival
    pub ttnt: String,
    pub valid: String,
    pub source: String,
}
