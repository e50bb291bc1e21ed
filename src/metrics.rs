//! # Metrics Composition Module
//!
//! Turns one tick's raw provider readings into a [`TelemetryRecord`]: an
//! ordered list of label/value pairs. The order is the display order and the
//! CSV column order, so it is fixed (see [`labels`]).
//!
//! ## Responsibilities
//! 1. Select the serving cell and render its LTE or NR fields
//! 2. Classify the channel number into a band
//! 3. Render strength bucket, network type and modem states as labels
//! 4. Format throughput and neighbour cells
//!
//! The composer holds no history. When the serving cell reports a power value
//! it is returned in [`Composition::rsrp_sample`] and the caller decides where
//! it goes.

use crate::band;
use crate::cell::{CellReading, DataState, LteCell, NrCell, RadioSnapshot, ServiceState, SimState};
use crate::throughput::ThroughputSample;
use chrono::{DateTime, Local};

/// Sentinel for values the radio did not supply or that have no label
pub const UNKNOWN: &str = "Unknown";

/// Neighbour cells rendered per record
pub const MAX_NEIGHBORS: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field labels, in record order
pub mod labels {
    /// Bumped whenever the column set or order changes; carried in the first header cell
    pub const SCHEMA_VERSION: u32 = 2;

    pub const TIMESTAMP: &str = "Timestamp(v2)";
    pub const PERMISSION: &str = "Permission";
    pub const NETWORK_TYPE: &str = "NetworkType";
    pub const CARRIER: &str = "Carrier";
    pub const MCC_MNC: &str = "MCC / MNC";
    pub const CELL_TYPE: &str = "CellType";
    pub const CELL_ID: &str = "ECI/NCI";
    pub const TAC: &str = "TAC";
    pub const PCI: &str = "PCI";
    pub const RSRP: &str = "RSRP(dBm)";
    pub const RSRQ: &str = "RSRQ(dB)";
    pub const SINR: &str = "SINR(dB)";
    pub const BAND: &str = "Band";
    pub const QCI: &str = "QCI";
    pub const DL_THROUGHPUT: &str = "DL Thp.(Mbps)";
    pub const UL_THROUGHPUT: &str = "UL Thp.(Mbps)";
    pub const NEIGHBOR_CELL: &str = "Neighbor Cell";
    pub const SIGNAL_LEVEL: &str = "OS評価レベル";
    pub const CHANNEL: &str = "EARFCN/NRARFCN";
    pub const ASU: &str = "ASU";
    pub const IS_REGISTERED: &str = "is_Registered";
    pub const REGISTERED_PLMN: &str = "Registered PLMN";
    pub const APN: &str = "APN";
    pub const SERVICE_STATE: &str = "サービス状態";
    pub const DATA_STATE: &str = "データ接続状態";
    pub const SIM_STATE: &str = "SIMカード状態";

    /// Column order of a full record
    pub const SCHEMA: [&str; 25] = [
        TIMESTAMP,
        NETWORK_TYPE,
        CARRIER,
        MCC_MNC,
        CELL_TYPE,
        CELL_ID,
        TAC,
        PCI,
        RSRP,
        RSRQ,
        SINR,
        BAND,
        QCI,
        DL_THROUGHPUT,
        UL_THROUGHPUT,
        NEIGHBOR_CELL,
        SIGNAL_LEVEL,
        CHANNEL,
        ASU,
        IS_REGISTERED,
        REGISTERED_PLMN,
        APN,
        SERVICE_STATE,
        DATA_STATE,
        SIM_STATE,
    ];
}

/// One label/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// Ordered label/value pairs for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryRecord {
    fields: Vec<Field>,
}

impl TelemetryRecord {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.value.as_str())
    }

    /// True for the reduced record produced without location permission
    pub fn is_permission_missing(&self) -> bool {
        self.get(labels::PERMISSION).is_some()
    }

    /// Copy with multi-line values joined by "; " so each fits one CSV cell
    pub fn single_line(&self) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|f| Field {
                name: f.name.clone(),
                value: f.value.replace('\n', "; "),
            })
            .collect();
        Self { fields }
    }
}

/// What the platform exposes beyond the basic accessors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioCapabilities {
    /// NR SINR and RSRQ are readable
    pub nr_signal_quality: bool,
}

/// Result of composing one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub record: TelemetryRecord,
    /// Serving-cell power for the RSRP graph, if one was reported
    pub rsrp_sample: Option<f64>,
}

/// Label for the provider's 0..=4 strength bucket
pub fn signal_level_label(level: i32) -> &'static str {
    match level {
        4 => "Excellent",
        3 => "Good",
        2 => "Moderate",
        1 => "Poor",
        0 => "None/Unknown",
        _ => UNKNOWN,
    }
}

/// Label for a raw data network type code
pub fn network_type_label(code: i32) -> String {
    let name = match code {
        1 => "GPRS",
        2 => "EDGE",
        3 => "UMTS",
        4 => "CDMA",
        5 => "EVDO rev.0",
        6 => "EVDO rev.A",
        7 => "1xRTT",
        8 => "HSDPA",
        9 => "HSUPA",
        10 => "HSPA",
        11 => "iDEN",
        12 => "EVDO rev.B",
        13 => "LTE",
        14 => "eHRPD",
        15 => "HSPA+",
        16 => "GSM",
        17 => "TD-SCDMA",
        18 => "IWLAN",
        20 => "5G NR",
        _ => return format!("{}({})", UNKNOWN, code),
    };
    name.to_string()
}

pub fn service_state_label(state: Option<ServiceState>) -> &'static str {
    match state {
        Some(ServiceState::InService) => "In service",
        Some(ServiceState::OutOfService) => "Out of service",
        Some(ServiceState::EmergencyOnly) => "Emergency only",
        Some(ServiceState::PowerOff) => "Power off",
        None => UNKNOWN,
    }
}

pub fn data_state_label(state: Option<DataState>) -> &'static str {
    match state {
        Some(DataState::Connected) => "Connected",
        Some(DataState::Connecting) => "Connecting",
        Some(DataState::Disconnected) => "Disconnected",
        Some(DataState::Suspended) => "Suspended",
        None => UNKNOWN,
    }
}

pub fn sim_state_label(state: Option<SimState>) -> &'static str {
    match state {
        Some(SimState::Ready) => "READY",
        Some(SimState::Absent) => "ABSENT",
        Some(SimState::Other) | None => "OTHER",
    }
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_mbps(rate: f64) -> String {
    let rate = if rate.is_finite() { rate } else { 0.0 };
    format!("{:.2}", rate)
}

/// Split an operator string into "MCC / MNC"; empty when too short
fn format_mcc_mnc(operator: Option<&str>) -> String {
    match operator {
        Some(op) if op.len() >= 5 && op.is_char_boundary(3) => {
            format!("{} / {}", &op[..3], &op[3..])
        }
        _ => String::new(),
    }
}

/// Cell-specific columns; empty until a serving cell fills them
#[derive(Default)]
struct CellFields {
    cell_type: String,
    cell_id: String,
    tac: String,
    pci: String,
    rsrp: String,
    rsrq: String,
    sinr: String,
    band: String,
    qci: String,
    level: String,
    channel: String,
    asu: String,
    registered: String,
    plmn: String,
}

impl CellFields {
    fn absent() -> Self {
        Self {
            registered: UNKNOWN.to_string(),
            ..Default::default()
        }
    }

    fn lte(cell: &LteCell) -> Self {
        Self {
            cell_type: "LTE".to_string(),
            cell_id: or_unknown(cell.ci),
            tac: or_unknown(cell.tac),
            pci: or_unknown(cell.pci),
            rsrp: or_unknown(cell.rsrp),
            rsrq: or_unknown(cell.rsrq),
            sinr: or_unknown(cell.rssnr),
            band: cell
                .earfcn
                .map(band::classify_lte)
                .unwrap_or(band::UNKNOWN_BAND)
                .to_string(),
            qci: or_unknown(cell.qci),
            level: signal_level_label(cell.level).to_string(),
            channel: or_unknown(cell.earfcn),
            asu: cell.asu.to_string(),
            registered: cell.registered.to_string(),
            plmn: cell.plmn.as_ref().map(|p| p.code()).unwrap_or_default(),
        }
    }

    fn nr(cell: &NrCell, capabilities: RadioCapabilities) -> Self {
        let (rsrq, sinr) = if capabilities.nr_signal_quality {
            (or_unknown(cell.ss_rsrq), or_unknown(cell.ss_sinr))
        } else {
            (UNKNOWN.to_string(), UNKNOWN.to_string())
        };
        Self {
            cell_type: "NR".to_string(),
            cell_id: or_unknown(cell.nci),
            tac: or_unknown(cell.tac),
            pci: or_unknown(cell.pci),
            rsrp: or_unknown(nr_power(cell)),
            rsrq,
            sinr,
            band: cell
                .nrarfcn
                .map(band::classify_nr)
                .unwrap_or(band::UNKNOWN_BAND)
                .to_string(),
            qci: UNKNOWN.to_string(),
            level: signal_level_label(cell.level).to_string(),
            channel: or_unknown(cell.nrarfcn),
            asu: cell.asu.to_string(),
            registered: cell.registered.to_string(),
            plmn: cell.plmn.as_ref().map(|p| p.code()).unwrap_or_default(),
        }
    }

    fn unknown_generation() -> Self {
        Self {
            cell_type: UNKNOWN.to_string(),
            registered: true.to_string(),
            ..Default::default()
        }
    }
}

fn nr_power(cell: &NrCell) -> Option<i32> {
    cell.ss_rsrp.or(cell.dbm)
}

fn neighbor_line(ordinal: usize, cell: &CellReading) -> String {
    match cell {
        CellReading::Lte(c) => format!("{}. LTE:{}/{}", ordinal, or_dash(c.pci), or_dash(c.dbm)),
        CellReading::Nr(c) => format!("{}. NR:{}/{}", ordinal, or_dash(c.nci), or_dash(c.dbm)),
        CellReading::Unknown { .. } => format!("{}. -", ordinal),
    }
}

/// Builds telemetry records from raw provider readings
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsComposer {
    capabilities: RadioCapabilities,
}

impl MetricsComposer {
    pub fn new(capabilities: RadioCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn compose(
        &self,
        snapshot: &RadioSnapshot,
        throughput: &ThroughputSample,
        now: DateTime<Local>,
    ) -> Composition {
        let mut record = TelemetryRecord::new();
        record.push(labels::TIMESTAMP, now.format(TIMESTAMP_FORMAT).to_string());

        if !snapshot.location_permission {
            record.push(labels::PERMISSION, "ACCESS_FINE_LOCATION missing");
            return Composition {
                record,
                rsrp_sample: None,
            };
        }

        let (cell, rsrp_sample) = match snapshot.serving_cell() {
            Some(CellReading::Lte(c)) => (CellFields::lte(c), c.rsrp.map(f64::from)),
            Some(CellReading::Nr(c)) => (
                CellFields::nr(c, self.capabilities),
                nr_power(c).map(f64::from),
            ),
            Some(CellReading::Unknown { .. }) => (CellFields::unknown_generation(), None),
            None => (CellFields::absent(), None),
        };

        let neighbors = snapshot
            .neighbors(MAX_NEIGHBORS)
            .enumerate()
            .map(|(i, c)| neighbor_line(i + 1, c))
            .collect::<Vec<_>>()
            .join("\n");

        record.push(labels::NETWORK_TYPE, network_type_label(snapshot.network_type));
        record.push(labels::CARRIER, snapshot.carrier_name.clone().unwrap_or_default());
        record.push(labels::MCC_MNC, format_mcc_mnc(snapshot.network_operator.as_deref()));
        record.push(labels::CELL_TYPE, cell.cell_type);
        record.push(labels::CELL_ID, cell.cell_id);
        record.push(labels::TAC, cell.tac);
        record.push(labels::PCI, cell.pci);
        record.push(labels::RSRP, cell.rsrp);
        record.push(labels::RSRQ, cell.rsrq);
        record.push(labels::SINR, cell.sinr);
        record.push(labels::BAND, cell.band);
        record.push(labels::QCI, cell.qci);
        record.push(labels::DL_THROUGHPUT, format_mbps(throughput.download_mbps()));
        record.push(labels::UL_THROUGHPUT, format_mbps(throughput.upload_mbps()));
        record.push(labels::NEIGHBOR_CELL, neighbors);
        record.push(labels::SIGNAL_LEVEL, cell.level);
        record.push(labels::CHANNEL, cell.channel);
        record.push(labels::ASU, cell.asu);
        record.push(labels::IS_REGISTERED, cell.registered);
        record.push(labels::REGISTERED_PLMN, cell.plmn);
        record.push(
            labels::APN,
            snapshot
                .sim_operator_name
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
        );
        record.push(labels::SERVICE_STATE, service_state_label(snapshot.service_state));
        record.push(labels::DATA_STATE, data_state_label(snapshot.data_state));
        record.push(labels::SIM_STATE, sim_state_label(snapshot.sim_state));
        debug_assert!(record.names().eq(labels::SCHEMA.iter().copied()));

        Composition {
            record,
            rsrp_sample,
        }
    }
}
