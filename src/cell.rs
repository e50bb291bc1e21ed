//! # Radio Readings Module
//!
//! Raw readings as delivered by a [`RadioProvider`](crate::provider::RadioProvider)
//! on every tick. Nothing here is persisted as-is; the metrics composer turns a
//! [`RadioSnapshot`] into a telemetry record.
//!
//! ## Key Types
//! - `CellReading`: one detected cell, tagged by radio generation
//! - `RadioSnapshot`: every reading the provider exposes for a single tick
//!
//! Values the radio does not report are `None` and end up as sentinels in the
//! record, never as errors.

/// Public land mobile network identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plmn {
    pub mcc: String,
    pub mnc: String,
}

impl Plmn {
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }

    /// Concatenated MCC+MNC, the way registered PLMNs are usually printed
    pub fn code(&self) -> String {
        format!("{}{}", self.mcc, self.mnc)
    }
}

/// LTE cell identity and signal strength
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LteCell {
    pub registered: bool,
    pub plmn: Option<Plmn>,
    pub pci: Option<i32>,
    pub tac: Option<i32>,
    pub ci: Option<i64>,
    pub earfcn: Option<i64>,
    pub rsrp: Option<i32>,
    pub rsrq: Option<i32>,
    pub rssnr: Option<i32>,
    pub dbm: Option<i32>,
    pub qci: Option<i32>,
    /// Provider strength bucket, nominally 0..=4
    pub level: i32,
    pub asu: i32,
}

/// NR cell identity and signal strength
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NrCell {
    pub registered: bool,
    pub plmn: Option<Plmn>,
    pub pci: Option<i32>,
    pub tac: Option<i32>,
    pub nci: Option<i64>,
    pub nrarfcn: Option<i64>,
    pub ss_rsrp: Option<i32>,
    pub ss_rsrq: Option<i32>,
    pub ss_sinr: Option<i32>,
    pub dbm: Option<i32>,
    pub level: i32,
    pub asu: i32,
}

/// A detected cell, tagged by radio generation
#[derive(Debug, Clone, PartialEq)]
pub enum CellReading {
    Lte(LteCell),
    Nr(NrCell),
    /// A generation the composer has no accessors for (GSM, WCDMA, ...)
    Unknown { registered: bool },
}

impl CellReading {
    pub fn is_registered(&self) -> bool {
        match self {
            CellReading::Lte(cell) => cell.registered,
            CellReading::Nr(cell) => cell.registered,
            CellReading::Unknown { registered } => *registered,
        }
    }
}

/// Service state reported by the modem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    InService,
    OutOfService,
    EmergencyOnly,
    PowerOff,
}

/// Packet data connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Disconnected,
    Connecting,
    Connected,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Ready,
    Absent,
    Other,
}

/// Everything the provider exposes for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct RadioSnapshot {
    /// Whether the fine-location capability is granted
    pub location_permission: bool,
    /// Serving and neighbour cells, in provider order
    pub cells: Vec<CellReading>,
    /// Raw data network type code
    pub network_type: i32,
    pub carrier_name: Option<String>,
    /// Operator MCC+MNC as one string, e.g. "44010"
    pub network_operator: Option<String>,
    pub sim_operator_name: Option<String>,
    pub service_state: Option<ServiceState>,
    pub data_state: Option<DataState>,
    pub sim_state: Option<SimState>,
}

impl Default for RadioSnapshot {
    fn default() -> Self {
        Self {
            location_permission: true,
            cells: Vec::new(),
            network_type: 0,
            carrier_name: None,
            network_operator: None,
            sim_operator_name: None,
            service_state: None,
            data_state: None,
            sim_state: None,
        }
    }
}

impl RadioSnapshot {
    /// The first registered cell, if any
    pub fn serving_cell(&self) -> Option<&CellReading> {
        self.cells.iter().find(|c| c.is_registered())
    }

    /// Non-registered cells, at most `limit` of them
    pub fn neighbors(&self, limit: usize) -> impl Iterator<Item = &CellReading> {
        self.cells.iter().filter(|c| !c.is_registered()).take(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serving_cell_is_first_registered() {
        let snapshot = RadioSnapshot {
            cells: vec![
                CellReading::Lte(LteCell { pci: Some(1), ..Default::default() }),
                CellReading::Nr(NrCell { registered: true, pci: Some(2), ..Default::default() }),
                CellReading::Lte(LteCell { registered: true, pci: Some(3), ..Default::default() }),
            ],
            ..Default::default()
        };

        match snapshot.serving_cell() {
            Some(CellReading::Nr(cell)) => assert_eq!(cell.pci, Some(2)),
            other => panic!("unexpected serving cell: {:?}", other),
        }
    }

    #[test]
    fn test_neighbors_skip_registered_and_respect_limit() {
        let mut cells = vec![CellReading::Unknown { registered: true }];
        for pci in 0..8 {
            cells.push(CellReading::Lte(LteCell { pci: Some(pci), ..Default::default() }));
        }
        let snapshot = RadioSnapshot { cells, ..Default::default() };

        assert_eq!(snapshot.neighbors(5).count(), 5);
        assert!(snapshot.neighbors(5).all(|c| !c.is_registered()));
    }

    #[test]
    fn test_plmn_code() {
        assert_eq!(Plmn::new("440", "10").code(), "44010");
    }
}
