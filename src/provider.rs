//! # Radio Provider Module
//!
//! The source of raw readings. The sampling loop and the monitor both pull
//! from a shared [`RadioProvider`]; neither cares where the numbers come from.
//!
//! ## Providers
//! - `SimulatedRadio`: synthetic serving/neighbour cells with random-walk
//!   signal values, alternating between LTE and NR periods. The walk advances
//!   with wall time, not with calls, so any number of readers see the same
//!   cadence. A short outage at the end of every cycle runs the modem through
//!   its off-nominal states
//! - `SystemTraffic`: host byte counters from `/proc/net/dev`, used by the
//!   simulated radio for real throughput figures when available
//!
//! Every reading may be absent. Providers return `None`/defaults instead of
//! failing, and the composer turns gaps into sentinels.

use crate::cell::{
    CellReading, DataState, LteCell, NrCell, Plmn, RadioSnapshot, ServiceState, SimState,
};
use crate::error::ProviderError;
use crate::throughput::TrafficTotals;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait RadioProvider: Send + Sync {
    /// Cells, network type and modem states for this instant
    fn snapshot(&self) -> RadioSnapshot;

    /// Cumulative received/sent bytes, if the host exposes them
    fn traffic(&self) -> Option<TrafficTotals>;
}

const NET_DEV_PATH: &str = "/proc/net/dev";

/// Host-wide byte counters summed over every non-loopback interface
#[derive(Debug, Clone)]
pub struct SystemTraffic {
    path: PathBuf,
}

impl SystemTraffic {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The host's counter file, if it can be read right now
    pub fn detect() -> Option<Self> {
        let traffic = Self::new(NET_DEV_PATH);
        match traffic.read() {
            Ok(_) => {
                log::info!("Reading host traffic counters from {}", traffic.path().display());
                Some(traffic)
            }
            Err(e) => {
                log::warn!("Host traffic counters not available: {}", e);
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<TrafficTotals, ProviderError> {
        let contents = fs::read_to_string(&self.path).map_err(ProviderError::CountersUnavailable)?;
        parse_net_dev(&contents)
    }
}

/// Sum rx/tx bytes from `/proc/net/dev` contents, skipping `lo`
pub fn parse_net_dev(contents: &str) -> Result<TrafficTotals, ProviderError> {
    let mut lines = contents.lines();
    // two header lines
    if lines.next().is_none() || lines.next().is_none() {
        return Err(ProviderError::Parse("missing header".to_string()));
    }

    let mut totals = TrafficTotals::default();
    for line in lines {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        if name.trim() == "lo" {
            continue;
        }
        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            return Err(ProviderError::Parse(format!(
                "interface {} has {} counters",
                name.trim(),
                fields.len()
            )));
        }
        let parse = |s: &str| {
            s.parse::<u64>()
                .map_err(|e| ProviderError::Parse(format!("{}: {}", s, e)))
        };
        totals.rx_bytes = totals.rx_bytes.saturating_add(parse(fields[0])?);
        totals.tx_bytes = totals.tx_bytes.saturating_add(parse(fields[8])?);
    }
    Ok(totals)
}

/// Walk steps per second of wall time
const STEPS_PER_SEC: u64 = 1;
/// Steps spent on each generation before switching
const GENERATION_PERIOD: u64 = 30;
/// Steps in one modem-state cycle
const MODEM_CYCLE: u64 = 120;
/// Steps replayed at most when a reader comes back after a pause
const MAX_CATCH_UP: u64 = 10;
const LTE_NETWORK_TYPE: i32 = 13;
const NR_NETWORK_TYPE: i32 = 20;

struct WalkState {
    steps: u64,
    rsrp: i32,
    rsrq: i32,
    sinr: i32,
    rx_bytes: u64,
    tx_bytes: u64,
    last_traffic: Instant,
}

impl WalkState {
    fn step(&mut self, rng: &mut impl Rng) {
        self.rsrp = (self.rsrp + rng.random_range(-3..=3)).clamp(-130, -70);
        self.rsrq = (self.rsrq + rng.random_range(-1..=1)).clamp(-20, -3);
        self.sinr = (self.sinr + rng.random_range(-2..=2)).clamp(-5, 30);
    }
}

/// Modem states at `step`. The last steps of each cycle are an outage: radio
/// off, SIM reseated, then back through emergency-only to a fresh attach.
fn modem_states(step: u64) -> (ServiceState, DataState, SimState) {
    match step % MODEM_CYCLE {
        114 => (ServiceState::PowerOff, DataState::Disconnected, SimState::Ready),
        115 => (ServiceState::OutOfService, DataState::Disconnected, SimState::Absent),
        116 => (ServiceState::OutOfService, DataState::Disconnected, SimState::Other),
        117 => (ServiceState::EmergencyOnly, DataState::Suspended, SimState::Ready),
        118 => (ServiceState::InService, DataState::Connecting, SimState::Ready),
        _ => (ServiceState::InService, DataState::Connected, SimState::Ready),
    }
}

/// Synthetic radio for desktops and demos
pub struct SimulatedRadio {
    state: Mutex<WalkState>,
    started: Instant,
    location_permission: bool,
    system_traffic: Option<SystemTraffic>,
}

impl SimulatedRadio {
    pub fn new(location_permission: bool, system_traffic: Option<SystemTraffic>) -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(WalkState {
                steps: 0,
                rsrp: -95,
                rsrq: -11,
                sinr: 12,
                rx_bytes: 0,
                tx_bytes: 0,
                last_traffic: now,
            }),
            started: now,
            location_permission,
            system_traffic,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot as of `elapsed` since the radio was created
    fn snapshot_at(&self, elapsed: Duration) -> RadioSnapshot {
        let step = elapsed.as_secs() * STEPS_PER_SEC;
        let mut rng = rand::rng();
        let mut state = self.lock();
        for _ in 0..step.saturating_sub(state.steps).min(MAX_CATCH_UP) {
            state.step(&mut rng);
        }
        state.steps = state.steps.max(step);

        let plmn = Plmn::new("440", "10");
        let nr_period = (step / GENERATION_PERIOD) % 2 == 1;
        let (service_state, data_state, sim_state) = modem_states(step);

        let mut cells = Vec::new();
        if service_state == ServiceState::InService {
            cells.push(if nr_period {
                CellReading::Nr(NrCell {
                    registered: true,
                    plmn: Some(plmn.clone()),
                    pci: Some(501),
                    tac: Some(0x1a2b),
                    nci: Some(0x0012_3456_7001),
                    nrarfcn: Some(643_334),
                    ss_rsrp: Some(state.rsrp),
                    ss_rsrq: Some(state.rsrq),
                    ss_sinr: Some(state.sinr),
                    dbm: Some(state.rsrp),
                    level: level_for(state.rsrp),
                    asu: asu_for(state.rsrp),
                })
            } else {
                CellReading::Lte(LteCell {
                    registered: true,
                    plmn: Some(plmn.clone()),
                    pci: Some(123),
                    tac: Some(0x1a2b),
                    ci: Some(0x00a1_b2c3),
                    earfcn: Some(1300),
                    rsrp: Some(state.rsrp),
                    rsrq: Some(state.rsrq),
                    rssnr: Some(state.sinr),
                    dbm: Some(state.rsrp),
                    qci: Some(9),
                    level: level_for(state.rsrp),
                    asu: asu_for(state.rsrp),
                })
            });
        }

        if service_state != ServiceState::PowerOff {
            for pci in [124, 250, 311] {
                let dbm = state.rsrp - rng.random_range(3..15);
                cells.push(CellReading::Lte(LteCell {
                    pci: Some(pci),
                    earfcn: Some(1300),
                    rsrp: Some(dbm),
                    dbm: Some(dbm),
                    level: level_for(dbm),
                    asu: asu_for(dbm),
                    ..Default::default()
                }));
            }
            // a legacy-generation cell heard alongside
            cells.push(CellReading::Unknown { registered: false });
        }

        RadioSnapshot {
            location_permission: self.location_permission,
            cells,
            network_type: if nr_period { NR_NETWORK_TYPE } else { LTE_NETWORK_TYPE },
            carrier_name: Some("NTT DOCOMO".to_string()),
            network_operator: Some(plmn.code()),
            sim_operator_name: Some("docomo".to_string()),
            service_state: Some(service_state),
            data_state: Some(data_state),
            sim_state: Some(sim_state),
        }
    }
}

/// Strength bucket the way handsets derive it from RSRP
fn level_for(rsrp: i32) -> i32 {
    match rsrp {
        r if r >= -85 => 4,
        r if r >= -95 => 3,
        r if r >= -105 => 2,
        r if r >= -115 => 1,
        _ => 0,
    }
}

fn asu_for(rsrp: i32) -> i32 {
    (rsrp + 140).clamp(0, 97)
}

impl RadioProvider for SimulatedRadio {
    fn snapshot(&self) -> RadioSnapshot {
        self.snapshot_at(self.started.elapsed())
    }

    fn traffic(&self) -> Option<TrafficTotals> {
        if let Some(system) = &self.system_traffic {
            match system.read() {
                Ok(totals) => return Some(totals),
                Err(e) => log::debug!("Falling back to synthetic traffic: {}", e),
            }
        }

        // synthetic counters grow with wall time, so several readers see the same rate
        let mut rng = rand::rng();
        let mut state = self.lock();
        let now = Instant::now();
        let secs = now.saturating_duration_since(state.last_traffic).as_secs_f64();
        state.last_traffic = now;
        let down_bps: f64 = rng.random_range(2_000_000.0..40_000_000.0);
        let up_bps: f64 = rng.random_range(500_000.0..8_000_000.0);
        state.rx_bytes += (secs * down_bps / 8.0) as u64;
        state.tx_bytes += (secs * up_bps / 8.0) as u64;
        Some(TrafficTotals {
            rx_bytes: state.rx_bytes,
            tx_bytes: state.tx_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{self, labels, MetricsComposer, RadioCapabilities};
    use crate::throughput::ThroughputTracker;
    use chrono::Local;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  500000    4000    0    0    0     0          0         0   500000    4000    0    0    0     0       0          0
  eth0: 1000000    9000    0    0    0     0          0         0   200000    1500    0    0    0     0       0          0
 wwan0:   20000     100    0    0    0     0          0         0     3000      40    0    0    0     0       0          0
";

    fn at_step(step: u64) -> Duration {
        Duration::from_secs(step / STEPS_PER_SEC)
    }

    #[test]
    fn test_parse_net_dev_skips_loopback() {
        let totals = parse_net_dev(NET_DEV).unwrap();
        assert_eq!(totals.rx_bytes, 1_020_000);
        assert_eq!(totals.tx_bytes, 203_000);
    }

    #[test]
    fn test_parse_net_dev_rejects_truncated_rows() {
        let truncated = "h1\nh2\n eth0: 1 2 3\n";
        assert!(matches!(parse_net_dev(truncated), Err(ProviderError::Parse(_))));
        assert!(matches!(parse_net_dev(""), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_system_traffic_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev");
        fs::write(&path, NET_DEV).unwrap();

        let traffic = SystemTraffic::new(&path);
        assert_eq!(traffic.path(), path.as_path());
        assert_eq!(traffic.read().unwrap().rx_bytes, 1_020_000);

        let missing = SystemTraffic::new(dir.path().join("nope")).read();
        assert!(matches!(missing, Err(ProviderError::CountersUnavailable(_))));
    }

    #[test]
    fn test_serving_cell_follows_service_state() {
        let radio = SimulatedRadio::new(true, None);
        for step in 0..MODEM_CYCLE {
            let snapshot = radio.snapshot_at(at_step(step));
            let registered = snapshot.cells.iter().filter(|c| c.is_registered()).count();
            let in_service = snapshot.service_state == Some(ServiceState::InService);
            assert_eq!(registered, usize::from(in_service), "step {}", step);
            if snapshot.service_state != Some(ServiceState::PowerOff) {
                assert_eq!(snapshot.neighbors(5).count(), 4);
            }
        }
    }

    #[test]
    fn test_generation_switches_with_elapsed_time() {
        let radio = SimulatedRadio::new(true, None);
        let lte = radio.snapshot_at(at_step(GENERATION_PERIOD - 1));
        let nr = radio.snapshot_at(at_step(GENERATION_PERIOD));

        assert_eq!(lte.network_type, LTE_NETWORK_TYPE);
        assert!(matches!(lte.serving_cell(), Some(CellReading::Lte(_))));
        assert_eq!(nr.network_type, NR_NETWORK_TYPE);
        assert!(matches!(nr.serving_cell(), Some(CellReading::Nr(_))));
    }

    #[test]
    fn test_repeated_reads_share_one_step() {
        let radio = SimulatedRadio::new(true, None);
        let first = radio.snapshot_at(at_step(3));
        let second = radio.snapshot_at(at_step(3));
        assert_eq!(first.serving_cell(), second.serving_cell());
        assert_eq!(radio.lock().steps, 3);

        // a reader lagging behind never rewinds the walk
        radio.snapshot_at(at_step(1));
        assert_eq!(radio.lock().steps, 3);
    }

    #[test]
    fn test_outage_covers_every_modem_state() {
        let mut seen = Vec::new();
        for step in 0..MODEM_CYCLE {
            let states = modem_states(step);
            if !seen.contains(&states) {
                seen.push(states);
            }
        }
        let services: Vec<_> = seen.iter().map(|s| s.0).collect();
        let data: Vec<_> = seen.iter().map(|s| s.1).collect();
        let sims: Vec<_> = seen.iter().map(|s| s.2).collect();

        for state in [
            ServiceState::InService,
            ServiceState::OutOfService,
            ServiceState::EmergencyOnly,
            ServiceState::PowerOff,
        ] {
            assert!(services.contains(&state), "{:?}", state);
        }
        for state in [
            DataState::Disconnected,
            DataState::Connecting,
            DataState::Connected,
            DataState::Suspended,
        ] {
            assert!(data.contains(&state), "{:?}", state);
        }
        for state in [SimState::Ready, SimState::Absent, SimState::Other] {
            assert!(sims.contains(&state), "{:?}", state);
        }
    }

    #[test]
    fn test_outage_reaches_the_record() {
        let radio = SimulatedRadio::new(true, None);
        let composer = MetricsComposer::new(RadioCapabilities::default());
        let mut tracker = ThroughputTracker::new(None, Instant::now());
        let mut compose = |step: u64| {
            let sample = tracker.advance(None, Instant::now());
            composer
                .compose(&radio.snapshot_at(at_step(step)), &sample, Local::now())
                .record
        };

        let normal = compose(10);
        assert_eq!(normal.get(labels::SERVICE_STATE), Some("In service"));
        assert_eq!(normal.get(labels::DATA_STATE), Some("Connected"));
        assert!(normal.get(labels::NEIGHBOR_CELL).unwrap().ends_with("\n4. -"));

        let off = compose(114);
        assert_eq!(off.get(labels::SERVICE_STATE), Some("Power off"));
        assert_eq!(off.get(labels::IS_REGISTERED), Some(metrics::UNKNOWN));
        assert_eq!(off.get(labels::NEIGHBOR_CELL), Some(""));

        let reseat = compose(115);
        assert_eq!(reseat.get(labels::SERVICE_STATE), Some("Out of service"));
        assert_eq!(reseat.get(labels::SIM_STATE), Some("ABSENT"));

        let emergency = compose(117);
        assert_eq!(emergency.get(labels::SERVICE_STATE), Some("Emergency only"));
        assert_eq!(emergency.get(labels::DATA_STATE), Some("Suspended"));
    }

    #[test]
    fn test_simulated_traffic_is_monotonic() {
        let radio = SimulatedRadio::new(false, None);
        let first = radio.traffic().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = radio.traffic().unwrap();
        assert!(second.rx_bytes >= first.rx_bytes);
        assert!(second.tx_bytes >= first.tx_bytes);
        assert!(!radio.snapshot().location_permission);
    }

    #[test]
    fn test_level_buckets() {
        assert_eq!(level_for(-80), 4);
        assert_eq!(level_for(-95), 3);
        assert_eq!(level_for(-100), 2);
        assert_eq!(level_for(-115), 1);
        assert_eq!(level_for(-125), 0);
    }
}
