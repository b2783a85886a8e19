//! Device trigger → coordinator → model command scenarios.
//!
//! The model is a recording transport; gap tables come from memory.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use bl_app::{GapFallback, ModelCoordinator, NameMap, PutAction, Service, ServiceConfig};
use bl_core::{DeviceName, ElementName, in_tesla, tesla};
use bl_devices::{Device, DeviceKind};
use async_trait::async_trait;
use bl_model::mock::RecordingTransport;
use bl_model::{Command, ModelResult, ModelTransport, Reply};
use bl_physics::{
    Beamline, CalibrationRecord, GapLookup, GapTableSource, PhysicsResult, StrictPolicy,
    bmax_from_phase_integral, heater_k_to_bmax, undulator_bmax_to_k,
};

const M_E: f64 = 0.5109989461e6;
const C: f64 = 2.99792458e8;

/// Hard-line table with one calibrated segment.
struct MemorySource;

impl GapTableSource for MemorySource {
    fn load(&self, beamline: Beamline) -> PhysicsResult<Vec<CalibrationRecord>> {
        Ok(match beamline {
            Beamline::Hard => vec![CalibrationRecord {
                element: ElementName::new("UMAHXH13"),
                serial: "H13".to_string(),
                k: vec![3.0, 2.5, 2.0, 1.5, 1.0, 0.5],
                gap: vec![7.0, 8.2, 9.6, 11.4, 13.9, 18.0],
            }],
            Beamline::Soft => Vec::new(),
        })
    }
}

fn coordinator(transport: &Arc<RecordingTransport>) -> Arc<ModelCoordinator> {
    let gaps = Arc::new(GapLookup::new(Arc::new(MemorySource)));
    Arc::new(ModelCoordinator::new(transport.clone(), gaps))
}

fn value_of(val: &str) -> f64 {
    val.rsplit(" = ").next().unwrap().parse().unwrap()
}

#[tokio::test(start_paused = true)]
async fn undulator_writes_b_max_then_bpm_offset() {
    let transport = Arc::new(RecordingTransport::new());
    let device = Device::new(
        DeviceName::new("USEG:UNDH:1350"),
        ElementName::new("UMAHXH13"),
        DeviceKind::undulator(),
        1.2,
        coordinator(&transport),
    );

    device.set_desired(1.5).unwrap();
    device.process().await.unwrap();

    let sent = transport.sent_vals();
    assert_eq!(sent.len(), 2, "{sent:?}");

    assert!(sent[0].starts_with("set ele UMAHXH13 B_MAX = "));
    let expected = 1.5 * 2.0 * PI * M_E / (C * 0.026);
    assert!((value_of(&sent[0]) - expected).abs() < 1e-12 * expected);

    // Calibrated knot at K = 1.5 is 11.4 mm
    assert!(sent[1].starts_with("set ele RFBHX13 y_offset = "));
    let expected_offset = -0.002850 / 11.4_f64.powi(3);
    assert!((value_of(&sent[1]) - expected_offset).abs() < 1e-15);
}

#[tokio::test(start_paused = true)]
async fn phase_shifter_writes_b_max_only() {
    let transport = Arc::new(RecordingTransport::new());
    let device = Device::new(
        DeviceName::new("PHAS:UNDH:1395"),
        ElementName::new("PSHXH13"),
        DeviceKind::PhaseShifter,
        10.0,
        coordinator(&transport),
    );

    let p = 42.5;
    device.set_desired(p).unwrap();
    device.process().await.unwrap();

    let sent = transport.sent_vals();
    assert_eq!(sent.len(), 1, "{sent:?}");
    assert!(sent[0].starts_with("set ele PSHXH13 B_MAX = "));
    let expected = in_tesla(bmax_from_phase_integral(p));
    assert!((value_of(&sent[0]) - expected).abs() < 1e-12);
}

#[tokio::test(start_paused = true)]
async fn laser_heater_writes_lh_und_only() {
    let transport = Arc::new(RecordingTransport::new());
    let device = Device::new(
        DeviceName::new("USEG:IN20:466"),
        ElementName::new("LH_UND"),
        DeviceKind::LaserHeater,
        0.0,
        coordinator(&transport),
    );

    device.set_desired(1.3852).unwrap();
    device.process().await.unwrap();

    let sent = transport.sent_vals();
    assert_eq!(sent.len(), 1, "{sent:?}");
    assert!(sent[0].starts_with("set ele LH_UND B_MAX = "));
    let expected = 1.3852 * 2.0 * PI * M_E / (C * 0.054);
    assert!((value_of(&sent[0]) - expected).abs() < 1e-12);
    assert!((expected - in_tesla(heater_k_to_bmax(1.3852))).abs() < 1e-12);
}

#[tokio::test(start_paused = true)]
async fn uncalibrated_undulator_skips_infinite_offset() {
    let transport = Arc::new(RecordingTransport::new());
    let device = Device::new(
        DeviceName::new("USEG:UNDH:1450"),
        ElementName::new("UMAHXH14"),
        DeviceKind::undulator(),
        2.0,
        coordinator(&transport),
    );

    device.process().await.unwrap();

    // Zero sentinel gap gives an infinite offset, which is not written
    let sent = transport.sent_vals();
    assert_eq!(sent.len(), 1, "{sent:?}");
    assert!(sent[0].starts_with("set ele UMAHXH14 B_MAX = "));
    assert_eq!(device.actual(), 2.0);
}

#[tokio::test(start_paused = true)]
async fn strict_fallback_skips_bpm_write() {
    let transport = Arc::new(RecordingTransport::new());
    let gaps = Arc::new(GapLookup::with_policy(
        Arc::new(MemorySource),
        Arc::new(StrictPolicy),
    ));
    let device = Device::new(
        DeviceName::new("USEG:UNDH:1450"),
        ElementName::new("UMAHXH14"),
        DeviceKind::undulator(),
        2.0,
        Arc::new(ModelCoordinator::new(transport.clone(), gaps.clone())),
    );

    device.process().await.unwrap();
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(gaps.policy().miss_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_b_max_write_skips_offset_and_completes_trigger() {
    let transport = Arc::new(RecordingTransport::new().fail_on("set ele UMAHXH13"));
    let device = Device::new(
        DeviceName::new("USEG:UNDH:1350"),
        ElementName::new("UMAHXH13"),
        DeviceKind::undulator(),
        1.0,
        coordinator(&transport),
    );

    device.set_desired(2.0).unwrap();
    assert_eq!(device.process().await.unwrap(), 2.0);
    assert_eq!(device.actual(), 2.0);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn negative_phase_integral_is_not_written() {
    let transport = Arc::new(RecordingTransport::new());
    let device = Device::new(
        DeviceName::new("PHAS:UNDH:1395"),
        ElementName::new("PSHXH13"),
        DeviceKind::PhaseShifter,
        10.0,
        coordinator(&transport),
    );

    device.set_desired(-1.0).unwrap();
    device.process().await.unwrap();
    assert!(transport.sent().is_empty());
}

const WIGGLERS: [&str; 5] = [
    "  1234  UMAHXH13   Wiggler  512.3",
    "  1236  PSHXH13    Wiggler  515.9",
    "  1250  UMAHXH14   Wiggler  516.1",
    "  1270  UMAHXH15   Wiggler  520.0",
    "Number of elements: 4",
];

const UNDULATOR_ROWS: [&str; 4] = [
    "# Index  name  key  s  L  B_MAX",
    "  1234  UMAHXH13  Wiggler  512.3  3.4  1.6479",
    "  1250  UMAHXH14  Wiggler  516.1  3.4  1.2000",
    "  1260  UMAHXH99  Wiggler  518.0  3.4  1.1000",
];

const SHIFTER_ROWS: [&str; 2] = [
    "# Index  name  key  s  L  B_MAX",
    "  1236  PSHXH13  Wiggler  515.9  0.0495  0.5",
];

const NAMES: &str = "\
- element: UMAHXH13
  device: USEG:UNDH:1350
- element: PSHXH13
  device: PHAS:UNDH:1395
- element: UMAHXH15
  device: USEG:UNDH:1550
- element: UMAHXH99
  device: USEG:UNDH:9950
";

fn scripted_model() -> RecordingTransport {
    RecordingTransport::new()
        .reply_to("show ele -no_slaves Wiggler::*", WIGGLERS)
        .reply_to(
            "show lat -no_label_lines -attribute B_MAX UMA*",
            UNDULATOR_ROWS,
        )
        .reply_to(
            "show lat -no_label_lines -attribute B_MAX PS*",
            SHIFTER_ROWS,
        )
}

async fn start_service(transport: &Arc<RecordingTransport>, config: &ServiceConfig) -> Service {
    Service::start(
        config,
        transport.clone(),
        Arc::new(MemorySource),
        NameMap::from_yaml_str(NAMES).unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn service_builds_devices_from_model_state() {
    let transport = Arc::new(scripted_model());
    let service = start_service(&transport, &ServiceConfig::default()).await;

    let mut names: Vec<&str> = service.devices().iter().map(|d| d.name().as_str()).collect();
    names.sort();
    // UMAHXH14 has no device name, UMAHXH15 has no B_MAX row, UMAHXH99 was
    // not discovered
    assert_eq!(names, vec!["PHAS:UNDH:1395", "USEG:IN20:466", "USEG:UNDH:1350"]);

    let k = service.pvs().get("USEG:UNDH:1350:KAct").unwrap();
    assert!((k - undulator_bmax_to_k(tesla(1.6479))).abs() < 1e-12);
    assert_eq!(service.pvs().get("USEG:UNDH:1350:KDes").unwrap(), k);

    let pi = service.pvs().get("PHAS:UNDH:1395:PIAct").unwrap();
    assert!((in_tesla(bmax_from_phase_integral(pi)) - 0.5).abs() < 1e-12);

    assert_eq!(service.pvs().get("USEG:IN20:466:KACT").unwrap(), 1.3852);

    // Startup issued only queries
    assert_eq!(
        transport.sent_vals(),
        vec![
            "show ele -no_slaves Wiggler::*  ".to_string(),
            "show lat -no_label_lines -attribute B_MAX UMA*".to_string(),
            "show lat -no_label_lines -attribute B_MAX PS*".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn pv_put_and_trigger_reach_model() {
    let transport = Arc::new(scripted_model());
    let service = start_service(&transport, &ServiceConfig::default()).await;
    transport.clear();

    let pvs = service.pvs();
    assert!(matches!(
        pvs.put("USEG:UNDH:1350:KDes", 1.5).unwrap(),
        PutAction::Written
    ));
    assert!(pvs.put("USEG:UNDH:1350:KAct", 1.5).is_err());
    assert!(pvs.put("USEG:UNDH:1350:Nope", 1.5).is_err());

    let PutAction::Trigger(device) = pvs.put("USEG:UNDH:1350:ConvertK2Gap.PROC", 1.0).unwrap()
    else {
        panic!("process PV should trigger");
    };
    device.process().await.unwrap();

    assert_eq!(pvs.get("USEG:UNDH:1350:KAct").unwrap(), 1.5);
    let sent = transport.sent_vals();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("set ele UMAHXH13 B_MAX = "));
    assert!(sent[1].starts_with("set ele RFBHX13 y_offset = "));
}

#[tokio::test(start_paused = true)]
async fn writes_follow_trigger_completion_order() {
    let transport = Arc::new(RecordingTransport::new());
    let coordinator = coordinator(&transport);
    let slow = Arc::new(
        Device::new(
            DeviceName::new("USEG:IN20:466"),
            ElementName::new("LH_UND"),
            DeviceKind::LaserHeater,
            1.0,
            coordinator.clone(),
        )
        .with_settle(Duration::from_millis(300)),
    );
    let fast = Arc::new(
        Device::new(
            DeviceName::new("PHAS:UNDH:1395"),
            ElementName::new("PSHXH13"),
            DeviceKind::PhaseShifter,
            10.0,
            coordinator,
        )
        .with_settle(Duration::from_millis(100)),
    );

    // Slow device is triggered first but settles last
    let first = tokio::spawn(async move { slow.process().await });
    tokio::task::yield_now().await;
    let second = tokio::spawn(async move { fast.process().await });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let sent = transport.sent_vals();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("set ele PSHXH13 B_MAX"));
    assert!(sent[1].starts_with("set ele LH_UND B_MAX"));
}

/// One request at a time, each taking [`SlowModel::LATENCY`].
struct SlowModel {
    inner: Arc<RecordingTransport>,
    line: tokio::sync::Mutex<()>,
}

impl SlowModel {
    const LATENCY: Duration = Duration::from_millis(50);
}

#[async_trait]
impl ModelTransport for SlowModel {
    async fn send(&self, command: Command) -> ModelResult<Reply> {
        let _line = self.line.lock().await;
        tokio::time::sleep(Self::LATENCY).await;
        self.inner.send(command).await
    }
}

#[tokio::test(start_paused = true)]
async fn undulator_writes_stay_adjacent_under_contention() {
    let recorder = Arc::new(RecordingTransport::new());
    let model = Arc::new(SlowModel {
        inner: recorder.clone(),
        line: tokio::sync::Mutex::new(()),
    });
    let gaps = Arc::new(GapLookup::new(Arc::new(MemorySource)));
    let coordinator = Arc::new(ModelCoordinator::new(model, gaps));

    let undulator = Arc::new(
        Device::new(
            DeviceName::new("USEG:UNDH:1350"),
            ElementName::new("UMAHXH13"),
            DeviceKind::undulator(),
            1.5,
            coordinator.clone(),
        )
        .with_settle(Duration::from_millis(200)),
    );
    // Completes while the undulator's B_MAX write is in flight
    let shifter = Arc::new(
        Device::new(
            DeviceName::new("PHAS:UNDH:1395"),
            ElementName::new("PSHXH13"),
            DeviceKind::PhaseShifter,
            10.0,
            coordinator,
        )
        .with_settle(Duration::from_millis(230)),
    );

    let first = tokio::spawn(async move { undulator.process().await });
    let second = tokio::spawn(async move { shifter.process().await });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let sent = recorder.sent_vals();
    assert_eq!(sent.len(), 3, "{sent:?}");
    assert!(sent[0].starts_with("set ele UMAHXH13 B_MAX"));
    assert!(sent[1].starts_with("set ele RFBHX13 y_offset"));
    assert!(sent[2].starts_with("set ele PSHXH13 B_MAX"));
}

#[tokio::test(start_paused = true)]
async fn strict_config_selects_strict_policy() {
    let transport = Arc::new(scripted_model());
    let mut config = ServiceConfig::default();
    config.gap_tables.fallback = GapFallback::Strict;
    let service = start_service(&transport, &config).await;

    let miss = service
        .gaps()
        .lookup_gap(&ElementName::new("UMAHXH77"), 1.0)
        .await
        .unwrap();
    assert!(miss.gap().is_none());
}

#[tokio::test]
async fn model_failure_at_startup_is_an_error() {
    let transport: Arc<dyn ModelTransport> =
        Arc::new(RecordingTransport::new().fail_on("show ele"));
    let result = Service::start(
        &ServiceConfig::default(),
        transport,
        Arc::new(MemorySource),
        NameMap::default(),
    )
    .await;
    assert!(result.is_err());
}
