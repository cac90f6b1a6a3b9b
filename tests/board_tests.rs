//! Integration tests for the scan pipeline and the board controller

use core::net::{Ipv4Addr, SocketAddrV4};

use smartboard::hal::{MockDelay, MockPixels, MockSectors, MockSensorArray, MockTransport};
use smartboard::sector::{MAX_GROUPS, SENSORS_PER_GROUP};
use smartboard::status::{encode, HEADER_LEN, RECORD_LEN};
use smartboard::{
    BoardCommand, BoardController, BoardScanner, CommandOutcome, DeviceId, Direction, Rgb,
    Rotation, SectorReader, SensorConfig, StatusUpdate,
};

const MAC: [u8; 6] = [0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5];
const SERVER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 4669);

fn register_packet(addr: SocketAddrV4) -> [u8; 7] {
    let [a, b, c, d] = addr.ip().octets();
    let [hi, lo] = addr.port().to_be_bytes();
    [0, a, b, c, d, hi, lo]
}

fn uniform_array(value: u16) -> MockSensorArray {
    let array = MockSensorArray::new();
    for group in 0..MAX_GROUPS {
        for channel in 0..SENSORS_PER_GROUP {
            array.set_reading(group, channel, value);
        }
    }
    array
}

// ============================================================================
// Scan Pipeline Tests
// ============================================================================

#[test]
fn magnet_detected_through_expander_masks() {
    let array = uniform_array(50);
    let (expander, analog) = array.split();
    let reader = SectorReader::new(expander, analog, MockDelay::new());
    let mut scanner: BoardScanner<_, 6> =
        BoardScanner::new(reader, Rotation::Deg180, SensorConfig::default());

    let report = scanner.calibrate();
    assert_eq!(report.bus_faults, 0);
    assert_eq!(report.skipped, 0);

    // Group (1, 1), channel 6: field B slot 2, physical (3, 2)
    array.set_reading(4, 6, 120);
    let report = scanner.scan_cycle(&mut ());
    let change = report.change.unwrap();
    assert_eq!((change.column, change.row), (2, 3));
    assert_eq!(change.direction, Direction::North);
    assert_eq!(change.reference, 50);

    let field = scanner.grid().field_at(2, 3).copied().unwrap();
    assert!(field.north.enabled);
    assert!(!field.east.enabled && !field.south.enabled && !field.west.enabled);

    let packet = encode(scanner.grid(), &DeviceId::from_mac(MAC));
    assert_eq!(packet.len(), 121);
    assert_eq!(packet[0], 0);
    assert_eq!(&packet[1..HEADER_LEN], b"A0B1C2D3E4F5");
    let offset = HEADER_LEN + RECORD_LEN * (3 * 6 + 2);
    assert_eq!(offset, 73);
    assert_eq!(&packet[offset..offset + 3], &[2, 3, 8]);

    // Every other record is empty and in row-major order
    for (i, record) in packet[HEADER_LEN..].chunks_exact(RECORD_LEN).enumerate() {
        assert_eq!(usize::from(record[0]), i % 6);
        assert_eq!(usize::from(record[1]), i / 6);
        if i != 20 {
            assert_eq!(record[2], 0);
        }
    }
}

#[test]
fn rotation_moves_the_reported_field_and_direction() {
    // Physical (0, 0) slot 0 seen from each mounting orientation
    let expected = [
        (Rotation::Deg0, (0, 0), Direction::North),
        (Rotation::Deg90, (0, 5), Direction::East),
        (Rotation::Deg180, (5, 5), Direction::South),
        (Rotation::Deg270, (5, 0), Direction::West),
    ];

    for (rotation, position, direction) in expected {
        let mut scanner: BoardScanner<_, 6> =
            BoardScanner::new(MockSectors::uniform(50), rotation, SensorConfig::default());
        scanner.calibrate();
        scanner.source_mut().set(0, 0, 400);

        let change = scanner.scan_cycle(&mut ()).change.unwrap();
        assert_eq!((change.column, change.row), position, "{:?}", rotation);
        assert_eq!(change.direction, direction, "{:?}", rotation);
        assert_eq!(rotation.to_logical(6, 0, 0), position);
    }
}

#[test]
fn small_board_uses_a_single_group() {
    let mut scanner: BoardScanner<_, 2> =
        BoardScanner::new(MockSectors::uniform(50), Rotation::Deg0, SensorConfig::default());
    scanner.calibrate();
    assert_eq!(scanner.source_mut().reads(), 2);

    // Field D, slot 3 = east of (1, 1)
    scanner.source_mut().set(0, 15, 500);
    let change = scanner.scan_cycle(&mut ()).change.unwrap();
    assert_eq!((change.column, change.row), (1, 1));
    assert_eq!(change.direction, Direction::East);

    let packet = encode(scanner.grid(), &DeviceId::from_mac(MAC));
    assert_eq!(packet.len(), HEADER_LEN + 4 * RECORD_LEN);
}

#[test]
fn summary_lists_every_field() {
    let mut scanner: BoardScanner<_, 6> =
        BoardScanner::new(MockSectors::uniform(50), Rotation::Deg0, SensorConfig::default());
    scanner.calibrate();
    scanner.source_mut().set(0, 0, 300);
    scanner.scan_cycle(&mut ());

    let text = scanner.grid().summary().to_string();
    assert_eq!(text.lines().count(), 36);
    let first = text.lines().next().unwrap();
    assert!(first.starts_with("(0|0) led  0 |"));
    assert!(first.contains("300/   50*"));
}

// ============================================================================
// Controller Session Tests
// ============================================================================

fn session(rotation: Rotation) -> BoardController<MockSectors, MockPixels, MockTransport, 6> {
    let scanner = BoardScanner::new(MockSectors::uniform(50), rotation, SensorConfig::default());
    let mut controller = BoardController::new(
        scanner,
        MockPixels::new(36),
        MockTransport::new(),
        DeviceId::from_mac(MAC),
    );
    controller.start(200);
    controller
}

#[test]
fn full_session_with_rotated_board() {
    let mut c = session(Rotation::Deg90);

    // Server registers and immediately gets the empty board
    c.transport_mut().queue(&register_packet(SERVER));
    let tick = c.tick();
    assert_eq!(
        tick.command,
        Some(Ok(CommandOutcome::ListenerRegistered { status_sent: true }))
    );
    assert_eq!(c.transport().sent.len(), 1);
    let initial = StatusUpdate::parse(&c.transport().sent[0].1).unwrap();
    assert_eq!(initial.device, DeviceId::from_mac(MAC));
    assert!(initial.records.iter().all(|r| r.mask == 0));

    // A figure at physical (0, 0): logical (0, 5), east sensor
    c.scanner_mut().source_mut().set(0, 0, 400);
    assert!(c.tick().status_sent);
    let update = StatusUpdate::parse(&c.transport().sent[1].1).unwrap();
    let record = update.record_at(0, 5).copied().unwrap();
    assert!(record.is_set(Direction::East));
    assert_eq!(record.mask, 0b0100);

    // Light the field under the figure
    let mut show = vec![1u8];
    show.extend_from_slice(&[0, 5, 0, 255, 0, 1, 0, 0]);
    c.transport_mut().queue(&show);
    let tick = c.tick();
    assert_eq!(
        tick.command,
        Some(Ok(CommandOutcome::PixelsShown { applied: 1, skipped: 0 }))
    );
    assert_eq!(c.pixels().pixel(0), Some(Rgb::new(0, 255, 0)));
    assert_eq!(c.pixels().lit(), 1);

    // The recalibration kept the occupied baseline: nothing new to report
    assert!(!c.tick().status_sent);
    assert_eq!(c.grid().field_at(0, 5).map(|f| f.east.reference), Some(50));

    // The figure leaves
    c.scanner_mut().source_mut().set(0, 0, 50);
    assert!(c.tick().status_sent);
    let last = StatusUpdate::parse(&c.transport().sent[2].1).unwrap();
    assert_eq!(last.record_at(0, 5).map(|r| r.mask), Some(0));
}

#[test]
fn listener_can_be_replaced() {
    let mut c = session(Rotation::Deg0);
    c.handle_packet(&register_packet(SERVER)).unwrap();

    let other = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 8), 5000);
    c.handle_packet(&register_packet(other)).unwrap();
    assert_eq!(c.listener(), Some(other));

    c.scanner_mut().source_mut().set(8, 12, 600);
    c.tick();
    let (dest, _) = c.transport().sent.last().cloned().unwrap();
    assert_eq!(dest, other);
}

#[test]
fn parsed_commands_apply_like_packets() {
    let mut c = session(Rotation::Deg0);
    let command = BoardCommand::parse(&[3, 77]).unwrap();
    assert!(!command.recalibrates());
    assert_eq!(c.apply(command), CommandOutcome::BrightnessSet(77));
    assert_eq!(c.pixels().brightness, 77);

    c.scanner_mut().source_mut().set_all(80);
    assert_eq!(
        c.apply(BoardCommand::CalibrateSensors),
        CommandOutcome::Calibrated
    );
    assert_eq!(c.grid().field_at(3, 4).map(|f| f.south.reference), Some(80));
}
