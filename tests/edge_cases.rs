//! Edge case and boundary condition tests for the sensor core

use smartboard::hal::{MockPixels, MockSectors, MockTransport};
use smartboard::status::{encode_into, status_len, HEADER_LEN};
use smartboard::{
    BoardCommand, BoardController, BoardScanner, CommandError, CommandOutcome, CommandType,
    DeviceId, FieldGrid, Rotation, SensorConfig, StatusError, StatusUpdate,
};

fn calibrated(value: u16) -> BoardScanner<MockSectors, 6> {
    let mut scanner = BoardScanner::new(MockSectors::uniform(value), Rotation::Deg0, SensorConfig::default());
    scanner.calibrate();
    scanner
}

// ============================================================================
// Threshold Boundary Tests
// ============================================================================

#[test]
fn zero_baseline_falls_back_to_floor() {
    let mut scanner = calibrated(0);

    scanner.source_mut().set(0, 0, 100);
    assert!(!scanner.scan_cycle(&mut ()).changed());

    scanner.source_mut().set(0, 0, 101);
    assert!(scanner.scan_cycle(&mut ()).changed());
}

#[test]
fn reading_exactly_at_ratio_is_not_a_magnet() {
    let mut scanner = calibrated(1000);

    scanner.source_mut().set(0, 0, 1035);
    assert!(!scanner.scan_cycle(&mut ()).changed());

    scanner.source_mut().set(0, 0, 1036);
    let change = scanner.scan_cycle(&mut ()).change.unwrap();
    assert!(change.enabled);
    assert_eq!(change.reference, 1000);
}

#[test]
fn high_readings_do_not_overflow() {
    let mut scanner = calibrated(u16::MAX - 1);
    scanner.source_mut().set(0, 0, u16::MAX);
    // 65535 / 65534 is below the ratio
    assert!(!scanner.scan_cycle(&mut ()).changed());
}

// ============================================================================
// Calibration Edge Cases
// ============================================================================

#[test]
fn piece_present_at_power_up_becomes_baseline() {
    let mut sectors = MockSectors::uniform(50);
    sectors.set(0, 0, 300);
    let mut scanner: BoardScanner<_, 6> =
        BoardScanner::new(sectors, Rotation::Deg0, SensorConfig::default());
    scanner.calibrate();

    assert_eq!(scanner.grid().field_at(0, 0).map(|f| f.north.reference), Some(300));
    assert!(!scanner.scan_cycle(&mut ()).changed());
}

#[test]
fn single_pass_calibration_is_clamped() {
    let config = SensorConfig::default().with_calibration_passes(0);
    let mut scanner: BoardScanner<_, 6> =
        BoardScanner::new(MockSectors::uniform(50), Rotation::Deg0, config);
    let report = scanner.calibrate();
    assert_eq!(report.passes, 1);
    assert_eq!(scanner.source_mut().reads(), 9);
}

#[test]
fn recalibration_does_not_wait() {
    let mut scanner = calibrated(50);
    let waited = scanner.source_mut().waited_ms();
    scanner.recalibrate();
    assert_eq!(scanner.source_mut().waited_ms(), waited);
}

// ============================================================================
// Bus Fault Tests
// ============================================================================

#[test]
fn dead_bus_reads_as_empty_board() {
    let mut scanner = calibrated(50);
    for group in 0..9 {
        scanner.source_mut().fail_group(group, true);
    }
    let report = scanner.scan_cycle(&mut ());
    assert_eq!(report.bus_faults, 9 * 16);
    assert!(!report.changed());
}

#[test]
fn faulted_recalibration_keeps_prior_baseline() {
    let mut scanner = calibrated(500);
    assert!(!scanner.scan_cycle(&mut ()).changed());

    // Transient fault while a command recalibrates
    scanner.source_mut().fail_group(0, true);
    let report = scanner.recalibrate();
    assert_eq!(report.bus_faults, 16);
    assert_eq!(report.faulted, 16);
    assert_eq!(scanner.grid().field_at(0, 0).map(|f| f.north.reference), Some(500));

    // Bus recovers: the board still reads empty
    scanner.source_mut().fail_group(0, false);
    assert!(!scanner.scan_cycle(&mut ()).changed());

    let report = scanner.recalibrate();
    assert_eq!((report.skipped, report.faulted), (0, 0));
    scanner.scan_cycle(&mut ());
    let occupied = scanner.grid().iter_logical().filter(|(_, _, f)| f.is_occupied()).count();
    assert_eq!(occupied, 0);
}

#[test]
fn single_faulted_channel_during_start_up() {
    let mut sectors = MockSectors::uniform(500);
    sectors.fail_channel(8, 0, true);
    let mut scanner: BoardScanner<_, 6> =
        BoardScanner::new(sectors, Rotation::Deg0, SensorConfig::default());
    let report = scanner.calibrate();
    assert_eq!(report.bus_faults, 2);
    assert_eq!(report.faulted, 2);

    // Group 8 field A is (4, 4); slot 0 is its north edge
    let field = scanner.grid().field_at(4, 4).copied().unwrap();
    assert!(!field.north.calibrated);
    assert_eq!(field.east.reference, 500);

    // The next healthy calibration captures the missing baseline
    scanner.source_mut().fail_channel(8, 0, false);
    scanner.recalibrate();
    assert!(!scanner.scan_cycle(&mut ()).changed());
    assert_eq!(scanner.grid().field_at(4, 4).map(|f| f.north.reference), Some(500));
}

// ============================================================================
// Command Parsing Edge Cases
// ============================================================================

#[test]
fn malformed_commands_are_rejected() {
    assert_eq!(BoardCommand::parse(&[]), Err(CommandError::Empty));
    assert_eq!(BoardCommand::parse(&[5]), Err(CommandError::UnknownOpcode(5)));
    assert_eq!(BoardCommand::parse(&[0xFF, 1, 2]), Err(CommandError::UnknownOpcode(0xFF)));
    assert_eq!(
        BoardCommand::parse(&[3]),
        Err(CommandError::Truncated {
            command: CommandType::SetBrightness,
            needed: 2,
            len: 1
        })
    );

    let err = BoardCommand::parse(&[0, 10, 0, 0]).unwrap_err();
    assert_eq!(err.to_string(), "REGISTER_LISTENER needs 7 bytes, got 4");
}

#[test]
fn show_pixel_record_limits() {
    // No records at all is a valid (empty) command
    match BoardCommand::parse(&[1]) {
        Ok(BoardCommand::ShowPixel(records)) => assert!(records.is_empty()),
        other => panic!("unexpected {:?}", other),
    }

    // 37 whole records plus a partial one: capped at 36, partial ignored
    let mut packet = vec![1u8];
    for i in 0..37u8 {
        packet.extend_from_slice(&[i % 6, i / 6 % 6, 1, 2, 3, 0, 0, 0]);
    }
    packet.extend_from_slice(&[0, 0, 9]);
    match BoardCommand::parse(&packet) {
        Ok(BoardCommand::ShowPixel(records)) => {
            assert_eq!(records.len(), 36);
            assert_eq!((records[35].column, records[35].row), (5, 5));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn extra_bytes_after_fixed_commands_are_ignored() {
    assert_eq!(BoardCommand::parse(&[2, 9, 9]), Ok(BoardCommand::ResetPixel));
    assert_eq!(BoardCommand::parse(&[3, 10, 99]), Ok(BoardCommand::SetBrightness(10)));
}

#[test]
fn show_pixel_outside_board_is_skipped() {
    let scanner = BoardScanner::new(MockSectors::uniform(50), Rotation::Deg270, SensorConfig::default());
    let mut c: BoardController<_, _, _, 6> = BoardController::new(
        scanner,
        MockPixels::new(36),
        MockTransport::new(),
        DeviceId::from_mac([0; 6]),
    );
    c.start(200);

    let outcome = c
        .handle_packet(&[1, 6, 0, 1, 1, 1, 1, 0, 0, 0, 6, 1, 1, 1, 1, 0, 0])
        .unwrap();
    assert_eq!(outcome, CommandOutcome::PixelsShown { applied: 0, skipped: 2 });
    assert_eq!(c.pixels().lit(), 0);
}

// ============================================================================
// Status Packet Edge Cases
// ============================================================================

#[test]
fn status_parse_rejects_bad_packets() {
    assert_eq!(StatusUpdate::parse(&[0; 5]), Err(StatusError::Truncated { len: 5 }));

    let mut packet = vec![7u8];
    packet.extend_from_slice(b"A0B1C2D3E4F5");
    assert_eq!(StatusUpdate::parse(&packet), Err(StatusError::UnexpectedType(7)));

    packet[0] = 0;
    packet[3] = b'b';
    assert_eq!(StatusUpdate::parse(&packet), Err(StatusError::InvalidDeviceId));

    packet[3] = b'B';
    packet.extend_from_slice(&[1, 1]);
    assert_eq!(StatusUpdate::parse(&packet), Err(StatusError::Truncated { len: 15 }));

    packet.truncate(HEADER_LEN);
    for _ in 0..37 {
        packet.extend_from_slice(&[0, 0, 0]);
    }
    assert_eq!(StatusUpdate::parse(&packet), Err(StatusError::TooManyRecords));
}

#[test]
fn header_only_packet_has_no_records() {
    let mut packet = vec![0u8];
    packet.extend_from_slice(b"001122AABBCC");
    let update = StatusUpdate::parse(&packet).unwrap();
    assert!(update.records.is_empty());
    assert_eq!(update.device.mac(), [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC]);
}

#[test]
fn encode_into_checks_buffer_size() {
    let grid: FieldGrid<4> = FieldGrid::new(Rotation::Deg90);
    let id = DeviceId::from_mac([1, 2, 3, 4, 5, 6]);

    let mut small = [0u8; 40];
    assert_eq!(
        encode_into(&grid, &id, &mut small),
        Err(StatusError::BufferTooSmall {
            needed: status_len(4),
            available: 40
        })
    );

    let mut buf = [0xEEu8; 80];
    assert_eq!(encode_into(&grid, &id, &mut buf), Ok(61));
    // Bytes past the packet are untouched
    assert!(buf[61..].iter().all(|&b| b == 0xEE));
}
