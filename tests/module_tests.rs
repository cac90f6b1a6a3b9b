//! Integration tests for module-variant boards on a simulated I2C bus

use core::net::{Ipv4Addr, SocketAddrV4};

use smartboard::expander::TCA9548_ADDRESS;
use smartboard::hal::{MockI2c, MockPin, MockPixels, MockTransport};
use smartboard::module::{address, irq_pin, DEVICE_TYPE_BOARD, MODULES, SENSOR_UPDATE_LEN};
use smartboard::{
    BoardConfig, DeviceId, ModuleBoard, ModuleController, ModuleError, ModuleOutcome, Rgb,
    SensorEnable, SensorKind,
};

const MAC: [u8; 6] = [0x24, 0x6F, 0x28, 0x00, 0x00, 0x01];

fn idle(address: u8) -> u16 {
    if address == address::BUTTONS {
        0x0000
    } else {
        0xFFFF
    }
}

fn bus_with_modules(channels: &[u8]) -> MockI2c {
    bus_behind_switch(TCA9548_ADDRESS, channels)
}

fn bus_behind_switch(switch: u8, channels: &[u8]) -> MockI2c {
    let mut bus = MockI2c::new().with_switch(switch);
    for &channel in channels {
        for chip in address::BUTTONS..=address::IRQ {
            bus.add_chip(Some(channel), chip);
            bus.set_inputs(Some(channel), chip, idle(chip));
        }
    }
    bus
}

fn raise_irq(bus: &mut MockI2c, channel: u8, pins: &[u8]) {
    let mut lines = 0xFFFFu16;
    for pin in pins {
        lines &= !(1 << pin);
    }
    bus.set_inputs(Some(channel), address::IRQ, lines);
}

fn pins(asserted: [bool; MODULES]) -> [MockPin; MODULES] {
    asserted.map(|a| if a { MockPin::low() } else { MockPin::high() })
}

#[test]
fn edge_update_reports_every_module() {
    let mut bus = bus_with_modules(&[0, 1, 2, 3]);
    let mut board = ModuleBoard::new(TCA9548_ADDRESS);
    board.begin(&mut bus).unwrap();

    // A figure on module 1, sector 0, field 2 north edge
    bus.set_inputs(Some(1), address::SECTOR_0, !(1 << 8));
    raise_irq(&mut bus, 1, &[irq_pin::SECTORS[0]]);

    let changes = board.poll_pins(&mut bus, &mut pins([false, true, false, false]));
    assert_eq!(changes.kinds().collect::<Vec<_>>(), vec![SensorKind::Edge]);

    let packet = board.sensor_update(SensorKind::Edge, MAC);
    assert_eq!(packet.len(), SENSOR_UPDATE_LEN);
    assert_eq!(&packet[..6], &MAC);
    assert_eq!(packet[6], DEVICE_TYPE_BOARD);
    assert_eq!(packet[7], SensorKind::Edge as u8);
    // Module 1 occupies bytes 16..24, sector 0 first
    assert_eq!(&packet[16..18], &[0x00, 0x01]);
    assert_eq!(packet[8..].iter().filter(|&&b| b != 0).count(), 1);
}

#[test]
fn enable_flags_filter_updates() {
    let mut bus = bus_with_modules(&[0, 1, 2, 3]);
    let mut board = ModuleBoard::new(TCA9548_ADDRESS);
    board.begin(&mut bus).unwrap();
    board.enable_sensors(SensorEnable::from_wire(0b100));

    bus.set_inputs(Some(3), address::BUTTONS, 0x0001);
    bus.set_inputs(Some(3), address::BOARD, !0x0010);
    raise_irq(&mut bus, 3, &[irq_pin::BUTTONS, irq_pin::BOARD]);

    let changes = board.poll(&mut bus, [false, false, false, true]);
    assert!(changes.board);
    assert!(!changes.button);

    let packet = board.sensor_update(SensorKind::Board, MAC);
    assert_eq!(packet[7], 1);
    assert_eq!(&packet[14..16], &[0x10, 0x00]);
    // Button chip was never read
    let buttons = board.sensor_update(SensorKind::Button, MAC);
    assert!(buttons[8..].iter().all(|&b| b == 0));
}

#[test]
fn missing_module_does_not_stop_the_others() {
    let mut bus = bus_with_modules(&[0, 2, 3]);
    bus.set_inputs(Some(2), address::BOARD, !0x8001);
    let mut board = ModuleBoard::new(TCA9548_ADDRESS);

    assert_eq!(
        board.begin(&mut bus),
        Err(ModuleError::NotResponding {
            channel: 1,
            address: address::BUTTONS
        })
    );

    // Module 2 still read its initial state
    let mut state = [0u8; 8];
    board.write_sensor_state(SensorKind::Board, &mut state).unwrap();
    assert_eq!(state, [0, 0, 0, 0, 0x01, 0x80, 0, 0]);

    // Polling the missing module reads nothing active
    let changes = board.poll(&mut bus, [false, true, false, false]);
    assert!(!changes.any());
}

#[test]
fn no_interrupt_means_no_bus_traffic() {
    let mut bus = bus_with_modules(&[0, 1, 2, 3]);
    let mut board = ModuleBoard::new(TCA9548_ADDRESS);
    board.begin(&mut bus).unwrap();
    bus.ops.clear();

    let changes = board.poll_pins(&mut bus, &mut pins([false; MODULES]));
    assert!(!changes.any());
    assert!(bus.ops.is_empty());
}

// ============================================================================
// Module Controller
// ============================================================================

type TestController = ModuleController<MockI2c, MockPin, MockPixels, MockTransport>;

const SERVER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 168, 4, 2), 4669);
const REGISTER: [u8; 7] = [0, 192, 168, 4, 2, 0x12, 0x3D];

fn controller(config: &BoardConfig, bus: MockI2c) -> TestController {
    ModuleController::new(
        config,
        bus,
        pins([false; MODULES]),
        MockPixels::new(64),
        MockTransport::new(),
        DeviceId::from_mac(MAC),
    )
}

fn started() -> TestController {
    let mut c = controller(&BoardConfig::default(), bus_with_modules(&[0, 1, 2, 3]));
    c.start().unwrap();
    c
}

#[test]
fn controller_uses_configured_switch_address() {
    let config = BoardConfig::default().with_switch_address(0x74);
    let mut c = controller(&config, bus_behind_switch(0x74, &[0, 1, 2, 3]));
    assert_eq!(c.start(), Ok(()));

    // A board built for the default switch finds nothing on this bus
    let mut wrong = controller(&BoardConfig::default(), bus_behind_switch(0x74, &[0, 1, 2, 3]));
    assert!(matches!(
        wrong.start(),
        Err(ModuleError::NotResponding { channel: 0, .. })
    ));
}

#[test]
fn start_applies_configured_brightness() {
    let config = BoardConfig::default().with_led_brightness(64);
    let mut c = controller(&config, bus_with_modules(&[0, 1, 2, 3]));
    c.start().unwrap();
    assert_eq!(c.pixels().brightness, 64);
    assert!(c.pixels().shows >= 1);
    assert!(c.listener().is_none());
}

#[test]
fn changes_without_listener_send_nothing() {
    let mut c = started();
    c.i2c_mut().set_inputs(Some(0), address::BOARD, !0x0001);
    raise_irq(c.i2c_mut(), 0, &[irq_pin::BOARD]);
    c.irq_pins_mut()[0] = MockPin::low();

    let report = c.tick();
    assert!(report.changes.board);
    assert_eq!(report.updates_sent, 0);
    assert!(c.transport().sent.is_empty());
}

#[test]
fn one_update_per_changed_kind() {
    let mut c = started();
    assert_eq!(c.handle_packet(&REGISTER), Ok(ModuleOutcome::ListenerRegistered(SERVER)));

    // Tile on module 2 and a figure on its sector 3
    c.i2c_mut().set_inputs(Some(2), address::BOARD, !0x0100);
    c.i2c_mut().set_inputs(Some(2), address::SECTOR_3, !0x0002);
    raise_irq(c.i2c_mut(), 2, &[irq_pin::BOARD, irq_pin::SECTORS[3]]);
    c.irq_pins_mut()[2] = MockPin::low();

    let report = c.tick();
    assert_eq!(report.updates_sent, 2);
    let sent = &c.transport().sent;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(dest, packet)| *dest == SERVER && packet.len() == SENSOR_UPDATE_LEN));

    let (_, board) = &sent[0];
    assert_eq!(&board[..6], &MAC);
    assert_eq!(board[7], SensorKind::Board as u8);
    assert_eq!(&board[12..14], &[0x00, 0x01]);

    let (_, edge) = &sent[1];
    assert_eq!(edge[7], SensorKind::Edge as u8);
    // Module 2 edge bytes start at 8 + 2 * 8, sector 3 is the last pair
    assert_eq!(&edge[30..32], &[0x02, 0x00]);

    // Line released: nothing more to send
    c.irq_pins_mut()[2] = MockPin::high();
    assert_eq!(c.tick().updates_sent, 0);
}

#[test]
fn enable_command_filters_updates() {
    let mut c = started();
    c.handle_packet(&REGISTER).unwrap();
    c.transport_mut().queue(&[3, 0b010]);
    let report = c.tick();
    assert_eq!(
        report.command,
        Some(Ok(ModuleOutcome::SensorsEnabled(SensorEnable {
            button: true,
            board: false,
            edge: false,
        })))
    );

    c.i2c_mut().set_inputs(Some(1), address::BOARD, !0x0001);
    raise_irq(c.i2c_mut(), 1, &[irq_pin::BOARD]);
    c.irq_pins_mut()[1] = MockPin::low();
    let report = c.tick();
    assert!(!report.changes.any());
    assert!(c.transport().sent.is_empty());
}

#[test]
fn color_commands_drive_the_strip() {
    let mut c = started();

    let outcome = c.handle_packet(&[2, 3, 0, 7, 63, 17, 5, 99]).unwrap();
    assert_eq!(outcome, ModuleOutcome::PixelsShown { applied: 2, skipped: 1 });
    assert_eq!(c.pixels().pixel(0), Some(Rgb::new(255, 0, 0)));
    assert_eq!(c.pixels().pixel(63), Some(Rgb::new(0, 255, 0)));
    assert_eq!(c.pixels().pixel(5), Some(Rgb::OFF));

    assert_eq!(c.handle_packet(&[4, 30]), Ok(ModuleOutcome::BrightnessSet(30)));
    assert_eq!(c.pixels().brightness, 30);

    assert_eq!(c.handle_packet(&[1]), Ok(ModuleOutcome::PixelsCleared));
    assert_eq!(c.pixels().lit(), 0);
}

#[test]
fn bad_command_leaves_state_alone() {
    let mut c = started();
    c.transport_mut().queue(&[0, 192, 168]);
    let report = c.tick();
    assert!(matches!(report.command, Some(Err(_))));
    assert!(c.listener().is_none());
}
