//! Acquire/release and device-level commands.

use pidff_engine::prelude::*;
use pidff_engine::transport::mock::MockTransport;
use pidff_errors::TransportError;
use pidff_test_helpers::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn constant() -> ParameterDelta {
    ParameterDelta::new()
        .duration(Duration::Infinite)
        .trigger_button(TriggerButton::None)
        .axes(vec![0])
        .payload(EffectPayload::ConstantForce(ConstantForce { magnitude: 5000 }))
}

fn open(caps: pidff_common::caps::DeviceCapabilities) -> Result<(PidDevice<MockTransport>, MockTransport), PidError> {
    let mock = MockTransport::for_device(&caps);
    let device = PidDevice::new(caps, mock.clone())?;
    Ok((device, mock))
}

#[test]
fn test_exclusive_acquire_resets_and_sends_gain() -> TestResult {
    init_tracing();
    let (device, mock) = open(three_axis_wheel())?;
    assert_eq!(device.acquire(AccessMode::Exclusive)?, Outcome::Done);
    insta::assert_snapshot!(hex_lines(&mock.take()), @r"
    0c 04
    0d ff
    ");
    assert_eq!(device.access_mode(), Some(AccessMode::Exclusive));
    assert_eq!(
        device.get_device_state()?,
        ForceFeedbackState::EMPTY | ForceFeedbackState::STOPPED
    );
    Ok(())
}

#[test]
fn test_per_acquire_autocenter_is_resent() -> TestResult {
    let (device, mock) = open(device_managed_wheel(4))?;
    device.set_autocenter(false)?;
    assert!(mock.written().is_empty());

    device.acquire(AccessMode::Exclusive)?;
    insta::assert_snapshot!(hex_lines(&mock.take()), @r"
    0c 04
    0d ff
    0e 00
    ");

    device.set_autocenter(true)?;
    insta::assert_snapshot!(hex_lines(&mock.take()), @"0e 01");
    Ok(())
}

#[test]
fn test_autocenter_quirk_moves_autocenter_first() -> TestResult {
    let mut caps = device_managed_wheel(4);
    caps.quirks.autocenter_before_reset = true;
    let (device, mock) = open(caps)?;
    device.acquire(AccessMode::Exclusive)?;
    assert_eq!(mock.written_ids(), vec![AUTOCENTER, DEVICE_CONTROL, DEVICE_GAIN]);
    Ok(())
}

#[test]
fn test_switching_modes_releases_first() -> TestResult {
    let (device, mock) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;
    mock.clear();

    assert_eq!(device.acquire(AccessMode::Shared)?, Outcome::Done);
    // the release resets the device; the shared session writes nothing
    assert_eq!(mock.written_ids(), vec![DEVICE_CONTROL]);
    assert_eq!(device.access_mode(), Some(AccessMode::Shared));
    assert_eq!(device.release()?, Outcome::Done);
    assert_eq!(device.release()?, Outcome::NoEffect);
    Ok(())
}

#[test]
fn test_minimal_device_lacks_optional_reports() -> TestResult {
    let (device, mock) = open(minimal_joystick())?;
    device.acquire(AccessMode::Exclusive)?;
    assert!(mock.written().is_empty());

    assert!(matches!(device.set_gain(5000), Err(PidError::UsageNotFound(_))));
    assert!(matches!(device.set_autocenter(true), Err(PidError::UsageNotFound(_))));
    assert!(matches!(
        device.send_command(DeviceCommand::Pause),
        Err(PidError::UsageNotFound(_))
    ));
    assert_eq!(
        device.create_effect(EffectKind::Sine, None),
        Err(PidError::DeviceNotRegistered("Sine".to_string()))
    );

    let handle = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    device.start(handle, 1, StartFlags::default())?;
    assert_report_ids(&mock.take(), &[SET_CONSTANT_FORCE, SET_EFFECT, EFFECT_OPERATION]);
    Ok(())
}

#[test]
fn test_release_stops_effects_then_resets() -> TestResult {
    let (device, mock) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;
    let playing = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    let idle = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    device.start(playing, 1, StartFlags::default())?;
    mock.clear();

    assert_eq!(device.release()?, Outcome::Done);
    insta::assert_snapshot!(hex_lines(&mock.take()), @r"
    0a 01 03 00
    0c 04
    ");
    assert_eq!(device.access_mode(), None);
    assert_eq!(device.get_status(playing), Err(PidError::NotDownloaded));
    assert_eq!(device.get_status(idle), Err(PidError::NotDownloaded));
    assert_eq!(device.enumerate_created_effects(), vec![playing, idle]);

    // a new session downloads from scratch
    device.acquire(AccessMode::Exclusive)?;
    mock.clear();
    device.download(playing)?;
    assert_report_ids(&mock.take(), &[SET_CONSTANT_FORCE, SET_EFFECT]);
    Ok(())
}

#[test]
fn test_pause_continue_and_stop_all() -> TestResult {
    let (device, mock) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;
    let handle = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    device.start(handle, 1, StartFlags::default())?;
    mock.clear();

    device.send_command(DeviceCommand::Pause)?;
    assert!(device.get_device_state()?.contains(ForceFeedbackState::PAUSED));
    assert_eq!(device.get_status(handle)?, EffectStatus::empty());

    device.send_command(DeviceCommand::Continue)?;
    assert!(!device.get_device_state()?.contains(ForceFeedbackState::PAUSED));
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);

    device.send_command(DeviceCommand::StopAll)?;
    assert_eq!(device.get_status(handle)?, EffectStatus::empty());
    assert!(device.get_device_state()?.contains(ForceFeedbackState::STOPPED));

    insta::assert_snapshot!(hex_lines(&mock.take()), @r"
    0c 05
    0c 06
    0c 03
    ");
    Ok(())
}

#[test]
fn test_reset_command_unloads_everything() -> TestResult {
    let (device, mock) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;
    let handle = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    device.download(handle)?;

    device.send_command(DeviceCommand::Reset)?;
    assert_eq!(device.get_status(handle), Err(PidError::NotDownloaded));
    mock.clear();
    assert_eq!(device.download(handle)?, Outcome::Done);
    assert_report_ids(&mock.take(), &[SET_CONSTANT_FORCE, SET_EFFECT]);
    Ok(())
}

#[test]
fn test_actuator_commands_override_reported_state() -> TestResult {
    let (device, _) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;

    device.send_command(DeviceCommand::ActuatorsOff)?;
    let state = device.get_device_state()?;
    assert!(state.contains(ForceFeedbackState::ACTUATORS_OFF));
    assert!(!state.contains(ForceFeedbackState::ACTUATORS_ON));

    device.send_command(DeviceCommand::ActuatorsOn)?;
    assert!(device.get_device_state()?.contains(ForceFeedbackState::ACTUATORS_ON));
    Ok(())
}

#[test]
fn test_disconnect_marks_device_lost() -> TestResult {
    let (device, mock) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;
    let handle = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;

    mock.disconnect();
    assert_eq!(
        device.download(handle),
        Err(PidError::Transport(TransportError::Disconnected))
    );
    assert!(device.get_device_state()?.contains(ForceFeedbackState::DEVICE_LOST));
    assert!(mock.written().is_empty());
    Ok(())
}

#[test]
fn test_gain_is_sent_while_acquired() -> TestResult {
    let (device, mock) = open(three_axis_wheel())?;
    device.acquire(AccessMode::Exclusive)?;
    mock.clear();
    device.set_gain(0)?;
    insta::assert_snapshot!(hex_lines(&mock.take()), @"0d 00");
    assert_eq!(device.gain(), 0);
    Ok(())
}
