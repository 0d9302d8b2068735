//! Inbound status decoding and its interplay with caller threads.

use std::thread;

use pidff_common::decode::InputReport;
use pidff_engine::prelude::*;
use pidff_engine::transport::mock::MockTransport;
use pidff_test_helpers::prelude::*;

fn constant() -> ParameterDelta {
    ParameterDelta::new()
        .duration(Duration::Infinite)
        .trigger_button(TriggerButton::None)
        .axes(vec![0])
        .payload(EffectPayload::ConstantForce(ConstantForce { magnitude: 2500 }))
}

/// PID State report for the reference wheel.
fn state_report(flags: u8, block: u8, playing: bool) -> Vec<u8> {
    vec![PID_STATE, flags, (block << 1) | u8::from(playing)]
}

const ACTUATORS: u8 = 0b0000_0010;
const POWER: u8 = 0b0001_0000;

fn playing_effect() -> Result<(PidDevice<MockTransport>, EffectHandle), PidError> {
    let device = PidDevice::new(three_axis_wheel(), MockTransport::new())?;
    device.acquire(AccessMode::Exclusive)?;
    let handle = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    device.start(handle, 1, StartFlags::default())?;
    Ok((device, handle))
}

#[test]
fn test_state_report_stops_the_mapped_effect() -> TestResult {
    let (device, handle) = playing_effect()?;
    let sink = device.status_sink();
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);

    let report = sink.handle_input(&state_report(ACTUATORS | POWER, 1, false));
    assert!(matches!(report, InputReport::DeviceState(_)));
    assert_eq!(device.get_status(handle)?, EffectStatus::empty());
    assert_eq!(
        device.get_device_state()?,
        ForceFeedbackState::ACTUATORS_ON
            | ForceFeedbackState::POWER_ON
            | ForceFeedbackState::SAFETY_SWITCH_OFF
            | ForceFeedbackState::USER_FF_SWITCH_OFF
            | ForceFeedbackState::STOPPED
    );

    sink.handle_input(&state_report(ACTUATORS | POWER, 1, true));
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);
    assert!(!device.get_device_state()?.contains(ForceFeedbackState::STOPPED));
    Ok(())
}

#[test]
fn test_unknown_blocks_and_reports_are_ignored() -> TestResult {
    let (device, handle) = playing_effect()?;
    let sink = device.status_sink();

    let before = device.get_device_state()?;
    assert!(!before.contains(ForceFeedbackState::STOPPED));

    sink.handle_input(&state_report(0, 5, false));
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);
    assert_eq!(device.get_device_state()?, before);

    assert_eq!(
        sink.handle_input(&[0x07, 0xFF]),
        InputReport::Unknown { report_id: 0x07 }
    );
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);
    assert_eq!(device.get_device_state()?, before);
    Ok(())
}

#[test]
fn test_one_stopped_block_leaves_device_playing() -> TestResult {
    let (device, first) = playing_effect()?;
    let second = device.create_effect(EffectKind::ConstantForce, Some(&constant()))?;
    device.start(second, 1, StartFlags::default())?;
    let sink = device.status_sink();

    sink.handle_input(&state_report(ACTUATORS | POWER, 2, false));
    assert_eq!(device.get_status(first)?, EffectStatus::PLAYING);
    assert_eq!(device.get_status(second)?, EffectStatus::empty());

    let state = device.get_device_state()?;
    assert!(!state.contains(ForceFeedbackState::STOPPED));
    assert!(state.contains(ForceFeedbackState::ACTUATORS_ON | ForceFeedbackState::POWER_ON));

    sink.handle_input(&state_report(ACTUATORS | POWER, 1, false));
    assert!(device.get_device_state()?.contains(ForceFeedbackState::STOPPED));
    Ok(())
}

#[test]
fn test_reported_pause_shows_in_device_state() -> TestResult {
    let (device, _) = playing_effect()?;
    let sink = device.status_sink();
    sink.handle_input(&state_report(0b0000_0001, 1, true));
    assert!(device.get_device_state()?.contains(ForceFeedbackState::PAUSED));
    sink.handle_input(&state_report(0, 1, true));
    assert!(!device.get_device_state()?.contains(ForceFeedbackState::PAUSED));
    Ok(())
}

#[test]
fn test_reader_thread_runs_alongside_writes() -> TestResult {
    let (device, handle) = playing_effect()?;
    let sink = device.status_sink();

    thread::scope(|scope| -> TestResult {
        let reader = scope.spawn(move || {
            for n in 0..500u32 {
                sink.handle_input(&state_report(ACTUATORS, 1, n % 2 == 0));
            }
        });

        for magnitude in (0..200).map(|n| n * 50) {
            let change = ParameterDelta::new()
                .payload(EffectPayload::ConstantForce(ConstantForce { magnitude }));
            device.set_parameters(handle, &change, SetFlags::default())?;
            let _ = device.get_status(handle)?;
        }

        reader.join().map_err(|_| "reader thread panicked")?;
        Ok(())
    })?;

    // the last report said "stopped"
    assert_eq!(device.get_status(handle)?, EffectStatus::empty());
    Ok(())
}
