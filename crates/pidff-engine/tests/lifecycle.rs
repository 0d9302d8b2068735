//! Effect lifecycle: download, diffing, start/stop, unload and destroy.

use pidff_engine::prelude::*;
use pidff_engine::transport::mock::MockTransport;
use pidff_errors::TransportError;
use pidff_test_helpers::prelude::*;
use proptest::prelude::*;

fn sine() -> ParameterDelta {
    ParameterDelta::new()
        .duration(Duration::Infinite)
        .gain(10_000)
        .trigger_button(TriggerButton::None)
        .axes(vec![0, 1])
        .direction(DirectionRepr::Cartesian, vec![10_000, 0])
        .payload(EffectPayload::Periodic(Periodic {
            magnitude: 5000,
            period: 20_000,
            ..Periodic::default()
        }))
}

fn spring() -> ParameterDelta {
    ParameterDelta::new()
        .duration(Duration::Infinite)
        .trigger_button(TriggerButton::None)
        .axes(vec![0])
        .payload(EffectPayload::Condition(vec![Condition {
            positive_coefficient: 5000,
            negative_coefficient: 5000,
            positive_saturation: 10_000,
            negative_saturation: 10_000,
            ..Condition::default()
        }]))
}

fn acquired() -> Result<(PidDevice<MockTransport>, MockTransport), PidError> {
    let caps = three_axis_wheel();
    let mock = MockTransport::for_device(&caps);
    let device = PidDevice::new(caps, mock.clone())?;
    device.acquire(AccessMode::Exclusive)?;
    mock.clear();
    Ok((device, mock))
}

#[test]
fn test_second_download_is_no_effect() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;

    assert_eq!(device.download(handle)?, Outcome::Done);
    let first = mock.take();
    assert_report_ids(&first, &[SET_PERIODIC, SET_EFFECT]);

    assert_eq!(device.download(handle)?, Outcome::NoEffect);
    assert!(mock.written().is_empty());
    Ok(())
}

#[test]
fn test_envelope_attack_change_resends_envelope_and_update_only() -> TestResult {
    let (device, mock) = acquired()?;
    let delta = sine().envelope(Envelope {
        attack_level: 1000,
        attack_time: 2_000,
        fade_level: 3000,
        fade_time: 4_000,
    });
    let handle = device.create_effect(EffectKind::Sine, Some(&delta))?;
    device.download(handle)?;
    mock.clear();

    let change = ParameterDelta::new().envelope(Envelope {
        attack_level: 1000,
        attack_time: 5_000,
        fade_level: 3000,
        fade_time: 4_000,
    });
    assert_eq!(
        device.set_parameters(handle, &change, SetFlags::default())?,
        Outcome::Done
    );

    let written = mock.take();
    assert_report_ids(&written, &[SET_ENVELOPE, SET_EFFECT]);
    assert_eq!(only_report(&written, SET_ENVELOPE).bytes[4], 5);
    Ok(())
}

#[test]
fn test_payload_change_resends_payload_only() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    device.download(handle)?;
    mock.clear();

    let change = ParameterDelta::new().payload(EffectPayload::Periodic(Periodic {
        magnitude: 2000,
        period: 20_000,
        ..Periodic::default()
    }));
    device.set_parameters(handle, &change, SetFlags::default())?;
    assert_report_ids(&mock.take(), &[SET_PERIODIC]);
    Ok(())
}

#[test]
fn test_condition_effect_sends_no_envelope() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Spring, Some(&spring()))?;
    device.download(handle)?;
    assert_report_ids(&mock.take(), &[SET_CONDITION, SET_EFFECT]);

    let err = device.set_parameters(
        handle,
        &ParameterDelta::new().envelope(Envelope::default()),
        SetFlags::default(),
    );
    assert!(matches!(err, Err(PidError::InvalidParameter(_))));
    Ok(())
}

#[test]
fn test_condition_records_follow_axes() -> TestResult {
    let (device, mock) = acquired()?;
    let record = Condition {
        positive_coefficient: 10_000,
        negative_coefficient: -10_000,
        ..Condition::default()
    };
    let delta = spring()
        .axes(vec![0, 1])
        .payload(EffectPayload::Condition(vec![record, record]));
    let handle = device.create_effect(EffectKind::Damper, Some(&delta))?;
    device.download(handle)?;

    let written = mock.take();
    assert_report_ids(&written, &[SET_CONDITION, SET_CONDITION, SET_EFFECT]);
    // parameter block offset in the low nibble of byte 2
    assert_eq!(written[0].bytes[2] & 0x0F, 0);
    assert_eq!(written[1].bytes[2] & 0x0F, 1);
    Ok(())
}

#[test]
fn test_incomplete_effect_names_missing_groups() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(
        EffectKind::Sine,
        Some(&ParameterDelta::new().axes(vec![0])),
    )?;
    assert_eq!(
        device.download(handle),
        Err(PidError::incomplete(
            "duration, trigger button, type-specific parameters"
        ))
    );
    assert!(mock.written().is_empty());
    Ok(())
}

#[test]
fn test_trigger_button_outside_device_range_is_rejected() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    device.download(handle)?;
    mock.clear();

    let wide = ParameterDelta::new().trigger_button(TriggerButton::Button(9));
    assert!(matches!(
        device.set_parameters(handle, &wide, SetFlags::default()),
        Err(PidError::InvalidParameter(_))
    ));
    assert!(mock.written().is_empty());
    assert!(matches!(
        device.create_effect(EffectKind::Sine, Some(&sine().trigger_button(TriggerButton::Button(0)))),
        Err(PidError::InvalidParameter(_))
    ));

    let last = ParameterDelta::new().trigger_button(TriggerButton::Button(8));
    assert_eq!(device.set_parameters(handle, &last, SetFlags::default())?, Outcome::Done);
    let set_effect = only_report(&mock.written(), SET_EFFECT).clone();
    assert_eq!(set_effect.bytes[12], 8);
    Ok(())
}

#[test]
fn test_download_needs_exclusive_session() -> TestResult {
    let caps = three_axis_wheel();
    let device = PidDevice::new(caps, MockTransport::new())?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    assert_eq!(device.download(handle), Err(PidError::NotExclusivelyAcquired));
    assert_eq!(
        device.start(handle, 1, StartFlags::default()),
        Err(PidError::NotExclusivelyAcquired)
    );
    assert_eq!(device.stop(handle), Err(PidError::NotExclusivelyAcquired));

    device.acquire(AccessMode::Shared)?;
    assert_eq!(device.download(handle), Err(PidError::NotExclusivelyAcquired));
    Ok(())
}

#[test]
fn test_start_without_download_fails_when_forbidden() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;

    let no_download = StartFlags {
        no_download: true,
        ..StartFlags::default()
    };
    assert_eq!(device.start(handle, 1, no_download), Err(PidError::NotDownloaded));
    assert!(mock.written().is_empty());
    assert_eq!(device.get_status(handle), Err(PidError::NotDownloaded));

    assert_eq!(device.start(handle, 1, StartFlags::default())?, Outcome::Done);
    assert_report_ids(&mock.take(), &[SET_PERIODIC, SET_EFFECT, EFFECT_OPERATION]);
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);

    // already on the device: no_download is fine now
    assert_eq!(device.start(handle, 1, no_download)?, Outcome::Done);
    assert_report_ids(&mock.take(), &[EFFECT_OPERATION]);
    Ok(())
}

#[test]
fn test_infinite_iterations_and_solo() -> TestResult {
    let (device, mock) = acquired()?;
    let first = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    let second = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    device.start(first, u32::MAX, StartFlags::default())?;
    device.download(second)?;
    mock.clear();

    let solo = StartFlags {
        solo: true,
        ..StartFlags::default()
    };
    device.start(second, 3, solo)?;
    insta::assert_snapshot!(hex_lines(&mock.take()), @"0a 02 02 03");
    assert_eq!(device.get_status(first)?, EffectStatus::empty());
    assert_eq!(device.get_status(second)?, EffectStatus::PLAYING);

    device.stop(second)?;
    assert_eq!(device.get_status(second)?, EffectStatus::empty());
    Ok(())
}

#[test]
fn test_loop_forever_encodes_loop_maximum() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    device.download(handle)?;
    mock.clear();
    device.start(handle, u32::MAX, StartFlags::default())?;
    insta::assert_snapshot!(hex_lines(&mock.take()), @"0a 01 01 ff");
    Ok(())
}

#[test]
fn test_stop_before_download_fails() -> TestResult {
    let (device, _) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    assert_eq!(device.stop(handle), Err(PidError::NotDownloaded));
    Ok(())
}

#[test]
fn test_set_parameters_buffers_until_downloaded() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, None)?;

    assert_eq!(
        device.set_parameters(handle, &sine(), SetFlags::default())?,
        Outcome::Skipped
    );
    assert!(mock.written().is_empty());

    device.download(handle)?;
    mock.clear();

    let no_download = SetFlags {
        no_download: true,
        ..SetFlags::default()
    };
    let change = ParameterDelta::new().gain(5000);
    assert_eq!(device.set_parameters(handle, &change, no_download)?, Outcome::Skipped);
    assert!(mock.written().is_empty());

    // the buffered change goes out with the next download
    assert_eq!(device.download(handle)?, Outcome::Done);
    assert_report_ids(&mock.take(), &[SET_EFFECT]);
    Ok(())
}

#[test]
fn test_set_parameters_with_start_flag() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, None)?;
    let start = SetFlags {
        start: true,
        ..SetFlags::default()
    };
    assert_eq!(device.set_parameters(handle, &sine(), start)?, Outcome::Done);
    assert_report_ids(&mock.take(), &[SET_PERIODIC, SET_EFFECT, EFFECT_OPERATION]);
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);
    Ok(())
}

#[test]
fn test_direction_wider_than_axes_is_rejected() -> TestResult {
    let (device, _) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    let wide = ParameterDelta::new().direction(DirectionRepr::Cartesian, vec![1, 2, 3]);
    assert!(matches!(
        device.set_parameters(handle, &wide, SetFlags::default()),
        Err(PidError::InvalidParameter(_))
    ));

    let narrow = ParameterDelta::new().direction(DirectionRepr::Cartesian, vec![4000]);
    device.set_parameters(handle, &narrow, SetFlags::default())?;
    let mut out = [7i32; 2];
    let read = device.get_direction(handle, DirectionRepr::Cartesian, &mut out)?;
    assert_eq!(read.count, 2);
    assert_eq!(out, [4000, 0]);
    Ok(())
}

#[test]
fn test_short_direction_buffer_reports_more_data() -> TestResult {
    let (device, _) = acquired()?;
    let delta = sine()
        .axes(vec![0, 1, 2])
        .direction(DirectionRepr::Cartesian, vec![1, 2, 3]);
    let handle = device.create_effect(EffectKind::Sine, Some(&delta))?;

    let mut out = [0i32; 2];
    let read = device.get_direction(handle, DirectionRepr::Cartesian, &mut out)?;
    assert_eq!(read.count, 3);
    assert_eq!(read.status, ReadStatus::MoreData);
    assert_eq!(out, [1, 2]);
    Ok(())
}

#[test]
fn test_get_parameters_returns_requested_groups() -> TestResult {
    let (device, _) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    let got = device.get_parameters(handle, ParamGroups::AXES | ParamGroups::GAIN)?;
    assert_eq!(got.axes, Some(vec![0, 1]));
    assert_eq!(got.gain, Some(10_000));
    assert_eq!(got.duration, None);
    assert_eq!(got.groups(), ParamGroups::AXES | ParamGroups::GAIN);
    Ok(())
}

#[test]
fn test_unload_stops_and_keeps_parameters() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    assert_eq!(device.unload(handle)?, Outcome::NoEffect);

    device.start(handle, 1, StartFlags::default())?;
    mock.clear();
    assert_eq!(device.unload(handle)?, Outcome::Done);
    insta::assert_snapshot!(hex_lines(&mock.take()), @"0a 01 03 00");
    assert_eq!(device.get_status(handle), Err(PidError::NotDownloaded));
    assert_eq!(device.unload(handle)?, Outcome::NoEffect);

    // parameters survive: a fresh download sends everything again
    device.download(handle)?;
    assert_report_ids(&mock.take(), &[SET_PERIODIC, SET_EFFECT]);
    Ok(())
}

#[test]
fn test_destroy_frees_the_handle() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&sine()))?;
    device.download(handle)?;
    mock.clear();

    device.destroy_effect(handle)?;
    assert_report_ids(&mock.take(), &[EFFECT_OPERATION]);
    assert!(device.enumerate_created_effects().is_empty());
    assert_eq!(device.get_status(handle), Err(PidError::EffectNotFound(1)));
    assert_eq!(device.download(handle), Err(PidError::EffectNotFound(1)));

    let again = device.create_effect(EffectKind::Sine, None)?;
    assert_eq!(again, handle);
    Ok(())
}

#[test]
fn test_host_pool_runs_out() -> TestResult {
    let (device, _) = acquired()?;
    let capacity = device.caps().max_effects;
    for _ in 0..capacity {
        device.create_effect(EffectKind::ConstantForce, None)?;
    }
    assert_eq!(
        device.create_effect(EffectKind::ConstantForce, None),
        Err(PidError::DeviceFull)
    );
    assert_eq!(device.enumerate_created_effects().len(), usize::from(capacity));
    Ok(())
}

#[test]
fn test_partial_download_records_what_reached_the_device() -> TestResult {
    let (device, mock) = acquired()?;
    let delta = sine().envelope(Envelope::default());
    let handle = device.create_effect(EffectKind::Sine, Some(&delta))?;

    mock.fail_on(SET_EFFECT);
    assert!(matches!(
        device.download(handle),
        Err(PidError::Transport(TransportError::WriteFailed { .. }))
    ));
    assert_report_ids(&mock.take(), &[SET_PERIODIC, SET_ENVELOPE]);
    assert_eq!(device.get_status(handle), Err(PidError::NotDownloaded));

    mock.clear_failure();
    assert_eq!(device.download(handle)?, Outcome::Done);
    assert_report_ids(&mock.take(), &[SET_EFFECT]);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_redownload_after_any_change_is_no_effect(
        gain in 0u32..=10_000,
        magnitude in 0i32..=10_000,
        delay in 0u32..1_000_000,
        attack in proptest::option::of(0u32..100_000),
    ) {
        let (device, mock) = acquired().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let handle = device
            .create_effect(EffectKind::Sine, Some(&sine()))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        device.download(handle).map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut change = ParameterDelta::new()
            .gain(gain)
            .start_delay(delay)
            .payload(EffectPayload::Periodic(Periodic { magnitude, ..Periodic::default() }));
        if let Some(attack_time) = attack {
            change = change.envelope(Envelope { attack_time, ..Envelope::default() });
        }
        device
            .set_parameters(handle, &change, SetFlags::default())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        mock.clear();

        let again = device.download(handle).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(again, Outcome::NoEffect);
        prop_assert!(mock.written().is_empty());
    }
}
