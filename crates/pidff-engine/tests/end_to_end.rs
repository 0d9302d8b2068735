//! Full download of a three-axis sine effect with an envelope.

use pidff_engine::prelude::*;
use pidff_engine::transport::mock::MockTransport;
use pidff_test_helpers::prelude::*;

fn scenario() -> ParameterDelta {
    ParameterDelta::new()
        .duration(Duration::Finite(2_000_000))
        .gain(10_000)
        .trigger_button(TriggerButton::None)
        .axes(vec![0, 1, 2])
        .direction(DirectionRepr::Spherical, vec![3000, 6000])
        .envelope(Envelope {
            attack_level: 1000,
            attack_time: 2_000,
            fade_level: 3000,
            fade_time: 4_000,
        })
        .payload(EffectPayload::Periodic(Periodic {
            magnitude: 1000,
            offset: 0,
            phase: 0,
            period: 10_000,
        }))
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
fn test_download_emits_periodic_envelope_update_in_order() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&scenario()))?;
    assert!(mock.written().is_empty(), "create must not write");

    assert_eq!(device.download(handle)?, Outcome::Done);

    let written = mock.take();
    assert_report_ids(&written, &[SET_PERIODIC, SET_ENVELOPE, SET_EFFECT]);
    assert_no_report(&written, EFFECT_OPERATION);
    insta::assert_snapshot!(hex_lines(&written), @r"
    04 01 19 ff 00 0a 00
    02 01 19 4c 02 00 04 00
    01 01 04 d0 07 00 00 00 00 00 00 ff ff 0f 15 2a
    ");
    Ok(())
}

#[test]
fn test_direction_reads_back_in_every_representation() -> TestResult {
    let (device, _) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&scenario()))?;

    let mut spherical = [0i32; 3];
    let read = device.get_direction(handle, DirectionRepr::Spherical, &mut spherical)?;
    assert_eq!(read.count, 3);
    assert_eq!(read.status, ReadStatus::Exact);
    assert!((spherical[0] - 3000).abs() <= 1, "{spherical:?}");
    assert!((spherical[1] - 6000).abs() <= 1, "{spherical:?}");
    assert_eq!(spherical[2], 0);

    let mut cartesian = [0i32; 3];
    device.get_direction(handle, DirectionRepr::Cartesian, &mut cartesian)?;
    assert_eq!(cartesian, [4330, 2500, 8660]);

    assert!(matches!(
        device.get_direction(handle, DirectionRepr::Polar, &mut [0; 2]),
        Err(PidError::InvalidParameter(_))
    ));
    Ok(())
}

#[test]
fn test_start_after_scenario_adds_only_the_control_report() -> TestResult {
    let (device, mock) = acquired()?;
    let handle = device.create_effect(EffectKind::Sine, Some(&scenario()))?;
    device.download(handle)?;
    mock.clear();

    device.start(handle, 1, StartFlags::default())?;
    insta::assert_snapshot!(hex_lines(&mock.take()), @"0a 01 01 01");
    assert_eq!(device.get_status(handle)?, EffectStatus::PLAYING);
    Ok(())
}
