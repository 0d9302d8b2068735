//! Per-effect parameter bookkeeping and the diff-then-emit download plan.

use pidff_common::encode::ReportEncoder;
use pidff_common::params::{EffectKind, EffectParameters, ParamGroups, ParameterDelta};
use pidff_common::report::Report;
use pidff_errors::{PidError, Result};

use crate::pool::EffectHandle;

/// Human-readable names of the groups in `groups`, comma separated.
pub fn group_names(groups: ParamGroups) -> String {
    const NAMES: [(ParamGroups, &str); 10] = [
        (ParamGroups::DURATION, "duration"),
        (ParamGroups::SAMPLE_PERIOD, "sample period"),
        (ParamGroups::GAIN, "gain"),
        (ParamGroups::TRIGGER_BUTTON, "trigger button"),
        (ParamGroups::TRIGGER_REPEAT_INTERVAL, "trigger repeat interval"),
        (ParamGroups::AXES, "axes"),
        (ParamGroups::DIRECTION, "direction"),
        (ParamGroups::ENVELOPE, "envelope"),
        (ParamGroups::TYPE_SPECIFIC, "type-specific parameters"),
        (ParamGroups::START_DELAY, "start delay"),
    ];
    NAMES
        .iter()
        .filter(|(group, _)| groups.contains(*group))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reports that carry one set of parameter groups to the device.
///
/// The groups count as applied only once every report was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub groups: ParamGroups,
    pub reports: Vec<Report>,
}

/// What a download has to write, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadPlan {
    pub emissions: Vec<Emission>,
    /// Groups the device already agrees with
    pub clean: ParamGroups,
}

impl DownloadPlan {
    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }

    pub fn report_count(&self) -> usize {
        self.emissions.iter().map(|e| e.reports.len()).sum()
    }
}

/// One effect object as the session tracks it.
#[derive(Debug, Clone)]
pub struct Effect {
    handle: EffectHandle,
    kind: EffectKind,
    pending: EffectParameters,
    /// Groups the caller has set at least once
    set_groups: ParamGroups,
    /// Values last written to the device, valid for `applied_groups`
    applied: EffectParameters,
    applied_groups: ParamGroups,
    downloaded: bool,
    /// Device-assigned block; always `None` on host-managed pools
    block_index: Option<u8>,
}

impl Effect {
    pub fn new(handle: EffectHandle, kind: EffectKind) -> Self {
        Self {
            handle,
            kind,
            pending: EffectParameters::default(),
            set_groups: ParamGroups::empty(),
            applied: EffectParameters::default(),
            applied_groups: ParamGroups::empty(),
            downloaded: false,
            block_index: None,
        }
    }

    pub fn handle(&self) -> EffectHandle {
        self.handle
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn parameters(&self) -> &EffectParameters {
        &self.pending
    }

    pub fn set_groups(&self) -> ParamGroups {
        self.set_groups
    }

    pub fn is_downloaded(&self) -> bool {
        self.downloaded
    }

    /// Whether any report of this effect reached the device.
    pub fn has_device_copy(&self) -> bool {
        self.downloaded || !self.applied_groups.is_empty() || self.block_index.is_some()
    }

    pub fn block_index(&self) -> Option<u8> {
        self.block_index
    }

    pub fn set_block_index(&mut self, index: u8) {
        self.block_index = Some(index);
    }

    /// Merge `delta` into the pending parameters.
    pub fn apply(&mut self, delta: &ParameterDelta) -> Result<ParamGroups> {
        delta.apply(self.kind, &mut self.pending)?;
        let groups = delta.groups();
        self.set_groups |= groups;
        Ok(groups)
    }

    /// Required groups never set.
    pub fn missing_groups(&self) -> ParamGroups {
        ParamGroups::REQUIRED.difference(self.set_groups)
    }

    /// Groups whose pending value has not reached the device.
    pub fn dirty_groups(&self) -> ParamGroups {
        let unapplied = ParamGroups::all().difference(self.applied_groups);
        self.pending.diff(&self.applied) | unapplied
    }

    /// Build the reports that bring the device in line with `pending`.
    ///
    /// Order: type-specific payload, envelope, update. An envelope change
    /// also re-sends the update report.
    pub fn plan(&self, encoder: &ReportEncoder<'_>, index: u8) -> Result<DownloadPlan> {
        let missing = self.missing_groups();
        if !missing.is_empty() {
            return Err(PidError::incomplete(group_names(missing)));
        }

        let dirty = self.dirty_groups();
        let mut plan = DownloadPlan::default();

        if dirty.contains(ParamGroups::TYPE_SPECIFIC) {
            let payload = self
                .pending
                .payload
                .as_ref()
                .ok_or_else(|| PidError::incomplete(group_names(ParamGroups::TYPE_SPECIFIC)))?;
            plan.emissions.push(Emission {
                groups: ParamGroups::TYPE_SPECIFIC,
                reports: encoder.payload(index, self.kind, payload)?,
            });
        } else {
            plan.clean |= ParamGroups::TYPE_SPECIFIC;
        }

        let envelope_due = self.kind.supports_envelope()
            && dirty.contains(ParamGroups::ENVELOPE)
            && (self.applied_groups.contains(ParamGroups::ENVELOPE)
                || self.pending.envelope.is_some());
        if envelope_due {
            plan.emissions.push(Emission {
                groups: ParamGroups::ENVELOPE,
                reports: vec![encoder.envelope(index, self.pending.envelope.as_ref())?],
            });
        } else {
            plan.clean |= ParamGroups::ENVELOPE;
        }

        if envelope_due || dirty.intersects(ParamGroups::UPDATE) {
            plan.emissions.push(Emission {
                groups: ParamGroups::UPDATE,
                reports: vec![encoder.set_effect(index, self.kind, &self.pending)?],
            });
        } else {
            plan.clean |= ParamGroups::UPDATE;
        }

        Ok(plan)
    }

    /// Record that `groups` now match the device.
    pub fn mark_applied(&mut self, groups: ParamGroups) {
        self.applied.copy_groups(&self.pending, groups);
        self.applied_groups |= groups;
    }

    /// Record a complete download.
    pub fn mark_downloaded(&mut self) {
        self.applied = self.pending.clone();
        self.applied_groups = ParamGroups::all();
        self.downloaded = true;
    }

    /// Forget the device copy; parameters stay pending.
    pub fn mark_unloaded(&mut self) -> Option<u8> {
        self.applied = EffectParameters::default();
        self.applied_groups = ParamGroups::empty();
        self.downloaded = false;
        self.block_index.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidff_common::params::{Duration, EffectPayload, Envelope, Periodic, TriggerButton};
    use pidff_test_helpers::prelude::*;

    fn complete(effect: &mut Effect) -> Result<ParamGroups> {
        effect.apply(
            &ParameterDelta::new()
                .duration(Duration::Infinite)
                .trigger_button(TriggerButton::None)
                .axes(vec![0])
                .payload(EffectPayload::Periodic(Periodic {
                    magnitude: 5000,
                    ..Periodic::default()
                })),
        )
    }

    fn report_ids(plan: &DownloadPlan) -> Vec<u8> {
        plan.emissions
            .iter()
            .flat_map(|e| e.reports.iter().map(Report::report_id))
            .collect()
    }

    #[test]
    fn test_incomplete_lists_missing_groups() {
        let caps = three_axis_wheel();
        let mut effect = Effect::new(EffectHandle(1), EffectKind::Sine);
        must(effect.apply(&ParameterDelta::new().axes(vec![0])));
        let err = effect.plan(&ReportEncoder::new(&caps), 1);
        assert_eq!(
            err,
            Err(PidError::incomplete(
                "duration, trigger button, type-specific parameters"
            ))
        );
    }

    #[test]
    fn test_first_plan_without_envelope() -> TestResult {
        let caps = three_axis_wheel();
        let mut effect = Effect::new(EffectHandle(1), EffectKind::Sine);
        complete(&mut effect)?;
        let plan = effect.plan(&ReportEncoder::new(&caps), 1)?;
        assert_eq!(report_ids(&plan), vec![SET_PERIODIC, SET_EFFECT]);
        assert_eq!(plan.clean, ParamGroups::ENVELOPE);
        assert_eq!(plan.report_count(), 2);
        Ok(())
    }

    #[test]
    fn test_plan_after_download_is_empty() -> TestResult {
        let caps = three_axis_wheel();
        let mut effect = Effect::new(EffectHandle(1), EffectKind::Sine);
        complete(&mut effect)?;
        effect.mark_downloaded();
        assert!(effect.plan(&ReportEncoder::new(&caps), 1)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_envelope_change_resends_update() -> TestResult {
        let caps = three_axis_wheel();
        let encoder = ReportEncoder::new(&caps);
        let mut effect = Effect::new(EffectHandle(1), EffectKind::Sine);
        complete(&mut effect)?;
        effect.apply(&ParameterDelta::new().envelope(Envelope::default()))?;
        effect.mark_downloaded();

        effect.apply(&ParameterDelta::new().envelope(Envelope {
            attack_time: 2_000,
            ..Envelope::default()
        }))?;
        assert_eq!(
            report_ids(&effect.plan(&encoder, 1)?),
            vec![SET_ENVELOPE, SET_EFFECT]
        );

        effect.mark_downloaded();
        effect.apply(&ParameterDelta::new().remove_envelope())?;
        let plan = effect.plan(&encoder, 1)?;
        assert_eq!(report_ids(&plan), vec![SET_ENVELOPE, SET_EFFECT]);
        assert_eq!(
            plan.emissions[0].reports[0].bytes,
            vec![SET_ENVELOPE, 1, 0, 0, 0, 0, 0, 0]
        );
        Ok(())
    }

    #[test]
    fn test_partial_apply_replans_the_rest() -> TestResult {
        let caps = three_axis_wheel();
        let encoder = ReportEncoder::new(&caps);
        let mut effect = Effect::new(EffectHandle(1), EffectKind::Sine);
        complete(&mut effect)?;
        let plan = effect.plan(&encoder, 1)?;
        effect.mark_applied(plan.clean | plan.emissions[0].groups);

        let replan = effect.plan(&encoder, 1)?;
        assert_eq!(report_ids(&replan), vec![SET_EFFECT]);
        assert!(!effect.is_downloaded());
        assert!(effect.has_device_copy());
        Ok(())
    }

    #[test]
    fn test_unload_keeps_parameters() -> TestResult {
        let mut effect = Effect::new(EffectHandle(1), EffectKind::Sine);
        complete(&mut effect)?;
        effect.set_block_index(3);
        effect.mark_downloaded();
        assert_eq!(effect.mark_unloaded(), Some(3));
        assert!(!effect.has_device_copy());
        assert_eq!(effect.parameters().axes, vec![0]);
        assert!(effect.missing_groups().is_empty());
        Ok(())
    }

    #[test]
    fn test_group_names() {
        assert_eq!(group_names(ParamGroups::empty()), "");
        assert_eq!(
            group_names(ParamGroups::AXES | ParamGroups::START_DELAY),
            "axes, start delay"
        );
    }
}
