use crate::error::ProgressionError;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::str::FromStr;

/// The five points of the approval timeline, in the only order they may be
/// recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Initiated,
    ForwardedToCol,
    ReceivedByLibrary,
    HandedToMs3,
    Closed,
}

impl Milestone {
    pub const ALL: [Milestone; 5] = [
        Milestone::Initiated,
        Milestone::ForwardedToCol,
        Milestone::ReceivedByLibrary,
        Milestone::HandedToMs3,
        Milestone::Closed,
    ];

    /// Timeline key used on the wire.
    pub fn key(self) -> &'static str {
        match self {
            Milestone::Initiated => "initiatedAt",
            Milestone::ForwardedToCol => "forwardedToColAt",
            Milestone::ReceivedByLibrary => "receivedByLibraryAt",
            Milestone::HandedToMs3 => "handedToMS3At",
            Milestone::Closed => "closedAt",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Milestone::Initiated => "Workflow Initiated",
            Milestone::ForwardedToCol => "Forward to Colonel MS HD",
            Milestone::ReceivedByLibrary => "Library Processing",
            Milestone::HandedToMs3 => "Hand over to MS 3",
            Milestone::Closed => "Close Request",
        }
    }

    fn index(self) -> usize {
        match self {
            Milestone::Initiated => 0,
            Milestone::ForwardedToCol => 1,
            Milestone::ReceivedByLibrary => 2,
            Milestone::HandedToMs3 => 3,
            Milestone::Closed => 4,
        }
    }

    pub fn previous(self) -> Option<Milestone> {
        self.index().checked_sub(1).map(|idx| Milestone::ALL[idx])
    }

    /// Step number shown to users. Step 2 is the officers table, so the
    /// forward steps start at 3.
    pub fn step_number(self) -> u8 {
        match self.forward_step() {
            Some(step) => step.number(),
            None => 1,
        }
    }

    pub fn forward_step(self) -> Option<ForwardStep> {
        match self {
            Milestone::Initiated => None,
            Milestone::ForwardedToCol => Some(ForwardStep::ForwardToCol),
            Milestone::ReceivedByLibrary => Some(ForwardStep::LibraryProcessing),
            Milestone::HandedToMs3 => Some(ForwardStep::HandOverToMs3),
            Milestone::Closed => Some(ForwardStep::Close),
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A forward action as numbered in the request payload (`step: 3..=6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardStep {
    ForwardToCol,
    LibraryProcessing,
    HandOverToMs3,
    Close,
}

impl ForwardStep {
    pub const ALL: [ForwardStep; 4] = [
        ForwardStep::ForwardToCol,
        ForwardStep::LibraryProcessing,
        ForwardStep::HandOverToMs3,
        ForwardStep::Close,
    ];

    pub fn number(self) -> u8 {
        match self {
            ForwardStep::ForwardToCol => 3,
            ForwardStep::LibraryProcessing => 4,
            ForwardStep::HandOverToMs3 => 5,
            ForwardStep::Close => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        ForwardStep::ALL
            .into_iter()
            .find(|step| step.number() == number)
    }

    pub fn milestone(self) -> Milestone {
        match self {
            ForwardStep::ForwardToCol => Milestone::ForwardedToCol,
            ForwardStep::LibraryProcessing => Milestone::ReceivedByLibrary,
            ForwardStep::HandOverToMs3 => Milestone::HandedToMs3,
            ForwardStep::Close => Milestone::Closed,
        }
    }
}

impl Serialize for ForwardStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl FromStr for ForwardStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(ForwardStep::from_number)
            .ok_or_else(|| format!("unknown forward step `{s}` (expected 3, 4, 5 or 6)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initiated,
    InProgress,
    Closed,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Initiated => "initiated",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Closed => "closed",
        }
    }

    pub fn label(self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "initiated" => Ok(WorkflowStatus::Initiated),
            "in_progress" => Ok(WorkflowStatus::InProgress),
            "closed" => Ok(WorkflowStatus::Closed),
            _ => Err(format!("unknown workflow status `{s}`")),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats a timestamp the way it travels in request bodies
/// (`2024-05-01T08:30:00.000Z`).
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    #[serde(default)]
    pub initiated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub forwarded_to_col_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received_by_library_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "handedToMS3At")]
    pub handed_to_ms3_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Timeline {
    pub fn get(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        match milestone {
            Milestone::Initiated => self.initiated_at,
            Milestone::ForwardedToCol => self.forwarded_to_col_at,
            Milestone::ReceivedByLibrary => self.received_by_library_at,
            Milestone::HandedToMs3 => self.handed_to_ms3_at,
            Milestone::Closed => self.closed_at,
        }
    }

    fn slot_mut(&mut self, milestone: Milestone) -> &mut Option<DateTime<Utc>> {
        match milestone {
            Milestone::Initiated => &mut self.initiated_at,
            Milestone::ForwardedToCol => &mut self.forwarded_to_col_at,
            Milestone::ReceivedByLibrary => &mut self.received_by_library_at,
            Milestone::HandedToMs3 => &mut self.handed_to_ms3_at,
            Milestone::Closed => &mut self.closed_at,
        }
    }

    /// Status is derived from the timeline alone. `None` means the workflow
    /// has not been initiated and only exists on the client.
    pub fn status(&self) -> Option<WorkflowStatus> {
        if self.closed_at.is_some() {
            Some(WorkflowStatus::Closed)
        } else if self.forwarded_to_col_at.is_some()
            || self.received_by_library_at.is_some()
            || self.handed_to_ms3_at.is_some()
        {
            Some(WorkflowStatus::InProgress)
        } else if self.initiated_at.is_some() {
            Some(WorkflowStatus::Initiated)
        } else {
            None
        }
    }

    pub fn completed(&self) -> usize {
        Milestone::ALL
            .into_iter()
            .filter(|milestone| self.get(*milestone).is_some())
            .count()
    }

    pub fn progress_percent(&self) -> u8 {
        // Five milestones, twenty percent each.
        (self.completed() * 20) as u8
    }

    /// First milestone that has not been recorded yet.
    pub fn next_pending(&self) -> Option<Milestone> {
        Milestone::ALL
            .into_iter()
            .find(|milestone| self.get(*milestone).is_none())
    }

    /// True when no milestone is set while an earlier one is still unset.
    pub fn is_ordered(&self) -> bool {
        Milestone::ALL
            .windows(2)
            .all(|pair| self.get(pair[1]).is_none() || self.get(pair[0]).is_some())
    }

    /// Checks that `milestone` is the next one allowed on this timeline.
    pub fn admit(&self, milestone: Milestone) -> Result<(), ProgressionError> {
        if self.closed_at.is_some() {
            return Err(ProgressionError::AlreadyClosed);
        }
        if self.get(milestone).is_some() {
            return Err(ProgressionError::AlreadyRecorded(milestone));
        }
        match self.next_pending() {
            Some(missing) if missing != milestone => Err(ProgressionError::PrecedesPrerequisite {
                milestone,
                missing,
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn record(&mut self, milestone: Milestone, at: DateTime<Utc>) {
        let slot = self.slot_mut(milestone);
        if slot.is_none() {
            *slot = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn status_follows_timeline_fields() {
        let mut timeline = Timeline::default();
        assert_eq!(timeline.status(), None);

        timeline.record(Milestone::Initiated, at(0));
        assert_eq!(timeline.status(), Some(WorkflowStatus::Initiated));

        for (minute, milestone) in [
            (1, Milestone::ForwardedToCol),
            (2, Milestone::ReceivedByLibrary),
            (3, Milestone::HandedToMs3),
        ] {
            timeline.record(milestone, at(minute));
            assert_eq!(timeline.status(), Some(WorkflowStatus::InProgress));
        }

        timeline.record(Milestone::Closed, at(4));
        assert_eq!(timeline.status(), Some(WorkflowStatus::Closed));
        assert_eq!(timeline.progress_percent(), 100);
    }

    #[test]
    fn status_ignores_ordering_for_foreign_timelines() {
        let timeline = Timeline {
            received_by_library_at: Some(at(2)),
            ..Timeline::default()
        };
        assert_eq!(timeline.status(), Some(WorkflowStatus::InProgress));
        assert!(!timeline.is_ordered());
    }

    #[test]
    fn admit_enforces_linear_order() {
        let mut timeline = Timeline::default();
        assert_eq!(
            timeline.admit(Milestone::ForwardedToCol),
            Err(ProgressionError::PrecedesPrerequisite {
                milestone: Milestone::ForwardedToCol,
                missing: Milestone::Initiated,
            })
        );
        assert_eq!(timeline.admit(Milestone::Initiated), Ok(()));

        timeline.record(Milestone::Initiated, at(0));
        assert_eq!(
            timeline.admit(Milestone::Initiated),
            Err(ProgressionError::AlreadyRecorded(Milestone::Initiated))
        );
        assert_eq!(timeline.admit(Milestone::ForwardedToCol), Ok(()));
        assert_eq!(
            timeline.admit(Milestone::Closed),
            Err(ProgressionError::PrecedesPrerequisite {
                milestone: Milestone::Closed,
                missing: Milestone::ForwardedToCol,
            })
        );
    }

    #[test]
    fn record_never_overwrites() {
        let mut timeline = Timeline::default();
        timeline.record(Milestone::Initiated, at(0));
        timeline.record(Milestone::Initiated, at(9));
        assert_eq!(timeline.initiated_at, Some(at(0)));
    }

    #[test]
    fn deserializes_wire_keys() {
        let timeline: Timeline = serde_json::from_str(
            r#"{"initiatedAt":"2024-05-01T08:00:00.000Z","forwardedToColAt":null,"handedToMS3At":null}"#,
        )
        .expect("timeline");
        assert_eq!(timeline.initiated_at, Some(at(0)));
        assert_eq!(timeline.next_pending(), Some(Milestone::ForwardedToCol));
        assert_eq!(iso_timestamp(&at(0)), "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn forward_steps_map_to_milestones() {
        assert_eq!(ForwardStep::from_number(2), None);
        assert_eq!("6".parse::<ForwardStep>(), Ok(ForwardStep::Close));
        assert_eq!(ForwardStep::HandOverToMs3.milestone(), Milestone::HandedToMs3);
        assert_eq!(Milestone::ReceivedByLibrary.step_number(), 4);
        assert_eq!(Milestone::Initiated.step_number(), 1);
        assert_eq!(WorkflowStatus::InProgress.label(), "IN PROGRESS");
    }
}
