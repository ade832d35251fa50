//! Client-side search, filtering and roll-ups over a fetched workflow list.

use crate::officer::Officer;
use crate::record::WorkflowId;
use crate::record::WorkflowRecord;
use crate::timeline::WorkflowStatus;
use chrono::DateTime;
use chrono::Datelike;
use chrono::Duration;
use chrono::Utc;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Creation-date window. Calendar comparisons are made in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateWindow {
    #[default]
    All,
    Today,
    /// The last seven days.
    Week,
    /// The current calendar month.
    Month,
}

impl DateWindow {
    pub fn contains(self, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(created) = created_at else {
            return self == DateWindow::All;
        };
        match self {
            DateWindow::All => true,
            DateWindow::Today => created.date_naive() == now.date_naive(),
            DateWindow::Week => created >= now - Duration::days(7),
            DateWindow::Month => created.year() == now.year() && created.month() == now.month(),
        }
    }
}

impl FromStr for DateWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DateWindow::All),
            "today" => Ok(DateWindow::Today),
            "week" => Ok(DateWindow::Week),
            "month" => Ok(DateWindow::Month),
            _ => Err(format!(
                "unknown date window `{s}` (expected all, today, week or month)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowFilter {
    pub search: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub since: DateWindow,
}

impl WorkflowFilter {
    /// Search matches the initiator, the id, and any officer's name or IC
    /// number, case-insensitively.
    pub fn matches(&self, record: &WorkflowRecord, now: DateTime<Utc>) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                record.initiator.to_lowercase().contains(&term)
                    || record.id.as_str().contains(&term)
                    || record.officers.iter().any(|officer| {
                        officer.name.to_lowercase().contains(&term)
                            || officer.ic_no.to_lowercase().contains(&term)
                    })
            }
        };
        let matches_status = self
            .status
            .is_none_or(|status| record.status() == Some(status));
        matches_search && matches_status && self.since.contains(record.created_at, now)
    }

    pub fn apply<'a>(
        &self,
        records: &'a [WorkflowRecord],
        now: DateTime<Utc>,
    ) -> Vec<&'a WorkflowRecord> {
        records
            .iter()
            .filter(|record| self.matches(record, now))
            .collect()
    }
}

/// The counters shown above the workflow list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    pub total: usize,
    pub closed: usize,
    pub in_progress: usize,
}

pub fn summarize(records: &[WorkflowRecord]) -> ListSummary {
    let count = |wanted| {
        records
            .iter()
            .filter(|record| record.status() == Some(wanted))
            .count()
    };
    ListSummary {
        total: records.len(),
        closed: count(WorkflowStatus::Closed),
        in_progress: count(WorkflowStatus::InProgress),
    }
}

pub fn status_counts(records: &[WorkflowRecord]) -> BTreeMap<WorkflowStatus, usize> {
    let mut counts = BTreeMap::new();
    for status in records.iter().filter_map(WorkflowRecord::status) {
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

/// Officers per deputation; blank deputations are grouped as `Unknown`.
pub fn deputation_counts(records: &[WorkflowRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for officer in records.iter().flat_map(|record| &record.officers) {
        let deputation = match officer.deputation.trim() {
            "" => "Unknown".to_string(),
            other => other.to_string(),
        };
        *counts.entry(deputation).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficerEntry<'a> {
    pub workflow_id: &'a WorkflowId,
    pub initiator: &'a str,
    pub officer: &'a Officer,
}

pub fn officer_rollup(records: &[WorkflowRecord]) -> Vec<OfficerEntry<'_>> {
    records
        .iter()
        .flat_map(|record| {
            record.officers.iter().map(move |officer| OfficerEntry {
                workflow_id: &record.id,
                initiator: &record.initiator,
                officer,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timeline;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn officer(name: &str, ic_no: &str, deputation: &str) -> Officer {
        Officer {
            name: name.into(),
            ic_no: ic_no.into(),
            deputation: deputation.into(),
            ..Officer::blank(1)
        }
    }

    fn record(id: &str, initiator: &str, days_ago: i64, timeline: Timeline) -> WorkflowRecord {
        WorkflowRecord {
            id: WorkflowId::new(id),
            initiator: initiator.into(),
            officers: Vec::new(),
            created_at: Some(now() - Duration::days(days_ago)),
            updated_at: None,
            timeline,
        }
    }

    fn sample() -> Vec<WorkflowRecord> {
        let started = Timeline {
            initiated_at: Some(now()),
            ..Timeline::default()
        };
        let moving = Timeline {
            forwarded_to_col_at: Some(now()),
            ..started.clone()
        };
        let closed = Timeline {
            received_by_library_at: Some(now()),
            handed_to_ms3_at: Some(now()),
            closed_at: Some(now()),
            ..moving.clone()
        };
        let mut first = record("101", "J. Tan", 0, started);
        first.officers = vec![officer("Lim Wei", "S1234567A", "HQ 3 Div")];
        let mut second = record("102", "R. Kumar", 3, moving);
        second.officers = vec![
            officer("Ong Bee", "T7654321Z", ""),
            officer("Lee Min", "S1111111B", "HQ 3 Div"),
        ];
        let third = record("203", "A. Lim", 40, closed);
        vec![first, second, third]
    }

    fn ids(records: Vec<&WorkflowRecord>) -> Vec<&str> {
        records.into_iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn search_covers_initiator_id_and_officers() {
        let records = sample();
        let search = |term: &str| WorkflowFilter {
            search: Some(term.into()),
            ..WorkflowFilter::default()
        };
        assert_eq!(ids(search("lim").apply(&records, now())), vec!["101", "203"]);
        assert_eq!(ids(search("t765").apply(&records, now())), vec!["102"]);
        assert_eq!(ids(search("20").apply(&records, now())), vec!["203"]);
        assert_eq!(ids(search("  ").apply(&records, now())).len(), 3);
    }

    #[test]
    fn status_and_date_filters_compose_with_search() {
        let records = sample();
        let filter = WorkflowFilter {
            search: Some("hq".into()),
            status: None,
            since: DateWindow::Week,
        };
        // "hq" only appears in deputations, which search does not cover.
        assert!(filter.apply(&records, now()).is_empty());

        let filter = WorkflowFilter {
            search: None,
            status: Some(WorkflowStatus::InProgress),
            since: DateWindow::Week,
        };
        assert_eq!(ids(filter.apply(&records, now())), vec!["102"]);

        let filter = WorkflowFilter {
            since: DateWindow::Today,
            ..WorkflowFilter::default()
        };
        assert_eq!(ids(filter.apply(&records, now())), vec!["101"]);

        let filter = WorkflowFilter {
            since: DateWindow::Month,
            ..WorkflowFilter::default()
        };
        assert_eq!(ids(filter.apply(&records, now())), vec!["101", "102"]);
    }

    #[test]
    fn missing_creation_date_only_matches_all() {
        let mut undated = sample().remove(0);
        undated.created_at = None;
        assert!(DateWindow::All.contains(undated.created_at, now()));
        assert!(!DateWindow::Month.contains(undated.created_at, now()));
    }

    #[test]
    fn rollups_count_statuses_and_deputations() {
        let records = sample();
        assert_eq!(
            summarize(&records),
            ListSummary {
                total: 3,
                closed: 1,
                in_progress: 1,
            }
        );
        assert_eq!(
            status_counts(&records),
            BTreeMap::from([
                (WorkflowStatus::Initiated, 1),
                (WorkflowStatus::InProgress, 1),
                (WorkflowStatus::Closed, 1),
            ])
        );
        assert_eq!(
            deputation_counts(&records),
            BTreeMap::from([("HQ 3 Div".to_string(), 2), ("Unknown".to_string(), 1)])
        );

        let officers = officer_rollup(&records);
        assert_eq!(officers.len(), 3);
        assert_eq!(officers[1].workflow_id.as_str(), "102");
        assert_eq!(officers[1].initiator, "R. Kumar");
    }
}
