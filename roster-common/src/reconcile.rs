//! Roster reconciliation engine
//!
//! Walks the Lodestone (remote) snapshot against the spreadsheet snapshot
//! and classifies every difference an officer should act on.
//!
//! **Authority split:**
//! - Remote snapshot: membership, current name, current rank
//! - Spreadsheet snapshot: join-date bookkeeping
//!
//! **Per remote member, in remote order:**
//! 1. Not in the spreadsheet: `NewMember`, nothing else is checked
//! 2. Otherwise: `NameChanged` and/or `RankChanged`, then exactly one of
//!    `MissingJoinDate` (unknown date) or a promotion check against the
//!    *remote* rank
//!
//! Spreadsheet members never matched are `DepartedMember`, in spreadsheet
//! order. Neither input snapshot is modified; the departed set is computed
//! as the spreadsheet ids minus the matched ids.

use crate::config::ReconcileConfig;
use crate::model::{JoinDate, MemberId};
use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// One discrepancy between the two rosters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// On the Lodestone, not in the spreadsheet
    NewMember { id: MemberId, name: String },

    /// In the spreadsheet, no longer on the Lodestone
    DepartedMember { id: MemberId, name: String },

    NameChanged {
        id: MemberId,
        old_name: String,
        new_name: String,
    },

    /// `name` is the spreadsheet (pre-change) name
    RankChanged {
        id: MemberId,
        name: String,
        old_rank: String,
        new_rank: String,
    },

    /// `name` is the current Lodestone name
    MissingJoinDate { id: MemberId, name: String },

    /// Entry-level member past the promotion threshold
    PromotionCandidate {
        id: MemberId,
        name: String,
        rank: String,
        days_since_join: i64,
    },
}

impl Observation {
    pub fn id(&self) -> MemberId {
        match self {
            Observation::NewMember { id, .. }
            | Observation::DepartedMember { id, .. }
            | Observation::NameChanged { id, .. }
            | Observation::RankChanged { id, .. }
            | Observation::MissingJoinDate { id, .. }
            | Observation::PromotionCandidate { id, .. } => *id,
        }
    }
}

/// Output of one reconciliation pass
///
/// Each list keeps the iteration order of the snapshot that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub new_members: Vec<Observation>,
    pub departed_members: Vec<Observation>,
    pub name_changes: Vec<Observation>,
    pub rank_changes: Vec<Observation>,
    pub missing_join_dates: Vec<Observation>,
    pub promotion_candidates: Vec<Observation>,

    /// Spreadsheet members with no Lodestone counterpart
    pub unmatched: Snapshot,
}

impl ReconciliationResult {
    /// File an observation under its category
    fn push(&mut self, observation: Observation) {
        let list = match observation {
            Observation::NewMember { .. } => &mut self.new_members,
            Observation::DepartedMember { .. } => &mut self.departed_members,
            Observation::NameChanged { .. } => &mut self.name_changes,
            Observation::RankChanged { .. } => &mut self.rank_changes,
            Observation::MissingJoinDate { .. } => &mut self.missing_join_dates,
            Observation::PromotionCandidate { .. } => &mut self.promotion_candidates,
        };
        list.push(observation);
    }

    /// Total number of observations across all categories
    pub fn len(&self) -> usize {
        self.new_members.len()
            + self.departed_members.len()
            + self.name_changes.len()
            + self.rank_changes.len()
            + self.missing_join_dates.len()
            + self.promotion_candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All observations, category by category
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.new_members
            .iter()
            .chain(&self.departed_members)
            .chain(&self.name_changes)
            .chain(&self.rank_changes)
            .chain(&self.missing_join_dates)
            .chain(&self.promotion_candidates)
    }
}

/// Whole days from `joined` to `today`, negative if `joined` is in the future
pub fn days_since(joined: NaiveDate, today: NaiveDate) -> i64 {
    (today - joined).num_days()
}

/// Reconcile the Lodestone roster against the spreadsheet roster
///
/// `today` should already be a calendar date (time of day discarded).
pub fn reconcile(
    remote: &Snapshot,
    sheet: &Snapshot,
    today: NaiveDate,
    config: &ReconcileConfig,
) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();
    let mut matched: HashSet<MemberId> = HashSet::with_capacity(remote.len());

    for member in remote {
        let Some(local) = sheet.get(member.id) else {
            result.push(Observation::NewMember {
                id: member.id,
                name: member.name.clone(),
            });
            continue;
        };

        if local.name != member.name {
            result.push(Observation::NameChanged {
                id: member.id,
                old_name: local.name.clone(),
                new_name: member.name.clone(),
            });
        }

        if local.rank != member.rank {
            result.push(Observation::RankChanged {
                id: member.id,
                name: local.name.clone(),
                old_rank: local.rank.clone(),
                new_rank: member.rank.clone(),
            });
        }

        match local.join_date {
            JoinDate::Unknown => {
                result.push(Observation::MissingJoinDate {
                    id: member.id,
                    name: member.name.clone(),
                });
            }
            JoinDate::Known(joined) if member.rank == config.entry_level_rank => {
                let days = days_since(joined, today);
                if days >= config.promotion_threshold_days {
                    result.push(Observation::PromotionCandidate {
                        id: member.id,
                        name: member.name.clone(),
                        rank: member.rank.clone(),
                        days_since_join: days,
                    });
                }
            }
            JoinDate::Known(_) => {}
        }

        matched.insert(member.id);
    }

    for local in sheet {
        if !matched.contains(&local.id) {
            result.push(Observation::DepartedMember {
                id: local.id,
                name: local.name.clone(),
            });
            result.unmatched.insert(local.clone());
        }
    }

    info!(
        new = result.new_members.len(),
        departed = result.departed_members.len(),
        renamed = result.name_changes.len(),
        rank_changed = result.rank_changes.len(),
        missing_dates = result.missing_join_dates.len(),
        promotion_candidates = result.promotion_candidates.len(),
        "Reconciliation complete"
    );

    result
}
