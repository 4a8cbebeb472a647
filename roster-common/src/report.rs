//! Report assembly
//!
//! Groups a [`ReconciliationResult`] into six titled sections in a fixed
//! order. Every section is always present, even when empty.

use crate::reconcile::{Observation, ReconciliationResult};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Rule printed under each section title
const SECTION_RULE: &str = ":::::::::::::::::::::::";

pub const NEW_MEMBERS: &str = "New Members";
pub const DEPARTED_MEMBERS: &str = "Departed Members";
pub const NAME_CHANGES: &str = "Name Changes";
pub const RANK_CHANGES: &str = "Rank Changes";
pub const PROMOTION_CANDIDATES: &str = "Promotion Candidates";
pub const MISSING_JOIN_DATES: &str = "Missing Join Dates";

/// One titled block of report lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub lines: Vec<String>,
}

impl Section {
    fn from_observations(title: &str, observations: &[Observation]) -> Self {
        Self {
            title: title.to_string(),
            lines: observations.iter().map(format_observation).collect(),
        }
    }
}

/// Presentation-ready reconciliation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub today: NaiveDate,
    pub sections: Vec<Section>,
}

impl Report {
    /// Build the six report sections from a reconciliation result
    pub fn assemble(result: &ReconciliationResult, today: NaiveDate) -> Self {
        let sections = vec![
            Section::from_observations(NEW_MEMBERS, &result.new_members),
            Section::from_observations(DEPARTED_MEMBERS, &result.departed_members),
            Section::from_observations(NAME_CHANGES, &result.name_changes),
            Section::from_observations(RANK_CHANGES, &result.rank_changes),
            Section::from_observations(PROMOTION_CANDIDATES, &result.promotion_candidates),
            Section::from_observations(MISSING_JOIN_DATES, &result.missing_join_dates),
        ];

        Self { today, sections }
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    /// `Today's date is M/D/YYYY.`
    pub fn date_banner(&self) -> String {
        format!(
            "Today's date is {}/{}/{}.",
            self.today.month(),
            self.today.day(),
            self.today.year()
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{}", section.title)?;
            writeln!(f, "{}", SECTION_RULE)?;
            for line in &section.lines {
                writeln!(f, "{}", line)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Render one observation as a report line
pub fn format_observation(observation: &Observation) -> String {
    match observation {
        Observation::NewMember { id, name } | Observation::DepartedMember { id, name } => {
            format!("{}\tID: {}", name, id)
        }
        Observation::NameChanged {
            old_name, new_name, ..
        } => format!("'{}' changed their name to '{}'.", old_name, new_name),
        Observation::RankChanged {
            name,
            old_rank,
            new_rank,
            ..
        } => format!(
            "{} has changed ranks from '{}' to '{}'.",
            name, old_rank, new_rank
        ),
        Observation::PromotionCandidate {
            name,
            rank,
            days_since_join,
            ..
        } => format!(
            "{} {} may need a promotion. ({} days since joined)",
            rank, name, days_since_join
        ),
        Observation::MissingJoinDate { name, .. } => name.clone(),
    }
}
