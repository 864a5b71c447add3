//! Consensus statistics over revealed votes.
//!
//! Only non-observers who have voted count. Numeric tokens feed the
//! average/median/mode; "?" and any other non-numeric token still show up in
//! the tally and the per-value groups.

use crate::types::{Participant, UNKNOWN_VOTE};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consensus {
    /// Every counted vote, numeric or not
    pub total_votes: usize,
    pub numeric_votes: usize,
    /// Rounded to one decimal; None when there are no numeric votes
    pub average: Option<f64>,
    pub median: Option<f64>,
    /// All values sharing the highest frequency, ascending
    pub mode: Vec<f64>,
    pub groups: Vec<VoteGroup>,
}

/// Votes sharing the same token, for grouped display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteGroup {
    pub value: String,
    pub count: usize,
    pub voters: Vec<String>,
}

/// Parse a vote token as a finite number
pub fn numeric_value(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn calculate(participants: &[Participant]) -> Consensus {
    let ballots: Vec<(&str, &str)> = participants
        .iter()
        .filter(|p| p.role.is_voter() && p.has_voted)
        .filter_map(|p| p.vote.as_deref().map(|v| (p.name.as_str(), v)))
        .collect();

    let mut numbers: Vec<f64> = ballots
        .iter()
        .filter_map(|(_, vote)| numeric_value(vote))
        .collect();
    numbers.sort_by(|a, b| a.total_cmp(b));

    Consensus {
        total_votes: ballots.len(),
        numeric_votes: numbers.len(),
        average: average(&numbers),
        median: median(&numbers),
        mode: mode(&numbers),
        groups: group(&ballots),
    }
}

fn average(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

fn mode(sorted: &[f64]) -> Vec<f64> {
    let mut best = 0usize;
    let mut modes = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let value = sorted[i];
        let run = sorted[i..].iter().take_while(|v| **v == value).count();
        match run.cmp(&best) {
            Ordering::Greater => {
                best = run;
                modes = vec![value];
            }
            Ordering::Equal => modes.push(value),
            Ordering::Less => {}
        }
        i += run;
    }
    modes
}

fn group(ballots: &[(&str, &str)]) -> Vec<VoteGroup> {
    let mut groups: Vec<VoteGroup> = Vec::new();
    for (name, vote) in ballots {
        match groups.iter_mut().find(|g| g.value == *vote) {
            Some(g) => {
                g.count += 1;
                g.voters.push(name.to_string());
            }
            None => groups.push(VoteGroup {
                value: vote.to_string(),
                count: 1,
                voters: vec![name.to_string()],
            }),
        }
    }
    groups.sort_by(|a, b| display_order(&a.value, &b.value));
    groups
}

/// Numbers ascending, then other tokens alphabetically, "?" always last
fn display_order(a: &str, b: &str) -> Ordering {
    let rank = |v: &str| match (v == UNKNOWN_VOTE, numeric_value(v)) {
        (true, _) => 2,
        (false, Some(_)) => 0,
        (false, None) => 1,
    };
    rank(a).cmp(&rank(b)).then_with(|| {
        match (numeric_value(a), numeric_value(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        }
    })
}
