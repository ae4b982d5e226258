// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rule-based fraud scoring for transfers.
//!
//! Each triggered rule adds its penalty to the score. Any triggered `Block`
//! rule blocks the transfer outright; otherwise a score of
//! [`FLAG_THRESHOLD`] or more flags it but lets it through.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Score at which a transfer is flagged.
pub const FLAG_THRESHOLD: u32 = 70;

/// Score at which a transfer is recommended for manual review.
pub const REVIEW_THRESHOLD: u32 = 50;

/// Window the velocity rule counts sender transfers over.
pub const VELOCITY_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Flag,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Amount strictly above the threshold.
    AmountThreshold { threshold_cents: i64 },
    /// Amount an exact multiple of, and at least, the divisor.
    RoundAmount { divisor_cents: i64 },
    /// Sender already made `max_transfers` or more within [`VELOCITY_WINDOW`].
    Velocity { max_transfers: usize },
    /// Sender ID or originating IP address is on the configured blocklist.
    Blocklist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudRule {
    pub name: String,
    pub kind: RuleKind,
    pub score_penalty: u32,
    pub action: RuleAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedAction {
    Allow,
    Review,
    Flag,
    Block,
}

/// Inputs the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct FraudContext<'a> {
    pub from_user_id: &'a str,
    pub amount_cents: i64,
    /// Transfers the sender made within [`VELOCITY_WINDOW`].
    pub recent_transfers: usize,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudEvaluation {
    pub total_score: u32,
    pub triggered_rules: Vec<String>,
    /// Rule name → explanation.
    pub details: BTreeMap<String, String>,
    pub should_block: bool,
    pub should_flag: bool,
    pub recommended_action: RecommendedAction,
}

impl FraudEvaluation {
    /// Human-readable reason, `None` when nothing triggered.
    pub fn reason(&self) -> Option<String> {
        if self.details.is_empty() {
            return None;
        }
        Some(
            self.details
                .iter()
                .map(|(rule, detail)| format!("{rule}: {detail}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone)]
pub struct FraudEngine {
    rules: Vec<FraudRule>,
    blocklist: HashSet<String>,
}

impl Default for FraudEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FraudEngine {
    /// Engine with the standard rule set and the given sender blocklist.
    pub fn new(blocklist: impl IntoIterator<Item = String>) -> Self {
        Self::with_rules(default_rules(), blocklist)
    }

    pub fn with_rules(rules: Vec<FraudRule>, blocklist: impl IntoIterator<Item = String>) -> Self {
        let mut rules = rules;
        rules.sort_by(|a, b| b.score_penalty.cmp(&a.score_penalty));
        Self {
            rules,
            blocklist: blocklist.into_iter().collect(),
        }
    }

    pub fn rules(&self) -> &[FraudRule] {
        &self.rules
    }

    pub fn evaluate(&self, ctx: FraudContext<'_>) -> FraudEvaluation {
        let mut total_score = 0_u32;
        let mut should_block = false;
        let mut triggered_rules = Vec::new();
        let mut details = BTreeMap::new();

        for rule in &self.rules {
            let Some(detail) = self.check(rule, &ctx) else {
                continue;
            };

            tracing::info!(
                rule = %rule.name,
                score = rule.score_penalty,
                action = ?rule.action,
                from_user_id = %ctx.from_user_id,
                ip_address = ctx.ip_address.unwrap_or("-"),
                user_agent = ctx.user_agent.unwrap_or("-"),
                "Fraud rule triggered"
            );
            total_score = total_score.saturating_add(rule.score_penalty);
            should_block |= rule.action == RuleAction::Block;
            triggered_rules.push(rule.name.clone());
            details.insert(rule.name.clone(), detail);
        }

        let should_flag = total_score >= FLAG_THRESHOLD;
        let recommended_action = if should_block {
            RecommendedAction::Block
        } else if should_flag {
            RecommendedAction::Flag
        } else if total_score >= REVIEW_THRESHOLD {
            RecommendedAction::Review
        } else {
            RecommendedAction::Allow
        };

        FraudEvaluation {
            total_score,
            triggered_rules,
            details,
            should_block,
            should_flag,
            recommended_action,
        }
    }

    fn check(&self, rule: &FraudRule, ctx: &FraudContext<'_>) -> Option<String> {
        match rule.kind {
            RuleKind::AmountThreshold { threshold_cents } => (ctx.amount_cents > threshold_cents)
                .then(|| {
                    format!(
                        "Amount exceeds threshold: {} cents (threshold: {threshold_cents} cents)",
                        ctx.amount_cents
                    )
                }),
            RuleKind::RoundAmount { divisor_cents } => (divisor_cents > 0
                && ctx.amount_cents >= divisor_cents
                && ctx.amount_cents % divisor_cents == 0)
                .then(|| {
                    format!(
                        "Round amount detected: {} cents (divisible by {divisor_cents})",
                        ctx.amount_cents
                    )
                }),
            RuleKind::Velocity { max_transfers } => (ctx.recent_transfers >= max_transfers).then(|| {
                format!(
                    "Transaction frequency exceeded: {} transactions in {} minutes (max: {max_transfers})",
                    ctx.recent_transfers,
                    VELOCITY_WINDOW.as_secs() / 60
                )
            }),
            RuleKind::Blocklist => {
                if self.blocklist.contains(ctx.from_user_id) {
                    Some(format!("Sender {} is blocklisted", ctx.from_user_id))
                } else {
                    ctx.ip_address
                        .filter(|ip| self.blocklist.contains(*ip))
                        .map(|ip| format!("Origin IP {ip} is blocklisted"))
                }
            }
        }
    }
}

fn default_rules() -> Vec<FraudRule> {
    vec![
        FraudRule {
            name: "SENDER_BLOCKLIST".to_string(),
            kind: RuleKind::Blocklist,
            score_penalty: 100,
            action: RuleAction::Block,
        },
        FraudRule {
            name: "AMOUNT_THRESHOLD".to_string(),
            kind: RuleKind::AmountThreshold {
                threshold_cents: 50_000_000,
            },
            score_penalty: 50,
            action: RuleAction::Flag,
        },
        FraudRule {
            name: "VELOCITY".to_string(),
            kind: RuleKind::Velocity { max_transfers: 10 },
            score_penalty: 40,
            action: RuleAction::Flag,
        },
        FraudRule {
            name: "ROUND_AMOUNT".to_string(),
            kind: RuleKind::RoundAmount {
                divisor_cents: 1_000_000,
            },
            score_penalty: 20,
            action: RuleAction::Flag,
        },
    ]
}
