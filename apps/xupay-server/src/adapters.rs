// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Presentation Adapters
//!
//! Pure mappings from service responses to display-ready values: currency
//! formatting, derived wallet status, risk levels, labels and badge classes,
//! and flattened view structs. Every function is total; missing optional
//! data falls back to a neutral default.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use crate::models::cents_to_amount;

use crate::models::{
    KycStatus, KycTier, ProfileResponse, TransactionDetailResponse,
    TransactionStatus, TransactionType, TransferResponse, WalletBalanceResponse, WalletType,
};

// =============================================================================
// Amounts
// =============================================================================

/// Major units to cents, rounded half away from zero.
pub fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn group_digits(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(digit);
    }
    out
}

/// Format a minor-unit amount for display.
///
/// `USD` and `EUR` use their symbol, comma grouping and two decimals. `VND`
/// has no minor unit in display: rounded to whole dong, dot grouping and a
/// trailing `₫`. Other codes render as `CODE 1,234.56`.
pub fn format_currency(amount_cents: i64, currency: &str) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let cents = amount_cents.unsigned_abs();
    let major = group_digits(cents / 100, ',');
    let minor = cents % 100;

    match currency.to_ascii_uppercase().as_str() {
        "USD" => format!("{sign}${major}.{minor:02}"),
        "EUR" => format!("{sign}€{major}.{minor:02}"),
        "VND" => {
            let dong = cents / 100 + u64::from(minor >= 50);
            format!("{sign}{} ₫", group_digits(dong, '.'))
        }
        code => format!("{sign}{code} {major}.{minor:02}"),
    }
}

// =============================================================================
// Derived states
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Frozen,
    Inactive,
}

/// Frozen takes precedence over inactive.
pub fn derive_wallet_status(is_active: bool, is_frozen: bool) -> WalletStatus {
    if is_frozen {
        WalletStatus::Frozen
    } else if !is_active {
        WalletStatus::Inactive
    } else {
        WalletStatus::Active
    }
}

pub fn can_use_wallet(status: WalletStatus) -> bool {
    status == WalletStatus::Active
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

pub fn risk_level(fraud_score: u32) -> RiskLevel {
    match fraud_score {
        0..=24 => RiskLevel::Low,
        25..=49 => RiskLevel::Medium,
        50..=74 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

// =============================================================================
// Labels and badges
// =============================================================================

macro_rules! badge {
    ($tone:literal) => {
        concat!("rounded-full px-3 py-1 text-xs font-medium border ", $tone)
    };
}

const RED: &str = badge!("bg-red-500/10 text-red-700 border-red-200");
const ORANGE: &str = badge!("bg-orange-500/10 text-orange-700 border-orange-200");
const YELLOW: &str = badge!("bg-yellow-500/10 text-yellow-700 border-yellow-200");
const GREEN: &str = badge!("bg-green-500/10 text-green-700 border-green-200");
const BLUE: &str = badge!("bg-blue-500/10 text-blue-700 border-blue-200");
const GRAY: &str = badge!("bg-gray-500/10 text-gray-700 border-gray-200");

/// Human label and badge CSS classes for a displayable state.
pub trait Badge {
    fn label(&self) -> &'static str;

    fn badge_class(&self) -> &'static str {
        GRAY
    }
}

impl Badge for WalletStatus {
    fn label(&self) -> &'static str {
        match self {
            WalletStatus::Active => "Active",
            WalletStatus::Frozen => "Frozen",
            WalletStatus::Inactive => "Inactive",
        }
    }

    fn badge_class(&self) -> &'static str {
        match self {
            WalletStatus::Active => GREEN,
            WalletStatus::Frozen => YELLOW,
            WalletStatus::Inactive => GRAY,
        }
    }
}

impl Badge for WalletType {
    fn label(&self) -> &'static str {
        match self {
            WalletType::Personal => "Personal",
            WalletType::Merchant => "Business",
            WalletType::Escrow => "Escrow",
        }
    }
}

impl Badge for TransactionStatus {
    fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Processing => "Processing",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Reversed => "Reversed",
        }
    }

    fn badge_class(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => GRAY,
            TransactionStatus::Processing => BLUE,
            TransactionStatus::Completed => GREEN,
            TransactionStatus::Failed => RED,
            TransactionStatus::Reversed => ORANGE,
        }
    }
}

impl Badge for TransactionType {
    fn label(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "Transfer",
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Payment => "Payment",
            TransactionType::Refund => "Refund",
        }
    }
}

impl Badge for KycStatus {
    fn label(&self) -> &'static str {
        match self {
            KycStatus::Pending => "Pending review",
            KycStatus::Approved => "Verified",
            KycStatus::Rejected => "Rejected",
            KycStatus::Expired => "Expired",
        }
    }

    fn badge_class(&self) -> &'static str {
        match self {
            KycStatus::Pending => BLUE,
            KycStatus::Approved => GREEN,
            KycStatus::Rejected => RED,
            KycStatus::Expired => GRAY,
        }
    }
}

impl Badge for KycTier {
    fn label(&self) -> &'static str {
        match self {
            KycTier::Tier0 => "Tier 0 (Unverified)",
            KycTier::Tier1 => "Tier 1 (Basic)",
            KycTier::Tier2 => "Tier 2 (Verified)",
            KycTier::Tier3 => "Tier 3 (Premium)",
        }
    }
}

impl Badge for RiskLevel {
    fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Critical => "Critical Risk",
        }
    }

    fn badge_class(&self) -> &'static str {
        match self {
            RiskLevel::Low => GREEN,
            RiskLevel::Medium => YELLOW,
            RiskLevel::High => ORANGE,
            RiskLevel::Critical => RED,
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// Wallet attributes the balance endpoint does not return.
#[derive(Debug, Clone, Default)]
pub struct WalletMetadata {
    pub name: Option<String>,
    pub wallet_type: Option<WalletType>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_default: bool,
    pub transaction_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub wallet_type: WalletType,
    pub currency: String,
    pub balance: f64,
    pub balance_cents: i64,
    pub formatted_balance: String,
    pub status: WalletStatus,
    pub can_transact: bool,
    pub is_default: bool,
    pub transaction_count: u32,
    pub created_at: Option<DateTime<Utc>>,
}

impl WalletView {
    pub fn from_balance(balance: &WalletBalanceResponse, metadata: WalletMetadata) -> Self {
        let status = derive_wallet_status(balance.is_active, balance.is_frozen);
        Self {
            id: balance.wallet_id.clone(),
            user_id: balance.user_id.clone(),
            name: metadata
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Wallet".to_string()),
            wallet_type: metadata.wallet_type.unwrap_or_default(),
            currency: balance.currency.clone(),
            balance: cents_to_amount(balance.balance_cents),
            balance_cents: balance.balance_cents,
            formatted_balance: format_currency(balance.balance_cents, &balance.currency),
            status,
            can_transact: can_use_wallet(status),
            is_default: metadata.is_default,
            transaction_count: metadata.transaction_count,
            created_at: metadata.created_at,
        }
    }
}

impl From<&WalletBalanceResponse> for WalletView {
    fn from(balance: &WalletBalanceResponse) -> Self {
        Self::from_balance(balance, WalletMetadata::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub idempotency_key: Option<String>,
    pub from_user_id: String,
    pub to_user_id: String,
    pub from_wallet_id: String,
    pub to_wallet_id: String,
    pub amount: f64,
    pub amount_cents: i64,
    pub currency: String,
    pub formatted_amount: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub status_label: &'static str,
    pub description: String,
    pub is_flagged: bool,
    pub fraud_score: u32,
    pub fraud_reason: Option<String>,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransactionView {
    /// Amount signed from `viewer`'s perspective: negative when they sent it.
    pub fn signed_amount_cents(&self, viewer: &str) -> i64 {
        if self.from_user_id == viewer {
            -self.amount_cents
        } else {
            self.amount_cents
        }
    }
}

impl From<&TransferResponse> for TransactionView {
    fn from(tx: &TransferResponse) -> Self {
        Self {
            id: tx.transaction_id.clone(),
            idempotency_key: tx.idempotency_key.clone(),
            from_user_id: tx.from_user_id.clone(),
            to_user_id: tx.to_user_id.clone(),
            from_wallet_id: tx.from_wallet_id.clone(),
            to_wallet_id: tx.to_wallet_id.clone(),
            amount: cents_to_amount(tx.amount_cents),
            amount_cents: tx.amount_cents,
            currency: tx.currency.clone(),
            formatted_amount: format_currency(tx.amount_cents, &tx.currency),
            transaction_type: tx.transaction_type,
            status: tx.status,
            status_label: tx.status.label(),
            description: tx.description.clone().unwrap_or_default(),
            is_flagged: tx.is_flagged,
            fraud_score: tx.fraud_score,
            fraud_reason: None,
            risk_level: risk_level(tx.fraud_score),
            created_at: tx.created_at,
            completed_at: tx.completed_at,
        }
    }
}

impl From<&TransactionDetailResponse> for TransactionView {
    fn from(tx: &TransactionDetailResponse) -> Self {
        Self {
            id: tx.transaction_id.clone(),
            idempotency_key: None,
            from_user_id: tx.from_user_id.clone(),
            to_user_id: tx.to_user_id.clone(),
            from_wallet_id: tx.from_wallet_id.clone(),
            to_wallet_id: tx.to_wallet_id.clone(),
            amount: cents_to_amount(tx.amount_cents),
            amount_cents: tx.amount_cents,
            currency: tx.currency.clone(),
            formatted_amount: format_currency(tx.amount_cents, &tx.currency),
            transaction_type: tx.transaction_type,
            status: tx.status,
            status_label: tx.status.label(),
            description: tx.description.clone().unwrap_or_default(),
            is_flagged: tx.is_flagged,
            fraud_score: tx.fraud_score,
            fraud_reason: tx.fraud_reason.clone(),
            risk_level: risk_level(tx.fraud_score),
            created_at: tx.created_at,
            completed_at: tx.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub kyc_status: KycStatus,
    pub kyc_tier: KycTier,
    pub is_active: bool,
    pub is_suspended: bool,
    pub fraud_score: u32,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl From<&ProfileResponse> for UserView {
    fn from(profile: &ProfileResponse) -> Self {
        Self {
            id: profile.id.clone(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            full_name: format!("{} {}", profile.first_name, profile.last_name)
                .trim()
                .to_string(),
            phone: profile.phone.clone(),
            kyc_status: profile.kyc_status,
            kyc_tier: profile.kyc_tier,
            is_active: profile.is_active,
            is_suspended: profile.is_suspended,
            fraud_score: profile.fraud_score,
            risk_level: risk_level(profile.fraud_score),
            created_at: profile.created_at,
        }
    }
}
