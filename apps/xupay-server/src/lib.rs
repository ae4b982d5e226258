// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! XuPay - Payment Core
//!
//! Idempotent wallet-to-wallet transfers over an in-memory ledger, the user
//! and KYC surface around them, and the client layer that talks to either
//! the in-process store or a remote deployment.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum) and OpenAPI document
//! - `auth` - Session-backed HS256 bearer tokens
//! - `store` - In-memory users, wallets, transactions and idempotency index
//! - `services` - `UserService` / `PaymentService` traits with mock and HTTP clients
//! - `query` - Stale-time cache in front of the service clients
//! - `adapters` - Display formatting and view mappers

pub mod adapters;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
