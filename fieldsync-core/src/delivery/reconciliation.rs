// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Item reconciliation.
//!
//! A delivery cannot finalize with unexplained quantity mismatches:
//! every item either matches its expected quantity or carries an
//! explicit discrepancy reason.

use serde::{Deserialize, Serialize};

/// One reconciled line of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub item_id: String,
    pub expected_qty: u32,
    pub delivered_qty: u32,
    /// Required whenever delivered and expected quantities differ.
    pub discrepancy_reason: Option<String>,
}

impl ReconciliationItem {
    /// True when the line needs no explanation or has one.
    pub fn is_reconciled(&self) -> bool {
        self.delivered_qty == self.expected_qty || self.discrepancy_reason.is_some()
    }
}

/// Returns the ids of items with an unexplained quantity mismatch.
pub fn unexplained_discrepancies(items: &[ReconciliationItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| !item.is_reconciled())
        .map(|item| item.item_id.clone())
        .collect()
}
