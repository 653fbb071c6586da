// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota tracking with daily free-generation caps and a lifetime trial counter.
//!
//! The tracker keeps the process-wide [`UserStats`] value and enforces the
//! configured daily caps. Daily counters are valid only for the calendar day
//! recorded in the stats; every read first normalizes a stale record by
//! zeroing both daily counters and updating the reset date. Subscribed users
//! bypass the caps entirely.
//!
//! The gate happens strictly before a generation is attempted; increments
//! are unconditional bumps recorded only after success.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use varta_config::model::LimitsConfig;
use varta_core::types::UserStats;

/// Outcome of a quota gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The generation may proceed.
    Allowed,
    /// The daily cap is reached; the turn must terminate without a backend call.
    Exhausted,
}

/// Owns the process-wide quota state and applies the daily reset rule.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    stats: UserStats,
    daily_image_limit: u32,
    daily_video_limit: u32,
}

impl QuotaTracker {
    /// Creates a tracker from loaded stats, applying the load-time reset.
    pub fn new(limits: &LimitsConfig, stats: UserStats) -> Self {
        let stats = Self::check_and_maybe_reset(stats, Utc::now().date_naive());
        Self {
            stats,
            daily_image_limit: limits.daily_image_limit,
            daily_video_limit: limits.daily_video_limit,
        }
    }

    /// Pure reset transition: if the stored last-reset date differs from
    /// `today`, returns a copy with both daily counters zeroed and the date
    /// updated; otherwise returns the input unchanged.
    pub fn check_and_maybe_reset(stats: UserStats, today: NaiveDate) -> UserStats {
        if stats.last_reset_date == today {
            return stats;
        }
        debug!(
            previous = %stats.last_reset_date,
            today = %today,
            "daily quota counters reset"
        );
        UserStats {
            daily_video_count: 0,
            daily_image_count: 0,
            last_reset_date: today,
            ..stats
        }
    }

    /// Gate check for image generation. Normalizes stale counters first.
    pub fn check_image(&mut self) -> QuotaDecision {
        self.normalize();
        if self.stats.is_subscribed {
            return QuotaDecision::Allowed;
        }
        if self.stats.daily_image_count >= self.daily_image_limit {
            info!(
                count = self.stats.daily_image_count,
                limit = self.daily_image_limit,
                "daily image quota exhausted"
            );
            return QuotaDecision::Exhausted;
        }
        QuotaDecision::Allowed
    }

    /// Gate check for video generation. Normalizes stale counters first.
    pub fn check_video(&mut self) -> QuotaDecision {
        self.normalize();
        if self.stats.is_subscribed {
            return QuotaDecision::Allowed;
        }
        if self.stats.daily_video_count >= self.daily_video_limit {
            info!(
                count = self.stats.daily_video_count,
                limit = self.daily_video_limit,
                "daily video quota exhausted"
            );
            return QuotaDecision::Exhausted;
        }
        QuotaDecision::Allowed
    }

    /// Records a successful image generation. Returns the updated stats for
    /// persistence.
    pub fn record_image(&mut self) -> UserStats {
        self.normalize();
        self.stats.daily_image_count += 1;
        self.stats.clone()
    }

    /// Records a successful video generation, bumping both the daily counter
    /// and the lifetime trial counter. Returns the updated stats.
    pub fn record_video(&mut self) -> UserStats {
        self.normalize();
        self.stats.daily_video_count += 1;
        self.stats.video_trial_count += 1;
        self.stats.clone()
    }

    /// Flips the subscription flag. Returns the updated stats.
    pub fn set_subscribed(&mut self, subscribed: bool) -> UserStats {
        self.stats.is_subscribed = subscribed;
        self.stats.clone()
    }

    /// Current stats snapshot.
    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    /// Re-derives the reset against the current calendar day, so a process
    /// left open across midnight recovers its daily allowance.
    fn normalize(&mut self) {
        let today = Utc::now().date_naive();
        if self.stats.last_reset_date != today {
            self.stats = Self::check_and_maybe_reset(self.stats.clone(), today);
        }
    }
}
