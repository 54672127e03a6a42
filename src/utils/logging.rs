// src/utils/logging.rs - Logging helpers for index loads and linking runs
use log::{info, warn};
use std::time::{Duration, Instant};

use crate::models::EntityKind;

#[derive(Clone)]
pub struct LinkingLogger {
    kind_name: &'static str,
    kind_emoji: &'static str,
    start_time: Instant,
}

impl LinkingLogger {
    pub fn new(kind: EntityKind) -> Self {
        let (kind_name, kind_emoji) = match kind {
            EntityKind::Institution => ("INSTITUTION", "🏛️"),
            EntityKind::Investigator => ("INVESTIGATOR", "👤"),
            EntityKind::FundingSource => ("FUNDING_SOURCE", "💰"),
        };
        Self {
            kind_name,
            kind_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_index_loaded(&self, count: usize, elapsed: Duration) {
        if count == 0 {
            warn!(
                "[{}] {} ⚠️  Index is empty; every lookup will return 0",
                self.kind_name, self.kind_emoji
            );
        } else {
            info!(
                "[{}] {} 📊 Index ready with {} names [+{:.1}s]",
                self.kind_name,
                self.kind_emoji,
                count,
                elapsed.as_secs_f32()
            );
        }
    }

    pub fn log_match_stats(&self, stats: &KindStats) {
        let percent = if stats.attempted > 0 {
            (stats.matched as f64 / stats.attempted as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] {} 🎯 Matched {} of {} names ({:.1}%) [+{:.1}s]",
            self.kind_name,
            self.kind_emoji,
            stats.matched,
            stats.attempted,
            percent,
            self.start_time.elapsed().as_secs_f32()
        );
    }
}

/// Per-kind counters kept by the linker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KindStats {
    pub attempted: usize,
    pub matched: usize,
}

impl KindStats {
    pub fn record(&mut self, id: i64) {
        self.attempted += 1;
        if id != crate::models::NO_MATCH {
            self.matched += 1;
        }
    }
}
