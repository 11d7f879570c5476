/// Fixed-period timer polled from a frame loop.
///
/// `due` fires at most once per call. When the caller falls behind by more than one
/// period the backlog is dropped instead of replayed in a burst.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period_ms: u64,
    next_due_ms: u64,
}

impl Cadence {
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due_ms: now_ms + period_ms,
        }
    }

    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        self.next_due_ms += self.period_ms;
        if self.next_due_ms <= now_ms {
            self.next_due_ms = now_ms + self.period_ms;
        }
        true
    }

    pub fn restart(&mut self, now_ms: u64) {
        self.next_due_ms = now_ms + self.period_ms;
    }
}

/// The three session timers: simulation tick, outbound sync, ghost sweep.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimers {
    pub tick: Cadence,
    pub sync: Cadence,
    pub sweep: Cadence,
}

impl SessionTimers {
    pub fn new(config: &crate::config::GameConfig, now_ms: u64) -> Self {
        Self {
            tick: Cadence::new(config.tick_ms, now_ms),
            sync: Cadence::new(config.sync_interval_ms, now_ms),
            sweep: Cadence::new(config.ghost_sweep_ms, now_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let mut c = Cadence::new(120, 0);
        assert!(!c.due(119));
        assert!(c.due(120));
        assert!(!c.due(200));
        assert!(c.due(240));
    }

    #[test]
    fn drops_backlog_after_stall() {
        let mut c = Cadence::new(100, 0);
        assert!(c.due(1_000));
        assert!(!c.due(1_050));
        assert!(c.due(1_100));
    }
}
