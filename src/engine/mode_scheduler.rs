use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ScheduleChange {
    Switched(GhostMode),
    FrightEnded,
}

/// Scatter/chase timeline plus the fright override that pauses it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ModeScheduler {
    index: usize,
    phase_elapsed_ms: u64,
    fright_remaining_ms: u64,
    blink_window_ms: u64,
}

impl ModeScheduler {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn scheduled_mode(&self) -> GhostMode {
        if self.index % 2 == 0 {
            GhostMode::Scatter
        } else {
            GhostMode::Chase
        }
    }

    pub(super) fn fright_active(&self) -> bool {
        self.fright_remaining_ms > 0
    }

    #[cfg(test)]
    pub(super) fn fright_remaining_ms(&self) -> u64 {
        self.fright_remaining_ms
    }

    /// Blue, or alternating white/blue inside the closing blink window.
    pub(super) fn fright_mode(&self) -> Option<GhostMode> {
        if !self.fright_active() {
            return None;
        }
        if self.fright_remaining_ms > self.blink_window_ms {
            return Some(GhostMode::Blue);
        }
        let into_window = self.blink_window_ms - self.fright_remaining_ms;
        if (into_window / FRIGHT_BLINK_INTERVAL_MS) % 2 == 0 {
            Some(GhostMode::White)
        } else {
            Some(GhostMode::Blue)
        }
    }

    pub(super) fn global_mode(&self) -> GhostMode {
        self.fright_mode().unwrap_or_else(|| self.scheduled_mode())
    }

    /// Restarts the countdown from full; a second energizer does not stack.
    pub(super) fn start_fright(&mut self, level: &LevelData) {
        self.fright_remaining_ms = level.fright_ms;
        self.blink_window_ms =
            (level.fright_blinks as u64 * 2 * FRIGHT_BLINK_INTERVAL_MS).min(level.fright_ms);
    }

    pub(super) fn tick(&mut self, dt_ms: u64, level: &LevelData) -> Vec<ScheduleChange> {
        let mut changes = Vec::new();
        if self.fright_active() {
            self.fright_remaining_ms = self.fright_remaining_ms.saturating_sub(dt_ms);
            if self.fright_remaining_ms == 0 {
                self.blink_window_ms = 0;
                changes.push(ScheduleChange::FrightEnded);
            }
            return changes;
        }

        let schedule = &level.scatter_chase_ms;
        if self.index >= schedule.len() {
            return changes;
        }
        self.phase_elapsed_ms = self.phase_elapsed_ms.saturating_add(dt_ms);
        while self.index < schedule.len() && self.phase_elapsed_ms >= schedule[self.index] {
            self.phase_elapsed_ms -= schedule[self.index];
            self.index += 1;
            changes.push(ScheduleChange::Switched(self.scheduled_mode()));
        }
        if self.index >= schedule.len() {
            self.phase_elapsed_ms = 0;
        }
        changes
    }
}

impl GameEngine {
    pub(super) fn update_scheduler(&mut self, dt_ms: u64) {
        let level = self.level_data().clone();
        for change in self.scheduler.tick(dt_ms, &level) {
            match change {
                ScheduleChange::Switched(mode) => {
                    self.reverse_ghosts();
                    self.events.push(RuntimeEvent::ModeSwitched { mode });
                }
                ScheduleChange::FrightEnded => {
                    for ghost in &mut self.ghosts {
                        ghost.frightened = false;
                    }
                    self.events.push(RuntimeEvent::FrightEnded);
                }
            }
        }
    }

    /// Pushes the global mode onto every ghost that is not travelling as eyes.
    pub(super) fn propagate_modes(&mut self) {
        let scheduled = self.scheduler.scheduled_mode();
        let fright = self.scheduler.fright_mode();
        for ghost in &mut self.ghosts {
            if ghost.mode == GhostMode::Eyes {
                continue;
            }
            ghost.mode = match fright {
                Some(mode) if ghost.frightened => mode,
                _ => scheduled,
            };
        }
    }

    pub(super) fn trigger_fright(&mut self) {
        let level = self.level_data().clone();
        self.reverse_ghosts();
        if level.fright_ms == 0 {
            return;
        }
        self.scheduler.start_fright(&level);
        self.kill_chain = 0;
        for ghost in &mut self.ghosts {
            if ghost.mode != GhostMode::Eyes {
                ghost.frightened = true;
            }
        }
        self.propagate_modes();
        self.events.push(RuntimeEvent::FrightStarted {
            duration_ms: level.fright_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_one() -> LevelData {
        LevelTable::classic().row(1).clone()
    }

    #[test]
    fn schedule_alternates_and_freezes_on_chase() {
        let level = level_one();
        let mut scheduler = ModeScheduler::new();
        assert_eq!(scheduler.scheduled_mode(), GhostMode::Scatter);

        let changes = scheduler.tick(7_000, &level);
        assert_eq!(changes, vec![ScheduleChange::Switched(GhostMode::Chase)]);

        let total: u64 = level.scatter_chase_ms.iter().sum();
        scheduler.tick(total, &level);
        assert_eq!(scheduler.scheduled_mode(), GhostMode::Chase);
        assert!(scheduler.tick(1_000_000, &level).is_empty());
        assert_eq!(scheduler.scheduled_mode(), GhostMode::Chase);
    }

    #[test]
    fn fright_pauses_the_schedule() {
        let level = level_one();
        let mut scheduler = ModeScheduler::new();
        scheduler.tick(6_000, &level);
        scheduler.start_fright(&level);
        assert!(scheduler.tick(5_000, &level).is_empty());
        assert_eq!(scheduler.scheduled_mode(), GhostMode::Scatter);
        assert_eq!(scheduler.tick(1_000, &level), vec![ScheduleChange::FrightEnded]);
        assert_eq!(
            scheduler.tick(1_000, &level),
            vec![ScheduleChange::Switched(GhostMode::Chase)]
        );
    }

    #[test]
    fn blink_window_alternates_white_and_blue() {
        let level = level_one();
        let mut scheduler = ModeScheduler::new();
        scheduler.start_fright(&level);
        assert_eq!(scheduler.fright_mode(), Some(GhostMode::Blue));

        let window = level.fright_blinks as u64 * 2 * FRIGHT_BLINK_INTERVAL_MS;
        scheduler.tick(level.fright_ms - window, &level);
        assert_eq!(scheduler.fright_mode(), Some(GhostMode::White));
        scheduler.tick(FRIGHT_BLINK_INTERVAL_MS, &level);
        assert_eq!(scheduler.fright_mode(), Some(GhostMode::Blue));
        scheduler.tick(FRIGHT_BLINK_INTERVAL_MS, &level);
        assert_eq!(scheduler.fright_mode(), Some(GhostMode::White));
    }

    #[test]
    fn second_energizer_restarts_countdown_from_full() {
        let level = level_one();
        let mut scheduler = ModeScheduler::new();
        scheduler.start_fright(&level);
        scheduler.tick(4_000, &level);
        assert_eq!(scheduler.fright_remaining_ms(), 2_000);
        scheduler.start_fright(&level);
        assert_eq!(scheduler.fright_remaining_ms(), level.fright_ms);
    }

    #[test]
    fn zero_fright_level_never_enters_fright() {
        let level = LevelTable::classic().row(21).clone();
        let mut scheduler = ModeScheduler::new();
        scheduler.start_fright(&level);
        assert!(!scheduler.fright_active());
        assert_eq!(scheduler.global_mode(), GhostMode::Scatter);
    }
}
