use super::*;

const RELEASE_ORDER: [GhostRole; 3] = [GhostRole::Speedy, GhostRole::Bashful, GhostRole::Pokey];

/// Dot counters and the forced-release timer that let caged ghosts out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct PenRelease {
    pub(super) global: bool,
    pub(super) global_counter: u32,
    pub(super) personal: [u32; 4],
    pub(super) force_timer_ms: u64,
}

impl PenRelease {
    /// Personal counters from zero, as at the start of a level.
    pub(super) fn personal() -> Self {
        Self::default()
    }

    /// After a life is lost the shared counter takes over.
    pub(super) fn switch_to_global(&mut self) {
        self.global = true;
        self.global_counter = 0;
        self.force_timer_ms = 0;
    }
}

fn global_limit(role: GhostRole) -> u32 {
    match role {
        GhostRole::Shadow => 0,
        GhostRole::Speedy => GLOBAL_PEN_LIMITS[0],
        GhostRole::Bashful => GLOBAL_PEN_LIMITS[1],
        GhostRole::Pokey => GLOBAL_PEN_LIMITS[2],
    }
}

impl GameEngine {
    fn front_caged_ghost(&self) -> Option<usize> {
        RELEASE_ORDER.iter().find_map(|role| {
            self.ghosts
                .iter()
                .position(|ghost| ghost.role == *role && ghost.place == GhostPlace::InPen)
        })
    }

    pub(super) fn count_pen_pellet(&mut self) {
        self.pen.force_timer_ms = 0;
        if self.pen.global {
            self.pen.global_counter += 1;
            return;
        }
        if let Some(idx) = self.front_caged_ghost() {
            let role = self.ghosts[idx].role;
            self.pen.personal[role.index()] += 1;
        }
    }

    pub(super) fn update_pen(&mut self, dt_ms: u64) {
        let level = self.level_data().clone();
        match self.front_caged_ghost() {
            Some(idx) => {
                let role = self.ghosts[idx].role;
                let due = if self.pen.global {
                    self.pen.global_counter >= global_limit(role)
                } else {
                    self.pen.personal[role.index()] >= level.pen_dot_limit(role)
                };
                if due {
                    self.release_ghost(idx);
                } else {
                    self.pen.force_timer_ms = self.pen.force_timer_ms.saturating_add(dt_ms);
                    if self.pen.force_timer_ms >= level.pen_force_ms {
                        self.pen.force_timer_ms = 0;
                        self.release_ghost(idx);
                    }
                }
            }
            None => self.pen.force_timer_ms = 0,
        }

        if self.pen.global && self.pen.global_counter >= GLOBAL_PEN_LIMITS[2] {
            self.pen.global = false;
        }
    }

    pub(super) fn release_ghost(&mut self, idx: usize) {
        let pen = *self.maze.pen();
        let ghost = &mut self.ghosts[idx];
        if ghost.place != GhostPlace::InPen {
            return;
        }
        ghost.place = GhostPlace::LeavingPen;
        ghost.path = exit_path(ghost.agent.x, ghost.agent.y, &pen);
        let role = ghost.role;
        self.events.push(RuntimeEvent::GhostReleased { role });
    }
}
