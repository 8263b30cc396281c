use super::*;

impl GameEngine {
    pub(super) fn add_score(&mut self, points: i32) {
        self.score += points;
        if !self.extra_life_awarded && self.score >= EXTRA_LIFE_SCORE {
            self.extra_life_awarded = true;
            self.lives += 1;
            self.events.push(RuntimeEvent::ExtraLife { lives: self.lives });
        }
    }

    pub(super) fn eat_pellet_under_player(&mut self) {
        let tile = self.player.tile;
        let Some(kind) = self.food.eat(tile) else {
            return;
        };
        let points = kind.value() * PELLET_SCORE_MULTIPLIER;
        self.stats.pellets += 1;
        self.events.push(RuntimeEvent::PelletEaten {
            x: tile.x,
            y: tile.y,
            kind,
            points,
        });
        self.add_score(points);
        self.count_pen_pellet();
        self.maybe_spawn_fruit();
        if kind == PelletKind::Energizer {
            self.trigger_fright();
        }
    }

    /// Same-tile and tile-swap contacts between the player and roaming
    /// ghosts. Returns true when the player was caught.
    pub(super) fn resolve_ghost_collisions(
        &mut self,
        player_before: Tile,
        ghosts_before: &[Tile],
    ) -> bool {
        let player_now = self.player.tile;
        let mut ate_ghost = false;
        for idx in 0..self.ghosts.len() {
            let ghost = &self.ghosts[idx];
            if ghost.mode == GhostMode::Eyes
                || matches!(ghost.place, GhostPlace::InPen | GhostPlace::EnteringPen)
            {
                continue;
            }
            let overlap = ghost.agent.tile == player_now;
            let swapped = ghosts_before
                .get(idx)
                .is_some_and(|before| *before == player_now && ghost.agent.tile == player_before);
            if !overlap && !swapped {
                continue;
            }

            if ghost.mode.is_frightened() {
                self.eat_ghost(idx);
                ate_ghost = true;
            } else {
                self.lose_life();
                return true;
            }
        }
        if ate_ghost {
            self.lock(GHOST_EATEN_LOCK_MS, Continuation::Resume);
        }
        false
    }

    fn eat_ghost(&mut self, idx: usize) {
        self.kill_chain += 1;
        let bonus = ghost_bonus(self.kill_chain);
        let ghost = &mut self.ghosts[idx];
        ghost.mode = GhostMode::Eyes;
        ghost.frightened = false;
        let role = ghost.role;
        self.stats.ghosts += 1;
        self.events.push(RuntimeEvent::GhostEaten { role, bonus });
        self.add_score(bonus);
    }

    pub(super) fn lose_life(&mut self) {
        self.lives -= 1;
        self.stats.lives_lost += 1;
        self.events.push(RuntimeEvent::LifeLost { lives: self.lives });
        if self.lives < 0 {
            self.finish_game();
            return;
        }
        self.lock(DEATH_LOCK_MS, Continuation::ResetLife);
    }

    pub(super) fn finish_game(&mut self) {
        self.ended = true;
        self.lock = None;
        self.events.push(RuntimeEvent::GameOver {
            final_score: self.score,
        });
    }

    pub(super) fn check_level_complete(&mut self) {
        if self.food.remaining() > 0 || self.level_cleared {
            return;
        }
        self.level_cleared = true;
        self.events.push(RuntimeEvent::LevelComplete { level: self.level });
        self.lock(LEVEL_COMPLETE_LOCK_MS, Continuation::NextLevel);
    }
}
