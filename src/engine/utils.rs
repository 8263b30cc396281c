use crate::constants::{GHOST_BONUS_BASE, MAX_SUBSTEP_MS};

/// Splits a frame delta into slices no longer than `MAX_SUBSTEP_MS`.
pub(super) fn substeps(dt_ms: u64) -> impl Iterator<Item = u64> {
    let full = (dt_ms / MAX_SUBSTEP_MS) as usize;
    let rest = dt_ms % MAX_SUBSTEP_MS;
    std::iter::repeat_n(MAX_SUBSTEP_MS, full).chain((rest > 0).then_some(rest))
}

/// Bonus for the `kills`-th ghost eaten in one fright window.
pub(super) fn ghost_bonus(kills: u32) -> i32 {
    GHOST_BONUS_BASE << kills.min(16)
}

pub(super) fn elroy_level_for(remaining: u32, dots: [u32; 2]) -> u8 {
    if remaining <= dots[1] {
        2
    } else if remaining <= dots[0] {
        1
    } else {
        0
    }
}
