use serde::{Deserialize, Serialize};

/// Mulberry32 generator. The whole state is one `u32`, so it serializes
/// with the engine and a restored game keeps drawing the same sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f64 / 4_294_967_296.0) as f32
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_u32() as u64 * len as u64 >> 32) as usize
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.pick_index(items.len());
        items.get(idx).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn pick_index_stays_in_range_and_covers_all_slots() {
        let mut rng = Rng::new(7);
        let mut seen = [false; 3];
        for _ in 0..500 {
            let idx = rng.pick_index(3);
            assert!(idx < 3);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
        assert_eq!(rng.pick_index(1), 0);
        assert_eq!(rng.pick_index(0), 0);
    }

    #[test]
    fn pick_on_empty_slice_is_none() {
        let mut rng = Rng::new(1);
        let empty: [u8; 0] = [];
        assert_eq!(rng.pick(&empty), None);
        assert_eq!(rng.pick(&[9u8]), Some(9));
    }

    #[test]
    fn next_f32_is_unit_interval() {
        let mut rng = Rng::new(123);
        for _ in 0..1_000 {
            let value = rng.next_f32();
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
