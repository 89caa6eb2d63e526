use rand::seq::SliceRandom;
use rand::RngCore;

use crate::counting::{estimate_decks, CountingSystem, DeckEstimationRounding};
use crate::rank::{Rank, RANK_ORDER};

/// The multi-deck pile of cards dealt until the cut card, plus the running
/// count derived from each draw (spec.md §2 components 1 and 2 — kept as one
/// struct since every draw updates both together, mirroring the teacher's
/// `Shoe` owning its own `CardCount`).
#[derive(Debug, Clone)]
pub struct Shoe {
    decks: u8,
    penetration: f64,
    cards: Vec<Rank>,
    pointer: usize,
    cut_card: usize,
    running_count: i32,
}

impl Shoe {
    /// Builds and shuffles a fresh shoe of `decks` copies of the 13 ranks.
    pub fn new(decks: u8, penetration: f64, rng: &mut impl RngCore) -> Shoe {
        let mut cards = Vec::with_capacity(decks as usize * 52);
        for _ in 0..decks {
            for rank in RANK_ORDER {
                for _ in 0..4 {
                    cards.push(rank);
                }
            }
        }
        cards.shuffle(rng);
        let cut_card = (cards.len() as f64 * penetration) as usize;
        Shoe {
            decks,
            penetration,
            cards,
            pointer: 0,
            cut_card,
            running_count: 0,
        }
    }

    fn reshuffle(&mut self, rng: &mut impl RngCore) {
        self.cards.clear();
        for _ in 0..self.decks {
            for rank in RANK_ORDER {
                for _ in 0..4 {
                    self.cards.push(rank);
                }
            }
        }
        self.cards.shuffle(rng);
        self.cut_card = (self.cards.len() as f64 * self.penetration) as usize;
        self.pointer = 0;
        self.running_count = 0;
    }

    /// Draws one card, reshuffling first if the cut card has been reached.
    pub fn draw(&mut self, counting: &CountingSystem, rng: &mut impl RngCore) -> Rank {
        if self.pointer >= self.cut_card {
            self.reshuffle(rng);
        }
        let rank = self.cards[self.pointer];
        self.pointer += 1;
        self.running_count += counting.tag(rank);
        rank
    }

    pub fn reached_cut_card(&self) -> bool {
        self.pointer >= self.cut_card
    }

    pub fn running_count(&self) -> i32 {
        self.running_count
    }

    pub fn remaining_cards(&self) -> u32 {
        (self.cards.len() - self.pointer) as u32
    }

    fn remaining_decks_raw(&self) -> f64 {
        (self.remaining_cards() as f64 / 52.0).max(0.25)
    }

    pub fn true_count_raw(&self) -> f64 {
        self.running_count as f64 / self.remaining_decks_raw()
    }

    pub fn true_count_estimated(&self, step: f64, rounding: DeckEstimationRounding) -> f64 {
        let est_decks = estimate_decks(self.remaining_cards(), step, rounding);
        self.running_count as f64 / est_decks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn count_ranks(shoe: &Shoe) -> [u8; 13] {
        let mut counts = [0u8; 13];
        for &rank in &shoe.cards {
            counts[RANK_ORDER.iter().position(|&r| r == rank).unwrap()] += 1;
        }
        counts
    }

    #[test]
    fn new_shoe_has_four_of_each_rank_per_deck() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let shoe = Shoe::new(3, 0.75, &mut rng);
        assert_eq!(shoe.cards.len(), 3 * 52);
        for count in count_ranks(&shoe) {
            assert_eq!(count, 12);
        }
        assert_eq!(shoe.running_count(), 0);
    }

    #[test]
    fn running_count_tracks_sum_of_tags() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut shoe = Shoe::new(1, 0.99, &mut rng);
        let counting = CountingSystem::default();
        let mut expected = 0;
        for _ in 0..20 {
            let rank = shoe.draw(&counting, &mut rng);
            expected += counting.tag(rank);
            assert_eq!(shoe.running_count(), expected);
        }
    }

    #[test]
    fn reaching_cut_card_reshuffles_before_the_next_draw() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let mut shoe = Shoe::new(1, 0.1, &mut rng);
        let counting = CountingSystem::default();
        for _ in 0..6 {
            shoe.draw(&counting, &mut rng);
        }
        assert!(shoe.pointer <= 52);
        assert_eq!(shoe.cards.len(), 52);
    }
}
