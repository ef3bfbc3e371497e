use std::collections::{HashMap, VecDeque};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const DICE: &str = "dice";
pub const CROPS: &str = "crops";
pub const MARKET: &str = "market";
pub const STORY: &str = "story";
pub const MINIGAME: &str = "minigame";
pub const BOT: &str = "bot";

/// Per-game randomness: a seeded master generator handing out one derived
/// stream per subsystem, so draws in one subsystem never shift another's.
#[derive(Debug)]
pub struct RngManager {
    seed: u64,
    master: ChaCha8Rng,
    streams: HashMap<&'static str, ChaCha8Rng>,
    forced_dice: VecDeque<u8>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
            forced_dice: VecDeque::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&mut self, name: &'static str) -> SystemRng<'_> {
        let master = &mut self.master;
        let entry = self.streams.entry(name).or_insert_with(|| {
            let mut seed_bytes = [0u8; 8];
            master.fill_bytes(&mut seed_bytes);
            ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed_bytes))
        });
        SystemRng { inner: entry }
    }

    /// Queues die faces returned ahead of random draws.
    pub fn force_dice(&mut self, faces: impl IntoIterator<Item = u8>) {
        self.forced_dice
            .extend(faces.into_iter().map(|face| face.clamp(1, 6)));
    }

    pub fn roll_die(&mut self) -> u8 {
        match self.forced_dice.pop_front() {
            Some(face) => face,
            None => self.stream(DICE).gen_range(1..=6),
        }
    }
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
