//! Skirmish: a four-seat simultaneous-move grid game for the planner
//!
//! Four agents start in the corners of a 7x7 arena whose (odd, odd) cells
//! are rigid walls. Every turn all seats pick one of six actions at the same
//! time; moves are resolved together, then every striking agent eliminates
//! the agents orthogonally adjacent to it. The last agent standing wins.
//!
//! The environment is fully deterministic, including the collaborator
//! policy that drives the non-training seats, which is what the planner
//! needs to rewind and replay it.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::Environment;
//! use games_skirmish::Skirmish;
//!
//! let mut env = Skirmish::new(0, 42);
//! let start = env.serialize_state();
//! let obs = env.reset(&start).unwrap();
//! let mut actions = env.act(&obs).unwrap();
//! actions.insert(0, 0); // training seat stands still
//! let step = env.step(&actions).unwrap();
//! assert!(!step.done);
//! ```

use engine_core::{
    ffa_rewards, register_env, Action, EnvError, EnvMetadata, Environment, StateKey, StepResult,
    NUM_AGENTS,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Arena side length in cells
pub const BOARD_SIZE: u8 = 7;

/// Default episode length limit
pub const DEFAULT_MAX_STEPS: u16 = 100;

/// Number of distinct actions per seat
pub const NUM_ACTIONS: usize = 6;

const ACTION_NAMES: [&str; NUM_ACTIONS] = ["Stop", "Up", "Down", "Left", "Right", "Strike"];

/// Serialized state length: step (2) + max steps (2) + alive mask (1) + positions (8)
const STATE_LEN: usize = 13;

/// Register Skirmish with the global environment registry
///
/// Call this once at startup to make it available via
/// `engine_core::create_env("skirmish", seat, seed)`.
pub fn register_skirmish() {
    register_env("skirmish".to_string(), skirmish_factory);
}

fn skirmish_factory(training_agent: usize, seed: u64) -> Box<dyn Environment> {
    Box::new(Skirmish::new(training_agent, seed))
}

/// Skirmish actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Stop = 0,
    Up = 1,
    Down = 2,
    Left = 3,
    Right = 4,
    Strike = 5,
}

impl Move {
    pub fn from_action(action: Action) -> Option<Self> {
        match action {
            0 => Some(Move::Stop),
            1 => Some(Move::Up),
            2 => Some(Move::Down),
            3 => Some(Move::Left),
            4 => Some(Move::Right),
            5 => Some(Move::Strike),
            _ => None,
        }
    }

    pub fn action(self) -> Action {
        self as Action
    }

    /// Cell offset for movement actions
    fn delta(self) -> Option<(i8, i8)> {
        match self {
            Move::Up => Some((0, -1)),
            Move::Down => Some((0, 1)),
            Move::Left => Some((-1, 0)),
            Move::Right => Some((1, 0)),
            Move::Stop | Move::Strike => None,
        }
    }
}

/// A cell on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub x: u8,
    pub y: u8,
}

impl Pos {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Pos) -> u32 {
        (self.x.abs_diff(other.x) + self.y.abs_diff(other.y)) as u32
    }

    /// Neighbouring open cell in the given direction, if any
    fn offset(self, (dx, dy): (i8, i8)) -> Option<Pos> {
        let x = self.x as i8 + dx;
        let y = self.y as i8 + dy;
        if x < 0 || y < 0 || x >= BOARD_SIZE as i8 || y >= BOARD_SIZE as i8 {
            return None;
        }
        let next = Pos::new(x as u8, y as u8);
        if is_wall(next) {
            None
        } else {
            Some(next)
        }
    }
}

/// Rigid walls sit on every cell with two odd coordinates
pub fn is_wall(pos: Pos) -> bool {
    pos.x % 2 == 1 && pos.y % 2 == 1
}

const CORNERS: [Pos; NUM_AGENTS] = [
    Pos::new(0, 0),
    Pos::new(BOARD_SIZE - 1, 0),
    Pos::new(BOARD_SIZE - 1, BOARD_SIZE - 1),
    Pos::new(0, BOARD_SIZE - 1),
];

/// Complete game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Turns played so far
    pub step_count: u16,
    /// Turn limit after which everybody loses
    pub max_steps: u16,
    /// Bit i set when seat i is alive
    pub alive: u8,
    /// Seat positions (meaningless for dead seats)
    pub positions: [Pos; NUM_AGENTS],
}

impl State {
    /// Initial state; `seed` picks the seat-to-corner assignment (0 keeps seat order)
    pub fn initial(seed: u64, max_steps: u16) -> Self {
        let mut positions = CORNERS;
        if seed != 0 {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            positions.shuffle(&mut rng);
        }
        Self {
            step_count: 0,
            max_steps,
            alive: (1 << NUM_AGENTS) - 1,
            positions,
        }
    }

    pub fn is_alive(&self, seat: usize) -> bool {
        self.alive & (1 << seat) != 0
    }

    pub fn num_alive(&self) -> u32 {
        self.alive.count_ones()
    }

    pub fn step_limit_reached(&self) -> bool {
        self.step_count >= self.max_steps
    }

    /// Whether the episode is over from `training_agent`'s point of view
    pub fn is_done(&self, training_agent: usize) -> bool {
        self.num_alive() <= 1 || !self.is_alive(training_agent) || self.step_limit_reached()
    }

    fn occupied_by_other(&self, seat: usize, pos: Pos) -> bool {
        (0..NUM_AGENTS)
            .any(|other| other != seat && self.is_alive(other) && self.positions[other] == pos)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STATE_LEN);
        out.extend_from_slice(&self.step_count.to_le_bytes());
        out.extend_from_slice(&self.max_steps.to_le_bytes());
        out.push(self.alive);
        for pos in &self.positions {
            out.push(pos.x);
            out.push(pos.y);
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, EnvError> {
        if buf.len() != STATE_LEN {
            return Err(EnvError::Decoding(format!(
                "skirmish state must be {} bytes, got {}",
                STATE_LEN,
                buf.len()
            )));
        }
        let step_count = u16::from_le_bytes([buf[0], buf[1]]);
        let max_steps = u16::from_le_bytes([buf[2], buf[3]]);
        let alive = buf[4];
        if alive >> NUM_AGENTS != 0 {
            return Err(EnvError::Decoding(format!("invalid alive mask {:#06b}", alive)));
        }

        let mut positions = [Pos::new(0, 0); NUM_AGENTS];
        for (seat, pos) in positions.iter_mut().enumerate() {
            let p = Pos::new(buf[5 + seat * 2], buf[6 + seat * 2]);
            if p.x >= BOARD_SIZE || p.y >= BOARD_SIZE || is_wall(p) {
                return Err(EnvError::Decoding(format!(
                    "seat {} at invalid cell ({}, {})",
                    seat, p.x, p.y
                )));
            }
            *pos = p;
        }

        Ok(Self {
            step_count,
            max_steps,
            alive,
            positions,
        })
    }

    /// Advance by one joint action
    pub fn apply(&mut self, moves: &[Move; NUM_AGENTS]) {
        let current = self.positions;
        let mut target = current;
        for seat in 0..NUM_AGENTS {
            if !self.is_alive(seat) {
                continue;
            }
            if let Some(next) = moves[seat].delta().and_then(|d| current[seat].offset(d)) {
                target[seat] = next;
            }
        }

        // Cancel colliding or swapping moves until nothing conflicts.
        loop {
            let conflicted: Vec<usize> = (0..NUM_AGENTS)
                .filter(|&a| self.is_alive(a) && target[a] != current[a])
                .filter(|&a| {
                    (0..NUM_AGENTS).any(|b| {
                        b != a
                            && self.is_alive(b)
                            && (target[a] == target[b]
                                || (target[a] == current[b] && target[b] == current[a]))
                    })
                })
                .collect();
            if conflicted.is_empty() {
                break;
            }
            for seat in conflicted {
                target[seat] = current[seat];
            }
        }
        self.positions = target;

        let mut killed = 0u8;
        for striker in 0..NUM_AGENTS {
            if !self.is_alive(striker) || moves[striker] != Move::Strike {
                continue;
            }
            for victim in 0..NUM_AGENTS {
                if victim != striker
                    && self.is_alive(victim)
                    && self.positions[striker].manhattan(self.positions[victim]) == 1
                {
                    killed |= 1 << victim;
                }
            }
        }
        self.alive &= !killed;
        self.step_count = self.step_count.saturating_add(1);
    }

    /// Collaborator policy for one seat: strike adjacent enemies, otherwise
    /// close in on the nearest one.
    pub fn heuristic_move(&self, seat: usize) -> Move {
        if !self.is_alive(seat) {
            return Move::Stop;
        }
        let me = self.positions[seat];
        let nearest = (0..NUM_AGENTS)
            .filter(|&other| other != seat && self.is_alive(other))
            .min_by_key(|&other| (me.manhattan(self.positions[other]), other));

        let Some(enemy) = nearest else {
            return Move::Stop;
        };
        let target = self.positions[enemy];
        if me.manhattan(target) == 1 {
            return Move::Strike;
        }

        let horizontal = match target.x.cmp(&me.x) {
            std::cmp::Ordering::Greater => Some(Move::Right),
            std::cmp::Ordering::Less => Some(Move::Left),
            std::cmp::Ordering::Equal => None,
        };
        let vertical = match target.y.cmp(&me.y) {
            std::cmp::Ordering::Greater => Some(Move::Down),
            std::cmp::Ordering::Less => Some(Move::Up),
            std::cmp::Ordering::Equal => None,
        };
        let candidates = if me.x.abs_diff(target.x) >= me.y.abs_diff(target.y) {
            [horizontal, vertical]
        } else {
            [vertical, horizontal]
        };

        candidates
            .into_iter()
            .flatten()
            .find(|m| {
                m.delta()
                    .and_then(|d| me.offset(d))
                    .is_some_and(|next| !self.occupied_by_other(seat, next))
            })
            .unwrap_or(Move::Stop)
    }
}

/// Skirmish environment for one training seat
#[derive(Debug, Clone)]
pub struct Skirmish {
    state: State,
    training_agent: usize,
}

impl Skirmish {
    /// Create a new game with the default step limit
    pub fn new(training_agent: usize, seed: u64) -> Self {
        Self::with_max_steps(training_agent, seed, DEFAULT_MAX_STEPS)
    }

    pub fn with_max_steps(training_agent: usize, seed: u64, max_steps: u16) -> Self {
        Self {
            state: State::initial(seed, max_steps),
            training_agent,
        }
    }

    /// Current state (for inspection)
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Pack auxiliary information about the state into a u64 bit-field.
    ///
    /// Layout (little endian bit numbering):
    /// * Bits 0-3  : Alive mask
    /// * Bits 16-31: Steps played so far
    fn compute_info_bits(state: &State) -> u64 {
        const STEP_SHIFT: u32 = 16;
        (state.alive as u64) | ((state.step_count as u64) << STEP_SHIFT)
    }

    fn parse_joint(actions: &[Action]) -> Result<[Move; NUM_AGENTS], EnvError> {
        if actions.len() != NUM_AGENTS {
            return Err(EnvError::InvalidAction(format!(
                "joint action must have {} entries, got {}",
                NUM_AGENTS,
                actions.len()
            )));
        }
        let mut moves = [Move::Stop; NUM_AGENTS];
        for (slot, &action) in moves.iter_mut().zip(actions) {
            *slot = Move::from_action(action)
                .ok_or_else(|| EnvError::InvalidAction(format!("unknown action {}", action)))?;
        }
        Ok(moves)
    }
}

impl Environment for Skirmish {
    fn env_id(&self) -> &str {
        "skirmish"
    }

    fn metadata(&self) -> EnvMetadata {
        EnvMetadata::new("skirmish", "Skirmish")
            .with_board(BOARD_SIZE as usize, BOARD_SIZE as usize)
            .with_actions(ACTION_NAMES)
            .with_description("Strike adjacent rivals; the last agent standing wins.")
    }

    fn num_actions(&self) -> usize {
        NUM_ACTIONS
    }

    fn training_agent(&self) -> usize {
        self.training_agent
    }

    fn reset(&mut self, state: &StateKey) -> Result<Vec<u8>, EnvError> {
        self.restore_state(state)?;
        Ok(self.state.encode())
    }

    fn act(&mut self, obs: &[u8]) -> Result<Vec<Action>, EnvError> {
        let view = State::decode(obs)?;
        Ok((0..NUM_AGENTS)
            .filter(|&seat| seat != self.training_agent)
            .map(|seat| view.heuristic_move(seat).action())
            .collect())
    }

    fn step(&mut self, actions: &[Action]) -> Result<StepResult, EnvError> {
        if self.state.is_done(self.training_agent) {
            return Err(EnvError::GameLogic(
                "step called on a finished episode".to_string(),
            ));
        }
        let moves = Self::parse_joint(actions)?;
        self.state.apply(&moves);

        Ok(StepResult {
            obs: self.state.encode(),
            rewards: ffa_rewards(self.state.alive, self.state.step_limit_reached()),
            done: self.state.is_done(self.training_agent),
            info: Self::compute_info_bits(&self.state),
        })
    }

    fn serialize_state(&self) -> StateKey {
        StateKey::new(self.state.encode())
    }

    fn restore_state(&mut self, state: &StateKey) -> Result<(), EnvError> {
        self.state = State::decode(state.as_bytes())?;
        Ok(())
    }
}
