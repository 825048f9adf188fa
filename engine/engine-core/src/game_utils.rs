//! Shared helpers for simultaneous-move environments
//!
//! Joint-action assembly and the terminal reward layouts shared by the
//! free-for-all games.

use crate::env::{Action, EnvError, RewardVector, NUM_AGENTS};

/// Build a full joint action by inserting `own` at `seat`.
///
/// `others` are the collaborator actions for every other seat in seat order,
/// exactly as returned by [`crate::Environment::act`].
///
/// # Example
/// ```
/// use engine_core::game_utils::joint_action;
///
/// let joint = joint_action(&[1, 2, 3], 2, 5).unwrap();
/// assert_eq!(joint, vec![1, 2, 5, 3]);
/// ```
pub fn joint_action(others: &[Action], seat: usize, own: Action) -> Result<Vec<Action>, EnvError> {
    if seat >= NUM_AGENTS {
        return Err(EnvError::InvalidAction(format!(
            "seat {} out of range (expected < {})",
            seat, NUM_AGENTS
        )));
    }
    if others.len() != NUM_AGENTS - 1 {
        return Err(EnvError::InvalidAction(format!(
            "expected {} collaborator actions, got {}",
            NUM_AGENTS - 1,
            others.len()
        )));
    }

    let mut actions = Vec::with_capacity(NUM_AGENTS);
    actions.extend_from_slice(&others[..seat]);
    actions.push(own);
    actions.extend_from_slice(&others[seat..]);
    Ok(actions)
}

/// Free-for-all rewards from a bitmask of living seats.
///
/// * one or zero seats alive: survivors `+1`, everyone else `-1`
/// * step limit reached: everyone `-1`
/// * otherwise: living seats `0`, dead seats `-1`
///
/// # Example
/// ```
/// use engine_core::game_utils::ffa_rewards;
///
/// assert_eq!(ffa_rewards(0b0100, false), [-1.0, -1.0, 1.0, -1.0]);
/// assert_eq!(ffa_rewards(0b0111, false), [0.0, 0.0, 0.0, -1.0]);
/// assert_eq!(ffa_rewards(0b0111, true), [-1.0; 4]);
/// ```
pub fn ffa_rewards(alive_mask: u8, step_limit_reached: bool) -> RewardVector {
    let alive = |seat: usize| alive_mask & (1 << seat) != 0;
    let num_alive = alive_mask.count_ones();

    let mut rewards = [0.0; NUM_AGENTS];
    for (seat, reward) in rewards.iter_mut().enumerate() {
        *reward = if num_alive <= 1 {
            if alive(seat) {
                1.0
            } else {
                -1.0
            }
        } else if step_limit_reached || !alive(seat) {
            -1.0
        } else {
            0.0
        };
    }
    rewards
}
