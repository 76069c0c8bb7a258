//! Animal Shogi Engine and RL Environment
//!
//! A rules engine for dōbutsu shōgi with an RL-style environment wrapper.
//!
//! This crate re-exports the engine and rl-env crates for convenience.

pub use animal_shogi_engine::*;
pub use animal_shogi_rl_env as rl_env;

pub mod display;
