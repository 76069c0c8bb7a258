//! Batch random self-play for sanity checking and statistics
//!
//! Runs N complete games between two uniformly random players and reports
//! win rates and episode lengths.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use animal_shogi::rl_env::{self_play_episode, AnimalShogiEnv, RandomAgent};

/// Random self-play statistics for animal shogi
#[derive(Parser, Debug)]
#[command(name = "selfplay")]
#[command(about = "Run random self-play games and report statistics", long_about = None)]
struct Args {
    /// Number of games to play
    #[arg(long, default_value_t = 100)]
    games: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Step cap per game (the game has no draw rule)
    #[arg(long, default_value_t = 512)]
    max_steps: usize,
}

fn main() {
    let args = Args::parse();

    eprintln!("Self-play configuration:");
    eprintln!("  Games: {}", args.games);
    eprintln!("  Seed: {}", args.seed);
    eprintln!("  Step cap: {}", args.max_steps);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut env = AnimalShogiEnv::new();
    let mut agent = RandomAgent::new();

    let mut black_wins = 0usize;
    let mut white_wins = 0usize;
    let mut truncated = 0usize;
    let mut total_steps = 0usize;

    for _ in 0..args.games {
        let log = self_play_episode(&mut env, &mut agent, &mut rng, args.max_steps);
        total_steps += log.actions.len();
        if log.truncated {
            truncated += 1;
        } else if log.final_rewards[0] > 0.0 {
            black_wins += 1;
        } else {
            white_wins += 1;
        }
    }

    let avg_steps = total_steps as f64 / args.games as f64;
    println!("Games: {}", args.games);
    println!(
        "Black wins: {} ({:.1}%)",
        black_wins,
        100.0 * black_wins as f64 / args.games as f64
    );
    println!(
        "White wins: {} ({:.1}%)",
        white_wins,
        100.0 * white_wins as f64 / args.games as f64
    );
    println!("Truncated: {}", truncated);
    println!("Average steps per game: {:.1}", avg_steps);
}
