//! Interactive CLI to play animal shogi against a random opponent
//!
//! Usage: cargo run --bin play [--ai-first] [--seed 42]

use std::io::{self, Write};

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use animal_shogi::display::{color_name, display_board, format_action, BOLD, RESET};
use animal_shogi::rl_env::{Agent, AgentInput, AnimalShogiEnv, Environment, RandomAgent};
use animal_shogi::{decode_action, ActionId, Color, State};

/// Play animal shogi against a uniformly random opponent
#[derive(Parser, Debug)]
#[command(name = "play")]
#[command(about = "Play animal shogi against a random opponent", long_about = None)]
struct Args {
    /// Play as the second player (the opponent moves first)
    #[arg(long)]
    ai_first: bool,

    /// Random seed for the opponent
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn legal_ids(mask: &[bool]) -> Vec<ActionId> {
    mask.iter()
        .enumerate()
        .filter(|(_, &legal)| legal)
        .map(|(id, _)| id as ActionId)
        .collect()
}

fn get_human_action(state: &State, mask: &[bool]) -> ActionId {
    let ids = legal_ids(mask);

    println!("{BOLD}Your legal moves:{RESET}");
    for (i, &id) in ids.iter().enumerate() {
        let action = decode_action(id, &state.board, state.turn)
            .expect("legal ids always decode");
        println!("  {}: {}", i, format_action(&action));
    }
    if ids.is_empty() {
        println!("  (none - any move forfeits)");
        return 0;
    }

    loop {
        print!("\n{BOLD}Enter move number:{RESET} ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                // EOF
                println!("\nGoodbye!");
                std::process::exit(0);
            }
            Err(_) => {
                println!("Error reading input, try again.");
                continue;
            }
            Ok(_) => {}
        }

        let input = input.trim();
        if input == "q" || input == "quit" {
            println!("Goodbye!");
            std::process::exit(0);
        }

        match input.parse::<usize>() {
            Ok(i) if i < ids.len() => return ids[i],
            _ => println!("Please enter a number between 0 and {}.", ids.len() - 1),
        }
    }
}

fn main() {
    let args = Args::parse();
    let human = if args.ai_first {
        Color::White
    } else {
        Color::Black
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut agent = RandomAgent::new();
    let mut env = AnimalShogiEnv::new();
    let mut step = env.reset();

    println!("{BOLD}Animal Shogi{RESET} - you play {}", color_name(human));

    while !step.done {
        println!("\n{}", display_board(&step.state));

        let action = if step.current_player == human {
            get_human_action(&step.state, &step.legal_action_mask)
        } else if step.legal_action_mask.iter().any(|&legal| legal) {
            let input = AgentInput {
                state: &step.state,
                legal_action_mask: &step.legal_action_mask,
                current_player: step.current_player,
            };
            let action = agent.select_action(&input, &mut rng);
            let decoded = decode_action(action, &step.state.board, step.current_player)
                .expect("agent actions decode");
            println!("Opponent plays: {}", format_action(&decoded));
            action
        } else {
            println!("Opponent has no legal moves and must forfeit.");
            0
        };

        step = env.step(action).expect("in-range actions always step");
    }

    println!("\n{}", display_board(&step.state));
    let winner = if step.rewards[0] > 0.0 {
        Color::Black
    } else {
        Color::White
    };
    if winner == human {
        println!("{BOLD}You win!{RESET}");
    } else {
        println!("{BOLD}{} wins.{RESET}", color_name(winner));
    }
}
