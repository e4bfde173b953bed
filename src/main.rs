use std::io::{self, BufRead, Write};
use std::time::SystemTime;

use clap::Parser;
use log::{LevelFilter, debug, info};
use num_format::{Locale, ToFormattedString};
use rand::{SeedableRng, rngs::StdRng};

use board::{COLS, ROWS, piece_kind_name};
use moves::Move;
use store::{BoardId, PieceKind, Store};

mod board;
mod heap;
mod movegen;
mod moves;
mod search;
mod store;

#[derive(Parser)]
#[command(name = "stoat-chess", about = "A small terminal chess opponent")]
struct Args {
    /// Let the computer play both sides
    #[arg(short, long)]
    auto: bool,

    /// Game seed; the same seed replays the same game
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// How many moves ahead the computer looks to start with
    #[arg(short, long, default_value_t = 4)]
    depth: u8,

    /// Play as black instead of white
    #[arg(short, long)]
    black: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()?;
    Ok(())
}

/// One letter per square. Capitals are white, lower case are black, and
/// empty squares checkerboard between '.' and ' '.
fn piece_letter(store: &Store, b: BoardId, row: u8, col: u8) -> char {
    let piece = store.piece_at(b, row, col);
    if piece.is_null() {
        return if (row ^ col) & 1 != 0 { ' ' } else { '.' };
    }
    let letter = match store.piece_kind(piece) {
        PieceKind::Pawn => 'p',
        PieceKind::Rook => 'r',
        PieceKind::Knight => 'h',
        PieceKind::Bishop => 'b',
        PieceKind::Queen => 'q',
        PieceKind::King => 'k',
    };
    if store.piece_white(piece) {
        letter.to_ascii_uppercase()
    } else {
        letter
    }
}

/// Draw the board with the player's side at the bottom.
fn print_board(store: &Store, b: BoardId) {
    println!();
    if store.player_white(b) {
        println!("+-A-B-C-D-E-F-G-H-+");
        for row in (0..ROWS).rev() {
            print!("{} ", row + 1);
            for col in 0..COLS {
                print!("{} ", piece_letter(store, b, row, col));
            }
            println!("{}", row + 1);
        }
        println!("+-A-B-C-D-E-F-G-H-+");
    } else {
        println!("+-H-G-F-E-D-C-B-A-+");
        for row in 0..ROWS {
            print!("{} ", row + 1);
            for col in (0..COLS).rev() {
                print!("{} ", piece_letter(store, b, row, col));
            }
            println!("{}", row + 1);
        }
        println!("+-H-G-F-E-D-C-B-A-+");
    }
    println!();
}

enum PlayerAction {
    Play(Move),
    Undo,
}

fn prompt(text: &str) -> String {
    print!("{text}");
    io::stdout().flush().unwrap();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).unwrap() == 0 {
        // End of input; nothing more to play.
        println!();
        std::process::exit(0);
    }
    line.trim().to_string()
}

/// Ask until we get either a valid move or an undo request.
fn read_player_move(store: &Store, b: BoardId, whites_move: bool) -> PlayerAction {
    let mut response = prompt("Enter a valid move like d2 d4: ");
    loop {
        if response.starts_with('u') {
            return PlayerAction::Undo;
        }
        if let Some(mv) = Move::parse(&response) {
            if store.move_valid(b, mv, whites_move) {
                return PlayerAction::Play(mv);
            }
        }
        response = prompt("Invalid move.  Enter a valid move like d2 d4: ");
    }
}

fn let_player_move(store: &mut Store, b: BoardId, player_white: bool) {
    loop {
        match read_player_move(store, b, player_white) {
            PlayerAction::Undo => {
                // Undoing takes back the engine's reply as well.
                if store.undo_pos(b) < 2 {
                    println!("No moves left to undo.");
                } else {
                    store.undo_last_move(b);
                    store.undo_last_move(b);
                }
                print_board(store, b);
            }
            PlayerAction::Play(mv) => {
                debug!("player plays {mv}");
                store.apply_move(b, mv);
                return;
            }
        }
    }
}

/// Search, announce, and play one engine move. Returns the node count, or
/// None when the side has no moves at all.
fn suggest_and_make_move(
    store: &mut Store,
    b: BoardId,
    white: bool,
    difficulty: u8,
    rng: &mut StdRng,
    my_name: &str,
    my_possessive: &str,
    your_possessive: &str,
) -> Option<u64> {
    let move_num = store.undo_pos(b);
    let outcome = store.suggest_move(b, difficulty, white, rng);
    let Some(mv) = outcome.best else {
        println!("{my_name} have no moves to make.");
        return None;
    };
    print!("{move_num}) {my_name} move {my_possessive} {}", store.describe_move(b, mv));
    let target = store.piece_at(b, mv.to_row, mv.to_col);
    if !target.is_null() {
        if store.piece_white(store.piece_at(b, mv.from_row, mv.from_col)) != store.piece_white(target) {
            println!(" taking {your_possessive} {}", piece_kind_name(store.piece_kind(target)));
        } else {
            println!(" castling.");
        }
    } else {
        println!();
    }
    println!(
        "Evaluated {} moves at difficulty {difficulty}",
        outcome.nodes.to_formatted_string(&Locale::en)
    );
    store.apply_move(b, mv);
    Some(outcome.nodes)
}

fn main() {
    let args = Args::parse();
    setup_logger(args.log_level).expect("failed to initialize logging");
    log_panics::init();

    let player_white = !args.black;
    let mut store = Store::new();
    let b = store.create_board(player_white);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut difficulty = args.depth;
    info!(
        "new game: seed {}, difficulty {difficulty}, player is {}",
        args.seed,
        if player_white { "white" } else { "black" }
    );
    debug!("store holds {} boards and {} pieces", store.used_boards(), store.used_pieces());

    print_board(&store, b);
    let mut players_turn = player_white;
    let mut initial_nodes: u64 = 0;
    while !store.game_over(b) {
        if players_turn {
            if args.auto {
                if suggest_and_make_move(&mut store, b, player_white, difficulty, &mut rng, "You", "your", "my").is_none() {
                    break;
                }
            } else {
                let_player_move(&mut store, b, player_white);
            }
        } else {
            let Some(nodes) =
                suggest_and_make_move(&mut store, b, !player_white, difficulty, &mut rng, "I", "my", "your")
            else {
                break;
            };
            // Keep the engine's turns at a roughly constant cost by nudging
            // the lookahead against the first move's node count.
            if initial_nodes == 0 {
                initial_nodes = nodes;
            }
            if nodes > 5 * initial_nodes {
                difficulty -= 1;
                println!("Decreasing difficulty to {difficulty}");
            } else if 5 * nodes < initial_nodes {
                difficulty += 1;
                println!("Increasing difficulty to {difficulty}");
            }
        }
        print_board(&store, b);
        players_turn = !players_turn;
        let score = store.side_score(b, player_white) - store.side_score(b, !player_white);
        println!("Score = {:.3}", 0.001 * score as f64);
    }
    if !players_turn {
        println!("You win!");
    } else {
        println!("Sorry, better luck next time.");
    }
}
