//! TAC listing dump tool.
//!
//! Reads a textual TAC listing from a file or stdin, runs block analysis and
//! optionally register allocation, and prints the requested views.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tacflow::core::{CompilationSession, RegisterPool};
use tacflow::dataflow::dump;
use tacflow::pipeline::BlockPipeline;
use tacflow::tac::parse_listing;

/// Analyze and allocate the blocks of a TAC listing.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Arguments {
    /// Listing to read; stdin when absent.
    input: Option<PathBuf>,

    /// Number of allocatable registers, taken in MIPS pool order.
    #[arg(short, long)]
    registers: Option<usize>,

    /// Print def/use sets and per-instruction liveOut.
    #[arg(short, long)]
    liveness: bool,

    /// Print the DU chain of every definition.
    #[arg(short, long)]
    du_chain: bool,

    /// Allocate registers and print the binding of every temp.
    #[arg(short, long)]
    alloc: bool,

    /// Print session statistics.
    #[arg(short, long)]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Arguments::parse();

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let pool = match args.registers {
        Some(count) => RegisterPool::mips_with(count),
        None => RegisterPool::mips(),
    };

    let mut session = CompilationSession::new();
    let mut listing = parse_listing(&text, &mut session)?;
    listing.bind_frame_pointer(&mut session, &pool);

    let pipeline = BlockPipeline::new(pool);
    pipeline.analyze(&mut session, &mut listing.blocks, &listing.live_outs)?;

    let show_plain = !(args.liveness || args.du_chain || args.alloc);
    for block in &listing.blocks {
        if show_plain {
            print!("{}", dump::print(block, session.temps()));
        }
        if args.liveness {
            print!("{}", dump::print_liveness(block, session.temps()));
        }
        if args.du_chain {
            print!("{}", dump::print_du_chain(block, session.temps()));
        }
    }

    if args.alloc {
        let colorings = pipeline.allocate(&mut session, &listing.blocks)?;
        for coloring in &colorings {
            println!("BLOCK {} REGISTERS : ", coloring.block());
            for (temp, reg) in coloring.iter() {
                println!("    {} -> {}", session.temps().name(temp), reg);
            }
        }
    }

    if args.stats {
        eprint!("{}", session.stats());
    }
    Ok(())
}
