//! Parse and complete a small greeting command.
//!
//! ```sh
//! cargo run --example greeter -- "good morning "
//! cargo run --example greeter -- "good morning 3 bob"
//! ```

use anyhow::Result;
use cligram::nodes::{cmd, int, sh_lex};
use cligram::CompMask;

fn main() -> Result<()> {
    let line = std::env::args().nth(1).unwrap_or_default();

    let grammar = sh_lex(cmd(
        "good (morning|afternoon|evening) [count] bob|bobby|michael",
        [int(0, 10, 0)?.with_id("count")],
    )?);

    let tree = grammar.parse_line(&line)?;
    if tree.matches() {
        println!("accepted:");
        print!("{}", tree.dump());
        if let Some(count) = tree.find_first("count") {
            println!("greeting repeated {} time(s)", count.tokens().join(""));
        }
    } else {
        println!("rejected");
    }

    let completions = grammar.complete_line(&line)?;
    if completions.count(CompMask::ALL) > 0 {
        println!("completions:");
        for item in completions.iter(CompMask::FULL | CompMask::PARTIAL) {
            println!("  {}", item.display().unwrap_or_default());
        }
        let unknown = completions.count(CompMask::UNKNOWN);
        if unknown > 0 {
            println!("  ({unknown} position(s) accept free-form input)");
        }
    }

    Ok(())
}
