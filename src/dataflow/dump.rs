//! Human-readable block listings.
//!
//! Three views of a block: the plain instruction list, the liveness sets with
//! per-instruction liveOut, and the DU chain of every definition. The format
//! is for debugging and is not parsed back.

use super::block::{BasicBlock, Terminator};
use super::pair::RefPoint;
use crate::tac::TempTable;

/// Instructions followed by the terminator.
pub fn print(block: &BasicBlock, temps: &TempTable) -> String {
    let mut output = String::new();
    output.push_str(&format!("BASIC BLOCK {} : \n", block.index));
    for tac in block.tacs() {
        output.push_str(&format!("    {}\n", tac.display(temps)));
    }
    output.push_str(&end_line(&block.terminator, temps, "    "));
    output
}

/// Block-level sets, then each instruction with the temps live after it.
pub fn print_liveness(block: &BasicBlock, temps: &TempTable) -> String {
    let mut output = String::new();
    output.push_str(&format!("BASIC BLOCK {} : \n", block.index));
    output.push_str(&format!("  Def     = {}\n", temps.format_set(&block.def)));
    output.push_str(&format!("  liveUse = {}\n", temps.format_set(&block.live_use)));
    output.push_str(&format!("  liveIn  = {}\n", temps.format_set(&block.live_in)));
    output.push_str(&format!("  liveOut = {}\n", temps.format_set(&block.live_out)));
    for tac in block.tacs() {
        let live = tac
            .live_out
            .as_ref()
            .map(|set| temps.format_set(set))
            .unwrap_or_else(|| "[ ]".to_string());
        output.push_str(&format!("    {} {}\n", tac.display(temps), live));
    }
    output.push_str(&end_line(&block.terminator, temps, "    "));
    output
}

/// Each instruction prefixed by its id; definitions list their DU chain.
pub fn print_du_chain(block: &BasicBlock, temps: &TempTable) -> String {
    let mut output = String::new();
    output.push_str(&format!("BASIC BLOCK {} : \n", block.index));
    for tac in block.tacs() {
        output.push_str(&format!("{}\t{}", tac.id, tac.display(temps)));
        match tac.defined() {
            Some(temp) => {
                output.push_str(" [ ");
                if let Some(chain) = block.du_chain(&RefPoint::new(tac.id, temp)) {
                    for pos in chain {
                        output.push_str(&format!("{} ", pos));
                    }
                }
                output.push_str("]\n");
            }
            None => output.push('\n'),
        }
    }
    output.push_str(&format!("{}\t", block.end_id()));
    output.push_str(&end_line(&block.terminator, temps, "\t    "));
    output
}

fn end_line(terminator: &Terminator, temps: &TempTable, indent: &str) -> String {
    match terminator {
        Terminator::Jump { target } => format!("END BY BRANCH, goto {}\n", target),
        Terminator::BranchIfZero {
            cond,
            if_zero,
            otherwise,
        } => format!(
            "END BY BEQZ, if {} = \n{}0 : goto {}; 1 : goto {}\n",
            temps.name(*cond),
            indent,
            if_zero,
            otherwise
        ),
        Terminator::BranchIfNonZero {
            cond,
            if_nonzero,
            otherwise,
        } => format!(
            "END BY BNEZ, if {} = \n{}1 : goto {}; 0 : goto {}\n",
            temps.name(*cond),
            indent,
            if_nonzero,
            otherwise
        ),
        Terminator::Return { value: Some(temp) } => {
            format!("END BY RETURN, result = {}\n", temps.name(*temp))
        }
        Terminator::Return { value: None } => "END BY RETURN, void result\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CompilationSession;
    use crate::dataflow::LiveOut;
    use crate::tac::{Opcode, Tac};

    fn analyzed() -> (CompilationSession, BasicBlock) {
        let mut session = CompilationSession::new();
        let t: Vec<_> = (0..4).map(|i| session.new_temp(format!("t{i}"))).collect();
        let tacs = vec![
            Tac::binary(Opcode::Add, t[0], t[1], t[2]).unwrap(),
            Tac::binary(Opcode::Mul, t[3], t[0], t[1]).unwrap(),
        ];
        let mut block = BasicBlock::new(
            0,
            tacs,
            Terminator::BranchIfZero {
                cond: t[3],
                if_zero: 1,
                otherwise: 2,
            },
            &mut session,
        );
        block.analyze(LiveOut::new());
        (session, block)
    }

    #[test]
    fn test_print_lists_terminator() {
        let (session, block) = analyzed();
        let text = print(&block, session.temps());
        assert!(text.starts_with("BASIC BLOCK 0 : \n"));
        assert!(text.contains("    t0 = (t1 + t2)\n"));
        assert!(text.ends_with("END BY BEQZ, if t3 = \n    0 : goto 1; 1 : goto 2\n"));
    }

    #[test]
    fn test_print_liveness_sets() {
        let (session, block) = analyzed();
        let text = print_liveness(&block, session.temps());
        assert!(text.contains("  Def     = [ t0 t3 ]\n"));
        assert!(text.contains("  liveUse = [ t1 t2 ]\n"));
        assert!(text.contains("    t0 = (t1 + t2) [ t0 t1 ]\n"));
    }

    #[test]
    fn test_print_du_chain_positions() {
        let (session, block) = analyzed();
        let text = print_du_chain(&block, session.temps());
        let first = block.tacs()[0].id;
        let second = block.tacs()[1].id;
        let end = block.end_id();
        assert!(text.contains(&format!("{}\tt0 = (t1 + t2) [ {} ]\n", first, second)));
        assert!(text.contains(&format!("{}\tt3 = (t0 * t1) [ {} ]\n", second, end)));
        assert!(text.contains(&format!("{}\tEND BY BEQZ", end)));
    }

    #[test]
    fn test_end_lines() {
        let mut table = TempTable::new();
        let c = table.create("c");
        assert_eq!(
            end_line(&Terminator::Jump { target: 4 }, &table, "    "),
            "END BY BRANCH, goto 4\n"
        );
        assert_eq!(
            end_line(
                &Terminator::BranchIfNonZero {
                    cond: c,
                    if_nonzero: 2,
                    otherwise: 3
                },
                &table,
                "\t    "
            ),
            "END BY BNEZ, if c = \n\t    1 : goto 2; 0 : goto 3\n"
        );
        assert_eq!(
            end_line(&Terminator::Return { value: None }, &table, "    "),
            "END BY RETURN, void result\n"
        );
    }
}
