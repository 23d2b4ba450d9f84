//! Textual TAC reader.
//!
//! A line-oriented format for writing blocks by hand:
//!
//! ```text
//! ; comment
//! block 0:
//!     t0 = add t1, t2
//!     store t0, t3 + 8
//!   end beqz t0 1 2
//!   liveout t3
//! frame fp
//! ```
//!
//! Blocks are numbered in order starting at 0 and each must end with exactly
//! one `end` directive. Temps are created in the session the first time
//! their name is seen. Errors carry the 1-based line number.

use std::collections::HashMap;

use super::instr::{SeqId, Tac};
use super::opcode::Opcode;
use super::temp::TempId;
use crate::core::{BackendError, BackendResult, CompilationSession, RegisterPool};
use crate::dataflow::{BasicBlock, LiveOut, RefPoint, Terminator};

/// Blocks read from a listing, with their boundary liveOut sets.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub blocks: Vec<BasicBlock>,
    /// `live_outs[i]` belongs to `blocks[i]`.
    pub live_outs: Vec<LiveOut>,
    /// Temps named by `frame` directives.
    pub frame_temps: Vec<TempId>,
    names: HashMap<String, TempId>,
}

impl Listing {
    /// Temp created for `name`, if the listing mentions it.
    pub fn temp(&self, name: &str) -> Option<TempId> {
        self.names.get(name).copied()
    }

    /// Bind every `frame` temp to the pool's frame pointer.
    pub fn bind_frame_pointer(&self, session: &mut CompilationSession, pool: &RegisterPool) {
        for temp in &self.frame_temps {
            session.temps_mut().bind(*temp, pool.frame_pointer());
        }
    }
}

/// Parse a listing, creating its temps and sequence ids in `session`.
pub fn parse_listing(text: &str, session: &mut CompilationSession) -> BackendResult<Listing> {
    Parser::new(session).parse(text)
}

struct PendingBlock {
    index: usize,
    header_line: usize,
    tacs: Vec<Tac>,
    terminator: Option<Terminator>,
    live_out: LiveOut,
}

struct Parser<'s> {
    session: &'s mut CompilationSession,
    pending: Option<PendingBlock>,
    listing: Listing,
}

impl<'s> Parser<'s> {
    fn new(session: &'s mut CompilationSession) -> Self {
        Self {
            session,
            pending: None,
            listing: Listing::default(),
        }
    }

    fn parse(mut self, text: &str) -> BackendResult<Listing> {
        for (i, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let mut cur = Cursor::new(line, i + 1);
            self.parse_line(&mut cur)?;
            cur.expect_end()?;
        }
        self.finish_block()?;
        log::debug!(
            "parsed {} blocks, {} temps",
            self.listing.blocks.len(),
            self.listing.names.len()
        );
        Ok(self.listing)
    }

    fn parse_line(&mut self, cur: &mut Cursor<'_>) -> BackendResult<()> {
        let first = cur.expect_word("directive or instruction")?;
        if cur.try_read('=') {
            let dst = self.temp(first);
            let mnemonic = cur.expect_word("instruction")?;
            return self.parse_instruction(cur, Some(dst), mnemonic);
        }
        match first {
            "block" => {
                let index = cur.read_index()?;
                cur.expect(':')?;
                self.start_block(cur, index)
            }
            "frame" => {
                while let Some(name) = cur.read_word() {
                    let temp = self.temp(name);
                    self.listing.frame_temps.push(temp);
                }
                Ok(())
            }
            "end" => self.parse_end(cur),
            "liveout" => {
                let mut temps = Vec::new();
                while let Some(name) = cur.read_word() {
                    temps.push(self.temp(name));
                }
                self.block(cur)?.live_out.temps.extend(temps);
                Ok(())
            }
            "liveref" => {
                let temp = self.read_temp(cur)?;
                let pos = cur.read_number()?;
                let pos = u32::try_from(pos)
                    .map_err(|_| cur.error(format!("position {} out of range", pos)))?;
                self.block(cur)?
                    .live_out
                    .refs
                    .insert(RefPoint::new(SeqId(pos), temp));
                Ok(())
            }
            mnemonic => self.parse_instruction(cur, None, mnemonic),
        }
    }

    fn start_block(&mut self, cur: &Cursor<'_>, index: usize) -> BackendResult<()> {
        self.finish_block()?;
        let expected = self.listing.blocks.len();
        if index != expected {
            return Err(cur.error(format!("expected block {}, found block {}", expected, index)));
        }
        self.pending = Some(PendingBlock {
            index,
            header_line: cur.line,
            tacs: Vec::new(),
            terminator: None,
            live_out: LiveOut::new(),
        });
        Ok(())
    }

    fn finish_block(&mut self) -> BackendResult<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let terminator = pending.terminator.ok_or_else(|| BackendError::Parse {
            line: pending.header_line,
            message: format!("block {} has no end directive", pending.index),
        })?;
        let block = BasicBlock::new(pending.index, pending.tacs, terminator, self.session);
        self.listing.blocks.push(block);
        self.listing.live_outs.push(pending.live_out);
        Ok(())
    }

    fn block(&mut self, cur: &Cursor<'_>) -> BackendResult<&mut PendingBlock> {
        self.pending
            .as_mut()
            .ok_or_else(|| cur.error("directive outside of a block"))
    }

    fn parse_end(&mut self, cur: &mut Cursor<'_>) -> BackendResult<()> {
        let kind = cur.expect_word("terminator kind")?;
        let terminator = match kind {
            "jump" => Terminator::Jump {
                target: cur.read_index()?,
            },
            "beqz" => Terminator::BranchIfZero {
                cond: self.read_temp(cur)?,
                if_zero: cur.read_index()?,
                otherwise: cur.read_index()?,
            },
            "bnez" => Terminator::BranchIfNonZero {
                cond: self.read_temp(cur)?,
                if_nonzero: cur.read_index()?,
                otherwise: cur.read_index()?,
            },
            "return" => Terminator::Return {
                value: cur.read_word().map(|name| self.temp(name)),
            },
            other => return Err(cur.error(format!("unknown terminator `{}`", other))),
        };
        let block = self.block(cur)?;
        if block.terminator.is_some() {
            return Err(cur.error(format!("block {} already has an end directive", block.index)));
        }
        block.terminator = Some(terminator);
        Ok(())
    }

    fn parse_instruction(
        &mut self,
        cur: &mut Cursor<'_>,
        dst: Option<TempId>,
        mnemonic: &str,
    ) -> BackendResult<()> {
        use Opcode::*;
        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| cur.error(format!("unknown instruction `{}`", mnemonic)))?;

        if opcode.is_control_flow() {
            let directive = match opcode {
                Branch => "jump",
                Return => "return",
                _ => mnemonic,
            };
            return Err(cur.error(format!(
                "`{}` ends a block, use `end {}`",
                mnemonic, directive
            )));
        }

        let tac = match opcode {
            op if op.is_binary() => {
                let d = require_dst(cur, op, dst)?;
                let lhs = self.read_temp(cur)?;
                cur.expect(',')?;
                let rhs = self.read_temp(cur)?;
                Tac::binary(op, d, lhs, rhs)
            }
            Neg | LNot | Assign => {
                let d = require_dst(cur, opcode, dst)?;
                let src = self.read_temp(cur)?;
                Tac::unary(opcode, d, src)
            }
            Load => {
                let d = require_dst(cur, opcode, dst)?;
                let base = self.read_temp(cur)?;
                let offset = cur.read_offset()?;
                Tac::load(d, base, offset)
            }
            IndirectCall => {
                let func = self.read_temp(cur)?;
                Tac::indirect_call(dst, func)
            }
            DirectCall => Tac::direct_call(dst, cur.expect_word("call target")?),
            LoadImm4 => {
                let d = require_dst(cur, opcode, dst)?;
                let value = cur.read_number()?;
                let value = i32::try_from(value)
                    .map_err(|_| cur.error(format!("immediate {} out of range", value)))?;
                Tac::load_imm(d, value)
            }
            LoadStrConst => {
                let d = require_dst(cur, opcode, dst)?;
                Tac::load_str(d, cur.read_string()?)
            }
            LoadVtbl => {
                let d = require_dst(cur, opcode, dst)?;
                Tac::load_vtbl(d, cur.expect_word("class name")?)
            }
            Store => {
                forbid_dst(cur, opcode, dst)?;
                let src = self.read_temp(cur)?;
                cur.expect(',')?;
                let base = self.read_temp(cur)?;
                let offset = cur.read_offset()?;
                Tac::store(src, base, offset)
            }
            Parm => {
                forbid_dst(cur, opcode, dst)?;
                Tac::parm(self.read_temp(cur)?)
            }
            Mark => {
                forbid_dst(cur, opcode, dst)?;
                Tac::mark(cur.expect_word("label")?)
            }
            Memo => {
                forbid_dst(cur, opcode, dst)?;
                Tac::memo(cur.read_string()?)
            }
            _ => return Err(cur.error(format!("unsupported instruction `{}`", mnemonic))),
        }
        .map_err(|err| cur.error(err.to_string()))?;

        let block = self.block(cur)?;
        if block.terminator.is_some() {
            return Err(cur.error(format!("instruction after end of block {}", block.index)));
        }
        block.tacs.push(tac);
        Ok(())
    }

    fn read_temp(&mut self, cur: &mut Cursor<'_>) -> BackendResult<TempId> {
        let name = cur.expect_word("temp")?;
        Ok(self.temp(name))
    }

    fn temp(&mut self, name: &str) -> TempId {
        if let Some(id) = self.listing.names.get(name) {
            return *id;
        }
        let id = self.session.new_temp(name);
        self.listing.names.insert(name.to_string(), id);
        id
    }
}

fn require_dst(cur: &Cursor<'_>, opcode: Opcode, dst: Option<TempId>) -> BackendResult<TempId> {
    dst.ok_or_else(|| cur.error(format!("`{}` needs a destination", opcode)))
}

fn forbid_dst(cur: &Cursor<'_>, opcode: Opcode, dst: Option<TempId>) -> BackendResult<()> {
    match dst {
        Some(_) => Err(cur.error(format!("`{}` does not take a destination", opcode))),
        None => Ok(()),
    }
}

/// Drop a `;` comment that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Position within one line of input.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self { text, pos: 0, line }
    }

    fn error(&self, message: impl Into<String>) -> BackendError {
        BackendError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> BackendResult<()> {
        if !self.try_read(ch) {
            return Err(self.error(format!(
                "expected '{}' but found {:?}",
                ch,
                self.current_char()
            )));
        }
        Ok(())
    }

    fn expect_end(&mut self) -> BackendResult<()> {
        self.skip_whitespace();
        if self.pos < self.text.len() {
            return Err(self.error(format!("unexpected `{}`", &self.text[self.pos..])));
        }
        Ok(())
    }

    fn read_word(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        match self.current_char() {
            Some(ch) if ch.is_alphabetic() || matches!(ch, '_' | '$' | '.') => {}
            _ => return None,
        }
        while self
            .current_char()
            .is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '$' | '.'))
        {
            self.advance();
        }
        Some(&self.text[start..self.pos])
    }

    fn expect_word(&mut self, what: &str) -> BackendResult<&'a str> {
        self.read_word().ok_or_else(|| {
            let found = self.current_char().map_or("end of line".to_string(), |c| format!("'{}'", c));
            self.error(format!("expected {} but found {}", what, found))
        })
    }

    fn read_number(&mut self) -> BackendResult<i64> {
        self.skip_whitespace();
        let negative = if self.current_char() == Some('-') {
            self.advance();
            self.skip_whitespace();
            true
        } else {
            false
        };
        let start = self.pos;
        while self.current_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
        let digits = &self.text[start..self.pos];
        let value: i64 = digits
            .parse()
            .map_err(|_| self.error(format!("expected number but found {:?}", self.current_char())))?;
        Ok(if negative { -value } else { value })
    }

    fn read_index(&mut self) -> BackendResult<usize> {
        let value = self.read_number()?;
        usize::try_from(value).map_err(|_| self.error(format!("invalid block index {}", value)))
    }

    /// Optional `+ N` / `- N` after a base temp.
    fn read_offset(&mut self) -> BackendResult<i32> {
        self.skip_whitespace();
        let value = match self.current_char() {
            Some('+') => {
                self.advance();
                self.read_number()?
            }
            Some('-') => self.read_number()?,
            _ => 0,
        };
        i32::try_from(value).map_err(|_| self.error(format!("offset {} out of range", value)))
    }

    fn read_string(&mut self) -> BackendResult<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.current_char() {
                None => return Err(self.error("unterminated string literal")),
                Some('"') => {
                    self.advance();
                    return Ok(out);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(ch) => out.push(ch),
                        None => return Err(self.error("unterminated string literal")),
                    }
                    self.advance();
                }
                Some(ch) => {
                    out.push(ch);
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MIPS_FP;

    fn parse(text: &str) -> (CompilationSession, BackendResult<Listing>) {
        let mut session = CompilationSession::new();
        let result = parse_listing(text, &mut session);
        (session, result)
    }

    fn parse_err(text: &str) -> (usize, String) {
        match parse(text).1 {
            Err(BackendError::Parse { line, message }) => (line, message),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_block() {
        let (session, listing) = parse(
            "block 0:\n\
             \tt0 = add t1, t2 ; sum\n\
             \tt3 = mul t0, t1\n\
             end return t3\n",
        );
        let listing = listing.unwrap();
        assert_eq!(listing.blocks.len(), 1);
        let block = &listing.blocks[0];
        assert_eq!(block.len(), 2);
        assert_eq!(block.tacs()[0].display(session.temps()).to_string(), "t0 = (t1 + t2)");
        assert_eq!(
            block.terminator,
            Terminator::Return {
                value: listing.temp("t3")
            }
        );
        assert!(block.tacs()[1].id > block.tacs()[0].id);
    }

    #[test]
    fn test_parse_all_instruction_forms() {
        let text = r#"
block 0:
    t0 = imm -4
    t1 = str "a;b \"c\""
    t2 = vtbl Foo
    t3 = load t2 + 8
    t4 = load t3 - 4
    store t4, t3 + 12
    parm t4
    t5 = call _Foo_bar
    call _PrintInt
    t6 = icall t5
    icall t6
    t7 = neg t0
    t8 = not t7
    t9 = mov t8
    mark _L1
    memo "FORMAL<t0:4>"
  end jump 1
block 1:
  end return
"#;
        let (session, listing) = parse(text);
        let listing = listing.unwrap();
        let tacs = listing.blocks[0].tacs();
        assert_eq!(tacs.len(), 16);
        assert_eq!(tacs[0].imm, Some(-4));
        assert_eq!(tacs[1].label.as_deref(), Some("a;b \"c\""));
        assert_eq!(tacs[4].display(session.temps()).to_string(), "t4 = *(t3 -4)");
        assert_eq!(tacs[5].display(session.temps()).to_string(), "*(t3 +12) = t4");
        assert_eq!(tacs[8].defined(), None);
        assert_eq!(tacs[10].opcode, Opcode::IndirectCall);
        assert_eq!(tacs[10].defined(), None);
        assert_eq!(tacs[14].opcode, Opcode::Mark);
        assert_eq!(tacs[15].label.as_deref(), Some("FORMAL<t0:4>"));
        assert_eq!(
            listing.blocks[1].terminator,
            Terminator::Return { value: None }
        );
    }

    #[test]
    fn test_parse_terminators_and_live_out() {
        let (_, listing) = parse(
            "block 0:\n  end beqz c 1 2\n  liveout x y\n  liveref x 40\n\
             block 1:\n  end bnez c 2 0\n\
             block 2:\n  end jump 0\n",
        );
        let listing = listing.unwrap();
        let c = listing.temp("c").unwrap();
        let x = listing.temp("x").unwrap();
        assert_eq!(
            listing.blocks[0].terminator,
            Terminator::BranchIfZero {
                cond: c,
                if_zero: 1,
                otherwise: 2
            }
        );
        assert_eq!(listing.blocks[1].successors(), vec![2, 0]);
        assert_eq!(listing.live_outs[0].temps.len(), 2);
        assert!(listing.live_outs[0].refs.contains(&RefPoint::new(SeqId(40), x)));
        assert!(listing.live_outs[1].temps.is_empty());
    }

    #[test]
    fn test_frame_directive() {
        let (mut session, listing) = parse("block 0:\n  t0 = load fp - 8\n  end return t0\nframe fp\n");
        let listing = listing.unwrap();
        let fp = listing.temp("fp").unwrap();
        assert_eq!(listing.frame_temps, vec![fp]);
        listing.bind_frame_pointer(&mut session, &RegisterPool::mips());
        assert_eq!(session.temps().reg(fp), Some(MIPS_FP));
    }

    #[test]
    fn test_missing_end_directive() {
        let (line, message) = parse_err("\nblock 0:\n  t0 = imm 1\nblock 1:\n  end return\n");
        assert_eq!(line, 2);
        assert!(message.contains("no end directive"));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(parse_err("block 0:\n  t0 = frob t1\n").0, 2);
        assert_eq!(parse_err("block 1:\n  end return\n").0, 1);
        assert_eq!(parse_err("t0 = imm 1\n").0, 1);
        assert_eq!(parse_err("block 0:\n  end return\n  t0 = imm 1\n").0, 3);
        assert_eq!(parse_err("block 0:\n  store t0, t1\n  t2 = store t0, t1\n").0, 3);
        assert_eq!(parse_err("block 0:\n  add t0, t1\n").0, 2);
        assert_eq!(parse_err("block 0:\n  t0 = add t1 t2\n").0, 2);
        assert_eq!(parse_err("block 0:\n  end return\n  end return\n").0, 3);
    }

    #[test]
    fn test_control_flow_only_as_end_directive() {
        let (line, message) = parse_err("block 0:
  c = imm 1
  beqz c _L1
  parm a
  end return
");
        assert_eq!(line, 3);
        assert!(message.contains("use `end beqz`"), "{message}");

        assert_eq!(parse_err("block 0:
  bnez c _L2
  end return
").0, 2);
        let (_, message) = parse_err("block 0:
  branch _L3
  end jump 0
");
        assert!(message.contains("use `end jump`"), "{message}");
        let (line, message) = parse_err("block 0:
  t0 = imm 1
  ret t0
  end return t0
");
        assert_eq!(line, 3);
        assert!(message.contains("use `end return`"), "{message}");
    }
}
