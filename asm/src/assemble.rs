//! Two-pass assembly driver.
//!
//! Pass 1 walks the program, assigns every label its address and records
//! every symbol reference. Pass 2 walks it again with the complete symbol
//! table and emits bytes. Pass 1 records the address after every line and
//! pass 2 replays those addresses instead of recomputing them, so each label's
//! value is the address its line is emitted at.

use strum::EnumString;

use crate::ast::{Directive, Instruction, Operand, Pos, Program, Stmt, VliwInstruction};
use crate::config::Config;
use crate::encode::{eval, Encoder, Resolve, INST_WIDTH};
use crate::error::{Diagnostics, Error, Warning};
use crate::number::{is_string_literal, parse_tryte, unquote};
use crate::pack::WordSize;
use crate::symbol::{SymbolKind, SymbolTable};
use crate::vliw::{Bundler, BUNDLE_WIDTH};

/// Bytes of one `.DT` word.
const TRYTE_WIDTH: u64 = 4;

/// Largest zero fill a single `.SPACE` or `.ALIGN` may emit.
pub const MAX_RESERVE: u32 = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
enum DirKind {
    Org,
    Space,
    Align,
    Db,
    Dw,
    Dt,
    Equ,
    Include,
    Section,
}

impl DirKind {
    fn of(dir: &Directive) -> Option<DirKind> {
        dir.name.trim_start_matches('.').parse().ok()
    }
}

/// Where one source line landed in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Index into `Program::lines`.
    pub line: usize,
    pub addr: u32,
    /// Offset into `Assembly::bytes`.
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug)]
pub struct Assembly {
    /// Flat 8-bit image, before word-size packing.
    pub bytes: Vec<u8>,
    pub symbols: SymbolTable,
    pub diags: Diagnostics,
    pub spans: Vec<Span>,
    pub origin: u32,
    pub word_size: WordSize,
}

impl Assembly {
    pub fn is_ok(&self) -> bool {
        !self.diags.has_error()
    }

    /// The image packed for the configured word size.
    pub fn packed(&self) -> Vec<u8> {
        self.word_size.pack(&self.bytes)
    }
}

/// Assemble `program`. Never stops at the first error: every diagnostic is
/// collected and lines that fail emit zero placeholders of their usual size.
pub fn assemble(program: &Program, config: &Config) -> Assembly {
    Assembler::new(config).run(program)
}

pub struct Assembler<'c> {
    config: &'c Config,
    symbols: SymbolTable,
    diags: Diagnostics,
}

impl<'c> Assembler<'c> {
    pub fn new(config: &'c Config) -> Self {
        Assembler {
            config,
            symbols: SymbolTable::new(),
            diags: Diagnostics::new(),
        }
    }

    pub fn run(mut self, program: &Program) -> Assembly {
        log::debug!(
            "pass 1: {} line(s), origin 0x{:04X}",
            program.lines.len(),
            self.config.origin
        );
        let ends = self.collect(program);
        let end = ends.last().copied().unwrap_or(self.config.origin);
        log::debug!(
            "pass 1: {} symbol(s), end address 0x{:04X}",
            self.symbols.len(),
            end
        );
        self.check_symbols();

        let (bytes, spans) = self.emit(program, &ends);
        log::debug!("pass 2: {} byte(s), {}", bytes.len(), self.diags.summary());

        Assembly {
            bytes,
            symbols: self.symbols,
            diags: self.diags,
            spans,
            origin: self.config.origin,
            word_size: self.config.word_size,
        }
    }

    // ------------------------------------------------------------------------
    // Pass 1

    /// Returns the address following each line.
    fn collect(&mut self, program: &Program) -> Vec<u32> {
        let mut addr = self.config.origin;
        let mut ends = Vec::with_capacity(program.lines.len());
        for line in &program.lines {
            if let Some(label) = &line.label {
                let defined = self.symbols.define(
                    &label.name,
                    addr,
                    SymbolKind::Label,
                    &label.pos,
                    &mut self.diags,
                );
                if let Err(err) = defined {
                    self.diags.error(err, &label.pos);
                }
            }

            match &line.stmt {
                Some(Stmt::Inst(inst)) => {
                    self.reference(&inst.operands, inst);
                    addr = self.advance(addr, INST_WIDTH, &inst.pos);
                }
                Some(Stmt::Vliw(vliw)) => {
                    for slot in &vliw.slots {
                        self.reference(&slot.operands, slot);
                    }
                    addr = self.advance(addr, BUNDLE_WIDTH, &vliw.pos);
                }
                Some(Stmt::Directive(dir)) => addr = self.collect_directive(dir, addr),
                None => {}
            }
            ends.push(addr);
        }
        ends
    }

    /// Step over `width` bytes. Running past the end of the address space
    /// is an error and leaves the address where it was.
    fn advance(&mut self, addr: u32, width: u32, pos: &Pos) -> u32 {
        match offset(addr, u64::from(width)) {
            Ok(next) => next,
            Err(err) => {
                self.diags.error(err, pos);
                addr
            }
        }
    }

    fn reference(&mut self, operands: &[Operand], inst: &Instruction) {
        for op in operands {
            op.for_each_symbol(&mut |name| {
                self.symbols.reference(name, &inst.pos);
            });
        }
    }

    fn collect_directive(&mut self, dir: &Directive, addr: u32) -> u32 {
        // Unknown directives are reported by pass 2
        let Some(kind) = DirKind::of(dir) else {
            return addr;
        };

        // `.EQU name, value` only references its value
        let skip = usize::from(kind == DirKind::Equ);
        for op in dir.params.iter().skip(skip) {
            op.for_each_symbol(&mut |name| {
                self.symbols.reference(name, &dir.pos);
            });
        }

        if kind == DirKind::Equ {
            self.define_constant(dir);
            return addr;
        }
        match layout(kind, dir, addr, &self.symbols) {
            Ok(next) => next,
            Err(err) => {
                self.diags.error(err, &dir.pos);
                addr
            }
        }
    }

    fn define_constant(&mut self, dir: &Directive) {
        if dir.params.len() != 2 {
            self.diags.error(
                Error::OperandCountMismatch {
                    mnemonic: dir.name.clone(),
                    expected: 2,
                    found: dir.params.len(),
                },
                &dir.pos,
            );
            return;
        }
        let Operand::Ident(name) = &dir.params[0] else {
            self.diags.error(
                Error::OperandKindMismatch {
                    mnemonic: dir.name.clone(),
                    index: 1,
                    expected: "a symbol name",
                },
                &dir.pos,
            );
            return;
        };

        // A failed value still defines the name so later uses do not cascade
        let value = eval(&self.symbols, &dir.params[1], Resolve::Strict, &dir.name, 2)
            .unwrap_or_else(|err| {
                self.diags.error(err, &dir.pos);
                0
            });
        let defined = self.symbols.define(
            name,
            value as u32,
            SymbolKind::Constant,
            &dir.pos,
            &mut self.diags,
        );
        if let Err(err) = defined {
            self.diags.error(err, &dir.pos);
        }
    }

    fn check_symbols(&mut self) {
        for sym in self.symbols.all_undefined() {
            self.diags
                .error(Error::UndefinedSymbol(sym.name.clone()), &sym.pos);
        }
        for sym in self.symbols.unused_labels() {
            self.diags
                .warn(Warning::UnusedLabel(sym.name.clone()), &sym.pos);
        }
    }

    // ------------------------------------------------------------------------
    // Pass 2

    fn emit(&mut self, program: &Program, ends: &[u32]) -> (Vec<u8>, Vec<Span>) {
        let mut emitter = Emitter::new(&self.symbols, self.config, ends);
        for (idx, line) in program.lines.iter().enumerate() {
            emitter.line(idx, &line.stmt, &mut self.diags);
        }
        (emitter.out, emitter.spans)
    }
}

/// Address after `dir`, given the address it starts at.
/// Only pass 1 calls this; pass 2 replays the result.
fn layout(kind: DirKind, dir: &Directive, addr: u32, symbols: &SymbolTable) -> Result<u32, Error> {
    let single = || {
        if dir.params.len() != 1 {
            return Err(Error::OperandCountMismatch {
                mnemonic: dir.name.clone(),
                expected: 1,
                found: dir.params.len(),
            });
        }
        eval(symbols, &dir.params[0], Resolve::Strict, &dir.name, 1)
    };
    let unsigned = |value: i64, what: &'static str| {
        u32::try_from(value).map_err(|_| Error::ValueOutOfRange { value, what })
    };
    let reserve = |size: u32| {
        if size > MAX_RESERVE {
            return Err(Error::ValueOutOfRange {
                value: i64::from(size),
                what: "a zero fill",
            });
        }
        offset(addr, u64::from(size))
    };

    match kind {
        DirKind::Org => unsigned(single()?, "an address"),
        DirKind::Space => reserve(unsigned(single()?, "a size")?),
        DirKind::Align => {
            let align = unsigned(single()?, "an alignment")?;
            if align == 0 {
                return Err(Error::ValueOutOfRange {
                    value: 0,
                    what: "an alignment",
                });
            }
            reserve((align - addr % align) % align)
        }
        DirKind::Db => offset(addr, data_units(&dir.params)),
        DirKind::Dw => offset(addr, 2 * data_units(&dir.params)),
        DirKind::Dt => offset(addr, TRYTE_WIDTH * dir.params.len() as u64),
        DirKind::Equ | DirKind::Include | DirKind::Section => Ok(addr),
    }
}

/// `addr + len`, or an error past the 32-bit address space.
fn offset(addr: u32, len: u64) -> Result<u32, Error> {
    let next = u64::from(addr) + len;
    u32::try_from(next).map_err(|_| Error::ValueOutOfRange {
        value: i64::try_from(next).unwrap_or(i64::MAX),
        what: "an address",
    })
}

/// One unit per value, one per character of a string.
fn data_units(params: &[Operand]) -> u64 {
    params
        .iter()
        .map(|op| match op {
            Operand::Immediate(lit) if is_string_literal(lit) => unquote(lit).chars().count() as u64,
            _ => 1,
        })
        .sum()
}

// ----------------------------------------------------------------------------
// Emission

struct Emitter<'a> {
    config: &'a Config,
    encoder: Encoder<'a>,
    /// Pass-1 address after each line.
    ends: &'a [u32],
    addr: u32,
    out: Vec<u8>,
    spans: Vec<Span>,
}

impl<'a> Emitter<'a> {
    fn new(symbols: &'a SymbolTable, config: &'a Config, ends: &'a [u32]) -> Self {
        Emitter {
            config,
            encoder: Encoder::new(symbols, config),
            ends,
            addr: config.origin,
            out: Vec::new(),
            spans: Vec::new(),
        }
    }

    fn line(&mut self, idx: usize, stmt: &Option<Stmt>, diags: &mut Diagnostics) {
        let addr = self.addr;
        let offset = self.out.len();
        match stmt {
            Some(Stmt::Inst(inst)) => self.inst(inst, diags),
            Some(Stmt::Vliw(vliw)) => self.vliw(vliw, diags),
            Some(Stmt::Directive(dir)) => self.directive(idx, dir, diags),
            None => {}
        }
        let len = self.out.len() - offset;
        self.addr = self.ends.get(idx).copied().unwrap_or(addr);
        if len > 0 {
            log::trace!("0x{:04X}: line {} -> {} byte(s)", addr, idx + 1, len);
        }
        self.spans.push(Span {
            line: idx,
            addr,
            offset,
            len,
        });
    }

    fn push(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    fn inst(&mut self, inst: &Instruction, diags: &mut Diagnostics) {
        let word = self.encoder.encode(inst, diags).unwrap_or_else(|err| {
            diags.error(err, &inst.pos);
            [0; INST_WIDTH as usize]
        });
        self.push(&word);
    }

    fn vliw(&mut self, vliw: &VliwInstruction, diags: &mut Diagnostics) {
        let word = Bundler::new(&self.encoder)
            .encode(vliw, diags)
            .unwrap_or_else(|err| {
                diags.error(err, &vliw.pos);
                [0; BUNDLE_WIDTH as usize]
            });
        self.push(&word);
    }

    fn directive(&mut self, idx: usize, dir: &Directive, diags: &mut Diagnostics) {
        if self.config.is_deprecated_directive(&dir.name) {
            diags.warn(Warning::DeprecatedDirective(dir.name.clone()), &dir.pos);
        }
        let Some(kind) = DirKind::of(dir) else {
            diags.error(Error::UnsupportedDirective(dir.name.clone()), &dir.pos);
            return;
        };

        let symbols = self.encoder.symbols();
        match kind {
            // `.ORG` only moves the address, which `line` replays
            DirKind::Org => {}
            DirKind::Space | DirKind::Align => {
                let next = self.ends.get(idx).copied().unwrap_or(self.addr);
                let pad = next.saturating_sub(self.addr).min(MAX_RESERVE) as usize;
                self.out.resize(self.out.len() + pad, 0);
            }
            DirKind::Db => {
                for (idx, op) in dir.params.iter().enumerate() {
                    match op {
                        Operand::Immediate(lit) if is_string_literal(lit) => {
                            for c in unquote(lit).chars() {
                                if u32::from(c) > 0xFF {
                                    diags.warn(Warning::Truncated { ch: c, bits: 8 }, &dir.pos);
                                }
                                self.push(&[c as u8]);
                            }
                        }
                        _ => {
                            let value = self.value(dir, op, idx, diags);
                            self.push(&[value as u8]);
                        }
                    }
                }
            }
            DirKind::Dw => {
                for (idx, op) in dir.params.iter().enumerate() {
                    match op {
                        Operand::Immediate(lit) if is_string_literal(lit) => {
                            for c in unquote(lit).chars() {
                                if u32::from(c) > 0xFFFF {
                                    diags.warn(Warning::Truncated { ch: c, bits: 16 }, &dir.pos);
                                }
                                self.push(&(c as u16).to_be_bytes());
                            }
                        }
                        _ => {
                            let value = self.value(dir, op, idx, diags);
                            self.push(&(value as u16).to_be_bytes());
                        }
                    }
                }
            }
            DirKind::Dt => {
                for (idx, op) in dir.params.iter().enumerate() {
                    let value = match op {
                        Operand::Immediate(lit) => parse_tryte(lit),
                        _ => eval(symbols, op, Resolve::Placeholder, &dir.name, idx + 1),
                    }
                    .unwrap_or_else(|err| {
                        diags.error(err, &dir.pos);
                        0
                    });
                    self.push(&(value as u32).to_be_bytes());
                }
            }
            DirKind::Equ => {}
            DirKind::Include | DirKind::Section => {
                diags.error(Error::UnsupportedDirective(dir.name.clone()), &dir.pos);
            }
        }
    }

    fn value(&self, dir: &Directive, op: &Operand, idx: usize, diags: &mut Diagnostics) -> i64 {
        eval(self.encoder.symbols(), op, Resolve::Placeholder, &dir.name, idx + 1)
            .unwrap_or_else(|err| {
                diags.error(err, &dir.pos);
                0
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Line;

    fn run(lines: Vec<Line>) -> Assembly {
        assemble(&Program::numbered("test.asm", lines), &Config::default())
    }

    #[test]
    fn directive_names() {
        assert_eq!("org".parse::<DirKind>().unwrap(), DirKind::Org);
        assert_eq!("DB".parse::<DirKind>().unwrap(), DirKind::Db);
        assert!("BYTE".parse::<DirKind>().is_err());
    }

    #[test]
    fn align_pads_to_multiple() {
        let asm = run(vec![
            Line::directive(".DB", vec![Operand::imm("1")]),
            Line::directive(".ALIGN", vec![Operand::imm("4")]),
            Line::label("here"),
            Line::inst("JMP", vec![Operand::ident("here")]),
        ]);
        assert!(asm.is_ok(), "{:?}", asm.diags);
        assert_eq!(asm.symbols.value("here"), Some(4));
        assert_eq!(asm.bytes, vec![1, 0, 0, 0, 0x30, 0, 0, 4]);
    }

    #[test]
    fn offset_stays_in_address_space() {
        assert_eq!(offset(0xFFFF_FFF0, 0xF).ok(), Some(0xFFFF_FFFF));
        assert!(matches!(
            offset(0xFFFF_FFFC, 4),
            Err(Error::ValueOutOfRange { value: 0x1_0000_0000, what: "an address" })
        ));
    }

    #[test]
    fn zero_fill_is_capped() {
        let asm = run(vec![
            Line::directive(".ORG", vec![Operand::imm("1")]),
            Line::directive(".ALIGN", vec![Operand::imm("0x40000000")]),
            Line::directive(".DB", vec![Operand::imm("7")]),
        ]);
        assert!(matches!(
            asm.diags.errors()[0].kind,
            Error::ValueOutOfRange { what: "a zero fill", .. }
        ));
        assert_eq!(asm.bytes, vec![7]);
    }

    #[test]
    fn align_zero_is_rejected() {
        let asm = run(vec![Line::directive(".ALIGN", vec![Operand::imm("0")])]);
        assert!(matches!(
            asm.diags.errors()[0].kind,
            Error::ValueOutOfRange { value: 0, .. }
        ));
        assert!(asm.bytes.is_empty());
    }

    #[test]
    fn org_moves_address_only() {
        let asm = run(vec![
            Line::directive(".ORG", vec![Operand::imm("0x100")]),
            Line::label("start"),
            Line::inst("JMP", vec![Operand::ident("start")]),
        ]);
        assert!(asm.is_ok(), "{:?}", asm.diags);
        assert_eq!(asm.symbols.value("start"), Some(0x100));
        assert_eq!(asm.bytes, vec![0x30, 0, 0x01, 0x00]);
        assert_eq!(asm.spans[2].addr, 0x100);
        assert_eq!(asm.spans[2].offset, 0);
    }

    #[test]
    fn space_emits_zeros() {
        let asm = run(vec![
            Line::directive(".SPACE", vec![Operand::imm("3")]),
            Line::directive(".DB", vec![Operand::imm("0xFF")]),
        ]);
        assert_eq!(asm.bytes, vec![0, 0, 0, 0xFF]);
    }

    #[test]
    fn negative_space_is_rejected() {
        let asm = run(vec![Line::directive(".SPACE", vec![Operand::imm("-1")])]);
        assert_eq!(asm.diags.errors().len(), 1);
        assert!(asm.bytes.is_empty());
    }

    #[test]
    fn data_directives() {
        let asm = run(vec![
            Line::directive(".DB", vec![Operand::imm("\"Hi\""), Operand::imm("0x1FF")]),
            Line::directive(".DW", vec![Operand::imm("0x1234"), Operand::imm("\"A\"")]),
            Line::directive(".DT", vec![Operand::imm("0t+-"), Operand::imm("7")]),
        ]);
        assert!(asm.is_ok(), "{:?}", asm.diags);
        assert_eq!(
            asm.bytes,
            vec![b'H', b'i', 0xFF, 0x12, 0x34, 0x00, b'A', 0, 0, 0, 2, 0, 0, 0, 7]
        );
        assert_eq!(asm.spans[1].addr, 3);
        assert_eq!(asm.spans[2].addr, 7);
    }

    #[test]
    fn dt_bad_trit_keeps_size() {
        let asm = run(vec![
            Line::directive(".DT", vec![Operand::imm("0t+2")]),
            Line::label("after"),
            Line::inst("JMP", vec![Operand::ident("after")]),
        ]);
        assert_eq!(asm.diags.errors().len(), 1);
        assert_eq!(asm.symbols.value("after"), Some(4));
        assert_eq!(&asm.bytes[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn equ_defines_constant() {
        let asm = run(vec![
            Line::directive(".EQU", vec![Operand::ident("SIZE"), Operand::imm("0x20")]),
            Line::directive(
                ".EQU",
                vec![
                    Operand::ident("END"),
                    Operand::add(Operand::ident("SIZE"), Operand::imm("4")),
                ],
            ),
            Line::inst("LD", vec![Operand::reg("T0"), Operand::ident("END")]),
        ]);
        assert!(asm.is_ok(), "{:?}", asm.diags);
        assert_eq!(asm.symbols.value("END"), Some(0x24));
        assert_eq!(asm.bytes, vec![0x20, 0, 0, 0x24]);
        // constants are never unused labels
        assert!(asm.diags.warnings().is_empty());
    }

    #[test]
    fn equ_forward_reference() {
        let asm = run(vec![
            Line::directive(".EQU", vec![Operand::ident("X"), Operand::ident("later")]),
            Line::inst("NOP", vec![]).labeled("later"),
        ]);
        assert_eq!(asm.diags.errors().len(), 1);
        assert!(matches!(
            &asm.diags.errors()[0].kind,
            Error::UndefinedSymbol(name) if name == "later"
        ));
    }

    #[test]
    fn section_is_unsupported() {
        let asm = run(vec![
            Line::directive(".SECTION", vec![Operand::imm("\".text\"")]),
            Line::directive(".MACRO", vec![]),
            Line::inst("NOP", vec![]),
        ]);
        let kinds: Vec<_> = asm.diags.errors().iter().map(|d| d.message()).collect();
        assert_eq!(
            kinds,
            vec![
                "Unsupported directive: `.SECTION`".to_string(),
                "Unsupported directive: `.MACRO`".to_string(),
            ]
        );
        assert_eq!(asm.bytes, vec![0, 0, 0, 0]);
    }

    #[test]
    fn deprecated_directive_warns_once() {
        let config = Config {
            deprecated_directives: vec!["SPACE".to_string()],
            ..Default::default()
        };
        let program = Program::numbered(
            "test.asm",
            vec![Line::directive(".space", vec![Operand::imm("2")])],
        );
        let asm = assemble(&program, &config);
        assert!(asm.is_ok());
        assert_eq!(asm.diags.warnings().len(), 1);
        assert_eq!(
            asm.diags.warnings()[0].kind,
            Warning::DeprecatedDirective(".space".to_string())
        );
        assert_eq!(asm.bytes, vec![0, 0]);
    }

    #[test]
    fn failed_line_keeps_its_size() {
        let asm = run(vec![
            Line::inst("FOO", vec![]),
            Line::vliw(vec![
                Instruction::new("ADD", vec![Operand::reg("T0"), Operand::reg("T1"), Operand::reg("T2")]),
                Instruction::new("INC", vec![Operand::reg("T0"), Operand::reg("T0")]),
            ]),
            Line::label("end"),
            Line::inst("JMP", vec![Operand::ident("end")]),
        ]);
        assert_eq!(asm.diags.errors().len(), 2);
        assert_eq!(asm.symbols.value("end"), Some(16));
        assert_eq!(asm.bytes.len(), 20);
        assert!(asm.bytes[..16].iter().all(|&b| b == 0));
        assert_eq!(&asm.bytes[16..], &[0x30, 0, 0, 16]);
    }
}
