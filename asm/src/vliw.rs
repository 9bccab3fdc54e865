use indexmap::IndexMap;
use vtx_arch::Reg;

use crate::ast::{Instruction, VliwInstruction};
use crate::encode::{Encoder, INST_WIDTH};
use crate::error::{Diagnostics, Error};

/// Slots per bundle. Missing slots are filled with `NOP`.
pub const BUNDLE_SLOTS: usize = 3;

pub const BUNDLE_WIDTH: u32 = INST_WIDTH * BUNDLE_SLOTS as u32;

pub struct Bundler<'a> {
    encoder: &'a Encoder<'a>,
}

impl<'a> Bundler<'a> {
    pub fn new(encoder: &'a Encoder<'a>) -> Self {
        Bundler { encoder }
    }

    /// Encode a bundle into 12 bytes, slot 0 first.
    /// Two slots writing the same register is an error.
    pub fn encode(
        &self,
        bundle: &VliwInstruction,
        diags: &mut Diagnostics,
    ) -> Result<[u8; BUNDLE_WIDTH as usize], Error> {
        if bundle.slots.len() > BUNDLE_SLOTS {
            return Err(Error::OperandCountMismatch {
                mnemonic: "VLIW bundle".to_string(),
                expected: BUNDLE_SLOTS,
                found: bundle.slots.len(),
            });
        }

        let nop = Instruction {
            mnemonic: "NOP".to_string(),
            operands: vec![],
            pos: bundle.pos.clone(),
        };
        let mut word = [0u8; BUNDLE_WIDTH as usize];
        let mut writers: IndexMap<Reg, Vec<usize>> = IndexMap::new();
        for slot in 0..BUNDLE_SLOTS {
            let inst = bundle.slots.get(slot).unwrap_or(&nop);
            let encoded = self.encoder.encode_slot(inst, diags)?;
            let at = slot * INST_WIDTH as usize;
            word[at..at + INST_WIDTH as usize].copy_from_slice(&encoded.bytes);
            if let Some(dest) = encoded.dest {
                writers.entry(dest).or_default().push(slot);
            }
        }

        if let Some((reg, slots)) = writers.into_iter().find(|(_, slots)| slots.len() > 1) {
            return Err(Error::VliwRegisterConflict {
                register: reg.to_string(),
                slots,
            });
        }
        log::trace!("bundle of {} slot(s): {:02X?}", bundle.slots.len(), word);
        Ok(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Operand, Pos};
    use crate::config::Config;
    use crate::symbol::SymbolTable;

    fn inst(mnemonic: &str, regs: &[&str]) -> Instruction {
        Instruction::new(mnemonic, regs.iter().map(|r| Operand::reg(r)).collect())
    }

    fn bundle(slots: Vec<Instruction>) -> Result<[u8; 12], Error> {
        let symbols = SymbolTable::new();
        let config = Config::default();
        let encoder = Encoder::new(&symbols, &config);
        let mut diags = Diagnostics::new();
        Bundler::new(&encoder).encode(
            &VliwInstruction {
                slots,
                pos: Pos::default(),
            },
            &mut diags,
        )
    }

    #[test]
    fn conflict_on_same_destination() {
        let result = bundle(vec![
            inst("ADD", &["T0", "T1", "T2"]),
            inst("SUB", &["T0", "T3", "T4"]),
            inst("NOP", &[]),
        ]);
        match result {
            Err(Error::VliwRegisterConflict { register, slots }) => {
                assert_eq!(register, "T0");
                assert_eq!(slots, vec![0, 1]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disjoint_destinations() {
        let word = bundle(vec![
            inst("ADD", &["T0", "T1", "T2"]),
            inst("SUB", &["T3", "T4", "T5"]),
            inst("NOP", &[]),
        ])
        .unwrap();
        assert_eq!(word.len(), 12);
        assert_eq!(word, [0x01, 0, 1, 2, 0x02, 3, 4, 5, 0, 0, 0, 0]);
    }

    #[test]
    fn missing_slots_are_nop() {
        let word = bundle(vec![inst("HALT", &[])]).unwrap();
        assert_eq!(word, [0xA2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn banks_do_not_alias() {
        // VA and T0 share number 0 but not a register file
        let load = |mnemonic: &str, reg: &str| {
            Instruction::new(mnemonic, vec![Operand::reg(reg), Operand::imm("0x10")])
        };
        assert!(bundle(vec![load("LD", "T0"), load("VLD", "VA"), load("FLD", "FA")]).is_ok());
        assert!(matches!(
            bundle(vec![load("VLD", "VA"), load("VLD", "VA")]),
            Err(Error::VliwRegisterConflict { .. })
        ));
    }

    #[test]
    fn non_writers_never_conflict() {
        assert!(bundle(vec![inst("CMP", &["T0", "T1"]), inst("CMP", &["T0", "T2"])]).is_ok());
    }

    #[test]
    fn too_many_slots() {
        let nop = inst("NOP", &[]);
        assert!(matches!(
            bundle(vec![nop.clone(), nop.clone(), nop.clone(), nop]),
            Err(Error::OperandCountMismatch { expected: 3, found: 4, .. })
        ));
    }

    #[test]
    fn slot_error_propagates() {
        assert!(matches!(
            bundle(vec![inst("FOO", &[])]),
            Err(Error::UnknownMnemonic(_))
        ));
    }
}
