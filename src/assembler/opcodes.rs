// Fixed mnemonic → opcode table (spec.md §4.7), covering every mnemonic the
// code generator and optimizer passes emit. Grounded on the teacher's
// `wasm_optimizer.rs::Instruction` enum (the same opcode surface, there kept
// as an unencoded enum for its optimize-the-parsed-tree fast path); this
// table is what actually turns each mnemonic into WASM binary bytes.

/// How a mnemonic's opcode is encoded: a plain single byte, or a SIMD
/// instruction under the `0xfd` prefix followed by a LEB128 sub-opcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Byte(u8),
    Prefixed(u8, u32),
}

/// Resolves a fixed-mnemonic, no-operand opcode (`WatInstr::Op`) to its
/// binary encoding. Returns `None` for anything not in this table — the
/// assembler turns that into a per-function `CompileError::Assembly` rather
/// than panicking, so one function's unencodable mnemonic (e.g. the
/// `f64.rem` placeholder `binary_mnemonic` emits for table symmetry, which
/// isn't a real WASM instruction) doesn't take down the rest of the module.
pub fn lookup(mnemonic: &str) -> Option<Encoding> {
    use Encoding::*;
    Some(match mnemonic {
        "i32.eqz" => Byte(0x45),
        "i32.eq" => Byte(0x46),
        "i32.ne" => Byte(0x47),
        "i32.lt_s" => Byte(0x48),
        "i32.lt_u" => Byte(0x49),
        "i32.gt_s" => Byte(0x4a),
        "i32.gt_u" => Byte(0x4b),
        "i32.le_s" => Byte(0x4c),
        "i32.le_u" => Byte(0x4d),
        "i32.ge_s" => Byte(0x4e),
        "i32.ge_u" => Byte(0x4f),

        "f64.eq" => Byte(0x61),
        "f64.ne" => Byte(0x62),
        "f64.lt" => Byte(0x63),
        "f64.gt" => Byte(0x64),
        "f64.le" => Byte(0x65),
        "f64.ge" => Byte(0x66),

        "i32.add" => Byte(0x6a),
        "i32.sub" => Byte(0x6b),
        "i32.mul" => Byte(0x6c),
        "i32.div_s" => Byte(0x6d),
        "i32.div_u" => Byte(0x6e),
        "i32.rem_s" => Byte(0x6f),
        "i32.rem_u" => Byte(0x70),
        "i32.and" => Byte(0x71),
        "i32.or" => Byte(0x72),
        "i32.xor" => Byte(0x73),
        "i32.shl" => Byte(0x74),
        "i32.shr_s" => Byte(0x75),
        "i32.shr_u" => Byte(0x76),

        "f64.add" => Byte(0xa0),
        "f64.sub" => Byte(0xa1),
        "f64.mul" => Byte(0xa2),
        "f64.div" => Byte(0xa3),

        // SIMD (spec.md §4.6 vectorization output): 0xfd prefix, LEB128
        // sub-opcode per the vector-instructions proposal.
        "f32x4.add" => Prefixed(0xfd, 0xe4),
        "f32x4.sub" => Prefixed(0xfd, 0xe5),
        "f32x4.mul" => Prefixed(0xfd, 0xe6),

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_scalar_mnemonic_resolves() {
        assert_eq!(lookup("i32.add"), Some(Encoding::Byte(0x6a)));
    }

    #[test]
    fn simd_mnemonic_resolves_to_prefixed_encoding() {
        assert_eq!(lookup("f32x4.add"), Some(Encoding::Prefixed(0xfd, 0xe4)));
    }

    #[test]
    fn non_real_mnemonic_is_unknown() {
        assert_eq!(lookup("f64.rem"), None);
    }
}
