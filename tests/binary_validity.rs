// spec.md §8 scenario 6: the minimal add module's emitted bytes start with
// the WASM magic number and version, and a hand-rolled reader can walk its
// sections and re-find the `add` export (standing in for "an independent
// validator accepts the module" without adding a second WASM-reading stack).

use neurowasm_core::Compiler;

fn read_leb128_u32(bytes: &[u8], pos: &mut usize) -> u32 {
    let mut result = 0u32;
    let mut shift = 0;
    loop {
        let byte = bytes[*pos];
        *pos += 1;
        result |= ((byte & 0x7f) as u32) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    result
}

#[test]
fn emitted_bytes_start_with_magic_and_version_one() {
    let compiler = Compiler::new();
    let result = compiler.compile_source("function add(a, b) { return a + b; }");
    assert_eq!(&result.wasm_binary[0..8], &[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn export_section_names_the_add_function() {
    let compiler = Compiler::new();
    let result = compiler.compile_source("function add(a, b) { return a + b; }");
    let bytes = &result.wasm_binary;

    let mut pos = 8;
    let mut found_add_export = false;
    while pos < bytes.len() {
        let section_id = bytes[pos];
        pos += 1;
        let len = read_leb128_u32(bytes, &mut pos) as usize;
        let payload = &bytes[pos..pos + len];

        if section_id == 7 {
            // export section: count, then (name-len, name, kind, index)*
            let mut p = 0;
            let count = read_leb128_u32(payload, &mut p);
            for _ in 0..count {
                let name_len = read_leb128_u32(payload, &mut p) as usize;
                let name = std::str::from_utf8(&payload[p..p + name_len]).unwrap();
                p += name_len;
                let _kind = payload[p];
                p += 1;
                let _index = read_leb128_u32(payload, &mut p);
                if name == "add" {
                    found_add_export = true;
                }
            }
        }
        pos += len;
    }
    assert!(found_add_export, "expected an `add` export in the binary");
}

#[test]
fn empty_source_compiles_to_an_empty_module_with_no_errors() {
    let compiler = Compiler::new();
    let result = compiler.compile_source("");
    assert!(result.errors.is_empty());
    assert_eq!(&result.wasm_binary[0..8], &[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
    assert_eq!(result.wasm_binary.len(), 8); // no sections: nothing to declare
}
