//! Integration tests exercising the assembler library end-to-end, without
//! depending on fixture directories or shelling out to a subprocess.

use hack_assembler::assemble_lines;

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn assembles_add_program() {
    // Adds constants 2 and 3, stores the result in RAM[0].
    let out = assemble_lines(&lines(&[
        "@2", "D=A", "@3", "D=D+A", "@0", "M=D",
    ]))
    .unwrap();

    assert_eq!(
        out,
        vec![
            "0000000000000010",
            "1110110000010000",
            "0000000000000011",
            "1110000010010000",
            "0000000000000000",
            "1110001100001000",
        ]
    );
}

#[test]
fn assembles_max_program_with_labels_and_variables() {
    // Computes max(R0, R1) into R2, exercising labels, symbols and jumps.
    let out = assemble_lines(&lines(&[
        "@0",
        "D=M",
        "@1",
        "D=D-M",
        "@OUTPUT_FIRST",
        "D;JGT",
        "@1",
        "D=M",
        "@OUTPUT_D",
        "0;JMP",
        "(OUTPUT_FIRST)",
        "@0",
        "D=M",
        "(OUTPUT_D)",
        "@2",
        "M=D",
        "(INFINITE_LOOP)",
        "@INFINITE_LOOP",
        "0;JMP",
    ]))
    .unwrap();

    assert_eq!(out.len(), 16);
    assert!(out.iter().all(|line| line.len() == 16));
    // (OUTPUT_FIRST) binds to the instruction at ROM address 10.
    assert_eq!(out[4], "0000000000001010");
}

#[test]
fn reuses_the_same_ram_address_for_repeated_variables() {
    let out = assemble_lines(&lines(&["@counter", "M=0", "@counter", "M=M+1"])).unwrap();
    assert_eq!(out[0], out[2]);
    assert_eq!(out[0], "0000000000010000");
}

#[test]
fn unrecognized_mnemonics_fall_back_to_computing_zero() {
    // Matches code::comp's documented fallback: an unknown computation
    // mnemonic encodes as "0" rather than failing the assembly.
    let out = assemble_lines(&lines(&["D=NOTAREALMNEMONIC"])).unwrap();
    assert_eq!(out[0], "1110101010010000");
}
