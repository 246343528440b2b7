use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

fn simple8() -> Command {
    Command::cargo_bin("simple8").unwrap()
}

#[test]
fn runs_without_arguments() {
    simple8().assert().success();
}

#[test]
fn runs_add() {
    let mut cmd = simple8();
    cmd.arg("run").arg("tests/files/add.asm").arg("--minimal");

    cmd.assert()
        .success()
        .stdout(contains("Halted"))
        .stdout(contains("Registers: A: 08  B: 03  C: 00"))
        .stdout(contains("Flags:     Z: 0  S: 0  V: 0  C: 0"))
        .stdout(contains(
            "00: 20 05 21 03 02 26 08 3F 08 00 00 00 00 00 00 00",
        ));
}

#[test]
fn runs_bare_path() {
    let mut cmd = simple8();
    cmd.arg("tests/files/multiply.asm");

    cmd.assert()
        .success()
        .stdout(contains("Halted"))
        .stdout(contains("A: 2A"));
}

#[test]
fn runs_subroutine() {
    let mut cmd = simple8();
    cmd.arg("run").arg("tests/files/call.asm").arg("--minimal");

    cmd.assert()
        .success()
        .stdout(contains("Registers: A: 2A  B: 15  C: 00"))
        .stdout(contains("80: 2A 00"))
        // Return address in the last byte of memory
        .stdout(contains("F0: 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 02"));
}

#[test]
fn traces_execution() {
    let mut cmd = simple8();
    cmd.arg("run")
        .arg("tests/files/add.asm")
        .arg("--minimal")
        .arg("--trace");
    cmd.assert()
        .success()
        .stderr("00: MVI A\n02: MVI B\n04: ADD B\n05: STA\n07: HLT\n");

    let mut cmd = simple8();
    cmd.env("SIMPLE8_TRACE", "1")
        .arg("run")
        .arg("tests/files/add.asm")
        .arg("--minimal");
    cmd.assert().success().stderr(contains("04: ADD B"));
}

#[test]
fn stops_at_step_limit() {
    let mut cmd = simple8();
    cmd.arg("run")
        .arg("tests/files/spin.asm")
        .arg("--minimal")
        .arg("--max-steps")
        .arg("100");
    cmd.assert().success().stdout(contains("step limit reached"));
}

#[test]
fn reports_invalid_opcode() {
    let mut cmd = simple8();
    cmd.arg("run").arg("tests/files/invalid.asm");
    cmd.assert()
        .failure()
        .stderr(contains("invalid opcode 0x27 at address 0x02"));
}

#[test]
fn checks_files() {
    let mut cmd = simple8();
    cmd.arg("check").arg("tests/files/multiply.asm");
    cmd.assert().success().stdout(contains("no errors found!"));

    let mut cmd = simple8();
    cmd.arg("check").arg("tests/files/unknown.asm");
    cmd.assert()
        .failure()
        .stderr(contains("line 2: unknown mnemonic `FOO`"))
        .stderr(contains("asm::unknown_mnemonic"));

    let mut cmd = simple8();
    cmd.arg("check").arg("tests/files/label_data.asm");
    cmd.assert()
        .failure()
        .stderr(contains("cannot be used as a data literal"));
}

#[test]
fn rejects_unknown_extension() {
    let mut cmd = simple8();
    cmd.arg("run").arg("Cargo.toml");
    cmd.assert()
        .failure()
        .stderr(contains("unknown extension"));
}

#[test]
fn compiles_binary_and_listing() {
    let dest = std::env::temp_dir().join(format!("simple8-add-{}.bin", std::process::id()));
    let mut cmd = simple8();
    cmd.arg("compile").arg("tests/files/add.asm").arg(&dest);
    cmd.assert().success().stdout(contains("Saved"));

    let bytes = fs::read(&dest).unwrap();
    assert_eq!(bytes, [0x20, 0x05, 0x21, 0x03, 0x02, 0x26, 0x08, 0x3F, 0x00]);

    let listing = fs::read_to_string(dest.with_extension("lst")).unwrap();
    assert!(listing.starts_with("00: 0x20 ; first operand\n01: 0x05\n"));
    assert!(listing.contains("08: 0x00 ; sum"));

    // Compiled binary runs the same as the source
    let mut cmd = simple8();
    cmd.arg("run").arg(&dest).arg("--minimal");
    cmd.assert()
        .success()
        .stdout(contains("Registers: A: 08  B: 03  C: 00"));

    let _ = fs::remove_file(&dest);
    let _ = fs::remove_file(dest.with_extension("lst"));
}
