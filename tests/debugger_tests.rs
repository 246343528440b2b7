use assert_cmd::Command;
use predicates::str::{contains, diff};

fn debug(file: &str, commands: &str) -> Command {
    let mut cmd = Command::cargo_bin("simple8").unwrap();
    cmd.arg("debug")
        .arg(file)
        .arg("--minimal")
        .arg("--command")
        .arg(commands);
    cmd
}

#[test]
fn debugs_multiply() {
    let mut cmd = debug(
        "tests/files/multiply.asm",
        include_str!("commands/multiply"),
    );

    cmd.assert()
        .success()
        .stdout(contains("Completed"))
        .stderr(diff(
            include_str!("expected/multiply").replace("\r\n", "\n"),
        ));
}

#[test]
fn prints_help_message() {
    let mut cmd = debug("tests/files/add.asm", "help");
    cmd.assert().success().stderr(diff(format!(
        "\n{}\n",
        include_str!("../src/debugger/help.txt")
    )));
}

#[test]
fn end_of_input_quits() {
    let mut cmd = debug("tests/files/add.asm", "step 3");
    cmd.assert()
        .success()
        .stderr(diff("Executed 3 instructions.\n"))
        .stdout(contains("Completed"));

    let mut cmd = debug("tests/files/add.asm", "step 3;registers");
    cmd.assert()
        .success()
        .stderr(contains("Executed 3 instructions."))
        .stderr(contains("Registers: A: 08  B: 03  C: 00"));
}

#[test]
fn reports_invalid_commands() {
    let mut cmd = debug("tests/files/add.asm", "jump 4; break; get D!");
    cmd.assert().success().stderr(diff(
        "Not a command: `jump`.\n\
         Type `help` for a list of commands.\n\
         Missing subcommand: `break (add|remove|list)`.\n\
         Type `help` for a list of commands.\n\
         In command `get`:\n    Invalid value for `location`: `D!`.\n\
         Type `help` for a list of commands.\n",
    ));
}

#[test]
fn sets_memory_and_registers() {
    let mut cmd = debug(
        "tests/files/add.asm",
        "set b 0x10; set result 7; get b; get result; continue; get a; get result",
    );
    cmd.assert().success().stderr(diff(
        "Updated register B.\n\
         Updated memory at address 0x08.\n\
         0x10\n\
         0x07\n\
         Reached HLT. Pausing execution.\n\
         Executed 5 instructions.\n\
         0x08\n\
         0x08\n",
    ));
}

#[test]
fn resets_to_initial_state() {
    let mut cmd = debug(
        "tests/files/add.asm",
        "continue; reset; get ip; get a; step; get a",
    );
    cmd.assert().success().stderr(diff(
        "Reached HLT. Pausing execution.\n\
         Executed 5 instructions.\n\
         Reset program to initial state.\n\
         0x00\n\
         0x00\n\
         Executed 1 instruction.\n\
         0x05\n",
    ));
}

#[test]
fn manages_breakpoints() {
    let mut cmd = debug(
        "tests/files/multiply.asm",
        "break add loop; b a 0x0A; break add LOOP; break list; b r 4; b r 4; break list",
    );
    cmd.assert().success().stderr(diff(
        "Added breakpoint at 0x04.\n\
         Added breakpoint at 0x0A.\n\
         Breakpoint already exists at 0x04.\n\
         0x04\n\
         0x0A\n\
         Removed breakpoint at 0x04.\n\
         No breakpoint exists at 0x04.\n\
         0x0A\n",
    ));
}

#[test]
fn dumps_memory() {
    let mut cmd = debug("tests/files/add.asm", "dump 0 0x0F; dump 0x10 0x00");
    cmd.assert().success().stderr(diff(
        "00: 20 05 21 03 02 26 08 3F 00 00 00 00 00 00 00 00\n\
         Start address is after end address.\n",
    ));
}

#[test]
fn invalid_opcode_is_fatal() {
    let mut cmd = debug("tests/files/add.asm", "set 7 0x3E; continue; step");
    cmd.assert()
        .failure()
        .stderr(contains("Updated memory at address 0x07."))
        .stderr(contains("invalid opcode 0x00 at address 0x09"));
}
