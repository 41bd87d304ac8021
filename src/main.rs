//! Hack-16 Emulator - CLI Entry Point
//!
//! Commands:
//! - `hack16-emu run <program>` - Run a machine-code listing
//! - `hack16-emu disasm <program>` - Show a listing as mnemonics
//! - `hack16-emu test` - Run the built-in self-test

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hack16-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A gate-level simulator of the 16-bit Hack-style computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it falls off the end or hits the cycle limit
    Run {
        /// Path to the machine-code listing (16 '0'/'1' chars per line)
        program: String,
        /// Maximum number of clock cycles to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show a per-cycle trace
        #[arg(short, long)]
        trace: bool,
        /// Preload a RAM cell, e.g. --poke 0=100 (repeatable)
        #[arg(long, value_name = "ADDR=VALUE")]
        poke: Vec<String>,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Disassemble a machine-code listing
    Disasm {
        /// Path to the machine-code listing
        program: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            program,
            max_cycles,
            trace,
            poke,
            json,
        }) => {
            run_program(&program, max_cycles, trace, &poke, json);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Hack-16 Emulator v0.1.0");
            println!("A gate-level 16-bit computer simulator");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_gate_primitives();
        }
    }
}

/// Final machine state, for the `--json` report.
#[derive(serde::Serialize)]
struct RunReport {
    cycles: u64,
    cpu: hack16::CpuSnapshot,
    ram: Vec<(u16, u16)>,
}

fn parse_poke(arg: &str) -> Result<(u16, u16), String> {
    let (addr, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got '{arg}'"))?;
    let addr: u16 = addr
        .trim()
        .parse()
        .map_err(|_| format!("bad address in '{arg}'"))?;
    let value: i32 = value
        .trim()
        .parse()
        .map_err(|_| format!("bad value in '{arg}'"))?;
    Ok((addr, value as u16))
}

fn run_program(path: &str, max_cycles: u64, trace: bool, pokes: &[String], json: bool) {
    use hack16::{load_listing, Computer, MachineError};

    if !json {
        println!("🔧 Running: {path}");
    }

    let words = match load_listing(path) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Failed to load listing: {e}");
            std::process::exit(1);
        }
    };

    if words.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }
    if !json {
        println!("📂 Loaded {} instructions", words.len());
    }

    let mut machine = match Computer::new() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("❌ Failed to build the machine: {e}");
            std::process::exit(1);
        }
    };
    machine.load_program(&words);

    for arg in pokes {
        match parse_poke(arg) {
            Ok((addr, value)) => {
                if let Err(e) = machine.ram_mut().write(addr, value) {
                    eprintln!("❌ Bad --poke {arg}: {e}");
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("❌ Bad --poke: {e}");
                std::process::exit(1);
            }
        }
    }

    machine.reset();

    if !json {
        println!();
        println!("━━━ Execution ━━━");
    }

    let mut executed = 0u64;
    while executed < max_cycles {
        let pc = machine.cpu().instruction_address();
        if pc as usize >= machine.program().len() {
            break;
        }
        match machine.step() {
            Ok(instr) => {
                if trace {
                    let snap = machine.cpu().snapshot();
                    println!(
                        "{pc:5}: {instr}  A={} D={} PC={}",
                        snap.a as i16, snap.d as i16, snap.pc
                    );
                }
                executed += 1;
            }
            Err(MachineError::NoInstruction(_)) => break,
            Err(e) => {
                eprintln!("❌ Machine error at PC={pc}: {e}");
                std::process::exit(1);
            }
        }
    }

    let report = RunReport {
        cycles: executed,
        cpu: machine.cpu().snapshot(),
        ram: machine.ram().non_zero(),
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", report.cycles);
    println!("{}", report.cpu);
    if report.ram.is_empty() {
        println!("RAM: all cells zero");
    } else {
        println!("RAM (non-zero cells):");
        for (addr, value) in &report.ram {
            println!("  [{addr}] = {} ({})", value, *value as i16);
        }
    }

    if executed >= max_cycles {
        println!();
        println!("⚠️  Reached max cycles limit ({max_cycles}). Use --max-cycles to increase.");
    }
}

fn disassemble_file(path: &str) {
    use hack16::{disassemble, load_listing};

    println!("📖 Disassembling: {path}");
    println!();

    let words = match load_listing(path) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Failed to load listing: {e}");
            std::process::exit(1);
        }
    };

    print!("{}", disassemble(&words));
}

fn demo_gate_primitives() {
    use hack16::{AluOp, Circuit};

    println!("━━━ Gate-Level Demo ━━━");
    println!();

    let mut c = Circuit::new();
    let a = c.signal();
    let b = c.signal();
    let and = c.and_gate(a, b);
    let or = c.or_gate(a, b);
    let not = c.not_gate(a);
    c.set(a, true);
    c.set(b, false);
    c.settle();
    println!("Gates with a=1, b=0:");
    println!("  a AND b = {}", c.get(and) as u8);
    println!("  a OR b  = {}", c.get(or) as u8);
    println!("  NOT a   = {}", c.get(not) as u8);
    println!();

    let alu = c.alu(16);
    c.set_bus(&alu.x, 12345u16);
    c.set_bus(&alu.y, 6789u16);
    c.set_bus(&alu.control, AluOp::Add.code() as u16);
    c.settle();
    println!("ALU:");
    println!("  12345 + 6789 = {}", c.read_bus_signed(&alu.output));
    c.set_bus(&alu.control, AluOp::XMinusY.code() as u16);
    c.settle();
    println!("  12345 - 6789 = {}", c.read_bus_signed(&alu.output));
    println!();

    println!("✓ Core circuit primitives working!");
}

fn run_self_test() {
    use hack16::code::word::{encode, Dest, Instruction, Jump, YSource};
    use hack16::{AluOp, Circuit, Computer, Cpu};

    println!("━━━ Hack-16 Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    // Test 1: mux polarity
    print!("Mux selects second input on control=1... ");
    let mut c = Circuit::new();
    let a = c.bus(16);
    let b = c.bus(16);
    let select = c.signal();
    let out = c.mux(&a, &b, select).unwrap();
    c.set_bus(&a, 1);
    c.set_bus(&b, 2);
    c.set(select, true);
    c.settle();
    if c.read_bus(&out) == 2 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 2: counter advances
    print!("Counter advances by one... ");
    let mut c = Circuit::new();
    let ctr = c.counter(16);
    c.clock();
    c.clock();
    if c.read_bus(&ctr.output) == 2 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 3: ALU subtraction
    print!("ALU computes X-Y... ");
    let mut c = Circuit::new();
    let alu = c.alu(16);
    c.set_bus(&alu.x, 100);
    c.set_bus(&alu.y, 58);
    c.set_bus(&alu.control, AluOp::XMinusY.code() as u16);
    c.settle();
    if c.read_bus_signed(&alu.output) == 42 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 4: address instruction loads A
    print!("CPU address instruction... ");
    let mut cpu = Cpu::new().unwrap();
    cpu.load_instruction(5).unwrap();
    cpu.step();
    let snap = cpu.snapshot();
    if snap.a == 5 && snap.pc == 1 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 5: taken jump
    print!("CPU jump on zero... ");
    let mut cpu = Cpu::new().unwrap();
    cpu.load_instruction(7).unwrap();
    cpu.step();
    cpu.load_instruction(encode(&Instruction::Compute {
        op: AluOp::X,
        source: YSource::A,
        dest: Dest::NONE,
        jump: Jump::Jeq,
    }))
    .unwrap();
    cpu.step();
    if cpu.instruction_address() == 7 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 6: end-to-end sum through memory
    print!("Machine sums two RAM cells... ");
    let program = [
        encode(&Instruction::Address { value: 0 }),
        encode(&Instruction::Compute {
            op: AluOp::Y,
            source: YSource::M,
            dest: Dest::D,
            jump: Jump::Never,
        }),
        encode(&Instruction::Address { value: 1 }),
        encode(&Instruction::Compute {
            op: AluOp::Add,
            source: YSource::M,
            dest: Dest::D,
            jump: Jump::Never,
        }),
        encode(&Instruction::Address { value: 2 }),
        encode(&Instruction::Compute {
            op: AluOp::X,
            source: YSource::A,
            dest: Dest::M,
            jump: Jump::Never,
        }),
    ];
    let mut machine = Computer::with_ram_size(16).unwrap();
    machine.load_program(&program);
    machine.ram_mut().write(0, 100).unwrap();
    machine.ram_mut().write(1, 15).unwrap();
    machine.run(100).unwrap();
    if machine.ram().read(2).unwrap() == 115 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗ (got {:?})", machine.ram().read(2));
        failed += 1;
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {passed} passed, {failed} failed");

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
