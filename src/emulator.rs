//! Emulator for executing ReTI machine code.
//!
//! The machine state is four registers plus two word-addressed memories:
//! the code image, whose valid range is fixed by its length, and the data
//! memory, which is sparse and tracks a validity bit per word.  [Emulator::step]
//! performs one fetch/decode/execute round and returns a structured [Step]
//! record; [Emulator::run] loops until the machine halts or faults.
//!
//! Halting conditions (see [Halt]): PC reaching one past the code image
//! (the clean exit), PC jumping strictly beyond it (warned), a step that
//! leaves PC unchanged (any jump to self), and the optional step limit.
//! Illegal instructions and writes above the configured capacity are
//! errors ([RuntimeError]) instead.

use std::collections::BTreeMap;
use std::fmt;

use crate::instruction::{sign_extend, Instruction, JumpCondition, OpCode, Register};

/// Words per lazily allocated page of the data memory.
const PAGE_WORDS: usize = 1 << 14;

/// Default capacity of the code and data areas: 2^32 words each.
pub const DEFAULT_CAPACITY: u64 = 1 << 32;

struct Page {
    words: Box<[u32]>,
    valid: Box<[u64]>,
}

impl Page {
    fn new() -> Page {
        Page {
            words: vec![0; PAGE_WORDS].into_boxed_slice(),
            valid: vec![0; PAGE_WORDS / 64].into_boxed_slice(),
        }
    }

    fn is_valid(&self, offset: usize) -> bool {
        (self.valid[offset / 64] >> (offset % 64)) & 1 != 0
    }

    fn mark_valid(&mut self, offset: usize) {
        self.valid[offset / 64] |= 1 << (offset % 64);
    }
}

/// Sparse word-addressed memory with a validity bit per word.
///
/// Pages of 16 K words are allocated on first write, so the full 2^32 word
/// address space costs only what the program touches.
#[derive(Default)]
pub struct Memory {
    pages: BTreeMap<u32, Page>,
}

impl Default for Page {
    fn default() -> Page {
        Page::new()
    }
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            pages: BTreeMap::new(),
        }
    }

    /// The word at `address`; unwritten words read as zero.
    pub fn read(&self, address: u32) -> u32 {
        let page = (address as usize / PAGE_WORDS) as u32;
        let offset = address as usize % PAGE_WORDS;

        match self.pages.get(&page) {
            Some(page) => page.words[offset],
            None => 0,
        }
    }

    /// Whether the word at `address` has ever been written.
    pub fn is_valid(&self, address: u32) -> bool {
        let page = (address as usize / PAGE_WORDS) as u32;
        let offset = address as usize % PAGE_WORDS;

        match self.pages.get(&page) {
            Some(page) => page.is_valid(offset),
            None => false,
        }
    }

    /// Writes the word at `address` and marks it valid.
    pub fn write(&mut self, address: u32, word: u32) {
        let page = (address as usize / PAGE_WORDS) as u32;
        let offset = address as usize % PAGE_WORDS;

        let page = self.pages.entry(page).or_default();
        page.words[offset] = word;
        page.mark_valid(offset);
    }

    /// All valid words in ascending address order.
    pub fn iter_valid<'a>(&'a self) -> impl Iterator<Item = (u32, u32)> + 'a {
        self.pages.iter().flat_map(|(&index, page)| {
            let base = index * PAGE_WORDS as u32;
            (0..PAGE_WORDS).filter_map(move |offset| {
                if page.is_valid(offset) {
                    Some((base + offset as u32, page.words[offset]))
                } else {
                    None
                }
            })
        })
    }
}

/// What to do when an instruction reads a data word that was never
/// initialized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UninitializedRead {
    /// Abort execution with [RuntimeError::UninitializedRead].
    Strict,
    /// Emit a [Warning] and read the word as zero.
    Warn,
    /// Read the word as zero without a diagnostic.
    Quiet,
}

impl Default for UninitializedRead {
    fn default() -> UninitializedRead {
        UninitializedRead::Warn
    }
}

/// Why the emulator stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Halt {
    /// PC reached exactly one past the code image, the clean exit.
    EndOfCode,
    /// PC jumped strictly past the code image.
    AboveCode { pc: u32 },
    /// The executed step left PC unchanged.
    SelfLoop,
    /// The configured step limit was reached.
    StepLimit,
}

/// Fatal conditions that abort execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    IllegalInstruction { pc: u32, word: u32 },
    WriteAboveCapacity { address: u32, capacity: u64 },
    /// Only raised under [UninitializedRead::Strict].
    UninitializedRead { address: u32 },
    CodeCapacityReached,
    DataCapacityReached,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::IllegalInstruction { pc, word } => {
                write!(f, "illegal instruction 0x{:08x} at 'code[0x{:08x}]'", word, pc)
            }
            RuntimeError::WriteAboveCapacity { address, capacity } => write!(
                f,
                "can not write 'data[0x{:x}]' above address 0x{:x}",
                address,
                capacity - 1
            ),
            RuntimeError::UninitializedRead { address } => {
                write!(f, "read uninitialized 'data[0x{:x}]'", address)
            }
            RuntimeError::CodeCapacityReached => write!(f, "capacity of code area reached"),
            RuntimeError::DataCapacityReached => write!(f, "capacity of data area reached"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Diagnostics that do not stop execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    UninitializedRead { address: u32 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::UninitializedRead { address } => {
                write!(f, "read uninitialized 'data[0x{:x}]'", address)
            }
        }
    }
}

/// The computation performed by the compute class, for trace rendering.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Subtract,
    Add,
    Xor,
    Or,
    And,
}

impl Operator {
    fn symbol(self) -> &'static str {
        match self {
            Operator::Subtract => "-",
            Operator::Add => "+",
            Operator::Xor => "^",
            Operator::Or => "|",
            Operator::And => "&",
        }
    }

    /// Arithmetic operators trace in signed decimal, bitwise ones in hex.
    fn is_arithmetic(self) -> bool {
        match self {
            Operator::Subtract | Operator::Add => true,
            _ => false,
        }
    }
}

/// Where the second operand of a compute instruction came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Immediate(u32),
    Memory(u32),
}

/// The observable effect of one executed instruction.
///
/// `Display` renders the human-readable action column of the stepping
/// trace; the record itself stays cheap to build when tracing is off.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// NOP.
    None,
    LoadImmediate {
        destination: Register,
        value: u32,
    },
    LoadMemory {
        destination: Register,
        address: u32,
        value: u32,
    },
    StoreMemory {
        address: u32,
        value: u32,
    },
    Move {
        source: Register,
        destination: Register,
        value: u32,
    },
    Compute {
        destination: Register,
        operator: Operator,
        operand: Operand,
        before: u32,
        value: u32,
        result: u32,
    },
    JumpTaken {
        condition: JumpCondition,
        immediate: u32,
        from: u32,
        target: u32,
        acc: u32,
    },
    JumpNotTaken {
        condition: JumpCondition,
        acc: u32,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Action::None => Ok(()),
            Action::LoadImmediate { destination, value } => {
                write!(f, "{} = [0x{:08x}]", destination, value)
            }
            Action::LoadMemory {
                destination,
                address,
                value,
            } => write!(f, "{} = M(0x{:x}) = [0x{:08x}]", destination, address, value),
            Action::StoreMemory { address, value } => {
                write!(f, "M(0x{:x}) = ACC = [0x{:08x}]", address, value)
            }
            Action::Move {
                source,
                destination,
                value,
            } => write!(f, "{} = {} = [0x{:08x}]", destination, source, value),
            Action::Compute {
                destination,
                operator,
                operand,
                before,
                value,
                result,
            } => {
                let op = operator.symbol();

                if operator.is_arithmetic() {
                    let value = match operand {
                        Operand::Immediate(immediate) => sign_extend(immediate),
                        Operand::Memory(_) => value as i32,
                    };
                    match operand {
                        Operand::Immediate(immediate) => write!(
                            f,
                            "{} = {} {} [0x{:x}] = {} {} {} = {} = [0x{:08x}]",
                            destination,
                            destination,
                            op,
                            immediate,
                            before as i32,
                            op,
                            value,
                            result as i32,
                            result
                        ),
                        Operand::Memory(address) => write!(
                            f,
                            "{} = {} {} M(0x{:x}) = {} {} {} = {} = [0x{:08x}]",
                            destination,
                            destination,
                            op,
                            address,
                            before as i32,
                            op,
                            value,
                            result as i32,
                            result
                        ),
                    }
                } else {
                    match operand {
                        Operand::Immediate(immediate) => write!(
                            f,
                            "{} = {} {} 0x{:x} = 0x{:x} {} 0x{:x} = 0x{:x}",
                            destination, destination, op, immediate, before, op, value, result
                        ),
                        Operand::Memory(address) => write!(
                            f,
                            "{} = {} {} M(0x{:x}) = 0x{:x} {} 0x{:x} = 0x{:x}",
                            destination, destination, op, address, before, op, value, result
                        ),
                    }
                }
            }
            Action::JumpTaken {
                condition,
                immediate,
                from,
                target,
                acc,
            } => {
                write!(
                    f,
                    "PC = PC + [0x{:x}] = {} + {} = {} = 0x{:x}",
                    immediate,
                    from,
                    sign_extend(immediate),
                    target,
                    target
                )?;

                if condition != JumpCondition::Unconditional {
                    write!(
                        f,
                        " as {} = [0x{:x}] = ACC {} 0",
                        acc as i32,
                        acc,
                        condition.symbol()
                    )?;
                }

                Ok(())
            }
            Action::JumpNotTaken { condition, acc } => write!(
                f,
                "no jump as {} = [0x{:x}] = ACC {} 0",
                acc as i32,
                acc,
                condition.complement_symbol()
            ),
        }
    }
}

/// One fetch/decode/execute round.
///
/// The register fields hold the values observed before the step's writes.
#[derive(Clone, Debug)]
pub struct Step {
    /// Number of steps executed before this one.
    pub steps: u64,
    pub pc: u32,
    pub in1: u32,
    pub in2: u32,
    pub acc: u32,
    /// The fetched word, if PC was inside the code image.
    pub word: Option<u32>,
    pub instruction: Option<Instruction>,
    pub action: Action,
    pub warning: Option<Warning>,
    /// Set when this step stopped the machine.
    pub halt: Option<Halt>,
}

impl Step {
    /// The column header matching [Step::trace_row].
    pub fn trace_header() -> String {
        format!(
            "{:>5} {:<8} {:<8} {:<8} {:<8} {:<8}  {:<21} {}",
            "STEPS", "PC", "CODE", "IN1", "IN2", "ACC", "INSTRUCTION", "ACTION"
        )
    }

    /// One row of the stepping trace, or `None` for the step-limit stop
    /// which has no instruction to show.
    pub fn trace_row(&self) -> Option<String> {
        let code = match self.word {
            Some(word) => format!("{:08x}", word),
            None => {
                if self.halt == Some(Halt::StepLimit) {
                    return None;
                }
                String::from("        ")
            }
        };

        let name = if self.halt == Some(Halt::SelfLoop) {
            String::from("<infinite-loop>")
        } else {
            match &self.instruction {
                Some(instruction) => instruction.to_string(),
                None => String::from("<undefined>"),
            }
        };

        Some(format!(
            "{:>5} {:08x} {} {:08x} {:08x} {:08x}  {:<21} {}",
            self.steps, self.pc, code, self.in1, self.in2, self.acc, name, self.action
        ))
    }
}

/// The ReTI machine: registers, code image and data memory, plus the
/// shadow bookkeeping of the simulator.
pub struct Emulator {
    code: Vec<u32>,
    pub data: Memory,
    pub pc: u32,
    pub acc: u32,
    pub in1: u32,
    pub in2: u32,
    /// Exclusive upper bound of the valid data region.
    data_hi: u64,
    steps: u64,
    capacity: u64,
    step_limit: Option<u64>,
    policy: UninitializedRead,
}

impl Emulator {
    /// Creates a machine with the default 2^32 word capacity.
    pub fn new(code: Vec<u32>) -> Emulator {
        match Emulator::with_capacity(code, DEFAULT_CAPACITY) {
            Ok(emulator) => emulator,
            // A Vec<u32> can never exceed 2^32 elements here.
            Err(_) => unreachable!(),
        }
    }

    /// Creates a machine whose code and data areas hold at most
    /// `capacity` words each.
    pub fn with_capacity(code: Vec<u32>, capacity: u64) -> Result<Emulator, RuntimeError> {
        if code.len() as u64 > capacity {
            return Err(RuntimeError::CodeCapacityReached);
        }

        Ok(Emulator {
            code,
            data: Memory::new(),
            pc: 0,
            acc: 0,
            in1: 0,
            in2: 0,
            data_hi: 0,
            steps: 0,
            capacity,
            step_limit: None,
            policy: UninitializedRead::default(),
        })
    }

    /// Loads the data image into addresses `0..words.len()` and marks them
    /// valid.
    pub fn load_data(&mut self, words: &[u32]) -> Result<(), RuntimeError> {
        if words.len() as u64 > self.capacity {
            return Err(RuntimeError::DataCapacityReached);
        }

        for (address, &word) in words.iter().enumerate() {
            self.data.write(address as u32, word);
        }

        if words.len() as u64 > self.data_hi {
            self.data_hi = words.len() as u64;
        }

        Ok(())
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    pub fn set_policy(&mut self, policy: UninitializedRead) {
        self.policy = policy;
    }

    /// Number of words in the code image.
    pub fn code_len(&self) -> u64 {
        self.code.len() as u64
    }

    /// Exclusive upper bound of the valid data region.
    pub fn data_high_water(&self) -> u64 {
        self.data_hi
    }

    /// Number of steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn register(&self, register: Register) -> u32 {
        match register {
            Register::Pc => self.pc,
            Register::In1 => self.in1,
            Register::In2 => self.in2,
            Register::Acc => self.acc,
        }
    }

    fn write_register(&mut self, register: Register, value: u32) {
        match register {
            Register::Pc => self.pc = value,
            Register::In1 => self.in1 = value,
            Register::In2 => self.in2 = value,
            Register::Acc => self.acc = value,
        }
    }

    fn read_data(
        &self,
        address: u32,
        warning: &mut Option<Warning>,
    ) -> Result<u32, RuntimeError> {
        let initialized = (address as u64) < self.data_hi && self.data.is_valid(address);

        if !initialized {
            match self.policy {
                UninitializedRead::Strict => {
                    return Err(RuntimeError::UninitializedRead { address })
                }
                UninitializedRead::Warn => {
                    *warning = Some(Warning::UninitializedRead { address })
                }
                UninitializedRead::Quiet => {}
            }
        }

        Ok(self.data.read(address))
    }

    /// Executes one instruction.
    ///
    /// Returns the step record; a record with [Step::halt] set means the
    /// machine stopped and further calls keep reporting the stop.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let pc = self.pc;
        let (in1, in2, acc) = (self.in1, self.in2, self.acc);
        let steps = self.steps;

        let stopped = |halt| Step {
            steps,
            pc,
            in1,
            in2,
            acc,
            word: None,
            instruction: None,
            action: Action::None,
            warning: None,
            halt: Some(halt),
        };

        if let Some(limit) = self.step_limit {
            if steps >= limit {
                return Ok(stopped(Halt::StepLimit));
            }
        }

        let code_len = self.code.len() as u64;
        if pc as u64 >= code_len {
            let halt = if pc as u64 > code_len {
                Halt::AboveCode { pc }
            } else {
                Halt::EndOfCode
            };
            return Ok(stopped(halt));
        }

        let word = self.code[pc as usize];
        let instruction = match Instruction::decode(word) {
            Some(instruction) => instruction,
            None => return Err(RuntimeError::IllegalInstruction { pc, word }),
        };

        let destination = instruction.destination;
        let immediate = instruction.immediate;

        let mut pc_next = pc.wrapping_add(1);
        let mut warning = None;
        let mut register_write: Option<(Register, u32)> = None;
        let mut memory_write: Option<(u32, u32)> = None;

        let action = match instruction.opcode {
            OpCode::Load | OpCode::LoadIn1 | OpCode::LoadIn2 => {
                let address = match instruction.opcode {
                    OpCode::Load => immediate,
                    OpCode::LoadIn1 => in1.wrapping_add(immediate),
                    _ => in2.wrapping_add(immediate),
                };
                let value = self.read_data(address, &mut warning)?;
                register_write = Some((destination, value));
                Action::LoadMemory {
                    destination,
                    address,
                    value,
                }
            }

            OpCode::LoadImmediate => {
                register_write = Some((destination, immediate));
                Action::LoadImmediate {
                    destination,
                    value: immediate,
                }
            }

            OpCode::Store | OpCode::StoreIn1 | OpCode::StoreIn2 => {
                let address = match instruction.opcode {
                    OpCode::Store => immediate,
                    OpCode::StoreIn1 => in1.wrapping_add(immediate),
                    _ => in2.wrapping_add(immediate),
                };
                memory_write = Some((address, acc));
                Action::StoreMemory {
                    address,
                    value: acc,
                }
            }

            OpCode::Move => {
                let value = self.register(instruction.source);
                register_write = Some((destination, value));
                Action::Move {
                    source: instruction.source,
                    destination,
                    value,
                }
            }

            OpCode::SubtractImmediate
            | OpCode::AddImmediate
            | OpCode::XorImmediate
            | OpCode::OrImmediate
            | OpCode::AndImmediate => {
                let before = self.register(destination);
                let (operator, result) = match instruction.opcode {
                    OpCode::SubtractImmediate => (
                        Operator::Subtract,
                        before.wrapping_sub(sign_extend(immediate) as u32),
                    ),
                    OpCode::AddImmediate => (
                        Operator::Add,
                        before.wrapping_add(sign_extend(immediate) as u32),
                    ),
                    OpCode::XorImmediate => (Operator::Xor, before ^ immediate),
                    OpCode::OrImmediate => (Operator::Or, before | immediate),
                    _ => (Operator::And, before & immediate),
                };
                register_write = Some((destination, result));
                Action::Compute {
                    destination,
                    operator,
                    operand: Operand::Immediate(immediate),
                    before,
                    value: immediate,
                    result,
                }
            }

            OpCode::Subtract | OpCode::Add | OpCode::Xor | OpCode::Or | OpCode::And => {
                let address = immediate;
                let value = self.read_data(address, &mut warning)?;
                let before = self.register(destination);
                let (operator, result) = match instruction.opcode {
                    OpCode::Subtract => (Operator::Subtract, before.wrapping_sub(value)),
                    OpCode::Add => (Operator::Add, before.wrapping_add(value)),
                    OpCode::Xor => (Operator::Xor, before ^ value),
                    OpCode::Or => (Operator::Or, before | value),
                    _ => (Operator::And, before & value),
                };
                register_write = Some((destination, result));
                Action::Compute {
                    destination,
                    operator,
                    operand: Operand::Memory(address),
                    before,
                    value,
                    result,
                }
            }

            OpCode::NoOperation => Action::None,

            OpCode::Jump(condition) => {
                if condition.holds(acc) {
                    let target = pc.wrapping_add(sign_extend(immediate) as u32);
                    pc_next = target;
                    Action::JumpTaken {
                        condition,
                        immediate,
                        from: pc,
                        target,
                        acc,
                    }
                } else {
                    Action::JumpNotTaken { condition, acc }
                }
            }
        };

        // Register write first, then memory write, then the PC update.
        if let Some((register, value)) = register_write {
            self.write_register(register, value);
            if register == Register::Pc {
                pc_next = value;
            }
        }

        if let Some((address, value)) = memory_write {
            if address as u64 >= self.capacity {
                return Err(RuntimeError::WriteAboveCapacity {
                    address,
                    capacity: self.capacity,
                });
            }

            self.data.write(address, value);

            if address as u64 >= self.data_hi {
                self.data_hi = address as u64 + 1;
            }
        }

        self.steps += 1;

        let halt = if pc_next == pc {
            Some(Halt::SelfLoop)
        } else {
            None
        };

        self.pc = pc_next;

        Ok(Step {
            steps,
            pc,
            in1,
            in2,
            acc,
            word: Some(word),
            instruction: Some(instruction),
            action,
            warning,
            halt,
        })
    }

    /// Runs until the machine halts, feeding every step to `observer`.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<Halt, RuntimeError>
    where
        F: FnMut(&Step),
    {
        loop {
            let step = self.step()?;
            observer(&step);
            if let Some(halt) = step.halt {
                return Ok(halt);
            }
        }
    }

    /// Runs until the machine halts.
    pub fn run(&mut self) -> Result<Halt, RuntimeError> {
        self.run_with(|_| ())
    }

    /// The final image of the data memory: every valid word below the
    /// high-water mark, in ascending address order.
    pub fn dump(&self) -> Vec<(u32, u32)> {
        self.data.iter_valid().collect()
    }
}

/// The plain dump line for one data word.
pub fn dump_line(address: u32, word: u32) -> String {
    format!("{:08x} {:08x}", address, word)
}

/// The extended dump line used in step mode: the little-endian byte
/// breakdown, the bytes as ASCII with non-printables shown as `.`, and the
/// unsigned and signed decimal readings.
pub fn dump_line_verbose(address: u32, word: u32) -> String {
    let bytes = word.to_le_bytes();

    let ascii: String = bytes
        .iter()
        .map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        })
        .collect();

    format!(
        "{:08x} {:08x}  {:02x} {:02x} {:02x} {:02x}  {}  {:>10} {:>11}",
        address, word, bytes[0], bytes[1], bytes[2], bytes[3], ascii, word, word as i32
    )
}
