//! Bytecode helpers: opcode lengths, a small assembler and line lookup.

use crate::bytes::{put_u16, put_u32, ByteReader};
use crate::constant::Constant;
use crate::model::{Attribute, PoolRef, RefWidth};

/// Opcodes used by the assembler and the instruction scanner.
pub mod op {
    pub const ICONST_0: u8 = 0x03;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD_2: u8 = 0x1c;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ALOAD_1: u8 = 0x2b;
    pub const AASTORE: u8 = 0x53;
    pub const POP: u8 = 0x57;
    pub const DUP: u8 = 0x59;
    pub const IXOR: u8 = 0x82;
    pub const IINC: u8 = 0x84;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const IRETURN: u8 = 0xac;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
}

/// Operand byte count of a fixed-length instruction.
///
/// Returns `None` for the variable-length `tableswitch`, `lookupswitch` and
/// `wide`, and for unassigned opcodes.
pub(crate) fn operand_len(opcode: u8) -> Option<usize> {
    Some(match opcode {
        0x00..=0x0f => 0,
        0x10 => 1,
        0x11 => 2,
        0x12 => 1,
        0x13 | 0x14 => 2,
        0x15..=0x19 => 1,
        0x1a..=0x35 => 0,
        0x36..=0x3a => 1,
        0x3b..=0x83 => 0,
        0x84 => 2,
        0x85..=0x98 => 0,
        0x99..=0xa8 => 2,
        0xa9 => 1,
        0xac..=0xb1 => 0,
        0xb2..=0xb8 => 2,
        0xb9 | 0xba => 4,
        0xbb => 2,
        0xbc => 1,
        0xbd => 2,
        0xbe | 0xbf => 0,
        0xc0 | 0xc1 => 2,
        0xc2 | 0xc3 => 0,
        0xc5 => 3,
        0xc6 | 0xc7 => 2,
        0xc8 | 0xc9 => 4,
        0xca | 0xfe | 0xff => 0,
        _ => return None,
    })
}

/// Assembles a straight-line `Code` attribute.
///
/// Branches are not supported, so no `StackMapTable` is ever required.
#[derive(Debug)]
pub struct CodeBuilder {
    max_stack: u16,
    max_locals: u16,
    code: Vec<u8>,
    refs: Vec<PoolRef>,
    lines: Vec<(u16, u16)>,
}

impl CodeBuilder {
    pub fn new(max_stack: u16, max_locals: u16) -> Self {
        Self {
            max_stack,
            max_locals,
            code: Vec::new(),
            refs: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Current program counter.
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    /// Emit an instruction with no operands.
    pub fn op(&mut self, opcode: u8) -> &mut Self {
        self.code.push(opcode);
        self
    }

    /// Record that the next instruction starts source line `line`.
    pub fn line(&mut self, line: u16) -> &mut Self {
        self.lines.push((self.pc() as u16, line));
        self
    }

    /// Push an int constant with the shortest encoding.
    pub fn push_int(&mut self, value: i32) -> &mut Self {
        match value {
            -1..=5 => self.op((op::ICONST_0 as i32 + value) as u8),
            -128..=127 => {
                self.code.push(op::BIPUSH);
                self.code.push(value as i8 as u8);
                self
            }
            -32768..=32767 => {
                self.code.push(op::SIPUSH);
                self.code.extend_from_slice(&(value as i16).to_be_bytes());
                self
            }
            _ => self.ldc(Constant::Integer(value)),
        }
    }

    /// Load a constant: `ldc2_w` for long/double, `ldc` otherwise.
    pub fn ldc(&mut self, constant: Constant) -> &mut Self {
        if constant.is_wide() {
            self.cp_insn(op::LDC2_W, constant)
        } else {
            self.code.push(op::LDC);
            self.refs.push(PoolRef {
                offset: self.code.len(),
                width: RefWidth::U8,
                constant,
            });
            self.code.push(0);
            self
        }
    }

    pub fn field(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.cp_insn(opcode, Constant::field_ref(owner, name, descriptor))
    }

    pub fn method(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.cp_insn(opcode, Constant::method_ref(owner, name, descriptor))
    }

    /// `new`, `anewarray`, `checkcast` or `instanceof`.
    pub fn type_insn(&mut self, opcode: u8, class: &str) -> &mut Self {
        self.cp_insn(opcode, Constant::class(class))
    }

    fn cp_insn(&mut self, opcode: u8, constant: Constant) -> &mut Self {
        self.code.push(opcode);
        self.refs.push(PoolRef {
            offset: self.code.len(),
            width: RefWidth::U16,
            constant,
        });
        self.code.extend_from_slice(&[0, 0]);
        self
    }

    /// Finish into a `Code` attribute, with a `LineNumberTable` if lines were recorded.
    pub fn build(&self) -> Attribute {
        const HEADER: usize = 8;
        let mut body = Vec::with_capacity(HEADER + self.code.len() + 16);
        put_u16(&mut body, self.max_stack);
        put_u16(&mut body, self.max_locals);
        put_u32(&mut body, self.code.len() as u32);
        body.extend_from_slice(&self.code);
        put_u16(&mut body, 0);

        let mut refs: Vec<PoolRef> = self
            .refs
            .iter()
            .map(|r| PoolRef {
                offset: r.offset + HEADER,
                ..r.clone()
            })
            .collect();

        if self.lines.is_empty() {
            put_u16(&mut body, 0);
        } else {
            put_u16(&mut body, 1);
            refs.push(PoolRef {
                offset: body.len(),
                width: RefWidth::U16,
                constant: Constant::utf8("LineNumberTable"),
            });
            put_u16(&mut body, 0);
            put_u32(&mut body, 2 + 4 * self.lines.len() as u32);
            put_u16(&mut body, self.lines.len() as u16);
            for (pc, line) in &self.lines {
                put_u16(&mut body, *pc);
                put_u16(&mut body, *line);
            }
        }

        Attribute {
            name: "Code".into(),
            body,
            refs,
        }
    }
}

/// Lowest line number in a `Code` attribute's `LineNumberTable`s.
///
/// Malformed bodies yield `None`, the same as a method with no line table.
pub fn lowest_line(code: &Attribute) -> Option<u32> {
    let mut r = ByteReader::new(&code.body);
    r.skip(4).ok()?;
    let code_len = r.u32().ok()? as usize;
    r.skip(code_len).ok()?;
    let exceptions = r.u16().ok()? as usize;
    r.skip(exceptions * 8).ok()?;

    let mut lowest: Option<u32> = None;
    let attributes = r.u16().ok()?;
    for _ in 0..attributes {
        let name_offset = r.pos();
        r.skip(2).ok()?;
        let len = r.u32().ok()? as usize;
        let is_line_table = matches!(
            code.ref_at(name_offset),
            Some(Constant::Utf8(name)) if name == b"LineNumberTable"
        );
        if !is_line_table {
            r.skip(len).ok()?;
            continue;
        }
        let entries = r.u16().ok()?;
        for _ in 0..entries {
            r.skip(2).ok()?;
            let line = r.u16().ok()? as u32;
            lowest = Some(lowest.map_or(line, |l| l.min(line)));
        }
    }
    lowest
}
