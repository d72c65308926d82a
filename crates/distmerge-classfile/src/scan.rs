//! Locates constant pool references inside attribute bodies.
//!
//! Each known attribute layout is walked once during decoding; every pool
//! index encountered becomes a [`PoolRef`] so the attribute can be written
//! into a different pool later. Lengths never change, so nested attribute
//! lengths and code offsets stay valid.

use crate::bytes::ByteReader;
use crate::code::{op, operand_len};
use crate::error::{ClassError, ClassResult};
use crate::model::{Attribute, PoolRef, RefWidth};
use crate::pool::ConstantPool;

/// Decode an attribute body into an [`Attribute`] with resolved references.
pub(crate) fn scan_attribute(name: String, body: &[u8], pool: &ConstantPool) -> ClassResult<Attribute> {
    let mut scanner = Scanner {
        r: ByteReader::new(body),
        pool,
        refs: Vec::new(),
    };
    scanner.body(&name, body.len())?;

    let mut body = body.to_vec();
    for r in &scanner.refs {
        let width = match r.width {
            RefWidth::U8 => 1,
            RefWidth::U16 => 2,
        };
        body[r.offset..r.offset + width].fill(0);
    }
    Ok(Attribute {
        name,
        body,
        refs: scanner.refs,
    })
}

struct Scanner<'a> {
    r: ByteReader<'a>,
    pool: &'a ConstantPool,
    refs: Vec<PoolRef>,
}

impl Scanner<'_> {
    fn malformed(&self, attribute: &str, reason: impl Into<String>) -> ClassError {
        ClassError::MalformedAttribute {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    fn pool_ref(&mut self, width: RefWidth) -> ClassResult<()> {
        let offset = self.r.pos();
        let index = match width {
            RefWidth::U8 => self.r.u8()? as u16,
            RefWidth::U16 => self.r.u16()?,
        };
        if index != 0 {
            let constant = self.pool.resolve(index)?;
            self.refs.push(PoolRef {
                offset,
                width,
                constant,
            });
        }
        Ok(())
    }

    fn cp(&mut self) -> ClassResult<()> {
        self.pool_ref(RefWidth::U16)
    }

    fn cp_list(&mut self) -> ClassResult<()> {
        let count = self.r.u16()?;
        for _ in 0..count {
            self.cp()?;
        }
        Ok(())
    }

    fn body(&mut self, name: &str, end: usize) -> ClassResult<()> {
        match name {
            "ConstantValue" | "Signature" | "SourceFile" | "NestHost" | "ModuleMainClass" => {
                self.cp()?
            }
            "Exceptions" | "NestMembers" | "PermittedSubclasses" | "ModulePackages" => {
                self.cp_list()?
            }
            "EnclosingMethod" => {
                self.cp()?;
                self.cp()?;
            }
            "Code" => self.code()?,
            "StackMapTable" => self.stack_map_table()?,
            "LocalVariableTable" | "LocalVariableTypeTable" => {
                let count = self.r.u16()?;
                for _ in 0..count {
                    self.r.skip(4)?;
                    self.cp()?;
                    self.cp()?;
                    self.r.skip(2)?;
                }
            }
            "InnerClasses" => {
                let count = self.r.u16()?;
                for _ in 0..count {
                    self.cp()?;
                    self.cp()?;
                    self.cp()?;
                    self.r.skip(2)?;
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let count = self.r.u16()?;
                for _ in 0..count {
                    self.annotation()?;
                }
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let params = self.r.u8()?;
                for _ in 0..params {
                    let count = self.r.u16()?;
                    for _ in 0..count {
                        self.annotation()?;
                    }
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                let count = self.r.u16()?;
                for _ in 0..count {
                    self.type_annotation(name)?;
                }
            }
            "AnnotationDefault" => self.element_value()?,
            "MethodParameters" => {
                let count = self.r.u8()?;
                for _ in 0..count {
                    self.cp()?;
                    self.r.skip(2)?;
                }
            }
            "Module" => self.module()?,
            "Record" => {
                let count = self.r.u16()?;
                for _ in 0..count {
                    self.cp()?;
                    self.cp()?;
                    self.nested_attributes()?;
                }
            }
            "SourceDebugExtension" | "LineNumberTable" | "Synthetic" | "Deprecated" => {
                self.r.skip(end - self.r.pos())?;
            }
            _ => {
                tracing::warn!(attribute = name, "unknown attribute copied verbatim");
                self.r.skip(end - self.r.pos())?;
            }
        }

        if self.r.pos() != end {
            return Err(self.malformed(
                name,
                format!("expected {} bytes, layout covers {}", end, self.r.pos()),
            ));
        }
        Ok(())
    }

    fn nested_attributes(&mut self) -> ClassResult<()> {
        let count = self.r.u16()?;
        for _ in 0..count {
            let name_index_offset = self.r.pos();
            let name_index = self.r.u16()?;
            let name = self.pool.utf8(name_index)?;
            self.refs.push(PoolRef {
                offset: name_index_offset,
                width: RefWidth::U16,
                constant: self.pool.resolve(name_index)?,
            });
            let len = self.r.u32()? as usize;
            if self.r.remaining() < len {
                return Err(self.malformed(&name, "length exceeds enclosing attribute"));
            }
            let end = self.r.pos() + len;
            self.body(&name, end)?;
        }
        Ok(())
    }

    fn code(&mut self) -> ClassResult<()> {
        self.r.skip(4)?;
        let code_len = self.r.u32()? as usize;
        if self.r.remaining() < code_len {
            return Err(self.malformed("Code", "code length exceeds attribute"));
        }
        let code_start = self.r.pos();
        self.instructions(code_start, code_start + code_len)?;

        let handlers = self.r.u16()?;
        for _ in 0..handlers {
            self.r.skip(6)?;
            self.cp()?;
        }
        self.nested_attributes()
    }

    fn instructions(&mut self, start: usize, end: usize) -> ClassResult<()> {
        while self.r.pos() < end {
            let pc = self.r.pos() - start;
            let opcode = self.r.u8()?;
            match opcode {
                op::LDC => self.pool_ref(RefWidth::U8)?,
                op::LDC_W
                | op::LDC2_W
                | op::GETSTATIC..=op::INVOKESTATIC
                | op::NEW
                | op::ANEWARRAY
                | op::CHECKCAST
                | op::INSTANCEOF => self.cp()?,
                op::INVOKEINTERFACE | op::INVOKEDYNAMIC => {
                    self.cp()?;
                    self.r.skip(2)?;
                }
                op::MULTIANEWARRAY => {
                    self.cp()?;
                    self.r.skip(1)?;
                }
                op::TABLESWITCH => {
                    self.r.skip(switch_padding(pc))?;
                    self.r.skip(4)?;
                    let low = self.r.i32()? as i64;
                    let high = self.r.i32()? as i64;
                    if high < low {
                        return Err(self.malformed("Code", format!("tableswitch at pc {pc} has high < low")));
                    }
                    self.r.skip(((high - low + 1) * 4) as usize)?;
                }
                op::LOOKUPSWITCH => {
                    self.r.skip(switch_padding(pc))?;
                    self.r.skip(4)?;
                    let pairs = self.r.i32()?;
                    if pairs < 0 {
                        return Err(self.malformed("Code", format!("lookupswitch at pc {pc} has negative size")));
                    }
                    self.r.skip(pairs as usize * 8)?;
                }
                op::WIDE => {
                    let widened = self.r.u8()?;
                    self.r.skip(if widened == op::IINC { 4 } else { 2 })?;
                }
                _ => {
                    let len = operand_len(opcode).ok_or(ClassError::UnknownOpcode { opcode, pc })?;
                    self.r.skip(len)?;
                }
            }
        }
        if self.r.pos() != end {
            return Err(self.malformed("Code", "last instruction overruns code array"));
        }
        Ok(())
    }

    fn stack_map_table(&mut self) -> ClassResult<()> {
        let frames = self.r.u16()?;
        for _ in 0..frames {
            let frame_type = self.r.u8()?;
            match frame_type {
                0..=63 => {}
                64..=127 => self.verification_type()?,
                247 => {
                    self.r.skip(2)?;
                    self.verification_type()?;
                }
                248..=251 => self.r.skip(2)?,
                252..=254 => {
                    self.r.skip(2)?;
                    for _ in 0..(frame_type - 251) {
                        self.verification_type()?;
                    }
                }
                255 => {
                    self.r.skip(2)?;
                    for _ in 0..2 {
                        let count = self.r.u16()?;
                        for _ in 0..count {
                            self.verification_type()?;
                        }
                    }
                }
                _ => {
                    return Err(self.malformed(
                        "StackMapTable",
                        format!("reserved frame type {frame_type}"),
                    ))
                }
            }
        }
        Ok(())
    }

    fn verification_type(&mut self) -> ClassResult<()> {
        match self.r.u8()? {
            0..=6 => Ok(()),
            7 => self.cp(),
            8 => self.r.skip(2),
            tag => Err(self.malformed("StackMapTable", format!("unknown verification type {tag}"))),
        }
    }

    fn annotation(&mut self) -> ClassResult<()> {
        self.cp()?;
        let pairs = self.r.u16()?;
        for _ in 0..pairs {
            self.cp()?;
            self.element_value()?;
        }
        Ok(())
    }

    fn element_value(&mut self) -> ClassResult<()> {
        match self.r.u8()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => self.cp(),
            b'e' => {
                self.cp()?;
                self.cp()
            }
            b'@' => self.annotation(),
            b'[' => {
                let count = self.r.u16()?;
                for _ in 0..count {
                    self.element_value()?;
                }
                Ok(())
            }
            tag => Err(self.malformed("annotation", format!("unknown element tag {tag:#04x}"))),
        }
    }

    fn type_annotation(&mut self, attribute: &str) -> ClassResult<()> {
        let target_type = self.r.u8()?;
        match target_type {
            0x00 | 0x01 | 0x16 => self.r.skip(1)?,
            0x10 | 0x17 | 0x42..=0x46 => self.r.skip(2)?,
            0x11 | 0x12 => self.r.skip(2)?,
            0x13..=0x15 => {}
            0x40 | 0x41 => {
                let entries = self.r.u16()? as usize;
                self.r.skip(entries * 6)?;
            }
            0x47..=0x4B => self.r.skip(3)?,
            _ => {
                return Err(self.malformed(
                    attribute,
                    format!("unknown type annotation target {target_type:#04x}"),
                ))
            }
        }
        let path_len = self.r.u8()? as usize;
        self.r.skip(path_len * 2)?;
        self.annotation()
    }

    fn module(&mut self) -> ClassResult<()> {
        self.cp()?;
        self.r.skip(2)?;
        self.cp()?;

        let requires = self.r.u16()?;
        for _ in 0..requires {
            self.cp()?;
            self.r.skip(2)?;
            self.cp()?;
        }
        // exports, then opens: same shape
        for _ in 0..2 {
            let count = self.r.u16()?;
            for _ in 0..count {
                self.cp()?;
                self.r.skip(2)?;
                self.cp_list()?;
            }
        }
        self.cp_list()?;
        let provides = self.r.u16()?;
        for _ in 0..provides {
            self.cp()?;
            self.cp_list()?;
        }
        Ok(())
    }
}

/// Bytes of padding after a switch opcode at `pc`, aligning operands to 4.
fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}
