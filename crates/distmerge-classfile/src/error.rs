//! Error types for class-file decoding and encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassError {
    #[error("invalid class magic: expected 0xCAFEBABE, got {0:#010X}")]
    InvalidMagic(u32),

    #[error("truncated class data at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid constant pool index {index} (pool size {size})")]
    BadPoolIndex { index: u16, size: usize },

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool entry {index}: expected {expected}, found {actual}")]
    UnexpectedConstant {
        index: u16,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("bootstrap method index {0} out of range")]
    BadBootstrapIndex(u16),

    #[error("constant pool entry {index} nests too deeply (cyclic reference?)")]
    ConstantTooDeep { index: u16 },

    #[error("unknown opcode {opcode:#04x} at pc {pc}")]
    UnknownOpcode { opcode: u8, pc: usize },

    #[error("malformed {attribute} attribute: {reason}")]
    MalformedAttribute { attribute: String, reason: String },

    #[error("invalid modified UTF-8 sequence")]
    InvalidUtf8,

    #[error("constant pool overflow: more than 65535 slots")]
    PoolOverflow,

    #[error("ldc operand index {0} does not fit in one byte")]
    LdcIndexOverflow(u16),

    #[error("{what} count {count} exceeds format limit")]
    TooMany { what: &'static str, count: usize },
}

pub type ClassResult<T> = Result<T, ClassError>;
