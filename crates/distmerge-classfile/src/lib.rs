//! JVM class file model for distmerge.
//!
//! Decodes a class into a [`ClassModel`] whose fields, methods and attributes
//! carry no constant pool indices, so members taken from one class can be
//! placed into another and re-encoded.
//!
//! # Architecture
//!
//! - **Constants** ([`Constant`]): pool entries resolved into owned values
//! - **Attributes** ([`Attribute`]): raw bodies plus the offsets of every pool reference
//! - **Annotations** ([`Annotation`]): runtime-visible annotations, decoded structurally
//! - **Codec** ([`decode`], [`encode`]): the encoder interns everything into a fresh pool
//! - **Assembler** ([`CodeBuilder`]): emits small straight-line method bodies

pub mod annotation;
mod bytes;
pub mod code;
pub mod constant;
pub mod error;
pub mod model;
pub mod mutf8;
pub mod pool;
mod reader;
mod scan;
mod writer;

pub use annotation::{Annotation, ElementValue};
pub use code::CodeBuilder;
pub use constant::Constant;
pub use error::{ClassError, ClassResult};
pub use model::{access, Annotated, Attribute, ClassModel, FieldEntry, InnerClassEntry, MethodEntry};
pub use reader::decode;
pub use writer::encode;
