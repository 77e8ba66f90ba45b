//! Class-file codec.
//!
//! Decodes a compiled JVM class into a [`ClassNode`] tree (the whole class in
//! memory, with method bodies as instruction lists) and encodes it back.
//! Downstream editing needs random access and repeated passes over methods,
//! so there is no streaming/visitor mode.
//!
//! The constant pool is retained as-is and only ever grows: instruction
//! operands and opaque attributes keep pointing at the same entries after
//! edits, and an unedited tree encodes back to the bytes it came from (for
//! class files that list `Code` first among a method's attributes, as javac
//! does).

pub mod code;
pub mod constant_pool;
mod io;
pub mod opcodes;

use thiserror::Error;

use crate::names::{NameError, TypeName};

pub use code::{ExceptionHandler, Instruction, Label, MethodBody, Operand};
pub use constant_pool::{Constant, ConstantPool, MemberRef};

use io::{ByteReader, ByteWriter};

const MAGIC: u32 = 0xCAFE_BABE;
const CODE: &str = "Code";

/// Access flag bits shared by classes, fields, and methods.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const BRIDGE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const VARARGS: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const STRICT: u16 = 0x0800;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
    pub const MODULE: u16 = 0x8000;
}

/// Errors raised while decoding or encoding a class file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("not a class file: bad magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("unexpected end of class file data at offset {offset}")]
    Truncated { offset: usize },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("constant #{index}: expected {expected}, found {found}")]
    UnexpectedConstant { index: u16, expected: &'static str, found: &'static str },
    #[error("unknown constant pool tag {tag} at entry #{index}")]
    UnknownConstantTag { tag: u8, index: u16 },
    #[error("constant #{index} is not valid modified UTF-8")]
    InvalidUtf8 { index: u16 },
    #[error("invalid type name in class file: {0}")]
    InvalidName(#[from] NameError),
    #[error("unknown opcode 0x{opcode:02x} at pc {pc}")]
    UnknownOpcode { opcode: u8, pc: usize },
    #[error("operand does not match opcode 0x{opcode:02x} at pc {pc}")]
    OperandMismatch { opcode: u8, pc: usize },
    #[error("malformed switch at pc {pc}")]
    InvalidSwitch { pc: usize },
    #[error("instruction at pc {pc} targets offset {target}, which is not an instruction boundary")]
    InvalidBranchTarget { pc: usize, target: i64 },
    #[error("label {label} is outside the method body ({len} instructions)")]
    InvalidLabel { label: u32, len: usize },
    #[error("branch from instruction {from} to {to} needs offset {offset}, which does not fit")]
    BranchOutOfRange { from: usize, to: usize, offset: i64 },
    #[error("attribute '{name}' declares {declared} bytes but {consumed} were decoded")]
    AttributeLength { name: String, declared: usize, consumed: usize },
    #[error("{0} trailing bytes after class file")]
    TrailingBytes(usize),
    #[error("constant pool overflow: more than 65535 entries")]
    ConstantPoolOverflow,
    #[error("{what} too large for the class-file format: {len}")]
    TooLarge { what: &'static str, len: usize },
}

/// `major.minor` class-file version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl ClassVersion {
    /// Java 8, the oldest version most agents still emit.
    pub const JAVA_8: ClassVersion = ClassVersion { major: 52, minor: 0 };
}

/// Attribute kept as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<RawAttribute>,
}

impl FieldNode {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self { access, name: name.into(), descriptor: descriptor.into(), attributes: Vec::new() }
    }
}

/// A method; `body` is `None` for abstract and native methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub body: Option<MethodBody>,
    pub attributes: Vec<RawAttribute>,
}

impl MethodNode {
    pub fn new(
        access: u16,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        body: Option<MethodBody>,
    ) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            body,
            attributes: Vec::new(),
        }
    }

    /// Abstract and native methods cannot carry a body.
    pub fn is_bodiless(&self) -> bool {
        self.access & (access::ABSTRACT | access::NATIVE) != 0
    }
}

/// In-memory tree of one class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    pub version: ClassVersion,
    pub access: u16,
    pub name: TypeName,
    /// `None` only for `java/lang/Object` and `module-info`.
    pub super_name: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
    pub attributes: Vec<RawAttribute>,
    pub constant_pool: ConstantPool,
}

impl ClassNode {
    /// Empty public class with a fresh constant pool.
    pub fn new(name: TypeName, super_name: Option<TypeName>) -> Self {
        Self {
            version: ClassVersion::JAVA_8,
            access: access::PUBLIC | access::SUPER,
            name,
            super_name,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            constant_pool: ConstantPool::new(),
        }
    }

    /// Encode the tree. The stored pool is not modified; names introduced by
    /// edits are interned into a copy.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassFileError> {
        let mut pool = self.constant_pool.clone();
        let mut body = ByteWriter::new();

        body.u16(self.access);
        body.u16(pool.intern_class(self.name.as_internal())?);
        match &self.super_name {
            Some(super_name) => body.u16(pool.intern_class(super_name.as_internal())?),
            None => body.u16(0),
        }

        body.count("interfaces", self.interfaces.len())?;
        for interface in &self.interfaces {
            body.u16(pool.intern_class(interface.as_internal())?);
        }

        body.count("fields", self.fields.len())?;
        for field in &self.fields {
            body.u16(field.access);
            body.u16(pool.intern_utf8(&field.name)?);
            body.u16(pool.intern_utf8(&field.descriptor)?);
            write_attributes(&mut body, &field.attributes, &mut pool)?;
        }

        body.count("methods", self.methods.len())?;
        for method in &self.methods {
            body.u16(method.access);
            body.u16(pool.intern_utf8(&method.name)?);
            body.u16(pool.intern_utf8(&method.descriptor)?);

            let code = match &method.body {
                Some(code) => Some(RawAttribute { name: CODE.to_string(), data: code.encode(&mut pool)? }),
                None => None,
            };
            let attributes: Vec<&RawAttribute> = code.iter().chain(&method.attributes).collect();
            body.count("method attributes", attributes.len())?;
            for attribute in attributes {
                write_attribute(&mut body, attribute, &mut pool)?;
            }
        }

        write_attributes(&mut body, &self.attributes, &mut pool)?;

        let mut out = ByteWriter::new();
        out.u32(MAGIC);
        out.u16(self.version.minor);
        out.u16(self.version.major);
        pool.write(&mut out)?;
        out.bytes(&body.into_inner());
        Ok(out.into_inner())
    }
}

/// Decode a complete class file.
pub fn parse(bytes: &[u8]) -> Result<ClassNode, ClassFileError> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    let minor = reader.u16()?;
    let major = reader.u16()?;
    let constant_pool = ConstantPool::read(&mut reader)?;

    let access = reader.u16()?;
    let name = TypeName::new(constant_pool.class_name(reader.u16()?)?)?;
    let super_name = match reader.u16()? {
        0 => None,
        index => Some(TypeName::new(constant_pool.class_name(index)?)?),
    };

    let interface_count = reader.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(TypeName::new(constant_pool.class_name(reader.u16()?)?)?);
    }

    let field_count = reader.u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let access = reader.u16()?;
        let name = constant_pool.utf8(reader.u16()?)?.to_string();
        let descriptor = constant_pool.utf8(reader.u16()?)?.to_string();
        let attributes = read_attributes(&mut reader, &constant_pool)?;
        fields.push(FieldNode { access, name, descriptor, attributes });
    }

    let method_count = reader.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let access = reader.u16()?;
        let name = constant_pool.utf8(reader.u16()?)?.to_string();
        let descriptor = constant_pool.utf8(reader.u16()?)?.to_string();
        let mut body = None;
        let mut attributes = Vec::new();
        for attribute in read_attributes(&mut reader, &constant_pool)? {
            if attribute.name == CODE && body.is_none() {
                body = Some(MethodBody::decode(&attribute.data, &constant_pool)?);
            } else {
                attributes.push(attribute);
            }
        }
        methods.push(MethodNode { access, name, descriptor, body, attributes });
    }

    let attributes = read_attributes(&mut reader, &constant_pool)?;

    if reader.remaining() != 0 {
        return Err(ClassFileError::TrailingBytes(reader.remaining()));
    }

    Ok(ClassNode {
        version: ClassVersion { major, minor },
        access,
        name,
        super_name,
        interfaces,
        fields,
        methods,
        attributes,
        constant_pool,
    })
}

pub(crate) fn read_attributes(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<RawAttribute>, ClassFileError> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.utf8(reader.u16()?)?.to_string();
        let len = reader.u32()? as usize;
        let data = reader.bytes(len)?.to_vec();
        attributes.push(RawAttribute { name, data });
    }
    Ok(attributes)
}

pub(crate) fn write_attributes(
    writer: &mut ByteWriter,
    attributes: &[RawAttribute],
    pool: &mut ConstantPool,
) -> Result<(), ClassFileError> {
    writer.count("attributes", attributes.len())?;
    for attribute in attributes {
        write_attribute(writer, attribute, pool)?;
    }
    Ok(())
}

fn write_attribute(
    writer: &mut ByteWriter,
    attribute: &RawAttribute,
    pool: &mut ConstantPool,
) -> Result<(), ClassFileError> {
    writer.u16(pool.intern_utf8(&attribute.name)?);
    writer.blob("attribute", &attribute.data)
}
