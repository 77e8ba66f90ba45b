//! Constant pool decoding, lookup, and append-only interning.

use std::borrow::Cow;

use super::io::{ByteReader, ByteWriter};
use super::ClassFileError;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELD_REF: u8 = 9;
const TAG_METHOD_REF: u8 = 10;
const TAG_INTERFACE_METHOD_REF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// One constant pool slot. Floating point values keep their raw IEEE bits so
/// pools compare structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0 and the upper half of `Long`/`Double` entries.
    Unusable,
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class { name: u16 },
    String { value: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap_method: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap_method: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
}

impl Constant {
    /// Human-readable kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Constant::Unusable => "unusable",
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::String { .. } => "String",
            Constant::FieldRef { .. } => "Fieldref",
            Constant::MethodRef { .. } => "Methodref",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module { .. } => "Module",
            Constant::Package { .. } => "Package",
        }
    }

    /// Long and double constants occupy two slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Resolved symbolic reference to a field or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Constant pool of one class. Index 0 is reserved; new entries are only
/// ever appended, so indices held by instructions and raw attributes stay
/// valid across edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { entries: vec![Constant::Unusable] }
    }

    /// Value written as `constant_pool_count` (number of slots plus one).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the pool holds no usable entries.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Iterate usable entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| (i as u16, c))
    }

    pub fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFileError::InvalidConstantIndex { index }),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            other => Err(unexpected(index, "Utf8", other)),
        }
    }

    /// Internal name referenced by a `Class` constant.
    pub fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            other => Err(unexpected(index, "Class", other)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassFileError> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            other => Err(unexpected(index, "NameAndType", other)),
        }
    }

    /// Resolve a `Fieldref`, `Methodref`, or `InterfaceMethodref`.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>, ClassFileError> {
        let (class, name_and_type) = match self.get(index)? {
            Constant::FieldRef { class, name_and_type }
            | Constant::MethodRef { class, name_and_type }
            | Constant::InterfaceMethodRef { class, name_and_type } => (*class, *name_and_type),
            other => return Err(unexpected(index, "member reference", other)),
        };
        let owner = self.class_name(class)?;
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MemberRef { owner, name, descriptor })
    }

    /// Append `constant` unconditionally and return its index.
    pub fn push(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + slots > u16::MAX as usize {
            return Err(ClassFileError::ConstantPoolOverflow);
        }
        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Index of an existing equal entry, or a newly appended one.
    pub fn intern(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        match self.position(&constant) {
            Some(index) => Ok(index),
            None => self.push(constant),
        }
    }

    pub fn intern_utf8(&mut self, value: &str) -> Result<u16, ClassFileError> {
        if let Some(index) = self
            .entries
            .iter()
            .position(|c| matches!(c, Constant::Utf8(existing) if existing == value))
        {
            return Ok(index as u16);
        }
        self.push(Constant::Utf8(value.to_string()))
    }

    pub fn intern_class(&mut self, internal_name: &str) -> Result<u16, ClassFileError> {
        let name = self.intern_utf8(internal_name)?;
        self.intern(Constant::Class { name })
    }

    pub fn intern_string(&mut self, value: &str) -> Result<u16, ClassFileError> {
        let value = self.intern_utf8(value)?;
        self.intern(Constant::String { value })
    }

    pub fn intern_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassFileError> {
        let name = self.intern_utf8(name)?;
        let descriptor = self.intern_utf8(descriptor)?;
        self.intern(Constant::NameAndType { name, descriptor })
    }

    pub fn intern_field_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassFileError> {
        let class = self.intern_class(owner)?;
        let name_and_type = self.intern_name_and_type(name, descriptor)?;
        self.intern(Constant::FieldRef { class, name_and_type })
    }

    pub fn intern_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassFileError> {
        let class = self.intern_class(owner)?;
        let name_and_type = self.intern_name_and_type(name, descriptor)?;
        self.intern(Constant::MethodRef { class, name_and_type })
    }

    pub fn intern_interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassFileError> {
        let class = self.intern_class(owner)?;
        let name_and_type = self.intern_name_and_type(name, descriptor)?;
        self.intern(Constant::InterfaceMethodRef { class, name_and_type })
    }

    fn position(&self, constant: &Constant) -> Option<u16> {
        self.entries.iter().position(|c| c == constant).map(|i| i as u16)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let constant = read_constant(reader, index)?;
            let wide = constant.is_wide();
            entries.push(constant);
            if wide {
                if index + 1 >= count {
                    return Err(ClassFileError::InvalidConstantIndex { index: index + 1 });
                }
                entries.push(Constant::Unusable);
                index += 2;
            } else {
                index += 1;
            }
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<(), ClassFileError> {
        writer.count("constant pool", self.entries.len())?;
        for constant in &self.entries {
            write_constant(writer, constant)?;
        }
        Ok(())
    }
}

fn unexpected(index: u16, expected: &'static str, found: &Constant) -> ClassFileError {
    ClassFileError::UnexpectedConstant { index, expected, found: found.kind() }
}

fn read_constant(reader: &mut ByteReader<'_>, index: u16) -> Result<Constant, ClassFileError> {
    let tag = reader.u8()?;
    let constant = match tag {
        TAG_UTF8 => {
            let len = reader.u16()? as usize;
            let raw = reader.bytes(len)?;
            let value = cesu8::from_java_cesu8(raw)
                .map_err(|_| ClassFileError::InvalidUtf8 { index })?;
            Constant::Utf8(value.into_owned())
        }
        TAG_INTEGER => Constant::Integer(reader.i32()?),
        TAG_FLOAT => Constant::Float(reader.u32()?),
        TAG_LONG => Constant::Long(reader.i64()?),
        TAG_DOUBLE => Constant::Double(reader.u64()?),
        TAG_CLASS => Constant::Class { name: reader.u16()? },
        TAG_STRING => Constant::String { value: reader.u16()? },
        TAG_FIELD_REF => {
            Constant::FieldRef { class: reader.u16()?, name_and_type: reader.u16()? }
        }
        TAG_METHOD_REF => {
            Constant::MethodRef { class: reader.u16()?, name_and_type: reader.u16()? }
        }
        TAG_INTERFACE_METHOD_REF => {
            Constant::InterfaceMethodRef { class: reader.u16()?, name_and_type: reader.u16()? }
        }
        TAG_NAME_AND_TYPE => {
            Constant::NameAndType { name: reader.u16()?, descriptor: reader.u16()? }
        }
        TAG_METHOD_HANDLE => {
            Constant::MethodHandle { kind: reader.u8()?, reference: reader.u16()? }
        }
        TAG_METHOD_TYPE => Constant::MethodType { descriptor: reader.u16()? },
        TAG_DYNAMIC => {
            Constant::Dynamic { bootstrap_method: reader.u16()?, name_and_type: reader.u16()? }
        }
        TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
            bootstrap_method: reader.u16()?,
            name_and_type: reader.u16()?,
        },
        TAG_MODULE => Constant::Module { name: reader.u16()? },
        TAG_PACKAGE => Constant::Package { name: reader.u16()? },
        tag => return Err(ClassFileError::UnknownConstantTag { tag, index }),
    };
    Ok(constant)
}

fn write_constant(writer: &mut ByteWriter, constant: &Constant) -> Result<(), ClassFileError> {
    match constant {
        Constant::Unusable => {}
        Constant::Utf8(value) => {
            let encoded: Cow<'_, [u8]> = cesu8::to_java_cesu8(value);
            writer.u8(TAG_UTF8);
            writer.count("Utf8 constant", encoded.len())?;
            writer.bytes(&encoded);
        }
        Constant::Integer(value) => {
            writer.u8(TAG_INTEGER);
            writer.i32(*value);
        }
        Constant::Float(bits) => {
            writer.u8(TAG_FLOAT);
            writer.u32(*bits);
        }
        Constant::Long(value) => {
            writer.u8(TAG_LONG);
            writer.i64(*value);
        }
        Constant::Double(bits) => {
            writer.u8(TAG_DOUBLE);
            writer.u64(*bits);
        }
        Constant::Class { name } => {
            writer.u8(TAG_CLASS);
            writer.u16(*name);
        }
        Constant::String { value } => {
            writer.u8(TAG_STRING);
            writer.u16(*value);
        }
        Constant::FieldRef { class, name_and_type } => {
            writer.u8(TAG_FIELD_REF);
            writer.u16(*class);
            writer.u16(*name_and_type);
        }
        Constant::MethodRef { class, name_and_type } => {
            writer.u8(TAG_METHOD_REF);
            writer.u16(*class);
            writer.u16(*name_and_type);
        }
        Constant::InterfaceMethodRef { class, name_and_type } => {
            writer.u8(TAG_INTERFACE_METHOD_REF);
            writer.u16(*class);
            writer.u16(*name_and_type);
        }
        Constant::NameAndType { name, descriptor } => {
            writer.u8(TAG_NAME_AND_TYPE);
            writer.u16(*name);
            writer.u16(*descriptor);
        }
        Constant::MethodHandle { kind, reference } => {
            writer.u8(TAG_METHOD_HANDLE);
            writer.u8(*kind);
            writer.u16(*reference);
        }
        Constant::MethodType { descriptor } => {
            writer.u8(TAG_METHOD_TYPE);
            writer.u16(*descriptor);
        }
        Constant::Dynamic { bootstrap_method, name_and_type } => {
            writer.u8(TAG_DYNAMIC);
            writer.u16(*bootstrap_method);
            writer.u16(*name_and_type);
        }
        Constant::InvokeDynamic { bootstrap_method, name_and_type } => {
            writer.u8(TAG_INVOKE_DYNAMIC);
            writer.u16(*bootstrap_method);
            writer.u16(*name_and_type);
        }
        Constant::Module { name } => {
            writer.u8(TAG_MODULE);
            writer.u16(*name);
        }
        Constant::Package { name } => {
            writer.u8(TAG_PACKAGE);
            writer.u16(*name);
        }
    }
    Ok(())
}
