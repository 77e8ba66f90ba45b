//! Method bodies: the `Code` attribute as an editable instruction list.
//!
//! Branch targets, switch targets, and exception ranges are stored as
//! [`Label`]s (instruction indices) rather than byte offsets, so instructions
//! can be inserted or removed without patching offsets by hand. Offsets are
//! recomputed when the body is encoded.

use super::constant_pool::ConstantPool;
use super::io::{ByteReader, ByteWriter};
use super::opcodes::{self, OperandKind};
use super::{read_attributes, write_attributes, ClassFileError, RawAttribute};

/// Code attributes whose payload refers to bytecode offsets.
pub const OFFSET_ATTRIBUTES: [&str; 4] =
    ["LineNumberTable", "LocalVariableTable", "LocalVariableTypeTable", "StackMapTable"];

/// Position in a method body: the index of an instruction. A label equal to
/// the instruction count marks the end of the code (valid only as the
/// exclusive end of an exception range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl Label {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    Byte(i8),
    Short(i16),
    /// Constant pool index (`ldc*`, field and method instructions, `new`,
    /// `anewarray`, `checkcast`, `instanceof`).
    Constant(u16),
    Local(u16),
    Increment { local: u16, delta: i16 },
    Jump(Label),
    TableSwitch { default: Label, low: i32, high: i32, targets: Vec<Label> },
    LookupSwitch { default: Label, pairs: Vec<(i32, Label)> },
    InterfaceCall { index: u16, count: u8 },
    Dynamic(u16),
    NewArray(u8),
    MultiNewArray { index: u16, dimensions: u8 },
}

impl Operand {
    fn fits(&self, kind: OperandKind) -> bool {
        matches!(
            (self, kind),
            (Operand::None, OperandKind::None)
                | (Operand::Byte(_), OperandKind::Byte)
                | (Operand::Short(_), OperandKind::Short)
                | (Operand::Constant(_), OperandKind::ConstantU8 | OperandKind::ConstantU16)
                | (Operand::Local(_), OperandKind::Local)
                | (Operand::Increment { .. }, OperandKind::Increment)
                | (Operand::Jump(_), OperandKind::Jump16 | OperandKind::Jump32)
                | (Operand::TableSwitch { .. }, OperandKind::TableSwitch)
                | (Operand::LookupSwitch { .. }, OperandKind::LookupSwitch)
                | (Operand::InterfaceCall { .. }, OperandKind::InterfaceCall)
                | (Operand::Dynamic(_), OperandKind::Dynamic)
                | (Operand::NewArray(_), OperandKind::NewArray)
                | (Operand::MultiNewArray { .. }, OperandKind::MultiNewArray)
        )
    }

    /// Branch and switch targets of this operand.
    pub fn targets(&self) -> Vec<Label> {
        match self {
            Operand::Jump(target) => vec![*target],
            Operand::TableSwitch { default, targets, .. } => {
                std::iter::once(*default).chain(targets.iter().copied()).collect()
            }
            Operand::LookupSwitch { default, pairs } => {
                std::iter::once(*default).chain(pairs.iter().map(|(_, l)| *l)).collect()
            }
            _ => Vec::new(),
        }
    }

    fn targets_mut(&mut self) -> Vec<&mut Label> {
        match self {
            Operand::Jump(target) => vec![target],
            Operand::TableSwitch { default, targets, .. } => {
                std::iter::once(default).chain(targets.iter_mut()).collect()
            }
            Operand::LookupSwitch { default, pairs } => {
                std::iter::once(default).chain(pairs.iter_mut().map(|(_, l)| l)).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// One bytecode instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: Operand,
    /// Encode with a `wide` prefix even when the operand would fit without it.
    pub wide: bool,
}

impl Instruction {
    pub fn new(opcode: u8) -> Self {
        Self { opcode, operand: Operand::None, wide: false }
    }

    pub fn with_operand(opcode: u8, operand: Operand) -> Self {
        Self { opcode, operand, wide: false }
    }

    pub fn mnemonic(&self) -> &'static str {
        opcodes::mnemonic(self.opcode).unwrap_or("<invalid>")
    }
}

/// Entry of a method's exception table. `catch_type` is a `Class` constant
/// index, or 0 for a handler that catches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    pub catch_type: u16,
}

/// Decoded `Code` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub handlers: Vec<ExceptionHandler>,
    pub attributes: Vec<RawAttribute>,
}

impl MethodBody {
    pub fn new(max_stack: u16, max_locals: u16, instructions: Vec<Instruction>) -> Self {
        Self { max_stack, max_locals, instructions, handlers: Vec::new(), attributes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Remove attributes that index into the bytecode; they go stale as soon
    /// as instructions change.
    pub fn drop_offset_attributes(&mut self) {
        self.attributes.retain(|attr| !OFFSET_ATTRIBUTES.contains(&attr.name.as_str()));
    }

    /// Decode the payload of a `Code` attribute.
    pub(crate) fn decode(data: &[u8], pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let mut reader = ByteReader::new(data);
        let max_stack = reader.u16()?;
        let max_locals = reader.u16()?;
        let code_len = reader.u32()? as usize;
        let code = reader.bytes(code_len)?;

        let (offsets, mut instructions) = decode_instructions(code)?;

        // pc -> instruction index; the slot at code_len marks the end.
        let mut index_of = vec![None; code_len + 1];
        for (index, pc) in offsets.iter().enumerate() {
            index_of[*pc] = Some(index as u32);
        }
        index_of[code_len] = Some(instructions.len() as u32);

        for (insn, pc) in instructions.iter_mut().zip(&offsets) {
            for label in insn.operand.targets_mut() {
                let target = label.index();
                match index_of.get(target).copied().flatten() {
                    Some(index) if target < code_len => *label = Label(index),
                    _ => {
                        return Err(ClassFileError::InvalidBranchTarget {
                            pc: *pc,
                            target: target as i64,
                        })
                    }
                }
            }
        }

        let handler_count = reader.u16()?;
        let mut handlers = Vec::with_capacity(handler_count as usize);
        for _ in 0..handler_count {
            let start_pc = reader.u16()? as usize;
            let end_pc = reader.u16()? as usize;
            let handler_pc = reader.u16()? as usize;
            let catch_type = reader.u16()?;
            let lookup = |pc: usize| {
                index_of.get(pc).copied().flatten().map(Label).ok_or(
                    ClassFileError::InvalidBranchTarget { pc: start_pc, target: pc as i64 },
                )
            };
            handlers.push(ExceptionHandler {
                start: lookup(start_pc)?,
                end: lookup(end_pc)?,
                handler: lookup(handler_pc)?,
                catch_type,
            });
        }

        let attributes = read_attributes(&mut reader, pool)?;
        if reader.remaining() != 0 {
            return Err(ClassFileError::AttributeLength {
                name: "Code".to_string(),
                declared: data.len(),
                consumed: reader.offset(),
            });
        }

        Ok(Self { max_stack, max_locals, instructions, handlers, attributes })
    }

    /// Encode into the payload of a `Code` attribute, interning attribute
    /// names into `pool`.
    pub(crate) fn encode(&self, pool: &mut ConstantPool) -> Result<Vec<u8>, ClassFileError> {
        let len = self.instructions.len();

        let mut offsets = Vec::with_capacity(len + 1);
        let mut pc = 0usize;
        for insn in &self.instructions {
            offsets.push(pc);
            pc += encoded_size(insn, pc)?;
        }
        offsets.push(pc);
        let code_len = pc;
        if code_len == 0 || code_len > u16::MAX as usize {
            return Err(ClassFileError::TooLarge { what: "method code", len: code_len });
        }

        let mut code = ByteWriter::new();
        for (index, insn) in self.instructions.iter().enumerate() {
            encode_instruction(&mut code, insn, index, &offsets)?;
        }

        let mut writer = ByteWriter::new();
        writer.u16(self.max_stack);
        writer.u16(self.max_locals);
        writer.blob("method code", &code.into_inner())?;

        writer.count("exception table", self.handlers.len())?;
        for handler in &self.handlers {
            for label in [handler.start, handler.end, handler.handler] {
                let pc = offsets
                    .get(label.index())
                    .ok_or(ClassFileError::InvalidLabel { label: label.0, len })?;
                writer.u16(*pc as u16);
            }
            writer.u16(handler.catch_type);
        }

        write_attributes(&mut writer, &self.attributes, pool)?;
        Ok(writer.into_inner())
    }
}

fn decode_instructions(code: &[u8]) -> Result<(Vec<usize>, Vec<Instruction>), ClassFileError> {
    let mut reader = ByteReader::new(code);
    let mut offsets = Vec::new();
    let mut instructions = Vec::new();

    // Targets are stored as absolute pcs here and remapped by the caller.
    let target = |pc: usize, offset: i64| -> Result<Label, ClassFileError> {
        let absolute = pc as i64 + offset;
        if absolute < 0 || absolute >= code.len() as i64 {
            return Err(ClassFileError::InvalidBranchTarget { pc, target: absolute });
        }
        Ok(Label(absolute as u32))
    };

    while reader.remaining() > 0 {
        let pc = reader.offset();
        let opcode = reader.u8()?;

        if opcode == opcodes::WIDE {
            let widened = reader.u8()?;
            let operand = match widened {
                opcodes::IINC => Operand::Increment { local: reader.u16()?, delta: reader.i16()? },
                op if opcodes::is_widenable(op) => Operand::Local(reader.u16()?),
                op => return Err(ClassFileError::UnknownOpcode { opcode: op, pc }),
            };
            offsets.push(pc);
            instructions.push(Instruction { opcode: widened, operand, wide: true });
            continue;
        }

        let kind = opcodes::operand_kind(opcode)
            .ok_or(ClassFileError::UnknownOpcode { opcode, pc })?;
        let operand = match kind {
            OperandKind::None => Operand::None,
            OperandKind::Byte => Operand::Byte(reader.i8()?),
            OperandKind::Short => Operand::Short(reader.i16()?),
            OperandKind::ConstantU8 => Operand::Constant(reader.u8()? as u16),
            OperandKind::ConstantU16 => Operand::Constant(reader.u16()?),
            OperandKind::Local => Operand::Local(reader.u8()? as u16),
            OperandKind::Increment => {
                Operand::Increment { local: reader.u8()? as u16, delta: reader.i8()? as i16 }
            }
            OperandKind::Jump16 => Operand::Jump(target(pc, reader.i16()? as i64)?),
            OperandKind::Jump32 => Operand::Jump(target(pc, reader.i32()? as i64)?),
            OperandKind::TableSwitch => {
                reader.align4()?;
                let default = target(pc, reader.i32()? as i64)?;
                let low = reader.i32()?;
                let high = reader.i32()?;
                if high < low {
                    return Err(ClassFileError::InvalidSwitch { pc });
                }
                let mut targets = Vec::new();
                for _ in low as i64..=high as i64 {
                    targets.push(target(pc, reader.i32()? as i64)?);
                }
                Operand::TableSwitch { default, low, high, targets }
            }
            OperandKind::LookupSwitch => {
                reader.align4()?;
                let default = target(pc, reader.i32()? as i64)?;
                let npairs = reader.i32()?;
                if npairs < 0 {
                    return Err(ClassFileError::InvalidSwitch { pc });
                }
                let mut pairs = Vec::new();
                for _ in 0..npairs {
                    let key = reader.i32()?;
                    pairs.push((key, target(pc, reader.i32()? as i64)?));
                }
                Operand::LookupSwitch { default, pairs }
            }
            OperandKind::InterfaceCall => {
                let index = reader.u16()?;
                let count = reader.u8()?;
                reader.u8()?;
                Operand::InterfaceCall { index, count }
            }
            OperandKind::Dynamic => {
                let index = reader.u16()?;
                reader.u16()?;
                Operand::Dynamic(index)
            }
            OperandKind::NewArray => Operand::NewArray(reader.u8()?),
            OperandKind::MultiNewArray => {
                Operand::MultiNewArray { index: reader.u16()?, dimensions: reader.u8()? }
            }
        };
        offsets.push(pc);
        instructions.push(Instruction { opcode, operand, wide: false });
    }

    Ok((offsets, instructions))
}

fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}

fn needs_wide(insn: &Instruction) -> bool {
    insn.wide
        || match insn.operand {
            Operand::Local(local) => local > u8::MAX as u16,
            Operand::Increment { local, delta } => {
                local > u8::MAX as u16 || i8::try_from(delta).is_err()
            }
            _ => false,
        }
}

fn encoded_size(insn: &Instruction, pc: usize) -> Result<usize, ClassFileError> {
    let kind = opcodes::operand_kind(insn.opcode)
        .ok_or(ClassFileError::UnknownOpcode { opcode: insn.opcode, pc })?;
    if !insn.operand.fits(kind) {
        return Err(ClassFileError::OperandMismatch { opcode: insn.opcode, pc });
    }
    let size = match &insn.operand {
        Operand::None => 1,
        Operand::Byte(_) | Operand::NewArray(_) => 2,
        Operand::Short(_) => 3,
        Operand::Constant(index) => {
            if kind == OperandKind::ConstantU8 && *index <= u8::MAX as u16 {
                2
            } else {
                3
            }
        }
        Operand::Local(_) if needs_wide(insn) => 4,
        Operand::Local(_) => 2,
        Operand::Increment { .. } if needs_wide(insn) => 6,
        Operand::Increment { .. } => 3,
        Operand::Jump(_) if kind == OperandKind::Jump32 => 5,
        Operand::Jump(_) => 3,
        Operand::TableSwitch { targets, .. } => 1 + switch_padding(pc) + 12 + 4 * targets.len(),
        Operand::LookupSwitch { pairs, .. } => 1 + switch_padding(pc) + 8 + 8 * pairs.len(),
        Operand::InterfaceCall { .. } | Operand::Dynamic(_) => 5,
        Operand::MultiNewArray { .. } => 4,
    };
    Ok(size)
}

fn encode_instruction(
    writer: &mut ByteWriter,
    insn: &Instruction,
    index: usize,
    offsets: &[usize],
) -> Result<(), ClassFileError> {
    let len = offsets.len() - 1;
    let pc = offsets[index];
    let offset_to = |label: Label| -> Result<i64, ClassFileError> {
        if label.index() >= len {
            return Err(ClassFileError::InvalidLabel { label: label.0, len });
        }
        Ok(offsets[label.index()] as i64 - pc as i64)
    };
    let jump16 = |label: Label| -> Result<i16, ClassFileError> {
        let offset = offset_to(label)?;
        i16::try_from(offset).map_err(|_| ClassFileError::BranchOutOfRange {
            from: index,
            to: label.index(),
            offset,
        })
    };
    let jump32 = |label: Label| -> Result<i32, ClassFileError> {
        let offset = offset_to(label)?;
        i32::try_from(offset).map_err(|_| ClassFileError::BranchOutOfRange {
            from: index,
            to: label.index(),
            offset,
        })
    };

    match &insn.operand {
        Operand::None => writer.u8(insn.opcode),
        Operand::Byte(value) => {
            writer.u8(insn.opcode);
            writer.u8(*value as u8);
        }
        Operand::Short(value) => {
            writer.u8(insn.opcode);
            writer.i16(*value);
        }
        Operand::Constant(cp) => {
            if insn.opcode == opcodes::LDC && *cp <= u8::MAX as u16 {
                writer.u8(opcodes::LDC);
                writer.u8(*cp as u8);
            } else {
                let opcode = if insn.opcode == opcodes::LDC { opcodes::LDC_W } else { insn.opcode };
                writer.u8(opcode);
                writer.u16(*cp);
            }
        }
        Operand::Local(local) => {
            if needs_wide(insn) {
                writer.u8(opcodes::WIDE);
                writer.u8(insn.opcode);
                writer.u16(*local);
            } else {
                writer.u8(insn.opcode);
                writer.u8(*local as u8);
            }
        }
        Operand::Increment { local, delta } => {
            if needs_wide(insn) {
                writer.u8(opcodes::WIDE);
                writer.u8(insn.opcode);
                writer.u16(*local);
                writer.i16(*delta);
            } else {
                writer.u8(insn.opcode);
                writer.u8(*local as u8);
                writer.u8(*delta as i8 as u8);
            }
        }
        Operand::Jump(label) => {
            writer.u8(insn.opcode);
            if matches!(insn.opcode, opcodes::GOTO_W | opcodes::JSR_W) {
                writer.i32(jump32(*label)?);
            } else {
                writer.i16(jump16(*label)?);
            }
        }
        Operand::TableSwitch { default, low, high, targets } => {
            if *high < *low || (*high as i64 - *low as i64 + 1) as usize != targets.len() {
                return Err(ClassFileError::InvalidSwitch { pc });
            }
            writer.u8(insn.opcode);
            for _ in 0..switch_padding(pc) {
                writer.u8(0);
            }
            writer.i32(jump32(*default)?);
            writer.i32(*low);
            writer.i32(*high);
            for target in targets {
                writer.i32(jump32(*target)?);
            }
        }
        Operand::LookupSwitch { default, pairs } => {
            writer.u8(insn.opcode);
            for _ in 0..switch_padding(pc) {
                writer.u8(0);
            }
            writer.i32(jump32(*default)?);
            writer.i32(pairs.len() as i32);
            for (key, target) in pairs {
                writer.i32(*key);
                writer.i32(jump32(*target)?);
            }
        }
        Operand::InterfaceCall { index: cp, count } => {
            writer.u8(insn.opcode);
            writer.u16(*cp);
            writer.u8(*count);
            writer.u8(0);
        }
        Operand::Dynamic(cp) => {
            writer.u8(insn.opcode);
            writer.u16(*cp);
            writer.u16(0);
        }
        Operand::NewArray(atype) => {
            writer.u8(insn.opcode);
            writer.u8(*atype);
        }
        Operand::MultiNewArray { index: cp, dimensions } => {
            writer.u8(insn.opcode);
            writer.u16(*cp);
            writer.u8(*dimensions);
        }
    }
    Ok(())
}
