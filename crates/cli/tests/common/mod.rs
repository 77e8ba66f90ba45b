#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use classlens_core::classfile::{
    access, opcodes, ClassNode, FieldNode, Instruction, MethodBody, MethodNode, Operand,
};
use classlens_core::TypeName;

/// A small class with a constructor and one concrete method.
pub fn class_bytes(name: &str) -> Vec<u8> {
    let object = TypeName::new("java/lang/Object").unwrap();
    let mut class = ClassNode::new(TypeName::new(name).unwrap(), Some(object));
    class.interfaces.push(TypeName::new("java/lang/Runnable").unwrap());
    class.fields.push(FieldNode::new(access::PRIVATE, "count", "I"));
    let init = class
        .constant_pool
        .intern_method_ref("java/lang/Object", "<init>", "()V")
        .unwrap();
    class.methods.push(MethodNode::new(
        access::PUBLIC,
        "<init>",
        "()V",
        Some(MethodBody::new(
            1,
            1,
            vec![
                Instruction::new(opcodes::ALOAD_0),
                Instruction::with_operand(opcodes::INVOKESPECIAL, Operand::Constant(init)),
                Instruction::new(opcodes::RETURN),
            ],
        )),
    ));
    class.methods.push(MethodNode::new(
        access::PUBLIC,
        "run",
        "()V",
        Some(MethodBody::new(0, 1, vec![Instruction::new(opcodes::RETURN)])),
    ));
    class.to_bytes().unwrap()
}

pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut jar = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        jar.start_file(*name, zip::write::FileOptions::default()).unwrap();
        jar.write_all(data).unwrap();
    }
    jar.finish().unwrap();
}

pub fn write_tree(root: &Path, entries: &[(&str, &[u8])]) {
    for (name, data) in entries {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }
}
