//! Shared fixtures: a hand-assembled class file and jar/directory builders.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Method names encoded in [`widget_class`], in declaration order.
pub const WIDGET_METHODS: [&str; 3] = ["<init>", "run", "count"];

fn utf8(out: &mut Vec<u8>, value: &str) {
    out.push(1);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

fn u16s(out: &mut Vec<u8>, values: &[u16]) {
    for value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn method(out: &mut Vec<u8>, name: u16, descriptor: u16, max_stack: u16, code: &[u8]) {
    u16s(out, &[0x0001, name, descriptor, 1, 13]);
    let length = 2 + 2 + 4 + code.len() + 2 + 2;
    out.extend_from_slice(&(length as u32).to_be_bytes());
    u16s(out, &[max_stack, 1]);
    out.extend_from_slice(&(code.len() as u32).to_be_bytes());
    out.extend_from_slice(code);
    u16s(out, &[0, 0]);
}

/// Bytes of a class `name` equivalent to:
///
/// ```java
/// public class Widget implements Runnable {
///     private int count;
///     public void run() { count++; }
///     public int count() { return count; }
/// }
/// ```
///
/// Written out by hand so parsing is checked against bytes this crate's
/// encoder did not produce.
pub fn class_bytes(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
    u16s(&mut out, &[0, 52, 18]);

    utf8(&mut out, name); // 1
    out.push(7);
    u16s(&mut out, &[1]); // 2 Class
    utf8(&mut out, "java/lang/Object"); // 3
    out.push(7);
    u16s(&mut out, &[3]); // 4 Class
    utf8(&mut out, "java/lang/Runnable"); // 5
    out.push(7);
    u16s(&mut out, &[5]); // 6 Class
    utf8(&mut out, "count"); // 7
    utf8(&mut out, "I"); // 8
    utf8(&mut out, "<init>"); // 9
    utf8(&mut out, "()V"); // 10
    utf8(&mut out, "run"); // 11
    utf8(&mut out, "()I"); // 12
    utf8(&mut out, "Code"); // 13
    out.push(12);
    u16s(&mut out, &[9, 10]); // 14 NameAndType <init>:()V
    out.push(10);
    u16s(&mut out, &[4, 14]); // 15 Methodref Object.<init>
    out.push(12);
    u16s(&mut out, &[7, 8]); // 16 NameAndType count:I
    out.push(9);
    u16s(&mut out, &[2, 16]); // 17 Fieldref this.count

    // access, this, super, interfaces
    u16s(&mut out, &[0x0021, 2, 4, 1, 6]);
    // private int count
    u16s(&mut out, &[1, 0x0002, 7, 8, 0]);

    u16s(&mut out, &[3]);
    // aload_0; invokespecial #15; return
    method(&mut out, 9, 10, 1, &[0x2a, 0xb7, 0x00, 0x0f, 0xb1]);
    // aload_0; dup; getfield #17; iconst_1; iadd; putfield #17; return
    method(
        &mut out,
        11,
        10,
        3,
        &[0x2a, 0x59, 0xb4, 0x00, 0x11, 0x04, 0x60, 0xb5, 0x00, 0x11, 0xb1],
    );
    // aload_0; getfield #17; ireturn
    method(&mut out, 7, 12, 1, &[0x2a, 0xb4, 0x00, 0x11, 0xac]);

    u16s(&mut out, &[0]);
    out
}

pub fn widget_class() -> Vec<u8> {
    class_bytes("com/example/Widget")
}

/// Write `entries` (resource path, bytes) into a new jar at `path`.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let file = File::create(path).unwrap();
    let mut jar = zip::ZipWriter::new(file);
    for (name, data) in entries {
        jar.start_file(*name, zip::write::FileOptions::default()).unwrap();
        jar.write_all(data).unwrap();
    }
    jar.finish().unwrap();
    path.to_path_buf()
}

/// Write `entries` as files under `root`.
pub fn write_tree(root: &Path, entries: &[(&str, &[u8])]) {
    for (name, data) in entries {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }
}

/// Write a single stored entry whose central directory claims, through a
/// zip64 extra field, an uncompressed size of `u64::MAX`.
pub fn write_oversized_jar(path: &Path, name: &str, data: &[u8]) -> PathBuf {
    let mut out = Vec::new();
    let le16 = |out: &mut Vec<u8>, v: u16| out.extend_from_slice(&v.to_le_bytes());
    let le32 = |out: &mut Vec<u8>, v: u32| out.extend_from_slice(&v.to_le_bytes());

    // Local file header.
    le32(&mut out, 0x0403_4b50);
    for v in [20, 0, 0, 0, 0] {
        le16(&mut out, v);
    }
    le32(&mut out, 0);
    le32(&mut out, data.len() as u32);
    le32(&mut out, data.len() as u32);
    le16(&mut out, name.len() as u16);
    le16(&mut out, 0);
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(data);

    // Central directory header.
    let directory_start = out.len();
    le32(&mut out, 0x0201_4b50);
    for v in [45, 45, 0, 0, 0, 0] {
        le16(&mut out, v);
    }
    le32(&mut out, 0);
    le32(&mut out, data.len() as u32);
    le32(&mut out, u32::MAX);
    le16(&mut out, name.len() as u16);
    le16(&mut out, 12);
    for v in [0, 0, 0] {
        le16(&mut out, v);
    }
    le32(&mut out, 0);
    le32(&mut out, 0);
    out.extend_from_slice(name.as_bytes());
    le16(&mut out, 0x0001);
    le16(&mut out, 8);
    out.extend_from_slice(&u64::MAX.to_le_bytes());
    let directory_len = out.len() - directory_start;

    // End of central directory.
    le32(&mut out, 0x0605_4b50);
    for v in [0, 0, 1, 1] {
        le16(&mut out, v);
    }
    le32(&mut out, directory_len as u32);
    le32(&mut out, directory_start as u32);
    le16(&mut out, 0);

    fs::write(path, out).unwrap();
    path.to_path_buf()
}
