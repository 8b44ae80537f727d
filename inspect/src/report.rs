use std::io::{self, Write};

use xv6fs::{BitmapMismatch, DirectoryTree, InodeTable, Inspection, RawImage, Superblock};

const DUMP_WIDTH: usize = 16;
const INDENT: usize = 4;

pub fn superblock<W: Write>(out: &mut W, sb: &Superblock) -> io::Result<()> {
    writeln!(out, "SUPERBLOCK:")?;
    for (name, value) in sb.fields() {
        writeln!(out, "  {name:<10} = {value}")?;
    }
    Ok(())
}

pub fn tree<W: Write>(out: &mut W, tree: &DirectoryTree, inodes: &InodeTable) -> io::Result<()> {
    let mut result = Ok(());
    tree.root.visit(&mut |depth, node| {
        if depth == 0 || result.is_err() {
            return;
        }

        let entry = node.entry();
        let kind = inodes
            .get(entry.inum.into())
            .map(|inode| inode.kind.to_string())
            .unwrap_or_default();
        let indent = " ".repeat((depth - 1) * INDENT);
        result = writeln!(out, "{indent}{:<16} {:<4} {kind}", entry.name, entry.inum);
    });
    result
}

pub fn flat<W: Write>(out: &mut W, tree: &DirectoryTree) -> io::Result<()> {
    let mut result = Ok(());
    tree.root.visit(&mut |depth, node| {
        if depth > 0 && result.is_ok() {
            result = writeln!(out, "{}", node.path().display());
        }
    });
    result
}

pub fn mismatch<W: Write>(out: &mut W, image: &RawImage, m: &BitmapMismatch) -> io::Result<()> {
    writeln!(
        out,
        "Bitmap bit {} is {}, it should be {}",
        m.bit, m.actual as u8, m.expected as u8
    )?;
    writeln!(out, "BLOCK {}", m.bit)?;
    match image.block(m.bit) {
        Ok(block) => hexdump(out, block),
        Err(_) => writeln!(out, "(past the end of the image)"),
    }
}

pub fn summary<W: Write>(out: &mut W, inspection: &Inspection) -> io::Result<()> {
    let used = &inspection.used;
    writeln!(
        out,
        "{} live inodes, {} used blocks ({} metadata, {} data), {} bitmap mismatches",
        inspection.inodes.len(),
        used.len(),
        used.reserved().count(),
        used.claimed().count(),
        inspection.mismatches.len()
    )
}

/// Hex bytes then printable ASCII, `DUMP_WIDTH` bytes per line.
pub fn hexdump<W: Write>(out: &mut W, blob: &[u8]) -> io::Result<()> {
    for line in blob.chunks(DUMP_WIDTH) {
        let hex: Vec<String> = line.iter().map(|b| format!("{b:02x}")).collect();
        let text: String = line
            .iter()
            .map(|&b| if (0x20..=0x7e).contains(&b) { b as char } else { '.' })
            .collect();
        writeln!(
            out,
            "{:<width$}   {text}",
            hex.join(" "),
            width = DUMP_WIDTH * 3 - 1
        )?;
    }
    Ok(())
}
