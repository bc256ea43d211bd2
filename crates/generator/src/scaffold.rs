//! Writing generated output to disk.

use std::io;
use std::path::{Path, PathBuf};
use toml_edit::{value, DocumentMut};

use crate::emit::parser_file_name;

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    std::fs::write(path, content)
}

/// Write `<GrammarName>_parser.rs` into `out_dir`, creating it if needed.
pub fn write_parser_file(
    out_dir: &Path,
    grammar_name: &str,
    source: &str,
) -> io::Result<PathBuf> {
    ensure_dir(out_dir)?;
    let path = out_dir.join(parser_file_name(grammar_name));
    write_file(&path, source)?;
    Ok(path)
}

/// Render a Cargo.toml for a standalone generated-parser crate.
#[must_use]
pub fn render_cargo_toml(package_name: &str) -> String {
    let mut doc = DocumentMut::new();

    doc["package"]["name"] = value(package_name);
    doc["package"]["version"] = value("0.1.0");
    doc["package"]["edition"] = value("2021");

    // Make the generated crate standalone even inside another workspace.
    doc["workspace"] = toml_edit::table();

    doc["dependencies"]["regex"] = value("1");

    doc.to_string()
}

/// Create a full project around a generated parser: Cargo.toml plus
/// src/lib.rs holding the parser source.
pub fn write_project(
    out_parent: &Path,
    package_name: &str,
    source: &str,
) -> io::Result<PathBuf> {
    let root = out_parent.join(package_name);
    ensure_dir(&root.join("src"))?;
    write_file(&root.join("Cargo.toml"), &render_cargo_toml(package_name))?;
    write_file(&root.join("src").join("lib.rs"), source)?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_toml_declares_regex_and_standalone_workspace() {
        let rendered = render_cargo_toml("calc_parser");
        assert!(rendered.contains("name = \"calc_parser\""));
        assert!(rendered.contains("regex = \"1\""));
        assert!(rendered.contains("[workspace]"));
    }

    #[test]
    fn parser_file_name_convention() {
        assert_eq!(parser_file_name("Calc"), "Calc_parser.rs");
    }
}
