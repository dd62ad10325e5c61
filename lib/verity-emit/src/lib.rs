//! The emission substrate: a hierarchical writer abstraction
//! that lets the lowering driver receive *forks* — named insertion points
//! inside an otherwise-sequential stream — so it can, for example, emit a
//! class body and only later go back and fill in an import list at the file
//! head.
//!
//! There is exactly one `Substrate` per compilation. It owns every buffer;
//! the driver and backends hold only `WriterId` handles into it (Design
//! Notes: "an arena of buffers plus a parent-child index; flush is a
//! topological DFS over the tree").

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("wrote to writer {0:?} after it was sealed")]
    WriteAfterSeal(WriterId),
    #[error("forked from writer {0:?} after it was sealed")]
    ForkAfterSeal(WriterId),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type EmitResult<T> = Result<T, EmitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriterId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceStyle {
    /// The delimiter shares a line with whatever precedes/follows it
    /// (K&R-style `) {` or a closing `} while (cond);`).
    SameLine,
    /// The delimiter occupies its own line at the block's indent (Allman
    /// style, or Python's bare `:` header with no closing delimiter at
    /// all).
    NewLine,
}

/// The fork-flush automaton from : `Open → Sealed` on scope
/// close, `Sealed → Flushed` on parent flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForkState {
    Open,
    Sealed,
    Flushed,
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Child(WriterId),
}

#[derive(Debug, Clone)]
enum BufferKind {
    Plain,
    Block {
        header: String,
        footer: String,
        open_style: BraceStyle,
        close_style: BraceStyle,
    },
}

#[derive(Debug, Clone)]
struct BufferNode {
    kind: BufferKind,
    pieces: Vec<Piece>,
    /// Indentation depth applied to this node's own `Text` pieces.
    content_depth: usize,
    /// Indentation depth applied to a `Block`'s header/footer lines.
    brace_depth: usize,
    state: ForkState,
}

/// An arena of buffers plus the set of pending output files. `Write`,
/// `Fork`, `NewBlock` and `NewFile` are the four substrate operations;
/// `Flush` is `flush_to_strings` here (disk I/O is left to the caller so
/// this crate stays free of process-level side effects until the caller
/// explicitly asks for them).
pub struct Substrate {
    buffers: Vec<BufferNode>,
    files: Vec<(PathBuf, WriterId)>,
    indent_unit: String,
}

impl Substrate {
    pub fn new(indent_unit: impl Into<String>) -> Self {
        Self {
            buffers: Vec::new(),
            files: Vec::new(),
            indent_unit: indent_unit.into(),
        }
    }

    fn push_node(&mut self, node: BufferNode) -> WriterId {
        let id = WriterId(self.buffers.len());
        self.buffers.push(node);
        id
    }

    fn node(&self, id: WriterId) -> &BufferNode {
        &self.buffers[id.0]
    }

    fn node_mut(&mut self, id: WriterId) -> &mut BufferNode {
        &mut self.buffers[id.0]
    }

    /// Creates a fresh root writer bound to a pending output file. The file
    /// is written in the order `NewFile` was called, which is the module
    /// dependency order the driver walks in.
    pub fn new_file(&mut self, path: impl Into<PathBuf>) -> WriterId {
        let id = self.push_node(BufferNode {
            kind: BufferKind::Plain,
            pieces: Vec::new(),
            content_depth: 0,
            brace_depth: 0,
            state: ForkState::Open,
        });
        self.files.push((path.into(), id));
        id
    }

    /// Appends `text` to `id`'s local buffer.
    pub fn write(&mut self, id: WriterId, text: &str) -> EmitResult<()> {
        if self.node(id).state != ForkState::Open {
            return Err(EmitError::WriteAfterSeal(id));
        }
        self.node_mut(id).pieces.push(Piece::Text(text.to_string()));
        Ok(())
    }

    /// Splits `id` at its current tail, returning a new writer whose buffer
    /// will be spliced at exactly this point regardless of what is written
    /// to `id` afterwards.
    pub fn fork(&mut self, id: WriterId) -> EmitResult<WriterId> {
        if self.node(id).state != ForkState::Open {
            return Err(EmitError::ForkAfterSeal(id));
        }
        let content_depth = self.node(id).content_depth;
        let child = self.push_node(BufferNode {
            kind: BufferKind::Plain,
            pieces: Vec::new(),
            content_depth,
            brace_depth: content_depth,
            state: ForkState::Open,
        });
        self.node_mut(id).pieces.push(Piece::Child(child));
        Ok(child)
    }

    /// Writes `header`, then returns a child block writer whose contents
    /// will be framed between `header` and `footer` at `id`'s indentation +
    /// 1 once flushed.
    pub fn new_block(
        &mut self,
        id: WriterId,
        header: &str,
        footer: &str,
        open_style: BraceStyle,
        close_style: BraceStyle,
    ) -> EmitResult<WriterId> {
        if self.node(id).state != ForkState::Open {
            return Err(EmitError::ForkAfterSeal(id));
        }
        let brace_depth = self.node(id).content_depth;
        let child = self.push_node(BufferNode {
            kind: BufferKind::Block {
                header: header.to_string(),
                footer: footer.to_string(),
                open_style,
                close_style,
            },
            pieces: Vec::new(),
            content_depth: brace_depth + 1,
            brace_depth,
            state: ForkState::Open,
        });
        self.node_mut(id).pieces.push(Piece::Child(child));
        Ok(child)
    }

    /// Closes a scope. Idempotent: sealing an already-sealed writer is a
    /// no-op, matching  "all scope closes are idempotent".
    pub fn close(&mut self, id: WriterId) {
        let node = self.node_mut(id);
        if node.state == ForkState::Open {
            node.state = ForkState::Sealed;
        }
    }

    fn indent_lines(text: &str, depth: usize, unit: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let prefix = unit.repeat(depth);
        let ends_with_newline = text.ends_with('\n');
        let body = if ends_with_newline { &text[..text.len() - 1] } else { text };
        let mut out = String::new();
        for (i, line) in body.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if !line.is_empty() {
                out.push_str(&prefix);
                out.push_str(line);
            }
        }
        if ends_with_newline {
            out.push('\n');
        }
        out
    }

    fn render(&self, id: WriterId) -> String {
        let node = self.node(id);
        let mut body = String::new();
        for piece in &node.pieces {
            match piece {
                Piece::Text(t) => body.push_str(&Self::indent_lines(t, node.content_depth, &self.indent_unit)),
                Piece::Child(cid) => body.push_str(&self.render(*cid)),
            }
        }
        match &node.kind {
            BufferKind::Plain => body,
            BufferKind::Block {
                header,
                footer,
                open_style,
                close_style,
            } => {
                let prefix = self.indent_unit.repeat(node.brace_depth);
                let mut out = String::new();
                if !header.is_empty() {
                    match open_style {
                        // The header is already fully decorated by the caller
                        // (e.g. "public class Foo {"); SameLine just means no
                        // blank line separates it from whatever precedes it,
                        // unlike NewLine which opens with one.
                        BraceStyle::SameLine => {
                            out.push_str(&prefix);
                            out.push_str(header);
                            out.push('\n');
                        }
                        BraceStyle::NewLine => {
                            out.push('\n');
                            out.push_str(&prefix);
                            out.push_str(header);
                            out.push('\n');
                        }
                    }
                }
                out.push_str(&body);
                if !footer.is_empty() {
                    match close_style {
                        BraceStyle::NewLine => {
                            out.push_str(&prefix);
                            out.push_str(footer);
                            out.push('\n');
                        }
                        // No indentation prefix; used when the footer must
                        // glue onto an unindented continuation.
                        BraceStyle::SameLine => {
                            out.push_str(footer);
                            out.push('\n');
                        }
                    }
                }
                out
            }
        }
    }

    /// Seals every remaining open writer and renders each registered file's
    /// root to a string, depth-first, in `NewFile` registration order. Does
    /// not touch disk — see `flush_to_disk` for the atomic write-or-nothing
    /// step an output I/O failure requires.
    pub fn flush_to_strings(&mut self) -> Vec<(PathBuf, String)> {
        for node in &mut self.buffers {
            if node.state == ForkState::Open {
                node.state = ForkState::Sealed;
            }
        }
        let rendered: Vec<(PathBuf, String)> = self
            .files
            .iter()
            .map(|(path, id)| (path.clone(), self.render(*id)))
            .collect();
        for node in &mut self.buffers {
            node.state = ForkState::Flushed;
        }
        rendered
    }

    /// Writes every file from `flush_to_strings` atomically: all files land
    /// or none do. Implemented by writing each to a sibling `.tmp` path and
    /// renaming only once every write has succeeded; on any failure the
    /// temp files already written are removed.
    pub fn flush_to_disk(&mut self, base_dir: &std::path::Path) -> EmitResult<Vec<PathBuf>> {
        let rendered = self.flush_to_strings();
        write_rendered_atomically(base_dir, &rendered)
    }
}

/// Writes a set of already-rendered `(relative path, contents)` pairs to
/// `base_dir` atomically: all files land or none do. Each file is written to
/// a sibling `.tmp` path first and renamed only once every write has
/// succeeded; on any failure the temp files already written are removed.
/// This is `Substrate::flush_to_disk`'s write step pulled out as a free
/// function so callers holding only a `LoweringReport`'s rendered files (no
/// live `Substrate`) can still flush them under the same guarantee.
pub fn write_rendered_atomically(
    base_dir: &std::path::Path,
    rendered: &[(PathBuf, String)],
) -> EmitResult<Vec<PathBuf>> {
    let mut tmp_paths = Vec::with_capacity(rendered.len());
    for (rel_path, contents) in rendered {
        let final_path = base_dir.join(rel_path);
        let tmp_path = final_path.with_extension(
            final_path
                .extension()
                .map(|e| format!("{}.tmp", e.to_string_lossy()))
                .unwrap_or_else(|| "tmp".to_string()),
        );
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        if let Err(source) = std::fs::write(&tmp_path, contents) {
            for tmp in &tmp_paths {
                let _ = std::fs::remove_file(tmp);
            }
            return Err(EmitError::Io { path: tmp_path, source });
        }
        tmp_paths.push(tmp_path);
    }
    let mut final_paths = Vec::with_capacity(rendered.len());
    for ((rel_path, _), tmp_path) in rendered.iter().zip(tmp_paths.iter()) {
        let final_path = base_dir.join(rel_path);
        if let Err(source) = std::fs::rename(tmp_path, &final_path) {
            return Err(EmitError::Io { path: final_path, source });
        }
        final_paths.push(final_path);
    }
    Ok(final_paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_splices_before_later_parent_writes() {
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("out.txt");
        let imports = sub.fork(root).unwrap();
        sub.write(root, "fn main() {}\n").unwrap();
        // Written after the fork handle was taken, but lands before it in
        // the rendered output because the splice point is fixed.
        sub.write(imports, "use std::fmt;\n").unwrap();

        let files = sub.flush_to_strings();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, "use std::fmt;\nfn main() {}\n");
    }

    #[test]
    fn block_indents_structurally_not_by_counting_braces() {
        let mut sub = Substrate::new("    ");
        let root = sub.new_file("out.txt");
        let class = sub
            .new_block(root, "class Foo {", "}", BraceStyle::SameLine, BraceStyle::NewLine)
            .unwrap();
        sub.write(class, "int x;\n").unwrap();
        let inner = sub
            .new_block(class, "void m() {", "}", BraceStyle::SameLine, BraceStyle::NewLine)
            .unwrap();
        sub.write(inner, "return;\n").unwrap();

        let files = sub.flush_to_strings();
        assert_eq!(
            files[0].1,
            "class Foo {\n    int x;\n    void m() {\n        return;\n    }\n}\n"
        );
    }

    #[test]
    fn same_line_close_style_omits_the_indentation_prefix() {
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("out.txt");
        let block = sub
            .new_block(root, "do {", "} while (x);", BraceStyle::SameLine, BraceStyle::SameLine)
            .unwrap();
        sub.write(block, "step();\n").unwrap();
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "do {\n  step();\n} while (x);\n");
    }

    #[test]
    fn empty_header_and_footer_yields_pure_indentation_block() {
        let mut sub = Substrate::new("    ");
        let root = sub.new_file("out.py");
        let block = sub
            .new_block(root, "def f():", "", BraceStyle::NewLine, BraceStyle::NewLine)
            .unwrap();
        sub.write(block, "return 1\n").unwrap();
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "\ndef f():\n    return 1\n");
    }

    #[test]
    fn close_is_idempotent() {
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("out.txt");
        sub.close(root);
        sub.close(root);
        sub.write(root, "x").unwrap_err();
    }

    #[test]
    fn fork_after_seal_errors() {
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("out.txt");
        sub.close(root);
        assert!(matches!(sub.fork(root), Err(EmitError::ForkAfterSeal(_))));
    }

    #[test]
    fn multiple_files_flush_in_registration_order() {
        let mut sub = Substrate::new("  ");
        let a = sub.new_file("a.txt");
        let b = sub.new_file("b.txt");
        sub.write(a, "A\n").unwrap();
        sub.write(b, "B\n").unwrap();
        let files = sub.flush_to_strings();
        assert_eq!(files[0].0, PathBuf::from("a.txt"));
        assert_eq!(files[1].0, PathBuf::from("b.txt"));
    }

    #[test]
    fn flush_to_disk_is_all_or_nothing() {
        let dir = std::env::temp_dir().join(format!("verity-emit-test-{}", std::process::id()));
        let mut sub = Substrate::new("  ");
        let f = sub.new_file("nested/out.txt");
        sub.write(f, "hello\n").unwrap();
        let written = sub.flush_to_disk(&dir).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
