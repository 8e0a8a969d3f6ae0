//! `file`: match one token, complete it as a filesystem path.

use std::any::Any;
use std::fs;
use std::path::Path;

use crate::complete::{CompKind, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

pub(crate) static FILE_TYPE: NodeType = NodeType {
    name: "file",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::new(FileOps)
}

struct FileOps;

impl NodeOps for FileOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        // Any token is accepted as a path; validity is the caller's
        // concern. Completion is where this node earns its keep.
        match tokens.first() {
            Some(_) => Ok(ParseResult::Match(1)),
            None => Ok(ParseResult::NoMatch),
        }
    }

    fn complete(
        &self,
        node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let [token] = tokens else {
            return Ok(());
        };

        // Split at the last separator: complete entries of `dir` whose
        // name starts with `prefix`.
        let (dir, prefix) = match token.rfind('/') {
            Some(pos) => (&token[..pos + 1], &token[pos + 1..]),
            None => ("", token.as_str()),
        };
        let list_dir = if dir.is_empty() { "." } else { dir };

        // An unreadable directory simply offers no candidates.
        let Ok(entries) = fs::read_dir(Path::new(list_dir)) else {
            return Ok(());
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(prefix) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                // A directory is a partial completion: descend further.
                let full = format!("{dir}{name}/");
                let item = comp.add_item(node, CompKind::Partial, Some(token), Some(&full))?;
                item.set_display(format!("{name}/"))?;
            } else {
                let full = format!("{dir}{name}");
                let item = comp.add_item(node, CompKind::Full, Some(token), Some(&full))?;
                item.set_display(name)?;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node matching one token and completing it as a file path.
pub fn file() -> Node {
    Node::from_type(&FILE_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_parse;
    use crate::CompMask;

    #[test]
    fn any_single_token_parses() {
        let node = file();
        check_parse(&node, Some(1), &["/etc/hosts"]);
        check_parse(&node, Some(1), &["whatever"]);
        check_parse(&node, None, &[]);
    }

    #[test]
    fn completes_entries_of_a_directory() {
        let dir = std::env::temp_dir().join("cligram-file-node-test");
        let _ = fs::create_dir_all(dir.join("subdir"));
        let _ = fs::write(dir.join("alpha.txt"), b"");
        let _ = fs::write(dir.join("beta.txt"), b"");

        let node = file();
        let base = format!("{}/", dir.display());
        let comp = node.complete(&[format!("{base}a")]).expect("complete");
        let fulls: Vec<_> = comp.iter(CompMask::FULL).filter_map(|i| i.full()).collect();
        assert_eq!(fulls, [format!("{base}alpha.txt")]);

        let comp = node.complete(&[format!("{base}sub")]).expect("complete");
        let partials: Vec<_> = comp
            .iter(CompMask::PARTIAL)
            .filter_map(|i| i.full())
            .collect();
        assert_eq!(partials, [format!("{base}subdir/")]);

        let _ = fs::remove_dir_all(&dir);
    }
}
