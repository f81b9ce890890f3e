use crate::tpl::ast::{Block, Node, Span, Statement, WhitespaceControl};
use tracing::debug;

const BLOCK_KEYWORDS: [&str; 7] = ["if", "for", "macro", "block", "set", "filter", "raw"];

/// A block under construction. Its children may reference other pending
/// blocks by index, since a block stays open while its parent can already be
/// closed.
struct PendingBlock {
    keyword: String,
    name: Option<String>,
    argument: Option<String>,
    children: Vec<Slot>,
    open_trim: WhitespaceControl,
    close_trim: WhitespaceControl,
    raw: String,
    span: Span,
}

enum Slot {
    Node(Node),
    Block(usize),
}

struct BlockBuilder {
    blocks: Vec<Option<PendingBlock>>,
    // 打开的块（栈顶为最内层）
    frames: Vec<usize>,
    top: Vec<Slot>,
}

/// 将同一层级的扁平节点列表按块语句嵌套
///
/// Closing statements match the innermost open block with the same keyword,
/// not necessarily the top frame; blocks that never close stay open until
/// the end of the list. Never fails.
pub(crate) fn build_blocks(nodes: Vec<Node>) -> Vec<Node> {
    let mut builder = BlockBuilder {
        blocks: Vec::new(),
        frames: Vec::new(),
        top: Vec::new(),
    };

    for node in nodes {
        match node {
            Node::Statement(stmt) => builder.statement(stmt),
            other => builder.append(Slot::Node(other)),
        }
    }

    builder.finish()
}

impl BlockBuilder {
    fn statement(&mut self, stmt: Statement) {
        let keyword = stmt.keyword.as_str();

        if opens_block(&stmt) {
            self.open(stmt);
        } else if keyword == "endblock" || keyword.starts_with("end") {
            self.close(stmt);
        } else {
            // `else`/`elif` inside an `if` become direct children of that
            // block; anywhere else they are ordinary statements.
            self.append(Slot::Node(Node::Statement(stmt)));
        }
    }

    fn open(&mut self, stmt: Statement) {
        let name = if stmt.keyword == "block" {
            stmt.argument.clone()
        } else {
            None
        };
        let id = self.blocks.len();
        self.blocks.push(Some(PendingBlock {
            keyword: stmt.keyword,
            name,
            argument: stmt.argument,
            children: Vec::new(),
            open_trim: stmt.trim,
            close_trim: WhitespaceControl::default(),
            raw: stmt.raw,
            span: stmt.span,
        }));
        self.append(Slot::Block(id));
        self.frames.push(id);
    }

    fn close(&mut self, stmt: Statement) {
        let (target, target_name) = if stmt.keyword == "endblock" {
            ("block", stmt.argument.as_deref())
        } else {
            (&stmt.keyword["end".len()..], None)
        };

        let matched = self.frames.iter().rposition(|&id| match &self.blocks[id] {
            Some(block) => {
                block.keyword == target
                    && !(target == "block"
                        && target_name.is_some()
                        && block.name.as_deref() != target_name)
            }
            None => false,
        });

        match matched {
            Some(pos) => {
                let id = self.frames.remove(pos);
                if pos < self.frames.len() {
                    debug!(
                        "`{}` closed an outer block; {} inner block(s) stay open",
                        stmt.body,
                        self.frames.len() - pos
                    );
                }
                if let Some(block) = self.blocks[id].as_mut() {
                    block.span.end = stmt.span.end;
                    block.close_trim = stmt.trim;
                }
            }
            None if self.frames.is_empty() => {
                self.top.push(Slot::Node(Node::Statement(stmt)));
            }
            None => {
                debug!("discarding unmatched `{}` at {}", stmt.body, stmt.span.start);
            }
        }
    }

    fn append(&mut self, slot: Slot) {
        match self.frames.last() {
            Some(&id) => {
                if let Some(block) = self.blocks[id].as_mut() {
                    block.children.push(slot);
                }
            }
            None => self.top.push(slot),
        }
    }

    fn finish(mut self) -> Vec<Node> {
        for &id in &self.frames {
            if let Some(block) = &self.blocks[id] {
                debug!(
                    "`{}` at {} is never closed",
                    block.keyword, block.span.start
                );
            }
        }
        let top = std::mem::take(&mut self.top);
        materialize(&mut self.blocks, top)
    }
}

fn opens_block(stmt: &Statement) -> bool {
    BLOCK_KEYWORDS.contains(&stmt.keyword.as_str())
}

fn materialize(blocks: &mut [Option<PendingBlock>], slots: Vec<Slot>) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Node(node) => nodes.push(node),
            Slot::Block(id) => {
                let Some(pending) = blocks[id].take() else {
                    continue;
                };
                let children = materialize(blocks, pending.children);
                nodes.push(Node::Block(Block {
                    keyword: pending.keyword,
                    name: pending.name,
                    argument: pending.argument,
                    children,
                    open_trim: pending.open_trim,
                    close_trim: pending.close_trim,
                    raw: pending.raw,
                    span: pending.span,
                }));
            }
        }
    }
    nodes
}
