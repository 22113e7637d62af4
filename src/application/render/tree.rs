//! Intermediate trees for inline marks and nested lists.

use std::cmp::Reverse;

use crate::domain::portable_text::{Block, ListKind, Span};

/// Inline content of a block after grouping spans by shared marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Inline<'a> {
    Text(&'a str),
    Marked {
        mark: &'a str,
        children: Vec<Inline<'a>>,
    },
}

struct Frame<'a> {
    mark: &'a str,
    children: Vec<Inline<'a>>,
}

/// Group adjacent spans under shared mark wrappers.
///
/// Marks that stay active across more upcoming spans are opened first so
/// they wrap the shorter-lived ones; ties open in name order.
pub(crate) fn build_marks_tree(spans: &[Span]) -> Vec<Inline<'_>> {
    let mut stack = vec![Frame {
        mark: "",
        children: Vec::new(),
    }];

    for (index, span) in spans.iter().enumerate() {
        let mut needed = sorted_marks(spans, index);

        let mut keep = 1;
        while keep < stack.len() {
            match needed.iter().position(|mark| *mark == stack[keep].mark) {
                Some(position) => {
                    needed.remove(position);
                    keep += 1;
                }
                None => break,
            }
        }
        close_frames(&mut stack, keep);

        for mark in needed {
            stack.push(Frame {
                mark,
                children: Vec::new(),
            });
        }
        if let Some(top) = stack.last_mut() {
            top.children.push(Inline::Text(&span.text));
        }
    }

    close_frames(&mut stack, 1);
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn sorted_marks(spans: &[Span], index: usize) -> Vec<&str> {
    let mut marks: Vec<&str> = Vec::new();
    for mark in &spans[index].marks {
        if !marks.contains(&mark.as_str()) {
            marks.push(mark);
        }
    }
    marks.sort_by_key(|mark| {
        let run = spans[index..]
            .iter()
            .take_while(|span| span.marks.iter().any(|other| other == mark))
            .count();
        (Reverse(run), *mark)
    });
    marks
}

fn close_frames(stack: &mut Vec<Frame<'_>>, len: usize) {
    while stack.len() > len {
        let Some(frame) = stack.pop() else {
            break;
        };
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Inline::Marked {
                mark: frame.mark,
                children: frame.children,
            });
        }
    }
}

/// One `<ul>`/`<ol>` and its items.
#[derive(Debug)]
pub(crate) struct ListTree<'a> {
    pub kind: ListKind,
    pub entries: Vec<ListEntry<'a>>,
}

/// A list item. `block` is `None` for placeholder items created when a list
/// jumps more than one level deeper.
#[derive(Debug)]
pub(crate) struct ListEntry<'a> {
    pub block: Option<&'a Block>,
    pub sublists: Vec<ListTree<'a>>,
}

/// A list-item block with its resolved kind and level.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListItem<'a> {
    pub block: &'a Block,
    pub kind: ListKind,
    pub level: u8,
}

/// Nest a run of consecutive list-item blocks into list trees.
pub(crate) fn build_lists<'a>(items: &[ListItem<'a>]) -> Vec<ListTree<'a>> {
    let mut lists = Vec::new();
    let mut position = 0;
    while position < items.len() {
        let level = items[position].level;
        lists.extend(nest_lists(items, &mut position, level));
    }
    lists
}

fn nest_lists<'a>(items: &[ListItem<'a>], position: &mut usize, level: u8) -> Vec<ListTree<'a>> {
    let mut lists: Vec<ListTree<'a>> = Vec::new();

    while let Some(item) = items.get(*position) {
        if item.level < level {
            break;
        }

        if item.level == level {
            if lists.last().is_none_or(|list| list.kind != item.kind) {
                lists.push(ListTree {
                    kind: item.kind,
                    entries: Vec::new(),
                });
            }
            if let Some(list) = lists.last_mut() {
                list.entries.push(ListEntry {
                    block: Some(item.block),
                    sublists: Vec::new(),
                });
            }
            *position += 1;
            continue;
        }

        let sublists = nest_lists(items, position, level + 1);
        if lists.is_empty() {
            lists.push(ListTree {
                kind: item.kind,
                entries: Vec::new(),
            });
        }
        if let Some(list) = lists.last_mut() {
            match list.entries.last_mut() {
                Some(entry) => entry.sublists.extend(sublists),
                None => list.entries.push(ListEntry {
                    block: None,
                    sublists,
                }),
            }
        }
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(inline: &'a [Inline<'a>]) -> String {
        inline
            .iter()
            .map(|node| match node {
                Inline::Text(text) => (*text).to_string(),
                Inline::Marked { mark, children } => format!("[{mark}:{}]", texts(children)),
            })
            .collect()
    }

    #[test]
    fn adjacent_spans_share_a_wrapper() {
        let spans = vec![
            Span::new("a").with_marks(["strong"]),
            Span::new("b").with_marks(["strong", "em"]),
            Span::new("c"),
        ];
        assert_eq!(texts(&build_marks_tree(&spans)), "[strong:a[em:b]]c");
    }

    #[test]
    fn longer_running_marks_open_first() {
        let spans = vec![
            Span::new("a").with_marks(["em", "strong"]),
            Span::new("b").with_marks(["strong"]),
        ];
        assert_eq!(texts(&build_marks_tree(&spans)), "[strong:[em:a]b]");
    }

    #[test]
    fn unmarked_spans_stay_flat_and_ordered() {
        let spans = vec![Span::new("one "), Span::new("two")];
        assert_eq!(
            build_marks_tree(&spans),
            vec![Inline::Text("one "), Inline::Text("two")]
        );
    }

    fn item(block: &Block) -> ListItem<'_> {
        ListItem {
            block,
            kind: block.list_item.unwrap_or(ListKind::Bullet),
            level: block.level,
        }
    }

    #[test]
    fn deeper_levels_nest_inside_previous_item() {
        let blocks = [
            Block::list_item(ListKind::Bullet, 1, vec![Span::new("a")]),
            Block::list_item(ListKind::Number, 2, vec![Span::new("a.1")]),
            Block::list_item(ListKind::Bullet, 1, vec![Span::new("b")]),
        ];
        let items: Vec<_> = blocks.iter().map(item).collect();
        let lists = build_lists(&items);

        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].entries.len(), 2);
        let nested = &lists[0].entries[0].sublists;
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].kind, ListKind::Number);
    }

    #[test]
    fn kind_change_at_same_level_starts_new_list() {
        let blocks = [
            Block::list_item(ListKind::Bullet, 1, vec![Span::new("a")]),
            Block::list_item(ListKind::Number, 1, vec![Span::new("1")]),
        ];
        let items: Vec<_> = blocks.iter().map(item).collect();
        let lists = build_lists(&items);
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[1].kind, ListKind::Number);
    }

    #[test]
    fn skipped_levels_get_placeholder_items() {
        let blocks = [Block::list_item(ListKind::Bullet, 1, vec![Span::new("a")])];
        let deep = Block::list_item(ListKind::Bullet, 3, vec![Span::new("deep")]);
        let items = vec![item(&blocks[0]), item(&deep)];
        let lists = build_lists(&items);

        let level_two = &lists[0].entries[0].sublists[0];
        assert!(level_two.entries[0].block.is_none());
        assert_eq!(level_two.entries[0].sublists[0].entries.len(), 1);
    }
}
