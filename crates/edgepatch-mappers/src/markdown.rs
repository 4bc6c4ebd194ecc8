//! Markdown-to-tree conversion for generated copy.
//!
//! Generated answers and summaries are CommonMark. Parser events are folded
//! into [`TreeNode`]s; raw HTML is dropped and unknown containers are
//! flattened into their parent.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

use edgepatch_core::TreeNode;

/// An open container: its element (or `None` when flattened) and the
/// children collected so far.
struct Frame {
    element: Option<TreeNode>,
    children: Vec<TreeNode>,
}

/// Convert markdown into a list of block-level nodes.
pub(crate) fn to_nodes(markdown: &str) -> Vec<TreeNode> {
    let mut stack = vec![Frame {
        element: None,
        children: Vec::new(),
    }];

    for event in Parser::new(markdown) {
        match event {
            Event::Start(tag) => stack.push(Frame {
                element: open(&tag),
                children: Vec::new(),
            }),
            Event::End(TagEnd::HtmlBlock) => {
                stack.pop();
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    continue;
                }
                let Some(frame) = stack.pop() else { break };
                let closed: Vec<TreeNode> = match frame.element {
                    Some(TreeNode::Element {
                        tag_name,
                        properties,
                        ..
                    }) => vec![TreeNode::Element {
                        tag_name,
                        properties,
                        children: frame.children,
                    }],
                    _ => frame.children,
                };
                if let Some(parent) = stack.last_mut() {
                    for node in closed {
                        push(&mut parent.children, node);
                    }
                }
            }
            Event::Text(text) => push_text(&mut stack, &text),
            Event::Code(code) => {
                if let Some(frame) = stack.last_mut() {
                    frame.children.push(TreeNode::text_element("code", code.to_string()));
                }
            }
            Event::SoftBreak => push_text(&mut stack, " "),
            Event::HardBreak => {
                if let Some(frame) = stack.last_mut() {
                    frame.children.push(TreeNode::element("br", Vec::new()));
                }
            }
            Event::Rule => {
                if let Some(frame) = stack.last_mut() {
                    frame.children.push(TreeNode::element("hr", Vec::new()));
                }
            }
            _ => {}
        }
    }

    stack
        .into_iter()
        .next()
        .map(|root| root.children)
        .unwrap_or_default()
}

/// Element opened by `tag`; `None` for containers that are flattened.
fn open(tag: &Tag<'_>) -> Option<TreeNode> {
    let element = |name: &str| Some(TreeNode::element(name, Vec::new()));
    match tag {
        Tag::Paragraph => element("p"),
        Tag::Heading { level, .. } => element(heading_tag(*level)),
        Tag::BlockQuote(_) => element("blockquote"),
        Tag::CodeBlock(_) => element("pre"),
        Tag::List(None) => element("ul"),
        Tag::List(Some(_)) => element("ol"),
        Tag::Item => element("li"),
        Tag::Emphasis => element("em"),
        Tag::Strong => element("strong"),
        Tag::Link { dest_url, .. } => {
            Some(TreeNode::element("a", Vec::new()).with_property("href", dest_url.to_string()))
        }
        _ => None,
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn push_text(stack: &mut [Frame], text: &str) {
    if let Some(frame) = stack.last_mut() {
        push(&mut frame.children, TreeNode::text(text));
    }
}

/// Append `node`, merging adjacent text nodes.
fn push(children: &mut Vec<TreeNode>, node: TreeNode) {
    if let (Some(TreeNode::Text { value: last }), TreeNode::Text { value }) =
        (children.last_mut(), &node)
    {
        last.push_str(value);
        return;
    }
    children.push(node);
}
