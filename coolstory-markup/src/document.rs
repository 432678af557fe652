use {
    html5ever::{
        driver::ParseOpts, local_name, namespace_url, ns, parse_fragment, tendril::TendrilSink,
        tree_builder::TreeBuilderOpts,
    },
    markup5ever::{LocalName, QualName},
    markup5ever_arcdom::{ArcDom, Handle, NodeData},
    std::sync::Arc,
};

/// Elements that end a run of text, so words on either side never merge.
static BLOCKS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Never carry readable text.
pub(crate) static OPAQUE: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "select",
    "svg", "math", "frame", "frameset", "head", "title",
];

fn default_parse_opts() -> ParseOpts {
    ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A parsed piece of story markup, as it would sit inside `<body>`.
pub struct Fragment {
    dom: ArcDom,
}

impl From<&str> for Fragment {
    fn from(input: &str) -> Self {
        let context = QualName::new(None, ns!(html), local_name!("body"));

        let dom = parse_fragment(ArcDom::default(), default_parse_opts(), context, Vec::new())
            .one(input);

        Self { dom }
    }
}

impl Fragment {
    /// The fragment's top level nodes.
    ///
    /// Fragment parsing wraps everything in a synthetic `<html>` element,
    /// which is skipped here.
    pub fn roots(&self) -> Vec<Handle> {
        let document = self.dom.document.children.borrow();

        document
            .iter()
            .flat_map(|node| match node.data {
                NodeData::Element { ref name, .. } if &*name.local == "html" => {
                    node.children.borrow().iter().map(Arc::clone).collect()
                }
                _ => vec![Arc::clone(node)],
            })
            .collect()
    }

    /// Readable text with block boundaries turned into single spaces.
    pub fn text(&self) -> String {
        let mut buf = String::new();

        for root in self.roots() {
            collect_text(&root, &mut buf);
        }

        normalize_whitespace(&buf)
    }

    /// Text of each `<p>`, in document order, skipping empty ones.
    pub fn paragraphs(&self) -> Vec<String> {
        let mut found = Vec::new();

        for root in self.roots() {
            find_tag(&root, "p", &mut found);
        }

        found
            .iter()
            .map(|handle| {
                let mut buf = String::new();
                collect_text(handle, &mut buf);
                normalize_whitespace(&buf)
            })
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Work item for the tree walkers. They keep an explicit stack, nesting depth
/// is bounded only by the heap.
pub(crate) enum Step {
    Enter(Handle),
    Leave(LocalName),
}

/// Queues `handle`'s children so they pop in document order.
pub(crate) fn push_children(handle: &Handle, stack: &mut Vec<Step>) {
    stack.extend(
        handle
            .children
            .borrow()
            .iter()
            .rev()
            .map(|child| Step::Enter(Arc::clone(child))),
    );
}

fn collect_text(handle: &Handle, buf: &mut String) {
    let mut stack = vec![Step::Enter(Arc::clone(handle))];

    while let Some(step) = stack.pop() {
        let handle = match step {
            Step::Enter(handle) => handle,
            Step::Leave(tag) => {
                if BLOCKS.contains(&&*tag) {
                    buf.push(' ');
                }

                continue;
            }
        };

        match handle.data {
            NodeData::Text { ref contents } => buf.push_str(&contents.borrow()),
            NodeData::Element { ref name, .. } => {
                if OPAQUE.contains(&&*name.local) {
                    continue;
                }

                stack.push(Step::Leave(name.local.clone()));
                push_children(&handle, &mut stack);
            }
            NodeData::Document => push_children(&handle, &mut stack),
            _ => {}
        }
    }
}

fn find_tag(root: &Handle, tag: &str, acc: &mut Vec<Handle>) {
    let mut stack = vec![Arc::clone(root)];

    while let Some(handle) = stack.pop() {
        if let NodeData::Element { ref name, .. } = handle.data {
            if &*name.local == tag {
                acc.push(Arc::clone(&handle));

                continue;
            }

            if OPAQUE.contains(&&*name.local) {
                continue;
            }
        }

        stack.extend(handle.children.borrow().iter().rev().map(Arc::clone));
    }
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
