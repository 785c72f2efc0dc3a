/// Stable node identity within a document.
///
/// Keys are never reused after a node is removed, so the same key in two
/// snapshots always denotes the same logical node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Key of the document root.
    pub const ROOT: NodeKey = NodeKey(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element,
    Text,
}

/// One node of the document tree.
///
/// Every node decomposes into four contiguous flat-text spans, always in this
/// order: prefix, children (recursively concatenated), own text, suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) prefix: String,
    pub(crate) text: String,
    pub(crate) suffix: String,
}

impl Node {
    pub fn root() -> Self {
        Self {
            key: NodeKey::ROOT,
            parent: None,
            kind: NodeKind::Root,
            children: Vec::new(),
            prefix: String::new(),
            text: String::new(),
            suffix: String::new(),
        }
    }

    pub fn element(key: NodeKey, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            key,
            parent: None,
            kind: NodeKind::Element,
            children: Vec::new(),
            prefix: prefix.into(),
            text: String::new(),
            suffix: suffix.into(),
        }
    }

    pub fn text(key: NodeKey, text: impl Into<String>) -> Self {
        Self {
            key,
            parent: None,
            kind: NodeKind::Text,
            children: Vec::new(),
            prefix: String::new(),
            text: text.into(),
            suffix: String::new(),
        }
    }

    pub fn with_parent(mut self, parent: NodeKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_children(mut self, children: Vec<NodeKey>) -> Self {
        self.children = children;
        self
    }

    /// Own text after the children; elements may carry it too.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Elements and the root may own children; text nodes are leaves.
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Root | NodeKind::Element)
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn own_text(&self) -> &str {
        &self.text
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    // Lengths are counted in chars, the unit of every flat-text offset.
    pub fn prefix_len(&self) -> usize {
        self.prefix.chars().count()
    }

    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix.chars().count()
    }
}
