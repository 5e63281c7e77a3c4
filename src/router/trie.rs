//! Segment trie used to match request paths against registered patterns.
//!
//! Every node stands for one `/`-delimited segment. Wild segments (`:name`
//! and `*name`) match any request segment, and children are tried strictly in
//! the order they were inserted, so registration order decides between
//! overlapping routes.

#[derive(Debug, Default, Clone)]
pub struct Node {
    /// Full registered pattern, set only on nodes that terminate a route.
    pattern: String,
    segment: String,
    children: Vec<Node>,
    is_wild: bool,
}

impl Node {
    fn new(segment: &str) -> Self {
        Self {
            pattern: String::new(),
            segment: segment.to_owned(),
            children: Vec::new(),
            is_wild: segment.starts_with(':') || segment.starts_with('*'),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_wild(&self) -> bool {
        self.is_wild
    }

    // First child that accepts `segment` during insertion. A wild child takes
    // everything at its depth, including literals registered after it.
    fn match_child(&mut self, segment: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.segment == segment || child.is_wild)
    }

    pub fn insert(&mut self, pattern: &str, segments: &[&str], depth: usize) {
        if depth == segments.len() {
            self.pattern = pattern.to_owned();
            return;
        }

        let segment = segments[depth];
        let index = match self.match_child(segment) {
            Some(index) => index,
            None => {
                self.children.push(Node::new(segment));
                self.children.len() - 1
            }
        };
        self.children[index].insert(pattern, segments, depth + 1);
    }

    pub fn search(&self, segments: &[&str], depth: usize) -> Option<&Node> {
        if depth == segments.len() || self.segment.starts_with('*') {
            if self.pattern.is_empty() {
                return None;
            }
            return Some(self);
        }

        let segment = segments[depth];
        self.children
            .iter()
            .filter(|child| child.segment == segment || child.is_wild)
            .find_map(|child| child.search(segments, depth + 1))
    }
}

#[derive(Debug, Clone)]
pub struct MethodTree {
    method: String,
    root: Node,
}

/// One trie root per HTTP method, looked up linearly.
#[derive(Debug, Default, Clone)]
pub struct MethodTrees {
    trees: Vec<MethodTree>,
}

impl MethodTrees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, method: &str) -> Option<&Node> {
        self.trees
            .iter()
            .find(|tree| tree.method == method)
            .map(|tree| &tree.root)
    }

    pub fn get_or_create(&mut self, method: &str) -> &mut Node {
        let index = match self.trees.iter().position(|tree| tree.method == method) {
            Some(index) => index,
            None => {
                self.trees.push(MethodTree {
                    method: method.to_owned(),
                    root: Node::default(),
                });
                self.trees.len() - 1
            }
        };
        &mut self.trees[index].root
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.trees.iter().map(|tree| tree.method.as_str())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
