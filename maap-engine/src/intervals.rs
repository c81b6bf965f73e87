use thiserror::Error;

/// Returned when an insert would overlap an interval already in the tree.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Interval [{low}, {high}] overlaps an existing interval")]
pub struct Overlap {
    pub low: u32,
    pub high: u32,
}

/// A stable reference to an interval in an [`IntervalTree`].
///
/// Handles stay valid until the interval they point to is removed, no matter how the tree is
/// reshaped by other removals. A handle to a removed interval never resolves again, even if its
/// slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

/// An inclusive range `[low, high]` and the value attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval<T> {
    pub low: u32,
    pub high: u32,
    pub data: T,
}

impl<T> Interval<T> {
    /// Number of values covered by the interval.
    #[inline]
    pub fn count(&self) -> u32 {
        self.high - self.low + 1
    }

    /// Returns `true` if `[low, high]` shares at least one value with this interval.
    #[inline]
    pub fn overlaps(&self, low: u32, high: u32) -> bool {
        self.low <= high && low <= self.high
    }
}

#[derive(Debug)]
struct Node<T> {
    interval: Interval<T>,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// An unbalanced binary search tree of non-overlapping intervals, keyed by their low end.
///
/// Nodes live in an arena and link to each other by index. Removing a node with two children
/// relinks its in-order successor into its place rather than moving the successor's contents, so
/// every other [`Handle`] keeps pointing at the same interval.
#[derive(Debug)]
pub struct IntervalTree<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalTree<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), root: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every interval. Outstanding handles stop resolving.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.root = None;
        self.len = 0;
    }

    pub fn get(&self, handle: Handle) -> Option<&Interval<T>> {
        self.resolve(handle).map(|index| &self.node(index).interval)
    }

    /// Inserts `[low, high]`. If it overlaps any interval met on the way down, the tree is left
    /// untouched and [`Overlap`] is returned.
    pub fn insert(&mut self, low: u32, high: u32, data: T) -> Result<Handle, Overlap> {
        debug_assert!(low <= high, "inverted interval [{low}, {high}]");

        let mut parent = None;
        let mut go_left = false;
        let mut current = self.root;

        while let Some(index) = current {
            let node = self.node(index);
            if node.interval.overlaps(low, high) {
                return Err(Overlap { low, high });
            }

            parent = Some(index);
            go_left = low < node.interval.low;
            current = if go_left { node.left } else { node.right };
        }

        let node = Node { interval: Interval { low, high, data }, parent, left: None, right: None };
        let index = self.alloc(node);

        match parent {
            None => self.root = Some(index),
            Some(p) if go_left => self.node_mut(p).left = Some(index),
            Some(p) => self.node_mut(p).right = Some(index),
        }

        self.len += 1;
        Ok(self.handle(index))
    }

    /// Unlinks the interval behind `handle` and hands it back. Returns `None` for a stale handle.
    pub fn remove(&mut self, handle: Handle) -> Option<Interval<T>> {
        let index = self.resolve(handle)?;
        let (left, right) = {
            let node = self.node(index);
            (node.left, node.right)
        };

        match (left, right) {
            (None, child) | (child, None) => self.transplant(index, child),
            (Some(left), Some(right)) => {
                let successor = self.min_from(right);

                if self.node(successor).parent != Some(index) {
                    // Lift the successor out of the right subtree first. It has no left child.
                    let successor_right = self.node(successor).right;
                    self.transplant(successor, successor_right);
                    self.node_mut(successor).right = Some(right);
                    self.node_mut(right).parent = Some(successor);
                }

                self.transplant(index, Some(successor));
                self.node_mut(successor).left = Some(left);
                self.node_mut(left).parent = Some(successor);
            }
        }

        self.len -= 1;
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);

        slot.node.take().map(|node| node.interval)
    }

    /// The interval with the lowest `low`.
    pub fn min(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(self.min_from(root)))
    }

    /// The interval with the highest `low`.
    pub fn max(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(self.max_from(root)))
    }

    /// The next interval in ascending order.
    pub fn successor(&self, handle: Handle) -> Option<Handle> {
        let index = self.resolve(handle)?;

        if let Some(right) = self.node(index).right {
            return Some(self.handle(self.min_from(right)));
        }

        let mut child = index;
        let mut parent = self.node(index).parent;
        while let Some(p) = parent {
            if self.node(p).right != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent;
        }

        parent.map(|p| self.handle(p))
    }

    /// The previous interval in ascending order.
    pub fn predecessor(&self, handle: Handle) -> Option<Handle> {
        let index = self.resolve(handle)?;

        if let Some(left) = self.node(index).left {
            return Some(self.handle(self.max_from(left)));
        }

        let mut child = index;
        let mut parent = self.node(index).parent;
        while let Some(p) = parent {
            if self.node(p).left != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent;
        }

        parent.map(|p| self.handle(p))
    }

    /// Finds the lowest interval overlapping `[low, low + count - 1]`.
    pub fn search_overlap(&self, low: u32, count: u32) -> Option<Handle> {
        if count == 0 {
            return None;
        }
        let high = low.saturating_add(count - 1);

        let mut current = self.root;
        while let Some(index) = current {
            let node = self.node(index);
            if node.interval.overlaps(low, high) {
                break;
            }
            current = if node.interval.low > low { node.left } else { node.right };
        }

        // Any overlapping interval will do to land in the right spot; walk down to the first one.
        let mut found = self.handle(current?);
        while let Some(prev) = self.predecessor(found) {
            if !self.get(prev).is_some_and(|iv| iv.overlaps(low, high)) {
                break;
            }
            found = prev;
        }

        Some(found)
    }

    /// Calls `visitor` on every interval in ascending order.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(Handle, &Interval<T>),
    {
        for (handle, interval) in self.iter() {
            visitor(handle, interval);
        }
    }

    /// Iterates the intervals in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { tree: self, next: self.min() }
    }

    fn handle(&self, index: usize) -> Handle {
        Handle { index, generation: self.slots[index].generation }
    }

    fn resolve(&self, handle: Handle) -> Option<usize> {
        let slot = self.slots.get(handle.index)?;
        (slot.generation == handle.generation && slot.node.is_some()).then_some(handle.index)
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        if let Some(index) = self.free.pop() {
            self.slots[index].node = Some(node);
            index
        } else {
            self.slots.push(Slot { generation: 0, node: Some(node) });
            self.slots.len() - 1
        }
    }

    /// Replaces the subtree rooted at `index` with the one rooted at `child` in `index`'s parent.
    fn transplant(&mut self, index: usize, child: Option<usize>) {
        let parent = self.node(index).parent;

        match parent {
            None => self.root = child,
            Some(p) if self.node(p).left == Some(index) => self.node_mut(p).left = child,
            Some(p) => self.node_mut(p).right = child,
        }

        if let Some(c) = child {
            self.node_mut(c).parent = parent;
        }
    }

    fn min_from(&self, mut index: usize) -> usize {
        while let Some(left) = self.node(index).left {
            index = left;
        }
        index
    }

    fn max_from(&self, mut index: usize) -> usize {
        while let Some(right) = self.node(index).right {
            index = right;
        }
        index
    }

    // Links inside the tree always point at occupied slots.
    fn node(&self, index: usize) -> &Node<T> {
        self.slots[index].node.as_ref().expect("dangling interval link")
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<T> {
        self.slots[index].node.as_mut().expect("dangling interval link")
    }
}

/// In-order iterator over an [`IntervalTree`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    tree: &'a IntervalTree<T>,
    next: Option<Handle>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a Interval<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.next?;
        self.next = self.tree.successor(handle);
        self.tree.get(handle).map(|interval| (handle, interval))
    }
}

impl<'a, T> IntoIterator for &'a IntervalTree<T> {
    type Item = (Handle, &'a Interval<T>);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
