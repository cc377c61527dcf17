use std::cmp::Ordering;

/// Binary max-heap ordered by a caller-supplied comparison.
///
/// `pop` always yields an item no smaller than any item left behind, so
/// draining the heap produces a non-increasing sequence.
pub struct MaxHeap<T, F> {
    items: Vec<T>,
    cmp: F,
}

impl<T, F> MaxHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(cmp: F) -> Self {
        Self {
            items: Vec::new(),
            cmp,
        }
    }

    pub fn with_capacity(capacity: usize, cmp: F) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        self.sift_down(0);
        top
    }

    fn greater(&self, a: usize, b: usize) -> bool {
        (self.cmp)(&self.items[a], &self.items[b]) == Ordering::Greater
    }

    fn sift_up(&mut self, mut child: usize) {
        while child > 0 {
            let parent = (child - 1) / 2;
            if !self.greater(child, parent) {
                break;
            }
            self.items.swap(child, parent);
            child = parent;
        }
    }

    fn sift_down(&mut self, mut parent: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * parent + 1;
            let right = left + 1;
            let mut largest = parent;
            if left < len && self.greater(left, largest) {
                largest = left;
            }
            if right < len && self.greater(right, largest) {
                largest = right;
            }
            if largest == parent {
                break;
            }
            self.items.swap(parent, largest);
            parent = largest;
        }
    }
}

impl<T, F> Iterator for MaxHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permutations(items: &[u32]) -> Vec<Vec<u32>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn drains_non_increasing_for_every_push_order() {
        // Duplicates included on purpose
        for perm in permutations(&[5, 1, 4, 4, 2, 9]) {
            let mut heap = MaxHeap::new(|a: &u32, b: &u32| a.cmp(b));
            for n in &perm {
                heap.push(*n);
            }
            let drained: Vec<_> = heap.collect();
            assert_eq!(drained, vec![9, 5, 4, 4, 2, 1], "push order {perm:?}");
        }
    }

    #[test]
    fn interleaved_pushes_and_pops() {
        let mut heap = MaxHeap::new(|a: &i32, b: &i32| a.cmp(b));
        assert_eq!(heap.pop(), None);
        heap.push(3);
        heap.push(7);
        assert_eq!(heap.pop(), Some(7));
        heap.push(1);
        heap.push(5);
        assert_eq!(heap.peek(), Some(&5));
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.pop(), Some(5));
        assert_eq!(heap.pop(), Some(3));
        assert_eq!(heap.pop(), Some(1));
        assert!(heap.is_empty());
    }

    #[test]
    fn ties_follow_the_secondary_key() {
        let mut heap = MaxHeap::new(|a: &(u32, usize), b: &(u32, usize)| {
            a.0.cmp(&b.0).then(b.1.cmp(&a.1))
        });
        for item in [(2, 3), (2, 0), (1, 1), (2, 2)] {
            heap.push(item);
        }
        let order: Vec<_> = heap.map(|(_, i)| i).collect();
        assert_eq!(order, vec![0, 2, 3, 1]);
    }
}
