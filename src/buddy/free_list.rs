//! Order-indexed free lists
//!
//! One intrusive doubly linked list per order. The links live in the block
//! records themselves, so the lists only keep head and length and every
//! operation borrows the [`BlockTable`] that owns the nodes.

#[cfg(feature = "log")]
use log::error;

use alloc::vec;
use alloc::vec::Vec;

use super::{block_table::BlockTable, buddy_block::BlockId};

/// Free list for a single order
#[derive(Debug, Clone, Copy, Default)]
struct OrderList {
    head: Option<BlockId>,
    len: usize,
}

/// Free lists for orders `0..=max_order`
pub struct FreeListIndex {
    lists: Vec<OrderList>,
}

impl FreeListIndex {
    /// Create empty lists for orders `0..=max_order`
    pub fn new(max_order: usize) -> Self {
        Self {
            lists: vec![OrderList::default(); max_order + 1],
        }
    }

    /// Forget every entry. The caller is expected to clear the table too.
    pub fn clear(&mut self) {
        for list in &mut self.lists {
            *list = OrderList::default();
        }
    }

    /// Push a free block at the front of the list for its order
    pub fn push(&mut self, table: &mut BlockTable, id: BlockId) {
        let order = table[id].order;
        debug_assert!(table[id].is_free(), "pushing an occupied block");

        let list = &mut self.lists[order];
        let old_head = list.head;
        {
            let block = &mut table[id];
            block.prev_free = None;
            block.next_free = old_head;
        }
        if let Some(head) = old_head {
            table[head].prev_free = Some(id);
        }
        list.head = Some(id);
        list.len += 1;
    }

    /// Pop the first free block of the given order
    pub fn pop(&mut self, table: &mut BlockTable, order: usize) -> Option<BlockId> {
        let id = self.lists.get(order)?.head?;
        self.remove(table, id);
        Some(id)
    }

    /// Unlink a block from the list for its order in O(1)
    pub fn remove(&mut self, table: &mut BlockTable, id: BlockId) {
        let (order, prev, next) = {
            let block = &table[id];
            (block.order, block.prev_free, block.next_free)
        };

        match prev {
            Some(prev) => table[prev].next_free = next,
            None => {
                let linked = self.lists[order].head == Some(id);
                debug_assert!(
                    linked,
                    "free list: block {} at order {} is not linked",
                    id.index(),
                    order
                );
                if !linked {
                    error!(
                        "free list: block {} at order {} is not linked",
                        id.index(),
                        order
                    );
                    return;
                }
                self.lists[order].head = next;
            }
        }
        if let Some(next) = next {
            table[next].prev_free = prev;
        }

        let block = &mut table[id];
        block.prev_free = None;
        block.next_free = None;
        self.lists[order].len -= 1;
    }

    /// First order at or above `from` with a free block
    pub fn first_non_empty(&self, from: usize) -> Option<usize> {
        (from..self.lists.len()).find(|&order| self.lists[order].head.is_some())
    }

    pub fn is_empty(&self, order: usize) -> bool {
        self.len(order) == 0
    }

    /// Number of free blocks at the given order
    pub fn len(&self, order: usize) -> usize {
        self.lists.get(order).map_or(0, |list| list.len)
    }

    /// Total number of free blocks over all orders
    pub fn total_blocks(&self) -> usize {
        self.lists.iter().map(|list| list.len).sum()
    }

    /// Free units summed over all orders
    pub fn free_units(&self) -> usize {
        self.lists
            .iter()
            .enumerate()
            .map(|(order, list)| list.len << order)
            .sum()
    }

    /// Iterate the free blocks of one order
    pub fn iter<'a>(&self, table: &'a BlockTable, order: usize) -> FreeListIter<'a> {
        FreeListIter {
            table,
            current: self.lists.get(order).and_then(|list| list.head),
        }
    }

    /// Whether `id` is currently linked into the list for its order
    pub fn is_linked(&self, table: &BlockTable, id: BlockId) -> bool {
        let Some(block) = table.get(id) else {
            return false;
        };
        block.prev_free.is_some()
            || self
                .lists
                .get(block.order)
                .is_some_and(|list| list.head == Some(id))
    }
}

/// Iterator over one order's free list
pub struct FreeListIter<'a> {
    table: &'a BlockTable,
    current: Option<BlockId>,
}

impl Iterator for FreeListIter<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let id = self.current?;
        self.current = self.table.get(id).and_then(|block| block.next_free);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buddy::buddy_block::Block;

    fn setup() -> (BlockTable, FreeListIndex) {
        (BlockTable::new(), FreeListIndex::new(4))
    }

    #[test]
    fn test_push_pop() {
        let (mut table, mut lists) = setup();
        let a = table.insert(Block::free(0, 1));
        let b = table.insert(Block::free(2, 1));

        lists.push(&mut table, a);
        lists.push(&mut table, b);
        assert_eq!(lists.len(1), 2);
        assert_eq!(lists.free_units(), 4);

        // Most recently pushed comes out first
        assert_eq!(lists.pop(&mut table, 1), Some(b));
        assert_eq!(lists.pop(&mut table, 1), Some(a));
        assert_eq!(lists.pop(&mut table, 1), None);
        assert!(lists.is_empty(1));
    }

    #[test]
    fn test_remove_middle() {
        let (mut table, mut lists) = setup();
        let ids: Vec<BlockId> = (0..3)
            .map(|i| table.insert(Block::free(i * 2, 1)))
            .collect();
        for &id in &ids {
            lists.push(&mut table, id);
        }

        lists.remove(&mut table, ids[1]);
        assert_eq!(lists.len(1), 2);
        assert!(!lists.is_linked(&table, ids[1]));

        let remaining: Vec<BlockId> = lists.iter(&table, 1).collect();
        assert_eq!(remaining, [ids[2], ids[0]]);
        assert_eq!(table[ids[2]].prev_free, None);
        assert_eq!(table[ids[0]].prev_free, Some(ids[2]));
    }

    #[test]
    fn test_first_non_empty() {
        let (mut table, mut lists) = setup();
        assert_eq!(lists.first_non_empty(0), None);

        let a = table.insert(Block::free(8, 3));
        lists.push(&mut table, a);
        assert_eq!(lists.first_non_empty(0), Some(3));
        assert_eq!(lists.first_non_empty(3), Some(3));
        assert_eq!(lists.first_non_empty(4), None);
        assert_eq!(lists.first_non_empty(9), None);
        assert_eq!(lists.total_blocks(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not linked")]
    fn test_remove_unlinked_panics() {
        let (mut table, mut lists) = setup();
        let a = table.insert(Block::free(0, 0));
        let b = table.insert(Block::free(1, 0));
        lists.push(&mut table, a);
        assert!(!lists.is_linked(&table, b));

        lists.remove(&mut table, b);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_remove_unlinked_keeps_list() {
        let (mut table, mut lists) = setup();
        let a = table.insert(Block::free(0, 0));
        let b = table.insert(Block::free(1, 0));
        lists.push(&mut table, a);

        lists.remove(&mut table, b);
        assert_eq!(lists.len(0), 1);
        assert!(lists.is_linked(&table, a));
    }
}
