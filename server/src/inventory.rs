//! Player-owned items and currency.
//!
//! Every mutating operation is all-or-nothing: it either applies in full or
//! returns `false` and leaves the inventory untouched.

use crate::defs;
use shared::ItemId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item: ItemId,
    /// Always greater than zero.
    pub amount: u32,
    pub meta: Option<String>,
}

impl ItemStack {
    pub fn new(item: ItemId, amount: u32) -> Self {
        Self {
            item,
            amount,
            meta: None,
        }
    }
}

/// Fixed number of ordered slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    active_slot: usize,
}

impl Inventory {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
            active_slot: 0,
        }
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn active_slot(&self) -> usize {
        self.active_slot
    }

    pub fn active_item(&self) -> Option<ItemId> {
        self.slots
            .get(self.active_slot)
            .and_then(|slot| slot.as_ref())
            .map(|stack| stack.item)
    }

    /// Switches the active slot. Out-of-range indices are ignored.
    pub fn set_active(&mut self, slot: usize) -> bool {
        if slot < self.slots.len() {
            self.active_slot = slot;
            true
        } else {
            false
        }
    }

    pub fn count(&self, item: ItemId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.item == item)
            .map(|stack| stack.amount)
            .sum()
    }

    pub fn has(&self, item: ItemId, amount: u32) -> bool {
        self.count(item) >= amount
    }

    pub fn has_all(&self, items: &[(ItemId, u32)]) -> bool {
        // Summed per item so duplicate entries are not double counted.
        let mut needed: Vec<(ItemId, u32)> = Vec::new();
        for &(item, amount) in items {
            match needed.iter_mut().find(|(i, _)| *i == item) {
                Some((_, n)) => *n += amount,
                None => needed.push((item, amount)),
            }
        }
        needed.iter().all(|&(item, amount)| self.has(item, amount))
    }

    /// How many of `item` still fit, counting partial stacks and free slots.
    pub fn capacity_for(&self, item: ItemId) -> u32 {
        let max = defs::item_max_stack(item);
        self.slots
            .iter()
            .map(|slot| match slot {
                None => max,
                Some(stack) if stack.item == item => max.saturating_sub(stack.amount),
                Some(_) => 0,
            })
            .sum()
    }

    pub fn can_add(&self, item: ItemId, amount: u32) -> bool {
        self.capacity_for(item) >= amount
    }

    /// Adds `amount` of `item`, topping up existing stacks first.
    pub fn add(&mut self, item: ItemId, amount: u32) -> bool {
        if amount == 0 {
            return true;
        }
        if !self.can_add(item, amount) {
            return false;
        }
        let max = defs::item_max_stack(item);
        let mut left = amount;
        for stack in self.slots.iter_mut().flatten() {
            if stack.item == item && stack.amount < max {
                let moved = left.min(max - stack.amount);
                stack.amount += moved;
                left -= moved;
                if left == 0 {
                    return true;
                }
            }
        }
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                let moved = left.min(max);
                *slot = Some(ItemStack::new(item, moved));
                left -= moved;
                if left == 0 {
                    return true;
                }
            }
        }
        left == 0
    }

    /// Removes `amount` of `item`, draining the last stacks first.
    pub fn remove(&mut self, item: ItemId, amount: u32) -> bool {
        if !self.has(item, amount) {
            return false;
        }
        let mut left = amount;
        for slot in self.slots.iter_mut().rev() {
            if left == 0 {
                break;
            }
            if let Some(stack) = slot {
                if stack.item == item {
                    let taken = left.min(stack.amount);
                    stack.amount -= taken;
                    left -= taken;
                    if stack.amount == 0 {
                        *slot = None;
                    }
                }
            }
        }
        true
    }

    pub fn remove_all(&mut self, items: &[(ItemId, u32)]) -> bool {
        if !self.has_all(items) {
            return false;
        }
        for &(item, amount) in items {
            self.remove(item, amount);
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wallet {
    pub gold: u32,
}

impl Wallet {
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    pub fn deposit(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_stacks_before_new_slots() {
        let mut inv = Inventory::new(3);
        assert!(inv.add(ItemId::Wood, 10));
        assert!(inv.add(ItemId::Wood, 5));
        assert_eq!(inv.count(ItemId::Wood), 15);
        assert_eq!(inv.slots().iter().flatten().count(), 1);
    }

    #[test]
    fn test_add_respects_max_stack() {
        let mut inv = Inventory::new(2);
        let max = defs::item_max_stack(ItemId::IronBar);
        assert!(inv.add(ItemId::IronBar, max + 1));
        let amounts: Vec<u32> = inv.slots().iter().flatten().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![max, 1]);
        assert!(inv.slots().iter().flatten().all(|s| s.amount <= max));
    }

    #[test]
    fn test_add_all_or_nothing() {
        let mut inv = Inventory::new(1);
        let max = defs::item_max_stack(ItemId::Stone);
        assert!(inv.add(ItemId::Stone, max - 1));
        let before = inv.clone();
        assert!(!inv.add(ItemId::Stone, 2));
        assert_eq!(inv, before);
        assert!(!inv.add(ItemId::Wood, 1));
        assert_eq!(inv, before);
    }

    #[test]
    fn test_remove_clears_empty_slots() {
        let mut inv = Inventory::new(2);
        inv.add(ItemId::Wood, 5);
        assert!(inv.remove(ItemId::Wood, 5));
        assert!(inv.slots().iter().all(|s| s.is_none()));
        assert!(!inv.remove(ItemId::Wood, 1));
    }

    #[test]
    fn test_remove_all_is_atomic() {
        let mut inv = Inventory::new(4);
        inv.add(ItemId::Wood, 5);
        inv.add(ItemId::Stone, 1);
        let before = inv.clone();
        assert!(!inv.remove_all(&[(ItemId::Wood, 2), (ItemId::Stone, 2)]));
        assert_eq!(inv, before);
        assert!(inv.remove_all(&[(ItemId::Wood, 2), (ItemId::Stone, 1)]));
        assert_eq!(inv.count(ItemId::Wood), 3);
        assert_eq!(inv.count(ItemId::Stone), 0);
    }

    #[test]
    fn test_has_all_sums_duplicates() {
        let mut inv = Inventory::new(2);
        inv.add(ItemId::Wood, 3);
        assert!(!inv.has_all(&[(ItemId::Wood, 2), (ItemId::Wood, 2)]));
        assert!(inv.has_all(&[(ItemId::Wood, 1), (ItemId::Wood, 2)]));
    }

    #[test]
    fn test_active_slot_bounds() {
        let mut inv = Inventory::new(2);
        assert!(inv.set_active(1));
        assert!(!inv.set_active(2));
        assert_eq!(inv.active_slot(), 1);
    }

    #[test]
    fn test_wallet_spend() {
        let mut wallet = Wallet { gold: 10 };
        assert!(!wallet.spend(11));
        assert_eq!(wallet.gold, 10);
        assert!(wallet.spend(10));
        assert_eq!(wallet.gold, 0);
    }
}
