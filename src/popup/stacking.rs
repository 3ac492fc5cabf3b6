/// First stacking value handed out.
pub const BASE_Z_INDEX: u32 = 1000;

/// Page-wide z-order counter shared by every popup on the page.
#[derive(Debug, Clone)]
pub struct StackingContext {
    counter: u32,
}

impl Default for StackingContext {
    fn default() -> Self {
        Self {
            counter: BASE_Z_INDEX,
        }
    }
}

impl StackingContext {
    /// Stacking value for a newly created popup.
    pub fn next(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Renumber `count` popups in document order as `BASE + i`, then give the
    /// popup at `active` the highest value, `BASE + count`.
    pub fn bring_to_front(&mut self, count: usize, active: usize) -> Vec<u32> {
        let top = BASE_Z_INDEX + count as u32;
        let mut values: Vec<u32> = (0..count as u32).map(|i| BASE_Z_INDEX + i).collect();
        if let Some(v) = values.get_mut(active) {
            *v = top;
        }
        self.counter = top;
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_increments_from_base() {
        let mut stack = StackingContext::default();
        assert_eq!(stack.next(), 1001);
        assert_eq!(stack.next(), 1002);
    }

    #[test]
    fn raising_first_of_three() {
        let mut stack = StackingContext::default();
        let values = stack.bring_to_front(3, 0);
        assert_eq!(values, vec![1003, 1001, 1002]);
        assert!(values[0] > values[1] && values[0] > values[2]);
        assert_eq!(stack.next(), 1004);
    }
}
