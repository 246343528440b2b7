/// Breakpoint addresses, kept sorted and without duplicates.
#[derive(Debug, Default)]
pub struct Breakpoints(Vec<u8>);

impl Breakpoints {
    pub fn contains(&self, address: u8) -> bool {
        self.0.binary_search(&address).is_ok()
    }

    /// Returns `false` if a breakpoint already exists at `address`.
    pub fn insert(&mut self, address: u8) -> bool {
        match self.0.binary_search(&address) {
            Ok(_) => false,
            Err(index) => {
                self.0.insert(index, address);
                true
            }
        }
    }

    /// Returns whether a breakpoint was found at `address`.
    pub fn remove(&mut self, address: u8) -> bool {
        match self.0.binary_search(&address) {
            Ok(index) => {
                self.0.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_unique() {
        let mut breakpoints = Breakpoints::default();
        assert!(breakpoints.insert(0x10));
        assert!(breakpoints.insert(0x02));
        assert!(!breakpoints.insert(0x10));
        assert!(breakpoints.insert(0xFF));
        assert_eq!(breakpoints.iter().collect::<Vec<_>>(), vec![0x02, 0x10, 0xFF]);
        assert!(breakpoints.contains(0x02));

        assert!(breakpoints.remove(0x10));
        assert!(!breakpoints.remove(0x10));
        assert!(!breakpoints.contains(0x10));
        assert_eq!(breakpoints.len(), 2);
    }
}
