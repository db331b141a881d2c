use crate::utils::case_insensitive_eq;

/// Ordered store for the headers that have no typed field on a header model.
///
/// Keys are compared case-insensitively; insertion order is preserved and is the
/// order in which the entries are written back to the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, keeping any existing entries with the same key.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        self.entries.push((key.to_vec(), value.to_vec()));
    }

    /// Replaces the value of the first entry with this key and removes the others,
    /// or appends a new entry.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        match self.entries.iter().position(|(k, _)| case_insensitive_eq(k, key)) {
            Some(index) => {
                let entry = &mut self.entries[index].1;
                entry.clear();
                entry.extend_from_slice(value);
                let mut seen = 0usize;
                self.entries.retain(|(k, _)| {
                    if case_insensitive_eq(k, key) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.add(key, value),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.iter().find(|(k, _)| case_insensitive_eq(k, key)).map(|(_, v)| v.as_slice())
    }

    pub fn get_all<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.entries.iter().filter(move |(k, _)| case_insensitive_eq(k, key)).map(|(_, v)| v.as_slice())
    }

    #[inline]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &[u8]) {
        self.entries.retain(|(k, _)| !case_insensitive_eq(k, key));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_case() {
        let mut args = Args::new();
        args.add(b"X-One", b"1");
        args.add(b"X-Two", b"2");
        args.add(b"x-one", b"3");

        assert_eq!(args.get(b"X-ONE"), Some(&b"1"[..]));
        assert_eq!(args.get_all(b"x-one").collect::<Vec<_>>(), vec![&b"1"[..], &b"3"[..]]);

        args.set(b"X-One", b"4");
        let collected: Vec<_> = args.iter().collect();
        assert_eq!(collected, vec![(&b"X-One"[..], &b"4"[..]), (&b"X-Two"[..], &b"2"[..])]);

        args.remove(b"x-two");
        assert_eq!(args.len(), 1);
        assert!(!args.contains(b"X-Two"));
    }
}
