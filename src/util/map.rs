use hashbrown::HashSet;

/// 紀錄的鍵名
pub trait Keyable {
    fn key(&self) -> String;
}

/// Keeps the first entity of every key, preserving the input order.
pub fn dedup_by_key<T: Keyable>(entities: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(entities.len());
    entities
        .into_iter()
        .filter(|e| seen.insert(e.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str, i32);

    impl Keyable for Item {
        fn key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_dedup_by_key_first_wins() {
        let items = vec![Item("a", 1), Item("b", 2), Item("a", 3), Item("c", 4)];
        let result = dedup_by_key(items);

        let pairs: Vec<(&str, i32)> = result.iter().map(|i| (i.0, i.1)).collect();
        assert_eq!(pairs, vec![("a", 1), ("b", 2), ("c", 4)]);
    }
}
