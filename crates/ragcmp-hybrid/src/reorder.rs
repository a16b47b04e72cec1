/// Long-context reordering: keeps the best item first and moves the
/// second best to the end, so the strongest evidence sits at both edges.
///
/// `[a, b, c, d] -> [a, c, d, b]`; two or fewer items are returned unchanged.
pub fn reorder<T>(mut items: Vec<T>) -> Vec<T> {
    if items.len() <= 2 {
        return items;
    }
    let second = items.remove(1);
    items.push(second);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_inputs_unchanged() {
        assert_eq!(reorder(Vec::<u8>::new()), Vec::<u8>::new());
        assert_eq!(reorder(vec!['a']), vec!['a']);
        assert_eq!(reorder(vec!['a', 'b']), vec!['a', 'b']);
    }

    #[test]
    fn second_moves_to_end() {
        assert_eq!(reorder(vec!['a', 'b', 'c']), vec!['a', 'c', 'b']);
        assert_eq!(reorder(vec!['a', 'b', 'c', 'd']), vec!['a', 'c', 'd', 'b']);
    }

    #[test]
    fn is_a_permutation() {
        let items: Vec<u32> = (0..9).collect();
        let mut out = reorder(items.clone());
        out.sort();
        assert_eq!(out, items);
    }
}
