/// All ways of picking one element from each of the given sequences, in
/// order. The product of an empty sequence list is a single empty choice.
pub fn cartesian_product<T: Clone>(
    choices_sequence: &[Vec<T>],
) -> Vec<Vec<T>> {
    let mut result = vec![vec![]];
    for choices in choices_sequence {
        let mut next = Vec::with_capacity(result.len() * choices.len());
        for prefix in &result {
            for choice in choices {
                let mut row = prefix.clone();
                row.push(choice.clone());
                next.push(row);
            }
        }
        result = next;
    }
    result
}
