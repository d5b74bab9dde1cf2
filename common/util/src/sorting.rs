use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Apply the sort order to an ordering that was computed in ascending order.
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use rstest::rstest;

    use super::SortOrder;

    #[rstest]
    #[case(SortOrder::Asc, Ordering::Less, Ordering::Less)]
    #[case(SortOrder::Asc, Ordering::Greater, Ordering::Greater)]
    #[case(SortOrder::Desc, Ordering::Less, Ordering::Greater)]
    #[case(SortOrder::Desc, Ordering::Equal, Ordering::Equal)]
    fn apply(#[case] sort_order: SortOrder, #[case] ordering: Ordering, #[case] expected_result: Ordering) {
        assert_eq!(sort_order.apply(ordering), expected_result);
    }
}
