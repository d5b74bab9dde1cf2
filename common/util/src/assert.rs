/// Assert that each of the `expected` strings occurs in `content`, in order, without overlap.
#[macro_export]
macro_rules! assert_contains_inorder {
    ($content:expr, $expected:expr) => {{
        let content: &str = $content.as_ref();
        let mut remaining = content;
        for expected in $expected.iter() {
            let expected: &str = expected.as_ref();
            match remaining.find(expected) {
                Some(index) => remaining = &remaining[index + expected.len()..],
                None => panic!(
                    "expected content not found, or out of order. expected: {:?}, content: {:?}",
                    expected, content
                ),
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn in_order() {
        assert_contains_inorder!("one two three", ["one", "three"]);
    }

    #[test]
    #[should_panic]
    fn out_of_order() {
        assert_contains_inorder!("one two three", ["three", "one"]);
    }
}
