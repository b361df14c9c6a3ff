#[macro_export]
macro_rules! assert_empty {
    ($e:expr) => {{
        let actual = &$e;
        if !actual.is_empty() {
            panic!("expected empty; actual={:?}", actual);
        }
    }};
}
