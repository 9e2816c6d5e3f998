// Property: cache keys identify a read by alias and the exact argument list.
// Different aliases, different argument lists, and argument lists that only
// differ in how the same characters are split all produce different keys.

use datasource_core::CacheKey;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Different aliases with the same arguments never share a key
    #[test]
    fn prop_cache_key_unique_aliases(
        alias1 in "[a-z]{1,10}",
        alias2 in "[a-z]{1,10}",
        args in prop::collection::vec("[a-z0-9]{0,6}", 0..4),
    ) {
        prop_assume!(alias1 != alias2);

        let key1 = CacheKey::new(&alias1, &args);
        let key2 = CacheKey::new(&alias2, &args);

        prop_assert_ne!(key1, key2, "aliases '{}' and '{}' collided", alias1, alias2);
    }

    /// Different argument lists for one alias never share a key
    #[test]
    fn prop_cache_key_unique_args(
        alias in "[a-z]{1,10}",
        args1 in prop::collection::vec("[a-z0-9]{0,6}", 0..4),
        args2 in prop::collection::vec("[a-z0-9]{0,6}", 0..4),
    ) {
        prop_assume!(args1 != args2);

        prop_assert_ne!(CacheKey::new(&alias, &args1), CacheKey::new(&alias, &args2));
    }

    /// Splitting the same text into different arguments gives different keys
    #[test]
    fn prop_cache_key_no_concatenation_collision(
        alias in "[a-z]{1,10}",
        text in "[a-z]{2,12}",
        split in 1usize..12,
    ) {
        prop_assume!(split < text.len());

        let (head, tail) = text.split_at(split);
        let joined = CacheKey::new(&alias, &[text.as_str()]);
        let parts = CacheKey::new(&alias, &[head, tail]);

        prop_assert_ne!(joined, parts);
    }

    /// Keys built from equal inputs are equal and hash the same
    #[test]
    fn prop_cache_key_deterministic(
        alias in "[a-z]{1,10}",
        args in prop::collection::vec("[a-z0-9]{0,6}", 0..4),
    ) {
        let key1 = CacheKey::new(&alias, &args);
        let key2 = CacheKey::new(&alias, &args);

        let mut set = HashSet::new();
        set.insert(key1.clone());
        prop_assert!(set.contains(&key2));
        prop_assert_eq!(key1.alias(), alias.as_str());
        prop_assert_eq!(key1.args(), args.as_slice());
    }
}
