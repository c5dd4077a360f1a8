use serde::{Deserialize, Serialize};

/// How fresh record ids are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Ulid,
    Uuid,
    Nanoid,
}

/// Generate an id such as `u_01hq...` for the given record prefix.
pub fn new_id(prefix: &str, strategy: IdStrategy) -> String {
    let suffix = match strategy {
        IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
        IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
        IdStrategy::Nanoid => nanoid::nanoid!(),
    };
    format!("{prefix}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_prefixed_and_unique() {
        for strategy in [IdStrategy::Ulid, IdStrategy::Uuid, IdStrategy::Nanoid] {
            let ids: HashSet<String> = (0..200).map(|_| new_id("p", strategy)).collect();
            assert_eq!(ids.len(), 200);
            assert!(ids.iter().all(|id| id.starts_with("p_")));
        }
    }
}
