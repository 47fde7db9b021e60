//! The two merge operators used by layered configuration.
//!
//! * **replace** — an incoming value completely replaces the key it targets;
//!   keys absent from the incoming layer are left untouched.
//! * **combine** — a deep merge: object-valued entries are merged field by
//!   field with the incoming operand winning on conflicts, while fields the
//!   incoming operand leaves unset retain the existing value.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::ConfigMap;
use crate::settings::Settings;

/// How an incoming configuration layer is applied onto an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Incoming values replace existing keys wholesale.
    Replace,
    /// Incoming values are deep-merged into existing keys.
    Combine,
}

/// Deep-merges `update` into `base`. Objects merge recursively, anything
/// else is overwritten by the incoming value.
pub(crate) fn combine_value(base: &mut Value, update: Value) {
    match (base, update) {
        (Value::Object(base), Value::Object(update)) => {
            for (key, value) in update {
                match base.get_mut(&key) {
                    Some(slot) => combine_value(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, update) => *slot = update,
    }
}

pub(crate) fn apply_map(base: &mut ConfigMap, update: ConfigMap, mode: MergeMode) {
    for (key, value) in update {
        match mode {
            MergeMode::Replace => {
                base.insert(key, value);
            }
            MergeMode::Combine => match base.get_mut(&key) {
                Some(slot) => combine_value(slot, value),
                None => {
                    base.insert(key, value);
                }
            },
        }
    }
}

/// Combines two settings objects for the same key. The incoming operand wins
/// field by field and its capability variant is kept as authored.
pub(crate) fn combine_setting(existing: Settings, incoming: Settings) -> Settings {
    let mut values = existing.into_values();
    apply_map(&mut values, incoming.values().clone(), MergeMode::Combine);
    incoming.with_values(values)
}

pub(crate) fn apply_settings(
    base: &mut BTreeMap<String, Settings>,
    update: BTreeMap<String, Settings>,
    mode: MergeMode,
) {
    for (key, incoming) in update {
        match mode {
            MergeMode::Replace => {
                base.insert(key, incoming);
            }
            MergeMode::Combine => match base.remove(&key) {
                Some(existing) => {
                    base.insert(key, combine_setting(existing, incoming));
                }
                None => {
                    base.insert(key, incoming);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(pairs: &[(&str, Value)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn combine_merges_nested_objects() {
        let mut base = json!({"resources": {"cpu": 1, "memory": "8Gi"}, "region": "eu"});
        combine_value(
            &mut base,
            json!({"resources": {"cpu": 4}, "zone": "eu-west-1"}),
        );

        assert_eq!(
            base,
            json!({
                "resources": {"cpu": 4, "memory": "8Gi"},
                "region": "eu",
                "zone": "eu-west-1",
            })
        );
    }

    #[test]
    fn combine_overwrites_scalars() {
        let mut base = json!("gpu-small");
        combine_value(&mut base, json!("gpu-large"));
        assert_eq!(base, json!("gpu-large"));
    }

    #[test]
    fn replace_swaps_keys_wholesale() {
        let mut base = map(&[
            ("resources", json!({"cpu": 1, "memory": "8Gi"})),
            ("region", json!("eu")),
        ]);
        apply_map(
            &mut base,
            map(&[("resources", json!({"cpu": 4}))]),
            MergeMode::Replace,
        );

        // The whole `resources` entry was replaced, `region` survived.
        assert_eq!(base["resources"], json!({"cpu": 4}));
        assert_eq!(base["region"], json!("eu"));
    }

    #[test]
    fn combine_keeps_unset_fields() {
        let mut base = map(&[("resources", json!({"cpu": 1, "memory": "8Gi"}))]);
        apply_map(
            &mut base,
            map(&[("resources", json!({"cpu": 4}))]),
            MergeMode::Combine,
        );

        assert_eq!(base["resources"], json!({"cpu": 4, "memory": "8Gi"}));
    }

    #[test]
    fn combine_setting_prefers_the_incoming_operand() {
        let existing = Settings::Shared(map(&[("cpu", json!(1)), ("memory", json!("8Gi"))]));
        let incoming = Settings::Step(map(&[("cpu", json!(8))]));

        let combined = combine_setting(existing, incoming);
        assert_eq!(
            combined,
            Settings::Step(map(&[("cpu", json!(8)), ("memory", json!("8Gi"))]))
        );
    }
}
