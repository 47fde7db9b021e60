use std::collections::BTreeMap;

/// Captures a descriptive snapshot of the client environment.
///
/// The snapshot is embedded verbatim into every deployment so runs can be
/// traced back to the platform that compiled them.
pub fn client_environment() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("os".to_string(), std::env::consts::OS.to_string()),
        ("arch".to_string(), std::env::consts::ARCH.to_string()),
        ("family".to_string(), std::env::consts::FAMILY.to_string()),
        (
            "client_version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_carries_platform_and_version() {
        let environment = client_environment();
        assert_eq!(environment["os"], std::env::consts::OS);
        assert_eq!(environment["client_version"], env!("CARGO_PKG_VERSION"));
    }
}
