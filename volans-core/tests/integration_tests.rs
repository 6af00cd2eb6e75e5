use volans_core::*;

#[test]
fn test_namespace_id_parsing() {
    // Bare inode and full link text both work
    assert_eq!(
        "4026531840".parse::<NamespaceId>().unwrap().inode(),
        4_026_531_840
    );
    assert_eq!(
        "net:[4026531840]".parse::<NamespaceId>().unwrap().inode(),
        4_026_531_840
    );

    // Invalid
    assert!("".parse::<NamespaceId>().is_err());
    assert!("net:[]".parse::<NamespaceId>().is_err());
    assert!("net:[-1]".parse::<NamespaceId>().is_err());
    assert!("[4026531840]".parse::<NamespaceId>().is_err());
}

#[test]
fn test_namespace_id_serialization() {
    let id = NamespaceId::from_inode(4_026_532_200);

    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "4026532200");

    let deserialized: NamespaceId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

#[test]
fn test_namespace_kind_serialization() {
    let json = serde_json::to_string(&NamespaceKind::Net).unwrap();
    assert_eq!(json, "\"net\"");

    let kinds: Vec<NamespaceKind> = serde_json::from_str(r#"["uts","ipc"]"#).unwrap();
    assert_eq!(kinds, vec![NamespaceKind::Uts, NamespaceKind::Ipc]);
}

#[test]
fn test_cpu_affinity_single_word() {
    let mask: CpuAffinity = "3".parse().unwrap();
    assert_eq!(mask.to_binary_string(), "11");
    assert_eq!(mask.count(), 2);

    assert!("zz".parse::<CpuAffinity>().is_err());
}

#[test]
fn test_interface_stat_default_is_empty() {
    let stat = InterfaceStat {
        name: "eth1".to_string(),
        rx_errors: 3,
        ..Default::default()
    };

    assert!(stat.link_type.is_none());
    assert!(stat.hardware_address.is_none());
    assert_eq!(stat.mtu, 0);
    assert_eq!(stat.offload, OffloadFeatures::default());
    assert_eq!(stat.rx_errors, 3);
}

#[test]
fn test_process_attributes_json() {
    let attrs = ProcessAttributes {
        pid: ProcessId::from_raw(1),
        command_name: "systemd".to_string(),
        state: "S".to_string(),
        cpu_affinity: "ff".parse().unwrap(),
        command_line: "/sbin/init".to_string(),
    };

    let json = serde_json::to_value(&attrs).unwrap();
    assert_eq!(json["pid"], 1);
    assert_eq!(json["cpu_affinity"], serde_json::json!([255]));
}

#[test]
fn test_config_roundtrip() {
    let config = EngineConfig::new().with_retention(OwnershipRetention::PruneUnobserved);

    let json = serde_json::to_string(&config).unwrap();
    let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, deserialized);
}
