// Options as embedded configuration (serde)

use atomwrite_core::{CommitMode, DirectMode, Durability, Options, Preserve, Strategy};

#[test]
fn defaults_are_atomic_full_replace() {
    let o = Options::default();
    assert_eq!(o.strategy, Strategy::ReplaceExisting);
    assert_eq!(o.durability, Durability::Full);
    assert_eq!(o.commit, CommitMode::Atomic);
    assert!(!o.create_intermediates);
    assert!(!o.preserve.any());
    assert!(o.is_atomic());
}

#[test]
fn empty_json_object_gives_defaults() {
    let o: Options = serde_json::from_str("{}").unwrap();
    assert_eq!(o, Options::default());
}

#[test]
fn parse_snake_case_config() {
    let json = r#"{
        "strategy": "no_clobber",
        "durability": "data_only",
        "preserve": { "permissions": true, "strict_ownership": true },
        "create_intermediates": true,
        "commit": { "kind": "direct", "mode": "create_new" }
    }"#;
    let o: Options = serde_json::from_str(json).unwrap();
    assert_eq!(o.strategy, Strategy::NoClobber);
    assert_eq!(o.durability, Durability::DataOnly);
    assert!(o.preserve.permissions);
    assert!(o.preserve.wants_ownership());
    assert!(!o.preserve.timestamps);
    assert!(o.create_intermediates);
    assert_eq!(o.commit, CommitMode::Direct { mode: DirectMode::CreateNew });
    assert!(!o.is_atomic());
}

#[test]
fn direct_mode_defaults_to_truncate() {
    let o: Options = serde_json::from_str(r#"{ "commit": { "kind": "direct" } }"#).unwrap();
    assert_eq!(o.commit, CommitMode::Direct { mode: DirectMode::Truncate });
}

#[test]
fn serialized_form_reads_back() {
    let o = Options::new()
        .with_strategy(Strategy::NoClobber)
        .with_durability(Durability::None)
        .with_preserve(Preserve::all())
        .create_intermediates(true);
    let text = serde_json::to_string(&o).unwrap();
    assert!(text.contains("\"no_clobber\""));
    assert!(text.contains("\"none\""));
    let back: Options = serde_json::from_str(&text).unwrap();
    assert_eq!(back, o);
}

#[test]
fn durability_tiers() {
    assert!(Durability::Full.syncs_file() && Durability::Full.syncs_directory());
    assert!(Durability::DataOnly.syncs_file() && !Durability::DataOnly.syncs_directory());
    assert!(!Durability::None.syncs_file() && !Durability::None.syncs_directory());
}

#[test]
fn unknown_strategy_is_rejected() {
    let r: Result<Options, _> = serde_json::from_str(r#"{ "strategy": "clobber_maybe" }"#);
    assert!(r.is_err());
}
