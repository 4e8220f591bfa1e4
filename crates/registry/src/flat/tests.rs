use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use forged_primitives::ManualClock;
use pretty_assertions::assert_eq;

use super::*;

const ADMIN: &str = "admin";

fn registry() -> (FlatRegistry<i32>, ManualClock) {
	let clock = ManualClock::at_epoch();
	(FlatRegistry::with_clock(Arc::new(clock.clone())), clock)
}

fn admin_on(registry: &FlatRegistry<i32>, paths: &[&str]) {
	for path in paths {
		registry.grant(path, ADMIN, [Permission::Read, Permission::Write]).unwrap();
	}
}

fn at(secs: i64) -> Timestamp {
	DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
}

#[test]
fn set_then_get() {
	let (registry, _) = registry();
	admin_on(&registry, &["services.db.port"]);
	registry.set("services.db.port", 5432, ADMIN, SetOptions::new()).unwrap();

	assert_eq!(registry.get("services.db.port", ADMIN).unwrap(), Some(5432));
	assert!(registry.get("services.db.host", ADMIN).is_err(), "grants are per path");
	assert_eq!(registry.list_keys("").unwrap(), ["services"]);
	assert_eq!(registry.list_keys("services.db").unwrap(), ["port"]);
	assert_eq!(registry.list_keys("services.db.port").unwrap(), Vec::<String>::new());
	assert_eq!(registry.list_keys("nowhere").unwrap(), Vec::<String>::new());
}

#[test]
fn missing_path_reads_as_default() {
	let (registry, _) = registry();
	admin_on(&registry, &["a.b"]);
	assert_eq!(registry.get("a.b", ADMIN).unwrap(), None);
	assert_eq!(registry.get_or("a.b", 7, ADMIN).unwrap(), 7);
}

#[test]
fn invalid_paths_are_rejected() {
	let (registry, _) = registry();
	assert!(matches!(
		registry.set("bad path", 1, ADMIN, SetOptions::new()),
		Err(RegistryError::PathFormatInvalid { op: Op::Set, .. })
	));
	assert!(matches!(registry.get("", ADMIN), Err(RegistryError::PathFormatInvalid { op: Op::Get, .. })));
	assert!(matches!(registry.set_alias("ok", "not ok"), Err(RegistryError::PathFormatInvalid { op: Op::SetAlias, .. })));
	assert!(!registry.check_permission("bad path", ADMIN, Permission::Read));
	assert_eq!(Op::CheckPermission.to_string(), "check_permission");
}

#[test]
fn write_is_denied_until_granted() {
	let (registry, _) = registry();
	registry.set_permission("cfg.mode", "viewer", Permission::Read).unwrap();

	let err = registry.set("cfg.mode", 1, "viewer", SetOptions::new()).unwrap_err();
	assert!(matches!(
		err,
		RegistryError::PermissionDenied { op: Op::Set, ref path, ref role, permission: Permission::Write }
			if path == "cfg.mode" && role == "viewer"
	));
	assert_eq!(registry.get("cfg.mode", "viewer").unwrap(), None);
	assert!(registry.get_versions("cfg.mode", "viewer").unwrap().is_empty());

	registry.set_permission("cfg.mode", "viewer", Permission::Write).unwrap();
	registry.set("cfg.mode", 1, "viewer", SetOptions::new()).unwrap();
	assert_eq!(registry.get("cfg.mode", "viewer").unwrap(), Some(1));
}

#[test]
fn unknown_role_is_denied_reads() {
	let (registry, _) = registry();
	admin_on(&registry, &["secret"]);
	registry.set("secret", 1, ADMIN, SetOptions::new()).unwrap();
	assert!(matches!(
		registry.get("secret", "guest"),
		Err(RegistryError::PermissionDenied { permission: Permission::Read, .. })
	));
	assert!(registry.get_metadata("secret", "guest").is_err());
	assert!(registry.delete("secret", "guest").is_err());
}

#[test]
fn entry_expires_after_ttl() {
	let (registry, clock) = registry();
	admin_on(&registry, &["session.token", "session.user"]);
	registry
		.set("session.token", 1, ADMIN, SetOptions::new().ttl(Duration::from_secs(10)))
		.unwrap();
	registry.set("session.user", 2, ADMIN, SetOptions::new()).unwrap();

	assert_eq!(registry.get("session.token", ADMIN).unwrap(), Some(1));
	clock.advance_secs(9);
	assert_eq!(registry.get("session.token", ADMIN).unwrap(), Some(1));

	clock.advance_secs(1);
	assert_eq!(registry.get("session.token", ADMIN).unwrap(), Some(1), "live at its deadline");

	clock.advance_secs(1);
	assert_eq!(registry.list_keys("session").unwrap(), ["user"]);
	assert_eq!(registry.get_or("session.token", -1, ADMIN).unwrap(), -1);
	assert!(registry.get_versions("session.token", ADMIN).unwrap().is_empty());
	assert_eq!(registry.get_metadata("session.token", ADMIN).unwrap(), None);
}

#[test]
fn reclaim_needs_no_write_and_keeps_grants() {
	let (registry, clock) = registry();
	admin_on(&registry, &["cache.hot"]);
	registry.set_permission("cache.hot", "reader", Permission::Read).unwrap();
	registry.set("cache.hot", 1, ADMIN, SetOptions::new().ttl(Duration::from_secs(1))).unwrap();

	clock.advance_secs(2);
	assert_eq!(registry.get("cache.hot", "reader").unwrap(), None);
	assert!(registry.check_permission("cache.hot", ADMIN, Permission::Write));

	registry.set("cache.hot", 2, ADMIN, SetOptions::new()).unwrap();
	assert_eq!(registry.get("cache.hot", "reader").unwrap(), Some(2));
	let meta = registry.get_metadata("cache.hot", ADMIN).unwrap().unwrap();
	assert_eq!(meta.expires_at, None);
	assert_eq!(meta.created_at, at(2));
}

#[test]
fn rewrite_without_ttl_keeps_expiration() {
	let (registry, clock) = registry();
	admin_on(&registry, &["k"]);
	registry.set("k", 1, ADMIN, SetOptions::new().ttl(Duration::from_secs(5))).unwrap();
	clock.advance_secs(1);
	registry.set("k", 2, ADMIN, SetOptions::new()).unwrap();

	assert_eq!(registry.get_metadata("k", ADMIN).unwrap().and_then(|m| m.expires_at), Some(at(5)));
	clock.advance_secs(5);
	assert_eq!(registry.get("k", ADMIN).unwrap(), None);
}

#[test]
fn zero_ttl_reads_back_immediately() {
	let (registry, clock) = registry();
	admin_on(&registry, &["z"]);
	registry.set("z", 7, ADMIN, SetOptions::new().ttl(Duration::ZERO)).unwrap();

	assert_eq!(registry.get("z", ADMIN).unwrap(), Some(7));
	assert_eq!(registry.list_keys("").unwrap(), ["z"]);

	clock.advance(TimeDelta::milliseconds(1));
	assert_eq!(registry.get("z", ADMIN).unwrap(), None);
}

#[test]
fn history_records_every_write_in_order() {
	let (registry, clock) = registry();
	admin_on(&registry, &["app.level"]);
	for value in 1..=3 {
		registry.set("app.level", value, ADMIN, SetOptions::new()).unwrap();
		clock.advance_secs(10);
	}

	let versions = registry.get_versions("app.level", ADMIN).unwrap();
	assert_eq!(
		versions,
		vec![
			Version { timestamp: at(0), value: 1 },
			Version { timestamp: at(10), value: 2 },
			Version { timestamp: at(20), value: 3 },
		]
	);
}

#[test]
fn history_stays_monotonic_when_clock_steps_back() {
	let (registry, clock) = registry();
	admin_on(&registry, &["k"]);
	clock.set(at(100));
	registry.set("k", 1, ADMIN, SetOptions::new()).unwrap();
	clock.set(at(50));
	let stamped = registry.set("k", 2, ADMIN, SetOptions::new()).unwrap();

	assert_eq!(stamped, at(100));
	let stamps: Vec<_> = registry.get_versions("k", ADMIN).unwrap().into_iter().map(|v| v.timestamp).collect();
	assert_eq!(stamps, [at(100), at(100)]);
}

#[test]
fn rollback_appends_restored_value() {
	let (registry, clock) = registry();
	admin_on(&registry, &["app.level"]);
	registry.set("app.level", 1, ADMIN, SetOptions::new().description("verbosity")).unwrap();
	clock.advance_secs(10);
	registry.set("app.level", 2, ADMIN, SetOptions::new()).unwrap();
	clock.advance_secs(10);
	registry.set("app.level", 3, ADMIN, SetOptions::new()).unwrap();
	clock.advance_secs(10);

	let restored = registry.rollback("app.level", at(15), ADMIN).unwrap();
	assert_eq!(restored, Some(Version { timestamp: at(30), value: 2 }));
	assert_eq!(registry.get("app.level", ADMIN).unwrap(), Some(2));

	let versions = registry.get_versions("app.level", ADMIN).unwrap();
	assert_eq!(versions.len(), 4);
	assert_eq!(versions.last().map(|v| v.value), Some(2));

	let meta = registry.get_metadata("app.level", ADMIN).unwrap().unwrap();
	assert_eq!(meta.description.as_deref(), Some("verbosity"));
	assert_eq!(meta.created_at, at(0));
	assert_eq!(meta.updated_at, at(30));
}

#[test]
fn rollback_before_history_changes_nothing() {
	let (registry, clock) = registry();
	admin_on(&registry, &["k"]);
	clock.set(at(10));
	registry.set("k", 1, ADMIN, SetOptions::new()).unwrap();

	assert_eq!(registry.rollback("k", at(5), ADMIN).unwrap(), None);
	assert_eq!(registry.get_versions("k", ADMIN).unwrap().len(), 1);

	registry.revoke_permission("k", ADMIN, Permission::Write).unwrap();
	assert!(matches!(
		registry.rollback("k", at(10), ADMIN),
		Err(RegistryError::PermissionDenied { op: Op::Rollback, .. })
	));
}

#[test]
fn delete_drops_all_per_path_state() {
	let (registry, _) = registry();
	admin_on(&registry, &["svc.db.url", "svc.db.pool"]);
	registry.set("svc.db.url", 1, ADMIN, SetOptions::new().ttl(Duration::from_secs(60))).unwrap();
	registry.set("svc.db.pool", 2, ADMIN, SetOptions::new()).unwrap();
	registry.set_alias("db", "svc.db.url").unwrap();

	assert_eq!(registry.delete("svc.db.url", ADMIN).unwrap(), Some(1));
	assert_eq!(registry.list_keys("svc.db").unwrap(), ["pool"]);
	assert!(registry.get_permissions("svc.db.url").unwrap().is_empty());
	assert!(!registry.check_permission("db", ADMIN, Permission::Read));
	assert_eq!(registry.get_alias("db").map(String::from), Some("svc.db.url".to_string()));

	admin_on(&registry, &["svc.db.url"]);
	assert_eq!(registry.get("db", ADMIN).unwrap(), None);
	assert!(registry.get_versions("svc.db.url", ADMIN).unwrap().is_empty());
}

#[test]
fn delete_keeps_emptied_parents() {
	let (registry, _) = registry();
	admin_on(&registry, &["a.b.c"]);
	registry.set("a.b.c", 1, ADMIN, SetOptions::new()).unwrap();
	registry.delete("a.b.c", ADMIN).unwrap();
	assert_eq!(registry.list_keys("").unwrap(), ["a"]);
	assert_eq!(registry.list_keys("a").unwrap(), ["b"]);
	assert!(registry.list_all().is_empty());
}

#[test]
fn structural_conflicts_leave_store_intact() {
	let (registry, _) = registry();
	admin_on(&registry, &["a.b", "a.b.c", "a"]);
	registry.set("a.b", 1, ADMIN, SetOptions::new()).unwrap();

	assert!(matches!(
		registry.set("a.b.c", 2, ADMIN, SetOptions::new()),
		Err(RegistryError::StructuralConflict { op: Op::Set, .. })
	));
	assert!(matches!(
		registry.set("a", 3, ADMIN, SetOptions::new()),
		Err(RegistryError::StructuralConflict { op: Op::Set, .. })
	));
	assert_eq!(registry.get("a.b", ADMIN).unwrap(), Some(1));
	assert!(registry.get_versions("a.b.c", ADMIN).unwrap().is_empty());
	assert_eq!(registry.get("a", ADMIN).unwrap(), None);
}

#[test]
fn search_filters_by_glob_and_readability() {
	let (registry, _) = registry();
	admin_on(&registry, &["a.b.c", "a.b.d", "a.x"]);
	registry.set("a.b.c", 1, ADMIN, SetOptions::new()).unwrap();
	registry.set("a.b.d", 2, ADMIN, SetOptions::new()).unwrap();
	registry.set("a.x", 3, ADMIN, SetOptions::new()).unwrap();

	let hits: Vec<_> = registry.search("a.b.*", ADMIN).into_iter().map(|(p, v)| (p.to_string(), v)).collect();
	assert_eq!(hits, [("a.b.c".to_string(), 1), ("a.b.d".to_string(), 2)]);

	registry.revoke_permission("a.b.d", ADMIN, Permission::Read).unwrap();
	assert_eq!(registry.search("a.b.*", ADMIN).len(), 1);
	assert!(registry.search("a.**", "guest").is_empty());
	assert_eq!(registry.list_all().len(), 3);
}

#[test]
fn aliases_redirect_one_level() {
	let (registry, _) = registry();
	admin_on(&registry, &["services.database.primary"]);
	registry.set_alias("db", "services.database.primary").unwrap();
	registry.set_alias("database", "db").unwrap();

	registry.set("db", 1, ADMIN, SetOptions::new()).unwrap();
	assert_eq!(registry.get("services.database.primary", ADMIN).unwrap(), Some(1));
	assert_eq!(registry.get("db", ADMIN).unwrap(), Some(1));

	assert!(matches!(registry.get("database", ADMIN), Err(RegistryError::PermissionDenied { ref path, .. }) if path == "db"));

	assert_eq!(registry.delete_alias("db").map(String::from), Some("services.database.primary".to_string()));
	assert_eq!(registry.get_alias("db"), None);
	assert!(registry.get("db", ADMIN).is_err());
}

#[test]
fn permissions_resolve_through_aliases() {
	let (registry, _) = registry();
	registry.set_alias("short", "very.long.path").unwrap();
	registry.set_permission("short", "ops", Permission::Write).unwrap();

	assert!(registry.check_permission("very.long.path", "ops", Permission::Write));
	let roles = registry.get_permissions("very.long.path").unwrap();
	assert_eq!(roles.get("ops").map(|tokens| tokens.iter().copied().collect::<Vec<_>>()), Some(vec![Permission::Write]));
	assert!(registry.revoke_permission("short", "ops", Permission::Write).unwrap());
	assert!(!registry.check_permission("short", "ops", Permission::Write));
}

#[test]
fn metadata_serializes_with_rfc3339_stamps() {
	let (registry, _) = registry();
	admin_on(&registry, &["k"]);
	registry.set("k", 1, ADMIN, SetOptions::new().description("demo")).unwrap();
	let meta = registry.get_metadata("k", ADMIN).unwrap().unwrap();
	assert_eq!(
		serde_json::to_value(&meta).unwrap(),
		serde_json::json!({
			"created_at": "1970-01-01T00:00:00Z",
			"updated_at": "1970-01-01T00:00:00Z",
			"description": "demo",
			"expires_at": null,
		})
	);
}

#[test]
fn clones_share_tables() {
	let (registry, _) = registry();
	let other = registry.clone();
	admin_on(&other, &["x"]);
	other.set("x", 1, ADMIN, SetOptions::new()).unwrap();
	assert_eq!(registry.get("x", ADMIN).unwrap(), Some(1));
}

#[test]
fn huge_ttl_saturates() {
	let (registry, clock) = registry();
	admin_on(&registry, &["forever"]);
	registry.set("forever", 1, ADMIN, SetOptions::new().ttl(Duration::MAX)).unwrap();
	clock.advance_secs(1_000_000_000);
	assert_eq!(registry.get("forever", ADMIN).unwrap(), Some(1));
}
