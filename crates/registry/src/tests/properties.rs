use std::sync::Arc;

use forged_primitives::ManualClock;
use proptest::prelude::*;

use crate::flat::{FlatRegistry, Permission, SetOptions};
use crate::namespace::Namespace;

fn path_strategy() -> impl Strategy<Value = String> {
	prop::collection::vec("[a-z][a-z0-9_]{0,5}", 1..4).prop_map(|segments| segments.join("."))
}

proptest! {
	#[test]
	fn register_then_resolve_round_trips(path in path_strategy(), value in any::<i64>()) {
		let ns = Namespace::new("prop");
		ns.register(&path, value).unwrap();
		prop_assert_eq!(ns.resolve(&path).unwrap(), Some(value));
	}

	#[test]
	fn unregister_leaves_siblings(
		base in path_strategy(),
		left in "[a-z]{1,4}",
		right in "[A-Z]{1,4}",
		a in any::<i32>(),
		b in any::<i32>(),
	) {
		let ns = Namespace::new("prop");
		let left = format!("{base}.{left}");
		let right = format!("{base}.{right}");
		ns.register(&left, a).unwrap();
		ns.register(&right, b).unwrap();

		ns.unregister(&left).unwrap();
		prop_assert_eq!(ns.resolve(&left).unwrap(), None);
		prop_assert_eq!(ns.resolve(&right).unwrap(), Some(b));
	}

	#[test]
	fn export_import_preserves_structure(paths in prop::collection::vec(path_strategy(), 1..8)) {
		let source: Namespace<u8> = Namespace::new("prop");
		for path in &paths {
			let _ = source.register(path, 1);
		}
		let exported = source.export();

		let target: Namespace<u8> = Namespace::new("other");
		target.import(&exported).unwrap();
		prop_assert_eq!(target.export(), exported);
	}

	#[test]
	fn flat_history_grows_by_one_per_write(values in prop::collection::vec(any::<u16>(), 1..20), steps in prop::collection::vec(0i64..5, 20)) {
		let clock = ManualClock::at_epoch();
		let registry = FlatRegistry::with_clock(Arc::new(clock.clone()));
		registry.grant("p", "r", [Permission::Read, Permission::Write]).unwrap();

		for (value, step) in values.iter().zip(&steps) {
			registry.set("p", *value, "r", SetOptions::new()).unwrap();
			clock.advance_secs(*step);
		}

		let versions = registry.get_versions("p", "r").unwrap();
		prop_assert_eq!(versions.len(), values.len());
		prop_assert!(versions.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
		prop_assert_eq!(registry.get("p", "r").unwrap(), values.last().copied());
	}
}
