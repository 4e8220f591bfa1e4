use std::sync::Arc;
use std::thread;

use forged_primitives::ManualClock;

use super::init_tracing;
use crate::flat::{FlatRegistry, Permission, SetOptions};
use crate::namespace::Namespace;
use crate::resolver::Strict;
use crate::{InsertAction, NsPath};

const THREADS: usize = 8;
const WRITES: usize = 50;

#[test]
fn concurrent_flat_writers_keep_last_value() {
	init_tracing();
	let registry: FlatRegistry<usize> = FlatRegistry::with_clock(Arc::new(ManualClock::at_epoch()));
	for t in 0..THREADS {
		registry.grant(&format!("workers.w{t}"), "worker", [Permission::Read, Permission::Write]).unwrap();
	}

	thread::scope(|scope| {
		for t in 0..THREADS {
			let registry = registry.clone();
			scope.spawn(move || {
				let path = format!("workers.w{t}");
				for i in 0..WRITES {
					registry.set(&path, t * 1000 + i, "worker", SetOptions::new()).unwrap();
				}
			});
		}
	});

	for t in 0..THREADS {
		let path = format!("workers.w{t}");
		assert_eq!(registry.get(&path, "worker").unwrap(), Some(t * 1000 + WRITES - 1));
		let versions = registry.get_versions(&path, "worker").unwrap();
		assert_eq!(versions.len(), WRITES);
		assert!(versions.iter().map(|v| v.value).eq((0..WRITES).map(|i| t * 1000 + i)));
	}
	assert_eq!(registry.list_keys("workers").unwrap().len(), THREADS);
}

#[test]
fn concurrent_namespace_registrations_land_once() {
	init_tracing();
	let ns: Namespace<usize> = Namespace::new("shared");

	thread::scope(|scope| {
		for t in 0..THREADS {
			let ns = ns.clone();
			scope.spawn(move || {
				for i in 0..WRITES {
					ns.register(&format!("t{t}.item{i}"), i).unwrap();
				}
			});
		}
	});

	assert_eq!(ns.list("").unwrap().len(), THREADS * WRITES);
	assert_eq!(ns.resolve_pattern("*.item0").len(), THREADS);
	assert!(ns.collisions().is_empty());
}

#[test]
fn racing_strict_registrations_admit_exactly_one() {
	init_tracing();
	let ns: Namespace<usize> = Namespace::with_policy("race", Strict);

	let wins: Vec<bool> = thread::scope(|scope| {
		let handles: Vec<_> = (0..THREADS)
			.map(|t| {
				let ns = ns.clone();
				scope.spawn(move || ns.register("contested.slot", t).is_ok_and(|action| action == InsertAction::InsertedNew))
			})
			.collect();
		handles.into_iter().map(|handle| handle.join().unwrap()).collect()
	});

	assert_eq!(wins.iter().filter(|won| **won).count(), 1);
	assert_eq!(ns.collisions().len(), THREADS - 1);
	assert!(ns.resolve("contested.slot").unwrap().is_some());
}

#[test]
fn lazy_loader_runs_once_under_contention() {
	use std::sync::atomic::{AtomicUsize, Ordering};

	init_tracing();
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	let ns: Namespace<usize> = Namespace::new("lazy");
	ns.register_lazy("expensive", move |_: &NsPath| -> anyhow::Result<usize> {
		counter.fetch_add(1, Ordering::SeqCst);
		Ok(99)
	})
	.unwrap();

	thread::scope(|scope| {
		for _ in 0..THREADS {
			let ns = ns.clone();
			scope.spawn(move || assert_eq!(ns.resolve("expensive").unwrap(), Some(99)));
		}
	});
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}
