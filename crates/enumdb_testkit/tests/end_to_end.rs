//! End-to-end tests over the fixture enumerations.

use enumdb_core::{CacheOp, CoreError, Key, MissPolicy, Record, Symbol, Value};
use enumdb_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn color_lookups() {
    init_tracing();
    let test = TestRegistry::seeded();
    let colors = test.get("Color").unwrap();
    let resolver = colors.resolver();

    let red = resolver.resolve("red").unwrap().unwrap();
    assert_eq!(red.id, 1);
    assert!(Arc::ptr_eq(&red, &resolver.resolve(1).unwrap().unwrap()));
    assert!(Arc::ptr_eq(&red, &resolver.resolve(Symbol::new("red")).unwrap().unwrap()));
    assert_eq!(red.get("html"), Some(&Value::from("#ff0000")));

    let blue = colors.find_by_attribute("html", "#0000ff").unwrap().unwrap();
    assert_eq!(blue.id, 2);

    assert!(resolver.matches(&red, "red").unwrap());
    assert!(!resolver.matches(&red, "blue").unwrap());
    assert!(resolver.in_any(&red, ["green", "red"]).unwrap());
    assert_eq!(resolver.enumerator(&red), Value::from("red"));
}

#[test]
fn color_misses_raise() {
    let test = TestRegistry::seeded();

    let err = test.resolve("Color", "white").unwrap_err();
    assert_eq!(err.to_string(), "couldn't find Color identified by \"white\"");

    let err = test.resolve("Color", Key::Nil).unwrap_err();
    assert!(err.is_not_found());

    let err = test.resolve("Color", 2.5).unwrap_err();
    assert!(matches!(err, CoreError::InvalidKeyType { .. }));

    let colors = test.get("Color").unwrap();
    let err = colors.resolver().resolve_all(["red", "white", "black"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "couldn't find Color identified by \"white\", \"black\""
    );
    assert!(!colors.resolver().includes("white").unwrap());
}

#[test]
fn color_is_read_only_outside_a_permit() {
    let test = TestRegistry::seeded();
    let colors = test.get("Color").unwrap();

    let err = colors
        .create(Record::new(4).with("name", "white").with("html", "#ffffff"))
        .unwrap_err();
    assert!(matches!(err, CoreError::ModificationNotPermitted { .. }));
    assert!(matches!(
        colors.destroy(1).unwrap_err(),
        CoreError::ModificationNotPermitted { .. }
    ));
    assert_eq!(colors.stats().rejected_modifications(), 2);

    let _permit = colors.permit_updates();
    colors
        .create(Record::new(4).with("name", "white").with("html", "#ffffff"))
        .unwrap();
    assert_eq!(test.resolve("Color", "white").unwrap().unwrap().id, 4);
}

#[test]
fn color_write_collisions_are_rejected() {
    let test = TestRegistry::seeded();
    let colors = test.get("Color").unwrap();
    let _permit = colors.permit_updates();

    let err = colors
        .create(Record::new(9).with("name", "red").with("html", "#ee0000"))
        .unwrap_err();
    assert!(matches!(err, CoreError::RecordInvalid { .. }));

    let err = colors
        .update(Record::new(2).with("name", "blue").with("html", "#ff0000"))
        .unwrap_err();
    assert!(err.to_string().contains("html has already been taken"));

    assert!(colors.update(Record::new(99).with("name", "grey")).unwrap_err().is_not_found());
    assert_eq!(colors.count().unwrap(), 3);
}

#[test]
fn access_path_tuples_and_prefixes() {
    let test = TestRegistry::seeded();
    let paths = test.get("AccessPath").unwrap();
    let resolver = paths.resolver();

    assert_eq!(resolver.resolve(["users", "new"]).unwrap().unwrap().id, 2);
    assert_eq!(resolver.resolve(["posts", "index"]).unwrap().unwrap().id, 3);
    // A lone string is a one-component prefix.
    assert_eq!(resolver.resolve("users").unwrap().unwrap().id, 1);
    assert_eq!(resolver.resolve(vec!["posts"]).unwrap().unwrap().id, 3);

    assert!(resolver.resolve(["users", "destroy"]).unwrap_err().is_not_found());
    assert!(matches!(
        resolver.resolve(["users", "index", "extra"]).unwrap_err(),
        CoreError::InvalidKeyType { .. }
    ));

    let users_new = resolver.resolve(2).unwrap().unwrap();
    assert_eq!(
        resolver.enumerator(&users_new),
        Value::List(vec![Value::from("users"), Value::from("new")])
    );
}

#[test]
fn book_order_aliases_and_secondary_index() {
    let test = TestRegistry::seeded();
    let books = test.get("Book").unwrap();
    let resolver = books.resolver();

    let titles: Vec<_> = books
        .all()
        .unwrap()
        .iter()
        .map(|book| book.value_of("title").to_string())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Programming Pearls",
            "The Pragmatic Programmer",
            "Hot-Red!",
            "More Programming Pearls",
        ]
    );

    assert_eq!(resolver.resolve("hot_red").unwrap().unwrap().id, 2);
    assert_eq!(resolver.resolve(Symbol::new("hot_red")).unwrap().unwrap().id, 2);
    assert_eq!(resolver.resolve("Hot-Red!").unwrap().unwrap().id, 2);

    let bentley: Vec<_> = books
        .find_all_by_attribute("author", "Bentley")
        .unwrap()
        .iter()
        .map(|book| book.id)
        .collect();
    assert_eq!(bentley, vec![3, 4]);

    assert!(matches!(
        books.find_by_attribute("rank", 1).unwrap_err(),
        CoreError::UnknownAttribute { .. }
    ));
}

#[test]
fn book_misses_raise_only_for_typed_keys() {
    let test = TestRegistry::seeded();
    let books = test.get("Book").unwrap();

    assert_eq!(books.resolver().policy(), MissPolicy::RaiseOnlyForTypedKeys);
    assert_eq!(books.resolver().resolve(Key::Nil).unwrap(), None);
    assert_eq!(books.resolver().resolve(None::<i64>).unwrap(), None);
    assert!(books.resolver().resolve("Dune").unwrap_err().is_not_found());
}

#[test]
fn country_is_silent_with_a_computed_index() {
    let test = TestRegistry::seeded();
    let countries = test.get("Country").unwrap();

    assert_eq!(test.resolve("Country", "NZ").unwrap().unwrap().id, 1);
    assert_eq!(test.resolve("Country", "XX").unwrap(), None);
    assert_eq!(test.resolve("Country", 42).unwrap(), None);

    let uk = countries.find_by_attribute("slug", "united_kingdom").unwrap().unwrap();
    assert_eq!(uk.value_of("code"), Value::from("GB"));
    assert_eq!(countries.find_by_attribute("slug", "atlantis").unwrap(), None);
}

#[test]
fn incremental_updates_through_the_registry() {
    let test = TestRegistry::seeded();
    let colors = test.get("Color").unwrap();
    let before = colors.all().unwrap();

    {
        let _permit = colors.permit_updates();
        test.update_incremental(
            "Color",
            CacheOp::Push,
            Record::new(4).with("name", "white").with("html", "#ffffff"),
        )
        .unwrap();
    }

    let after = colors.all().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.generation() > before.generation());
    assert_eq!(after.len(), 4);
    assert_eq!(colors.find_by_attribute("html", "#ffffff").unwrap().unwrap().id, 4);
    // The store never saw the record, so a reload drops it.
    test.invalidate("Color").unwrap();
    assert_eq!(colors.count().unwrap(), 3);
}

#[test]
fn out_of_band_writes_need_an_invalidation() {
    let test = TestRegistry::seeded();
    assert_eq!(test.resolve("Country", "FR").unwrap(), None);

    test.store
        .put_raw("countries", Record::new(4).with("code", "FR").with("name", "France"));
    assert_eq!(test.resolve("Country", "FR").unwrap(), None);

    test.invalidate_all();
    assert_eq!(test.resolve("Country", "FR").unwrap().unwrap().id, 4);
}

#[test]
fn rebootstrap_keeps_administrator_edits() {
    let test = TestRegistry::seeded();
    let colors = test.get("Color").unwrap();
    {
        let _permit = colors.permit_updates();
        colors
            .update(Record::new(1).with("name", "red").with("html", "#ee1111"))
            .unwrap();
    }

    test.bootstrap("Color", color_declarations()).unwrap();
    let red = test.resolve("Color", "red").unwrap().unwrap();
    assert_eq!(red.value_of("html"), Value::from("#ee1111"));
}
