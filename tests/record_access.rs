mod common;

use common::{add_supplier, customer, product, rating, supplier, temp_store};
use rusqlite::Connection;
use shopvault::{
    EncryptionStatus, FieldValue, Predicate, Record, Selection, ShopvaultError, Table,
};

#[test]
fn test_add_then_search_by_primary_key() {
    for status in [EncryptionStatus::Disabled, EncryptionStatus::Enabled] {
        let (_dir, store) = temp_store(status);

        // 1. Add a supplier and a product referencing it.
        let supplier_id = add_supplier(&store, "Wilson");
        let input = product("Pro Staff 97", supplier_id);
        let product_id = store.add(Table::Product, &input).unwrap();

        // 2. Search by the new primary key.
        let found = store
            .search(Table::Product, &Selection::All, &Predicate::eq("product_id", product_id))
            .unwrap();
        assert_eq!(found.len(), 1);

        // 3. Every non-key field comes back as it went in.
        let record = &found[0];
        assert_eq!(record.get("product_id"), Some(&FieldValue::Integer(product_id)));
        for (field, value) in input.iter() {
            assert_eq!(record.get(field), Some(value), "{} under {:?}", field, status);
        }
    }
}

#[test]
fn test_wildcard_returns_schema_order() {
    let (_dir, store) = temp_store(EncryptionStatus::Enabled);
    add_supplier(&store, "Head");

    let found = store.search(Table::Supplier, &Selection::All, &Predicate::All).unwrap();
    let names: Vec<&str> = found[0].field_names().collect();
    assert_eq!(names, ["supplier_id", "company_name", "telephone_num"]);
}

#[test]
fn test_explicit_fields_keep_requested_order() {
    let (_dir, store) = temp_store(EncryptionStatus::Enabled);
    add_supplier(&store, "Yonex");

    let found = store
        .search(
            Table::Supplier,
            &Selection::fields(["telephone_num", "supplier_id"]),
            &Predicate::eq("company_name", "Yonex"),
        )
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_names().collect::<Vec<_>>(), ["telephone_num", "supplier_id"]);
    assert_eq!(found[0].get("telephone_num"), Some(&FieldValue::from("02890123456")));
}

#[test]
fn test_no_match_is_empty_not_error() {
    let (_dir, store) = temp_store(EncryptionStatus::Disabled);
    let found = store
        .search(Table::Customer, &Selection::All, &Predicate::eq("username", "nobody"))
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_missing_field_fails_before_write() {
    let (dir, store) = temp_store(EncryptionStatus::Disabled);
    let supplier_id = add_supplier(&store, "Prince");

    // 1. Drop a required field.
    let partial: Record = product("Tour 100", supplier_id)
        .into_iter()
        .filter(|(field, _)| field != "sale_price")
        .collect();

    // 2. The add is rejected with the missing field named.
    let err = store.add(Table::Product, &partial).unwrap_err();
    assert!(matches!(err, ShopvaultError::MissingField { ref field, .. } if field == "sale_price"));

    // 3. Nothing was written.
    let conn = Connection::open(dir.path().join("ecommerce.db")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM Product", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_unknown_predicate_field_fails_fast() {
    let (_dir, store) = temp_store(EncryptionStatus::Disabled);
    let err = store
        .search(Table::Supplier, &Selection::All, &Predicate::eq("colour", "green"))
        .unwrap_err();
    assert!(matches!(err, ShopvaultError::UnknownField { .. }));

    let err = store
        .delete(Table::Supplier, &Predicate::eq("Supplier.fax", "0"))
        .unwrap_err();
    assert!(matches!(err, ShopvaultError::UnknownField { .. }));
}

#[test]
fn test_update_touches_only_matching_rows() {
    let (dir, store) = temp_store(EncryptionStatus::Enabled);
    let a = add_supplier(&store, "Babolat");
    let b = add_supplier(&store, "Tecnifibre");

    let raw_row = |id: i64| -> (String, String) {
        let conn = Connection::open(dir.path().join("ecommerce.db")).unwrap();
        conn.query_row(
            "SELECT company_name, telephone_num FROM Supplier WHERE supplier_id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    };
    let a_before = raw_row(a);

    // 1. Update B's phone number only.
    let changed = store
        .update(
            Table::Supplier,
            &Record::new().with("telephone_num", "07700900999"),
            &Predicate::eq("supplier_id", b),
        )
        .unwrap();
    assert_eq!(changed, 1);

    // 2. A is byte-identical in the store.
    assert_eq!(raw_row(a), a_before);

    // 3. B reflects the new value and keeps the untouched field.
    let found = store
        .search(Table::Supplier, &Selection::All, &Predicate::eq("supplier_id", b))
        .unwrap();
    assert_eq!(found[0].get("telephone_num"), Some(&FieldValue::from("07700900999")));
    assert_eq!(found[0].get("company_name"), Some(&FieldValue::from("Tecnifibre")));
}

#[test]
fn test_update_rejects_primary_key() {
    let (_dir, store) = temp_store(EncryptionStatus::Disabled);
    let id = add_supplier(&store, "Dunlop");
    let err = store
        .update(
            Table::Supplier,
            &Record::new().with("supplier_id", id + 100),
            &Predicate::eq("supplier_id", id),
        )
        .unwrap_err();
    assert!(matches!(err, ShopvaultError::ImmutableField { .. }));
}

#[test]
fn test_delete_cascades_to_dependents() {
    let (_dir, store) = temp_store(EncryptionStatus::Enabled);

    // 1. Supplier -> Product -> Ratings.
    let supplier_id = add_supplier(&store, "Wilson");
    let other_supplier = add_supplier(&store, "Head");
    let product_id = store.add(Table::Product, &product("Blade 98", supplier_id)).unwrap();
    let kept_product = store.add(Table::Product, &product("Speed MP", other_supplier)).unwrap();
    let customer_id = store.add(Table::Customer, &customer("ada")).unwrap();
    store.add(Table::Ratings, &rating(5, customer_id, product_id)).unwrap();
    store.add(Table::Ratings, &rating(3, customer_id, kept_product)).unwrap();

    // 2. Delete the first supplier.
    let removed = store
        .delete(Table::Supplier, &Predicate::eq("supplier_id", supplier_id))
        .unwrap();
    assert_eq!(removed, 1);

    // 3. Its product and that product's rating are gone; the rest remain.
    let products = store.search(Table::Product, &Selection::All, &Predicate::All).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].get("product_id"), Some(&FieldValue::Integer(kept_product)));

    let ratings = store.search(Table::Ratings, &Selection::All, &Predicate::All).unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].get("score"), Some(&FieldValue::Integer(3)));
}

#[test]
fn test_foreign_key_violation_is_write_failure() {
    let (_dir, store) = temp_store(EncryptionStatus::Disabled);
    let err = store.add(Table::Product, &product("Orphan", 4242)).unwrap_err();
    assert!(matches!(err, ShopvaultError::Database(_)));
    assert!(store
        .search(Table::Product, &Selection::All, &Predicate::All)
        .unwrap()
        .is_empty());
}

#[test]
fn test_range_and_in_predicates() {
    let (_dir, store) = temp_store(EncryptionStatus::Enabled);
    let supplier_id = add_supplier(&store, "Wilson");
    for (name, stock) in [("A", 1), ("B", 5), ("C", 9)] {
        let record = product(name, supplier_id).with("current_stock", stock);
        store.add(Table::Product, &record).unwrap();
    }

    let low = store
        .search(
            Table::Product,
            &Selection::fields(["name"]),
            &Predicate::lt("current_stock", 6).and(Predicate::is_in("name", ["A", "C"])),
        )
        .unwrap();
    assert_eq!(low, vec![Record::new().with("name", "A")]);

    let either = store
        .search(
            Table::Product,
            &Selection::fields(["name"]),
            &Predicate::eq("name", "B").or(Predicate::ge("current_stock", 9)),
        )
        .unwrap();
    assert_eq!(either.len(), 2);
}

#[test]
fn test_range_on_enciphered_text_fails_instead_of_misordering() {
    // 1. Under plain storage a range over text orders by the text itself.
    let (_dir, plain) = temp_store(EncryptionStatus::Disabled);
    for company in ["&Sons Sports", "Babolat", "Wilson"] {
        add_supplier(&plain, company);
    }
    let early = plain
        .search(
            Table::Supplier,
            &Selection::fields(["company_name"]),
            &Predicate::lt("company_name", "M"),
        )
        .unwrap();
    assert_eq!(
        early,
        vec![
            Record::new().with("company_name", "&Sons Sports"),
            Record::new().with("company_name", "Babolat"),
        ]
    );

    // 2. Enciphered, the same search is refused rather than answered wrongly.
    let (_dir, enciphered) = temp_store(EncryptionStatus::Enabled);
    for company in ["&Sons Sports", "Babolat", "Wilson"] {
        add_supplier(&enciphered, company);
    }
    let err = enciphered
        .search(
            Table::Supplier,
            &Selection::fields(["company_name"]),
            &Predicate::lt("company_name", "M"),
        )
        .unwrap_err();
    assert!(
        matches!(err, ShopvaultError::UnorderedField { ref field, .. } if field == "company_name")
    );

    // 3. Equality still works on the enciphered field.
    let found = enciphered
        .search(
            Table::Supplier,
            &Selection::fields(["company_name"]),
            &Predicate::eq("company_name", "Babolat"),
        )
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_supplier_fixture_shape() {
    // The fixture covers exactly the non-key fields.
    assert_eq!(supplier("x").len(), Table::Supplier.schema().non_key_fields().count());
}
