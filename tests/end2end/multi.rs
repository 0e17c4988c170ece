use dalgo_rust::{Context, Database, InMemoryBackend, Key, Record, Update};

use crate::support::{
    databases, init_tracing, records_must_exist, records_must_not_exist, TestData,
    E2E_TEST_KIND1, E2E_TEST_KIND2,
};

struct Fixture {
    k1r1: Key,
    k1r2: Key,
    k2r1: Key,
}

impl Fixture {
    fn new() -> Self {
        Self {
            k1r1: Key::with_str_id(E2E_TEST_KIND1, "k1r1").unwrap(),
            k1r2: Key::with_str_id(E2E_TEST_KIND1, "k1r2").unwrap(),
            k2r1: Key::with_str_id(E2E_TEST_KIND2, "k2r1").unwrap(),
        }
    }

    fn all_keys(&self) -> Vec<Key> {
        vec![self.k1r1.clone(), self.k1r2.clone(), self.k2r1.clone()]
    }
}

fn id_of(key: &Key) -> String {
    key.id().as_str().unwrap().to_string()
}

fn set_all(db: &Database<InMemoryBackend>, ctx: &Context, keys: &[Key]) {
    let mut records: Vec<Record> = keys
        .iter()
        .map(|key| {
            Record::with_data(key.clone(), TestData::new(format!("{}str", id_of(key)), 0))
        })
        .collect();
    db.set_multi(ctx, &mut records)
        .unwrap_or_else(|e| panic!("failed to set multiple records at once: {}", e));
    records_must_exist("set_multi", &records);
}

#[test]
fn multi_operations() {
    init_tracing();
    for (name, db) in databases() {
        let ctx = Context::background();
        let fx = Fixture::new();
        let all_keys = fx.all_keys();

        // 1st and 2nd initial delete
        db.delete_multi(&ctx, &all_keys).unwrap_or_else(|e| {
            panic!("[{}] failed to delete multiple records at once: {}", name, e)
        });
        db.delete_multi(&ctx, &all_keys).unwrap_or_else(|e| {
            panic!("[{}] failed to delete multiple records at once: {}", name, e)
        });

        // get 3 non-existing records
        let mut records: Vec<Record> = (0..3)
            .map(|i| {
                Record::new(
                    Key::with_str_id("NonExistingKind", format!("non_existing_id_{}", i)).unwrap(),
                )
            })
            .collect();
        db.get_multi(&ctx, &mut records)
            .unwrap_or_else(|e| panic!("[{}] failed to get multiple records at once: {}", name, e));
        records_must_not_exist(name, &records);

        // SetMulti
        set_all(&db, &ctx, &all_keys);

        // GetMulti 3 existing records, copied out with data_to
        let mut records: Vec<Record> = all_keys.iter().cloned().map(Record::new).collect();
        db.get_multi(&ctx, &mut records).unwrap();
        records_must_exist(name, &records);
        for record in &records {
            let data: TestData = record.data_to().unwrap();
            assert_eq!(data.string_prop, format!("{}str", id_of(record.key())));
        }

        // GetMulti 2 existing, 2 missing
        let mut records = vec![
            Record::new(fx.k1r1.clone()),
            Record::new(fx.k1r2.clone()),
            Record::new(Key::with_str_id(E2E_TEST_KIND1, "k1r9").unwrap()),
            Record::new(Key::with_str_id(E2E_TEST_KIND2, "k2r9").unwrap()),
        ];
        db.get_multi(&ctx, &mut records)
            .unwrap_or_else(|e| panic!("[{}] aggregate error on partial batch: {}", name, e));
        records_must_exist(name, &records[..2]);
        records_must_not_exist(name, &records[2..]);
        assert_eq!(records[0].data_to::<TestData>().unwrap().string_prop, "k1r1str");
        assert_eq!(records[1].data_to::<TestData>().unwrap().string_prop, "k1r2str");

        // update 2 records
        const NEW_VALUE: &str = "UpdateD";
        let updates = [Update::new("StringProp", NEW_VALUE)];
        db.update_multi(&ctx, &[fx.k1r1.clone(), fx.k1r2.clone()], &updates)
            .unwrap_or_else(|e| panic!("[{}] failed to update 2 records at once: {}", name, e));
        let mut records: Vec<Record> = all_keys.iter().cloned().map(Record::new).collect();
        db.get_multi(&ctx, &mut records).unwrap();
        records_must_exist(name, &records);
        let values: Vec<String> = records
            .iter()
            .map(|r| r.data_to::<TestData>().unwrap().string_prop)
            .collect();
        assert_eq!(values, vec![NEW_VALUE, NEW_VALUE, "k2r1str"], "[{}]", name);

        // cleanup delete
        db.delete_multi(&ctx, &all_keys).unwrap();
        let mut records: Vec<Record> = all_keys.iter().cloned().map(Record::new).collect();
        db.get_multi(&ctx, &mut records).unwrap();
        records_must_not_exist(name, &records);
    }
}

#[test]
fn set_multi_overwrites_instead_of_merging() {
    for (name, db) in databases() {
        let ctx = Context::background();
        let key = Key::with_str_id(E2E_TEST_KIND1, "overwrite").unwrap();
        let mut first = vec![Record::with_data(
            key.clone(),
            serde_json::json!({"StringProp": "old", "IntegerProp": 1, "Extra": true}),
        )];
        db.set_multi(&ctx, &mut first).unwrap();

        let mut second = vec![Record::with_data(key.clone(), TestData::new("new", 2))];
        db.set_multi(&ctx, &mut second).unwrap();

        let mut record = Record::new(key);
        db.get(&ctx, &mut record).unwrap();
        assert_eq!(
            record.data(),
            Some(&serde_json::json!({"StringProp": "new", "IntegerProp": 2})),
            "[{}]",
            name
        );
    }
}

#[test]
fn update_multi_requires_existing_records() {
    for (name, db) in databases() {
        let ctx = Context::background();
        let fx = Fixture::new();
        set_all(&db, &ctx, &[fx.k1r1.clone()]);
        let missing = Key::with_str_id(E2E_TEST_KIND1, "missing").unwrap();
        let updates = [Update::new("StringProp", "patched")];

        // Same outcome on every repetition.
        for _ in 0..2 {
            let err = db
                .update_multi(&ctx, &[fx.k1r1.clone(), missing.clone()], &updates)
                .unwrap_err();
            assert!(err.is_not_found(), "[{}] {}", name, err);
            assert_eq!(err.failures().len(), 1);
            assert_eq!(err.failures()[0].key, missing);
        }

        let mut patched = TestData::default();
        db.get_into(&ctx, &fx.k1r1, &mut patched).unwrap();
        assert_eq!(patched.string_prop, "patched");
        assert!(!db.exists(&ctx, &missing).unwrap());
    }
}

#[test]
fn multi_field_patch_lands_together() {
    for (_, db) in databases() {
        let ctx = Context::background();
        let fx = Fixture::new();
        set_all(&db, &ctx, &fx.all_keys());

        let updates = [
            Update::new("StringProp", "both"),
            Update::new("IntegerProp", 9),
        ];
        db.update_multi(&ctx, &fx.all_keys(), &updates).unwrap();

        let mut records: Vec<Record> = fx.all_keys().into_iter().map(Record::new).collect();
        db.get_multi(&ctx, &mut records).unwrap();
        for record in &records {
            assert_eq!(record.data_to::<TestData>().unwrap(), TestData::new("both", 9));
        }
    }
}
