use std::thread;

use rustydb_core::database;
use rustydb_core::fields::{FieldVal, IntField, StringField};
use rustydb_core::operators::{Filter, Op, OpIterator, Predicate, SeqScan};
use rustydb_core::transaction::TransactionId;
use rustydb_core::tuple::Tuple;

fn main() {
    env_logger::init();

    let db = database::get_global_db();

    let mut schema_file_path = std::env::current_dir().unwrap();
    schema_file_path.push("schemas.txt");
    if let Err(e) = db
        .get_catalog()
        .load_schema(schema_file_path.to_str().unwrap(), db.get_config())
    {
        log::warn!("could not load schemas.txt: {e}");
        return;
    }

    let catalog = db.get_catalog();
    let table = match catalog.get_table_from_name("employees") {
        Some(t) => t,
        None => {
            log::warn!("schemas.txt does not define an 'employees' table");
            return;
        }
    };
    let table_id = table.get_id();
    let td = table.get_tuple_desc().clone();

    println!("table id: {table_id}");
    println!("table name: {:?}", td.get_field_name(0));

    // Insert a handful of tuples concurrently; a transaction that deadlocks
    // or gets aborted just retries.
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let db = database::get_global_db();
            let td = td.clone();
            thread::spawn(move || loop {
                let tid = TransactionId::new();
                let bp = db.get_buffer_pool();
                let name = format!("Alice_{}", tid.get_tid());
                let result: Result<(), rustydb_core::error::DbError> = (|| {
                    for i in 0..3 {
                        bp.insert_tuple(
                            tid,
                            table_id,
                            Tuple::new(
                                vec![
                                    FieldVal::IntField(IntField::new(i)),
                                    FieldVal::StringField(StringField::new(name.clone(), 16)),
                                ],
                                &td,
                            ),
                        )?;
                    }
                    Ok(())
                })();

                match result {
                    Ok(()) => {
                        bp.transaction_complete(tid, true).ok();
                        break;
                    }
                    Err(_) => {
                        bp.transaction_complete(tid, false).ok();
                        thread::sleep(std::time::Duration::from_millis(50));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Scan the table back out through a Filter(SeqScan) pipeline.
    let tid = TransactionId::new();
    let scan = SeqScan::new(tid, table_id, None).unwrap();
    let mut filtered = Filter::new(
        Predicate::new(0, Op::Ge, FieldVal::IntField(IntField::new(0))),
        Box::new(scan),
    );

    filtered.open().unwrap();
    let mut count = 0;
    while let Some(t) = filtered.next().unwrap() {
        println!("tuple: {t}");
        count += 1;
    }
    filtered.close();
    db.get_buffer_pool().transaction_complete(tid, true).ok();

    println!("tuple count: {count}");
}
