//! `.tally`/`.tallies` — a tiny per-sender counter, grounded in
//! `docstore.py`'s rationale for the workbook-backed ORM and wired the way
//! `app.py` binds one [`Database`] per module that declares record types.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kzm_core::{ArgValue, ParamDescriptor, ParamKind};
use kzm_docstore::{Database, Record};
use kzm_runtime::{CommandSpec, Outcome, Plugin};
use kzm_workbook::CellValue;

/// One participant's running count, bumped by `.tally` and read back by
/// `.tallies`.
#[derive(Clone, Debug)]
pub struct Tally {
    created_at: f64,
    updated_at: f64,
    count: i64,
}

impl Record for Tally {
    const TABLE_NAME: &'static str = "Tally";

    fn field_names() -> &'static [&'static str] {
        &["count"]
    }

    fn with_timestamps(now: f64) -> Self {
        Tally { created_at: now, updated_at: now, count: 0 }
    }

    fn created_at(&self) -> f64 {
        self.created_at
    }
    fn updated_at(&self) -> f64 {
        self.updated_at
    }
    fn set_updated_at(&mut self, now: f64) {
        self.updated_at = now;
    }

    fn get_field(&self, name: &str) -> CellValue {
        match name {
            "count" => CellValue::Int(self.count),
            _ => CellValue::Absent,
        }
    }

    fn set_field(&mut self, name: &str, value: CellValue) -> Result<(), kzm_docstore::DocstoreError> {
        match name {
            "count" => {
                let count = value.as_f64().ok_or_else(|| kzm_docstore::DocstoreError::BadFieldValue {
                    table: Self::TABLE_NAME,
                    field: "count",
                    found: value.clone(),
                })?;
                self.count = count as i64;
                Ok(())
            }
            other => Err(kzm_docstore::DocstoreError::UnknownField { table: Self::TABLE_NAME, field: other.to_string() }),
        }
    }
}

fn now_unix() -> f64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

pub struct Ledger {
    database: Arc<Mutex<Database>>,
}

impl Ledger {
    /// `database` must already have [`Tally`] registered and reloaded — the
    /// daemon's startup wiring owns that, since it also hands the same
    /// handle to [`kzm_runtime::PipelineHost::handle_event`]'s post-event
    /// save loop.
    pub fn new(database: Arc<Mutex<Database>>) -> Self {
        Ledger { database }
    }
}

#[async_trait]
impl Plugin for Ledger {
    fn plugin_name(&self) -> &str {
        "ledger"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let tally_db = Arc::clone(&self.database);
        let tallies_db = Arc::clone(&self.database);

        vec![
            CommandSpec::new(
                "tally",
                "给自己的计数加一，或加上给定的增量，用法：.tally [增量]",
                vec![ParamDescriptor::new("delta", ParamKind::Integer, true)],
                move |ambient, kwargs| {
                    let database = Arc::clone(&tally_db);
                    Box::pin(async move {
                        let delta = match kwargs.get("delta") {
                            Some(ArgValue::Integer(n)) => *n,
                            _ => 1,
                        };
                        let mut db = database.lock().unwrap();
                        let table = match db.table_mut::<i64, Tally>() {
                            Ok(table) => table,
                            Err(err) => return Outcome::reply(format!("表未就绪：{err}")),
                        };
                        if table.get(&ambient.sender).is_none() {
                            table.insert(ambient.sender, Tally::with_timestamps(now_unix()));
                        }
                        let current = table.get(&ambient.sender).map(|t| t.count).unwrap_or(0);
                        let updated = current + delta;
                        if let Err(err) = table.set_field(&ambient.sender, "count", CellValue::Int(updated)) {
                            return Outcome::reply(format!("写入失败：{err}"));
                        }
                        Outcome::reply(format!("当前计数：{updated}"))
                    })
                },
            ),
            CommandSpec::new("tallies", "列出已登记的计数", Vec::new(), move |_ambient, _kwargs| {
                let database = Arc::clone(&tallies_db);
                Box::pin(async move {
                    let db = database.lock().unwrap();
                    let table = match db.table::<i64, Tally>() {
                        Ok(table) => table,
                        Err(err) => return Outcome::reply(format!("表未就绪：{err}")),
                    };
                    if table.is_empty() {
                        return Outcome::reply("还没有任何计数。");
                    }
                    let lines: Vec<String> = table.iter().map(|(who, tally)| format!("{who}: {}", tally.count)).collect();
                    Outcome::reply(lines.join("\n"))
                })
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fresh_database() -> Arc<Mutex<Database>> {
        let mut db = Database::new("/dev/null");
        db.register::<i64, Tally>();
        Arc::new(Mutex::new(db))
    }

    #[tokio::test]
    async fn tally_defaults_to_incrementing_by_one() {
        let ledger = Ledger::new(fresh_database());
        let spec = ledger.commands().into_iter().find(|c| c.name == "tally").unwrap();
        let ambient = kzm_runtime::Ambient { context: 1, sender: 9, text: ".tally".to_string(), message_id: 1 };
        let outcome = (spec.handler)(ambient, HashMap::new()).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "当前计数：1"),
            _ => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn tally_accepts_an_explicit_delta_and_accumulates_across_calls() {
        let database = fresh_database();
        let ledger = Ledger::new(Arc::clone(&database));
        let spec = ledger.commands().into_iter().find(|c| c.name == "tally").unwrap();

        let ambient = kzm_runtime::Ambient { context: 1, sender: 9, text: ".tally 5".to_string(), message_id: 1 };
        let mut kwargs = HashMap::new();
        kwargs.insert("delta".to_string(), ArgValue::Integer(5));
        (spec.handler)(ambient.clone(), kwargs.clone()).await;
        let outcome = (spec.handler)(ambient, kwargs).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "当前计数：10"),
            _ => panic!("expected a reply"),
        }
        assert!(database.lock().unwrap().dirty());
    }

    #[tokio::test]
    async fn tallies_reports_every_registered_sender() {
        let database = fresh_database();
        let ledger = Ledger::new(Arc::clone(&database));
        let tally_spec = ledger.commands().into_iter().find(|c| c.name == "tally").unwrap();
        let ambient = kzm_runtime::Ambient { context: 1, sender: 9, text: ".tally".to_string(), message_id: 1 };
        (tally_spec.handler)(ambient, HashMap::new()).await;

        let tallies_spec = ledger.commands().into_iter().find(|c| c.name == "tallies").unwrap();
        let ambient = kzm_runtime::Ambient { context: 1, sender: 1, text: ".tallies".to_string(), message_id: 2 };
        let outcome = (tallies_spec.handler)(ambient, HashMap::new()).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "9: 1"),
            _ => panic!("expected a reply"),
        }
    }

    #[test]
    fn set_field_rejects_a_non_numeric_count_instead_of_zeroing_it() {
        let mut tally = Tally::with_timestamps(0.0);
        let err = tally.set_field("count", CellValue::Str("not a number".to_string())).unwrap_err();
        assert!(matches!(err, kzm_docstore::DocstoreError::BadFieldValue { field: "count", .. }));
        assert_eq!(tally.count, 0);
    }
}
