//! `SQLite` policy adapter.
//!
//! Maps rule tuples onto the `ptype, v0..v5` table and wraps every
//! multi-row mutation in a single transaction.

// COUNT(*) is never negative.
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]

use crate::core::{
    Filter, PolicyRecord, PolicySink, PolicySource, Predicate, RuleFamily,
    to_filter_predicate,
};
use crate::error::{Error, IoError, Result, StorageError};
use crate::storage::config::{AdapterOptions, Database};
use crate::storage::schema::{create_table_sql, delete_sql, insert_sql, select_sql};
use crate::storage::traits::Adapter;
use rusqlite::{Connection, Transaction, TransactionBehavior, params, params_from_iter};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// SQLite-backed policy adapter.
///
/// Starts closed; [`SqliteAdapter::open`] connects and, if configured,
/// creates the policy table.
///
/// # Examples
///
/// ```
/// use rulestore::{Adapter, AdapterOptions, SqliteAdapter};
///
/// let mut adapter = SqliteAdapter::connect(AdapterOptions::in_memory()).unwrap();
/// adapter
///     .add_policy("p", &["alice".into(), "data1".into(), "read".into()])
///     .unwrap();
///
/// let mut lines: Vec<String> = Vec::new();
/// adapter.load_policy(&mut lines).unwrap();
/// assert_eq!(lines, vec!["p, alice, data1, read"]);
/// ```
#[derive(Debug)]
pub struct SqliteAdapter {
    options: AdapterOptions,
    /// `None` while closed.
    conn: Option<Connection>,
    filtered: bool,
}

impl SqliteAdapter {
    /// Creates a closed adapter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the options are invalid.
    pub fn new(options: AdapterOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            conn: None,
            filtered: false,
        })
    }

    /// Creates an adapter and opens it.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid or the database cannot
    /// be opened.
    pub fn connect(options: AdapterOptions) -> Result<Self> {
        let mut adapter = Self::new(options)?;
        adapter.open()?;
        Ok(adapter)
    }

    /// Opens the connection and, if `auto_create_table` is set, ensures the table.
    ///
    /// Opening an already open adapter is a no-op. On failure the adapter
    /// stays closed and `open` may be retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the table
    /// cannot be created.
    pub fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let timeout = Duration::from_millis(self.options.busy_timeout_ms);
        let conn = match &self.options.database {
            Database::Memory => {
                let conn = Connection::open_in_memory().map_err(StorageError::from)?;
                conn.busy_timeout(timeout).map_err(StorageError::from)?;
                conn
            }
            Database::File(path) => Self::open_file(path, timeout)?,
        };

        if self.options.auto_create_table {
            conn.execute_batch(&create_table_sql(&self.options.table_name))
                .map_err(StorageError::from)?;
        }

        // Only a fully bootstrapped connection counts as open
        self.conn = Some(conn);

        info!(
            table = %self.options.table_name,
            database = ?self.options.database,
            "policy adapter opened"
        );
        Ok(())
    }

    fn open_file(path: &Path, timeout: Duration) -> Result<Connection> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| IoError::DirectoryFailed {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(StorageError::from)?;
        conn.busy_timeout(timeout).map_err(StorageError::from)?;

        // WAL lets readers proceed while a writer holds its transaction
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        Ok(conn)
    }

    /// Closes the connection. Closing a closed adapter is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` refuses to close the connection; the
    /// adapter is closed regardless.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| StorageError::Database(e))?;
            debug!(table = %self.options.table_name, "policy adapter closed");
        }
        Ok(())
    }

    /// Returns true while the connection is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns the options the adapter was built with.
    #[must_use]
    pub const fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Returns the policy table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.options.table_name
    }

    /// Overrides the filtered flag.
    pub const fn set_filtered(&mut self, filtered: bool) {
        self.filtered = filtered;
    }

    /// Creates the policy table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is closed or the DDL fails.
    pub fn create_table(&self) -> Result<()> {
        self.conn()?
            .execute_batch(&create_table_sql(&self.options.table_name))
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Returns the number of stored rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is closed or the query fails.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", self.options.table_name),
                [],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }

    /// Returns every stored row, including its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is closed or the query fails.
    pub fn list_records(&self) -> Result<Vec<PolicyRecord>> {
        query_records(self.conn()?, &self.options.table_name, None)
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotOpen)
    }

    /// Splits out the connection and table name so both can be borrowed at once.
    fn parts(&mut self) -> Result<(&mut Connection, &str)> {
        let conn = self.conn.as_mut().ok_or(Error::NotOpen)?;
        Ok((conn, &self.options.table_name))
    }
}

/// Runs `f` inside an immediate transaction.
///
/// Commits when `f` returns `Ok`; rolls back and returns the original
/// error otherwise. A panic inside `f` drops the transaction, which rolls
/// back as well.
fn with_transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StorageError::Transaction)?;

    match f(&tx) {
        Ok(value) => {
            tx.commit().map_err(StorageError::Transaction)?;
            Ok(value)
        }
        Err(err) => {
            match tx.rollback() {
                Ok(()) => warn!(error = %err, "transaction rolled back"),
                Err(rollback_err) => {
                    warn!(error = %err, rollback_error = %rollback_err, "rollback failed");
                }
            }
            Err(err)
        }
    }
}

fn query_records(
    conn: &Connection,
    table: &str,
    condition: Option<(String, Vec<String>)>,
) -> Result<Vec<PolicyRecord>> {
    let (sql, params) = match condition {
        Some((cond, params)) => (select_sql(table, Some(&cond)), params),
        None => (select_sql(table, None), Vec::new()),
    };

    let mut stmt = conn.prepare(&sql).map_err(StorageError::from)?;
    let records = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(PolicyRecord::from_columns(
                row.get(0)?,
                row.get(1)?,
                [
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ],
            ))
        })
        .map_err(StorageError::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StorageError::from)?;

    Ok(records)
}

fn insert_records(conn: &Connection, table: &str, records: &[PolicyRecord]) -> Result<()> {
    let mut stmt = conn.prepare(&insert_sql(table)).map_err(StorageError::from)?;
    for record in records {
        let f = record.fields();
        stmt.execute(params![record.ptype(), f[0], f[1], f[2], f[3], f[4], f[5]])
            .map_err(StorageError::from)?;
    }
    Ok(())
}

fn delete_matching(conn: &Connection, table: &str, predicate: &Predicate) -> Result<usize> {
    let (cond, params) = predicate.to_sql();
    let removed = conn
        .execute(&delete_sql(table, Some(&cond)), params_from_iter(params.iter()))
        .map_err(StorageError::from)?;
    Ok(removed)
}

fn records_for<R: AsRef<[String]>>(ptype: &str, rules: &[R]) -> Result<Vec<PolicyRecord>> {
    rules
        .iter()
        .map(|rule| PolicyRecord::from_rule(ptype, rule.as_ref()))
        .collect()
}

fn feed(sink: &mut dyn PolicySink, records: &[PolicyRecord]) {
    for record in records {
        sink.receive(&record.to_line());
    }
}

impl Adapter for SqliteAdapter {
    fn load_policy(&self, sink: &mut dyn PolicySink) -> Result<()> {
        let records = query_records(self.conn()?, &self.options.table_name, None)?;
        feed(sink, &records);
        debug!(table = %self.options.table_name, rows = records.len(), "loaded policy");
        Ok(())
    }

    fn load_filtered_policy(&mut self, sink: &mut dyn PolicySink, filter: &Filter) -> Result<()> {
        let conn = self.conn()?;
        let predicates = filter.to_predicates()?;
        let records = query_records(conn, &self.options.table_name, Some(predicates.to_sql()))?;
        feed(sink, &records);
        self.filtered = true;
        debug!(
            table = %self.options.table_name,
            patterns = predicates.len(),
            rows = records.len(),
            "loaded filtered policy"
        );
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    fn save_policy(&mut self, model: &dyn PolicySource) -> Result<()> {
        let (conn, table) = self.parts()?;

        let mut records = Vec::new();
        for family in RuleFamily::ALL {
            for (ptype, rules) in model.rules_by_type(family) {
                records.extend(records_for(ptype, rules)?);
            }
        }

        let removed = with_transaction(conn, |tx| {
            let removed = tx
                .execute(&delete_sql(table, None), [])
                .map_err(StorageError::from)?;
            insert_records(tx, table, &records)?;
            Ok(removed)
        })?;

        debug!(table, removed, inserted = records.len(), "saved policy");
        Ok(())
    }

    fn add_policy(&mut self, ptype: &str, rule: &[String]) -> Result<()> {
        let (conn, table) = self.parts()?;
        let record = PolicyRecord::from_rule(ptype, rule)?;
        insert_records(conn, table, std::slice::from_ref(&record))?;
        debug!(table, line = %record.to_line(), "added policy");
        Ok(())
    }

    fn add_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<()> {
        let (conn, table) = self.parts()?;
        let records = records_for(ptype, rules)?;
        with_transaction(conn, |tx| insert_records(tx, table, &records))?;
        debug!(table, ptype, inserted = records.len(), "added policies");
        Ok(())
    }

    fn remove_policy(&mut self, ptype: &str, rule: &[String]) -> Result<usize> {
        let (conn, table) = self.parts()?;
        let record = PolicyRecord::from_rule(ptype, rule)?;
        let removed = delete_matching(conn, table, &record.exact_predicate())?;
        debug!(table, line = %record.to_line(), removed, "removed policy");
        Ok(removed)
    }

    fn remove_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<usize> {
        let (conn, table) = self.parts()?;
        let records = records_for(ptype, rules)?;
        let removed = with_transaction(conn, |tx| {
            records.iter().try_fold(0_usize, |total, record| {
                Ok(total + delete_matching(tx, table, &record.exact_predicate())?)
            })
        })?;
        debug!(table, ptype, rules = records.len(), removed, "removed policies");
        Ok(removed)
    }

    fn remove_filtered_policy(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<usize> {
        let (conn, table) = self.parts()?;
        let predicate = to_filter_predicate(ptype, field_index, field_values)?;
        let removed = delete_matching(conn, table, &predicate)?;
        debug!(table, ptype, field_index, removed, "removed filtered policy");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PolicyModel;

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn setup() -> SqliteAdapter {
        SqliteAdapter::connect(AdapterOptions::in_memory()).unwrap()
    }

    fn lines(adapter: &SqliteAdapter) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        adapter.load_policy(&mut lines).unwrap();
        lines.sort();
        lines
    }

    /// Makes every insert of a row whose v0 is `boom` fail.
    fn inject_insert_failure(adapter: &SqliteAdapter) {
        adapter
            .conn
            .as_ref()
            .unwrap()
            .execute_batch(
                r"
                CREATE TRIGGER fail_boom BEFORE INSERT ON casbin_rule
                WHEN NEW.v0 = 'boom'
                BEGIN SELECT RAISE(ABORT, 'injected failure'); END;
            ",
            )
            .unwrap();
    }

    #[test]
    fn test_open_creates_table() {
        let adapter = setup();
        assert!(adapter.is_open());
        assert_eq!(adapter.count().unwrap(), 0);
        assert!(!adapter.is_filtered());
    }

    #[test]
    fn test_create_table_idempotent() {
        let adapter = setup();
        assert!(adapter.create_table().is_ok());
        assert!(adapter.create_table().is_ok());
    }

    #[test]
    fn test_without_auto_create() {
        let mut adapter = SqliteAdapter::connect(
            AdapterOptions::in_memory().with_auto_create_table(false),
        )
        .unwrap();

        let err = adapter.add_policy("p", &rule(&["alice"])).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));

        adapter.create_table().unwrap();
        adapter.add_policy("p", &rule(&["alice"])).unwrap();
        assert_eq!(adapter.count().unwrap(), 1);
    }

    #[test]
    fn test_not_open() {
        let mut adapter = SqliteAdapter::new(AdapterOptions::in_memory()).unwrap();
        assert!(!adapter.is_open());

        let mut sink: Vec<String> = Vec::new();
        assert!(matches!(adapter.load_policy(&mut sink), Err(Error::NotOpen)));
        assert!(matches!(
            adapter.load_filtered_policy(&mut sink, &Filter::new()),
            Err(Error::NotOpen)
        ));
        assert!(matches!(
            adapter.save_policy(&PolicyModel::new()),
            Err(Error::NotOpen)
        ));
        assert!(matches!(
            adapter.add_policy("p", &rule(&["a"])),
            Err(Error::NotOpen)
        ));
        assert!(matches!(
            adapter.add_policies("p", &[rule(&["a"])]),
            Err(Error::NotOpen)
        ));
        assert!(matches!(
            adapter.remove_policy("p", &rule(&["a"])),
            Err(Error::NotOpen)
        ));
        assert!(matches!(
            adapter.remove_policies("p", &[rule(&["a"])]),
            Err(Error::NotOpen)
        ));
        assert!(matches!(
            adapter.remove_filtered_policy("p", 0, &rule(&["a"])),
            Err(Error::NotOpen)
        ));
        assert!(matches!(adapter.count(), Err(Error::NotOpen)));
        assert!(matches!(adapter.create_table(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_close_then_operate() {
        let mut adapter = setup();
        adapter.close().unwrap();
        assert!(!adapter.is_open());
        assert!(matches!(
            adapter.add_policy("p", &rule(&["a"])),
            Err(Error::NotOpen)
        ));
        // Closing twice is fine
        assert!(adapter.close().is_ok());
    }

    #[test]
    fn test_add_and_load() {
        let mut adapter = setup();
        adapter
            .add_policy("p", &rule(&["alice", "data1", "read"]))
            .unwrap();
        adapter.add_policy("g", &rule(&["alice", "admin"])).unwrap();

        assert_eq!(
            lines(&adapter),
            vec!["g, alice, admin", "p, alice, data1, read"]
        );
    }

    #[test]
    fn test_load_into_closure_sink() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["alice", "data1", "read"])).unwrap();
        adapter.add_policy("g", &rule(&["alice", "admin"])).unwrap();

        let mut grouping = 0;
        let mut count_grouping = |line: &str| {
            if line.starts_with('g') {
                grouping += 1;
            }
        };
        adapter.load_policy(&mut count_grouping).unwrap();
        assert_eq!(grouping, 1);
    }

    #[test]
    fn test_add_policy_allows_duplicates() {
        let mut adapter = setup();
        let r = rule(&["alice", "data1", "read"]);
        adapter.add_policy("p", &r).unwrap();
        adapter.add_policy("p", &r).unwrap();
        assert_eq!(adapter.count().unwrap(), 2);

        // Both copies go at once
        assert_eq!(adapter.remove_policy("p", &r).unwrap(), 2);
        assert_eq!(adapter.count().unwrap(), 0);
    }

    #[test]
    fn test_add_policy_too_many_fields() {
        let mut adapter = setup();
        let err = adapter
            .add_policy("p", &rule(&["a", "b", "c", "d", "e", "f", "g"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArity { arity: 7, .. }));
        assert_eq!(adapter.count().unwrap(), 0);
    }

    #[test]
    fn test_remove_policy_exact_match() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["alice", "data1"])).unwrap();
        adapter
            .add_policy("p", &rule(&["alice", "data1", "read"]))
            .unwrap();

        // Shorter rule does not match the longer row
        assert_eq!(
            adapter.remove_policy("p", &rule(&["alice", "data1"])).unwrap(),
            1
        );
        assert_eq!(lines(&adapter), vec!["p, alice, data1, read"]);

        // Different ptype does not match
        assert_eq!(
            adapter
                .remove_policy("p2", &rule(&["alice", "data1", "read"]))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_save_policy_replaces_table() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["old", "rule"])).unwrap();

        let mut model = PolicyModel::new();
        model.add_rule("p", ["alice", "data1", "read"]);
        adapter.save_policy(&model).unwrap();

        assert_eq!(adapter.count().unwrap(), 1);
        assert_eq!(lines(&adapter), vec!["p, alice, data1, read"]);
    }

    #[test]
    fn test_save_policy_rolls_back_on_insert_failure() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["keep", "me"])).unwrap();
        adapter.add_policy("g", &rule(&["keep", "group"])).unwrap();
        inject_insert_failure(&adapter);

        let mut model = PolicyModel::new();
        model.add_rule("p", ["alice", "data1", "read"]);
        model.add_rule("p", ["boom", "data2", "write"]);

        let err = adapter.save_policy(&model).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
        assert_eq!(adapter.count().unwrap(), 2);
        assert_eq!(lines(&adapter), vec!["g, keep, group", "p, keep, me"]);
    }

    #[test]
    fn test_add_policies_all_or_nothing() {
        let mut adapter = setup();
        inject_insert_failure(&adapter);

        let rules = vec![rule(&["alice", "data1"]), rule(&["boom", "data2"])];
        assert!(adapter.add_policies("p", &rules).is_err());
        assert_eq!(adapter.count().unwrap(), 0);

        let rules = vec![rule(&["alice", "data1"]), rule(&["bob", "data2"])];
        adapter.add_policies("p", &rules).unwrap();
        assert_eq!(adapter.count().unwrap(), 2);
    }

    #[test]
    fn test_remove_policies_rolls_back_on_arity_error() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["alice", "data1"])).unwrap();

        let rules = vec![
            rule(&["alice", "data1"]),
            rule(&["a", "b", "c", "d", "e", "f", "g"]),
        ];
        assert!(matches!(
            adapter.remove_policies("p", &rules),
            Err(Error::InvalidArity { .. })
        ));
        assert_eq!(adapter.count().unwrap(), 1);
    }

    #[test]
    fn test_load_filtered_sets_flag() {
        let mut adapter = setup();
        adapter
            .add_policy("p", &rule(&["alice", "data1", "read"]))
            .unwrap();
        adapter
            .add_policy("p", &rule(&["bob", "data2", "write"]))
            .unwrap();
        adapter.add_policy("g", &rule(&["alice", "admin"])).unwrap();

        let mut sink: Vec<String> = Vec::new();
        adapter
            .load_filtered_policy(&mut sink, &Filter::new().with("p", ["alice"]))
            .unwrap();

        assert_eq!(sink, vec!["p, alice, data1, read"]);
        assert!(adapter.is_filtered());
        assert_eq!(adapter.count().unwrap(), 3);

        adapter.set_filtered(false);
        assert!(!adapter.is_filtered());
    }

    #[test]
    fn test_load_filtered_invalid_pattern_keeps_flag() {
        let mut adapter = setup();
        let mut sink: Vec<String> = Vec::new();
        let filter = Filter::new().with("p", ["a", "b", "c", "d", "e", "f", "g"]);
        assert!(adapter.load_filtered_policy(&mut sink, &filter).is_err());
        assert!(!adapter.is_filtered());
    }

    #[test]
    fn test_remove_filtered_policy_range() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["a", "b"])).unwrap();

        let err = adapter
            .remove_filtered_policy("p", 5, &rule(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { field_index: 5, .. }));
        assert_eq!(adapter.count().unwrap(), 1);
    }

    #[test]
    fn test_list_records_have_ids() {
        let mut adapter = setup();
        adapter.add_policy("p", &rule(&["alice"])).unwrap();
        let records = adapter.list_records().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].id.is_some());
        assert_eq!(records[0].arity(), 1);
    }

    #[test]
    fn test_custom_table_name() {
        let mut adapter =
            SqliteAdapter::connect(AdapterOptions::in_memory().with_table_name("rules")).unwrap();
        adapter.add_policy("p", &rule(&["alice"])).unwrap();
        assert_eq!(adapter.table_name(), "rules");

        let count: i64 = adapter
            .conn
            .as_ref()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let result = SqliteAdapter::new(AdapterOptions::in_memory().with_table_name("x y"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
