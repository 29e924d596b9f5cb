//! The per-entity data-access interface.

use crate::error::Result;

/// Basic row access for one table keyed by an integer primary key.
pub trait Table {
    /// A row as read back from the table.
    type Record;
    /// The data needed to create a row.
    type NewRecord;
    /// A partial update; unset fields are left alone.
    type Changes;

    /// Insert a row and return its primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn insert(&self, new: &Self::NewRecord) -> Result<i64>;

    /// Apply changes to the row with the given key.
    ///
    /// Returns `false` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn update(&self, id: i64, changes: &Self::Changes) -> Result<bool>;

    /// Delete the row with the given key.
    ///
    /// Returns `false` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete(&self, id: i64) -> Result<bool>;

    /// Fetch the row with the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(&self, id: i64) -> Result<Option<Self::Record>>;
}

/// Collects `column = ?N` assignments for a partial `UPDATE`.
#[derive(Default)]
pub(crate) struct Assignments {
    columns: Vec<String>,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
}

impl Assignments {
    pub(crate) fn set<T>(&mut self, column: &str, value: Option<T>)
    where
        T: rusqlite::types::ToSql + 'static,
    {
        if let Some(value) = value {
            self.params.push(Box::new(value));
            self.columns
                .push(format!("{column} = ?{}", self.params.len()));
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build `UPDATE table SET ... WHERE key = ?N` and its parameters.
    pub(crate) fn into_statement(
        mut self,
        table: &str,
        key: &str,
        id: i64,
    ) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        self.params.push(Box::new(id));
        let sql = format!(
            "UPDATE {table} SET {} WHERE {key} = ?{}",
            self.columns.join(", "),
            self.params.len()
        );
        (sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignments_empty() {
        let assignments = Assignments::default();
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_assignments_skip_unset() {
        let mut assignments = Assignments::default();
        assignments.set("email", Some("a@example.org".to_string()));
        assignments.set::<String>("first_name", None);
        assignments.set("user_id", Some(3_i64));

        let (sql, params) = assignments.into_statement("donors", "donor_id", 9);
        assert_eq!(
            sql,
            "UPDATE donors SET email = ?1, user_id = ?2 WHERE donor_id = ?3"
        );
        assert_eq!(params.len(), 3);
    }
}
